use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub request_timeout_secs: u64,
    pub openai: OpenAISettings,
    pub stability: StabilitySettings,
    pub elevenlabs: ElevenLabsSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: 120,
            openai: OpenAISettings::default(),
            stability: StabilitySettings::default(),
            elevenlabs: ElevenLabsSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub story_max_tokens: u32,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo-16k".to_string(),
            story_max_tokens: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilitySettings {
    pub api_base: String,
    pub api_key: String,
    pub engine: String,
    /// Upper bound on captions (and therefore images) per story.
    pub image_count: usize,
    pub cfg_scale: Option<f32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub steps: Option<u32>,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.stability.ai".to_string(),
            api_key: String::new(),
            engine: "stable-diffusion-xl-1024-v1-0".to_string(),
            image_count: 3,
            cfg_scale: None,
            width: None,
            height: None,
            steps: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsSettings {
    pub api_base: String,
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for ElevenLabsSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.elevenlabs.io".to_string(),
            api_key: String::new(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.5,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Reads `path` when it exists, otherwise starts from defaults. Empty API
    /// keys are then filled from the process environment.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    pub fn load_with<F>(path: &str, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            warn!("Config file {} not found, using defaults", path);
            Self::default()
        };
        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stability.image_count == 0 {
            anyhow::bail!("stability.image_count must be at least 1");
        }
        Ok(())
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let keys = [
            (&mut self.openai.api_key, "OPENAI_API_KEY"),
            (&mut self.stability.api_key, "STABILITY_API_KEY"),
            (&mut self.elevenlabs.api_key, "ELEVENLABS_API_KEY"),
        ];
        for (slot, var) in keys {
            if slot.trim().is_empty() {
                if let Some(value) = lookup(var) {
                    *slot = value.trim().to_string();
                }
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Re-reads `path` into `shared`. On any error the current config stays in
/// place and the error is returned to the caller.
pub async fn reload_into<F>(path: &str, shared: &RwLock<Config>, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let new_config = Config::load_with(path, lookup)?;
    *shared.write().await = new_config;
    Ok(())
}
