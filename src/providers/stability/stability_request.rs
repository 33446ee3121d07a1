use crate::config::StabilitySettings;
use crate::providers::stability::StabilityTextPrompt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityRequest {
    pub text_prompts: Vec<StabilityTextPrompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
}

impl StabilityRequest {
    /// One unweighted prompt, with the optional generation knobs taken from
    /// settings. Unset knobs are left for the engine to default.
    pub fn for_caption(caption: &str, settings: &StabilitySettings) -> Self {
        Self {
            text_prompts: vec![StabilityTextPrompt { text: caption.to_string(), weight: None }],
            cfg_scale: settings.cfg_scale,
            height: settings.height,
            width: settings.width,
            samples: None,
            steps: settings.steps,
        }
    }
}
