use crate::config::ElevenLabsSettings;
use crate::providers::elevenlabs::ElevenLabsVoiceSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevenLabsRequest {
    pub text: String,
    pub model_id: String,
    pub voice_settings: ElevenLabsVoiceSettings,
}

impl ElevenLabsRequest {
    pub fn new(text: impl Into<String>, settings: &ElevenLabsSettings) -> Self {
        Self {
            text: text.into(),
            model_id: settings.model_id.clone(),
            voice_settings: ElevenLabsVoiceSettings {
                stability: settings.stability,
                similarity_boost: settings.similarity_boost,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_shape() {
        let req = ElevenLabsRequest::new("Once upon a time.", &ElevenLabsSettings::default());
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "text": "Once upon a time.",
                "model_id": "eleven_monolingual_v1",
                "voice_settings": { "stability": 0.5, "similarity_boost": 0.5 }
            })
        );
    }
}
