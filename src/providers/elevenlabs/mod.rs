pub mod elevenlabs_request;
pub mod elevenlabs_voice_settings;

pub use elevenlabs_request::ElevenLabsRequest;
pub use elevenlabs_voice_settings::ElevenLabsVoiceSettings;
