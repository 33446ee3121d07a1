pub mod openai;
pub mod stability;
pub mod elevenlabs;
