pub mod health;
pub mod saved_audio;
pub mod tts;
