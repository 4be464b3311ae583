//! Text-to-speech output channel

use crate::config::VoiceSettings;
use async_trait::async_trait;

/// Speech synthesis failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechOutputError {
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Speech output unavailable: {0}")]
    Unavailable(String),
}

/// Platform speech synthesiser
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak `text`, resolving when playback finishes or is stopped
    async fn speak(&self, text: &str) -> Result<(), SpeechOutputError>;

    /// Stop playback; a pending `speak` resolves
    async fn stop(&self);

    /// Pause playback where supported
    async fn pause(&self) {}

    /// Apply voice, rate, pitch and volume
    async fn configure(&self, _settings: &VoiceSettings) -> Result<(), SpeechOutputError> {
        Ok(())
    }
}
