//! Speech-to-text input channel
//!
//! A platform recogniser is driven through [`SpeechInput`]. Results are
//! delivered as [`SpeechInputEvent`] messages on the channel handed to
//! [`SpeechInput::listen`] instead of through callback fields, so the
//! consumer decides the ordering of everything it reacts to.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Events produced during a listening session
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechInputEvent {
    /// Recognised text so far. `is_final` marks the recogniser's final
    /// result for the current utterance.
    Transcript { text: String, is_final: bool },
    /// Microphone sound level sample (platform units, typically dB)
    SoundLevel(f32),
    /// The recogniser ended the session on its own
    SessionEnded,
    /// The session failed
    Error(SpeechInputError),
}

/// Speech recognition failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechInputError {
    #[error("Microphone or speech recognition permission denied")]
    PermissionDenied,

    #[error("Speech recognition unavailable: {0}")]
    Unavailable(String),

    #[error("No speech was recognised")]
    NoMatch,

    #[error("Speech recognition timed out")]
    Timeout,

    #[error("Speech recognition failed: {0}")]
    Platform(String),
}

impl SpeechInputError {
    /// Errors with no automatic way forward; hands-free mode must be
    /// switched off when one occurs
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SpeechInputError::PermissionDenied | SpeechInputError::Unavailable(_)
        )
    }
}

/// Platform speech recogniser
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Prepare the recogniser and request permissions
    ///
    /// Returns `Ok(false)` when recognition is not available on this device.
    async fn initialize(&self) -> Result<bool, SpeechInputError>;

    /// Begin a listening session, sending results to `events`
    ///
    /// Returns once the session has started; results arrive asynchronously.
    async fn listen(&self, events: mpsc::Sender<SpeechInputEvent>)
        -> Result<(), SpeechInputError>;

    /// End the active session, if any
    async fn stop(&self);
}
