//! Serialised speech output
//!
//! The narrator is the only component that talks to the [`SpeechOutput`].
//! Utterances take turns through a FIFO lock, so a timer alert raised while
//! a step is being read waits for the step to finish instead of talking over
//! it. Every wait is bounded by the [`NarrationConfig`] budget.

use super::output::{SpeechOutput, SpeechOutputError};
use crate::config::{NarrationConfig, VoiceSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Narration failures
#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error(transparent)]
    Output(#[from] SpeechOutputError),

    #[error("Speech output did not finish within {0:?}")]
    TimedOut(Duration),
}

struct NarratorInner {
    output: Arc<dyn SpeechOutput>,
    budget: NarrationConfig,
    turn: Mutex<()>,
    speaking: watch::Sender<bool>,
}

/// Resets the speaking flag even if the speaking future is dropped
struct SpeakingGuard<'a>(&'a watch::Sender<bool>);

impl Drop for SpeakingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

/// Cloneable handle to the shared speech output
#[derive(Clone)]
pub struct Narrator {
    inner: Arc<NarratorInner>,
}

impl Narrator {
    pub fn new(output: Arc<dyn SpeechOutput>, budget: NarrationConfig) -> Self {
        let (speaking, _) = watch::channel(false);
        Self {
            inner: Arc::new(NarratorInner {
                output,
                budget,
                turn: Mutex::new(()),
                speaking,
            }),
        }
    }

    /// Whether an utterance is currently playing
    pub fn is_speaking(&self) -> bool {
        *self.inner.speaking.borrow()
    }

    /// Watch the speaking flag
    pub fn subscribe_speaking(&self) -> watch::Receiver<bool> {
        self.inner.speaking.subscribe()
    }

    /// Speak `text` and wait until it has been spoken, stopped or timed out
    pub async fn speak_and_wait(&self, text: &str) -> Result<(), NarrationError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let _turn = self.inner.turn.lock().await;
        let budget = self.inner.budget.timeout_for(text);

        self.inner.speaking.send_replace(true);
        let _speaking = SpeakingGuard(&self.inner.speaking);
        tracing::debug!("Speaking {} characters (budget {:?})", text.len(), budget);

        match tokio::time::timeout(budget, self.inner.output.speak(text)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!("Speech output failed: {}", e);
                Err(e.into())
            }
            Err(_) => {
                tracing::warn!("Speech output did not complete within {:?}", budget);
                self.inner.output.stop().await;
                Err(NarrationError::TimedOut(budget))
            }
        }
    }

    /// Best-effort narration: failures are logged and swallowed
    pub async fn narrate(&self, text: &str) {
        if let Err(e) = self.speak_and_wait(text).await {
            tracing::warn!("Narration skipped: {}", e);
        }
    }

    /// Stop whatever is playing; the in-flight utterance resolves early
    pub async fn interrupt(&self) {
        if self.is_speaking() {
            tracing::debug!("Interrupting speech output");
            self.inner.output.stop().await;
        }
    }

    /// Stop the output channel whether or not an utterance is tracked as
    /// playing
    pub async fn stop(&self) {
        self.inner.output.stop().await;
    }

    /// Apply voice settings to the output channel
    pub async fn configure(&self, settings: &VoiceSettings) -> Result<(), SpeechOutputError> {
        self.inner.output.configure(settings).await
    }
}
