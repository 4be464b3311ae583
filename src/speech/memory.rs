//! In-memory speech channels
//!
//! Headless implementations of the speech traits. The input side is driven
//! by calling [`MemorySpeechInput::emit`]; the output side records what was
//! spoken. Used for embedding without audio hardware and throughout the
//! test suite.

use super::input::{SpeechInput, SpeechInputError, SpeechInputEvent};
use super::output::{SpeechOutput, SpeechOutputError};
use crate::config::VoiceSettings;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Speech input fed by the caller
#[derive(Default)]
pub struct MemorySpeechInput {
    sender: Mutex<Option<mpsc::Sender<SpeechInputEvent>>>,
    available: AtomicBool,
    init_error: Mutex<Option<SpeechInputError>>,
    listen_errors: Mutex<Vec<SpeechInputError>>,
    listen_count: AtomicUsize,
    stop_count: AtomicUsize,
}

impl MemorySpeechInput {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            ..Default::default()
        }
    }

    /// Make `initialize` report recognition as unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make `initialize` fail with `error`
    pub fn fail_initialize(&self, error: SpeechInputError) {
        *self.init_error.lock() = Some(error);
    }

    /// Make the next `listen` call fail with `error`
    pub fn fail_next_listen(&self, error: SpeechInputError) {
        self.listen_errors.lock().push(error);
    }

    /// Whether a listening session is open
    pub fn is_listening(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Number of sessions started
    pub fn listen_count(&self) -> usize {
        self.listen_count.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls
    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    /// Deliver an event to the open session
    ///
    /// Returns false when no session is open or the receiver has gone.
    pub async fn emit(&self, event: SpeechInputEvent) -> bool {
        let sender = self.sender.lock().clone();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Deliver a final transcript followed by the end of the session
    pub async fn say(&self, text: &str) -> bool {
        self.emit(SpeechInputEvent::Transcript {
            text: text.to_string(),
            is_final: true,
        })
        .await
            && self.emit(SpeechInputEvent::SessionEnded).await
    }
}

#[async_trait]
impl SpeechInput for MemorySpeechInput {
    async fn initialize(&self) -> Result<bool, SpeechInputError> {
        if let Some(error) = self.init_error.lock().take() {
            return Err(error);
        }
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn listen(
        &self,
        events: mpsc::Sender<SpeechInputEvent>,
    ) -> Result<(), SpeechInputError> {
        let pending_error = {
            let mut errors = self.listen_errors.lock();
            (!errors.is_empty()).then(|| errors.remove(0))
        };
        if let Some(error) = pending_error {
            return Err(error);
        }
        self.listen_count.fetch_add(1, Ordering::SeqCst);
        *self.sender.lock() = Some(events);
        Ok(())
    }

    async fn stop(&self) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        self.sender.lock().take();
    }
}

/// Speech output that records every utterance
#[derive(Default)]
pub struct MemorySpeechOutput {
    spoken: Mutex<Vec<String>>,
    fail_next: Mutex<Option<String>>,
    speak_delay: Mutex<Option<Duration>>,
    hang: AtomicBool,
    settings: Mutex<Option<VoiceSettings>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    stop_count: AtomicUsize,
    stopped: Notify,
}

impl MemorySpeechOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything spoken so far, in order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }

    /// Last utterance, if any
    pub fn last_spoken(&self) -> Option<String> {
        self.spoken.lock().last().cloned()
    }

    /// Make the next `speak` fail
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_string());
    }

    /// Simulate playback time for each utterance
    pub fn set_speak_delay(&self, delay: Duration) {
        *self.speak_delay.lock() = Some(delay);
    }

    /// Never report completion until stopped
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// Number of `stop` calls
    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `speak` calls observed
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Settings applied through `configure`
    pub fn settings(&self) -> Option<VoiceSettings> {
        self.settings.lock().clone()
    }
}

#[async_trait]
impl SpeechOutput for MemorySpeechOutput {
    async fn speak(&self, text: &str) -> Result<(), SpeechOutputError> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(SpeechOutputError::Synthesis(message));
        }

        self.spoken.lock().push(text.to_string());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let stopped = self.stopped.notified();
        let delay = *self.speak_delay.lock();
        if self.hang.load(Ordering::SeqCst) {
            stopped.await;
        } else if let Some(delay) = delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stopped => {}
            }
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        self.stopped.notify_waiters();
    }

    async fn configure(&self, settings: &VoiceSettings) -> Result<(), SpeechOutputError> {
        *self.settings.lock() = Some(settings.clone());
        Ok(())
    }
}
