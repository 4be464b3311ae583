//! Terminal speech channels
//!
//! Typed lines on stdin stand in for recognised speech and narration is
//! printed to stdout. Lets a whole cook-along session run in a terminal.

use super::input::{SpeechInput, SpeechInputError, SpeechInputEvent};
use super::output::{SpeechOutput, SpeechOutputError};
use crate::config::VoiceSettings;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type SharedLines = Arc<tokio::sync::Mutex<Lines<BufReader<Stdin>>>>;

/// Reads one line of stdin per listening session
pub struct ConsoleSpeechInput {
    lines: SharedLines,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ConsoleSpeechInput {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSpeechInput {
    pub fn new() -> Self {
        Self {
            lines: Arc::new(tokio::sync::Mutex::new(
                BufReader::new(tokio::io::stdin()).lines(),
            )),
            reader: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SpeechInput for ConsoleSpeechInput {
    async fn initialize(&self) -> Result<bool, SpeechInputError> {
        Ok(true)
    }

    async fn listen(
        &self,
        events: mpsc::Sender<SpeechInputEvent>,
    ) -> Result<(), SpeechInputError> {
        let lines = self.lines.clone();
        let handle = tokio::spawn(async move {
            let line = lines.lock().await.next_line().await;
            let outcome = match line {
                Ok(Some(text)) => vec![
                    SpeechInputEvent::Transcript {
                        text,
                        is_final: true,
                    },
                    SpeechInputEvent::SessionEnded,
                ],
                Ok(None) => vec![SpeechInputEvent::Error(SpeechInputError::Unavailable(
                    "stdin closed".to_string(),
                ))],
                Err(e) => vec![SpeechInputEvent::Error(SpeechInputError::Platform(
                    e.to_string(),
                ))],
            };
            for event in outcome {
                if events.send(event).await.is_err() {
                    break;
                }
            }
        });

        if let Some(previous) = self.reader.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn stop(&self) {
        if let Some(handle) = self.reader.lock().take() {
            handle.abort();
        }
    }
}

/// Prints narration to stdout
pub struct ConsoleSpeechOutput {
    /// Simulated speaking time per character, so pacing feels like speech
    per_char: Duration,
    stopped: tokio::sync::Notify,
}

impl ConsoleSpeechOutput {
    pub fn new(per_char: Duration) -> Self {
        Self {
            per_char,
            stopped: tokio::sync::Notify::new(),
        }
    }
}

impl Default for ConsoleSpeechOutput {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[async_trait]
impl SpeechOutput for ConsoleSpeechOutput {
    async fn speak(&self, text: &str) -> Result<(), SpeechOutputError> {
        let stopped = self.stopped.notified();
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("[voice] {}\n", text).as_bytes())
            .await
            .map_err(|e| SpeechOutputError::Unavailable(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| SpeechOutputError::Unavailable(e.to_string()))?;

        let playback = self.per_char.saturating_mul(text.chars().count() as u32);
        if !playback.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(playback) => {}
                _ = stopped => {}
            }
        }
        Ok(())
    }

    async fn stop(&self) {
        self.stopped.notify_waiters();
    }

    async fn configure(&self, settings: &VoiceSettings) -> Result<(), SpeechOutputError> {
        tracing::debug!(
            "Console output ignores voice settings (language {})",
            settings.language
        );
        Ok(())
    }
}
