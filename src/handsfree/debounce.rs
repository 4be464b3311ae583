//! Duplicate command suppression

use crate::command::VoiceCommand;
use std::time::Duration;
use tokio::time::Instant;

/// Suppresses a command identical to the last dispatched one within a window
#[derive(Debug, Clone)]
pub struct CommandDebouncer {
    window: Duration,
    last: Option<(VoiceCommand, Instant)>,
}

impl CommandDebouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns true if `command` should be dispatched, recording it if so
    ///
    /// The window is measured from the last dispatched command; suppressed
    /// repeats do not extend it.
    pub fn should_dispatch(&mut self, command: VoiceCommand, now: Instant) -> bool {
        if let Some((last, at)) = self.last {
            if last == command && now.saturating_duration_since(at) < self.window {
                tracing::debug!(
                    "Suppressing duplicate '{}' command ({:?} since last)",
                    command,
                    now.saturating_duration_since(at)
                );
                return false;
            }
        }
        self.last = Some((command, now));
        true
    }
}
