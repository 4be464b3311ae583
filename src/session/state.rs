//! Cook-along session phases
//!
//! Explicit transition table for the session lifecycle. The controller asks
//! the machine before changing phase; events that are not valid for the
//! current phase are rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No session
    #[default]
    NotStarted,
    /// The welcome message is being spoken
    WelcomePlaying,
    /// Welcome done, waiting for the cook to say "start"
    AwaitingStart,
    /// A step has been narrated and cooking is under way
    StepInProgress,
    /// Cooking paused; timers are frozen
    Paused,
    /// Past the last step
    Completed,
    /// Saying goodbye and tearing down
    Exiting,
}

impl SessionPhase {
    /// Returns a human-readable description of the phase
    pub fn description(&self) -> &'static str {
        match self {
            SessionPhase::NotStarted => "not started",
            SessionPhase::WelcomePlaying => "welcoming",
            SessionPhase::AwaitingStart => "waiting to start",
            SessionPhase::StepInProgress => "cooking",
            SessionPhase::Paused => "paused",
            SessionPhase::Completed => "completed",
            SessionPhase::Exiting => "exiting",
        }
    }

    /// Whether a session exists in this phase
    pub fn has_session(&self) -> bool {
        !matches!(self, SessionPhase::NotStarted)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Events that can change the phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseEvent {
    /// A session was created and the welcome started
    Begin,
    WelcomeFinished,
    /// Narrate the first step
    StartCooking,
    Pause,
    Resume,
    /// Move past the last step
    Finish,
    /// Graceful exit requested
    Exit,
    /// Teardown finished
    Ended,
}

impl PhaseEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseEvent::Begin => "begin",
            PhaseEvent::WelcomeFinished => "finish welcome",
            PhaseEvent::StartCooking => "start cooking",
            PhaseEvent::Pause => "pause",
            PhaseEvent::Resume => "resume",
            PhaseEvent::Finish => "finish",
            PhaseEvent::Exit => "exit",
            PhaseEvent::Ended => "end",
        }
    }
}

/// A phase change that took place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub event: PhaseEvent,
}

/// The transition table. `None` means the event is not valid in `phase`.
pub fn next_phase(phase: SessionPhase, event: PhaseEvent) -> Option<SessionPhase> {
    use PhaseEvent as E;
    use SessionPhase::*;

    match (phase, event) {
        (NotStarted, E::Begin) => Some(WelcomePlaying),
        (WelcomePlaying, E::WelcomeFinished) => Some(AwaitingStart),
        (WelcomePlaying | AwaitingStart, E::StartCooking) => Some(StepInProgress),
        (StepInProgress, E::Pause) => Some(Paused),
        (Paused, E::Resume) => Some(StepInProgress),
        (StepInProgress | Paused, E::Finish) => Some(Completed),
        (WelcomePlaying | AwaitingStart | StepInProgress | Paused | Completed, E::Exit) => {
            Some(Exiting)
        }
        (NotStarted, E::Ended) => None,
        (_, E::Ended) => Some(NotStarted),
        _ => None,
    }
}

/// Session phase state machine
pub struct SessionStateMachine {
    phase: SessionPhase,
}

impl SessionStateMachine {
    /// Creates a new state machine in the NotStarted phase
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::NotStarted,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Process an event and return the transition if one occurred
    ///
    /// Returns `None` if the event is not valid for the current phase.
    pub fn process_event(&mut self, event: PhaseEvent) -> Option<PhaseTransition> {
        let to = next_phase(self.phase, event)?;
        let transition = PhaseTransition {
            from: self.phase,
            to,
            event,
        };

        self.phase = to;
        tracing::info!(
            "Session phase transition: {:?} -> {:?} (event: {:?})",
            transition.from,
            transition.to,
            event
        );

        Some(transition)
    }

    /// Force the machine back to NotStarted
    pub fn reset(&mut self) {
        self.phase = SessionPhase::NotStarted;
        tracing::info!("Session state machine reset");
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
