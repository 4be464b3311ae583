//! Hands-free listening state machine
//!
//! Defines the states and transitions of the continuous listening loop.
//! The machine only tracks state and the accumulated transcript; timers and
//! I/O are driven by the listener task.

use serde::{Deserialize, Serialize};

/// Listening loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListenState {
    /// Waiting for speech output to finish before listening again
    #[default]
    Idle,
    /// A recognition session is open
    Listening,
    /// The silence threshold passed after a final transcript
    SilenceDetected,
    /// The utterance has been committed and handed off
    Finalizing,
    /// The loop is not running (stopped or failed)
    Disabled,
}

impl ListenState {
    /// Returns a human-readable description of the state
    pub fn description(&self) -> &'static str {
        match self {
            ListenState::Idle => "Waiting to listen",
            ListenState::Listening => "Listening",
            ListenState::SilenceDetected => "Heard you",
            ListenState::Finalizing => "Working on it",
            ListenState::Disabled => "Hands-free off",
        }
    }

    /// Returns whether a recognition session is open in this state
    pub fn is_capturing(&self) -> bool {
        matches!(self, ListenState::Listening | ListenState::SilenceDetected)
    }
}

/// Events that can trigger state transitions
#[derive(Debug, Clone)]
pub enum ListenEvent {
    /// Open a recognition session
    Start {
        /// Whether speech output is currently playing
        output_active: bool,
    },
    /// Recognised text so far
    Transcript { text: String, is_final: bool },
    /// The silence threshold passed
    SilenceElapsed,
    /// Commit the transcript
    Finalize,
    /// The recogniser ended the session
    SessionEnded,
    /// The session ran for the maximum allowed time
    ListenTimeout,
    /// Speech output started while listening
    OutputStarted,
    /// Recognition failed but listening can be retried
    TransientError { message: String },
    /// Recognition cannot continue
    PermanentError { message: String },
    /// The committed utterance was handled
    Dispatched,
    /// The loop is shutting down
    Stop,
}

/// Reason for entering a state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    Started,
    Speech,
    Silence,
    SessionEnded,
    ListenTimeout,
    /// Nothing was said
    NoSpeech,
    OutputStarted,
    RecognitionError { message: String },
    PermissionFailure { message: String },
    Dispatched,
    Stopped,
}

/// Additional data from a state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionData {
    /// Committed transcript
    Utterance { text: String },
    /// Error information
    Error { message: String },
}

/// Result of a state transition
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub new_state: ListenState,
    pub reason: TransitionReason,
    pub data: Option<TransitionData>,
}

impl TransitionResult {
    fn to(new_state: ListenState, reason: TransitionReason) -> Option<Self> {
        Some(Self {
            new_state,
            reason,
            data: None,
        })
    }

    /// The committed utterance, if this transition produced one
    pub fn utterance(&self) -> Option<&str> {
        match &self.data {
            Some(TransitionData::Utterance { text }) => Some(text),
            _ => None,
        }
    }
}

/// Listening state machine
pub struct ListenStateMachine {
    state: ListenState,
    transcript: String,
    final_received: bool,
}

impl ListenStateMachine {
    /// Creates a new state machine in the Idle state
    pub fn new() -> Self {
        Self {
            state: ListenState::Idle,
            transcript: String::new(),
            final_received: false,
        }
    }

    pub fn state(&self) -> ListenState {
        self.state
    }

    /// Text accumulated in the current session
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Whether a final transcript has armed the silence timer
    pub fn is_armed(&self) -> bool {
        self.final_received
    }

    /// Commit the transcript: Finalizing with the text, or Idle if blank
    fn commit(&self, reason: TransitionReason) -> Option<TransitionResult> {
        let text = self.transcript.trim();
        if text.is_empty() {
            return TransitionResult::to(ListenState::Idle, TransitionReason::NoSpeech);
        }
        Some(TransitionResult {
            new_state: ListenState::Finalizing,
            reason,
            data: Some(TransitionData::Utterance {
                text: text.to_string(),
            }),
        })
    }

    /// Process an event and return the transition result if a transition occurred
    ///
    /// Returns `None` if the event is not valid for the current state.
    pub fn process_event(&mut self, event: ListenEvent) -> Option<TransitionResult> {
        use ListenState::*;

        let transition = match (self.state, event) {
            (Idle, ListenEvent::Start { output_active }) => {
                if output_active {
                    None
                } else {
                    TransitionResult::to(Listening, TransitionReason::Started)
                }
            }

            (Listening | SilenceDetected, ListenEvent::Transcript { text, is_final }) => {
                self.transcript = text;
                self.final_received |= is_final;
                TransitionResult::to(Listening, TransitionReason::Speech)
            }
            (Listening, ListenEvent::SilenceElapsed) if self.final_received => {
                TransitionResult::to(SilenceDetected, TransitionReason::Silence)
            }
            (SilenceDetected, ListenEvent::Finalize) => self.commit(TransitionReason::Silence),
            (Listening | SilenceDetected, ListenEvent::SessionEnded) => {
                self.commit(TransitionReason::SessionEnded)
            }
            (Listening | SilenceDetected, ListenEvent::ListenTimeout) => {
                self.commit(TransitionReason::ListenTimeout)
            }
            (Listening | SilenceDetected, ListenEvent::OutputStarted) => {
                TransitionResult::to(Idle, TransitionReason::OutputStarted)
            }
            (Listening | SilenceDetected, ListenEvent::TransientError { message }) => {
                TransitionResult::to(Idle, TransitionReason::RecognitionError { message })
            }

            (Finalizing, ListenEvent::Dispatched) => {
                TransitionResult::to(Idle, TransitionReason::Dispatched)
            }

            (Disabled, _) => None,
            (_, ListenEvent::PermanentError { message }) => Some(TransitionResult {
                new_state: Disabled,
                reason: TransitionReason::PermissionFailure {
                    message: message.clone(),
                },
                data: Some(TransitionData::Error { message }),
            }),
            (_, ListenEvent::Stop) => TransitionResult::to(Disabled, TransitionReason::Stopped),

            _ => None,
        };

        if let Some(ref result) = transition {
            self.apply_transition(result);
        }

        transition
    }

    /// Apply a transition, updating internal state
    fn apply_transition(&mut self, result: &TransitionResult) {
        let previous_state = self.state;
        self.state = result.new_state;

        if previous_state == result.new_state {
            tracing::trace!("Listen state unchanged: {:?}", result.new_state);
            return;
        }

        if matches!(result.new_state, ListenState::Idle | ListenState::Disabled) {
            self.transcript.clear();
            self.final_received = false;
        }

        tracing::info!(
            "Listen state transition: {:?} -> {:?} (reason: {:?})",
            previous_state,
            result.new_state,
            result.reason
        );
    }

    /// Reset the state machine to Idle
    pub fn reset(&mut self) {
        self.state = ListenState::Idle;
        self.transcript.clear();
        self.final_received = false;
        tracing::info!("Listen state machine reset to Idle");
    }
}

impl Default for ListenStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(sm: &mut ListenStateMachine) {
        sm.process_event(ListenEvent::Start {
            output_active: false,
        });
    }

    fn hear(sm: &mut ListenStateMachine, text: &str, is_final: bool) {
        sm.process_event(ListenEvent::Transcript {
            text: text.to_string(),
            is_final,
        });
    }

    #[test]
    fn test_initial_state_is_idle() {
        let sm = ListenStateMachine::new();
        assert_eq!(sm.state(), ListenState::Idle);
    }

    #[test]
    fn test_start_transitions_to_listening() {
        let mut sm = ListenStateMachine::new();
        let result = sm.process_event(ListenEvent::Start {
            output_active: false,
        });
        assert_eq!(result.unwrap().new_state, ListenState::Listening);
        assert_eq!(sm.state(), ListenState::Listening);
    }

    #[test]
    fn test_start_rejected_while_output_active() {
        let mut sm = ListenStateMachine::new();
        let result = sm.process_event(ListenEvent::Start {
            output_active: true,
        });
        assert!(result.is_none());
        assert_eq!(sm.state(), ListenState::Idle);
    }

    #[test]
    fn test_start_rejected_while_listening() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        let result = sm.process_event(ListenEvent::Start {
            output_active: false,
        });
        assert!(result.is_none());
    }

    #[test]
    fn test_transcript_replaces_text() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        hear(&mut sm, "how", false);
        hear(&mut sm, "how long", false);
        assert_eq!(sm.transcript(), "how long");
        assert!(!sm.is_armed());
        hear(&mut sm, "how long now", true);
        assert!(sm.is_armed());
    }

    #[test]
    fn test_silence_requires_final_transcript() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        hear(&mut sm, "next", false);
        assert!(sm.process_event(ListenEvent::SilenceElapsed).is_none());

        hear(&mut sm, "next", true);
        let result = sm.process_event(ListenEvent::SilenceElapsed).unwrap();
        assert_eq!(result.new_state, ListenState::SilenceDetected);

        let result = sm.process_event(ListenEvent::Finalize).unwrap();
        assert_eq!(result.new_state, ListenState::Finalizing);
        assert_eq!(result.utterance(), Some("next"));
    }

    #[test]
    fn test_session_end_commits_transcript() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        hear(&mut sm, "  pause  ", false);
        let result = sm.process_event(ListenEvent::SessionEnded).unwrap();
        assert_eq!(result.new_state, ListenState::Finalizing);
        assert_eq!(result.utterance(), Some("pause"));
    }

    #[test]
    fn test_session_end_without_speech_returns_to_idle() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        let result = sm.process_event(ListenEvent::SessionEnded).unwrap();
        assert_eq!(result.new_state, ListenState::Idle);
        assert_eq!(result.reason, TransitionReason::NoSpeech);
    }

    #[test]
    fn test_dispatched_returns_to_idle_and_clears() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        hear(&mut sm, "next", true);
        sm.process_event(ListenEvent::SessionEnded);
        let result = sm.process_event(ListenEvent::Dispatched).unwrap();
        assert_eq!(result.new_state, ListenState::Idle);
        assert_eq!(sm.transcript(), "");
        assert!(!sm.is_armed());
    }

    #[test]
    fn test_output_started_aborts_session() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        hear(&mut sm, "what", false);
        let result = sm.process_event(ListenEvent::OutputStarted).unwrap();
        assert_eq!(result.new_state, ListenState::Idle);
        assert_eq!(sm.transcript(), "");
    }

    #[test]
    fn test_transient_error_returns_to_idle() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        let result = sm
            .process_event(ListenEvent::TransientError {
                message: "no match".to_string(),
            })
            .unwrap();
        assert_eq!(result.new_state, ListenState::Idle);
        assert!(matches!(
            result.reason,
            TransitionReason::RecognitionError { .. }
        ));
    }

    #[test]
    fn test_permanent_error_disables() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        let result = sm
            .process_event(ListenEvent::PermanentError {
                message: "denied".to_string(),
            })
            .unwrap();
        assert_eq!(result.new_state, ListenState::Disabled);
        assert!(result.data.is_some());

        // Disabled is terminal; a new loop is spawned to listen again
        assert!(sm
            .process_event(ListenEvent::Start {
                output_active: false
            })
            .is_none());
        assert!(sm.process_event(ListenEvent::Stop).is_none());
        assert_eq!(sm.state(), ListenState::Disabled);
    }

    #[test]
    fn test_stop_from_any_active_state() {
        for prepare in [0, 1, 2] {
            let mut sm = ListenStateMachine::new();
            if prepare >= 1 {
                start(&mut sm);
            }
            if prepare >= 2 {
                hear(&mut sm, "next", true);
                sm.process_event(ListenEvent::SessionEnded);
            }
            let result = sm.process_event(ListenEvent::Stop).unwrap();
            assert_eq!(result.new_state, ListenState::Disabled);
            assert_eq!(sm.transcript(), "");
        }
    }

    #[test]
    fn test_invalid_transition_returns_none() {
        let mut sm = ListenStateMachine::new();
        assert!(sm.process_event(ListenEvent::SilenceElapsed).is_none());
        assert!(sm.process_event(ListenEvent::Dispatched).is_none());
        assert_eq!(sm.state(), ListenState::Idle);
    }

    #[test]
    fn test_capturing_states() {
        assert!(!ListenState::Idle.is_capturing());
        assert!(ListenState::Listening.is_capturing());
        assert!(ListenState::SilenceDetected.is_capturing());
        assert!(!ListenState::Finalizing.is_capturing());
        assert!(!ListenState::Disabled.is_capturing());
    }

    #[test]
    fn test_reset() {
        let mut sm = ListenStateMachine::new();
        start(&mut sm);
        hear(&mut sm, "next", true);
        sm.reset();
        assert_eq!(sm.state(), ListenState::Idle);
        assert_eq!(sm.transcript(), "");
    }
}
