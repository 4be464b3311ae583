//! Hands-free listening mode
//!
//! Keeps the microphone open between narrations so the cook can drive the
//! session by voice. Listening pauses whenever the narrator speaks and
//! resumes after a short restart delay, so the assistant never hears itself.
//!
//! ## States
//!
//! 1. **IDLE** - Waiting for speech output to go quiet
//! 2. **LISTENING** - Recognition session open, collecting transcript chunks
//! 3. **SILENCE DETECTED** - A final chunk was followed by quiet
//! 4. **FINALIZING** - Utterance committed and handed to the controller
//! 5. **DISABLED** - Hands-free turned off or recognition unavailable
//!
//! ## State Transitions
//!
//! ```text
//!   ┌──────┐  quiet + delay  ┌───────────┐  silence  ┌──────────────────┐
//!   │ IDLE │────────────────►│ LISTENING │──────────►│ SILENCE DETECTED │
//!   └──────┘                 └───────────┘           └──────────────────┘
//!      ▲                       │       │                      │
//!      │ no speech / output /  │       │ session end          │ finalize
//!      │ transient error       │       ▼                      ▼
//!      │◄──────────────────────┘  ┌────────────┐◄─────────────┘
//!      │          dispatched      │ FINALIZING │
//!      │◄─────────────────────────└────────────┘
//!
//!   any ── stop / permission failure ──► DISABLED ── enable ──► IDLE
//! ```
//!
//! ## Usage
//!
//! [`ListenerHandle::spawn`] starts the loop; committed utterances arrive
//! as [`ListenerMessage::Utterance`] and the loop listens again once the
//! attached `done` sender fires or is dropped.

pub mod debounce;
pub mod listener;
pub mod state;

pub use debounce::CommandDebouncer;
pub use listener::{ListenerHandle, ListenerMessage, ListenerStatus, Utterance};
pub use state::{
    ListenEvent, ListenState, ListenStateMachine, TransitionData, TransitionReason,
    TransitionResult,
};
