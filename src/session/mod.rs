//! Cook-along session orchestration
//!
//! The [`CookAlongController`] owns the session model and coordinates the
//! narrator, the hands-free listener, step timers and the answer service.
//!
//! ## Phases
//!
//! ```text
//! NOT STARTED ─► WELCOME ─► AWAITING START ─► STEP IN PROGRESS ◄─► PAUSED
//!                                                   │                │
//!                                                   ▼                │
//!                                               COMPLETED ◄──────────┘
//!
//! any active phase ── exit ──► EXITING ── teardown ──► NOT STARTED
//! ```

pub mod controller;
pub mod events;
pub mod model;
pub mod script;
pub mod state;

pub use controller::{ControlMessage, CookAlongController};
pub use events::{SessionEvent, SessionSnapshot};
pub use model::{ChatMessage, CookAlongSession, MessageKind, MessageRole};
pub use state::{PhaseEvent, PhaseTransition, SessionPhase, SessionStateMachine};

/// Session operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No active cook-along session")]
    NoActiveSession,

    #[error("Recipe '{0}' has no steps")]
    EmptyRecipe(String),

    #[error("Cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },

    #[error("Step {index} is out of range (recipe has {count} steps)")]
    StepOutOfRange { index: usize, count: usize },

    #[error("Unknown ingredient: {0}")]
    UnknownIngredient(String),
}
