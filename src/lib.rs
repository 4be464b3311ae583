//! Cook-along - hands-free voice sessions for following a recipe
//!
//! A [`CookAlongController`] reads recipe steps aloud, listens for voice
//! commands between utterances, runs timers for steps that mention a
//! duration and passes free-form questions to an answer service.
//! Speech recognition and synthesis are supplied by the host through the
//! [`speech::SpeechInput`] and [`speech::SpeechOutput`] traits.

pub mod answer;
pub mod command;
pub mod config;
pub mod handsfree;
pub mod logging;
pub mod recipe;
pub mod session;
pub mod speech;
pub mod timers;

pub use command::{interpret, VoiceCommand};
pub use config::{ConfigStore, CookAlongConfig};
pub use recipe::{Ingredient, Recipe, RecipeError};
pub use session::{
    ControlMessage, CookAlongController, SessionError, SessionEvent, SessionPhase,
    SessionSnapshot,
};
