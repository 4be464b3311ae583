//! Speech input and output channels
//!
//! The platform recogniser and synthesiser sit behind the [`SpeechInput`]
//! and [`SpeechOutput`] traits. Output always goes through the
//! [`Narrator`], which owns the synthesiser for the lifetime of a
//! controller and serialises utterances.

pub mod console;
pub mod input;
pub mod memory;
pub mod narrator;
pub mod output;

pub use console::{ConsoleSpeechInput, ConsoleSpeechOutput};
pub use input::{SpeechInput, SpeechInputError, SpeechInputEvent};
pub use memory::{MemorySpeechInput, MemorySpeechOutput};
pub use narrator::{NarrationError, Narrator};
pub use output::{SpeechOutput, SpeechOutputError};
