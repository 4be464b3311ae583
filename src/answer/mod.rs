//! Question answering
//!
//! Free-form questions asked during a session go to an [`AnswerService`].
//! The service is a black box to the controller; [`OllamaAnswerService`]
//! is the default implementation backed by a local Ollama server.

pub mod ollama;
pub mod prompt;

pub use ollama::{AnswerError, OllamaAnswerService};

use crate::recipe::Recipe;
use crate::session::ChatMessage;
use async_trait::async_trait;

/// Everything an answer service knows about the question
#[derive(Debug, Clone)]
pub struct QuestionContext {
    pub question: String,
    pub recipe: Recipe,
    /// 0-based index of the step being cooked
    pub step_index: usize,
    /// Conversation so far, oldest first, not including the question
    pub history: Vec<ChatMessage>,
}

impl QuestionContext {
    /// Text of the step being cooked
    pub fn current_step(&self) -> Option<&str> {
        self.recipe.step(self.step_index)
    }
}

/// Answers questions about the recipe being cooked
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Produce a reply suitable for reading aloud
    async fn answer(&self, context: &QuestionContext) -> anyhow::Result<String>;
}
