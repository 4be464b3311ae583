//! Session model: the recipe being cooked, progress and conversation

use super::SessionError;
use crate::recipe::Recipe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Who a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// What a message is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    StepNavigation,
    TimerAlert,
    SystemNotification,
}

/// An entry in the session conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub content: String,
    pub role: MessageRole,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

impl ChatMessage {
    pub fn new(role: MessageRole, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
            kind,
        }
    }

    /// A question or remark from the cook
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, MessageKind::Text, content)
    }

    /// Something the assistant said
    pub fn assistant(kind: MessageKind, content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, kind, content)
    }
}

/// A cook-along in progress
#[derive(Debug, Clone)]
pub struct CookAlongSession {
    pub id: Uuid,
    pub recipe: Recipe,
    current_step_index: usize,
    pub is_paused: bool,
    pub is_completed: bool,
    pub started_at: DateTime<Utc>,
    timer_ids: Vec<Uuid>,
    messages: Vec<ChatMessage>,
    checked_ingredients: BTreeSet<String>,
}

impl CookAlongSession {
    /// Create a session positioned on the first step
    pub fn new(recipe: Recipe) -> Result<Self, SessionError> {
        if recipe.step_count() == 0 {
            return Err(SessionError::EmptyRecipe(recipe.title));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            recipe,
            current_step_index: 0,
            is_paused: false,
            is_completed: false,
            started_at: Utc::now(),
            timer_ids: Vec::new(),
            messages: Vec::new(),
            checked_ingredients: BTreeSet::new(),
        })
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn current_step_text(&self) -> Option<&str> {
        self.recipe.step(self.current_step_index)
    }

    pub fn step_count(&self) -> usize {
        self.recipe.step_count()
    }

    pub fn is_first_step(&self) -> bool {
        self.current_step_index == 0
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step_index + 1 >= self.step_count()
    }

    /// Move to the next step. Returns false on the last step.
    pub fn advance(&mut self) -> bool {
        if self.is_last_step() {
            return false;
        }
        self.current_step_index += 1;
        true
    }

    /// Move to the previous step. Returns false on the first step.
    pub fn go_back(&mut self) -> bool {
        if self.is_first_step() {
            return false;
        }
        self.current_step_index -= 1;
        true
    }

    /// Jump to a 0-based step
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        if index >= self.step_count() {
            return Err(SessionError::StepOutOfRange {
                index,
                count: self.step_count(),
            });
        }
        self.current_step_index = index;
        Ok(())
    }

    /// Fraction of the recipe done, counting the current step
    pub fn progress(&self) -> f32 {
        if self.is_completed {
            return 1.0;
        }
        (self.current_step_index + 1) as f32 / self.step_count() as f32
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The last `limit` messages, oldest first
    pub fn recent_messages(&self, limit: usize) -> Vec<ChatMessage> {
        let start = self.messages.len().saturating_sub(limit);
        self.messages[start..].to_vec()
    }

    pub fn record_timer(&mut self, id: Uuid) {
        self.timer_ids.push(id);
    }

    /// Timers created during this session, oldest first
    pub fn timer_ids(&self) -> &[Uuid] {
        &self.timer_ids
    }

    /// Check or uncheck an ingredient. Returns whether it is now checked.
    pub fn toggle_ingredient(&mut self, id: &str) -> Result<bool, SessionError> {
        if !self.recipe.has_ingredient(id) {
            return Err(SessionError::UnknownIngredient(id.to_string()));
        }
        if self.checked_ingredients.remove(id) {
            Ok(false)
        } else {
            self.checked_ingredients.insert(id.to_string());
            Ok(true)
        }
    }

    pub fn is_ingredient_checked(&self, id: &str) -> bool {
        self.checked_ingredients.contains(id)
    }

    pub fn checked_ingredients(&self) -> Vec<String> {
        self.checked_ingredients.iter().cloned().collect()
    }
}
