//! Events and read models published by the controller

use super::state::{PhaseEvent, SessionPhase};
use crate::handsfree::ListenerStatus;
use crate::timers::TimerSnapshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged {
        from: SessionPhase,
        to: SessionPhase,
        event: PhaseEvent,
    },
    TimerTick {
        id: Uuid,
        step_number: usize,
        remaining_seconds: u64,
    },
    TimerFinished {
        id: Uuid,
        step_number: usize,
        description: String,
    },
    HandsFreeDisabled {
        reason: String,
    },
    /// The session is gone; the screen hosting it can close
    Exited {
        recipe_id: String,
        graceful: bool,
    },
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub recipe_title: Option<String>,
    /// 0-based index of the current step
    pub step_index: Option<usize>,
    pub step_count: usize,
    pub step_text: Option<String>,
    pub progress: f32,
    pub is_paused: bool,
    pub is_completed: bool,
    pub hands_free: bool,
    pub listener: Option<ListenerStatus>,
    pub is_speaking: bool,
    pub timers: Vec<TimerSnapshot>,
    pub checked_ingredients: Vec<String>,
    pub message_count: usize,
}
