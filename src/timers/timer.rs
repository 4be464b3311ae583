//! Step timer entity
//!
//! Remaining time is derived, never stored:
//! `duration - (elapsed_since_start - accumulated_pause)`, clamped to zero.
//! All methods take the current instant so the arithmetic is testable
//! without a clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Lifecycle of a step timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl TimerStatus {
    /// Running or paused
    pub fn is_active(&self) -> bool {
        matches!(self, TimerStatus::Running | TimerStatus::Paused)
    }
}

/// A countdown attached to a recipe step
#[derive(Debug, Clone)]
pub struct StepTimer {
    pub id: Uuid,
    /// 1-based step number
    pub step_number: usize,
    pub duration: Duration,
    pub description: String,
    pub status: TimerStatus,
    /// Wall-clock creation time, for display
    pub created_at: DateTime<Utc>,
    started: Instant,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl StepTimer {
    pub fn new(step_number: usize, duration: Duration, description: String, now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            step_number,
            duration,
            description,
            status: TimerStatus::Running,
            created_at: Utc::now(),
            started: now,
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    /// Time the countdown has actually run
    pub fn elapsed(&self, now: Instant) -> Duration {
        let current_pause = self
            .paused_at
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default();
        now.saturating_duration_since(self.started)
            .saturating_sub(self.paused_total)
            .saturating_sub(current_pause)
    }

    /// Time left; zero once completed or cancelled
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.status {
            TimerStatus::Completed | TimerStatus::Cancelled => Duration::ZERO,
            TimerStatus::Running | TimerStatus::Paused => {
                self.duration.saturating_sub(self.elapsed(now))
            }
        }
    }

    /// Freeze the countdown. Returns false if the timer was not running.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.status = TimerStatus::Paused;
        self.paused_at = Some(now);
        true
    }

    /// Continue a paused countdown. Returns false if it was not paused.
    pub fn resume(&mut self, now: Instant) -> bool {
        if self.status != TimerStatus::Paused {
            return false;
        }
        if let Some(at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(at);
        }
        self.status = TimerStatus::Running;
        true
    }

    /// Mark as finished. Only a running timer can complete.
    pub fn complete(&mut self) -> bool {
        if self.status != TimerStatus::Running {
            return false;
        }
        self.status = TimerStatus::Completed;
        true
    }

    /// Stop the countdown for good. Returns false if already finished.
    pub fn cancel(&mut self) -> bool {
        if !self.status.is_active() {
            return false;
        }
        self.status = TimerStatus::Cancelled;
        self.paused_at = None;
        true
    }

    /// Serializable view for the presentation layer
    pub fn snapshot(&self, now: Instant) -> TimerSnapshot {
        TimerSnapshot {
            id: self.id,
            step_number: self.step_number,
            description: self.description.clone(),
            status: self.status,
            duration_seconds: self.duration.as_secs(),
            remaining_seconds: self.remaining(now).as_secs_f64().ceil() as u64,
            created_at: self.created_at,
        }
    }
}

/// Point-in-time view of a timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub id: Uuid,
    pub step_number: usize,
    pub description: String,
    pub status: TimerStatus,
    pub duration_seconds: u64,
    pub remaining_seconds: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn timer(now: Instant) -> StepTimer {
        StepTimer::new(2, secs(600), "Simmer for 10 minutes".to_string(), now)
    }

    #[test]
    fn test_remaining_starts_at_duration() {
        let now = Instant::now();
        let t = timer(now);
        assert_eq!(t.remaining(now), secs(600));
        assert_eq!(t.status, TimerStatus::Running);
    }

    #[test]
    fn test_remaining_decreases_while_running() {
        let start = Instant::now();
        let t = timer(start);
        let a = t.remaining(start + secs(10));
        let b = t.remaining(start + secs(20));
        assert_eq!(a, secs(590));
        assert_eq!(b, secs(580));
    }

    #[test]
    fn test_remaining_clamped_at_zero() {
        let start = Instant::now();
        let t = timer(start);
        assert_eq!(t.remaining(start + secs(10_000)), Duration::ZERO);
    }

    #[test]
    fn test_remaining_frozen_while_paused() {
        let start = Instant::now();
        let mut t = timer(start);
        assert!(t.pause(start + secs(100)));
        assert_eq!(t.remaining(start + secs(100)), secs(500));
        assert_eq!(t.remaining(start + secs(400)), secs(500));

        assert!(t.resume(start + secs(400)));
        assert_eq!(t.remaining(start + secs(400)), secs(500));
        assert_eq!(t.remaining(start + secs(410)), secs(490));
    }

    #[test]
    fn test_repeated_pauses_accumulate() {
        let start = Instant::now();
        let mut t = timer(start);
        t.pause(start + secs(10));
        t.resume(start + secs(20));
        t.pause(start + secs(30));
        t.resume(start + secs(50));
        // 60s wall time, 30s paused
        assert_eq!(t.elapsed(start + secs(60)), secs(30));
    }

    #[test]
    fn test_invalid_transitions() {
        let start = Instant::now();
        let mut t = timer(start);
        assert!(!t.resume(start));
        assert!(t.pause(start));
        assert!(!t.pause(start));
        assert!(!t.complete());
        assert!(t.cancel());
        assert!(!t.cancel());
        assert!(!t.resume(start));
    }

    #[test]
    fn test_finished_timers_have_zero_remaining() {
        let start = Instant::now();
        let mut completed = timer(start);
        assert!(completed.complete());
        assert_eq!(completed.remaining(start), Duration::ZERO);

        let mut cancelled = timer(start);
        assert!(cancelled.cancel());
        assert_eq!(cancelled.remaining(start), Duration::ZERO);
    }

    #[test]
    fn test_snapshot_rounds_up() {
        let start = Instant::now();
        let t = timer(start);
        let snap = t.snapshot(start + Duration::from_millis(500));
        assert_eq!(snap.remaining_seconds, 600);
        assert_eq!(snap.duration_seconds, 600);
        assert_eq!(snap.step_number, 2);
    }
}
