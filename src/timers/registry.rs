//! Concurrent step timers
//!
//! Each timer counts down on its own tokio task and reports through a
//! single event channel. Cancelling a timer cancels its token, which ends
//! the task; dropping the registry cancels every task it spawned.

use super::timer::{StepTimer, TimerSnapshot, TimerStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Shortest countdown tick; a zero tick would never yield between updates
const MIN_TICK: Duration = Duration::from_millis(1);

/// Progress reported by running timers
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    /// Periodic countdown update
    Tick {
        id: Uuid,
        step_number: usize,
        remaining: Duration,
    },
    /// The countdown reached zero
    Finished {
        id: Uuid,
        step_number: usize,
        description: String,
    },
}

/// Timer operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    #[error("Timer not found: {0}")]
    NotFound(Uuid),

    #[error("Cannot {action} timer {id} while it is {status:?}")]
    InvalidState {
        id: Uuid,
        action: &'static str,
        status: TimerStatus,
    },
}

struct TimerSlot {
    timer: StepTimer,
    token: CancellationToken,
}

type Slots = Arc<Mutex<Vec<TimerSlot>>>;

/// Owns every step timer of a session
pub struct StepTimerRegistry {
    slots: Slots,
    events: mpsc::UnboundedSender<TimerEvent>,
    root: CancellationToken,
    tick: Duration,
}

impl StepTimerRegistry {
    /// Create a registry ticking every `tick`, with the receiving end of
    /// its event channel
    pub fn new(tick: Duration) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let registry = Self {
            slots: Arc::new(Mutex::new(Vec::new())),
            events,
            root: CancellationToken::new(),
            tick: tick.max(MIN_TICK),
        };
        (registry, rx)
    }

    /// Start a countdown for a step. Must be called inside a tokio runtime.
    pub fn start(&self, step_number: usize, duration: Duration, description: String) -> Uuid {
        let timer = StepTimer::new(step_number, duration, description, Instant::now());
        let id = timer.id;
        let token = self.root.child_token();

        tracing::info!(
            "Starting {:?} timer {} for step {}",
            duration,
            id,
            step_number
        );

        self.slots.lock().push(TimerSlot {
            timer,
            token: token.clone(),
        });

        tokio::spawn(run_countdown(
            id,
            self.slots.clone(),
            self.events.clone(),
            token,
            self.tick,
        ));

        id
    }

    fn with_timer<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut TimerSlot) -> Result<T, TimerError>,
    ) -> Result<T, TimerError> {
        let mut slots = self.slots.lock();
        let slot = slots
            .iter_mut()
            .find(|s| s.timer.id == id)
            .ok_or(TimerError::NotFound(id))?;
        f(slot)
    }

    /// Freeze a running timer
    pub fn pause(&self, id: Uuid) -> Result<(), TimerError> {
        self.with_timer(id, |slot| {
            if slot.timer.pause(Instant::now()) {
                Ok(())
            } else {
                Err(TimerError::InvalidState {
                    id,
                    action: "pause",
                    status: slot.timer.status,
                })
            }
        })
    }

    /// Continue a paused timer
    pub fn resume(&self, id: Uuid) -> Result<(), TimerError> {
        self.with_timer(id, |slot| {
            if slot.timer.resume(Instant::now()) {
                Ok(())
            } else {
                Err(TimerError::InvalidState {
                    id,
                    action: "resume",
                    status: slot.timer.status,
                })
            }
        })
    }

    /// Cancel a running or paused timer and stop its task
    pub fn cancel(&self, id: Uuid) -> Result<(), TimerError> {
        self.with_timer(id, |slot| {
            if slot.timer.cancel() {
                slot.token.cancel();
                tracing::info!("Cancelled timer {}", id);
                Ok(())
            } else {
                Err(TimerError::InvalidState {
                    id,
                    action: "cancel",
                    status: slot.timer.status,
                })
            }
        })
    }

    /// Pause every running timer, returning how many were paused
    pub fn pause_all(&self) -> usize {
        let now = Instant::now();
        let paused = self
            .slots
            .lock()
            .iter_mut()
            .map(|slot| slot.timer.pause(now))
            .filter(|paused| *paused)
            .count();
        tracing::debug!("Paused {} timer(s)", paused);
        paused
    }

    /// Resume every paused timer, returning how many were resumed
    pub fn resume_all(&self) -> usize {
        let now = Instant::now();
        let resumed = self
            .slots
            .lock()
            .iter_mut()
            .map(|slot| slot.timer.resume(now))
            .filter(|resumed| *resumed)
            .count();
        tracing::debug!("Resumed {} timer(s)", resumed);
        resumed
    }

    /// Cancel every active timer, returning how many were cancelled
    ///
    /// Safe to call repeatedly.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for slot in self.slots.lock().iter_mut() {
            if slot.timer.cancel() {
                cancelled += 1;
            }
            slot.token.cancel();
        }
        if cancelled > 0 {
            tracing::info!("Cancelled {} timer(s)", cancelled);
        }
        cancelled
    }

    /// Cancel everything and forget all timers
    pub fn clear(&self) {
        self.cancel_all();
        self.slots.lock().clear();
    }

    pub fn get(&self, id: Uuid) -> Option<StepTimer> {
        self.slots
            .lock()
            .iter()
            .find(|s| s.timer.id == id)
            .map(|s| s.timer.clone())
    }

    /// All timers in creation order, finished ones included
    pub fn timers(&self) -> Vec<StepTimer> {
        self.slots.lock().iter().map(|s| s.timer.clone()).collect()
    }

    /// Running and paused timers
    pub fn active(&self) -> Vec<StepTimer> {
        self.slots
            .lock()
            .iter()
            .filter(|s| s.timer.status.is_active())
            .map(|s| s.timer.clone())
            .collect()
    }

    pub fn snapshots(&self) -> Vec<TimerSnapshot> {
        let now = Instant::now();
        self.slots
            .lock()
            .iter()
            .map(|s| s.timer.snapshot(now))
            .collect()
    }

    /// Whether the step already has a timer that was not cancelled
    pub fn has_timer_for_step(&self, step_number: usize) -> bool {
        self.slots.lock().iter().any(|s| {
            s.timer.step_number == step_number && s.timer.status != TimerStatus::Cancelled
        })
    }
}

impl Drop for StepTimerRegistry {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Per-timer countdown task
async fn run_countdown(
    id: Uuid,
    slots: Slots,
    events: mpsc::UnboundedSender<TimerEvent>,
    token: CancellationToken,
    tick: Duration,
) {
    loop {
        let wait = {
            let slots = slots.lock();
            match slots.iter().find(|s| s.timer.id == id) {
                Some(slot) => match slot.timer.status {
                    TimerStatus::Running => slot.timer.remaining(Instant::now()).min(tick),
                    TimerStatus::Paused => tick,
                    TimerStatus::Completed | TimerStatus::Cancelled => break,
                },
                None => break,
            }
        };

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        let event = {
            let mut slots = slots.lock();
            let Some(slot) = slots.iter_mut().find(|s| s.timer.id == id) else {
                break;
            };
            if slot.timer.status != TimerStatus::Running {
                continue;
            }
            let remaining = slot.timer.remaining(Instant::now());
            if remaining.is_zero() {
                slot.timer.complete();
                TimerEvent::Finished {
                    id,
                    step_number: slot.timer.step_number,
                    description: slot.timer.description.clone(),
                }
            } else {
                TimerEvent::Tick {
                    id,
                    step_number: slot.timer.step_number,
                    remaining,
                }
            }
        };

        let finished = matches!(event, TimerEvent::Finished { .. });
        if finished {
            tracing::info!("Timer {} finished", id);
        }
        if events.send(event).is_err() {
            tracing::debug!("Timer event receiver dropped, stopping timer {}", id);
            break;
        }
        if finished {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_then_finishes() {
        let (registry, mut rx) = StepTimerRegistry::new(secs(1));
        let id = registry.start(1, secs(3), "Boil the eggs".to_string());

        let mut ticks = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                TimerEvent::Tick { remaining, .. } => ticks.push(remaining),
                TimerEvent::Finished {
                    id: finished,
                    step_number,
                    description,
                } => {
                    assert_eq!(finished, id);
                    assert_eq!(step_number, 1);
                    assert_eq!(description, "Boil the eggs");
                    break;
                }
            }
        }

        assert_eq!(ticks, vec![secs(2), secs(1)]);
        assert_eq!(registry.get(id).unwrap().status, TimerStatus::Completed);
        assert!(registry.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_is_monotonic_while_running() {
        let (registry, mut rx) = StepTimerRegistry::new(secs(1));
        registry.start(1, secs(5), "Rest".to_string());

        let mut last = secs(5);
        while let Some(event) = rx.recv().await {
            match event {
                TimerEvent::Tick { remaining, .. } => {
                    assert!(remaining <= last);
                    last = remaining;
                }
                TimerEvent::Finished { .. } => break,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_remaining() {
        let (registry, _rx) = StepTimerRegistry::new(secs(1));
        let id = registry.start(2, secs(10), "Simmer".to_string());

        tokio::time::sleep(secs(3)).await;
        registry.pause(id).unwrap();
        let frozen = registry.get(id).unwrap().remaining(Instant::now());
        assert_eq!(frozen, secs(7));

        tokio::time::sleep(secs(60)).await;
        let timer = registry.get(id).unwrap();
        assert_eq!(timer.status, TimerStatus::Paused);
        assert_eq!(timer.remaining(Instant::now()), secs(7));

        registry.resume(id).unwrap();
        tokio::time::sleep(secs(2)).await;
        assert_eq!(registry.get(id).unwrap().remaining(Instant::now()), secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_events() {
        let (registry, mut rx) = StepTimerRegistry::new(secs(1));
        let id = registry.start(1, secs(3), "Stir".to_string());

        registry.cancel(id).unwrap();
        let timer = registry.get(id).unwrap();
        assert_eq!(timer.status, TimerStatus::Cancelled);
        assert_eq!(timer.remaining(Instant::now()), Duration::ZERO);

        tokio::time::sleep(secs(10)).await;
        assert!(rx.try_recv().is_err());

        assert!(matches!(
            registry.cancel(id),
            Err(TimerError::InvalidState { action: "cancel", .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_timers_are_independent() {
        let (registry, mut rx) = StepTimerRegistry::new(secs(1));
        let short = registry.start(1, secs(2), "Short".to_string());
        let long = registry.start(2, secs(4), "Long".to_string());

        let mut finished = Vec::new();
        while finished.len() < 2 {
            if let Some(TimerEvent::Finished { id, .. }) = rx.recv().await {
                finished.push(id);
            }
        }
        assert_eq!(finished, vec![short, long]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_all_and_resume_all() {
        let (registry, _rx) = StepTimerRegistry::new(secs(1));
        let a = registry.start(1, secs(30), "A".to_string());
        let b = registry.start(2, secs(30), "B".to_string());
        registry.cancel(b).unwrap();

        tokio::time::sleep(secs(5)).await;
        assert_eq!(registry.pause_all(), 1);
        assert_eq!(registry.pause_all(), 0);
        assert_eq!(registry.get(a).unwrap().status, TimerStatus::Paused);

        tokio::time::sleep(secs(60)).await;
        assert_eq!(registry.get(a).unwrap().remaining(Instant::now()), secs(25));

        assert_eq!(registry.resume_all(), 1);
        assert_eq!(registry.resume_all(), 0);
        assert_eq!(registry.get(a).unwrap().status, TimerStatus::Running);
        assert_eq!(registry.get(b).unwrap().status, TimerStatus::Cancelled);

        tokio::time::sleep(secs(5)).await;
        assert_eq!(registry.get(a).unwrap().remaining(Instant::now()), secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_tick_is_clamped() {
        let (registry, mut rx) = StepTimerRegistry::new(Duration::ZERO);
        let started = Instant::now();
        registry.start(1, Duration::from_millis(5), "Sear".to_string());

        let mut ticks = 0;
        loop {
            match rx.recv().await.unwrap() {
                TimerEvent::Tick { .. } => ticks += 1,
                TimerEvent::Finished { .. } => break,
            }
        }
        assert!(ticks <= 5, "{} ticks for a 5ms timer", ticks);
        assert!(started.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_is_idempotent() {
        let (registry, _rx) = StepTimerRegistry::new(secs(1));
        registry.start(1, secs(30), "A".to_string());
        registry.start(2, secs(30), "B".to_string());

        assert_eq!(registry.cancel_all(), 2);
        assert_eq!(registry.cancel_all(), 0);
        assert!(registry.active().is_empty());
        assert_eq!(registry.timers().len(), 2);

        registry.clear();
        assert!(registry.timers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_lookup_by_step() {
        let (registry, _rx) = StepTimerRegistry::new(secs(1));
        let id = registry.start(3, secs(30), "Bake".to_string());
        assert!(registry.has_timer_for_step(3));
        assert!(!registry.has_timer_for_step(2));

        registry.cancel(id).unwrap();
        assert!(!registry.has_timer_for_step(3));
    }

    #[test]
    fn test_unknown_timer() {
        let (registry, _rx) = StepTimerRegistry::new(secs(1));
        let id = Uuid::new_v4();
        assert_eq!(registry.pause(id), Err(TimerError::NotFound(id)));
        assert!(registry.get(id).is_none());
    }
}
