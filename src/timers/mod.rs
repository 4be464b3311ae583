//! Step timers
//!
//! Countdowns created when a narrated step mentions a duration. They run
//! independently of narration and listening and report through
//! [`TimerEvent`]s.

pub mod duration;
pub mod registry;
pub mod timer;

pub use duration::{describe_duration, detect_duration, format_clock};
pub use registry::{StepTimerRegistry, TimerError, TimerEvent};
pub use timer::{StepTimer, TimerSnapshot, TimerStatus};
