//! Time management subsystem
//!
//! Tick source for the scheduler and the deferred wakeup it arms.

pub mod clock;
pub mod timer;

// Re-exports
pub use clock::{us_to_ticks, ClockSource, ManualClock, Ticks};
pub use timer::{DeferredTimer, SoftTimer, WakeCallback};
