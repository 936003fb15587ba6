//! # umbra-scheduler: Virtual-time scheduling for `Umbra`
//!
//! Simulated event loops run on virtual time that only moves when a test
//! asks it to. That makes handler/looper style asynchronous code fully
//! reproducible: the same posts and the same advances always produce the
//! same execution order.
//!
//! ## Key Concepts
//!
//! - **[`TaskQueue`]**: Priority queue ordered by `(time, lane, sequence)`
//! - **[`VirtualClock`]**: Monotonic millisecond clock private to one scheduler
//! - **[`Scheduler`]**: Shared, pausable handle that drives a queue and clock
//! - **[`LooperTable`]**: One scheduler per virtual thread, plus the main-thread designation

mod clock;
mod error;
mod looper;
mod queue;
mod scheduler;

pub use clock::VirtualClock;
pub use error::SchedulerError;
pub use looper::LooperTable;
pub use queue::{Lane, ScheduledTask, Task, TaskId, TaskQueue};
pub use scheduler::Scheduler;
