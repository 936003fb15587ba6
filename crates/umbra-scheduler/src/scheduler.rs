//! Deterministic, pausable scheduler standing in for a thread's event loop.
//!
//! # States
//!
//! - **Unpaused** (initial): a task posted with no delay runs inline,
//!   before `post` returns.
//! - **Paused**: every posted task waits in the queue until the driving
//!   test advances virtual time or unpauses the scheduler.
//!
//! # Re-entrancy
//!
//! Tasks run without the scheduler lock held, so a running task may post
//! more work. Work posted while a task is executing is always queued and
//! picked up by the drain loop that is already running; tasks never run
//! nested inside `post`.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use umbra_scheduler::Scheduler;
//!
//! let scheduler = Scheduler::new();
//! let log = Arc::new(Mutex::new(Vec::new()));
//! scheduler.pause();
//!
//! for (name, delay) in [("a", 10), ("b", 0), ("c", 5)] {
//!     let log = Arc::clone(&log);
//!     scheduler.post_delayed(move || log.lock().unwrap().push(name), delay);
//! }
//!
//! scheduler.advance_to(10);
//! assert_eq!(*log.lock().unwrap(), vec!["b", "c", "a"]);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clock::VirtualClock;
use crate::queue::{Lane, TaskId, TaskQueue};

#[derive(Debug, Default)]
struct SchedulerState {
    queue: TaskQueue,
    clock: VirtualClock,
    paused: bool,
    /// Number of tasks currently on the call stack.
    executing: u32,
}

/// Shared handle to a virtual-time scheduler.
///
/// Cloning the handle shares the underlying queue and clock.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<Mutex<SchedulerState>>,
}

/// Decrements the executing count even if the task panics.
struct ExecutingGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.scheduler.state();
        state.executing = state.executing.saturating_sub(1);
    }
}

impl Scheduler {
    /// Creates an unpaused scheduler at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        // Tasks never run under this lock, so a poisoned guard still holds
        // consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Posts a task to run now.
    ///
    /// If the scheduler is unpaused and no task is currently executing, the
    /// task runs before this call returns. Posted from inside a running
    /// task, even on an unpaused scheduler, it is queued instead and runs
    /// after that task returns, as part of the same drain.
    pub fn post<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_delayed(task, 0)
    }

    /// Posts a task to run `delay_ms` after the current virtual time.
    pub fn post_delayed<F>(&self, task: F, delay_ms: u64) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(task), delay_ms, Lane::Normal)
    }

    /// Posts a task ahead of every other task due now.
    pub fn post_at_front<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(task), 0, Lane::Front)
    }

    fn enqueue(&self, task: crate::Task, delay_ms: u64, lane: Lane) -> TaskId {
        let (id, run_inline) = {
            let mut state = self.state();
            let time_ms = state.clock.after(delay_ms);
            let id = state.queue.push(time_ms, lane, task);
            let run_inline = !state.paused && delay_ms == 0 && state.executing == 0;
            (id, run_inline)
        };

        if run_inline {
            let now = self.current_time();
            self.drain_until(now);
        }
        id
    }

    /// Pauses the scheduler; posted tasks queue until time is advanced.
    pub fn pause(&self) {
        self.state().paused = true;
    }

    /// Unpauses the scheduler and runs every task already due.
    pub fn unpause(&self) {
        let now = {
            let mut state = self.state();
            state.paused = false;
            state.clock.now()
        };
        self.drain_until(now);
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    /// Returns true while a task of this scheduler is running.
    pub fn is_executing(&self) -> bool {
        self.state().executing > 0
    }

    /// Current virtual time in milliseconds.
    pub fn current_time(&self) -> u64 {
        self.state().clock.now()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.state().queue.len()
    }

    /// Time of the earliest queued task, if any.
    pub fn next_task_time(&self) -> Option<u64> {
        self.state().queue.next_time()
    }

    /// Runs every task due at or before `time_ms`, then moves the clock to
    /// `time_ms`.
    ///
    /// Tasks posted by running tasks are run within the same call when they
    /// are due by `time_ms`. A task that keeps re-posting itself with zero
    /// delay never lets this call return.
    ///
    /// Returns the number of tasks run.
    pub fn advance_to(&self, time_ms: u64) -> usize {
        let ran = self.drain_until(time_ms);
        self.state().clock.advance_to(time_ms);
        ran
    }

    /// Advances the clock by `delay_ms`, running everything that comes due.
    pub fn advance_by(&self, delay_ms: u64) -> usize {
        let target = self.state().clock.after(delay_ms);
        self.advance_to(target)
    }

    /// Advances to the time of the earliest queued task.
    ///
    /// Returns false if the queue was empty.
    pub fn advance_to_next_posted(&self) -> bool {
        match self.next_task_time() {
            Some(time_ms) => {
                self.advance_to(time_ms);
                true
            }
            None => false,
        }
    }

    /// Advances to the time of the latest queued task, running everything.
    pub fn advance_to_last_posted(&self) -> usize {
        let last = self.state().queue.last_time();
        last.map_or(0, |time_ms| self.advance_to(time_ms))
    }

    /// Runs the earliest queued task whatever its due time.
    ///
    /// The clock moves forward to the task's due time if it is later than
    /// now. Returns false if the queue was empty.
    pub fn run_one_task(&self) -> bool {
        let next = {
            let mut state = self.state();
            let Some(task) = state.queue.pop() else {
                return false;
            };
            state.clock.advance_to(task.time_ms);
            state.executing += 1;
            task
        };

        let _guard = ExecutingGuard { scheduler: self };
        next.run();
        true
    }

    /// Discards all pending tasks, returns the clock to zero and restores
    /// the initial unpaused state.
    pub fn reset(&self) {
        let mut state = self.state();
        let discarded = state.queue.len();
        state.queue.clear();
        state.clock.reset();
        state.paused = false;
        if discarded > 0 {
            tracing::debug!(discarded, "scheduler reset discarded pending tasks");
        }
    }

    /// Pops and runs due tasks one at a time, releasing the lock around
    /// each task.
    fn drain_until(&self, deadline_ms: u64) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut state = self.state();
                let Some(task) = state.queue.pop_due(deadline_ms) else {
                    break;
                };
                state.clock.advance_to(task.time_ms);
                state.executing += 1;
                task
            };

            let _guard = ExecutingGuard { scheduler: self };
            next.run();
            ran += 1;
        }

        if ran > 0 {
            tracing::trace!(ran, deadline_ms, "scheduler drained tasks");
        }
        ran
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Scheduler")
            .field("now_ms", &state.clock.now())
            .field("pending", &state.queue.len())
            .field("paused", &state.paused)
            .finish()
    }
}
