//! Per-thread scheduler table and main-thread designation.
//!
//! Every virtual thread that runs an event loop gets its own [`Scheduler`]
//! with an independent clock. No ordering is defined between schedulers of
//! different threads.
//!
//! Schedulers outlive individual environments: [`LooperTable::reset`]
//! empties them and clears the main-thread designation but keeps the
//! handles, so code that captured a thread's scheduler keeps working
//! against a clean queue.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use umbra_types::VirtualThreadId;

use crate::error::SchedulerError;
use crate::scheduler::Scheduler;

#[derive(Debug, Default)]
struct LooperState {
    schedulers: BTreeMap<VirtualThreadId, Scheduler>,
    main_thread: Option<VirtualThreadId>,
}

/// Shared table of virtual threads and their schedulers.
#[derive(Debug, Clone, Default)]
pub struct LooperTable {
    inner: Arc<Mutex<LooperState>>,
}

impl LooperTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LooperState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the scheduler for `thread`, creating it if needed.
    pub fn scheduler_for(&self, thread: &VirtualThreadId) -> Scheduler {
        self.state()
            .schedulers
            .entry(thread.clone())
            .or_default()
            .clone()
    }

    /// Returns the scheduler for `thread` if one was created.
    pub fn existing(&self, thread: &VirtualThreadId) -> Option<Scheduler> {
        self.state().schedulers.get(thread).cloned()
    }

    /// Designates `thread` as the simulated main thread and returns its
    /// scheduler, creating one if the thread has none yet.
    ///
    /// Fails if another designation is still in place; call
    /// [`reset`](Self::reset) first.
    pub fn prepare_main_looper(&self, thread: &VirtualThreadId) -> Result<Scheduler, SchedulerError> {
        let mut state = self.state();
        if let Some(existing) = &state.main_thread {
            return Err(SchedulerError::AlreadyBound {
                existing: existing.clone(),
                requested: thread.clone(),
            });
        }
        state.main_thread = Some(thread.clone());
        let scheduler = state.schedulers.entry(thread.clone()).or_default().clone();
        tracing::debug!(thread = %thread, "main looper prepared");
        Ok(scheduler)
    }

    /// The designated main thread, if any.
    pub fn main_thread(&self) -> Option<VirtualThreadId> {
        self.state().main_thread.clone()
    }

    /// Overrides the main-thread designation.
    pub fn set_main_thread(&self, thread: VirtualThreadId) {
        self.state().main_thread = Some(thread);
    }

    /// Returns true if `thread` is the designated main thread.
    pub fn is_main_thread(&self, thread: &VirtualThreadId) -> bool {
        self.state().main_thread.as_ref() == Some(thread)
    }

    /// Scheduler of the designated main thread.
    pub fn main_scheduler(&self) -> Option<Scheduler> {
        let state = self.state();
        let main = state.main_thread.as_ref()?;
        state.schedulers.get(main).cloned()
    }

    /// Threads that currently own a scheduler, in name order.
    pub fn threads(&self) -> Vec<VirtualThreadId> {
        self.state().schedulers.keys().cloned().collect()
    }

    /// Clears the main-thread designation and resets every scheduler.
    pub fn reset(&self) {
        let mut state = self.state();
        state.main_thread = None;
        for scheduler in state.schedulers.values() {
            scheduler.reset();
        }
    }
}
