//! Scheduler error types

use thiserror::Error;
use umbra_types::VirtualThreadId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A main thread is already designated and has not been cleared.
    #[error("main thread is already bound to '{existing}', cannot bind '{requested}'")]
    AlreadyBound {
        existing: VirtualThreadId,
        requested: VirtualThreadId,
    },
}
