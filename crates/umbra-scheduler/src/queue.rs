//! Time-ordered task queue.
//!
//! Tasks are ordered by `(time_ms, lane, sequence)`. The sequence number
//! is assigned from a counter that only ever increases, so no two queued
//! tasks compare equal and the execution order is a total order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

/// A unit of work posted to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Unique identifier for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// Ordering lane for tasks sharing a timestamp.
///
/// `Front` tasks run before every `Normal` task due at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    Front,
    Normal,
}

/// A task waiting in the queue together with its ordering key.
pub struct ScheduledTask {
    /// Identifier handed back to the poster.
    pub id: TaskId,
    /// Absolute virtual time (milliseconds) at which the task is due.
    pub time_ms: u64,
    /// Ordering lane.
    pub lane: Lane,
    /// Insertion sequence number, unique per queue.
    pub sequence: u64,
    task: Task,
}

impl ScheduledTask {
    /// Consumes the entry and runs the task.
    pub fn run(self) {
        (self.task)();
    }

    fn key(&self) -> (u64, Lane, u64) {
        (self.time_ms, self.lane, self.sequence)
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("time_ms", &self.time_ms)
            .field("lane", &self.lane)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    // Reversed: BinaryHeap is a max-heap and the earliest key must pop first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Priority queue of tasks keyed by virtual time.
#[derive(Default)]
pub struct TaskQueue {
    heap: BinaryHeap<ScheduledTask>,
    next_sequence: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a task due at `time_ms`.
    pub fn push(&mut self, time_ms: u64, lane: Lane, task: Task) -> TaskId {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let id = TaskId(sequence);
        self.heap.push(ScheduledTask {
            id,
            time_ms,
            lane,
            sequence,
            task,
        });
        id
    }

    /// Removes and returns the earliest task, regardless of its time.
    pub fn pop(&mut self) -> Option<ScheduledTask> {
        self.heap.pop()
    }

    /// Removes and returns the earliest task if it is due at or before
    /// `deadline_ms`.
    pub fn pop_due(&mut self, deadline_ms: u64) -> Option<ScheduledTask> {
        if self.heap.peek()?.time_ms <= deadline_ms {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Time of the earliest queued task.
    pub fn next_time(&self) -> Option<u64> {
        self.heap.peek().map(|task| task.time_ms)
    }

    /// Time of the latest queued task.
    pub fn last_time(&self) -> Option<u64> {
        self.heap.iter().map(|task| task.time_ms).max()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drops every queued task. Sequence numbers keep increasing so task
    /// ids stay unique for the lifetime of the queue.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.heap.len())
            .field("next_time", &self.next_time())
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}
