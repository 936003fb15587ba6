//! Monotonic virtual clock.

/// Logical clock private to one scheduler.
///
/// Time is measured in milliseconds and advances only on explicit
/// request. Requests to move backwards are ignored, so the clock never
/// decreases between resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualClock {
    now_ms: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current virtual time.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Moves the clock forward to `time_ms`.
    ///
    /// Returns `false` (and leaves the clock untouched) when `time_ms` is
    /// in the past.
    pub fn advance_to(&mut self, time_ms: u64) -> bool {
        if time_ms < self.now_ms {
            return false;
        }
        self.now_ms = time_ms;
        true
    }

    /// Returns `now + delay_ms`, saturating at `u64::MAX`.
    #[inline]
    pub fn after(&self, delay_ms: u64) -> u64 {
        self.now_ms.saturating_add(delay_ms)
    }

    /// Sets time back to zero.
    pub fn reset(&mut self) {
        self.now_ms = 0;
    }
}
