use std::time::{Duration, Instant};

/// Default output period: one row every 10 ms.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// Decides when the next row is owed, using monotonic instants only so
/// wall-clock adjustments cannot double-fire or starve the output.
#[derive(Debug)]
pub struct CadenceScheduler {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl CadenceScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true when at least `interval` has elapsed since the last
    /// instant this returned true, recording `now` as the new baseline.
    /// The first call after construction is always due.
    pub fn due(&mut self, now: Instant) -> bool {
        let due = match self.last_emit {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        };
        if due {
            self.last_emit = Some(now);
        }
        due
    }
}

impl Default for CadenceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}
