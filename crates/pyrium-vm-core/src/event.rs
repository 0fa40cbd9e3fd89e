//! Tick events

use std::time::Duration;

/// One simulation step, delivered by reference to every handler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    /// Monotonic timestamp in nanoseconds
    pub timestamp_nanos: u64,
    /// Time since the previous tick in milliseconds
    pub elapsed_ms: f64,
}

impl TickEvent {
    /// Create a tick event
    pub const fn new(timestamp_nanos: u64, elapsed_ms: f64) -> Self {
        Self {
            timestamp_nanos,
            elapsed_ms,
        }
    }

    /// Elapsed time as a [`Duration`]; negative or non-finite values clamp to zero
    pub fn elapsed(&self) -> Duration {
        Duration::try_from_secs_f64(self.elapsed_ms / 1000.0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed() {
        assert_eq!(TickEvent::new(0, 50.0).elapsed(), Duration::from_millis(50));
        assert_eq!(TickEvent::new(0, -1.0).elapsed(), Duration::ZERO);
        assert_eq!(TickEvent::new(0, f64::NAN).elapsed(), Duration::ZERO);
    }
}
