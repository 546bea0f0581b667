//! Hardware timestamp reconciliation
//!
//! The adapter only knows a free-running tick counter (tenths of a
//! millisecond since power-on). One paired sample of host wall-clock time
//! and device ticks, taken when the channel opens, turns any later tick
//! count into a host timestamp by linear offset.
//!
//! The counter in each frame record is 32 bits wide and wraps after
//! roughly 119 hours of device uptime. Wraparound is not handled.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::TICKS_PER_SECOND;

/// Paired host/device time sample taken once per channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampAnchor {
    /// Host wall-clock time in seconds since the Unix epoch
    pub host_time_at_open: f64,
    /// Device tick counter at the same moment
    pub device_tick_at_open: u64,
}

impl TimestampAnchor {
    /// Create an anchor from an explicit sample
    pub fn new(host_time_at_open: f64, device_tick_at_open: u64) -> Self {
        Self {
            host_time_at_open,
            device_tick_at_open,
        }
    }

    /// Pair the given device tick count with the current host time
    pub fn capture(device_tick_at_open: u64) -> Self {
        Self::new(host_time_now(), device_tick_at_open)
    }

    /// Convert a device tick count into host time in seconds
    pub fn reconcile(&self, device_tick_now: u64) -> f64 {
        self.host_time_at_open + device_tick_now as f64 / TICKS_PER_SECOND
            - self.device_tick_at_open as f64 / TICKS_PER_SECOND
    }
}

/// Host wall-clock time in seconds, rounded to the device tick resolution
fn host_time_now() -> f64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    (secs * TICKS_PER_SECOND).round() / TICKS_PER_SECOND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile() {
        let anchor = TimestampAnchor::new(1000.0, 50_000);
        assert_eq!(anchor.reconcile(150_000), 1010.0);
        assert_eq!(anchor.reconcile(50_000), 1000.0);
    }

    #[test]
    fn test_reconcile_before_anchor() {
        let anchor = TimestampAnchor::new(1000.0, 50_000);
        assert_eq!(anchor.reconcile(40_000), 999.0);
    }

    #[test]
    fn test_capture_uses_host_clock() {
        let anchor = TimestampAnchor::capture(1234);
        assert_eq!(anchor.device_tick_at_open, 1234);
        assert!(anchor.host_time_at_open > 1_500_000_000.0);
    }
}
