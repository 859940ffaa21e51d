//! Conversion of raw record timestamps to wall-clock time.
//!
//! Record headers carry an opaque monotonic tick value whose meaning only
//! the capture session knows (ticks since boot, since session start, at
//! whatever rate). The dispatcher treats it as opaque and converts through a
//! caller-supplied [`Clock`] when handing events to the handler.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Caller-supplied convention for turning raw ticks into calendar time.
pub trait Clock {
    /// Wall-clock time corresponding to a raw header tick value.
    fn wall_time(&self, raw_ticks: u64) -> SystemTime;
}

/// Fixed-rate tick clock anchored at a known epoch.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    epoch: SystemTime,
    ticks_per_second: u64,
}

impl TickClock {
    /// A clock counting `ticks_per_second` from `epoch`. A zero rate is
    /// clamped to one tick per second rather than dividing by zero.
    #[must_use]
    pub fn new(epoch: SystemTime, ticks_per_second: u64) -> Self {
        Self { epoch, ticks_per_second: ticks_per_second.max(1) }
    }

    /// Nanosecond ticks from `epoch`, the convention live capture sessions
    /// use for boot-relative timestamps.
    #[must_use]
    pub fn nanos_since(epoch: SystemTime) -> Self {
        Self::new(epoch, 1_000_000_000)
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::nanos_since(UNIX_EPOCH)
    }
}

impl Clock for TickClock {
    fn wall_time(&self, raw_ticks: u64) -> SystemTime {
        let secs = raw_ticks / self.ticks_per_second;
        let rem = raw_ticks % self.ticks_per_second;
        // Widen before scaling; rem * 1e9 can overflow u64 at high rates.
        let nanos = u128::from(rem) * 1_000_000_000 / u128::from(self.ticks_per_second);
        let offset = Duration::new(secs, u32::try_from(nanos).unwrap_or(0));
        // A corrupt tick value can push the offset past the platform's
        // representable time range; clamp to the epoch rather than panic
        // mid-stream.
        self.epoch.checked_add(offset).unwrap_or(self.epoch)
    }
}
