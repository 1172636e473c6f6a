//! Clock - Timestamp Source
//!
//! TigerStyle: Storage never reads system time directly. Timestamps come
//! from an injectable clock so tests can control `created`/`modified`.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SubsecRound, TimeZone, Utc};

use crate::constants::{SIM_CLOCK_ADVANCE_MS_MAX, SIM_CLOCK_START_MS};

/// Source of record timestamps.
///
/// Implementations return UTC instants truncated to microseconds, the
/// precision every backend can store losslessly.
pub trait Clock: Send + Sync + Debug {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// A simulated clock for deterministic testing.
///
/// TigerStyle:
/// - Time only moves forward
/// - All time operations are explicit
/// - No reliance on system time
#[derive(Debug)]
pub struct SimClock {
    /// Current time in milliseconds since epoch
    current_ms: AtomicU64,
}

impl SimClock {
    /// Create a clock starting at 2024-01-01T00:00:00Z.
    #[must_use]
    pub fn new() -> Self {
        Self::at_ms(SIM_CLOCK_START_MS)
    }

    /// Create a clock starting at the given time.
    #[must_use]
    pub fn at_ms(start_ms: u64) -> Self {
        Self {
            current_ms: AtomicU64::new(start_ms),
        }
    }

    /// Get current time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    /// Advance time by the given milliseconds.
    ///
    /// # Panics
    /// Panics if ms exceeds `SIM_CLOCK_ADVANCE_MS_MAX`.
    ///
    /// # Returns
    /// The new current time.
    pub fn advance_ms(&self, ms: u64) -> u64 {
        // Preconditions
        assert!(
            ms <= SIM_CLOCK_ADVANCE_MS_MAX,
            "advance_ms({}) exceeds max ({})",
            ms,
            SIM_CLOCK_ADVANCE_MS_MAX
        );

        let old_time = self.current_ms.fetch_add(ms, Ordering::SeqCst);
        let new_time = old_time.saturating_add(ms);

        // Postcondition
        assert!(new_time >= old_time, "time must not go backwards");

        new_time
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = i64::try_from(self.now_ms()).unwrap_or(i64::MAX);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
