//! # Time
//!
//! Monotonic nanosecond clock and deadline helpers.
//!
//! All timers of the governor and the GVF scheduler are absolute deadlines
//! in nanoseconds on a [`Clock`]. Tests drive time with [`ManualClock`].

use core::sync::atomic::{AtomicU64, Ordering};

use static_assertions::const_assert_eq;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Nanoseconds per microsecond
pub const NSEC_PER_USEC: u64 = 1_000;
/// Nanoseconds per millisecond
pub const NSEC_PER_MSEC: u64 = 1_000_000;
/// Nanoseconds per second
pub const NSEC_PER_SEC: u64 = 1_000_000_000;

const_assert_eq!(NSEC_PER_MSEC * 1_000, NSEC_PER_SEC);
const_assert_eq!(NSEC_PER_USEC * 1_000, NSEC_PER_MSEC);

/// Convert milliseconds to nanoseconds, saturating
#[inline]
pub const fn ms_to_ns(ms: u64) -> u64 {
    ms.saturating_mul(NSEC_PER_MSEC)
}

/// Convert nanoseconds to whole milliseconds
#[inline]
pub const fn ns_to_ms(ns: u64) -> u64 {
    ns / NSEC_PER_MSEC
}

/// Deadline `at` has strictly passed at `now`
#[inline]
pub const fn time_after(now: u64, at: u64) -> bool {
    now > at
}

/// Deadline `at` has not yet passed at `now`
#[inline]
pub const fn time_before(now: u64, at: u64) -> bool {
    now < at
}

// =============================================================================
// CLOCK
// =============================================================================

/// Monotonic time source
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds; never decreases
    fn now_ns(&self) -> u64;
}

/// Settable clock for deterministic tests and simulations
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock starting at `start_ns`
    pub const fn new(start_ns: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ns),
        }
    }

    /// Jump to an absolute time; earlier values are ignored
    pub fn set_ns(&self, now_ns: u64) {
        self.now.fetch_max(now_ns, Ordering::SeqCst);
    }

    /// Advance by `delta_ns`
    pub fn advance_ns(&self, delta_ns: u64) {
        self.now.fetch_add(delta_ns, Ordering::SeqCst);
    }

    /// Advance by `delta_ms`
    pub fn advance_ms(&self, delta_ms: u64) {
        self.advance_ns(ms_to_ns(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Wall-independent clock backed by [`std::time::Instant`]
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Create a clock whose zero is now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        // Leave room so a zero deadline is always in the past
        (self.origin.elapsed().as_nanos() as u64).saturating_add(1)
    }
}
