//! # Collaborator Traits
//!
//! The narrow interfaces through which the DVFS core reaches the rest of the
//! driver. Implementations live in platform code; none of them may block
//! for long, since they are called from the governor tick.

use crate::utilization::UtilizationSnapshot;
use crate::Frequency;

// =============================================================================
// GOVERNOR INPUTS
// =============================================================================

/// Source of per-window busy/total counters
pub trait UtilizationSource: Send + Sync {
    /// Capture the counters of the last completed window
    fn snapshot(&self) -> UtilizationSnapshot;
}

/// A fixed window replays itself
impl UtilizationSource for UtilizationSnapshot {
    fn snapshot(&self) -> UtilizationSnapshot {
        *self
    }
}

/// Externally imposed frequency bounds (thermal, user, system)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosBounds {
    /// Lowest allowed frequency
    pub min_freq: Frequency,
    /// Highest allowed frequency
    pub max_freq: Frequency,
}

impl QosBounds {
    /// No external constraint
    pub const UNBOUNDED: Self = Self {
        min_freq: 0,
        max_freq: Frequency::MAX,
    };

    /// Bounds from a pair
    pub const fn new(min_freq: Frequency, max_freq: Frequency) -> Self {
        Self { min_freq, max_freq }
    }
}

impl Default for QosBounds {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Provider of the current QoS bounds
pub trait QosSource: Send + Sync {
    /// Read the bounds in effect right now
    fn bounds(&self) -> QosBounds;
}

impl QosSource for QosBounds {
    fn bounds(&self) -> QosBounds {
        *self
    }
}

// =============================================================================
// GOVERNOR OUTPUTS
// =============================================================================

/// Clock programming endpoint
pub trait FrequencyTransition: Send + Sync {
    /// Program `freq`; fire and forget
    fn request(&self, freq: Frequency);
}

// =============================================================================
// GVF INPUTS
// =============================================================================

/// Cumulative time the GPU spent power-gated or suspended
pub trait IdleTimeSource: Send + Sync {
    /// Monotonic idle time in nanoseconds
    fn idle_time_ns(&self) -> u64;
}

/// Wakes a blocked background worker
pub trait WakeSignal: Send + Sync {
    /// Re-evaluate the wait condition
    fn wake(&self);
}
