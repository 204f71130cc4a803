//! # Governor Arithmetic
//!
//! Integer-only helpers shared by the policies: the weighted utilization
//! of a sampling window and the fixed-point cube-root load correction.
//!
//! ```text
//!   utilization = clamp((cu_busy * (weight - 100) + busy * 100) / total, 0, 100)
//!   ratio       = cbrt(coefficient)           (fixed point, 2^10 == 1.0)
//!   threshold'  = threshold * 2^10 / ratio
//! ```

use sgpu_core::UtilizationSnapshot;
use static_assertions::const_assert_eq;

// =============================================================================
// FIXED POINT
// =============================================================================

/// Fractional bits of the load ratio
pub const NORMALIZE_SHIFT: u32 = 10;
/// `1.0` in load-ratio fixed point
pub const NORMALIZE_FACT: u64 = 1 << NORMALIZE_SHIFT;
/// `1.0` cubed
pub const NORMALIZE_FACT3: u64 = 1 << (NORMALIZE_SHIFT * 3);

const_assert_eq!(NORMALIZE_FACT3, NORMALIZE_FACT * NORMALIZE_FACT * NORMALIZE_FACT);

const ITERATION_MAX: u32 = 10;

/// Integer cube root by Newton-Raphson
///
/// Starts from a power of two at or above the root and converges from
/// above; gives up after a fixed number of iterations.
pub fn cube_root(value: u64) -> u64 {
    if value == 0 {
        return 0;
    }

    let bits = u64::BITS - value.leading_zeros();
    let index = (bits - 1) / 3 + 1;
    let value = u128::from(value);

    let mut cur: u128 = 1 << index;
    let mut cube = cur * cur * cur;
    let mut prev: u128 = 0;

    for _ in 0..ITERATION_MAX {
        if cube == value || prev == cur {
            return cur as u64;
        }
        prev = cur;
        cur = (value + 2 * cube) / (3 * cur * cur);
        if cur == 0 {
            break;
        }
        cube = cur * cur * cur;
    }

    prev as u64
}

/// Load correction factor of a window, in `NORMALIZE_FACT` fixed point
///
/// Only the software busy time feeds the coefficient today, which makes
/// the factor exactly `1.0`; a zero root also falls back to `1.0`.
pub fn load_ratio(snapshot: &UtilizationSnapshot) -> u64 {
    let busy = u128::from(snapshot.busy_time);
    let coefficient = if busy == 0 {
        NORMALIZE_FACT3
    } else {
        (busy * 100 * u128::from(NORMALIZE_FACT3) / (busy * 100)) as u64
    };

    match cube_root(coefficient) {
        0 => NORMALIZE_FACT,
        ratio => ratio,
    }
}

/// Threshold rescaled by a load ratio
pub fn scale_threshold(threshold: u32, ratio: u64) -> u32 {
    let ratio = if ratio == 0 { NORMALIZE_FACT } else { ratio };
    (u64::from(threshold) * NORMALIZE_FACT / ratio).min(u64::from(u32::MAX)) as u32
}

/// Conservative thresholds after load correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Go faster above this load
    pub max: u32,
    /// Consider going slower below this load
    pub min: u32,
}

impl Thresholds {
    /// Rescale both thresholds with the window's load ratio
    pub fn scaled(self, snapshot: &UtilizationSnapshot) -> Self {
        let ratio = load_ratio(snapshot);
        Self {
            max: scale_threshold(self.max, ratio),
            min: scale_threshold(self.min, ratio),
        }
    }
}

// =============================================================================
// UTILIZATION
// =============================================================================

/// Load figures of one window, percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Utilization {
    /// Weighted overall load
    pub util: u64,
    /// Compute-only load
    pub cu_util: u64,
}

impl Utilization {
    /// Compute work accounts for the whole load
    pub fn is_compute_bound(&self) -> bool {
        self.util != 0 && self.util == self.cu_util
    }
}

/// Weighted utilization of a window
///
/// A window without data yields zero load.
pub fn utilization(snapshot: &UtilizationSnapshot, compute_weight: u32) -> Utilization {
    if snapshot.total_time == 0 {
        return Utilization::default();
    }
    let total = i128::from(snapshot.total_time);
    let cu = i128::from(snapshot.cu_busy_time);
    let weighted = cu * (i128::from(compute_weight) - 100) + i128::from(snapshot.busy_time) * 100;

    Utilization {
        util: (weighted / total).clamp(0, 100) as u64,
        cu_util: (cu * 100 / total).max(0) as u64,
    }
}
