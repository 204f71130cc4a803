//! # GVF Governors
//!
//! Decide how long to inject idle on each sampling period.
//!
//! The only policy is `RATIO`: keep the idle share of the monitor window at
//! a per-level target. Given `elapsed` wall time and `idle` time since the
//! baseline, the injection `x` that reaches the target satisfies
//!
//! ```text
//!   (idle + x) / (elapsed + x) = target / 100
//!   x = (target * elapsed - idle * 100) / (100 - target)
//! ```
//!
//! and is clamped to `[min_rest_time, max_rest_time]`.

use sgpu_core::time::ms_to_ns;
use sgpu_core::{Error, Result};

use crate::param::{GvfParams, RATIO_MAX};
use crate::window::WindowSample;

// =============================================================================
// RATIO GOVERNOR
// =============================================================================

/// State of the `RATIO` policy for the active level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatioGovernor {
    target_ratio: u32,
    max_rest_ns: u64,
    min_rest_ns: u64,
}

impl RatioGovernor {
    /// Load the parameters of a level
    pub fn init(params: &GvfParams) -> Self {
        let sampling_ns = ms_to_ns(u64::from(params.sampling_time_ms));
        let max_rest_ns = sampling_ns / 100 * u64::from(params.max_rest_ratio);
        let min_rest_ns = sampling_ns / 100 * u64::from(params.min_rest_ratio);
        Self {
            target_ratio: params.target_ratio,
            max_rest_ns,
            min_rest_ns,
        }
    }

    /// Target idle share
    pub fn target_ratio(&self) -> u32 {
        self.target_ratio
    }

    /// Longest injection
    pub fn max_rest_ns(&self) -> u64 {
        self.max_rest_ns
    }

    /// Shortest non-zero injection
    pub fn min_rest_ns(&self) -> u64 {
        self.min_rest_ns
    }

    /// Idle time to inject now, or `0` when the window is idle enough
    pub fn calc_idle(&self, sample: &WindowSample) -> u64 {
        let Some(cur_idle_ratio) = sample.idle_ratio() else {
            return 0;
        };
        let target = u64::from(self.target_ratio);
        if target <= cur_idle_ratio {
            return 0;
        }

        let calc_ns = if self.target_ratio >= RATIO_MAX {
            self.max_rest_ns
        } else {
            let wanted = target as u128 * sample.elapsed_ns as u128;
            let have = sample.idle_ns as u128 * 100;
            (wanted.saturating_sub(have) / (100 - target) as u128).min(u64::MAX as u128) as u64
        };

        calc_ns.min(self.max_rest_ns).max(self.min_rest_ns)
    }
}

// =============================================================================
// POLICY SELECTION
// =============================================================================

/// Active GVF governor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GvfGovernor {
    /// Hold a target idle ratio over the monitor window
    Ratio(RatioGovernor),
}

impl Default for GvfGovernor {
    fn default() -> Self {
        Self::Ratio(RatioGovernor::default())
    }
}

impl GvfGovernor {
    /// Selectable names
    pub const NAMES: &'static [&'static str] = &["RATIO"];

    /// Look up a governor by name
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim() {
            "RATIO" => Ok(Self::Ratio(RatioGovernor::default())),
            _ => Err(Error::UnknownGovernor),
        }
    }

    /// Name of the policy
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ratio(_) => "RATIO",
        }
    }

    /// Re-initialize for a level; returns its sampling period
    pub fn init(&mut self, params: &GvfParams) -> u32 {
        match self {
            Self::Ratio(ratio) => {
                *ratio = RatioGovernor::init(params);
                log::info!(
                    "GVF: {}: sampling_time_ms({}) target_ratio({}) max_rest_ratio({}) min_rest_ratio({})",
                    "RATIO",
                    params.sampling_time_ms,
                    params.target_ratio,
                    params.max_rest_ratio,
                    params.min_rest_ratio
                );
            },
        }
        params.sampling_time_ms
    }

    /// Idle time to inject in nanoseconds
    pub fn calc_idle(&self, sample: &WindowSample) -> u64 {
        match self {
            Self::Ratio(ratio) => ratio.calc_idle(sample),
        }
    }
}
