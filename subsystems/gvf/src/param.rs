//! # GVF Parameters
//!
//! Per-level tunables of the idle-injection governor.
//!
//! ```text
//!   level 0            custom parameters (manual start, debug writes)
//!   level 1..max-1     derived from the GVF table and the run frequency,
//!                      higher level = lower virtual frequency = more idle
//! ```

use alloc::vec::Vec;
use core::fmt;

use sgpu_core::{Error, Frequency, Result};
use static_assertions::const_assert;

// =============================================================================
// DEFAULTS
// =============================================================================

/// Default injection decision period
pub const DEFAULT_SAMPLING_TIME_MS: u32 = 16;
/// Default upper bound of one injection, percent of the sampling period
pub const DEFAULT_MAX_REST_RATIO: u32 = 80;
/// Default lower bound of one injection, percent of the sampling period
pub const DEFAULT_MIN_REST_RATIO: u32 = 10;

/// Ratios are percentages
pub const RATIO_MAX: u32 = 100;

const_assert!(DEFAULT_MIN_REST_RATIO <= DEFAULT_MAX_REST_RATIO);
const_assert!(DEFAULT_MAX_REST_RATIO <= RATIO_MAX);

/// Longest accepted text form of a parameter write
const PARAM_TEXT_MAX: usize = 20;

// =============================================================================
// PARAMETERS
// =============================================================================

/// Tunables for one GVF level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GvfParams {
    /// Period between two injection decisions
    pub sampling_time_ms: u32,
    /// Idle share to reach over the monitor window, percent
    pub target_ratio: u32,
    /// Longest single injection, percent of the sampling period
    pub max_rest_ratio: u32,
    /// Shortest single injection, percent of the sampling period
    pub min_rest_ratio: u32,
}

impl Default for GvfParams {
    fn default() -> Self {
        Self {
            sampling_time_ms: DEFAULT_SAMPLING_TIME_MS,
            target_ratio: 0,
            max_rest_ratio: DEFAULT_MAX_REST_RATIO,
            min_rest_ratio: DEFAULT_MIN_REST_RATIO,
        }
    }
}

impl GvfParams {
    /// Parameters targeting `target_ratio` with default timing
    pub fn with_target(target_ratio: u32) -> Self {
        Self {
            target_ratio,
            ..Self::default()
        }
    }

    /// Check every ratio is a percentage
    pub fn validate(&self) -> Result<()> {
        for ratio in [self.target_ratio, self.max_rest_ratio, self.min_rest_ratio] {
            if ratio > RATIO_MAX {
                return Err(Error::out_of_range(u64::from(ratio), 0, u64::from(RATIO_MAX)));
            }
        }
        Ok(())
    }

    /// Parse `"sampling_ms target max_rest min_rest"`
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() >= PARAM_TEXT_MAX {
            return Err(Error::InvalidParameter);
        }
        let mut fields = text.split_ascii_whitespace().map(|t| t.parse::<u32>());
        let mut next = || match fields.next() {
            Some(Ok(v)) => Ok(v),
            _ => Err(Error::InvalidParameter),
        };
        let params = Self {
            sampling_time_ms: next()?,
            target_ratio: next()?,
            max_rest_ratio: next()?,
            min_rest_ratio: next()?,
        };
        params.validate()?;
        Ok(params)
    }
}

impl fmt::Display for GvfParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sampling_time(ms) = {}", self.sampling_time_ms)?;
        writeln!(f, "target_idle_ratio(0-100%) = {}", self.target_ratio)?;
        writeln!(f, "max_rest_ratio(0-100%) = {}", self.max_rest_ratio)?;
        writeln!(f, "min_rest_ratio(0-100%) = {}", self.min_rest_ratio)
    }
}

// =============================================================================
// PARAMETER TABLE
// =============================================================================

/// Parameters indexed by GVF level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GvfParamTable {
    levels: Vec<GvfParams>,
}

impl GvfParamTable {
    /// Derive the table from ascending sub-level frequencies
    ///
    /// The lowest table entry maps to the highest level. A level targets
    /// `freq * 100 / run_freq` percent idle, capped at `RATIO_MAX`; a
    /// target at the cap always rests the maximum.
    pub fn derive(table: &[Frequency], run_freq: Frequency) -> Self {
        let max_level = table.len() + 1;
        let mut levels = alloc::vec![GvfParams::default(); max_level];
        for (i, &freq) in table.iter().enumerate() {
            let target = if run_freq == 0 {
                RATIO_MAX
            } else {
                (freq.saturating_mul(100) / run_freq).min(u64::from(RATIO_MAX)) as u32
            };
            levels[max_level - 1 - i] = GvfParams::with_target(target);
        }
        Self { levels }
    }

    /// Number of levels including the custom level 0
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Table holds no level
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Parameters of `level`
    pub fn get(&self, level: usize) -> Option<GvfParams> {
        self.levels.get(level).copied()
    }

    /// Replace the parameters of `level`
    pub fn set(&mut self, level: usize, params: GvfParams) -> Result<()> {
        params.validate()?;
        let slot = self.levels.get_mut(level).ok_or(Error::InvalidLevel(level))?;
        *slot = params;
        Ok(())
    }

    /// Custom parameters used by manual start
    pub fn custom(&self) -> GvfParams {
        self.levels[0]
    }
}
