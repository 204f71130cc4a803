//! # Governor Tunables
//!
//! Boost parameters, utilization weighting and the per-level threshold and
//! downstay arrays. Read from device properties at init and adjustable at
//! runtime through the governor.

use alloc::vec::Vec;

use sgpu_core::{Error, Frequency, FrequencyTable, Properties, Result};
use static_assertions::const_assert;

// =============================================================================
// DEFAULTS
// =============================================================================

/// Frequency below which a load spike jumps straight to the highspeed level
pub const DEFAULT_HIGHSPEED_FREQ: Frequency = 500_000;
/// Load that triggers the highspeed jump
pub const DEFAULT_HIGHSPEED_LOAD: u32 = 99;
/// Time the load must stay high before the jump
pub const DEFAULT_HIGHSPEED_DELAY_MS: u32 = 0;
/// Level pinned while compute work dominates
pub const DEFAULT_CL_BOOST_FREQ: Frequency = 999_000;
/// Weight of compute busy time, percent
pub const DEFAULT_COMPUTE_WEIGHT: u32 = 100;
/// Hardware load source power ratio, percent; reported with its traces
pub const DEFAULT_POWER_RATIO: u32 = 50;
/// Hold after a step toward a faster level
pub const DEFAULT_VALID_TIME_MS: u32 = 8;

/// Default per-level arrays, in level-array notation
pub const DEFAULT_MIN_THRESHOLD: &str = "60";
/// See [`DEFAULT_MIN_THRESHOLD`]
pub const DEFAULT_MAX_THRESHOLD: &str = "75";
/// See [`DEFAULT_MIN_THRESHOLD`]
pub const DEFAULT_DOWNSTAY_TIME: &str = "32";

const_assert!(DEFAULT_HIGHSPEED_LOAD <= 100);

/// Which per-level array to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArray {
    /// Load under which the conservative policy slows down
    MinThreshold,
    /// Load above which policies speed up; the interactive target load
    MaxThreshold,
    /// Dwell time before slowing down, ms
    DownstayTime,
}

impl LevelArray {
    /// Property holding the array
    pub const fn property(&self) -> &'static str {
        match self {
            Self::MinThreshold => "min_threshold",
            Self::MaxThreshold => "max_threshold",
            Self::DownstayTime => "downstay_time",
        }
    }

    const fn default_spec(&self) -> &'static str {
        match self {
            Self::MinThreshold => DEFAULT_MIN_THRESHOLD,
            Self::MaxThreshold => DEFAULT_MAX_THRESHOLD,
            Self::DownstayTime => DEFAULT_DOWNSTAY_TIME,
        }
    }
}

// =============================================================================
// TUNABLES
// =============================================================================

/// Governor tunables for one frequency table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tunables {
    /// See [`DEFAULT_HIGHSPEED_FREQ`]
    pub highspeed_freq: Frequency,
    /// See [`DEFAULT_HIGHSPEED_LOAD`]
    pub highspeed_load: u32,
    /// See [`DEFAULT_HIGHSPEED_DELAY_MS`]
    pub highspeed_delay_ms: u32,
    /// Level selected by the highspeed jump
    pub highspeed_level: usize,
    /// See [`DEFAULT_CL_BOOST_FREQ`]
    pub cl_boost_freq: Frequency,
    /// Level pinned by CL-boost
    pub cl_boost_level: usize,
    /// See [`DEFAULT_COMPUTE_WEIGHT`]
    pub compute_weight: u32,
    /// See [`DEFAULT_POWER_RATIO`]
    pub power_ratio: u32,
    /// Restore the pre-suspend frequency on resume
    pub wakeup_lock: bool,
    /// See [`DEFAULT_VALID_TIME_MS`]
    pub valid_time_ms: u32,
    /// Lowest operating point used for boost level lookups
    pub floor_freq: Frequency,
    min_thresholds: Vec<u32>,
    max_thresholds: Vec<u32>,
    downstay_times: Vec<u32>,
}

impl Tunables {
    /// Defaults for `table`
    pub fn for_table(table: &FrequencyTable) -> Result<Self> {
        Self::from_properties(&Properties::new(), table, table.min_freq())
    }

    /// Read tunables for `table`
    ///
    /// Boost levels are searched among operating points at or above
    /// `floor_freq`.
    pub fn from_properties(props: &Properties, table: &FrequencyTable, floor_freq: Frequency) -> Result<Self> {
        let highspeed_freq = props
            .u32("highspeed_freq")?
            .map_or(DEFAULT_HIGHSPEED_FREQ, Frequency::from);
        let cl_boost_freq = props
            .u32("cl_boost_freq")?
            .map_or(DEFAULT_CL_BOOST_FREQ, Frequency::from);

        let array = |kind: LevelArray| -> Result<Vec<u32>> {
            let spec = props.string(kind.property()).unwrap_or(kind.default_spec());
            table.parse_level_array(spec).map_err(|e| {
                log::error!("governor: failed to parse {}: {}", kind.property(), e);
                e
            })
        };

        Ok(Self {
            highspeed_freq,
            highspeed_load: props.u32_or("highspeed_load", DEFAULT_HIGHSPEED_LOAD)?,
            highspeed_delay_ms: props.u32_or("highspeed_delay", DEFAULT_HIGHSPEED_DELAY_MS)?,
            highspeed_level: boost_level(table, highspeed_freq, floor_freq),
            cl_boost_freq,
            cl_boost_level: boost_level(table, cl_boost_freq, floor_freq),
            compute_weight: props.u32_or("compute_weight", DEFAULT_COMPUTE_WEIGHT)?,
            power_ratio: DEFAULT_POWER_RATIO,
            wakeup_lock: true,
            valid_time_ms: props.u32_or("valid_time", DEFAULT_VALID_TIME_MS)?,
            floor_freq,
            min_thresholds: array(LevelArray::MinThreshold)?,
            max_thresholds: array(LevelArray::MaxThreshold)?,
            downstay_times: array(LevelArray::DownstayTime)?,
        })
    }

    /// Replace the per-level arrays with explicit values
    pub fn with_arrays(mut self, min: &[u32], max: &[u32], downstay: &[u32]) -> Result<Self> {
        let len = self.max_thresholds.len();
        if min.len() != len || max.len() != len || downstay.len() != len {
            return Err(Error::InvalidArray);
        }
        self.min_thresholds = min.to_vec();
        self.max_thresholds = max.to_vec();
        self.downstay_times = downstay.to_vec();
        Ok(self)
    }

    /// Slow-down threshold of `level`
    #[inline]
    pub fn min_threshold(&self, level: usize) -> u32 {
        self.min_thresholds.get(level).copied().unwrap_or(0)
    }

    /// Speed-up threshold of `level`
    #[inline]
    pub fn max_threshold(&self, level: usize) -> u32 {
        self.max_thresholds.get(level).copied().unwrap_or(100).max(1)
    }

    /// Dwell time of `level`
    #[inline]
    pub fn downstay_ms(&self, level: usize) -> u32 {
        self.downstay_times.get(level).copied().unwrap_or(0)
    }

    /// Whole array
    pub fn array(&self, kind: LevelArray) -> &[u32] {
        match kind {
            LevelArray::MinThreshold => &self.min_thresholds,
            LevelArray::MaxThreshold => &self.max_thresholds,
            LevelArray::DownstayTime => &self.downstay_times,
        }
    }

    /// Replace an array from level-array notation
    pub fn set_array(&mut self, table: &FrequencyTable, kind: LevelArray, spec: &str) -> Result<()> {
        let values = table.parse_level_array(spec)?;
        match kind {
            LevelArray::MinThreshold => self.min_thresholds = values,
            LevelArray::MaxThreshold => self.max_thresholds = values,
            LevelArray::DownstayTime => self.downstay_times = values,
        }
        Ok(())
    }

    /// Change the highspeed frequency and its level
    pub fn set_highspeed_freq(&mut self, table: &FrequencyTable, freq: Frequency) {
        self.highspeed_freq = freq;
        self.highspeed_level = boost_level(table, freq, self.floor_freq);
    }

    /// Change the CL-boost frequency and its level
    pub fn set_cl_boost_freq(&mut self, table: &FrequencyTable, freq: Frequency) {
        self.cl_boost_freq = freq;
        self.cl_boost_level = boost_level(table, freq, self.floor_freq);
    }
}

/// Slowest level at or above `freq` among levels at or above `floor_freq`
///
/// Falls back to level `0` when no operating point qualifies.
pub fn boost_level(table: &FrequencyTable, freq: Frequency, floor_freq: Frequency) -> usize {
    table
        .iter()
        .take_while(|&(_, f)| f >= floor_freq)
        .filter(|&(_, f)| f >= freq)
        .map(|(level, _)| level)
        .last()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn table() -> FrequencyTable {
        FrequencyTable::new(vec![1000, 800, 600, 400]).unwrap()
    }

    #[test]
    fn test_defaults() {
        let t = Tunables::for_table(&table()).unwrap();
        assert_eq!(t.highspeed_freq, DEFAULT_HIGHSPEED_FREQ);
        assert_eq!(t.highspeed_load, 99);
        assert_eq!(t.compute_weight, 100);
        assert_eq!(t.array(LevelArray::MinThreshold), [60, 60, 60, 60]);
        assert_eq!(t.array(LevelArray::MaxThreshold), [75, 75, 75, 75]);
        assert_eq!(t.array(LevelArray::DownstayTime), [32, 32, 32, 32]);
        // Nothing reaches the default boost frequencies
        assert_eq!(t.highspeed_level, 0);
        assert_eq!(t.cl_boost_level, 0);
        assert!(t.wakeup_lock);
    }

    #[test]
    fn test_from_properties() {
        let props = Properties::new()
            .with("highspeed_freq", "600")
            .with("highspeed_load", "90")
            .with("cl_boost_freq", "800")
            .with("max_threshold", "70 700:80")
            .with("downstay_time", "\"16\"");
        let t = Tunables::from_properties(&props, &table(), 400).unwrap();
        assert_eq!(t.highspeed_level, 2);
        assert_eq!(t.highspeed_load, 90);
        assert_eq!(t.cl_boost_level, 1);
        assert_eq!(t.array(LevelArray::MaxThreshold), [80, 80, 70, 70]);
        assert_eq!(t.downstay_ms(3), 16);
    }

    #[test]
    fn test_bad_array() {
        let props = Properties::new().with("min_threshold", "60 700");
        assert_eq!(
            Tunables::from_properties(&props, &table(), 400),
            Err(Error::InvalidArray)
        );
    }

    #[test]
    fn test_boost_level_floor() {
        // 400 is below the floor, so it never qualifies
        assert_eq!(boost_level(&table(), 300, 600), 2);
        assert_eq!(boost_level(&table(), 300, 400), 3);
        assert_eq!(boost_level(&table(), 2000, 400), 0);
    }

    #[test]
    fn test_runtime_updates() {
        let table = table();
        let mut t = Tunables::for_table(&table).unwrap();
        t.set_highspeed_freq(&table, 800);
        assert_eq!(t.highspeed_level, 1);
        t.set_array(&table, LevelArray::MinThreshold, "0 500:40").unwrap();
        assert_eq!(t.array(LevelArray::MinThreshold), [40, 40, 40, 0]);
        assert!(t.set_array(&table, LevelArray::MinThreshold, "x").is_err());

        let t = t.with_arrays(&[0, 40, 40, 40], &[100, 75, 75, 75], &[0, 32, 32, 32]).unwrap();
        assert_eq!(t.max_threshold(0), 100);
        assert_eq!(t.downstay_ms(0), 0);
        assert_eq!(t.max_threshold(9), 100);
    }
}
