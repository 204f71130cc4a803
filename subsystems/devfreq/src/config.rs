//! Device properties read at probe time.

use alloc::string::String;
use alloc::vec::Vec;

use sgpu_core::{Error, Frequency, Properties, Result};
use sgpu_governor::DEFAULT_POLICY_NAME;

/// Initial frequency when the device names none, kHz
pub const DEFAULT_INITIAL_FREQ: Frequency = 24_000;

/// Period of the devfreq update, ms
pub const DEFAULT_POLLING_MS: u32 = 8;

/// Static device description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Real operating points, ascending
    pub freq_table: Vec<Frequency>,
    /// Effective maximum frequency
    pub max_freq: Frequency,
    /// Lowest real frequency the boost levels may use
    pub min_freq: Frequency,
    /// Frequency selected before the first update
    pub initial_freq: Frequency,
    /// Update period
    pub polling_ms: u32,
    /// Policy selected at probe
    pub governor: String,
}

impl DeviceConfig {
    /// Read the device description
    ///
    /// `max_freq` is clamped by `platform_max` when the platform reports one.
    pub fn from_properties(props: &Properties, platform_max: Option<Frequency>) -> Result<Self> {
        let freq_table: Vec<Frequency> = props
            .u32_list("freq_table")?
            .ok_or(Error::MissingProperty("freq_table"))?
            .into_iter()
            .map(Frequency::from)
            .collect();
        let (Some(&lowest), Some(&highest)) = (freq_table.first(), freq_table.last()) else {
            return Err(Error::InvalidProperty("freq_table"));
        };
        if freq_table.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::InvalidProperty("freq_table"));
        }

        let mut max_freq = props.u32("max_freq")?.map_or(highest, Frequency::from);
        if let Some(platform_max) = platform_max {
            max_freq = max_freq.min(platform_max);
        }
        let min_freq = props.u32("min_freq")?.map_or(lowest, Frequency::from);
        if min_freq > max_freq {
            return Err(Error::InvalidProperty("min_freq"));
        }

        Ok(Self {
            freq_table,
            max_freq,
            min_freq,
            initial_freq: props
                .u32("initial_freq")?
                .map_or(DEFAULT_INITIAL_FREQ, Frequency::from),
            polling_ms: props.u32_or("polling_ms", DEFAULT_POLLING_MS)?,
            governor: String::from(props.string("governor").unwrap_or(DEFAULT_POLICY_NAME).trim()),
        })
    }
}
