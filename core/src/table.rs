//! # Frequency Table
//!
//! The ordered list of operating points, fastest first.
//!
//! ```text
//!   level:    0      1      2     ...   gvf_start   ...   max_state-1
//!   freq:   [max] >= ... >= ...   ...   [gvf sub-levels, virtual only]
//! ```
//!
//! The table is immutable once built and is shared between the governor,
//! the devfreq glue and the GVF controller without locking.

use alloc::vec::Vec;
use core::ops::Index;

use crate::error::{Error, Result};
use crate::Frequency;

// =============================================================================
// ROUNDING
// =============================================================================

/// How to snap an arbitrary frequency onto the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Lowest entry at or above the request, else the highest entry
    Ceil,
    /// Highest entry at or below the request, else the lowest entry
    Floor,
}

// =============================================================================
// FREQUENCY TABLE
// =============================================================================

/// Non-increasing sequence of supported frequencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    freqs: Vec<Frequency>,
}

impl FrequencyTable {
    /// Build from a descending list
    ///
    /// Fails if the list is empty or any entry exceeds its predecessor.
    pub fn new(freqs: Vec<Frequency>) -> Result<Self> {
        if freqs.is_empty() || freqs.windows(2).any(|w| w[0] < w[1]) {
            return Err(Error::InvalidTable);
        }
        Ok(Self { freqs })
    }

    /// Build the operating table from ascending device lists
    ///
    /// `gvf` sub-levels sit below the lowest real operating point. The merged
    /// list is reversed so level 0 is the fastest entry; entries above
    /// `max_freq` are dropped.
    pub fn from_ascending(real: &[Frequency], gvf: &[Frequency], max_freq: Frequency) -> Result<Self> {
        let freqs: Vec<Frequency> = gvf
            .iter()
            .chain(real.iter())
            .rev()
            .copied()
            .filter(|&f| f <= max_freq)
            .collect();
        Self::new(freqs)
    }

    /// Number of levels
    #[inline]
    pub fn max_state(&self) -> usize {
        self.freqs.len()
    }

    /// Highest valid level index
    #[inline]
    pub fn last_level(&self) -> usize {
        self.freqs.len() - 1
    }

    /// Frequency at `level`, if it exists
    #[inline]
    pub fn get(&self, level: usize) -> Option<Frequency> {
        self.freqs.get(level).copied()
    }

    /// Fastest frequency
    #[inline]
    pub fn max_freq(&self) -> Frequency {
        self.freqs[0]
    }

    /// Slowest frequency
    #[inline]
    pub fn min_freq(&self) -> Frequency {
        self.freqs[self.freqs.len() - 1]
    }

    /// Entries as a slice, fastest first
    pub fn as_slice(&self) -> &[Frequency] {
        &self.freqs
    }

    /// Iterate over `(level, frequency)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, Frequency)> + '_ {
        self.freqs.iter().copied().enumerate()
    }

    /// Level holding exactly `freq`
    pub fn level_of(&self, freq: Frequency) -> Option<usize> {
        self.freqs.iter().position(|&f| f == freq)
    }

    /// Slowest level whose frequency is still at least `freq`
    pub fn lowest_level_at_least(&self, freq: Frequency) -> Option<usize> {
        self.freqs.iter().rposition(|&f| f >= freq)
    }

    /// Snap `freq` onto a table entry
    pub fn round(&self, freq: Frequency, rounding: Rounding) -> Frequency {
        let ceil = self.freqs.iter().rev().copied().find(|&f| f >= freq);
        let floor = self.freqs.iter().copied().find(|&f| f <= freq);
        match rounding {
            Rounding::Ceil => ceil.or(floor),
            Rounding::Floor => floor.or(ceil),
        }
        .unwrap_or(self.freqs[0])
    }

    /// Clamp `level` so its frequency respects `[min_freq, max_freq]`
    ///
    /// The minimum bound is satisfied first by walking toward faster levels,
    /// then the maximum bound by walking toward slower levels. Neither walk
    /// leaves the table.
    pub fn clamp_level(&self, level: usize, min_freq: Frequency, max_freq: Frequency) -> usize {
        let last = self.last_level();
        let mut level = level.min(last);
        while self.freqs[level] < min_freq && level > 0 {
            level -= 1;
        }
        while self.freqs[level] > max_freq && level < last {
            level += 1;
        }
        level
    }

    /// Expand a per-level array specification
    ///
    /// The format is `"v0 f1:v1 f2:v2 ..."`: `v0` applies to frequencies
    /// below `f1`, `v1` to frequencies at or above `f1`, and so on. A single
    /// value applies to every level. Tokens are separated by spaces or
    /// colons.
    pub fn parse_level_array(&self, spec: &str) -> Result<Vec<u32>> {
        let tokens = spec
            .split(|c: char| c == ':' || c.is_ascii_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<u32>().map_err(|_| Error::InvalidArray))
            .collect::<Result<Vec<u32>>>()?;

        if tokens.len() % 2 == 0 {
            return Err(Error::InvalidArray);
        }

        let mut values = alloc::vec![0u32; self.max_state()];
        let mut j = 0;
        for level in (0..self.max_state()).rev() {
            while j + 1 < tokens.len() && self.freqs[level] >= u64::from(tokens[j + 1]) {
                j += 2;
            }
            values[level] = tokens[j];
        }
        Ok(values)
    }
}

impl Index<usize> for FrequencyTable {
    type Output = Frequency;

    fn index(&self, level: usize) -> &Frequency {
        &self.freqs[level]
    }
}
