//! # Device Properties
//!
//! Text configuration standing in for the device-tree node of the GPU.
//!
//! ```text
//! # sgpu node
//! freq_table    = 400000 600000 800000 1000000
//! max_threshold = "75 800000:90"
//! gvf_table     = <100000 200000>
//! gvf_run_freq  = 0x249f0
//! ```
//!
//! One `name = value` pair per line; `#` starts a comment. Numbers may be
//! decimal or `0x` hex, lists are separated by spaces or commas and may be
//! wrapped in `<...>`, strings may be quoted.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::{Error, Result};

// =============================================================================
// PROPERTIES
// =============================================================================

/// Parsed property bag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Empty property bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a property file
    pub fn parse(text: &str) -> Result<Self> {
        let mut props = Self::new();
        for raw in text.lines() {
            let line = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            let (name, value) = line.split_once('=').ok_or(Error::InvalidParameter)?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::InvalidParameter);
            }
            props.set(name, value.trim());
        }
        Ok(props)
    }

    /// Set or replace a property
    pub fn set(&mut self, name: &str, value: &str) -> &mut Self {
        self.entries.insert(name.to_string(), value.to_string());
        self
    }

    /// Builder form of [`Properties::set`]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    /// Property is present
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Raw value with surrounding quotes removed
    pub fn string(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|v| v.trim_matches('"'))
    }

    /// Single integer property
    pub fn u32(&self, name: &'static str) -> Result<Option<u32>> {
        match self.string(name) {
            Some(v) => parse_u32(v).map(Some).ok_or(Error::InvalidProperty(name)),
            None => Ok(None),
        }
    }

    /// Single integer property with a fallback
    pub fn u32_or(&self, name: &'static str, default: u32) -> Result<u32> {
        Ok(self.u32(name)?.unwrap_or(default))
    }

    /// Integer list property
    pub fn u32_list(&self, name: &'static str) -> Result<Option<Vec<u32>>> {
        let Some(value) = self.string(name) else {
            return Ok(None);
        };
        let inner = value.trim_start_matches('<').trim_end_matches('>');
        inner
            .split(|c: char| c == ',' || c.is_ascii_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| parse_u32(t).ok_or(Error::InvalidProperty(name)))
            .collect::<Result<Vec<u32>>>()
            .map(Some)
    }
}

fn parse_u32(token: &str) -> Option<u32> {
    let token = token.trim();
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const NODE: &str = "
        # sgpu node
        freq_table    = 400000 600000, 800000 1000000
        max_threshold = \"75 800000:90\"   # per level
        gvf_table     = <100000 200000>
        gvf_run_freq  = 0x249f0
    ";

    #[test]
    fn test_parse() {
        let props = Properties::parse(NODE).unwrap();
        assert_eq!(
            props.u32_list("freq_table").unwrap(),
            Some(vec![400000, 600000, 800000, 1000000])
        );
        assert_eq!(props.string("max_threshold"), Some("75 800000:90"));
        assert_eq!(props.u32_list("gvf_table").unwrap(), Some(vec![100000, 200000]));
        assert_eq!(props.u32("gvf_run_freq").unwrap(), Some(150000));
    }

    #[test]
    fn test_missing_and_defaults() {
        let props = Properties::new().with("highspeed_load", "90");
        assert_eq!(props.u32_or("highspeed_load", 99).unwrap(), 90);
        assert_eq!(props.u32_or("highspeed_delay", 0).unwrap(), 0);
        assert_eq!(props.u32_list("gvf_table").unwrap(), None);
        assert!(!props.contains("gvf_table"));
    }

    #[test]
    fn test_invalid_values() {
        let props = Properties::new().with("max_freq", "fast").with("gvf_table", "1 two");
        assert_eq!(props.u32("max_freq"), Err(Error::InvalidProperty("max_freq")));
        assert_eq!(props.u32_list("gvf_table"), Err(Error::InvalidProperty("gvf_table")));
    }

    #[test]
    fn test_invalid_line() {
        assert_eq!(Properties::parse("freq_table 100"), Err(Error::InvalidParameter));
        assert_eq!(Properties::parse(" = 100"), Err(Error::InvalidParameter));
    }
}
