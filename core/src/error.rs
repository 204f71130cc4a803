//! # Error Handling
//!
//! Typed errors shared by every crate of the DVFS stack.
//!
//! - Configuration errors are fatal to the subsystem being initialized only
//! - Runtime knob errors reject the write and leave state untouched
//! - Per-tick arithmetic never produces an error

use core::fmt;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// Unified error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// A required device property is absent
    MissingProperty(&'static str),
    /// A device property could not be parsed
    InvalidProperty(&'static str),
    /// Frequency table is empty or not non-increasing
    InvalidTable,
    /// Per-level array specification is malformed
    InvalidArray,

    // =========================================================================
    // Parameter Errors
    // =========================================================================
    /// Invalid parameter provided
    InvalidParameter,
    /// Level is outside of the valid range
    InvalidLevel(usize),
    /// Value is outside of the accepted bounds
    OutOfRange {
        /// Rejected value
        value: u64,
        /// Lower bound (inclusive)
        min: u64,
        /// Upper bound (inclusive)
        max: u64,
    },

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// No frequency governor with that name
    UnknownGovernor,
    /// No idle injector with that name
    UnknownInjector,
    /// Name already registered
    AlreadyRegistered,

    // =========================================================================
    // State Errors
    // =========================================================================
    /// Subsystem was never initialized
    NotInitialized,
    /// Operation conflicts with the current state
    Busy,

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// Background worker could not be started
    ThreadSpawn,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingProperty(name) => write!(f, "missing property `{}`", name),
            Self::InvalidProperty(name) => write!(f, "invalid property `{}`", name),
            Self::InvalidTable => write!(f, "invalid frequency table"),
            Self::InvalidArray => write!(f, "invalid per-level array"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::InvalidLevel(level) => write!(f, "invalid level {}", level),
            Self::OutOfRange { value, min, max } => {
                write!(f, "value {} out of range [{}, {}]", value, min, max)
            },
            Self::UnknownGovernor => write!(f, "unknown governor"),
            Self::UnknownInjector => write!(f, "unknown injector"),
            Self::AlreadyRegistered => write!(f, "already registered"),
            Self::NotInitialized => write!(f, "not initialized"),
            Self::Busy => write!(f, "resource busy"),
            Self::ThreadSpawn => write!(f, "failed to spawn worker thread"),
        }
    }
}

impl Error {
    /// Check if the error comes from configuration parsing
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::MissingProperty(_) | Self::InvalidProperty(_) | Self::InvalidTable | Self::InvalidArray
        )
    }

    /// Build an out-of-range error
    pub const fn out_of_range(value: u64, min: u64, max: u64) -> Self {
        Self::OutOfRange { value, min, max }
    }
}
