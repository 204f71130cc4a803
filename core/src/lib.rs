//! # SGPU Core
//!
//! Shared building blocks for the SGPU DVFS stack: the frequency table, the
//! per-window utilization snapshot, the clock abstraction, the device
//! property parser and the narrow traits through which the governor and the
//! GVF scheduler talk to the rest of the driver.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          sgpu-core                           │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//! │  │   Table     │  │    Time     │  │   Collaborators      │  │
//! │  │ (levels,    │  │  (Clock,    │  │  (utilization, QoS,  │  │
//! │  │  arrays)    │  │  deadlines) │  │   idle, transition)  │  │
//! │  └─────────────┘  └─────────────┘  └──────────────────────┘  │
//! │  ┌─────────────┐  ┌─────────────┐                            │
//! │  │   Config    │  │    Error    │                            │
//! │  └─────────────┘  └─────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Level `0` is always the fastest operating point. Higher levels are
//! slower; the highest levels may be GVF sub-levels that only exist as
//! virtual frequencies emulated by idle injection.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod config;
pub mod error;
pub mod table;
pub mod time;
pub mod traits;
pub mod utilization;

// Re-exports for convenience
pub use config::Properties;
pub use error::{Error, Result};
pub use table::FrequencyTable;
pub use time::{Clock, ManualClock};
pub use traits::*;
pub use utilization::UtilizationSnapshot;

#[cfg(feature = "std")]
pub use time::MonotonicClock;

/// Frequency in kHz, the unit used by every table and knob.
pub type Frequency = u64;
