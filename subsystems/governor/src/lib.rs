//! # SGPU Governor
//!
//! Utilization-driven frequency level selection for the SGPU. Each sampling
//! tick turns the busy counters of the last window into a level of the
//! frequency table, clamped by QoS, and hands sub-minimum levels to GVF.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         sgpu-governor                            │
//! │                                                                  │
//! │  snapshot ──► ┌──────────┐   util   ┌───────────────────────┐    │
//! │               │   math   │ ───────► │ policy                │    │
//! │               │ cube root│          │  static               │    │
//! │               └──────────┘          │  conservative         │    │
//! │                                     │  interactive          │    │
//! │  tunables ────────────────────────► │  (profiler)           │    │
//! │                                     └──────────┬────────────┘    │
//! │                                          level │                 │
//! │                                                ▼                 │
//! │                                     ┌───────────────────────┐    │
//! │  QoS bounds ──────────────────────► │ Governor::tick        │ ──►│ TickDecision
//! │                                     │ clamp, CL-boost, GVF  │    │
//! │                                     └───────────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Level `0` is the fastest entry of the table. Levels at or beyond
//! [`Governor::gvf_start_level`] are emulated by idle injection.

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

pub mod governor;
pub mod math;
pub mod policy;
pub mod tunables;

pub use governor::{Governor, GovernorConfig, GovernorState, TickDecision};
pub use math::{Thresholds, Utilization};
pub use policy::{
    ConservativePolicy, GovernorPolicy, HysteresisTimers, InteractivePolicy, PolicyContext, StaticPolicy,
};
pub use tunables::{boost_level, LevelArray, Tunables};

/// Name of the policy selected when the device names none
pub const DEFAULT_POLICY_NAME: &str = "conservative";
