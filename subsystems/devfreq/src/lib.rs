//! # SGPU Devfreq
//!
//! The devfreq device of the SGPU: builds the operating table from device
//! properties, runs the governor every polling period and programs the
//! resulting frequency. Virtual frequencies below the lowest real operating
//! point are served by GVF idle injection at its run frequency.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                           sgpu-devfreq                             │
//! │                                                                    │
//! │   Properties ──► DeviceConfig ──► DeviceContext::probe             │
//! │                                        │                           │
//! │             ┌──────────────────────────┼──────────────────────┐    │
//! │             ▼                          ▼                      ▼    │
//! │      ┌──────────────┐          ┌──────────────┐       ┌───────────┐│
//! │      │ FrequencyTbl │          │   Governor   │ ────► │    Gvf    ││
//! │      │ real + GVF   │          │ tick / knobs │ level │  + worker ││
//! │      └──────────────┘          └──────┬───────┘       └───────────┘│
//! │                                       │ freq                       │
//! │                                       ▼                            │
//! │                              FrequencyTransition                   │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The platform drives [`DeviceContext::update`] once per
//! [`DeviceContext::polling_ms`]; every other method is a runtime knob.

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
pub mod device;

pub use config::{DeviceConfig, DEFAULT_INITIAL_FREQ, DEFAULT_POLLING_MS};
pub use device::{DeviceContext, DeviceDeps, DeviceStatus};

pub use sgpu_core::{Error, Frequency, Properties, Result};
