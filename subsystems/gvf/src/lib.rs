//! # SGPU GVF (GPU Virtual Frequency)
//!
//! Emulates operating points below the lowest real GPU frequency. The GPU
//! stays pinned at a fixed run frequency and the scheduler periodically
//! forces it idle, so that its average throughput matches a virtual
//! frequency.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                              sgpu-gvf                                │
//! │                                                                      │
//! │   governor level ──► ┌──────────────┐   params(level)                │
//! │                      │  Controller  │ ───────────────┐               │
//! │                      │ (level, knobs│                ▼               │
//! │                      │  enable)     │        ┌──────────────┐        │
//! │                      └──────┬───────┘        │ RATIO policy │        │
//! │                        wake │                └──────┬───────┘        │
//! │                             ▼                 calc_idle              │
//! │                      ┌──────────────┐               │                │
//! │                      │    Worker    │ ◄─────────────┘                │
//! │                      │ (std thread) │                                │
//! │                      └──────┬───────┘                                │
//! │                 enter/exit  │                                        │
//! │                             ▼                                        │
//! │         ┌─────────────────────────┬───────────────────────┐          │
//! │         │ SCHED_CONTROL           │ HW_QUEUE_CONTROL      │          │
//! │         │ stop schedulers, drain  │ unmap gfx queues,     │          │
//! │         │ rings, power off        │ park timeouts, off    │          │
//! │         └─────────────────────────┴───────────────────────┘          │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Level `0` disables injection. Level `n > 0` selects the parameters
//! derived for the `n`-th virtual sub-level counting from the top of the
//! GVF table, so higher levels rest longer.

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

pub mod controller;
pub mod governor;
pub mod injector;
pub mod param;
pub mod window;

#[cfg(feature = "std")]
pub mod worker;

pub use controller::{Gvf, GvfConfig, GvfDeps, Iteration, WindowReport, DEFAULT_MONITOR_WINDOW_MS};
pub use governor::{GvfGovernor, RatioGovernor};
pub use injector::{GpuQueueBackend, IdleInjector, InjectorKind};
pub use param::{GvfParamTable, GvfParams};
pub use window::{IdleWindow, WindowSample};

#[cfg(feature = "std")]
pub use worker::{GvfWorker, WorkerFlags};
