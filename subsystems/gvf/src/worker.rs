//! # GVF Worker
//!
//! Dedicated thread that runs the injection loop. It sleeps until GVF is
//! enabled and an iteration is due, and can be parked across device
//! suspend.
//!
//! ```text
//!   ┌──────────┐  due     ┌───────────┐  sleep idle  ┌──────────┐
//!   │ WAITING  │ ───────► │ ITERATION │ ───────────► │ INJECTING│
//!   └──────────┘ ◄─────── └───────────┘ ◄─────────── └──────────┘
//!        │  ▲                                  park/stop cut short
//!   park │  │ unpark
//!        ▼  │
//!   ┌──────────┐
//!   │  PARKED  │
//!   └──────────┘
//! ```
//!
//! Lock order is worker flags, then GVF state. The controller never holds
//! its own lock while waking the worker, nor while waiting on the injector.

use alloc::sync::Arc;
use core::time::Duration;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use bitflags::bitflags;
use sgpu_core::{Error, Result, WakeSignal};

use crate::controller::Gvf;

/// Thread name of the injection loop
pub const WORKER_NAME: &str = "sgpu_gvf";

bitflags! {
    /// Worker control flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WorkerFlags: u32 {
        /// Park requested
        const PARK = 1 << 0;
        /// Worker acknowledged the park request
        const PARKED = 1 << 1;
        /// Exit requested
        const STOP = 1 << 2;
        /// Controller state changed, re-evaluate
        const KICK = 1 << 3;
    }
}

// =============================================================================
// SHARED STATE
// =============================================================================

#[derive(Debug, Default)]
struct Shared {
    flags: Mutex<WorkerFlags>,
    cond: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, WorkerFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut WorkerFlags)) {
        let mut flags = self.lock();
        f(&mut flags);
        self.cond.notify_all();
    }

    /// Block until an iteration should run; `false` on stop
    fn wait_for_work(&self, gvf: &Gvf) -> bool {
        let mut flags = self.lock();
        loop {
            if flags.contains(WorkerFlags::STOP) {
                return false;
            }
            if flags.contains(WorkerFlags::PARK) {
                if !flags.contains(WorkerFlags::PARKED) {
                    flags.insert(WorkerFlags::PARKED);
                    log::debug!("GVF: worker parked");
                    self.cond.notify_all();
                }
                flags = self.cond.wait(flags).unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            if flags.contains(WorkerFlags::KICK) {
                flags.remove(WorkerFlags::KICK);
                continue;
            }

            flags = match gvf.due_in_ns() {
                Some(0) => return true,
                Some(due) => {
                    self.cond
                        .wait_timeout(flags, Duration::from_nanos(due))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                },
                None => self.cond.wait(flags).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// Sleep for the injected idle time unless parked or stopped
    fn sleep_interruptible(&self, ns: u64) {
        let deadline = Instant::now() + Duration::from_nanos(ns);
        let mut flags = self.lock();
        loop {
            if flags.intersects(WorkerFlags::STOP | WorkerFlags::PARK) {
                return;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return;
            };
            if remaining.is_zero() {
                return;
            }
            flags = self
                .cond
                .wait_timeout(flags, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

impl WakeSignal for Shared {
    fn wake(&self) {
        self.update(|flags| flags.insert(WorkerFlags::KICK));
    }
}

// =============================================================================
// WORKER
// =============================================================================

/// Handle to the injection thread; stops and joins it on drop
#[derive(Debug)]
pub struct GvfWorker {
    shared: Arc<Shared>,
    gvf: Arc<Gvf>,
    handle: Option<JoinHandle<()>>,
}

impl GvfWorker {
    /// Spawn the injection loop for `gvf`
    pub fn spawn(gvf: Arc<Gvf>) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        gvf.attach_waker(shared.clone());

        let thread_gvf = gvf.clone();
        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || run(&thread_gvf, &thread_shared))
            .map_err(|e| {
                log::error!("GVF: failed to create {}: {}", WORKER_NAME, e);
                Error::ThreadSpawn
            });
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                gvf.detach_waker();
                return Err(e);
            },
        };

        log::info!("GVF: worker started");
        Ok(Self {
            shared,
            gvf,
            handle: Some(handle),
        })
    }

    /// Controller driven by this worker
    pub fn gvf(&self) -> &Arc<Gvf> {
        &self.gvf
    }

    /// Current control flags
    pub fn flags(&self) -> WorkerFlags {
        *self.shared.lock()
    }

    /// Stop injecting and wait until the worker acknowledges
    pub fn park(&self) {
        let mut flags = self.shared.lock();
        flags.insert(WorkerFlags::PARK);
        self.shared.cond.notify_all();
        while !flags.intersects(WorkerFlags::PARKED | WorkerFlags::STOP) {
            flags = self.shared.cond.wait(flags).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Resume after [`park`](Self::park)
    pub fn unpark(&self) {
        self.shared
            .update(|flags| flags.remove(WorkerFlags::PARK | WorkerFlags::PARKED));
        log::debug!("GVF: worker unparked");
    }
}

impl Drop for GvfWorker {
    fn drop(&mut self) {
        self.shared.update(|flags| flags.insert(WorkerFlags::STOP));
        self.gvf.detach_waker();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("GVF: worker panicked");
            }
        }
    }
}

fn run(gvf: &Gvf, shared: &Shared) {
    while shared.wait_for_work(gvf) {
        gvf.run_iteration(&mut |ns| shared.sleep_interruptible(ns));
    }
    log::info!("GVF: worker exit");
}
