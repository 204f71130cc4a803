//! # Idle Injectors
//!
//! Strategies that actually stop and restart GPU work around an injected
//! idle period. Both drive the hardware through [`GpuQueueBackend`].
//!
//! | Injector           | Enter                                   | Exit                                   |
//! |--------------------|-----------------------------------------|----------------------------------------|
//! | `SCHED_CONTROL`    | stop every scheduler, drain, power off  | power on, restart schedulers           |
//! | `HW_QUEUE_CONTROL` | park timeouts, unmap gfx queues, power off | map queues, re-arm timeouts, kick, power on |
//!
//! `HW_QUEUE_CONTROL` skips the queue work entirely when the GPU is already
//! power-gated at entry, and then skips the matching map on exit.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use sgpu_core::{Clock, Error, Result};

/// Timeout deadline used to park a ring's job timer during idle
pub const SCHED_PARKED_TIMEOUT_NS: u64 = u64::MAX / 4;

// =============================================================================
// HARDWARE BOUNDARY
// =============================================================================

/// Ring and power control of the GPU
///
/// Every method must be safe to call when no work is pending.
pub trait GpuQueueBackend: Send + Sync {
    // ---- power ----

    /// GPU is currently power-gated
    fn is_power_gated(&self) -> bool;
    /// Force the lowest idle power state
    fn force_power_off(&self);
    /// Leave the forced idle power state
    fn force_power_on(&self);
    /// Hold the power state while touching queues
    fn lock_power(&self) {}
    /// Release [`GpuQueueBackend::lock_power`]
    fn unlock_power(&self) {}

    // ---- scheduler rings ----

    /// Number of scheduler rings
    fn ring_count(&self) -> usize;
    /// Ring exists and its scheduler is running
    fn ring_active(&self, ring: usize) -> bool;
    /// Stop feeding jobs to a ring
    fn stop_scheduler(&self, ring: usize);
    /// Resume feeding jobs to a ring
    fn start_scheduler(&self, ring: usize);
    /// Wait for outstanding fences of a ring
    fn wait_ring_empty(&self, ring: usize) -> Result<()>;
    /// Signal every outstanding fence of a ring
    fn force_completion(&self, ring: usize);

    // ---- graphics hardware queues ----

    /// Number of graphics rings
    fn gfx_ring_count(&self) -> usize;
    /// Move a ring's job timeout to `parked_deadline_ns`; returns the
    /// remaining budget of the previous deadline
    fn suspend_timeout(&self, ring: usize, parked_deadline_ns: u64) -> u64;
    /// Current job timeout deadline of a ring
    fn timeout_deadline_ns(&self, ring: usize) -> u64;
    /// Re-arm a ring's job timeout with `remaining_ns`
    fn resume_timeout(&self, ring: usize, remaining_ns: u64);
    /// Remove a ring's hardware queue
    fn unmap_queue(&self, ring: usize);
    /// Restore a ring's hardware queue
    fn map_queue(&self, ring: usize);
    /// Halt or release the command front end
    fn halt_frontend(&self, _halt: bool) {}
    /// Push the write pointer of a ring with pending jobs; returns whether
    /// anything was pending
    fn kick_pending(&self, ring: usize) -> bool;
}

// =============================================================================
// INJECTOR INTERFACE
// =============================================================================

/// Selectable injector strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InjectorKind {
    /// Stop and start whole schedulers
    SchedControl,
    /// Unmap and map hardware queues
    #[default]
    HwQueueControl,
}

impl InjectorKind {
    /// Every kind, in listing order
    pub const ALL: [InjectorKind; 2] = [Self::SchedControl, Self::HwQueueControl];

    /// Name shown to users
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SchedControl => "SCHED_CONTROL",
            Self::HwQueueControl => "HW_QUEUE_CONTROL",
        }
    }

    /// Look up a kind by name
    pub fn from_name(name: &str) -> Result<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or(Error::UnknownInjector)
    }

    /// Instantiate the strategy
    pub fn build(self, backend: Arc<dyn GpuQueueBackend>, clock: Arc<dyn Clock>) -> Box<dyn IdleInjector> {
        match self {
            Self::SchedControl => Box::new(SchedControlInjector::new(backend)),
            Self::HwQueueControl => Box::new(HwQueueInjector::new(backend, clock)),
        }
    }
}

/// Pauses and resumes GPU work around an idle period
pub trait IdleInjector: Send {
    /// Strategy implemented
    fn kind(&self) -> InjectorKind;
    /// Stop work and force the idle power state
    fn enter_idle(&mut self);
    /// Restore work and the active power state
    fn exit_idle(&mut self);
}

// =============================================================================
// SCHED_CONTROL
// =============================================================================

/// Stops every scheduler for the idle period
pub struct SchedControlInjector {
    backend: Arc<dyn GpuQueueBackend>,
}

impl SchedControlInjector {
    /// Create over a backend
    pub fn new(backend: Arc<dyn GpuQueueBackend>) -> Self {
        Self { backend }
    }
}

impl IdleInjector for SchedControlInjector {
    fn kind(&self) -> InjectorKind {
        InjectorKind::SchedControl
    }

    fn enter_idle(&mut self) {
        for ring in 0..self.backend.ring_count() {
            if !self.backend.ring_active(ring) {
                continue;
            }
            self.backend.stop_scheduler(ring);
            if self.backend.wait_ring_empty(ring).is_err() {
                self.backend.force_completion(ring);
            }
        }
        log::debug!("GVF: stop schedulers");
        self.backend.force_power_off();
    }

    fn exit_idle(&mut self) {
        self.backend.force_power_on();
        for ring in 0..self.backend.ring_count() {
            if self.backend.ring_active(ring) {
                self.backend.start_scheduler(ring);
            }
        }
        log::debug!("GVF: start schedulers");
    }
}

// =============================================================================
// HW_QUEUE_CONTROL
// =============================================================================

/// Unmaps graphics hardware queues for the idle period
pub struct HwQueueInjector {
    backend: Arc<dyn GpuQueueBackend>,
    clock: Arc<dyn Clock>,
    saved_timeouts: Vec<u64>,
    parked_deadline_ns: u64,
    skip_unmap: bool,
}

impl HwQueueInjector {
    /// Create over a backend
    pub fn new(backend: Arc<dyn GpuQueueBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            saved_timeouts: Vec::new(),
            parked_deadline_ns: 0,
            skip_unmap: false,
        }
    }

    /// The last entry found the GPU already power-gated
    pub fn skipped_unmap(&self) -> bool {
        self.skip_unmap
    }
}

impl IdleInjector for HwQueueInjector {
    fn kind(&self) -> InjectorKind {
        InjectorKind::HwQueueControl
    }

    fn enter_idle(&mut self) {
        if self.backend.is_power_gated() {
            log::debug!("GVF: skip unmap HW queues");
            self.skip_unmap = true;
            self.backend.force_power_off();
            return;
        }

        self.skip_unmap = false;
        self.parked_deadline_ns = self.clock.now_ns().saturating_add(SCHED_PARKED_TIMEOUT_NS);

        let rings = self.backend.gfx_ring_count();
        self.saved_timeouts.clear();
        self.saved_timeouts.resize(rings, 0);

        self.backend.lock_power();
        for ring in 0..rings {
            if !self.backend.ring_active(ring) {
                continue;
            }
            self.saved_timeouts[ring] = self.backend.suspend_timeout(ring, self.parked_deadline_ns);
            self.backend.unmap_queue(ring);
        }
        self.backend.unlock_power();

        log::debug!("GVF: unmap HW queues");
        self.backend.force_power_off();
    }

    fn exit_idle(&mut self) {
        if self.skip_unmap {
            log::debug!("GVF: skip map HW queues");
            self.backend.force_power_on();
            return;
        }

        self.backend.lock_power();
        self.backend.halt_frontend(true);
        for ring in 0..self.saved_timeouts.len() {
            if !self.backend.ring_active(ring) {
                continue;
            }
            self.backend.map_queue(ring);
            // A job submitted during idle already re-armed the timer
            if self.backend.timeout_deadline_ns(ring) < self.parked_deadline_ns {
                continue;
            }
            self.backend.resume_timeout(ring, self.saved_timeouts[ring]);
        }
        self.backend.halt_frontend(false);

        for ring in 0..self.saved_timeouts.len() {
            if self.backend.kick_pending(ring) {
                log::trace!("GVF: ring {} kicked after idle", ring);
            }
        }
        self.backend.unlock_power();

        log::debug!("GVF: map HW queues");
        self.backend.force_power_on();
    }
}

// =============================================================================
// TEST BACKEND
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicBool, Ordering};
    use spin::Mutex;

    /// Records every backend call in order
    #[derive(Default)]
    pub struct RecordingBackend {
        pub gated: AtomicBool,
        pub rearmed_during_idle: AtomicBool,
        pub calls: Mutex<Vec<String>>,
    }

    impl RecordingBackend {
        fn log(&self, call: String) {
            self.calls.lock().push(call);
        }

        pub fn take(&self) -> Vec<String> {
            core::mem::take(&mut *self.calls.lock())
        }
    }

    impl GpuQueueBackend for RecordingBackend {
        fn is_power_gated(&self) -> bool {
            self.gated.load(Ordering::SeqCst)
        }
        fn force_power_off(&self) {
            self.log("power_off".into());
        }
        fn force_power_on(&self) {
            self.log("power_on".into());
        }
        fn ring_count(&self) -> usize {
            2
        }
        fn ring_active(&self, ring: usize) -> bool {
            ring == 0
        }
        fn stop_scheduler(&self, ring: usize) {
            self.log(alloc::format!("stop{}", ring));
        }
        fn start_scheduler(&self, ring: usize) {
            self.log(alloc::format!("start{}", ring));
        }
        fn wait_ring_empty(&self, _ring: usize) -> Result<()> {
            Err(Error::Busy)
        }
        fn force_completion(&self, ring: usize) {
            self.log(alloc::format!("complete{}", ring));
        }
        fn gfx_ring_count(&self) -> usize {
            1
        }
        fn suspend_timeout(&self, ring: usize, _parked: u64) -> u64 {
            self.log(alloc::format!("suspend_timeout{}", ring));
            5_000
        }
        fn timeout_deadline_ns(&self, _ring: usize) -> u64 {
            if self.rearmed_during_idle.load(Ordering::SeqCst) {
                0
            } else {
                u64::MAX
            }
        }
        fn resume_timeout(&self, ring: usize, remaining_ns: u64) {
            self.log(alloc::format!("resume_timeout{}:{}", ring, remaining_ns));
        }
        fn unmap_queue(&self, ring: usize) {
            self.log(alloc::format!("unmap{}", ring));
        }
        fn map_queue(&self, ring: usize) {
            self.log(alloc::format!("map{}", ring));
        }
        fn kick_pending(&self, _ring: usize) -> bool {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingBackend;
    use super::*;
    use core::sync::atomic::Ordering;
    use sgpu_core::ManualClock;

    fn hwq(backend: &Arc<RecordingBackend>) -> HwQueueInjector {
        HwQueueInjector::new(backend.clone(), Arc::new(ManualClock::new(0)))
    }

    #[test]
    fn test_names() {
        assert_eq!(InjectorKind::from_name("SCHED_CONTROL"), Ok(InjectorKind::SchedControl));
        assert_eq!(InjectorKind::from_name(" HW_QUEUE_CONTROL\n"), Ok(InjectorKind::HwQueueControl));
        assert_eq!(InjectorKind::from_name("NONE"), Err(Error::UnknownInjector));
        assert_eq!(InjectorKind::default(), InjectorKind::HwQueueControl);
    }

    #[test]
    fn test_sched_control_sequence() {
        let backend = Arc::new(RecordingBackend::default());
        let mut inj = SchedControlInjector::new(backend.clone());
        inj.enter_idle();
        assert_eq!(backend.take(), ["stop0", "complete0", "power_off"]);
        inj.exit_idle();
        assert_eq!(backend.take(), ["power_on", "start0"]);
    }

    #[test]
    fn test_hwq_sequence() {
        let backend = Arc::new(RecordingBackend::default());
        let mut inj = hwq(&backend);
        inj.enter_idle();
        assert!(!inj.skipped_unmap());
        assert_eq!(backend.take(), ["suspend_timeout0", "unmap0", "power_off"]);
        inj.exit_idle();
        assert_eq!(backend.take(), ["map0", "resume_timeout0:5000", "power_on"]);
    }

    #[test]
    fn test_hwq_skips_when_gated() {
        let backend = Arc::new(RecordingBackend::default());
        backend.gated.store(true, Ordering::SeqCst);
        let mut inj = hwq(&backend);
        inj.enter_idle();
        assert!(inj.skipped_unmap());
        inj.exit_idle();
        assert_eq!(backend.take(), ["power_off", "power_on"]);
    }

    #[test]
    fn test_hwq_keeps_refreshed_timeout() {
        let backend = Arc::new(RecordingBackend::default());
        let mut inj = hwq(&backend);
        inj.enter_idle();
        backend.take();
        backend.rearmed_during_idle.store(true, Ordering::SeqCst);
        inj.exit_idle();
        assert_eq!(backend.take(), ["map0", "power_on"]);
    }

    #[test]
    fn test_build() {
        let backend = Arc::new(RecordingBackend::default());
        let clock = Arc::new(ManualClock::new(0));
        for kind in InjectorKind::ALL {
            assert_eq!(kind.build(backend.clone(), clock.clone()).kind(), kind);
        }
    }
}
