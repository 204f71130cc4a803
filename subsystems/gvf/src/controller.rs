//! # GVF Controller
//!
//! Owns the GVF state and implements the level controller, the runtime
//! knobs and one iteration of the injection loop.
//!
//! ## State Machine
//!
//! ```text
//!            set_level(n > 0)             set_level(m != n, m > 0)
//!   ┌──────────┐ ─────────────────► ┌──────────┐ ───┐ init(m), log
//!   │ DISABLED │                    │ ENABLED  │ ◄──┘
//!   └──────────┘ ◄───────────────── └──────────┘
//!                   set_level(0)
//! ```
//!
//! Enabling captures the monitor-window baseline and wakes the worker.
//! Parking (suspend) belongs to the worker and is independent of this
//! state.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::RangeInclusive;

use sgpu_core::time::{ms_to_ns, ns_to_ms};
use sgpu_core::{Clock, Error, Frequency, IdleTimeSource, Properties, Result, WakeSignal};
use spin::Mutex;

use crate::governor::GvfGovernor;
use crate::injector::{GpuQueueBackend, IdleInjector, InjectorKind};
use crate::param::{GvfParamTable, GvfParams};
use crate::window::{IdleWindow, WindowSample};

/// Default length of the idle-ratio monitor window
pub const DEFAULT_MONITOR_WINDOW_MS: u32 = 10_000;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Static GVF configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GvfConfig {
    /// Virtual sub-level frequencies, ascending
    pub table: Vec<Frequency>,
    /// Frequency the GPU actually runs at while injecting
    pub run_freq: Frequency,
    /// Length of the idle-ratio monitor window
    pub monitor_window_ms: u32,
}

impl GvfConfig {
    /// Read `gvf_table`, `gvf_run_freq` and `gvf_window_ms`
    ///
    /// Returns `Ok(None)` when the device declares no GVF table.
    pub fn from_properties(props: &Properties) -> Result<Option<Self>> {
        let Some(table) = props.u32_list("gvf_table")? else {
            return Ok(None);
        };
        let run_freq = props
            .u32("gvf_run_freq")?
            .ok_or(Error::MissingProperty("gvf_run_freq"))?;
        let monitor_window_ms = props.u32_or("gvf_window_ms", DEFAULT_MONITOR_WINDOW_MS)?;
        Ok(Some(Self {
            table: table.into_iter().map(Frequency::from).collect(),
            run_freq: Frequency::from(run_freq),
            monitor_window_ms,
        }))
    }

    fn validate(&self) -> Result<()> {
        if self.table.is_empty() || self.table.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::InvalidProperty("gvf_table"));
        }
        if self.run_freq == 0 {
            return Err(Error::InvalidProperty("gvf_run_freq"));
        }
        Ok(())
    }
}

/// External collaborators of the controller
#[derive(Clone)]
pub struct GvfDeps {
    /// Cumulative idle time
    pub idle_source: Arc<dyn IdleTimeSource>,
    /// Ring and power control
    pub backend: Arc<dyn GpuQueueBackend>,
    /// Monotonic time
    pub clock: Arc<dyn Clock>,
}

// =============================================================================
// STATE
// =============================================================================

/// Mutable GVF state, guarded by the controller lock
#[derive(Debug)]
struct GvfState {
    enable: bool,
    level: usize,
    max_level: usize,
    run_freq: Frequency,
    window: IdleWindow,
    monitor_window_ms: u32,
    sampling_time_ms: u32,
    next_wake_ns: u64,
    params: GvfParamTable,
    governor: GvfGovernor,
    injector: InjectorKind,
}

/// Outcome of one scheduler iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// GVF is disabled; nothing ran
    Disabled,
    /// Already idle enough, no injection
    Skipped,
    /// Idle was injected for this long
    Injected {
        /// Injected idle time
        idle_ms: u64,
    },
}

/// Idle ratio reported at a window refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowReport {
    /// Idle share over the finished window
    pub idle_ratio: u64,
    /// Length of the finished window
    pub elapsed_ms: u64,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// GPU Virtual Frequency controller
pub struct Gvf {
    state: Mutex<GvfState>,
    table: Vec<Frequency>,
    injector: Mutex<Box<dyn IdleInjector>>,
    deps: GvfDeps,
    waker: Mutex<Option<Arc<dyn WakeSignal>>>,
}

impl Gvf {
    /// Build a disabled controller
    pub fn new(config: GvfConfig, deps: GvfDeps) -> Result<Self> {
        config.validate()?;
        let params = GvfParamTable::derive(&config.table, config.run_freq);
        let injector = InjectorKind::default();
        let state = GvfState {
            enable: false,
            level: 0,
            max_level: config.table.len() + 1,
            run_freq: config.run_freq,
            window: IdleWindow::default(),
            monitor_window_ms: config.monitor_window_ms,
            sampling_time_ms: params.custom().sampling_time_ms,
            next_wake_ns: 0,
            params,
            governor: GvfGovernor::default(),
            injector,
        };
        log::info!(
            "GVF: {} sub-levels, run_freq {} governor {} injector {}",
            config.table.len(),
            config.run_freq,
            state.governor.name(),
            injector.name()
        );
        Ok(Self {
            state: Mutex::new(state),
            injector: Mutex::new(injector.build(deps.backend.clone(), deps.clock.clone())),
            table: config.table,
            deps,
            waker: Mutex::new(None),
        })
    }

    /// Build from device properties
    ///
    /// A missing or malformed GVF description yields `None`; the device
    /// then runs as if GVF did not exist.
    pub fn probe(props: &Properties, deps: GvfDeps) -> Option<Self> {
        let config = match GvfConfig::from_properties(props) {
            Ok(Some(config)) => config,
            Ok(None) => {
                log::info!("GVF: disabled, no gvf_table");
                return None;
            },
            Err(e) => {
                log::warn!("GVF: disabled, {}", e);
                return None;
            },
        };
        match Self::new(config, deps) {
            Ok(gvf) => Some(gvf),
            Err(e) => {
                log::warn!("GVF: disabled, {}", e);
                None
            },
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of levels including the disabled level 0
    pub fn max_level(&self) -> usize {
        self.state.lock().max_level
    }

    /// Number of virtual sub-levels appended to the frequency table
    pub fn sublevel_count(&self) -> usize {
        self.table.len()
    }

    /// Virtual sub-level frequencies, ascending
    pub fn table(&self) -> &[Frequency] {
        &self.table
    }

    /// Active level
    pub fn level(&self) -> usize {
        self.state.lock().level
    }

    /// Idle injection is running
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enable
    }

    /// Frequency the GPU is pinned to while injecting
    pub fn run_freq(&self) -> Frequency {
        self.state.lock().run_freq
    }

    /// Sampling period of the active parameters
    pub fn sampling_time_ms(&self) -> u32 {
        self.state.lock().sampling_time_ms
    }

    /// Length of the idle-ratio monitor window
    pub fn monitor_window_ms(&self) -> u32 {
        self.state.lock().monitor_window_ms
    }

    /// Parameters of `level`
    pub fn params(&self, level: usize) -> Option<GvfParams> {
        self.state.lock().params.get(level)
    }

    // =========================================================================
    // Level Controller
    // =========================================================================

    /// Drive GVF from the governor's level decision
    pub fn set_level(&self, level: usize) -> Result<()> {
        let woke = {
            let mut state = self.state.lock();
            if state.level == level {
                return Ok(());
            }
            if level >= state.max_level {
                log::info!("GVF: invalid level {}", level);
                return Err(Error::InvalidLevel(level));
            }

            let mut woke = false;
            if level > 0 {
                self.init_governor(&mut state, level);
                if state.level == 0 {
                    self.set_enable(&mut state, true);
                    woke = true;
                } else {
                    log::info!("GVF: level change {} -> {}", state.level, level);
                }
            } else {
                self.set_enable(&mut state, false);
            }
            state.level = level;
            woke
        };
        if woke {
            self.wake();
        }
        Ok(())
    }

    /// Start or stop injection by hand with the custom level-0 parameters
    ///
    /// Rejected while the governor drives GVF through a level.
    pub fn set_enable_manual(&self, enable: bool) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.level > 0 {
                log::error!("GVF: enabled by level {}", state.level);
                return Err(Error::Busy);
            }
            if enable {
                self.init_governor(&mut state, 0);
            }
            self.set_enable(&mut state, enable);
        }
        if enable {
            self.wake();
        }
        Ok(())
    }

    fn init_governor(&self, state: &mut GvfState, level: usize) {
        if let Some(params) = state.params.get(level) {
            state.sampling_time_ms = state.governor.init(&params);
        }
    }

    fn set_enable(&self, state: &mut GvfState, enable: bool) {
        if enable {
            let now = self.deps.clock.now_ns();
            state.enable = true;
            state.window.reset(now, self.deps.idle_source.idle_time_ns());
            state.next_wake_ns = now.saturating_add(ms_to_ns(u64::from(state.sampling_time_ms)));
        } else {
            state.enable = false;
        }
        log::info!(
            "GVF: enable({}) monitor_window_ms({})",
            state.enable,
            state.monitor_window_ms
        );
    }

    // =========================================================================
    // Runtime Knobs
    // =========================================================================

    /// Change the run frequency within `bounds`
    pub fn set_run_freq(&self, freq: Frequency, bounds: RangeInclusive<Frequency>) -> Result<()> {
        if !bounds.contains(&freq) {
            return Err(Error::out_of_range(freq, *bounds.start(), *bounds.end()));
        }
        self.state.lock().run_freq = freq;
        Ok(())
    }

    /// Change the monitor window length
    pub fn set_monitor_window_ms(&self, window_ms: u32) {
        self.state.lock().monitor_window_ms = window_ms;
    }

    /// Replace the custom level-0 parameters
    pub fn set_custom_params(&self, params: GvfParams) -> Result<()> {
        self.state.lock().params.set(0, params)
    }

    /// Name of the active GVF governor
    pub fn governor_name(&self) -> &'static str {
        self.state.lock().governor.name()
    }

    /// Switch the GVF governor; re-initializes it when running
    pub fn set_governor(&self, name: &str) -> Result<()> {
        let governor = GvfGovernor::from_name(name).map_err(|e| {
            log::error!("GVF: invalid governor {}", name.trim());
            e
        })?;
        let mut state = self.state.lock();
        state.governor = governor;
        if state.enable {
            let level = state.level;
            self.init_governor(&mut state, level);
        }
        log::info!("GVF: governor {}", state.governor.name());
        Ok(())
    }

    /// Name of the active injector
    pub fn injector_name(&self) -> &'static str {
        self.state.lock().injector.name()
    }

    /// Switch the injector; rejected while injection is enabled or an
    /// injection is still in flight
    ///
    /// Never waits on the injector, so the state lock is not held across an
    /// injection.
    pub fn set_injector(&self, name: &str) -> Result<()> {
        let kind = InjectorKind::from_name(name).map_err(|e| {
            log::error!("GVF: invalid injector {}", name.trim());
            e
        })?;
        if self.state.lock().enable {
            log::error!("GVF: cannot change injector while enabled");
            return Err(Error::Busy);
        }
        let Some(mut injector) = self.injector.try_lock() else {
            log::error!("GVF: cannot change injector during injection");
            return Err(Error::Busy);
        };
        let mut state = self.state.lock();
        if state.enable {
            log::error!("GVF: cannot change injector while enabled");
            return Err(Error::Busy);
        }
        *injector = kind.build(self.deps.backend.clone(), self.deps.clock.clone());
        state.injector = kind;
        log::info!("GVF: injector {}", kind.name());
        Ok(())
    }

    // =========================================================================
    // Scheduler
    // =========================================================================

    /// Register the worker to wake on enable
    pub fn attach_waker(&self, waker: Arc<dyn WakeSignal>) {
        *self.waker.lock() = Some(waker);
    }

    /// Forget the registered worker
    pub fn detach_waker(&self) {
        *self.waker.lock() = None;
    }

    fn wake(&self) {
        let waker = self.waker.lock().clone();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Time until the next iteration is due; `None` while disabled
    pub fn due_in_ns(&self) -> Option<u64> {
        let state = self.state.lock();
        if !state.enable {
            return None;
        }
        Some(state.next_wake_ns.saturating_sub(self.deps.clock.now_ns()))
    }

    /// Run one iteration of the injection loop
    ///
    /// `sleep` blocks for the injected idle time; it may return early when
    /// the worker is asked to park or stop.
    pub fn run_iteration(&self, sleep: &mut dyn FnMut(u64)) -> Iteration {
        let idle_ms = {
            let mut state = self.state.lock();
            if !state.enable {
                return Iteration::Disabled;
            }
            let now = self.deps.clock.now_ns();
            state.next_wake_ns = now.saturating_add(ms_to_ns(u64::from(state.sampling_time_ms)));
            let sample = state.window.sample(now, self.deps.idle_source.idle_time_ns());
            ns_to_ms(state.governor.calc_idle(&sample))
        };

        log::trace!("GVF: calc_idle {}ms", idle_ms);
        let outcome = if idle_ms == 0 {
            Iteration::Skipped
        } else {
            let mut injector = self.injector.lock();
            injector.enter_idle();
            sleep(ms_to_ns(idle_ms));
            injector.exit_idle();
            Iteration::Injected { idle_ms }
        };

        self.refresh_window();
        outcome
    }

    /// Close the monitor window once it has run its full length
    pub fn refresh_window(&self) -> Option<WindowReport> {
        let mut state = self.state.lock();
        let now = self.deps.clock.now_ns();
        let idle = self.deps.idle_source.idle_time_ns();
        let sample: WindowSample = state.window.sample(now, idle);
        let elapsed_ms = ns_to_ms(sample.elapsed_ns);
        if elapsed_ms < u64::from(state.monitor_window_ms) {
            return None;
        }
        let idle_ratio = sample.idle_ratio().unwrap_or(0);
        log::info!("GVF: refresh window: idle {}% in {}ms", idle_ratio, elapsed_ms);
        state.window.reset(now, idle);
        Some(WindowReport {
            idle_ratio,
            elapsed_ms,
        })
    }
}

impl core::fmt::Debug for Gvf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Gvf")
            .field("table", &self.table)
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::injector::testing::RecordingBackend;
    use core::sync::atomic::{AtomicU64, Ordering};
    use sgpu_core::ManualClock;

    /// Idle counter driven by the test
    #[derive(Default)]
    pub struct FakeIdle(pub AtomicU64);

    impl FakeIdle {
        pub fn add_ms(&self, ms: u64) {
            self.0.fetch_add(ms_to_ns(ms), Ordering::SeqCst);
        }
    }

    impl IdleTimeSource for FakeIdle {
        fn idle_time_ns(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    pub struct Harness {
        pub clock: Arc<ManualClock>,
        pub idle: Arc<FakeIdle>,
        pub backend: Arc<RecordingBackend>,
        pub gvf: Gvf,
    }

    pub fn harness(table: &[Frequency], run_freq: Frequency) -> Harness {
        let clock = Arc::new(ManualClock::new(1_000));
        let idle = Arc::new(FakeIdle::default());
        let backend = Arc::new(RecordingBackend::default());
        let deps = GvfDeps {
            idle_source: idle.clone(),
            backend: backend.clone(),
            clock: clock.clone(),
        };
        let config = GvfConfig {
            table: table.to_vec(),
            run_freq,
            monitor_window_ms: DEFAULT_MONITOR_WINDOW_MS,
        };
        let gvf = Gvf::new(config, deps).unwrap();
        Harness {
            clock,
            idle,
            backend,
            gvf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use sgpu_core::time::NSEC_PER_MSEC;

    struct CountingWaker(AtomicUsize);

    impl WakeSignal for CountingWaker {
        fn wake(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_config_from_properties() {
        let props = Properties::new()
            .with("gvf_table", "100 200")
            .with("gvf_run_freq", "150");
        let config = GvfConfig::from_properties(&props).unwrap().unwrap();
        assert_eq!(config.table, alloc::vec![100, 200]);
        assert_eq!(config.run_freq, 150);
        assert_eq!(config.monitor_window_ms, DEFAULT_MONITOR_WINDOW_MS);

        assert_eq!(GvfConfig::from_properties(&Properties::new()), Ok(None));
        let missing = Properties::new().with("gvf_table", "100");
        assert_eq!(
            GvfConfig::from_properties(&missing),
            Err(Error::MissingProperty("gvf_run_freq"))
        );
    }

    #[test]
    fn test_probe_degrades() {
        let h = harness(&[100], 200);
        let deps = h.gvf.deps.clone();
        let bad = Properties::new().with("gvf_table", "300 100").with("gvf_run_freq", "400");
        assert!(Gvf::probe(&bad, deps.clone()).is_none());
        assert!(Gvf::probe(&Properties::new(), deps.clone()).is_none());
        let good = Properties::new().with("gvf_table", "100 300").with("gvf_run_freq", "400");
        assert_eq!(Gvf::probe(&good, deps).map(|g| g.max_level()), Some(3));
    }

    #[test]
    fn test_enable_on_first_level() {
        let h = harness(&[100, 200], 150);
        let waker = Arc::new(CountingWaker(AtomicUsize::new(0)));
        h.gvf.attach_waker(waker.clone());
        h.idle.add_ms(5);

        assert_eq!(h.gvf.max_level(), 3);
        assert!(!h.gvf.is_enabled());
        h.gvf.set_level(1).unwrap();
        assert!(h.gvf.is_enabled());
        assert_eq!(h.gvf.level(), 1);
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);

        // Baseline captured at enable
        let state = h.gvf.state.lock();
        assert_eq!(state.window.sample(1_000, ms_to_ns(5)).elapsed_ns, 0);
        assert_eq!(state.window.sample(1_000, ms_to_ns(5)).idle_ns, 0);
    }

    #[test]
    fn test_set_level_idempotent() {
        let h = harness(&[100, 200], 150);
        let waker = Arc::new(CountingWaker(AtomicUsize::new(0)));
        h.gvf.attach_waker(waker.clone());
        h.gvf.set_level(2).unwrap();
        h.clock.advance_ms(3);
        h.gvf.set_level(2).unwrap();
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
        assert_eq!(h.gvf.state.lock().window.base_time_ns(), 1_000);
    }

    #[test]
    fn test_level_change_keeps_enabled() {
        let h = harness(&[100, 200], 400);
        h.gvf.set_level(1).unwrap();
        h.clock.advance_ms(3);
        h.gvf.set_level(2).unwrap();
        assert!(h.gvf.is_enabled());
        assert_eq!(h.gvf.state.lock().window.base_time_ns(), 1_000);
        let governor = h.gvf.state.lock().governor;
        match governor {
            GvfGovernor::Ratio(r) => assert_eq!(r.target_ratio(), 25),
        }
    }

    #[test]
    fn test_disable_and_reject() {
        let h = harness(&[100, 200], 150);
        assert_eq!(h.gvf.set_level(3), Err(Error::InvalidLevel(3)));
        assert_eq!(h.gvf.level(), 0);
        h.gvf.set_level(2).unwrap();
        h.gvf.set_level(0).unwrap();
        assert!(!h.gvf.is_enabled());
        assert_eq!(h.gvf.due_in_ns(), None);
    }

    #[test]
    fn test_manual_enable() {
        let h = harness(&[100], 200);
        h.gvf.set_custom_params(GvfParams::with_target(40)).unwrap();
        h.gvf.set_enable_manual(true).unwrap();
        assert!(h.gvf.is_enabled());
        h.gvf.set_enable_manual(false).unwrap();
        assert!(!h.gvf.is_enabled());

        h.gvf.set_level(1).unwrap();
        assert_eq!(h.gvf.set_enable_manual(false), Err(Error::Busy));
        assert!(h.gvf.is_enabled());
    }

    #[test]
    fn test_run_freq_bounds() {
        let h = harness(&[100], 200);
        assert!(h.gvf.set_run_freq(300, 150..=400).is_ok());
        assert_eq!(h.gvf.run_freq(), 300);
        assert_eq!(h.gvf.set_run_freq(500, 150..=400), Err(Error::out_of_range(500, 150, 400)));
        assert_eq!(h.gvf.run_freq(), 300);
    }

    #[test]
    fn test_injector_switch_rules() {
        let h = harness(&[100], 200);
        assert_eq!(h.gvf.injector_name(), "HW_QUEUE_CONTROL");
        h.gvf.set_injector("SCHED_CONTROL").unwrap();
        assert_eq!(h.gvf.injector.lock().kind(), InjectorKind::SchedControl);
        assert_eq!(h.gvf.set_injector("BOGUS"), Err(Error::UnknownInjector));

        h.gvf.set_level(1).unwrap();
        assert_eq!(h.gvf.set_injector("HW_QUEUE_CONTROL"), Err(Error::Busy));
        assert_eq!(h.gvf.injector_name(), "SCHED_CONTROL");
    }

    #[test]
    fn test_injector_switch_during_injection() {
        let h = harness(&[100], 400);
        h.gvf.set_level(1).unwrap();
        h.clock.advance_ms(100);

        let mut switched = None;
        let outcome = h.gvf.run_iteration(&mut |_| {
            // Governor leaves the band mid-injection
            h.gvf.set_level(0).unwrap();
            switched = Some(h.gvf.set_injector("SCHED_CONTROL"));
            // The level path still goes through
            h.gvf.set_level(1).unwrap();
            h.gvf.set_level(0).unwrap();
        });
        assert_eq!(outcome, Iteration::Injected { idle_ms: 12 });
        assert_eq!(switched, Some(Err(Error::Busy)));
        assert_eq!(h.gvf.injector_name(), "HW_QUEUE_CONTROL");

        h.gvf.set_injector("SCHED_CONTROL").unwrap();
        assert_eq!(h.gvf.injector.lock().kind(), InjectorKind::SchedControl);
    }

    #[test]
    fn test_governor_switch_reinits() {
        let h = harness(&[100], 400);
        h.gvf.set_level(1).unwrap();
        h.gvf.set_governor("RATIO").unwrap();
        assert_eq!(h.gvf.governor_name(), "RATIO");
        let governor = h.gvf.state.lock().governor;
        match governor {
            GvfGovernor::Ratio(r) => assert_eq!(r.target_ratio(), 25),
        }
        assert_eq!(h.gvf.set_governor("NONE"), Err(Error::UnknownGovernor));
    }

    #[test]
    fn test_iteration_disabled() {
        let h = harness(&[100], 200);
        let mut slept = 0;
        assert_eq!(h.gvf.run_iteration(&mut |ns| slept += ns), Iteration::Disabled);
        assert_eq!(slept, 0);
    }

    #[test]
    fn test_iteration_injects() {
        let h = harness(&[100], 400);
        h.gvf.set_level(1).unwrap();
        assert_eq!(h.gvf.due_in_ns(), Some(16 * NSEC_PER_MSEC));

        // 100ms busy; target idle 25% wants 33ms, clamp to 80% of 16ms
        h.clock.advance_ms(100);
        let mut slept = 0;
        let outcome = h.gvf.run_iteration(&mut |ns| slept += ns);
        assert_eq!(outcome, Iteration::Injected { idle_ms: 12 });
        assert_eq!(slept, 12 * NSEC_PER_MSEC);
        assert_eq!(h.backend.take(), ["suspend_timeout0", "unmap0", "power_off", "map0", "resume_timeout0:5000", "power_on"]);
        assert_eq!(h.gvf.due_in_ns(), Some(16 * NSEC_PER_MSEC));
    }

    #[test]
    fn test_iteration_skips_when_idle() {
        let h = harness(&[100], 400);
        h.gvf.set_level(1).unwrap();
        h.clock.advance_ms(100);
        h.idle.add_ms(90);
        assert_eq!(h.gvf.run_iteration(&mut |_| {}), Iteration::Skipped);
        assert!(h.backend.take().is_empty());
    }

    #[test]
    fn test_refresh_window() {
        let h = harness(&[100], 400);
        h.gvf.set_monitor_window_ms(50);
        h.gvf.set_level(1).unwrap();
        h.clock.advance_ms(40);
        assert_eq!(h.gvf.refresh_window(), None);
        h.clock.advance_ms(60);
        h.idle.add_ms(25);
        assert_eq!(
            h.gvf.refresh_window(),
            Some(WindowReport {
                idle_ratio: 25,
                elapsed_ms: 100,
            })
        );
        assert_eq!(h.gvf.state.lock().window.base_time_ns(), h.clock.now_ns());
    }
}
