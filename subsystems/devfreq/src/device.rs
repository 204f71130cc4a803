//! # Device Context
//!
//! One SGPU devfreq device: the governor, the optional GVF controller and
//! the platform collaborators, wired together at probe.
//!
//! ```text
//!   update()
//!     │
//!     ├─► qos.bounds() ─────────┐
//!     ├─► utilization ──────────┴─► Governor::tick ──► TickDecision
//!     │                               (snapshot under the governor lock)
//!     │                                                      │
//!     └─► target(freq) ◄─────────────────────────────────────┘
//!           │
//!           ├─ suspended ─────────► keep previous
//!           ├─ GVF band ──────────► program gvf.run_freq
//!           └─ otherwise ─────────► program round(freq)
//!                 │
//!                 └─► complete_transition(previous, virtual)
//! ```

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::RangeInclusive;
use core::sync::atomic::{AtomicU64, Ordering};

use sgpu_core::table::Rounding;
use sgpu_core::{
    Clock, Error, Frequency, FrequencyTable, FrequencyTransition, IdleTimeSource, Properties, QosSource, Result,
    UtilizationSource,
};
use sgpu_governor::{boost_level, Governor, GovernorConfig, GovernorPolicy, TickDecision, Tunables};
use sgpu_gvf::{GpuQueueBackend, Gvf, GvfDeps, GvfGovernor, GvfParams, InjectorKind};

#[cfg(feature = "std")]
use sgpu_gvf::GvfWorker;

use crate::config::DeviceConfig;

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Platform services used by the device
#[derive(Clone)]
pub struct DeviceDeps {
    /// Busy counters of the last window
    pub utilization: Arc<dyn UtilizationSource>,
    /// Externally imposed bounds
    pub qos: Arc<dyn QosSource>,
    /// Hardware frequency programming
    pub transition: Arc<dyn FrequencyTransition>,
    /// Cumulative GPU idle time
    pub idle_source: Arc<dyn IdleTimeSource>,
    /// Queue and power control for idle injection
    pub backend: Arc<dyn GpuQueueBackend>,
    /// Monotonic time
    pub clock: Arc<dyn Clock>,
    /// Highest frequency the platform allows, if bounded
    pub platform_max_freq: Option<Frequency>,
}

impl core::fmt::Debug for DeviceDeps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceDeps")
            .field("platform_max_freq", &self.platform_max_freq)
            .finish_non_exhaustive()
    }
}

/// Snapshot of the device for status reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Virtual frequency of the current level
    pub cur_freq: Frequency,
    /// Frequency last programmed into the hardware
    pub hw_freq: Frequency,
    /// Current level
    pub level: usize,
    /// GVF level, `0` when injection is off or absent
    pub gvf_level: usize,
    /// Idle injection running
    pub gvf_enabled: bool,
    /// Device suspended
    pub in_suspend: bool,
    /// Active policy
    pub governor: String,
}

// =============================================================================
// DEVICE CONTEXT
// =============================================================================

/// SGPU devfreq device
pub struct DeviceContext {
    config: DeviceConfig,
    governor: Governor,
    deps: DeviceDeps,
    hw_freq: AtomicU64,
    #[cfg(feature = "std")]
    worker: spin::Mutex<Option<GvfWorker>>,
}

impl DeviceContext {
    /// Build the device from its properties
    ///
    /// A missing or malformed GVF description leaves the device without
    /// idle injection; every other configuration error fails the probe.
    pub fn probe(props: &Properties, deps: DeviceDeps) -> Result<Self> {
        let config = DeviceConfig::from_properties(props, deps.platform_max_freq)?;

        let gvf_deps = GvfDeps {
            idle_source: deps.idle_source.clone(),
            backend: deps.backend.clone(),
            clock: deps.clock.clone(),
        };
        let gvf = Gvf::probe(props, gvf_deps).map(Arc::new);
        let gvf_table = gvf.as_deref().map_or(&[][..], Gvf::table);

        let table = FrequencyTable::from_ascending(&config.freq_table, gvf_table, config.max_freq)?;
        let tunables = Tunables::from_properties(props, &table, config.min_freq)?;
        let initial_level = boost_level(&table, config.initial_freq, config.min_freq);
        let initial_freq = table[initial_level];

        let governor = Governor::new(
            GovernorConfig {
                table,
                tunables,
                initial_level,
                policy: config.governor.clone(),
            },
            gvf,
            deps.clock.clone(),
        )
        .map_err(|e| {
            log::error!("devfreq: governor {} unavailable: {}", config.governor, e);
            e
        })?;

        log::info!(
            "devfreq: probed {} levels, max {} kHz, polling {} ms",
            governor.table().max_state(),
            config.max_freq,
            config.polling_ms
        );

        Ok(Self {
            config,
            governor,
            deps,
            hw_freq: AtomicU64::new(initial_freq),
            #[cfg(feature = "std")]
            worker: spin::Mutex::new(None),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Static device description
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Update period
    pub fn polling_ms(&self) -> u32 {
        self.config.polling_ms
    }

    /// The governor, for tunables not wrapped here
    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    /// Operating points, fastest first
    pub fn table(&self) -> &FrequencyTable {
        self.governor.table()
    }

    /// Virtual frequency of the current level
    pub fn cur_freq(&self) -> Frequency {
        self.governor.previous_freq()
    }

    /// Frequency last programmed into the hardware
    pub fn hw_freq(&self) -> Frequency {
        self.hw_freq.load(Ordering::Acquire)
    }

    /// Device status
    pub fn status(&self) -> DeviceStatus {
        let gvf = self.governor.gvf();
        DeviceStatus {
            cur_freq: self.cur_freq(),
            hw_freq: self.hw_freq(),
            level: self.governor.current_level(),
            gvf_level: gvf.map_or(0, |g| g.level()),
            gvf_enabled: gvf.is_some_and(|g| g.is_enabled()),
            in_suspend: self.governor.in_suspend(),
            governor: self.governor.policy_name(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start governing; spawns the GVF worker when idle injection exists
    pub fn start(&self) -> Result<()> {
        #[cfg(feature = "std")]
        if let Some(gvf) = self.governor.gvf() {
            let mut worker = self.worker.lock();
            if worker.is_none() {
                *worker = Some(GvfWorker::spawn(gvf.clone())?);
            }
        }
        self.governor.start();
        Ok(())
    }

    /// Stop governing and the GVF worker
    pub fn stop(&self) {
        self.governor.stop();
        if let Some(gvf) = self.governor.gvf() {
            if let Err(e) = gvf.set_level(0) {
                log::warn!("devfreq: gvf stop failed: {}", e);
            }
        }
        #[cfg(feature = "std")]
        drop(self.worker.lock().take());
    }

    /// GVF worker running
    #[cfg(feature = "std")]
    pub fn has_worker(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Park at the suspend frequency
    ///
    /// Idle injection stops and the worker waits for any injection in
    /// flight before this returns.
    pub fn suspend(&self) -> Frequency {
        let previous = self.governor.previous_freq();
        let freq = self.governor.suspend();
        if let Some(gvf) = self.governor.gvf() {
            if let Err(e) = gvf.set_level(0) {
                log::warn!("devfreq: gvf suspend failed: {}", e);
            }
        }
        #[cfg(feature = "std")]
        if let Some(worker) = self.worker.lock().as_ref() {
            worker.park();
        }
        self.program(freq);
        self.governor.complete_transition(previous, freq);
        log::info!("devfreq: suspend at {} kHz", freq);
        freq
    }

    /// Leave suspend
    pub fn resume(&self) {
        self.governor.resume();
        #[cfg(feature = "std")]
        if let Some(worker) = self.worker.lock().as_ref() {
            worker.unpark();
        }
        log::info!("devfreq: resume");
    }

    // =========================================================================
    // Frequency Selection
    // =========================================================================

    /// Run one sampling period: decide, then program
    pub fn update(&self) -> TickDecision {
        let decision = self.governor.tick(self.deps.utilization.as_ref(), self.deps.qos.bounds());
        if !decision.suspended {
            self.target(decision.freq, decision.min_freq, decision.max_freq);
        }
        decision
    }

    /// Move to `freq` within `[min_freq, max_freq]`; returns the hardware
    /// frequency
    pub fn target(&self, freq: Frequency, min_freq: Frequency, max_freq: Frequency) -> Frequency {
        if self.governor.in_suspend() {
            return self.hw_freq();
        }

        let table = self.governor.table();
        let gvf_start = self.governor.gvf_start_level();
        let previous = self.governor.previous_freq();

        let (virtual_freq, hw_freq) = match self.governor.gvf() {
            Some(gvf) if gvf_start < table.max_state() && table[gvf_start] >= freq => {
                (table.round(freq, Rounding::Ceil), gvf.run_freq())
            },
            gvf => {
                let rounding = if min_freq >= max_freq {
                    Rounding::Floor
                } else {
                    Rounding::Ceil
                };
                let virtual_freq = table.round(freq, rounding);
                let hw_freq = match gvf {
                    Some(g) if g.is_enabled() && g.level() == 0 => g.run_freq(),
                    _ => virtual_freq,
                };
                (virtual_freq, hw_freq)
            },
        };

        self.program(hw_freq);
        self.governor.complete_transition(previous, virtual_freq);
        log::debug!("devfreq: {} -> {} kHz (hw {} kHz)", previous, virtual_freq, hw_freq);
        hw_freq
    }

    fn program(&self, hw_freq: Frequency) {
        self.deps.transition.request(hw_freq);
        self.hw_freq.store(hw_freq, Ordering::Release);
    }

    // =========================================================================
    // Governor Knobs
    // =========================================================================

    /// Active policy name
    pub fn governor_name(&self) -> String {
        self.governor.policy_name()
    }

    /// Selectable policy names
    pub fn available_governors(&self) -> String {
        self.governor.available_policies()
    }

    /// Switch policy by name
    pub fn set_governor(&self, name: &str) -> Result<()> {
        self.governor.set_policy(name)
    }

    /// Register the external profiler policy
    pub fn register_profiler(&self, profiler: alloc::boxed::Box<dyn GovernorPolicy>) -> Result<()> {
        self.governor.register_profiler(profiler)
    }

    /// Lower static bound
    pub fn set_min_freq(&self, freq: Frequency) -> Result<()> {
        let (_, max) = self.governor.scaling_bounds();
        self.governor.set_scaling_bounds(freq, max)
    }

    /// Upper static bound
    pub fn set_max_freq(&self, freq: Frequency) -> Result<()> {
        let (min, _) = self.governor.scaling_bounds();
        self.governor.set_scaling_bounds(min, freq)
    }

    // =========================================================================
    // GVF Knobs
    // =========================================================================

    /// GVF controller, if the device has one
    pub fn gvf(&self) -> Result<&Arc<Gvf>> {
        self.governor.gvf().ok_or(Error::NotInitialized)
    }

    /// Allowed run frequencies: the lowest real operating point up to the
    /// fastest one
    pub fn gvf_run_freq_bounds(&self) -> Result<RangeInclusive<Frequency>> {
        let gvf = self.gvf()?;
        let table = self.governor.table();
        let lowest = table.max_state().saturating_sub(gvf.max_level()).min(table.last_level());
        Ok(table[lowest]..=table[0])
    }

    /// Change the GVF run frequency
    pub fn set_gvf_run_freq(&self, freq: Frequency) -> Result<()> {
        let bounds = self.gvf_run_freq_bounds()?;
        self.gvf()?.set_run_freq(freq, bounds)
    }

    /// Change the GVF monitor window
    pub fn set_gvf_monitor_window_ms(&self, window_ms: u32) -> Result<()> {
        self.gvf()?.set_monitor_window_ms(window_ms);
        Ok(())
    }

    /// Replace the manual GVF parameters from `"sampling target max min"`
    pub fn set_gvf_custom_params(&self, text: &str) -> Result<()> {
        let params = GvfParams::parse(text)?;
        self.gvf()?.set_custom_params(params)
    }

    /// Start or stop manual idle injection
    ///
    /// While running, the hardware stays at the GVF run frequency.
    pub fn set_gvf_manual(&self, enable: bool) -> Result<()> {
        let gvf = self.gvf()?;
        gvf.set_enable_manual(enable)?;
        let hw_freq = if enable { gvf.run_freq() } else { self.cur_freq() };
        if !self.governor.in_suspend() {
            self.program(hw_freq);
        }
        log::info!("devfreq: manual gvf {}", enable);
        Ok(())
    }

    /// Active GVF governor
    pub fn gvf_governor(&self) -> Result<&'static str> {
        Ok(self.gvf()?.governor_name())
    }

    /// Selectable GVF governors
    pub fn gvf_available_governors(&self) -> String {
        GvfGovernor::NAMES.join(" ")
    }

    /// Switch the GVF governor
    pub fn set_gvf_governor(&self, name: &str) -> Result<()> {
        self.gvf()?.set_governor(name)
    }

    /// Active injector
    pub fn gvf_injector(&self) -> Result<&'static str> {
        Ok(self.gvf()?.injector_name())
    }

    /// Selectable injectors
    pub fn gvf_available_injectors(&self) -> String {
        let names: Vec<&str> = InjectorKind::ALL.iter().map(InjectorKind::name).collect();
        names.join(" ")
    }

    /// Switch the injector; rejected while injection runs
    pub fn set_gvf_injector(&self, name: &str) -> Result<()> {
        self.gvf()?.set_injector(name)
    }
}

impl core::fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("config", &self.config)
            .field("governor", &self.governor)
            .field("hw_freq", &self.hw_freq())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgpu_core::{ManualClock, QosBounds, UtilizationSnapshot};
    use spin::Mutex;

    // =========================================================================
    // Fakes
    // =========================================================================

    #[derive(Default)]
    struct Platform {
        snapshot: Mutex<UtilizationSnapshot>,
        qos: Mutex<QosBounds>,
        requests: Mutex<Vec<Frequency>>,
        idle_ns: AtomicU64,
    }

    impl Platform {
        fn load(&self, busy: u64) {
            *self.snapshot.lock() = UtilizationSnapshot::new(busy, 100);
        }

        fn last_request(&self) -> Option<Frequency> {
            self.requests.lock().last().copied()
        }
    }

    impl UtilizationSource for Platform {
        fn snapshot(&self) -> UtilizationSnapshot {
            *self.snapshot.lock()
        }
    }

    impl QosSource for Platform {
        fn bounds(&self) -> QosBounds {
            *self.qos.lock()
        }
    }

    impl FrequencyTransition for Platform {
        fn request(&self, freq: Frequency) {
            self.requests.lock().push(freq);
        }
    }

    impl IdleTimeSource for Platform {
        fn idle_time_ns(&self) -> u64 {
            self.idle_ns.load(Ordering::Acquire)
        }
    }

    impl GpuQueueBackend for Platform {
        fn is_power_gated(&self) -> bool {
            false
        }
        fn force_power_off(&self) {}
        fn force_power_on(&self) {}
        fn ring_count(&self) -> usize {
            0
        }
        fn ring_active(&self, _ring: usize) -> bool {
            false
        }
        fn stop_scheduler(&self, _ring: usize) {}
        fn start_scheduler(&self, _ring: usize) {}
        fn wait_ring_empty(&self, _ring: usize) -> Result<()> {
            Ok(())
        }
        fn force_completion(&self, _ring: usize) {}
        fn gfx_ring_count(&self) -> usize {
            0
        }
        fn suspend_timeout(&self, _ring: usize, _parked_deadline_ns: u64) -> u64 {
            0
        }
        fn timeout_deadline_ns(&self, _ring: usize) -> u64 {
            0
        }
        fn resume_timeout(&self, _ring: usize, _remaining_ns: u64) {}
        fn unmap_queue(&self, _ring: usize) {}
        fn map_queue(&self, _ring: usize) {}
        fn kick_pending(&self, _ring: usize) -> bool {
            false
        }
    }

    struct Rig {
        clock: Arc<ManualClock>,
        platform: Arc<Platform>,
        device: DeviceContext,
    }

    /// `[1000, 800, 600, 400]` with thresholds `[0,40,40,40]`,
    /// `[100,75,75,75]` and downstay `[0,32,32,32]`
    fn props(governor: &str, initial_freq: &str) -> Properties {
        Properties::new()
            .with("freq_table", "400 600 800 1000")
            .with("min_threshold", "40 1000:0")
            .with("max_threshold", "75 1000:100")
            .with("downstay_time", "32 1000:0")
            .with("highspeed_freq", "0")
            .with("initial_freq", initial_freq)
            .with("governor", governor)
    }

    fn gvf_props(initial_freq: &str) -> Properties {
        props("conservative", initial_freq)
            .with("gvf_table", "100 200")
            .with("gvf_run_freq", "400")
    }

    fn rig(props: &Properties) -> Rig {
        let clock = Arc::new(ManualClock::new(1));
        let platform = Arc::new(Platform {
            qos: Mutex::new(QosBounds::UNBOUNDED),
            ..Platform::default()
        });
        let deps = DeviceDeps {
            utilization: platform.clone(),
            qos: platform.clone(),
            transition: platform.clone(),
            idle_source: platform.clone(),
            backend: platform.clone(),
            clock: clock.clone(),
            platform_max_freq: None,
        };
        let device = DeviceContext::probe(props, deps).unwrap();
        Rig {
            clock,
            platform,
            device,
        }
    }

    // =========================================================================
    // Probe
    // =========================================================================

    #[test]
    fn test_probe_without_gvf() {
        let rig = rig(&props("conservative", "800"));
        let device = &rig.device;
        assert_eq!(device.table().as_slice(), &[1000, 800, 600, 400]);
        assert_eq!(device.governor().gvf_start_level(), 4);
        assert_eq!(device.cur_freq(), 800);
        assert_eq!(device.hw_freq(), 800);
        assert_eq!(device.gvf().unwrap_err(), Error::NotInitialized);
    }

    #[test]
    fn test_probe_with_gvf() {
        let rig = rig(&gvf_props("400"));
        let device = &rig.device;
        assert_eq!(device.table().as_slice(), &[1000, 800, 600, 400, 200, 100]);
        assert_eq!(device.governor().gvf_start_level(), 4);
        assert_eq!(device.governor().current_level(), 3);
        assert_eq!(device.gvf_run_freq_bounds().unwrap(), 400..=1000);
    }

    #[test]
    fn test_malformed_gvf_degrades() {
        let props = props("conservative", "800")
            .with("gvf_table", "300 100")
            .with("gvf_run_freq", "400");
        let rig = rig(&props);
        assert!(rig.device.gvf().is_err());
        assert_eq!(rig.device.table().max_state(), 4);
    }

    #[test]
    fn test_probe_rejects_unknown_governor() {
        let clock = Arc::new(ManualClock::new(0));
        let platform = Arc::new(Platform::default());
        let deps = DeviceDeps {
            utilization: platform.clone(),
            qos: platform.clone(),
            transition: platform.clone(),
            idle_source: platform.clone(),
            backend: platform,
            clock,
            platform_max_freq: Some(800),
        };
        let err = DeviceContext::probe(&props("userspace", "800"), deps).unwrap_err();
        assert_eq!(err, Error::UnknownGovernor);
    }

    #[test]
    fn test_platform_max_trims_table() {
        let clock = Arc::new(ManualClock::new(0));
        let platform = Arc::new(Platform::default());
        let deps = DeviceDeps {
            utilization: platform.clone(),
            qos: platform.clone(),
            transition: platform.clone(),
            idle_source: platform.clone(),
            backend: platform,
            clock,
            platform_max_freq: Some(800),
        };
        let device = DeviceContext::probe(&props("conservative", "800"), deps).unwrap();
        assert_eq!(device.table().as_slice(), &[800, 600, 400]);
    }

    // =========================================================================
    // Update
    // =========================================================================

    #[test]
    fn test_conservative_update() {
        let rig = rig(&props("conservative", "800"));
        rig.platform.load(80);
        let decision = rig.device.update();
        assert_eq!(decision.level, 0);
        assert_eq!(rig.platform.last_request(), Some(1000));
        assert_eq!(rig.device.cur_freq(), 1000);
    }

    #[test]
    fn test_interactive_update() {
        let rig = rig(&props("interactive", "600"));
        rig.platform.load(30);
        rig.device.update();
        assert_eq!(rig.device.cur_freq(), 400);
        assert_eq!(rig.device.governor().current_level(), 3);
    }

    #[test]
    fn test_qos_cap() {
        let rig = rig(&props("conservative", "800"));
        *rig.platform.qos.lock() = QosBounds::new(0, 600);
        rig.platform.load(100);
        rig.device.update();
        assert_eq!(rig.platform.last_request(), Some(600));
    }

    #[test]
    fn test_target_rounds() {
        let rig = rig(&props("conservative", "800"));
        assert_eq!(rig.device.target(700, 400, 1000), 800);
        assert_eq!(rig.device.target(700, 700, 700), 600);
        assert_eq!(rig.device.governor().current_level(), 2);
    }

    #[test]
    fn test_scaling_bounds() {
        let rig = rig(&props("conservative", "800"));
        rig.device.set_max_freq(600).unwrap();
        assert!(rig.device.set_min_freq(800).is_err());
        rig.platform.load(100);
        assert_eq!(rig.device.update().freq, 600);
    }

    // =========================================================================
    // GVF
    // =========================================================================

    #[test]
    fn test_enters_gvf_band() {
        let rig = rig(&gvf_props("400"));
        let gvf = rig.device.gvf().unwrap().clone();
        rig.platform.load(0);
        rig.clock.advance_ms(100);

        let decision = rig.device.update();
        assert_eq!(decision.gvf_level, 1);
        assert_eq!(rig.device.cur_freq(), 200);
        assert_eq!(rig.device.hw_freq(), 400);
        assert!(gvf.is_enabled());
        assert_eq!(rig.device.status().gvf_level, 1);

        // Load returns: leave the band
        rig.platform.load(100);
        rig.device.update();
        assert_eq!(rig.device.cur_freq(), 400);
        assert!(!gvf.is_enabled());
    }

    #[test]
    fn test_manual_gvf() {
        let rig = rig(&gvf_props("800"));
        rig.device.set_gvf_manual(true).unwrap();
        assert_eq!(rig.platform.last_request(), Some(400));
        assert!(rig.device.gvf().unwrap().is_enabled());

        // Pinned while running
        rig.platform.load(100);
        rig.device.update();
        assert_eq!(rig.platform.last_request(), Some(400));

        rig.device.set_gvf_manual(false).unwrap();
        assert_eq!(rig.platform.last_request(), Some(rig.device.cur_freq()));
    }

    #[test]
    fn test_manual_gvf_rejected_in_band() {
        let rig = rig(&gvf_props("400"));
        rig.platform.load(0);
        rig.clock.advance_ms(100);
        rig.device.update();
        assert_eq!(rig.device.set_gvf_manual(true), Err(Error::Busy));
    }

    #[test]
    fn test_gvf_knobs() {
        let rig = rig(&gvf_props("800"));
        let device = &rig.device;
        assert!(device.set_gvf_run_freq(300).is_err());
        device.set_gvf_run_freq(600).unwrap();
        assert_eq!(device.gvf().unwrap().run_freq(), 600);

        device.set_gvf_custom_params("16 50 80 10").unwrap();
        assert_eq!(device.gvf().unwrap().params(0), Some(GvfParams::with_target(50)));
        assert!(device.set_gvf_custom_params("16 150 80 10").is_err());

        assert_eq!(device.gvf_available_governors(), "RATIO");
        assert_eq!(device.gvf_governor().unwrap(), "RATIO");
        assert_eq!(device.gvf_available_injectors(), "SCHED_CONTROL HW_QUEUE_CONTROL");
        device.set_gvf_injector("SCHED_CONTROL").unwrap();
        assert_eq!(device.gvf_injector().unwrap(), "SCHED_CONTROL");

        device.set_gvf_manual(true).unwrap();
        assert_eq!(device.set_gvf_injector("HW_QUEUE_CONTROL"), Err(Error::Busy));
        device.set_gvf_manual(false).unwrap();
    }

    // =========================================================================
    // Suspend
    // =========================================================================

    #[test]
    fn test_suspend_resume() {
        let rig = rig(&gvf_props("400"));
        rig.platform.load(0);
        rig.clock.advance_ms(100);
        rig.device.update();
        assert!(rig.device.gvf().unwrap().is_enabled());

        assert_eq!(rig.device.suspend(), 400);
        assert!(!rig.device.gvf().unwrap().is_enabled());
        assert!(rig.device.status().in_suspend);

        let requests = rig.platform.requests.lock().len();
        rig.device.update();
        assert_eq!(rig.platform.requests.lock().len(), requests);
        assert_eq!(rig.device.target(1000, 0, 1000), 400);

        rig.device.resume();
        rig.platform.load(100);
        rig.device.update();
        assert_eq!(rig.device.cur_freq(), 600);
    }

    #[test]
    fn test_governor_switch() {
        let rig = rig(&props("conservative", "800"));
        assert_eq!(rig.device.available_governors(), "static conservative interactive");
        rig.device.set_governor("interactive").unwrap();
        assert_eq!(rig.device.governor_name(), "interactive");
        assert_eq!(rig.device.set_governor("performance"), Err(Error::UnknownGovernor));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_start_stop_worker() {
        let rig = rig(&gvf_props("800"));
        rig.device.start().unwrap();
        assert!(rig.device.has_worker());
        assert!(rig.device.governor().is_started());
        rig.device.suspend();
        rig.device.resume();
        rig.device.stop();
        assert!(!rig.device.has_worker());

        let plain = self::rig(&props("conservative", "800"));
        plain.device.start().unwrap();
        assert!(!plain.device.has_worker());
    }
}
