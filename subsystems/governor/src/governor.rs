//! # Governor Core
//!
//! Owns the level, the clamp bounds, the hysteresis timers and the
//! registered policies. Once per sampling tick it turns a utilization
//! snapshot into a target frequency and drives the GVF level.
//!
//! ## Tick
//!
//! ```text
//!   QoS ∩ scaling bounds ──► suspended? ──yes──► clamp(resume_freq)
//!                               │ no
//!                               ▼
//!                        window ready? ──no──┐
//!                               │ yes        │
//!                               ▼            │
//!                        policy.get_target   │
//!                               │ ◄──────────┘
//!                               ▼
//!                      CL-boost override
//!                               ▼
//!                   clamp to [min_freq, max_freq]
//!                               ▼
//!             GVF band? ──yes──► pin run_freq, gvf.set_level(n)
//!                               │ no
//!                               ▼
//!                       gvf.set_level(0)
//! ```

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use sgpu_core::table::Rounding;
use sgpu_core::time::ms_to_ns;
use sgpu_core::{
    Clock, Error, Frequency, FrequencyTable, QosBounds, Result, UtilizationSnapshot, UtilizationSource,
};
use sgpu_gvf::Gvf;
use spin::{Mutex, MutexGuard};

use crate::math;
use crate::policy::{self, GovernorPolicy, HysteresisTimers, PolicyContext};
use crate::tunables::{LevelArray, Tunables};

// =============================================================================
// TYPES
// =============================================================================

/// Result of one sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickDecision {
    /// Frequency to request
    pub freq: Frequency,
    /// Level of `freq`
    pub level: usize,
    /// GVF level driven by this decision, `0` when idle injection is off
    pub gvf_level: usize,
    /// Lower bound handed to the platform
    pub min_freq: Frequency,
    /// Upper bound handed to the platform
    pub max_freq: Frequency,
    /// Produced while suspended; no policy ran
    pub suspended: bool,
}

/// Static governor setup
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Operating points including GVF sub-levels
    pub table: FrequencyTable,
    /// Initial tunables
    pub tunables: Tunables,
    /// Level selected before the first tick
    pub initial_level: usize,
    /// Name of the policy to start with
    pub policy: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct LastStatus {
    snapshot: UtilizationSnapshot,
    compute_weight: u32,
}

/// Mutable governor state, guarded by the governor lock
pub struct GovernorState {
    tunables: Tunables,
    timers: HysteresisTimers,
    policies: Vec<Box<dyn GovernorPolicy>>,
    active: usize,
    profiler: Option<usize>,
    snapshot: UtilizationSnapshot,
    utilization: u64,
    current_level: usize,
    previous_freq: Frequency,
    resume_freq: Frequency,
    min_freq: Frequency,
    max_freq: Frequency,
    scaling_min_freq: Frequency,
    scaling_max_freq: Frequency,
    in_suspend: bool,
    started: bool,
    cl_boost_disable: bool,
    mm_min_clock: Frequency,
}

impl GovernorState {
    /// Level of the last completed transition
    pub fn current_level(&self) -> usize {
        self.current_level
    }

    /// Frequency of the last completed transition
    pub fn previous_freq(&self) -> Frequency {
        self.previous_freq
    }

    /// Bounds computed by the last tick
    pub fn bounds(&self) -> (Frequency, Frequency) {
        (self.min_freq, self.max_freq)
    }

    /// Tunables in effect
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// Hysteresis deadlines
    pub fn timers(&self) -> HysteresisTimers {
        self.timers
    }

    /// Name of the active policy
    pub fn policy_name(&self) -> &str {
        self.policies[self.active].name()
    }

    /// Suspended since the last `suspend`
    pub fn in_suspend(&self) -> bool {
        self.in_suspend
    }

    /// Run `f` on the active policy with a context for this instant
    fn with_policy<R>(
        &mut self,
        table: &FrequencyTable,
        now_ns: u64,
        f: impl FnOnce(&mut dyn GovernorPolicy, &mut PolicyContext<'_>) -> R,
    ) -> R {
        let Self {
            tunables,
            timers,
            policies,
            active,
            snapshot,
            utilization,
            current_level,
            previous_freq,
            min_freq,
            max_freq,
            ..
        } = self;
        let mut ctx = PolicyContext {
            table,
            tunables,
            timers,
            snapshot: *snapshot,
            utilization: *utilization,
            previous_freq: *previous_freq,
            current_level: *current_level,
            min_freq: *min_freq,
            max_freq: *max_freq,
            now_ns,
        };
        f(policies[*active].as_mut(), &mut ctx)
    }

    fn clear(&mut self, table: &FrequencyTable, now_ns: u64) {
        let level = self.current_level;
        self.with_policy(table, now_ns, |policy, ctx| policy.clear(ctx, level));
    }
}

impl core::fmt::Debug for GovernorState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GovernorState")
            .field("policy", &self.policy_name())
            .field("current_level", &self.current_level)
            .field("previous_freq", &self.previous_freq)
            .field("min_freq", &self.min_freq)
            .field("max_freq", &self.max_freq)
            .field("in_suspend", &self.in_suspend)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// GOVERNOR
// =============================================================================

/// SGPU DVFS governor for one device
pub struct Governor {
    table: FrequencyTable,
    gvf_start_level: usize,
    gvf: Option<Arc<Gvf>>,
    clock: Arc<dyn Clock>,
    state: Mutex<GovernorState>,
    last_status: Mutex<LastStatus>,
    cl_boost_status: AtomicBool,
}

impl Governor {
    /// Build the governor
    ///
    /// `gvf` sub-levels occupy the slowest levels of the table.
    pub fn new(config: GovernorConfig, gvf: Option<Arc<Gvf>>, clock: Arc<dyn Clock>) -> Result<Self> {
        let GovernorConfig {
            table,
            tunables,
            initial_level,
            policy,
        } = config;

        let policies = policy::builtin();
        let active = policies
            .iter()
            .position(|p| p.name() == policy.trim())
            .ok_or(Error::UnknownGovernor)?;
        let initial_level = initial_level.min(table.last_level());
        let gvf_start_level = gvf
            .as_ref()
            .map_or(table.max_state(), |g| table.max_state().saturating_sub(g.sublevel_count()));

        let state = GovernorState {
            tunables,
            timers: HysteresisTimers::default(),
            policies,
            active,
            profiler: None,
            snapshot: UtilizationSnapshot::default(),
            utilization: 0,
            current_level: initial_level,
            previous_freq: table[initial_level],
            resume_freq: 0,
            min_freq: table.min_freq(),
            max_freq: table.max_freq(),
            scaling_min_freq: table.min_freq(),
            scaling_max_freq: table.max_freq(),
            in_suspend: false,
            started: false,
            cl_boost_disable: false,
            mm_min_clock: 0,
        };

        log::info!(
            "governor: {} levels, gvf from level {}, initial {} kHz, policy {}",
            table.max_state(),
            gvf_start_level,
            table[initial_level],
            state.policy_name()
        );

        Ok(Self {
            table,
            gvf_start_level,
            gvf,
            clock,
            state: Mutex::new(state),
            last_status: Mutex::new(LastStatus::default()),
            cl_boost_status: AtomicBool::new(false),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Operating points, fastest first
    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }

    /// First level emulated by GVF; `max_state` without GVF
    pub fn gvf_start_level(&self) -> usize {
        self.gvf_start_level
    }

    /// GVF controller driven by this governor
    pub fn gvf(&self) -> Option<&Arc<Gvf>> {
        self.gvf.as_ref()
    }

    /// Take the governor lock
    pub fn lock(&self) -> MutexGuard<'_, GovernorState> {
        self.state.lock()
    }

    /// Level of the last completed transition
    pub fn current_level(&self) -> usize {
        self.state.lock().current_level
    }

    /// Frequency of the last completed transition
    pub fn previous_freq(&self) -> Frequency {
        self.state.lock().previous_freq
    }

    /// Compute work dominated the last evaluated window
    pub fn cl_boost_status(&self) -> bool {
        self.cl_boost_status.load(Ordering::Acquire)
    }

    /// Suspended since the last `suspend`
    pub fn in_suspend(&self) -> bool {
        self.state.lock().in_suspend
    }

    /// Started and not stopped
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Evaluate one sampling window
    pub fn tick(&self, source: &dyn UtilizationSource, qos: QosBounds) -> TickDecision {
        let now = self.clock.now_ns();
        let mut state = self.state.lock();

        let mut max_freq = state.scaling_max_freq.min(qos.max_freq);
        if self.gvf_start_level < self.table.max_state() && self.table[self.gvf_start_level] < max_freq {
            max_freq = self.table.round(max_freq, Rounding::Floor);
        }
        let min_freq = state.scaling_min_freq.max(qos.min_freq).min(max_freq);
        state.min_freq = min_freq;
        state.max_freq = max_freq;

        if state.in_suspend {
            let freq = state.resume_freq.min(max_freq).max(min_freq);
            state.resume_freq = freq;
            return TickDecision {
                freq,
                level: state.current_level,
                gvf_level: 0,
                min_freq,
                max_freq,
                suspended: true,
            };
        }

        // Read under the lock so the window matches the state it drives
        let snapshot = source.snapshot();
        let compute_weight = state.tunables.compute_weight;
        *self.last_status.lock() = LastStatus {
            snapshot,
            compute_weight,
        };

        let mut level = state.current_level;
        if snapshot.is_ready() {
            let util = math::utilization(&snapshot, compute_weight);
            self.cl_boost_status.store(util.is_compute_bound(), Ordering::Release);
            state.snapshot = snapshot;
            state.utilization = util.util;
            level = state.with_policy(&self.table, now, |policy, ctx| policy.get_target(ctx, level));
            log::trace!("governor: util {} cu {} -> level {}", util.util, util.cu_util, level);
        }

        if !state.cl_boost_disable && state.mm_min_clock == 0 && self.cl_boost_status() {
            level = state.tunables.cl_boost_level.min(self.table.last_level());
            state.timers.expire_ns = now.saturating_add(ms_to_ns(u64::from(state.tunables.downstay_ms(level))));
        }

        let level = self.table.clamp_level(level, min_freq, max_freq);
        state.current_level = level;

        let (min_out, max_out, gvf_level) = match &self.gvf {
            Some(gvf) if level >= self.gvf_start_level => {
                let run_freq = gvf.run_freq();
                (run_freq, run_freq, level - self.gvf_start_level + 1)
            },
            _ => (min_freq, max_freq, 0),
        };
        drop(state);

        if let Some(gvf) = &self.gvf {
            if let Err(e) = gvf.set_level(gvf_level) {
                log::warn!("governor: gvf level {} rejected: {}", gvf_level, e);
            }
        }

        TickDecision {
            freq: self.table[level],
            level,
            gvf_level,
            min_freq: min_out,
            max_freq: max_out,
            suspended: false,
        }
    }

    /// Weighted utilization of the last window for external governors
    ///
    /// The governor lock must be held by the caller; otherwise this logs an
    /// error and returns `0`.
    pub fn calc_utilization(&self) -> u64 {
        if !self.state.is_locked() {
            log::error!("governor: utilization read without lock");
            return 0;
        }
        let status = *self.last_status.lock();
        if status.snapshot.total_time == 0 {
            return 0;
        }
        let util = math::utilization(&status.snapshot, status.compute_weight);
        self.cl_boost_status.store(util.is_compute_bound(), Ordering::Release);
        util.util
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start governing from the current level
    pub fn start(&self) {
        let now = self.clock.now_ns();
        let mut state = self.state.lock();
        state.started = true;
        state.clear(&self.table, now);
        log::info!("governor: start {}", state.policy_name());
    }

    /// Stop governing
    pub fn stop(&self) {
        self.state.lock().started = false;
        log::info!("governor: stop");
    }

    /// Record a completed frequency transition
    ///
    /// Policies reset their timers when the frequency actually changed.
    pub fn complete_transition(&self, old: Frequency, new: Frequency) {
        let now = self.clock.now_ns();
        let mut state = self.state.lock();
        if let Some(level) = self.table.level_of(new) {
            state.current_level = level;
        }
        state.previous_freq = new;
        if old != new {
            state.clear(&self.table, now);
        }
    }

    /// Enter suspend; returns the frequency to park the GPU at
    pub fn suspend(&self) -> Frequency {
        let mut state = self.state.lock();
        state.resume_freq = if state.tunables.wakeup_lock {
            state.previous_freq
        } else {
            0
        };
        state.in_suspend = true;
        self.cl_boost_status.store(false, Ordering::Release);
        let level = self.gvf_start_level.saturating_sub(1).min(self.table.last_level());
        log::info!("governor: suspend, resume at {} kHz", state.resume_freq);
        self.table[level]
    }

    /// Leave suspend
    pub fn resume(&self) {
        let now = self.clock.now_ns();
        let mut state = self.state.lock();
        state.in_suspend = false;
        state.clear(&self.table, now);
        log::info!("governor: resume");
    }

    // =========================================================================
    // Policy Selection
    // =========================================================================

    /// Name of the active policy
    pub fn policy_name(&self) -> String {
        String::from(self.state.lock().policy_name())
    }

    /// Selectable policy names, space separated
    pub fn available_policies(&self) -> String {
        let state = self.state.lock();
        let names: Vec<&str> = state.policies.iter().map(|p| p.name()).collect();
        names.join(" ")
    }

    /// Switch policy by name
    pub fn set_policy(&self, name: &str) -> Result<()> {
        let name = name.trim();
        let mut state = self.state.lock();
        let Some(index) = state.policies.iter().position(|p| p.name() == name) else {
            log::warn!("governor: {} not found", name);
            return Err(Error::UnknownGovernor);
        };
        state.active = index;
        log::info!("governor: policy {}", name);
        Ok(())
    }

    /// Register the external profiler policy
    pub fn register_profiler(&self, profiler: Box<dyn GovernorPolicy>) -> Result<()> {
        let mut state = self.state.lock();
        if state.profiler.is_some() || state.policies.iter().any(|p| p.name() == profiler.name()) {
            return Err(Error::AlreadyRegistered);
        }
        log::info!("governor: register {}", profiler.name());
        state.profiler = Some(state.policies.len());
        state.policies.push(profiler);
        Ok(())
    }

    // =========================================================================
    // Runtime Knobs
    // =========================================================================

    /// Static bounds intersected with QoS on every tick
    pub fn set_scaling_bounds(&self, min_freq: Frequency, max_freq: Frequency) -> Result<()> {
        if min_freq > max_freq {
            return Err(Error::out_of_range(min_freq, 0, max_freq));
        }
        let mut state = self.state.lock();
        state.scaling_min_freq = min_freq;
        state.scaling_max_freq = max_freq;
        Ok(())
    }

    /// Current static bounds
    pub fn scaling_bounds(&self) -> (Frequency, Frequency) {
        let state = self.state.lock();
        (state.scaling_min_freq, state.scaling_max_freq)
    }

    /// Suppress the CL-boost override
    pub fn set_cl_boost_disable(&self, disable: bool) {
        self.state.lock().cl_boost_disable = disable;
    }

    /// CL-boost override suppressed
    pub fn cl_boost_disable(&self) -> bool {
        self.state.lock().cl_boost_disable
    }

    /// Manual minimum clock; non-zero suppresses CL-boost
    pub fn set_mm_min_clock(&self, freq: Frequency) {
        self.state.lock().mm_min_clock = freq;
    }

    /// Manual minimum clock
    pub fn mm_min_clock(&self) -> Frequency {
        self.state.lock().mm_min_clock
    }

    /// Copy of the tunables in effect
    pub fn tunables(&self) -> Tunables {
        self.state.lock().tunables.clone()
    }

    /// Replace a per-level array from level-array notation
    pub fn set_level_array(&self, kind: LevelArray, spec: &str) -> Result<()> {
        self.state.lock().tunables.set_array(&self.table, kind, spec)
    }

    /// Change the highspeed boost parameters
    pub fn set_highspeed(&self, freq: Frequency, load: u32, delay_ms: u32) -> Result<()> {
        if load > 100 {
            return Err(Error::out_of_range(u64::from(load), 0, 100));
        }
        let mut state = self.state.lock();
        state.tunables.set_highspeed_freq(&self.table, freq);
        state.tunables.highspeed_load = load;
        state.tunables.highspeed_delay_ms = delay_ms;
        Ok(())
    }

    /// Change the weight of compute busy time
    pub fn set_compute_weight(&self, weight: u32) {
        self.state.lock().tunables.compute_weight = weight;
    }

    /// Change the hardware load source power ratio, percent
    pub fn set_power_ratio(&self, ratio: u32) -> Result<()> {
        if ratio > 100 {
            return Err(Error::out_of_range(u64::from(ratio), 0, 100));
        }
        self.state.lock().tunables.power_ratio = ratio;
        Ok(())
    }

    /// Restore the pre-suspend frequency on resume
    pub fn set_wakeup_lock(&self, enable: bool) {
        self.state.lock().tunables.wakeup_lock = enable;
    }
}

impl core::fmt::Debug for Governor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Governor")
            .field("table", &self.table)
            .field("gvf_start_level", &self.gvf_start_level)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
