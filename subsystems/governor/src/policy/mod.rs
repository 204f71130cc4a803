//! # Governor Policies
//!
//! Interchangeable decision functions mapping the current level and the
//! window's load to a new level.
//!
//! ```text
//!   ┌──────────────┐   get_target(ctx, level) -> level'
//!   │   Governor   │ ─────────────────────────────────────► policy
//!   │     tick     │
//!   └──────────────┘   clear(ctx, level)  (after a transition)
//! ```
//!
//! Every policy sees the same [`PolicyContext`]: the table, the tunables,
//! the shared hysteresis timers and the window's load. Lower level index
//! means faster.

mod conservative;
mod interactive;
mod static_policy;

pub use conservative::ConservativePolicy;
pub use interactive::InteractivePolicy;
pub use static_policy::StaticPolicy;

use alloc::boxed::Box;
use alloc::vec::Vec;

use sgpu_core::time::{ms_to_ns, time_after, time_before};
use sgpu_core::{Frequency, FrequencyTable, UtilizationSnapshot};

use crate::tunables::Tunables;

// =============================================================================
// HYSTERESIS TIMERS
// =============================================================================

/// Deadlines shared by every policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HysteresisTimers {
    /// A slower level is not taken before this instant
    pub expire_ns: u64,
    /// The highspeed jump is not taken before this instant
    pub highspeed_expire_ns: u64,
}

// =============================================================================
// POLICY CONTEXT
// =============================================================================

/// Everything a policy may read or update during one decision
#[derive(Debug)]
pub struct PolicyContext<'a> {
    /// Operating points, fastest first
    pub table: &'a FrequencyTable,
    /// Thresholds, dwell times and boost parameters
    pub tunables: &'a Tunables,
    /// Shared deadlines
    pub timers: &'a mut HysteresisTimers,
    /// Counters of the window
    pub snapshot: UtilizationSnapshot,
    /// Weighted load of the window, percent
    pub utilization: u64,
    /// Frequency of the last completed transition
    pub previous_freq: Frequency,
    /// Level of the last completed transition
    pub current_level: usize,
    /// Effective lower bound of this tick
    pub min_freq: Frequency,
    /// Effective upper bound of this tick
    pub max_freq: Frequency,
    /// Monotonic time of the decision
    pub now_ns: u64,
}

impl PolicyContext<'_> {
    /// Highest level index
    #[inline]
    pub fn last_level(&self) -> usize {
        self.table.last_level()
    }

    /// Frequency of `level`
    #[inline]
    pub fn freq(&self, level: usize) -> Frequency {
        self.table[level]
    }

    /// Deadline `ms` from now
    #[inline]
    pub fn deadline(&self, ms: u32) -> u64 {
        self.now_ns.saturating_add(ms_to_ns(u64::from(ms)))
    }

    /// Restart the downstay timer for `level`
    pub fn hold(&mut self, level: usize) {
        self.timers.expire_ns = self.deadline(self.tunables.downstay_ms(level));
    }

    /// The downstay timer ran out
    #[inline]
    pub fn downstay_expired(&self) -> bool {
        time_after(self.now_ns, self.timers.expire_ns)
    }

    /// The downstay timer is still running
    #[inline]
    pub fn downstay_pending(&self) -> bool {
        time_before(self.now_ns, self.timers.expire_ns)
    }

    /// Shared highspeed short-circuit
    ///
    /// Returns the highspeed level while the load has stayed above
    /// `highspeed_load` for the configured delay below `highspeed_freq`.
    /// Otherwise the delay restarts.
    pub fn highspeed_target(&mut self) -> Option<usize> {
        let t = self.tunables;
        if self.previous_freq < t.highspeed_freq && self.utilization > u64::from(t.highspeed_load) {
            if time_after(self.now_ns, self.timers.highspeed_expire_ns) {
                return Some(t.highspeed_level);
            }
        } else {
            self.timers.highspeed_expire_ns = self.deadline(t.highspeed_delay_ms);
        }
        None
    }

    /// Restart the highspeed delay after settling on, or falling through,
    /// the highspeed level
    pub fn rearm_highspeed(&mut self, level: usize) {
        let hs_level = self.tunables.highspeed_level;
        if self.current_level == level || (self.current_level >= hs_level && level < hs_level) {
            self.timers.highspeed_expire_ns = self.deadline(self.tunables.highspeed_delay_ms);
        }
    }
}

// =============================================================================
// POLICY INTERFACE
// =============================================================================

/// A governor decision policy
pub trait GovernorPolicy: Send {
    /// Name used for selection
    fn name(&self) -> &str;

    /// Choose the next level starting from `level`
    fn get_target(&mut self, ctx: &mut PolicyContext<'_>, level: usize) -> usize;

    /// Reset timers after a transition to `level`
    fn clear(&mut self, _ctx: &mut PolicyContext<'_>, _level: usize) {}
}

/// Index of the default policy in [`builtin`]
pub const DEFAULT_POLICY: usize = 1;

/// Built-in policies in listing order
pub fn builtin() -> Vec<Box<dyn GovernorPolicy>> {
    alloc::vec![
        Box::new(StaticPolicy::default()),
        Box::new(ConservativePolicy),
        Box::new(InteractivePolicy),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Owned pieces of a [`PolicyContext`]
    pub struct Fixture {
        pub table: FrequencyTable,
        pub tunables: Tunables,
        pub timers: HysteresisTimers,
        pub snapshot: UtilizationSnapshot,
        pub utilization: u64,
        pub previous_freq: Frequency,
        pub current_level: usize,
        pub now_ns: u64,
    }

    impl Fixture {
        /// `[1000, 800, 600, 400]` with thresholds `[0,40,40,40]`,
        /// `[100,75,75,75]` and downstay `[0,32,32,32]`, highspeed off
        pub fn new(current_level: usize) -> Self {
            let table = FrequencyTable::new(alloc::vec![1000, 800, 600, 400]).unwrap();
            let mut tunables = Tunables::for_table(&table)
                .unwrap()
                .with_arrays(&[0, 40, 40, 40], &[100, 75, 75, 75], &[0, 32, 32, 32])
                .unwrap();
            // No highspeed jump unless a test asks for one
            tunables.highspeed_freq = 0;
            Self {
                previous_freq: table[current_level],
                table,
                tunables,
                timers: HysteresisTimers::default(),
                snapshot: UtilizationSnapshot::new(1, 1),
                utilization: 0,
                current_level,
                now_ns: 1,
            }
        }

        pub fn ctx(&mut self) -> PolicyContext<'_> {
            PolicyContext {
                table: &self.table,
                tunables: &self.tunables,
                timers: &mut self.timers,
                snapshot: self.snapshot,
                utilization: self.utilization,
                previous_freq: self.previous_freq,
                current_level: self.current_level,
                min_freq: 400,
                max_freq: 1000,
                now_ns: self.now_ns,
            }
        }

        pub fn advance_ms(&mut self, ms: u64) {
            self.now_ns += ms_to_ns(ms);
        }

        /// Run one decision and commit the result as a transition
        pub fn step(&mut self, policy: &mut dyn GovernorPolicy, utilization: u64) -> usize {
            self.utilization = utilization;
            let level = self.current_level;
            let next = policy.get_target(&mut self.ctx(), level);
            if next != self.current_level {
                self.current_level = next;
                self.previous_freq = self.table[next];
                policy.clear(&mut self.ctx(), next);
            }
            next
        }
    }
}
