//! # Interactive Policy
//!
//! Projects the frequency that would bring the window's load to the level's
//! target load and jumps to the closest operating point.
//!
//! ```text
//!   target_freq = load * previous_freq / target_load
//!
//!   target_freq > previous_freq   ──► fastest needed level, restart downstay
//!   otherwise                     ──► slowest level still >= target_freq,
//!                                     held until downstay runs out
//! ```

use super::{GovernorPolicy, PolicyContext};
use crate::math::{load_ratio, NORMALIZE_FACT};
use sgpu_core::Frequency;

/// Target-frequency policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractivePolicy;

impl InteractivePolicy {
    /// Frequency that would run the window at `target_load`
    pub fn target_freq(ctx: &PolicyContext<'_>, target_load: u32) -> Frequency {
        let target_load = u128::from(target_load.max(1));
        let load = u128::from(ctx.utilization) * u128::from(ctx.previous_freq);
        let freq = if ctx.snapshot.hw_source_valid {
            let ratio = u128::from(load_ratio(&ctx.snapshot));
            log::trace!("governor: hw source power_ratio {} ratio {}", ctx.tunables.power_ratio, ratio);
            ratio * load / (target_load * u128::from(NORMALIZE_FACT))
        } else {
            load / target_load
        };
        freq.min(u128::from(Frequency::MAX)) as Frequency
    }
}

impl GovernorPolicy for InteractivePolicy {
    fn name(&self) -> &str {
        "interactive"
    }

    fn get_target(&mut self, ctx: &mut PolicyContext<'_>, level: usize) -> usize {
        if let Some(level) = ctx.highspeed_target() {
            return level;
        }

        let target_freq = Self::target_freq(ctx, ctx.tunables.max_threshold(level));
        let mut level = level.min(ctx.last_level());

        if target_freq > ctx.previous_freq {
            while ctx.freq(level) < target_freq && level > 0 {
                level -= 1;
            }
            ctx.hold(level);
            return level;
        }

        while ctx.freq(level) > target_freq && level < ctx.last_level() {
            level += 1;
        }
        if ctx.freq(level) < target_freq {
            level = level.saturating_sub(1);
        }

        // Skipping several levels down: keep one step back if the present
        // load would overload the slower level
        let current = ctx.current_level;
        if level > current + 1 {
            let target_load = u64::from(ctx.tunables.max_threshold(level));
            if ctx.utilization * ctx.freq(current) / ctx.freq(level).max(1) > target_load {
                level -= 1;
            }
        }

        if level == current {
            ctx.hold(level);
        } else if ctx.downstay_pending() {
            return current;
        }
        level
    }

    fn clear(&mut self, ctx: &mut PolicyContext<'_>, level: usize) {
        if level > ctx.current_level && ctx.freq(level) != ctx.max_freq {
            ctx.timers.expire_ns = ctx.deadline(ctx.tunables.valid_time_ms);
        } else {
            ctx.hold(level);
        }
        ctx.rearm_highspeed(level);
    }
}
