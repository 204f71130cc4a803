//! # Conservative Policy
//!
//! Threshold controller: one step faster as soon as the load exceeds the
//! level's max threshold, one step slower once the load has stayed under
//! the min threshold for the level's downstay time.
//!
//! ```text
//!   load > max_threshold   ──► level - 1            (immediate)
//!   load < min_threshold   ──► level + 1            (after downstay)
//!   otherwise              ──► restart downstay
//! ```

use super::{GovernorPolicy, PolicyContext};
use crate::math::Thresholds;

/// Threshold-based stepping policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConservativePolicy;

impl GovernorPolicy for ConservativePolicy {
    fn name(&self) -> &str {
        "conservative"
    }

    fn get_target(&mut self, ctx: &mut PolicyContext<'_>, level: usize) -> usize {
        if let Some(level) = ctx.highspeed_target() {
            return level;
        }

        let mut thresholds = Thresholds {
            max: ctx.tunables.max_threshold(level),
            min: ctx.tunables.min_threshold(level),
        };
        if ctx.snapshot.hw_source_valid {
            thresholds = thresholds.scaled(&ctx.snapshot);
            log::trace!(
                "governor: hw source power_ratio {} thresholds {}/{}",
                ctx.tunables.power_ratio,
                thresholds.max,
                thresholds.min
            );
        }

        let util = ctx.utilization;
        if util > u64::from(thresholds.max) && level > 0 {
            level - 1
        } else if util < u64::from(thresholds.min) {
            if ctx.downstay_expired() && level < ctx.last_level() {
                level + 1
            } else {
                level
            }
        } else {
            ctx.hold(level);
            level
        }
    }

    fn clear(&mut self, ctx: &mut PolicyContext<'_>, level: usize) {
        ctx.hold(level);
        ctx.rearm_highspeed(level);
    }
}
