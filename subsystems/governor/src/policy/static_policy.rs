//! Static policy: deterministic up/down oscillation for bring-up.

use super::{GovernorPolicy, PolicyContext};

/// Walks one level per tick, reversing direction at the bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticPolicy {
    updown: u32,
}

impl StaticPolicy {
    fn faster(ctx: &PolicyContext<'_>, level: usize) -> usize {
        if ctx.freq(level) < ctx.max_freq && level > 0 {
            level - 1
        } else {
            level
        }
    }

    fn slower(ctx: &PolicyContext<'_>, level: usize) -> usize {
        if ctx.freq(level) > ctx.min_freq && level < ctx.last_level() {
            level + 1
        } else {
            level
        }
    }

    fn rising(&self) -> bool {
        self.updown & 1 == 0
    }
}

impl GovernorPolicy for StaticPolicy {
    fn name(&self) -> &str {
        "static"
    }

    fn get_target(&mut self, ctx: &mut PolicyContext<'_>, level: usize) -> usize {
        let mut next = if self.rising() {
            Self::faster(ctx, level)
        } else {
            Self::slower(ctx, level)
        };

        if next == ctx.current_level {
            next = if self.rising() {
                Self::slower(ctx, next)
            } else {
                Self::faster(ctx, next)
            };
            if next != ctx.current_level {
                self.updown = self.updown.wrapping_add(1);
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;

    #[test]
    fn test_oscillates_across_table() {
        let mut f = Fixture::new(2);
        let mut policy = StaticPolicy::default();
        let levels: alloc::vec::Vec<usize> = (0..8).map(|_| f.step(&mut policy, 50)).collect();
        assert_eq!(levels, [1, 0, 1, 2, 3, 2, 1, 0]);
    }

    #[test]
    fn test_stays_within_bounds() {
        let mut f = Fixture::new(1);
        let mut policy = StaticPolicy::default();
        for _ in 0..20 {
            f.utilization = 0;
            let level = f.current_level;
            let mut ctx = f.ctx();
            ctx.min_freq = 600;
            ctx.max_freq = 800;
            let next = policy.get_target(&mut ctx, level);
            assert!((1..=2).contains(&next), "{}", next);
            f.current_level = next;
        }
    }
}
