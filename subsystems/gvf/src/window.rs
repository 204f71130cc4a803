//! # Monitor Window
//!
//! Rolling baseline of wall time and cumulative idle time. Both the Ratio
//! governor and the periodic idle-ratio report measure against it.

/// Baseline captured at enable and at every window refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleWindow {
    base_time_ns: u64,
    base_idle_time_ns: u64,
}

/// Wall and idle time accumulated since the baseline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSample {
    /// Wall time since the baseline
    pub elapsed_ns: u64,
    /// Idle time since the baseline
    pub idle_ns: u64,
}

impl WindowSample {
    /// Idle share in percent; `None` before any time has elapsed
    pub fn idle_ratio(&self) -> Option<u64> {
        if self.elapsed_ns == 0 {
            return None;
        }
        Some((self.idle_ns as u128 * 100 / self.elapsed_ns as u128) as u64)
    }
}

impl IdleWindow {
    /// Window starting at the given instant
    pub const fn starting_at(now_ns: u64, idle_ns: u64) -> Self {
        Self {
            base_time_ns: now_ns,
            base_idle_time_ns: idle_ns,
        }
    }

    /// Move the baseline to the given instant
    pub fn reset(&mut self, now_ns: u64, idle_ns: u64) {
        self.base_time_ns = now_ns;
        self.base_idle_time_ns = idle_ns;
    }

    /// Start of the window
    pub fn base_time_ns(&self) -> u64 {
        self.base_time_ns
    }

    /// Measure against the baseline
    pub fn sample(&self, now_ns: u64, idle_ns: u64) -> WindowSample {
        WindowSample {
            elapsed_ns: now_ns.saturating_sub(self.base_time_ns),
            idle_ns: idle_ns.saturating_sub(self.base_idle_time_ns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample() {
        let window = IdleWindow::starting_at(1_000, 500);
        let sample = window.sample(11_000, 3_000);
        assert_eq!(sample.elapsed_ns, 10_000);
        assert_eq!(sample.idle_ns, 2_500);
        assert_eq!(sample.idle_ratio(), Some(25));
    }

    #[test]
    fn test_empty_window() {
        let window = IdleWindow::starting_at(1_000, 0);
        assert_eq!(window.sample(1_000, 0).idle_ratio(), None);
        assert_eq!(window.sample(500, 0).elapsed_ns, 0);
    }

    #[test]
    fn test_reset() {
        let mut window = IdleWindow::default();
        window.reset(42, 7);
        assert_eq!(window.base_time_ns(), 42);
        assert_eq!(window.sample(52, 9), WindowSample { elapsed_ns: 10, idle_ns: 2 });
    }
}
