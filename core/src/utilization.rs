//! # Utilization Snapshot
//!
//! Busy/total counters of one sampling window, captured once per governor
//! tick and read-only for the rest of that tick.

/// Counters of the last completed sampling window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UtilizationSnapshot {
    /// Time the GPU was busy during the window
    pub busy_time: u64,
    /// Length of the window; `0` means no data yet
    pub total_time: u64,
    /// Busy time attributed to compute work
    pub cu_busy_time: u64,
    /// Length of the window before this one; `0` on the first window
    pub prev_total_time: u64,
    /// The sampler has an additional hardware load signal
    pub hw_source_valid: bool,
}

impl UtilizationSnapshot {
    /// Snapshot with only graphics busy time
    pub const fn new(busy_time: u64, total_time: u64) -> Self {
        Self {
            busy_time,
            total_time,
            cu_busy_time: 0,
            prev_total_time: total_time,
            hw_source_valid: false,
        }
    }

    /// Set the compute busy time
    pub const fn with_compute(mut self, cu_busy_time: u64) -> Self {
        self.cu_busy_time = cu_busy_time;
        self
    }

    /// Set the length of the preceding window
    pub const fn with_previous(mut self, prev_total_time: u64) -> Self {
        self.prev_total_time = prev_total_time;
        self
    }

    /// Mark the hardware load signal as available
    pub const fn with_hw_source(mut self) -> Self {
        self.hw_source_valid = true;
        self
    }

    /// Both this window and the previous one carry data
    pub const fn is_ready(&self) -> bool {
        self.total_time != 0 && self.prev_total_time != 0
    }
}
