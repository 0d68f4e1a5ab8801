use super::snapshot::InterfaceTraffic;

/// Cumulative CPU time counters, in clock ticks since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCounters {
    pub busy: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCounters {
    pub total: u64,
    pub available: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskCounters {
    pub total: u64,
    pub free: u64,
}

/// Cumulative per-interface byte counters since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteCounters {
    pub received: u64,
    pub transmitted: u64,
}

/// One network counter reading: interfaces in discovery order.
pub type NetworkReading = Vec<(String, ByteCounters)>;

fn clamp_rate(rate: f64) -> f64 {
    rate.clamp(0.0, 100.0)
}

/// CPU utilization over the window between two counter readings.
/// Returns 0 when the counters did not advance.
pub fn cpu_usage_rate(prev: &CpuCounters, curr: &CpuCounters) -> f64 {
    let total_delta = curr.total.saturating_sub(prev.total);
    if total_delta == 0 {
        return 0.0;
    }
    let busy_delta = curr.busy.saturating_sub(prev.busy);
    clamp_rate(busy_delta as f64 / total_delta as f64 * 100.0)
}

pub fn memory_usage_rate(counters: &MemoryCounters) -> f64 {
    if counters.total == 0 {
        return 0.0;
    }
    let used = counters.total.saturating_sub(counters.available);
    clamp_rate(used as f64 / counters.total as f64 * 100.0)
}

pub fn disk_usage_rate(counters: &DiskCounters) -> f64 {
    if counters.total == 0 {
        return 0.0;
    }
    let used = counters.total.saturating_sub(counters.free);
    clamp_rate(used as f64 / counters.total as f64 * 100.0)
}

/// Per-interface traffic rates from two time-separated counter readings.
///
/// Interfaces missing from either reading are dropped. Counter resets
/// (e.g. an interface re-created between readings) read as zero via
/// saturating subtraction rather than producing a negative rate.
pub fn network_traffic(
    prev: &NetworkReading,
    curr: &NetworkReading,
    elapsed_secs: f64,
) -> Vec<InterfaceTraffic> {
    if elapsed_secs <= 0.0 {
        return Vec::new();
    }
    curr.iter()
        .filter_map(|(name, after)| {
            let (_, before) = prev.iter().find(|(p, _)| p == name)?;
            Some(InterfaceTraffic {
                interface: name.clone(),
                inbound_bps: after.received.saturating_sub(before.received) as f64 * 8.0
                    / elapsed_secs,
                outbound_bps: after.transmitted.saturating_sub(before.transmitted) as f64 * 8.0
                    / elapsed_secs,
            })
        })
        .collect()
}
