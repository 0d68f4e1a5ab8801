use std::path::Path;

use sysinfo::{Disks, Networks, System};

use super::counters::{ByteCounters, CpuCounters, DiskCounters, MemoryCounters, NetworkReading};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed counter data: {0}")]
    Parse(String),

    #[error("counter not available: {0}")]
    Unavailable(String),
}

impl ProbeError {
    pub(crate) fn parse<S: Into<String>>(msg: S) -> Self {
        ProbeError::Parse(msg.into())
    }

    pub(crate) fn unavailable<S: Into<String>>(msg: S) -> Self {
        ProbeError::Unavailable(msg.into())
    }
}

/// Raw OS counter readers consumed by the collection cycle.
///
/// Each reader is a single instantaneous read; rate derivation from two
/// time-separated readings is the sampler's job, not the probe's. Any
/// failure here is absorbed by the cycle as a partial-failure warning.
pub trait Probes: Send + Sync {
    fn cpu_counters(&self) -> Result<CpuCounters, ProbeError>;
    fn memory_counters(&self) -> Result<MemoryCounters, ProbeError>;
    fn disk_counters(&self, mount: &Path) -> Result<DiskCounters, ProbeError>;
    fn network_counters(&self) -> Result<NetworkReading, ProbeError>;
}

/// Production [`Probes`] backed by sysinfo, plus `/proc/stat` for the raw
/// CPU tick counters that sysinfo does not expose.
#[derive(Debug, Default)]
pub struct SystemProbes;

impl Probes for SystemProbes {
    fn cpu_counters(&self) -> Result<CpuCounters, ProbeError> {
        read_proc_stat_cpu()
    }

    fn memory_counters(&self) -> Result<MemoryCounters, ProbeError> {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Err(ProbeError::unavailable("total memory reported as zero"));
        }
        Ok(MemoryCounters {
            total,
            available: sys.available_memory(),
        })
    }

    fn disk_counters(&self, mount: &Path) -> Result<DiskCounters, ProbeError> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == mount)
            .ok_or_else(|| {
                ProbeError::unavailable(format!("no disk mounted at {}", mount.display()))
            })?;
        Ok(DiskCounters {
            total: disk.total_space(),
            free: disk.available_space(),
        })
    }

    fn network_counters(&self) -> Result<NetworkReading, ProbeError> {
        let networks = Networks::new_with_refreshed_list();
        Ok(networks
            .iter()
            .map(|(name, data)| {
                (
                    name.clone(),
                    ByteCounters {
                        received: data.total_received(),
                        transmitted: data.total_transmitted(),
                    },
                )
            })
            .collect())
    }
}

#[cfg(target_os = "linux")]
fn read_proc_stat_cpu() -> Result<CpuCounters, ProbeError> {
    let contents = std::fs::read_to_string("/proc/stat")?;
    parse_proc_stat_cpu(&contents)
}

#[cfg(not(target_os = "linux"))]
fn read_proc_stat_cpu() -> Result<CpuCounters, ProbeError> {
    Err(ProbeError::unavailable(
        "raw CPU tick counters are only read on Linux",
    ))
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Fields: user nice system idle iowait irq softirq steal [guest ...].
/// Total counts the first eight fields; busy excludes idle and iowait.
/// Guest time is already accounted inside user/nice and is skipped.
#[cfg(any(target_os = "linux", test))]
fn parse_proc_stat_cpu(contents: &str) -> Result<CpuCounters, ProbeError> {
    let line = contents
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| ProbeError::parse("no aggregate cpu line in /proc/stat"))?;

    let ticks: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|field| {
            field
                .parse()
                .map_err(|_| ProbeError::parse(format!("bad cpu tick field `{field}`")))
        })
        .collect::<Result<_, _>>()?;
    if ticks.len() < 5 {
        return Err(ProbeError::parse("truncated cpu line in /proc/stat"));
    }

    let total: u64 = ticks.iter().sum();
    let idle = ticks[3] + ticks[4];
    Ok(CpuCounters {
        busy: total.saturating_sub(idle),
        total,
    })
}
