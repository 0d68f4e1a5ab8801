use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::CollectorConfig;
use crate::supervisor::{Shutdown, WaitOutcome, wait_for_period};

use super::counters::{self, NetworkReading};
use super::probes::{ProbeError, Probes, SystemProbes};
use super::snapshot::{InterfaceTraffic, ResourceSnapshot};
use super::store::SnapshotStore;

/// Periodically samples host resources and publishes the merged snapshot.
///
/// The loop is strictly sequential: a cycle's fan-out is joined before the
/// next wait begins, so no two cycles ever overlap. Cancellation is only
/// observed at the wait boundary; an in-flight sample interval finishes
/// first, which bounds shutdown latency to roughly one sample interval
/// rather than the full period.
pub struct Collector<P = SystemProbes> {
    probes: P,
    store: Arc<SnapshotStore>,
    period: Duration,
    sample_interval: Duration,
    disk_mount: PathBuf,
}

impl Collector<SystemProbes> {
    pub fn new(store: Arc<SnapshotStore>, config: &CollectorConfig) -> Self {
        Self::with_probes(SystemProbes, store, config)
    }
}

impl<P: Probes> Collector<P> {
    pub fn with_probes(probes: P, store: Arc<SnapshotStore>, config: &CollectorConfig) -> Self {
        Self {
            probes,
            store,
            period: Duration::from_millis(config.period_ms),
            sample_interval: Duration::from_millis(config.sample_interval_ms),
            disk_mount: PathBuf::from(&config.disk_mount),
        }
    }

    /// Runs collection cycles until cancelled. The first cycle fires
    /// immediately; subsequent cycles wait out the steady period.
    pub async fn run(self, mut shutdown: Shutdown) {
        let mut period = Duration::ZERO;
        loop {
            match wait_for_period(&mut shutdown, period).await {
                WaitOutcome::Cancelled => return,
                WaitOutcome::TimedOut => {}
            }
            period = self.period;
            self.collect_cycle().await;
        }
    }

    /// One collection cycle: the four samplers run concurrently, each an
    /// independent failure domain. A failed sampler keeps its field at the
    /// previously published value (zero-default on the first cycle); that
    /// retention is observable downstream and deliberate.
    async fn collect_cycle(&self) {
        let (cpu, mem, disk, net) = tokio::join!(
            self.sample_cpu(),
            self.sample_memory(),
            self.sample_disk(),
            self.sample_network(),
        );

        let mut snapshot: ResourceSnapshot = self.store.read_current();
        match cpu {
            Ok(rate) => snapshot.cpu_usage_rate = rate,
            Err(err) => warn!(error = %err, "failed to get CPU usage rate"),
        }
        match mem {
            Ok(rate) => snapshot.mem_usage_rate = rate,
            Err(err) => warn!(error = %err, "failed to get memory usage rate"),
        }
        match disk {
            Ok(rate) => snapshot.disk_usage_rate = rate,
            Err(err) => warn!(error = %err, "failed to get disk usage rate"),
        }
        match net {
            Ok(traffic) => snapshot.network_traffic = traffic,
            Err(err) => warn!(error = %err, "failed to get network traffic"),
        }

        self.store.publish(&snapshot);

        debug!(
            cpu_pct = format_args!("{:.2}", snapshot.cpu_usage_rate),
            mem_pct = format_args!("{:.2}", snapshot.mem_usage_rate),
            disk_pct = format_args!("{:.2}", snapshot.disk_usage_rate),
            interfaces = snapshot.network_traffic.len(),
            "collection cycle complete"
        );
    }

    /// CPU utilization from two tick readings one sample interval apart.
    async fn sample_cpu(&self) -> Result<f64, ProbeError> {
        let first = self.probes.cpu_counters()?;
        tokio::time::sleep(self.sample_interval).await;
        let second = self.probes.cpu_counters()?;
        Ok(counters::cpu_usage_rate(&first, &second))
    }

    async fn sample_memory(&self) -> Result<f64, ProbeError> {
        Ok(counters::memory_usage_rate(&self.probes.memory_counters()?))
    }

    async fn sample_disk(&self) -> Result<f64, ProbeError> {
        Ok(counters::disk_usage_rate(
            &self.probes.disk_counters(&self.disk_mount)?,
        ))
    }

    /// Per-interface traffic from two byte-counter readings one sample
    /// interval apart.
    async fn sample_network(&self) -> Result<Vec<InterfaceTraffic>, ProbeError> {
        let first: NetworkReading = self.probes.network_counters()?;
        tokio::time::sleep(self.sample_interval).await;
        let second = self.probes.network_counters()?;
        Ok(counters::network_traffic(
            &first,
            &second,
            self.sample_interval.as_secs_f64(),
        ))
    }
}
