//! Telemetry collection using sysinfo.
//!
//! CPU figures are differential: two counter refreshes separated by a short
//! wait, so each batch reflects utilization over a real window instead of an
//! instantaneous guess. The `System` handle is long-lived; the first reading
//! after construction is discarded (counter warm-up artifact).

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::time::sleep;
use tracing::debug;

use crate::types::{Batch, TelemetryEvent};

/// Settle delay after the discarded warm-up reading.
const WARMUP_SETTLE: Duration = Duration::from_millis(500);
/// Window between the two system CPU readings.
const CPU_WINDOW: Duration = Duration::from_millis(200);
/// Window between the two per-process snapshots.
const PROCESS_WINDOW: Duration = Duration::from_millis(500);
/// Batches carry at most this many process events.
const TOP_PROCESSES: usize = 3;

/// Why a process was left out of a batch. Skips are expected (processes
/// come and go mid-scan) and never fail the surrounding collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Appeared after the baseline snapshot; no window to measure.
    NoBaseline,
    /// Gone before the second snapshot.
    Exited,
}

#[derive(Debug, Clone, PartialEq)]
struct ProcessSample {
    pid: u32,
    name: String,
    cpu: f64,
    rss: u64,
}

pub struct TelemetryCollector {
    sys: System,
}

impl TelemetryCollector {
    /// Builds the collector and performs the warm-up read.
    pub async fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sleep(WARMUP_SETTLE).await;
        Self { sys }
    }

    /// Produces one batch: the system metric event first, then up to three
    /// process events sorted descending by CPU share.
    pub async fn collect(&mut self, agent_id: &str) -> Batch {
        let mut events = Vec::with_capacity(1 + TOP_PROCESSES);
        events.push(self.sample_system().await);
        events.extend(self.sample_processes().await);
        Batch {
            agent_id: agent_id.to_string(),
            ts: Utc::now(),
            platform: std::env::consts::OS.to_string(),
            events,
        }
    }

    async fn sample_system(&mut self) -> TelemetryEvent {
        self.sys.refresh_cpu_usage();
        sleep(CPU_WINDOW).await;
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        let cpu = round4((f64::from(self.sys.global_cpu_usage()) / 100.0).clamp(0.0, 1.0));
        TelemetryEvent::Metric {
            cpu,
            mem_free: self.sys.available_memory(),
        }
    }

    async fn sample_processes(&mut self) -> Vec<TelemetryEvent> {
        let refresh = ProcessRefreshKind::nothing().with_cpu().with_memory();
        self.sys
            .refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);
        let baseline: HashSet<Pid> = self.sys.processes().keys().copied().collect();

        sleep(PROCESS_WINDOW).await;
        self.sys
            .refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);

        let cores = self.sys.cpus().len().max(1) as f64;
        let mut samples = Vec::with_capacity(self.sys.processes().len());
        let mut skips: Vec<(u32, SkipReason)> = Vec::new();
        let mut seen: HashSet<Pid> = HashSet::with_capacity(self.sys.processes().len());

        for (pid, process) in self.sys.processes() {
            seen.insert(*pid);
            if !baseline.contains(pid) {
                skips.push((pid.as_u32(), SkipReason::NoBaseline));
                continue;
            }
            // cpu_usage() is percent-of-one-core over the refresh window;
            // normalize to a share of the whole machine.
            let cpu = round4((f64::from(process.cpu_usage()) / (100.0 * cores)).max(0.0));
            samples.push(ProcessSample {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cpu,
                rss: process.memory(),
            });
        }
        for pid in baseline.difference(&seen) {
            skips.push((pid.as_u32(), SkipReason::Exited));
        }
        if !skips.is_empty() {
            debug!("skipped {} processes mid-scan: {:?}", skips.len(), skips);
        }

        rank_processes(samples)
    }
}

/// Top-N policy: drop non-positive shares, sort descending, keep three.
fn rank_processes(mut samples: Vec<ProcessSample>) -> Vec<TelemetryEvent> {
    samples.retain(|s| s.cpu > 0.0);
    samples.sort_by(|a, b| b.cpu.total_cmp(&a.cpu));
    samples.truncate(TOP_PROCESSES);
    samples
        .into_iter()
        .map(|s| TelemetryEvent::Proc {
            pid: s.pid,
            name: s.name,
            cpu: s.cpu,
            rss: s.rss,
        })
        .collect()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
