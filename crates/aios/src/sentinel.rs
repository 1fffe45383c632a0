//! Background sentinel task.
//!
//! Watches the process table on a fixed tick and emits reports over a
//! channel: new processes since the baseline, and anything burning CPU past
//! the alert threshold. Shutdown goes through a watch channel so `stop`
//! can await the task instead of polling a shared flag.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::SentinelConfig;
use crate::process::ProcessTable;

/// Short-lived helpers the shell itself spawns; reporting them as "new"
/// would be pure noise.
const NOISE_NAMES: &[&str] = &["ps", "sleep", "grep", "head", "sh", "which", "xdg-open"];

/// One observation worth telling the operator about.
#[derive(Debug, Clone, PartialEq)]
pub enum SentinelReport {
    NewProcess { pid: i32, name: String },
    HighCpu { pid: i32, name: String, cpu_percent: f32 },
}

/// PIDs in `current` that the baseline has not seen, ascending.
pub fn new_pids(known: &HashSet<i32>, current: &[i32]) -> Vec<i32> {
    let mut fresh: Vec<i32> = current
        .iter()
        .copied()
        .filter(|pid| !known.contains(pid))
        .collect();
    fresh.sort_unstable();
    fresh
}

/// Owns the monitoring task. Start is idempotent, stop awaits the task.
pub struct Sentinel {
    table: Arc<dyn ProcessTable>,
    reports: mpsc::UnboundedSender<SentinelReport>,
    interval: Duration,
    cpu_alert_percent: f32,
    top_n: usize,
    cancel: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Sentinel {
    pub fn new(
        table: Arc<dyn ProcessTable>,
        config: &SentinelConfig,
        reports: mpsc::UnboundedSender<SentinelReport>,
    ) -> Self {
        Self {
            table,
            reports,
            interval: Duration::from_secs(config.interval_secs),
            cpu_alert_percent: config.cpu_alert_percent,
            top_n: config.top_n,
            cancel: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Spawn the watch loop. Already-running is a no-op; the first tick's
    /// process listing seeds the baseline silently.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let table = self.table.clone();
        let reports = self.reports.clone();
        let interval = self.interval;
        let alert = self.cpu_alert_percent;
        let top_n = self.top_n;

        let handle = tokio::spawn(async move {
            let mut known: HashSet<i32> = table.list_pids().into_iter().collect();
            let mut ticker = tokio::time::interval(interval);
            // The first tick of an interval fires immediately; consume it so
            // the baseline gets a full period before the first diff.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = cancel_rx.changed() => break,
                }

                let current = table.list_pids();
                for pid in new_pids(&known, &current) {
                    let name = table
                        .name_of(pid)
                        .unwrap_or_else(|| "unknown".to_string());
                    if NOISE_NAMES.contains(&name.as_str()) {
                        continue;
                    }
                    let _ = reports.send(SentinelReport::NewProcess { pid, name });
                }
                known = current.into_iter().collect();

                for sample in table.top_cpu(top_n) {
                    if sample.cpu_percent > alert {
                        let _ = reports.send(SentinelReport::HighCpu {
                            pid: sample.pid,
                            name: sample.name,
                            cpu_percent: sample.cpu_percent,
                        });
                    }
                }
            }
            debug!("sentinel loop exited");
        });

        self.cancel = Some(cancel_tx);
        self.task = Some(handle);
        info!("sentinel started");
    }

    /// Cancel and await the loop. No-op when already stopped.
    pub async fn stop(&mut self) {
        let Some(cancel) = self.cancel.take() else {
            return;
        };
        let _ = cancel.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("sentinel stopped");
    }
}
