//! CPU adapter - usage, frequency and temperature readings plus governor
//! control through the cpufreq sysfs files.

use crate::error::ActionError;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

const PROC_STAT: &str = "/proc/stat";
const CPUFREQ_CUR: &str = "/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq";
const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";
const CPU_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Aggregate jiffies from the first line of /proc/stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq
            + self.steal
    }

    fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }
}

/// Parse the aggregate "cpu" line of /proc/stat.
pub fn parse_stat_line(line: &str) -> Option<CpuTimes> {
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }
    let mut next = || fields.next().and_then(|f| f.parse().ok());
    Some(CpuTimes {
        user: next()?,
        nice: next()?,
        system: next()?,
        idle: next()?,
        iowait: next().unwrap_or(0),
        irq: next().unwrap_or(0),
        softirq: next().unwrap_or(0),
        steal: next().unwrap_or(0),
    })
}

/// Usage percent between two samples: active delta over total delta.
pub fn usage_between(prev: CpuTimes, current: CpuTimes) -> f64 {
    let total_diff = current.total().saturating_sub(prev.total());
    let idle_diff = current.idle_total().saturating_sub(prev.idle_total());
    if total_diff == 0 {
        return 0.0;
    }
    (total_diff - idle_diff) as f64 / total_diff as f64 * 100.0
}

/// Read-only CPU facts.
pub trait CpuInfo: Send + Sync {
    /// System-wide CPU usage since the previous call.
    fn usage_percent(&self) -> f64;
    /// Current frequency of cpu0 in MHz, when the cpufreq driver exposes it.
    fn frequency_mhz(&self) -> Option<f64>;
    /// Package temperature in °C, when a thermal zone exists.
    fn temperature_c(&self) -> Option<f64>;
}

/// CpuInfo backed by /proc/stat and sysfs. Keeps the previous stat sample
/// so successive usage queries measure the interval between them.
pub struct SysCpuMonitor {
    prev: Mutex<CpuTimes>,
}

impl SysCpuMonitor {
    pub fn new() -> Self {
        // Prime the baseline so the first real query has an interval.
        let initial = read_stat().unwrap_or_default();
        Self {
            prev: Mutex::new(initial),
        }
    }
}

impl Default for SysCpuMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn read_stat() -> Option<CpuTimes> {
    let contents = fs::read_to_string(PROC_STAT).ok()?;
    parse_stat_line(contents.lines().next()?)
}

impl CpuInfo for SysCpuMonitor {
    fn usage_percent(&self) -> f64 {
        let Some(current) = read_stat() else {
            warn!("Cannot read {}", PROC_STAT);
            return 0.0;
        };
        let mut prev = self.prev.lock().unwrap();
        let usage = usage_between(*prev, current);
        *prev = current;
        usage
    }

    fn frequency_mhz(&self) -> Option<f64> {
        let khz: f64 = fs::read_to_string(CPUFREQ_CUR).ok()?.trim().parse().ok()?;
        Some(khz / 1000.0)
    }

    fn temperature_c(&self) -> Option<f64> {
        let milli: f64 = fs::read_to_string(THERMAL_ZONE).ok()?.trim().parse().ok()?;
        let celsius = milli / 1000.0;
        if celsius > 0.0 {
            Some(celsius)
        } else {
            None
        }
    }
}

/// Governor control.
pub trait CpuTuner: Send + Sync {
    /// Write the governor to every core's scaling_governor file.
    fn set_governor(&self, governor: &str) -> Result<(), ActionError>;
}

/// CpuTuner writing the cpufreq sysfs tree. The root and core count are
/// injectable so tests can point it at a fixture tree.
pub struct SysCpuTuner {
    sysfs_root: PathBuf,
    core_count: usize,
}

impl SysCpuTuner {
    pub fn new() -> Self {
        Self {
            sysfs_root: PathBuf::from(CPU_SYSFS_ROOT),
            core_count: num_cpus::get(),
        }
    }

    pub fn with_root(sysfs_root: PathBuf, core_count: usize) -> Self {
        Self {
            sysfs_root,
            core_count,
        }
    }
}

impl Default for SysCpuTuner {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuTuner for SysCpuTuner {
    fn set_governor(&self, governor: &str) -> Result<(), ActionError> {
        let mut failed = 0usize;
        for core in 0..self.core_count {
            let path = self
                .sysfs_root
                .join(format!("cpu{core}/cpufreq/scaling_governor"));
            match fs::write(&path, governor) {
                Ok(()) => debug!("core {} governor set to {}", core, governor),
                Err(e) => {
                    warn!("Failed to set governor on core {}: {}", core, e);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            return Err(ActionError::Permission(format!(
                "failed to set governor on {failed}/{} cores - run with sudo, or confirm cpufreq support",
                self.core_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_proc_stat_line() {
        let times =
            parse_stat_line("cpu  1000 50 300 8000 200 10 20 5 0 0").unwrap();
        assert_eq!(times.user, 1000);
        assert_eq!(times.idle, 8000);
        assert_eq!(times.steal, 5);
        assert!(parse_stat_line("cpu0 1 2 3 4").is_none());
        assert!(parse_stat_line("intr 12 34").is_none());
    }

    #[test]
    fn usage_from_deltas() {
        let prev = parse_stat_line("cpu 100 0 100 800 0 0 0 0").unwrap();
        // +200 active, +200 idle => 50%
        let current = parse_stat_line("cpu 200 0 200 1000 0 0 0 0").unwrap();
        let usage = usage_between(prev, current);
        assert!((usage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn usage_with_no_delta_is_zero() {
        let sample = parse_stat_line("cpu 100 0 100 800 0 0 0 0").unwrap();
        assert_eq!(usage_between(sample, sample), 0.0);
    }

    #[test]
    fn governor_write_covers_all_cores() {
        let dir = tempdir().unwrap();
        for core in 0..2 {
            std::fs::create_dir_all(dir.path().join(format!("cpu{core}/cpufreq"))).unwrap();
        }
        let tuner = SysCpuTuner::with_root(dir.path().to_path_buf(), 2);
        tuner.set_governor("performance").unwrap();
        for core in 0..2 {
            let written = std::fs::read_to_string(
                dir.path().join(format!("cpu{core}/cpufreq/scaling_governor")),
            )
            .unwrap();
            assert_eq!(written, "performance");
        }
    }

    #[test]
    fn governor_write_failure_is_permission_error() {
        let dir = tempdir().unwrap();
        // cpufreq directories missing: every write fails.
        let tuner = SysCpuTuner::with_root(dir.path().to_path_buf(), 2);
        let err = tuner.set_governor("performance").unwrap_err();
        assert!(err.is_permission());
    }
}
