//! Memory adapter - /proc/meminfo status and the drop_caches control.

use crate::error::ActionError;
use std::collections::HashMap;
use std::fs;
use std::process::Command;
use tracing::warn;

const PROC_MEMINFO: &str = "/proc/meminfo";
const DROP_CACHES: &str = "/proc/sys/vm/drop_caches";

/// Point-in-time memory figures, all in MB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryStatus {
    pub total_mb: f64,
    pub used_mb: f64,
    pub available_mb: f64,
    pub usage_percent: f64,
    pub swap_total_mb: f64,
    pub swap_used_mb: f64,
}

/// Parse /proc/meminfo text. Values are in kB lines like
/// `MemTotal:        16303284 kB`. Older kernels without MemAvailable fall
/// back to Free + Buffers + Cached.
pub fn parse_meminfo(contents: &str) -> MemoryStatus {
    let mut values: HashMap<&str, f64> = HashMap::new();
    for line in contents.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        if let Ok(v) = value.parse::<f64>() {
            values.insert(key.trim_end_matches(':'), v);
        }
    }

    let get = |key: &str| values.get(key).copied().unwrap_or(0.0);

    let total = get("MemTotal");
    let mut available = get("MemAvailable");
    if available == 0.0 {
        available = get("MemFree") + get("Buffers") + get("Cached");
    }
    let swap_total = get("SwapTotal");
    let swap_free = get("SwapFree");

    let mut status = MemoryStatus {
        total_mb: total / 1024.0,
        available_mb: available / 1024.0,
        used_mb: (total - available) / 1024.0,
        usage_percent: 0.0,
        swap_total_mb: swap_total / 1024.0,
        swap_used_mb: (swap_total - swap_free) / 1024.0,
    };
    if status.total_mb > 0.0 {
        status.usage_percent = status.used_mb / status.total_mb * 100.0;
    }
    status
}

/// Read-only memory facts.
pub trait MemInfo: Send + Sync {
    fn status(&self) -> Result<MemoryStatus, ActionError>;
}

/// MemInfo backed by /proc/meminfo.
pub struct ProcMemInfo;

impl MemInfo for ProcMemInfo {
    fn status(&self) -> Result<MemoryStatus, ActionError> {
        let contents = fs::read_to_string(PROC_MEMINFO)?;
        Ok(parse_meminfo(&contents))
    }
}

/// Page-cache release control.
pub trait CacheControl: Send + Sync {
    fn drop_caches(&self) -> Result<(), ActionError>;
}

/// CacheControl writing /proc/sys/vm/drop_caches. Syncs dirty pages first
/// so nothing in flight is lost.
pub struct SysCacheControl;

impl CacheControl for SysCacheControl {
    fn drop_caches(&self) -> Result<(), ActionError> {
        if !nix::unistd::geteuid().is_root() {
            return Err(ActionError::Permission(
                "memory cleaning requires root (sudo)".to_string(),
            ));
        }

        match Command::new("sync").status() {
            Ok(status) if status.success() => {}
            Ok(_) | Err(_) => warn!("'sync' did not complete cleanly"),
        }

        // 3 = page cache + dentries/inodes, the widest release.
        fs::write(DROP_CACHES, "3").map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ActionError::Permission("cannot write drop_caches (sudo required)".to_string())
            } else {
                ActionError::Io(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MemTotal:       16384000 kB\n\
                          MemFree:         2048000 kB\n\
                          MemAvailable:    8192000 kB\n\
                          Buffers:          512000 kB\n\
                          Cached:          4096000 kB\n\
                          SwapTotal:       2097152 kB\n\
                          SwapFree:        1048576 kB\n";

    #[test]
    fn parses_standard_meminfo() {
        let status = parse_meminfo(SAMPLE);
        assert!((status.total_mb - 16000.0).abs() < 0.01);
        assert!((status.available_mb - 8000.0).abs() < 0.01);
        assert!((status.used_mb - 8000.0).abs() < 0.01);
        assert!((status.usage_percent - 50.0).abs() < 0.01);
        assert!((status.swap_total_mb - 2048.0).abs() < 0.01);
        assert!((status.swap_used_mb - 1024.0).abs() < 0.01);
    }

    #[test]
    fn falls_back_without_memavailable() {
        let old = "MemTotal: 1024000 kB\nMemFree: 256000 kB\nBuffers: 128000 kB\nCached: 128000 kB\n";
        let status = parse_meminfo(old);
        assert!((status.available_mb - 500.0).abs() < 0.01);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let status = parse_meminfo("");
        assert_eq!(status, MemoryStatus::default());
    }
}
