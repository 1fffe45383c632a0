//! Process adapters - the process table (pids, names, CPU shares) and the
//! signaler that delivers kill/freeze/resume signals.

use crate::error::ActionError;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::sync::Mutex;
use sysinfo::System;

/// One sampled process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: i32,
    pub name: String,
    pub cpu_percent: f32,
    pub mem_percent: f32,
}

/// Narrow query interface over the live process table.
pub trait ProcessTable: Send + Sync {
    /// All current PIDs.
    fn list_pids(&self) -> Vec<i32>;
    /// Name lookup for one PID; None when it exited in between.
    fn name_of(&self, pid: i32) -> Option<String>;
    /// Top CPU consumers, descending.
    fn top_cpu(&self, limit: usize) -> Vec<ProcessSample>;
    /// Resolve a name (exact first, then substring) to the smallest
    /// matching PID.
    fn find_pid(&self, name: &str) -> Option<i32>;
}

/// ProcessTable over sysinfo. The System handle persists so successive
/// refreshes yield meaningful per-process CPU deltas.
pub struct SysProcessTable {
    system: Mutex<System>,
}

impl SysProcessTable {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
        }
    }
}

impl Default for SysProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SysProcessTable {
    fn list_pids(&self) -> Vec<i32> {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes();
        let mut pids: Vec<i32> = system
            .processes()
            .keys()
            .map(|pid| pid.as_u32() as i32)
            .collect();
        pids.sort_unstable();
        pids
    }

    fn name_of(&self, pid: i32) -> Option<String> {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes();
        system
            .process(sysinfo::Pid::from_u32(pid as u32))
            .map(|p| p.name().to_string())
    }

    fn top_cpu(&self, limit: usize) -> Vec<ProcessSample> {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes();
        let total_memory = system.total_memory().max(1);
        let mut samples: Vec<ProcessSample> = system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessSample {
                pid: pid.as_u32() as i32,
                name: process.name().to_string(),
                cpu_percent: process.cpu_usage(),
                mem_percent: process.memory() as f32 / total_memory as f32 * 100.0,
            })
            .collect();
        samples.sort_by(|a, b| {
            b.cpu_percent
                .partial_cmp(&a.cpu_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        samples.truncate(limit);
        samples
    }

    fn find_pid(&self, name: &str) -> Option<i32> {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes();
        let needle = name.to_lowercase();

        let mut exact: Option<i32> = None;
        let mut fuzzy: Option<i32> = None;
        for (pid, process) in system.processes() {
            let pid = pid.as_u32() as i32;
            let candidate = process.name().to_lowercase();
            if candidate == needle {
                exact = Some(exact.map_or(pid, |e: i32| e.min(pid)));
            } else if candidate.contains(&needle) {
                fuzzy = Some(fuzzy.map_or(pid, |f: i32| f.min(pid)));
            }
        }
        exact.or(fuzzy)
    }
}

/// Signal delivery.
pub trait Signaler: Send + Sync {
    /// SIGKILL - forced termination.
    fn kill(&self, pid: i32) -> Result<(), ActionError>;
    /// SIGSTOP - freeze in place.
    fn freeze(&self, pid: i32) -> Result<(), ActionError>;
    /// SIGCONT - resume a frozen process.
    fn thaw(&self, pid: i32) -> Result<(), ActionError>;
}

/// Signaler over nix::sys::signal.
pub struct NixSignaler;

impl NixSignaler {
    fn send(&self, pid: i32, signal: Signal) -> Result<(), ActionError> {
        kill(Pid::from_raw(pid), signal).map_err(|errno| match errno {
            Errno::EPERM => {
                ActionError::Permission(format!("not allowed to signal pid {pid}"))
            }
            Errno::ESRCH => ActionError::NotFound(format!("no such process (pid {pid})")),
            other => ActionError::Io(std::io::Error::from_raw_os_error(other as i32)),
        })
    }
}

impl Signaler for NixSignaler {
    fn kill(&self, pid: i32) -> Result<(), ActionError> {
        self.send(pid, Signal::SIGKILL)
    }

    fn freeze(&self, pid: i32) -> Result<(), ActionError> {
        self.send(pid, Signal::SIGSTOP)
    }

    fn thaw(&self, pid: i32) -> Result<(), ActionError> {
        self.send(pid, Signal::SIGCONT)
    }
}
