//! Deterministic domain router.
//!
//! Pre-classifies raw operator input before any inference call. Routing is
//! pure keyword matching in a fixed priority order, so a misclassification
//! by the language model can never cross domains: a CPU-phrased request is
//! physically unable to reach the process-kill handler.

/// Closed set of administrative intent domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Cpu,
    Memory,
    Monitor,
    Process,
    FileCreate,
    FileControl,
    FileSearch,
    Unknown,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cpu => "CPU",
            Self::Memory => "Memory",
            Self::Monitor => "Monitor",
            Self::Process => "Process",
            Self::FileCreate => "FileCreator",
            Self::FileControl => "FileControl",
            Self::FileSearch => "DataRadar",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Hint printed when no domain matches. Short-circuits before inference.
pub const UNKNOWN_HINT: &str =
    "[Core] Unrecognized command domain (try CPU / memory / monitor / process / file commands)";

const CPU_TRIGGERS: &[&str] = &[
    "cpu",
    "frequency",
    "temperature",
    "governor",
    "performance",
    "powersave",
    "boost",
];

const MEMORY_TRIGGERS: &[&str] = &["memory", "mem", "ram", "cache", "swap"];

const MONITOR_TRIGGERS: &[&str] = &["monitor", "sentinel", "watch", "guard"];

const PROCESS_TRIGGERS: &[&str] = &[
    "kill",
    "terminate",
    "process",
    "task",
    "top",
    "freeze",
    "resume",
    "stop",
];

const FILE_CREATE_TRIGGERS: &[&str] = &["create", "touch", "new"];

const FILE_CONTROL_TRIGGERS: &[&str] = &["open", "delete", "remove", "search", "find", "locate"];

const FILE_SEARCH_TRIGGERS: &[&str] = &[
    "file", "disk", "large", "scan", "bigger", "greater", "space",
];

/// Priority-ordered trigger table. First matching domain wins; CPU terms are
/// checked before process terms because words like "kill"/"stop" also show
/// up in CPU and monitor phrasing.
const PRIORITY: &[(Domain, &[&str])] = &[
    (Domain::Cpu, CPU_TRIGGERS),
    (Domain::Memory, MEMORY_TRIGGERS),
    (Domain::Monitor, MONITOR_TRIGGERS),
    (Domain::Process, PROCESS_TRIGGERS),
    (Domain::FileCreate, FILE_CREATE_TRIGGERS),
    (Domain::FileControl, FILE_CONTROL_TRIGGERS),
    (Domain::FileSearch, FILE_SEARCH_TRIGGERS),
];

/// Classify raw input to exactly one domain. Total and deterministic;
/// case-insensitive substring matching, never calls the inference backend.
pub fn classify(input: &str) -> Domain {
    let text = input.to_lowercase();

    for (domain, triggers) in PRIORITY {
        if triggers.iter().any(|t| text.contains(t)) {
            return *domain;
        }
    }

    Domain::Unknown
}
