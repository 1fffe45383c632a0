//! Safety guard - the sole gate between parsed intent and any irreversible
//! effect. The dispatcher must not signal, delete, or drop caches without a
//! `Decision::Proceed` (or an explicit confirmation) from here.

/// PIDs at or below this floor belong to the system and are never signaled.
pub const PROTECTED_PID_FLOOR: i32 = 1000;

/// The only token accepted as an affirmative for destructive actions.
pub const AFFIRMATIVE: &str = "yes";

/// Outcome of validating an action against the hard invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Proceed,
    Reject(String),
    /// Destructive action with a single unambiguous target; proceeds only
    /// on an exact affirmative from the operator.
    NeedsConfirmation,
    /// More than one candidate matched; the operation is aborted and the
    /// candidates listed so the operator can re-specify.
    NeedsDisambiguation(Vec<String>),
}

/// File operations that resolve a name to candidate paths first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Search,
    Open,
    Delete,
}

/// Gate a signal-class action (kill / lock / unlock) on a resolved PID.
pub fn gate_signal(pid: i32) -> Decision {
    if pid <= PROTECTED_PID_FLOOR {
        Decision::Reject(format!("protected system process (pid {pid})"))
    } else {
        Decision::Proceed
    }
}

/// Gate a file operation on its resolved candidate list.
pub fn gate_file_target(op: FileOp, matches: &[String]) -> Decision {
    if matches.is_empty() {
        return Decision::Reject("not found".to_string());
    }
    match op {
        // Listing many hits is the whole point of a search.
        FileOp::Search => Decision::Proceed,
        FileOp::Open => {
            if matches.len() > 1 {
                Decision::NeedsDisambiguation(matches.to_vec())
            } else {
                Decision::Proceed
            }
        }
        FileOp::Delete => {
            if matches.len() > 1 {
                Decision::NeedsDisambiguation(matches.to_vec())
            } else {
                Decision::NeedsConfirmation
            }
        }
    }
}

/// Required-argument check for verbs that target something by name.
pub fn require_argument(argument: Option<&str>) -> Decision {
    match argument {
        Some(arg) if !arg.trim().is_empty() => Decision::Proceed,
        _ => Decision::Reject("argument not recognized".to_string()),
    }
}

/// True only for the exact affirmative token. "YES", "y", or anything else
/// cancels - no partial deletion.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim() == AFFIRMATIVE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_pids_are_protected() {
        assert!(matches!(gate_signal(1), Decision::Reject(_)));
        assert!(matches!(gate_signal(42), Decision::Reject(_)));
        assert!(matches!(gate_signal(999), Decision::Reject(_)));
    }

    #[test]
    fn pid_floor_boundary() {
        assert!(matches!(gate_signal(1000), Decision::Reject(_)));
        assert_eq!(gate_signal(1001), Decision::Proceed);
        assert_eq!(gate_signal(1500), Decision::Proceed);
    }

    #[test]
    fn zero_matches_reject() {
        for op in [FileOp::Search, FileOp::Open, FileOp::Delete] {
            assert_eq!(
                gate_file_target(op, &[]),
                Decision::Reject("not found".to_string())
            );
        }
    }

    #[test]
    fn multiple_matches_disambiguate_for_open_and_delete() {
        let matches = vec!["/a/x.txt".to_string(), "/b/x.txt".to_string()];
        assert_eq!(
            gate_file_target(FileOp::Open, &matches),
            Decision::NeedsDisambiguation(matches.clone())
        );
        assert_eq!(
            gate_file_target(FileOp::Delete, &matches),
            Decision::NeedsDisambiguation(matches.clone())
        );
        // Search just lists everything it found.
        assert_eq!(gate_file_target(FileOp::Search, &matches), Decision::Proceed);
    }

    #[test]
    fn single_match_delete_needs_confirmation() {
        let one = vec!["/a/x.txt".to_string()];
        assert_eq!(
            gate_file_target(FileOp::Delete, &one),
            Decision::NeedsConfirmation
        );
        assert_eq!(gate_file_target(FileOp::Open, &one), Decision::Proceed);
    }

    #[test]
    fn missing_argument_rejected() {
        assert!(matches!(require_argument(None), Decision::Reject(_)));
        assert!(matches!(require_argument(Some("   ")), Decision::Reject(_)));
        assert_eq!(require_argument(Some("firefox")), Decision::Proceed);
    }

    #[test]
    fn only_literal_yes_confirms() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("  yes \n"));
        assert!(!is_affirmative("y"));
        assert!(!is_affirmative("YES"));
        assert!(!is_affirmative("yes please"));
        assert!(!is_affirmative(""));
    }
}
