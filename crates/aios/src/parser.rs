//! Response parsing: envelope extraction and action-tag extraction.
//!
//! Two independent, bit-exact parsing problems:
//! 1. pull the `response` string field out of the single-line JSON-like
//!    envelope the inference backend returns, honoring escape state;
//! 2. find the bracketed `[VERB]` / `[VERB:ARGUMENT]` tag in the unescaped
//!    text, tolerating model chatter around it.
//!
//! Both are explicit state machines rather than nested string searches so
//! the escaping semantics stay testable in isolation.

use crate::router::Domain;

/// Field key that starts the envelope's response string.
const RESPONSE_KEY: &str = "\"response\":\"";

/// Extract the `response` field from a raw inference envelope.
///
/// Scans from the first occurrence of the field key, then walks characters
/// with an escape flag toggled by `\`: an escaped character is copied
/// literally, an unescaped `"` terminates the string. A malformed or absent
/// envelope yields an empty string, never an error - callers treat empty as
/// "no classification".
pub fn extract_response_field(raw: &str) -> String {
    let Some(start) = raw.find(RESPONSE_KEY) else {
        return String::new();
    };

    let mut result = String::new();
    let mut escape = false;
    for c in raw[start + RESPONSE_KEY.len()..].chars() {
        if escape {
            result.push(c);
            escape = false;
        } else if c == '\\' {
            escape = true;
        } else if c == '"' {
            break;
        } else {
            result.push(c);
        }
    }
    result
}

/// Request-side mirror of the envelope escaping: quotes and backslashes are
/// backslash-escaped, newlines collapse to spaces.
pub fn json_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Action verbs across all domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Check,
    Boost,
    Restore,
    Clean,
    StartMonitor,
    StopMonitor,
    StatusMonitor,
    List,
    Kill,
    Lock,
    Unlock,
    Create,
    Search,
    Open,
    Delete,
    FindLarge,
    ScanDisk,
}

/// Parsed intent: a verb plus an optional untrusted argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionTag {
    pub verb: Verb,
    /// Trimmed but otherwise unvalidated; the safety guard vets it.
    pub argument: Option<String>,
}

/// Closed verb set per domain, in match order. UNLOCK precedes LOCK so the
/// substring search cannot alias one onto the other.
pub fn verb_set(domain: Domain) -> &'static [(&'static str, Verb)] {
    match domain {
        Domain::Cpu => &[
            ("CHECK", Verb::Check),
            ("BOOST", Verb::Boost),
            ("RESTORE", Verb::Restore),
        ],
        Domain::Memory => &[("CHECK", Verb::Check), ("CLEAN", Verb::Clean)],
        Domain::Monitor => &[
            ("START_MONITOR", Verb::StartMonitor),
            ("STOP_MONITOR", Verb::StopMonitor),
            ("STATUS_MONITOR", Verb::StatusMonitor),
        ],
        Domain::Process => &[
            ("LIST", Verb::List),
            ("KILL", Verb::Kill),
            ("UNLOCK", Verb::Unlock),
            ("LOCK", Verb::Lock),
        ],
        Domain::FileCreate => &[("CREATE", Verb::Create)],
        Domain::FileControl => &[
            ("SEARCH", Verb::Search),
            ("OPEN", Verb::Open),
            ("DELETE", Verb::Delete),
        ],
        Domain::FileSearch => &[
            ("FIND_LARGE", Verb::FindLarge),
            ("SCAN_DISK", Verb::ScanDisk),
        ],
        Domain::Unknown => &[],
    }
}

/// Extract an action tag from unescaped inference output.
///
/// Verbs are matched by case-insensitive substring containment against the
/// domain's closed set, in declaration order - the first recognized verb
/// wins, extra chatter around the tag is tolerated. No recognized verb
/// means no tag.
pub fn extract_tag(domain: Domain, text: &str) -> Option<ActionTag> {
    let upper = text.to_uppercase();
    for (pattern, verb) in verb_set(domain) {
        if upper.contains(pattern) {
            return Some(ActionTag {
                verb: *verb,
                argument: extract_argument(text),
            });
        }
    }
    None
}

/// Argument = substring between the first `:` and the first `]`, trimmed,
/// when the colon precedes the closing bracket. Empty after trim is no
/// argument.
fn extract_argument(text: &str) -> Option<String> {
    let colon = text.find(':')?;
    let bracket = text.find(']')?;
    if colon >= bracket {
        return None;
    }
    let arg = text[colon + 1..bracket].trim();
    if arg.is_empty() {
        None
    } else {
        Some(arg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_plain() {
        let raw = r#"{"model":"m","response":"[CHECK]","done":true}"#;
        assert_eq!(extract_response_field(raw), "[CHECK]");
    }

    #[test]
    fn envelope_with_escaped_quotes_and_backslashes() {
        let raw = r#"{"response":"say \"hi\" and C:\\tmp","done":true}"#;
        assert_eq!(extract_response_field(raw), r#"say "hi" and C:\tmp"#);
    }

    #[test]
    fn envelope_roundtrip_through_escape() {
        // For text containing only quotes/backslashes as special chars,
        // escape-then-extract restores the original exactly.
        let original = r#"he said "\path\ is here""#;
        let enveloped = format!("{{\"response\":\"{}\"}}", json_escape(original));
        assert_eq!(extract_response_field(&enveloped), original);
    }

    #[test]
    fn envelope_missing_or_malformed_is_empty() {
        assert_eq!(extract_response_field(""), "");
        assert_eq!(extract_response_field("{\"error\":\"boom\"}"), "");
        assert_eq!(extract_response_field("not json at all"), "");
        // Unterminated string: copy what is there, still no panic.
        assert_eq!(extract_response_field("{\"response\":\"abc"), "abc");
    }

    #[test]
    fn json_escape_collapses_newlines() {
        assert_eq!(json_escape("a\nb"), "a b");
        assert_eq!(json_escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn tag_with_argument() {
        let tag = extract_tag(Domain::Process, "blah [KILL:firefox] blah").unwrap();
        assert_eq!(tag.verb, Verb::Kill);
        assert_eq!(tag.argument.as_deref(), Some("firefox"));
    }

    #[test]
    fn tag_argument_is_trimmed() {
        let tag = extract_tag(Domain::FileControl, "[DELETE:  draft.txt ]").unwrap();
        assert_eq!(tag.verb, Verb::Delete);
        assert_eq!(tag.argument.as_deref(), Some("draft.txt"));
    }

    #[test]
    fn tag_without_argument() {
        let tag = extract_tag(Domain::Cpu, "[CHECK]").unwrap();
        assert_eq!(tag.verb, Verb::Check);
        assert_eq!(tag.argument, None);
    }

    #[test]
    fn tag_tolerates_chatter_and_case() {
        let tag = extract_tag(Domain::Cpu, "Sure! The answer is [check].").unwrap();
        assert_eq!(tag.verb, Verb::Check);
    }

    #[test]
    fn no_recognized_verb_is_none() {
        assert_eq!(extract_tag(Domain::Cpu, "no brackets here"), None);
        assert_eq!(extract_tag(Domain::Cpu, "[FLY]"), None);
        assert_eq!(extract_tag(Domain::Unknown, "[CHECK]"), None);
    }

    #[test]
    fn first_recognized_verb_wins() {
        let tag = extract_tag(Domain::Memory, "[CHECK] or maybe [CLEAN]").unwrap();
        assert_eq!(tag.verb, Verb::Check);
    }

    #[test]
    fn unlock_does_not_alias_to_lock() {
        let tag = extract_tag(Domain::Process, "[UNLOCK:firefox]").unwrap();
        assert_eq!(tag.verb, Verb::Unlock);
    }

    #[test]
    fn colon_after_bracket_is_no_argument() {
        let tag = extract_tag(Domain::Process, "[LIST] and then: more").unwrap();
        assert_eq!(tag.verb, Verb::List);
        assert_eq!(tag.argument, None);
    }
}
