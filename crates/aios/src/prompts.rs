//! Per-domain classification prompt builders.
//!
//! Each domain gets its own closed-set prompt: a numbered list of the only
//! legal output tags, ending in a "reply with only the tag" constraint.
//! Shrinking the answer space per domain turns parsing into a fixed-tag
//! search instead of open-ended NLU. Domains never share a template.

use crate::router::Domain;

/// Build the classification prompt for one domain.
///
/// Returns an empty string for `Domain::Unknown`, which the router rejects
/// before any inference call anyway.
pub fn build_prompt(domain: Domain, input: &str) -> String {
    match domain {
        Domain::Cpu => build_cpu_prompt(input),
        Domain::Memory => build_memory_prompt(input),
        Domain::Monitor => build_monitor_prompt(input),
        Domain::Process => build_process_prompt(input),
        Domain::FileCreate => build_file_create_prompt(input),
        Domain::FileControl => build_file_control_prompt(input),
        Domain::FileSearch => build_file_search_prompt(input),
        Domain::Unknown => String::new(),
    }
}

// This prompt only knows CPU concepts, so the model cannot answer with a
// process-kill tag no matter what the operator typed.
fn build_cpu_prompt(input: &str) -> String {
    format!(
        "User command: [{input}].\n\
         Classify as one of:\n\
         1. [CHECK] (query CPU status, usage, frequency, temperature)\n\
         2. [BOOST] (high performance / gaming mode)\n\
         3. [RESTORE] (power saving / default mode)\n\
         Reply with only the tag."
    )
}

fn build_memory_prompt(input: &str) -> String {
    format!(
        "User command: [{input}].\n\
         Classify as one of:\n\
         1. [CHECK] (query memory status)\n\
         2. [CLEAN] (clean / free memory caches)\n\
         Reply with only the tag."
    )
}

fn build_monitor_prompt(input: &str) -> String {
    format!(
        "User command: [{input}].\n\
         This is a monitoring on/off task. Classify:\n\
         1. start monitoring / enable the sentinel -> [START_MONITOR]\n\
         2. stop monitoring / disable the sentinel -> [STOP_MONITOR]\n\
         3. query monitoring state -> [STATUS_MONITOR]\n\
         Reply with only the tag."
    )
}

// Small models trip over process-name translation, so the prompt spells out
// the common aliases.
fn build_process_prompt(input: &str) -> String {
    format!(
        "User command: [{input}].\n\
         If it is a query, reply [LIST].\n\
         If it kills a process, reply [KILL:process-name].\n\
         If it freezes/pauses a process, reply [LOCK:process-name].\n\
         If it resumes a frozen process, reply [UNLOCK:process-name].\n\
         Name translation rules:\n\
         - browser / firefox -> firefox\n\
         - google / chrome -> chrome\n\
         - vscode / code editor -> code\n\
         - terminal -> gnome-terminal\n\
         - text editor -> gedit\n\
         Reply with only the tag."
    )
}

fn build_file_create_prompt(input: &str) -> String {
    format!(
        "User command: [{input}].\n\
         This is a file creation task.\n\
         Extract the file path or file name the user wants to create.\n\
         Format: [CREATE:filename]\n\
         If the user gave no extension, append .txt\n\
         Reply with only the tag."
    )
}

fn build_file_control_prompt(input: &str) -> String {
    format!(
        "User command: [{input}].\n\
         This is a file operation task. Classify:\n\
         1. search / look for a file -> [SEARCH:filename]\n\
         2. open / run a file -> [OPEN:filename]\n\
         3. delete / remove a file -> [DELETE:filename]\n\
         Reply with only the tag."
    )
}

fn build_file_search_prompt(input: &str) -> String {
    format!(
        "User command: [{input}].\n\
         Classify:\n\
         1. [FIND_LARGE] (find big files, e.g. larger than 1G, clean up disk)\n\
         2. [SCAN_DISK] (force a rescan, rebuild the index)\n\
         Reply with only the tag."
    )
}

/// Prompt used to generate filler content for newly created files.
pub const CONTENT_GENERATION_PROMPT: &str =
    "Generate a short, professional-looking system log, about 3 lines, \
     with timestamps. No explanations.";
