//! Dispatcher - turns a classified action tag into an effect.
//!
//! Every collaborator comes in as an injected trait object, so each arm of
//! `execute` is testable against stubs. The safety guard is consulted before
//! anything irreversible; a `Reject` there becomes a typed error here, never
//! a silent skip.

use std::io::Write as _;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::cpu::{CpuInfo, CpuTuner};
use crate::error::ActionError;
use crate::files::{self, FileIndex, FileOps};
use crate::guard::{self, Decision, FileOp};
use crate::memory::{CacheControl, MemInfo};
use crate::ollama::InferenceClient;
use crate::parser::{extract_response_field, ActionTag, Verb};
use crate::process::{ProcessTable, Signaler};
use crate::prompts::CONTENT_GENERATION_PROMPT;
use crate::router::Domain;

/// Threshold applied when a large-file request names no size.
const DEFAULT_LARGE_MB: f64 = 100.0;
/// Result cap for an explicit large-file query.
const FIND_LARGE_LIMIT: i64 = 50;
/// Result cap for the no-tag fallback listing.
const FALLBACK_LIMIT: i64 = 20;
/// How many entries a full rescan reports.
const SCAN_REPORT_TOP: usize = 5;

/// Interactive confirmations, abstracted so tests can script answers.
pub trait Operator: Send + Sync {
    /// Ask before a destructive action. Only an exact affirmative proceeds.
    fn confirm_destructive(&self, question: &str) -> bool;
    /// Offer an optional extra ("y"/"yes" accepted, anything else declines).
    fn offer(&self, question: &str) -> bool;
}

/// Operator backed by stdin, used by the interactive shell.
pub struct StdinOperator;

impl StdinOperator {
    fn ask(question: &str) -> String {
        print!("{question} ");
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        let _ = std::io::stdin().read_line(&mut answer);
        answer
    }
}

impl Operator for StdinOperator {
    fn confirm_destructive(&self, question: &str) -> bool {
        guard::is_affirmative(&Self::ask(question))
    }

    fn offer(&self, question: &str) -> bool {
        let answer = Self::ask(question);
        matches!(answer.trim(), "y" | "yes")
    }
}

/// Executes parsed actions through injected system ports.
pub struct Dispatcher {
    cpu_info: Arc<dyn CpuInfo>,
    cpu_tuner: Arc<dyn CpuTuner>,
    mem_info: Arc<dyn MemInfo>,
    cache: Arc<dyn CacheControl>,
    table: Arc<dyn ProcessTable>,
    signaler: Arc<dyn Signaler>,
    files: Arc<dyn FileOps>,
    llm: Arc<dyn InferenceClient>,
    index: Mutex<FileIndex>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cpu_info: Arc<dyn CpuInfo>,
        cpu_tuner: Arc<dyn CpuTuner>,
        mem_info: Arc<dyn MemInfo>,
        cache: Arc<dyn CacheControl>,
        table: Arc<dyn ProcessTable>,
        signaler: Arc<dyn Signaler>,
        files: Arc<dyn FileOps>,
        llm: Arc<dyn InferenceClient>,
        index: FileIndex,
    ) -> Self {
        Self {
            cpu_info,
            cpu_tuner,
            mem_info,
            cache,
            table,
            signaler,
            files,
            llm,
            index: Mutex::new(index),
        }
    }

    /// Run one classified action. `tag` may be absent only for the
    /// large-file domain, which has a sensible no-tag fallback; every other
    /// domain treats a missing tag as a failed classification.
    pub async fn execute(
        &self,
        domain: Domain,
        tag: Option<&ActionTag>,
        raw_input: &str,
        operator: &dyn Operator,
    ) -> Result<String, ActionError> {
        debug!(%domain, ?tag, "dispatching");
        match domain {
            Domain::Cpu => self.run_cpu(Self::required(tag)?),
            Domain::Memory => self.run_memory(Self::required(tag)?),
            Domain::Process => self.run_process(Self::required(tag)?),
            Domain::FileCreate => self.run_file_create(Self::required(tag)?, operator).await,
            Domain::FileControl => self.run_file_control(Self::required(tag)?, operator),
            Domain::FileSearch => self.run_file_search(tag, raw_input),
            // Monitor lives in the shell loop (it owns the sentinel), and
            // Unknown never reaches dispatch.
            Domain::Monitor | Domain::Unknown => Err(ActionError::Classification),
        }
    }

    fn required(tag: Option<&ActionTag>) -> Result<&ActionTag, ActionError> {
        tag.ok_or(ActionError::Classification)
    }

    fn run_cpu(&self, tag: &ActionTag) -> Result<String, ActionError> {
        match tag.verb {
            Verb::Check => {
                let mut out = format!("CPU usage: {:.1}%", self.cpu_info.usage_percent());
                match self.cpu_info.frequency_mhz() {
                    Some(mhz) => out.push_str(&format!("\nFrequency: {mhz:.0} MHz")),
                    None => out.push_str("\nFrequency: unavailable"),
                }
                match self.cpu_info.temperature_c() {
                    Some(temp) => out.push_str(&format!("\nTemperature: {temp:.1} C")),
                    None => out.push_str("\nTemperature: N/A"),
                }
                Ok(out)
            }
            Verb::Boost => {
                self.cpu_tuner.set_governor("performance")?;
                info!("governor set to performance");
                Ok("CPU governor set to performance on all cores.".to_string())
            }
            Verb::Restore => {
                self.cpu_tuner.set_governor("schedutil")?;
                info!("governor restored to schedutil");
                Ok("CPU governor restored to schedutil on all cores.".to_string())
            }
            _ => Err(ActionError::Classification),
        }
    }

    fn run_memory(&self, tag: &ActionTag) -> Result<String, ActionError> {
        match tag.verb {
            Verb::Check => {
                let status = self.mem_info.status()?;
                Ok(format!(
                    "Memory: {:.0} MB used / {:.0} MB total ({:.1}%)\n\
                     Available: {:.0} MB\n\
                     Swap: {:.0} MB used / {:.0} MB total",
                    status.used_mb,
                    status.total_mb,
                    status.usage_percent,
                    status.available_mb,
                    status.swap_used_mb,
                    status.swap_total_mb,
                ))
            }
            Verb::Clean => {
                self.cache.drop_caches()?;
                let after = self.mem_info.status()?;
                info!("caches dropped");
                Ok(format!(
                    "Caches dropped. Memory now {:.0} MB used / {:.0} MB total ({:.1}%).",
                    after.used_mb, after.total_mb, after.usage_percent,
                ))
            }
            _ => Err(ActionError::Classification),
        }
    }

    fn run_process(&self, tag: &ActionTag) -> Result<String, ActionError> {
        match tag.verb {
            Verb::List => Ok(render_top(&self.table.top_cpu(5))),
            Verb::Kill | Verb::Lock | Verb::Unlock => {
                let target = match guard::require_argument(tag.argument.as_deref()) {
                    Decision::Proceed => tag.argument.as_deref().unwrap_or_default(),
                    _ => return Err(ActionError::MissingArgument),
                };
                let pid = self.resolve_pid(target)?;
                if let Decision::Reject(_) = guard::gate_signal(pid) {
                    return Err(ActionError::Protected(pid));
                }
                let name = self
                    .table
                    .name_of(pid)
                    .unwrap_or_else(|| "unknown".to_string());
                match tag.verb {
                    Verb::Kill => {
                        self.signaler.kill(pid)?;
                        info!(pid, %name, "killed");
                        Ok(format!("Killed {name} (pid {pid})."))
                    }
                    Verb::Lock => {
                        self.signaler.freeze(pid)?;
                        info!(pid, %name, "frozen");
                        Ok(format!("Froze {name} (pid {pid}). Resume with unlock."))
                    }
                    _ => {
                        self.signaler.thaw(pid)?;
                        info!(pid, %name, "resumed");
                        Ok(format!("Resumed {name} (pid {pid})."))
                    }
                }
            }
            _ => Err(ActionError::Classification),
        }
    }

    /// A numeric argument is taken as a PID verbatim; anything else is
    /// resolved by process name.
    fn resolve_pid(&self, target: &str) -> Result<i32, ActionError> {
        if let Ok(pid) = target.parse::<i32>() {
            return Ok(pid);
        }
        self.table
            .find_pid(target)
            .ok_or_else(|| ActionError::NotFound(format!("process '{target}'")))
    }

    async fn run_file_create(
        &self,
        tag: &ActionTag,
        operator: &dyn Operator,
    ) -> Result<String, ActionError> {
        if tag.verb != Verb::Create {
            return Err(ActionError::Classification);
        }
        let name = match tag.argument.as_deref() {
            Some(n) if !n.trim().is_empty() => n.trim(),
            _ => return Err(ActionError::MissingArgument),
        };
        let (name, forced) = files::ensure_txt_extension(name);

        let content = if operator.offer(&format!("Generate starter content for {name}? [y/N]")) {
            let raw = self.llm.generate(CONTENT_GENERATION_PROMPT).await?;
            let text = extract_response_field(&raw);
            text.trim_matches('"').trim().to_string()
        } else {
            String::new()
        };

        self.files.create_txt(&name, &content)?;
        info!(%name, "file created");
        let mut message = format!("Created {name}.");
        if forced {
            message.push_str(" (only .txt files are supported, suffix added)");
        }
        Ok(message)
    }

    fn run_file_control(
        &self,
        tag: &ActionTag,
        operator: &dyn Operator,
    ) -> Result<String, ActionError> {
        let keyword = match tag.argument.as_deref() {
            Some(k) if !k.trim().is_empty() => k.trim(),
            _ => return Err(ActionError::MissingArgument),
        };
        let op = match tag.verb {
            Verb::Search => FileOp::Search,
            Verb::Open => FileOp::Open,
            Verb::Delete => FileOp::Delete,
            _ => return Err(ActionError::Classification),
        };

        let matches = self.files.search(keyword);
        match guard::gate_file_target(op, &matches) {
            Decision::Reject(_) => Err(ActionError::NotFound(format!("file '{keyword}'"))),
            Decision::NeedsDisambiguation(candidates) => Err(ActionError::Ambiguous(candidates)),
            Decision::NeedsConfirmation => {
                let path = &matches[0];
                if !operator.confirm_destructive(&format!(
                    "Delete {path}? This cannot be undone. Type 'yes' to confirm:"
                )) {
                    return Err(ActionError::Cancelled);
                }
                self.files.delete(path)?;
                info!(%path, "deleted");
                Ok(format!("Deleted {path}."))
            }
            Decision::Proceed => match op {
                FileOp::Search => {
                    let mut out = format!("{} match(es):", matches.len());
                    for path in &matches {
                        out.push_str(&format!("\n  {path}"));
                    }
                    Ok(out)
                }
                FileOp::Open => {
                    let path = &matches[0];
                    self.files.open(path)?;
                    Ok(format!("Opened {path}."))
                }
                // Delete with one match always goes through confirmation.
                FileOp::Delete => Err(ActionError::Cancelled),
            },
        }
    }

    fn run_file_search(
        &self,
        tag: Option<&ActionTag>,
        raw_input: &str,
    ) -> Result<String, ActionError> {
        // An explicit size in the request overrides whatever the model
        // classified: "bigger than 500M" is always a large-file query.
        let size_override = files::parse_size_mb(raw_input);

        let mut index = self
            .index
            .lock()
            .map_err(|_| ActionError::Io(std::io::Error::other("file index lock poisoned")))?;

        if let Some(threshold) = size_override {
            let entries = index.query(threshold, FIND_LARGE_LIMIT);
            return Ok(render_entries(
                &entries,
                &format!("Files larger than {threshold:.0} MB"),
            ));
        }

        match tag.map(|t| t.verb) {
            Some(Verb::FindLarge) => {
                let entries = index.query(DEFAULT_LARGE_MB, FIND_LARGE_LIMIT);
                Ok(render_entries(
                    &entries,
                    &format!("Files larger than {DEFAULT_LARGE_MB:.0} MB"),
                ))
            }
            Some(Verb::ScanDisk) => {
                let indexed = index.scan();
                let entries = index.large_files(DEFAULT_LARGE_MB, SCAN_REPORT_TOP as i64);
                let mut out = format!("Rescan complete: {indexed} files indexed under {}.",
                    index.root().display());
                if !entries.is_empty() {
                    out.push('\n');
                    out.push_str(&render_entries(&entries, "Largest"));
                }
                Ok(out)
            }
            // No usable tag: degrade to a bounded listing instead of a
            // classification error, the domain match alone is intent enough.
            _ => {
                let entries = index.query(DEFAULT_LARGE_MB, FALLBACK_LIMIT);
                Ok(render_entries(
                    &entries,
                    &format!("Files larger than {DEFAULT_LARGE_MB:.0} MB"),
                ))
            }
        }
    }
}

fn render_top(samples: &[crate::process::ProcessSample]) -> String {
    let mut out = String::from("PID\tCPU%\tMEM%\tNAME");
    for sample in samples {
        out.push_str(&format!(
            "\n{}\t{:.1}\t{:.1}\t{}",
            sample.pid, sample.cpu_percent, sample.mem_percent, sample.name
        ));
    }
    out
}

fn render_entries(entries: &[crate::files::FileEntry], heading: &str) -> String {
    if entries.is_empty() {
        return format!("{heading}: none found.");
    }
    let mut out = format!("{heading} ({}):", entries.len());
    for entry in entries {
        out.push_str(&format!("\n  {:>10}  {}", entry.human_size, entry.path));
    }
    out
}
