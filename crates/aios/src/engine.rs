//! Interactive shell: prompt loop, classification, sentinel wiring.
//!
//! The engine owns the sentinel because monitor commands mutate it; every
//! other domain goes through the dispatcher. Sentinel reports arrive over a
//! channel and are printed by a separate task that redraws the prompt, so
//! alerts can land mid-typing without corrupting the line.

use std::io::Write as _;
use std::sync::Arc;

use owo_colors::OwoColorize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::AiosConfig;
use crate::cpu::{SysCpuMonitor, SysCpuTuner};
use crate::dispatcher::{Dispatcher, StdinOperator};
use crate::error::ActionError;
use crate::files::{DiskFiles, FileIndex};
use crate::memory::{ProcMemInfo, SysCacheControl};
use crate::ollama::{InferenceClient, OllamaClient};
use crate::parser::{extract_response_field, extract_tag, Verb};
use crate::process::{NixSignaler, SysProcessTable};
use crate::prompts::build_prompt;
use crate::router::{classify, Domain, UNKNOWN_HINT};
use crate::sentinel::{Sentinel, SentinelReport};

pub const PROMPT: &str = "Admin@AIOS:~$ ";

/// Bare words that mean "show me the processes" and need no inference.
const PROCESS_FAST_PATH: &[&str] = &["top", "ps", "processes"];

pub struct Engine {
    dispatcher: Dispatcher,
    llm: Arc<dyn InferenceClient>,
    sentinel: Sentinel,
}

impl Engine {
    /// Wire the real adapters. The process table is shared between the
    /// dispatcher and the sentinel so both see one refresh cadence.
    pub fn new(config: &AiosConfig) -> Self {
        let table = Arc::new(SysProcessTable::new());
        let llm: Arc<dyn InferenceClient> = Arc::new(OllamaClient::new(
            config.inference.url.clone(),
            config.inference.model.clone(),
        ));
        let root = config.files.resolved_root();

        let (report_tx, report_rx) = mpsc::unbounded_channel();
        spawn_report_printer(report_rx);

        let dispatcher = Dispatcher::new(
            Arc::new(SysCpuMonitor::new()),
            Arc::new(SysCpuTuner::new()),
            Arc::new(ProcMemInfo),
            Arc::new(SysCacheControl),
            table.clone(),
            Arc::new(NixSignaler),
            Arc::new(DiskFiles::new(root.clone())),
            llm.clone(),
            FileIndex::new(root, config.files.index_floor_mb),
        );
        let sentinel = Sentinel::new(table, &config.sentinel, report_tx);

        Self {
            dispatcher,
            llm,
            sentinel,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("AIOS admin shell. Modules: CPU, memory, monitor, process, files.");
        println!("Type 'exit' to quit.");
        let operator = StdinOperator;

        loop {
            print!("{PROMPT}");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                // EOF
                self.sentinel.stop().await;
                break;
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if input == "exit" {
                self.sentinel.stop().await;
                break;
            }

            // Bare process-listing words skip both routing and inference.
            if PROCESS_FAST_PATH.contains(&input.to_lowercase().as_str()) {
                self.list_processes(input, &operator).await;
                continue;
            }

            match classify(input) {
                Domain::Unknown => println!("{UNKNOWN_HINT}"),
                Domain::Monitor => self.handle_monitor(input).await,
                domain => self.handle_action(domain, input, &operator).await,
            }
        }
        Ok(())
    }

    /// Monitor verbs mutate the sentinel, so they are resolved here rather
    /// than in the dispatcher.
    async fn handle_monitor(&mut self, input: &str) {
        let verb = match self.classify_verb(Domain::Monitor, input).await {
            Ok(Some(tag)) => tag,
            Ok(None) => {
                println!("{}", "Could not tell which monitor action you meant.".yellow());
                return;
            }
            Err(e) => {
                print_error(&e);
                return;
            }
        };
        match verb {
            Verb::StartMonitor => {
                if self.sentinel.is_running() {
                    println!("Sentinel is already running.");
                } else {
                    self.sentinel.start();
                    println!("{}", "Sentinel started.".green());
                }
            }
            Verb::StopMonitor => {
                if self.sentinel.is_running() {
                    self.sentinel.stop().await;
                    println!("Sentinel stopped.");
                } else {
                    println!("Sentinel is not running.");
                }
            }
            Verb::StatusMonitor => {
                if self.sentinel.is_running() {
                    println!("Sentinel is running.");
                } else {
                    println!("Sentinel is stopped.");
                }
            }
            _ => println!("{}", "Could not tell which monitor action you meant.".yellow()),
        }
    }

    async fn list_processes(&self, input: &str, operator: &StdinOperator) {
        let tag = crate::parser::ActionTag {
            verb: Verb::List,
            argument: None,
        };
        match self
            .dispatcher
            .execute(Domain::Process, Some(&tag), input, operator)
            .await
        {
            Ok(out) => println!("{out}"),
            Err(e) => print_error(&e),
        }
    }

    async fn handle_action(&self, domain: Domain, input: &str, operator: &StdinOperator) {
        let tag = match self.classify_tag(domain, input).await {
            Ok(tag) => tag,
            Err(e) => {
                print_error(&e);
                return;
            }
        };

        if tag.is_none() && domain != Domain::FileSearch {
            println!("{}", "Could not classify that request.".yellow());
            return;
        }

        match self
            .dispatcher
            .execute(domain, tag.as_ref(), input, operator)
            .await
        {
            Ok(out) => println!("{out}"),
            Err(e) => print_error(&e),
        }
    }

    async fn classify_tag(
        &self,
        domain: Domain,
        input: &str,
    ) -> Result<Option<crate::parser::ActionTag>, ActionError> {
        let prompt = build_prompt(domain, input);
        let raw = self.llm.generate(&prompt).await?;
        let text = extract_response_field(&raw);
        if text.is_empty() {
            warn!("empty response envelope");
        }
        Ok(extract_tag(domain, &text))
    }

    async fn classify_verb(&self, domain: Domain, input: &str) -> Result<Option<Verb>, ActionError> {
        Ok(self.classify_tag(domain, input).await?.map(|t| t.verb))
    }
}

/// Print sentinel reports as they arrive, clearing and redrawing the prompt
/// line so a report landing mid-typing stays readable.
fn spawn_report_printer(mut reports: mpsc::UnboundedReceiver<SentinelReport>) {
    tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            let line = match report {
                SentinelReport::NewProcess { pid, name } => {
                    format!("{} {name} (pid {pid})", "[sentinel] new process:".green())
                }
                SentinelReport::HighCpu {
                    pid,
                    name,
                    cpu_percent,
                } => format!(
                    "{} {name} (pid {pid}) at {cpu_percent:.1}%",
                    "[sentinel] high CPU:".red()
                ),
            };
            print!("\r\x1b[K{line}\n{PROMPT}");
            let _ = std::io::stdout().flush();
        }
    });
}

fn print_error(error: &ActionError) {
    let mut message = error.to_string();
    if error.is_permission() {
        message.push_str(" (try running with sudo)");
    }
    if matches!(error, ActionError::Inference(_)) {
        message.push_str(" (is the inference service running?)");
    }
    if let ActionError::Ambiguous(candidates) = error {
        message.push_str(", be more specific:");
        for candidate in candidates {
            message.push_str(&format!("\n  {candidate}"));
        }
    }
    eprintln!("{}", message.red());
}
