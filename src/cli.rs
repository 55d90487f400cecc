//! Command-line argument parsing, in the style of the teacher's `cli`
//! crate (`cli/src/parser.rs`): a single [`Parser`]-derived struct, since
//! this binary has exactly one job.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "orchestrator",
    version,
    about = "Recursive splitter/scheduler for distributed load-test orchestration"
)]
pub struct Cli {
    /// Path to a script file (JSON or YAML, detected by extension). Reads
    /// from stdin as JSON if omitted.
    #[arg(short, long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Deployment-generation qualifier attached to sub-scripts dispatched
    /// to peers.
    #[arg(long, default_value = "local")]
    pub stage: String,

    /// Filter passed to `tracing_subscriber`'s `EnvFilter` (e.g. `debug`,
    /// `loadtest_orchestrator=trace`).
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Wall-clock deadline, in seconds, after which a completion counter
    /// that never drains is forcibly failed rather than hanging forever.
    #[arg(long, default_value_t = 300)]
    pub completion_deadline_secs: u64,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
