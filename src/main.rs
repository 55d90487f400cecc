mod cli;

use std::io::Read as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use loadtest_orchestrator::clock::{now_millis, probe_drift, NoopTimeSource, CLOCK_DRIFT_THRESHOLD_MILLIS};
use loadtest_orchestrator::dispatch::{DispatchRequest, PeerDispatcher};
use loadtest_orchestrator::runner::{EngineEvents, EngineReport, EngineRunner, LoadEngine};
use loadtest_orchestrator::{run, Completion, Context, Script};
use tokio::sync::oneshot;

use crate::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(cli.log_filter.clone()))
        .init();

    let script = load_script(cli.script.as_deref())?;

    let runtime = tokio::runtime::Runtime::new().context("failed to build the tokio runtime")?;
    runtime.block_on(run_orchestration(script, cli))
}

/// Loads a script from a file (YAML if the extension says so, JSON
/// otherwise) or from stdin as JSON if no path was given.
fn load_script(path: Option<&Path>) -> Result<Script> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read script from stdin")?;
            buf
        }
    };

    let is_yaml = path
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if is_yaml {
        serde_yaml::from_str(&raw).context("failed to parse script as YAML")
    } else {
        serde_json::from_str(&raw).context("failed to parse script as JSON")
    }
}

async fn run_orchestration(script: Script, cli: Cli) -> Result<()> {
    // Clock-drift probe (`spec.md` §5, §1(d)): informational only, logged
    // once at process start and never consulted again. No external time
    // source is wired up for this local dry-run binary, so it always
    // reports zero drift; a production deployment swaps in a real
    // `ExternalTimeSource` (NTP, a trusted HTTP endpoint).
    probe_drift(&NoopTimeSource, CLOCK_DRIFT_THRESHOLD_MILLIS).await;

    let context = Context {
        dispatcher: Arc::new(LocalDispatcher),
        runner: Arc::new(EngineRunner::new(LoggingEngine)),
        stage: cli.stage.clone(),
        completion_deadline: Some(Duration::from_secs(cli.completion_deadline_secs)),
        depth: 0,
    };

    let (tx, rx) = oneshot::channel();
    run(
        now_millis(),
        script,
        context,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    )
    .await;

    match rx.await {
        Ok(Ok(Completion { message })) => {
            println!("{message}");
            Ok(())
        }
        Ok(Err(message)) => bail!(message),
        Err(_) => bail!("orchestration callback dropped without reporting a result"),
    }
}

/// Dispatches by recursing in this process instead of crossing the
/// network. This binary has no peer fleet to submit sub-scripts to, so
/// "dispatch" here just means "keep orchestrating locally." A real
/// deployment wires up a
/// [`loadtest_orchestrator::dispatch::ServiceDispatcher`] over a `tower`
/// transport instead.
struct LocalDispatcher;

#[async_trait::async_trait]
impl PeerDispatcher for LocalDispatcher {
    async fn invoke_self(&self, delay: Duration, request: DispatchRequest) -> loadtest_orchestrator::Result<()> {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let context = Context {
            dispatcher: Arc::new(LocalDispatcher),
            runner: Arc::new(EngineRunner::new(LoggingEngine)),
            stage: request.stage,
            completion_deadline: None,
            // A peer dispatch is a fresh invocation (`spec.md` §6: "Peers
            // MUST treat the message as a fresh invocation and re-enter the
            // orchestrator at the top"), so the dispatch-tree depth resets
            // here rather than carrying over from the parent.
            depth: 0,
        };

        run(
            now_millis(),
            request.script,
            context,
            Box::new(|result| {
                if let Err(message) = result {
                    tracing::error!(message, "dispatched sub-script failed");
                }
            }),
        )
        .await;

        Ok(())
    }
}

/// A stand-in for the embedded load-generation engine (out of scope per
/// `spec.md` §1): logs phase boundaries and reports zero traffic.
struct LoggingEngine;

#[async_trait::async_trait]
impl LoadEngine for LoggingEngine {
    async fn run(&self, script: &Script, events: &dyn EngineEvents) -> anyhow::Result<EngineReport> {
        for (index, phase) in script.config.phases.iter().enumerate() {
            events.phase_start(index);
            tracing::info!(phase = index, description = %phase.describe(), "running phase");
            events.phase_end(index);
        }

        Ok(EngineReport {
            total_requests: 0,
            total_errors: 0,
        })
    }
}
