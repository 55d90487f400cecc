//! The recursive run loop (`spec.md` §4.5): decides whether a script needs
//! length-splitting, width-splitting, or direct execution; schedules
//! dispatches; tracks completion across asynchronous branches.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::now_millis;
use crate::dispatch::{DispatchRequest, PeerDispatcher};
use crate::error::Error;
use crate::runner::LoadRunner;
use crate::script::{Script, SplitSettings};
use crate::script_split::{split_script_by_length, split_script_by_width};
use crate::validate::validate;

/// Successful completion, as reported to the top-level callback
/// (`spec.md` §6).
#[derive(Clone, Debug)]
pub struct Completion {
    pub message: String,
}

/// The completion callback a hosting runtime supplies. Called exactly once
/// per `run` invocation, either with a success message or a single
/// human-readable error string (`spec.md` §6, §7).
pub type Callback = Box<dyn FnOnce(Result<Completion, String>) + Send>;

/// Everything `run` needs beyond the script itself: the peer-dispatch
/// transport, the embedded load-generation engine, the deployment-
/// generation qualifier, and an optional defensive deadline for a
/// completion counter that fails to drain (Design Notes, `spec.md` §9).
#[derive(Clone)]
pub struct Context {
    pub dispatcher: Arc<dyn PeerDispatcher>,
    pub runner: Arc<dyn LoadRunner>,
    pub stage: String,
    pub completion_deadline: Option<Duration>,
    /// Recursion depth of the length-split branch, for the dispatch-tree
    /// trace in [`dispatch_chunk`]. Width-split siblings share their
    /// parent's depth since they are concurrent, not nested. Starts at `0`
    /// for the top-level invocation.
    pub depth: usize,
}

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Tracks the `toComplete` counter (`spec.md` §4.5 step 3) with an atomic
/// decrement and a take-once callback, which is the race-free treatment
/// the Design Notes ask for: two branches racing to decrement past zero
/// can't both fire the callback, because only the decrement that observes
/// the counter reaching zero wins the `Mutex::take`.
struct Completer {
    remaining: AtomicI64,
    callback: Mutex<Option<Callback>>,
    genesis: i64,
}

impl Completer {
    fn new(count: i64, genesis: i64, callback: Callback) -> Arc<Self> {
        let completer = Arc::new(Self {
            remaining: AtomicI64::new(count.max(1)),
            callback: Mutex::new(Some(callback)),
            genesis,
        });

        completer
    }

    fn spawn_deadline_watchdog(self: &Arc<Self>, deadline: Duration) {
        let completer = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            let message = Error::Deadline(format!(
                "completion counter for genesis {} failed to drain within {:?}",
                completer.genesis, deadline
            ))
            .to_string();
            completer.fail(message);
        });
    }

    fn complete(&self) {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            if let Some(callback) = self.callback.lock().unwrap().take() {
                let message = format!("run completed (genesis={})", self.genesis);
                callback(Ok(Completion { message }));
            }
        }
    }

    fn fail(&self, err: String) {
        if let Some(callback) = self.callback.lock().unwrap().take() {
            callback(Err(err));
        }
    }
}

/// Schedules `script` for peer dispatch after the appropriate delay,
/// reporting submission success/failure to `completer`. This is
/// `invokeSelf` (`spec.md` §4.6) wired up to the completion counter.
///
/// Also emits the dispatch-tree trace the CLI's dry-run harness relies on
/// (`SPEC_FULL.md` §1.1): one `tracing::info!` per dispatched chunk naming
/// its genesis, depth, `_start`, and shape, so a script's full
/// length/width decomposition can be read back out of the log stream.
fn dispatch_chunk(script: Script, settings: &SplitSettings, context: &Context, completer: &Arc<Completer>) {
    let start = script
        .start
        .expect("dispatch_chunk called on a script with no _start assigned");
    let delay_millis = start - now_millis() - settings.time_buffer_in_milliseconds;
    let delay = Duration::from_millis(delay_millis.max(0) as u64);

    tracing::info!(
        depth = context.depth,
        genesis = ?script.genesis,
        start,
        duration = script.total_duration(),
        width = script.max_width(),
        delay_millis,
        stage = %context.stage,
        "dispatching chunk"
    );

    let dispatcher = Arc::clone(&context.dispatcher);
    let stage = context.stage.clone();
    let completer = Arc::clone(completer);

    tokio::spawn(async move {
        let request = DispatchRequest { script, stage };
        match dispatcher.invoke_self(delay, request).await {
            Ok(()) => completer.complete(),
            Err(err) => completer.fail(err.to_string()),
        }
    });
}

/// `run(timeNow, script, context, callback)` (`spec.md` §4.5).
///
/// Boxed because the function recurses into itself on the length branch
/// (an oversized chunk that still exceeds the width ceiling); boxing turns
/// each recursion level into a heap-allocated future instead of an
/// infinitely-sized stack frame, which is the idiomatic Rust answer to the
/// Design Notes' "convert recursion to a work queue" guidance for
/// languages with bounded stacks.
pub fn run(time_now_hint: i64, script: Script, context: Context, callback: Callback) -> BoxFuture {
    Box::pin(async move {
        let settings = match validate(&script) {
            Ok(settings) => settings,
            Err(err) => {
                callback(Err(err.to_string()));
                return;
            }
        };

        // Step 2: resample the clock rather than trust the caller's hint.
        let time_now = now_millis();
        if script.trace {
            tracing::info!(time_now_hint, time_now, "orchestrator invocation received");
        }

        let mut script = script;
        if script.genesis.is_none() {
            script.genesis = Some(time_now);
        }
        let genesis = script.genesis.unwrap();

        let duration = script.total_duration();
        let width = script.max_width();

        if duration > settings.max_chunk_duration_in_seconds as f64 {
            run_length_branch(time_now, script, settings, context, callback).await;
        } else if width > settings.max_chunk_requests_per_second as f64 {
            run_width_branch(time_now, script, settings, context, callback, genesis).await;
        } else {
            run_leaf(time_now, script, context, callback).await;
        }
    })
}

/// Branch A (`spec.md` §4.5 step 5): length exceeds the chunk limit.
async fn run_length_branch(
    time_now: i64,
    script: Script,
    settings: SplitSettings,
    context: Context,
    callback: Callback,
) {
    let genesis = script.genesis.unwrap_or(time_now);
    let completer = Completer::new(2, genesis, callback);
    if let Some(deadline) = context.completion_deadline {
        completer.spawn_deadline_watchdog(deadline);
    }

    let k = settings.max_chunk_duration_in_seconds as f64;
    let (mut chunk, mut remainder) = match split_script_by_length(&script, k) {
        Ok(pair) => pair,
        Err(err) => {
            completer.fail(err.to_string());
            return;
        }
    };

    if chunk.start.is_none() {
        chunk.start = Some(time_now + settings.time_buffer_in_milliseconds);
    }
    let chunk_start = chunk.start.unwrap();
    remainder.start = Some(chunk_start + settings.max_chunk_duration_in_seconds * 1000);

    let chunk_width = chunk.max_width();
    if chunk_width > settings.max_chunk_requests_per_second as f64 {
        let completer_for_chunk = Arc::clone(&completer);
        let mut context_for_chunk = context.clone();
        context_for_chunk.depth += 1;
        tokio::spawn(run(
            time_now,
            chunk,
            context_for_chunk,
            Box::new(move |result| match result {
                Ok(_) => completer_for_chunk.complete(),
                Err(err) => completer_for_chunk.fail(err),
            }),
        ));
    } else {
        dispatch_chunk(chunk, &settings, &context, &completer);
    }

    dispatch_chunk(remainder, &settings, &context, &completer);
}

/// Branch B (`spec.md` §4.5 step 6): width exceeds the chunk limit.
async fn run_width_branch(
    time_now: i64,
    mut script: Script,
    settings: SplitSettings,
    context: Context,
    callback: Callback,
    genesis: i64,
) {
    if script.start.is_none() {
        script.start = Some(time_now + settings.time_buffer_in_milliseconds);
    }

    let ceiling = settings.max_chunk_requests_per_second as f64;
    let initial_width = script.max_width();
    let to_complete = (initial_width / ceiling).ceil() as i64;
    let completer = Completer::new(to_complete, genesis, callback);
    if let Some(deadline) = context.completion_deadline {
        completer.spawn_deadline_watchdog(deadline);
    }

    loop {
        if script.max_width() <= 0.0 {
            break;
        }

        let (chunk, remainder) = match split_script_by_width(&script, ceiling) {
            Ok(pair) => pair,
            Err(err) => {
                completer.fail(err.to_string());
                return;
            }
        };

        dispatch_chunk(chunk, &settings, &context, &completer);
        script = remainder;
    }
}

/// Branch C (`spec.md` §4.5 step 7): the script is small enough to run
/// directly via the embedded load-generation engine.
async fn run_leaf(time_now: i64, mut script: Script, context: Context, callback: Callback) {
    if script.start.is_none() {
        script.start = Some(time_now);
    }
    let start = script.start.unwrap();

    tracing::info!(
        depth = context.depth,
        genesis = ?script.genesis,
        start,
        duration = script.total_duration(),
        width = script.max_width(),
        "running leaf"
    );

    let delay_millis = start - now_millis();
    if delay_millis > 0 {
        tokio::time::sleep(Duration::from_millis(delay_millis as u64)).await;
    }

    match context.runner.run_load(start, script).await {
        Ok(report) => {
            let message = format!(
                "leaf run completed (genesis={:?}, started_at={}, completed_at={}, \
                 total_requests={}, total_errors={})",
                report.genesis, report.started_at, report.completed_at, report.total_requests, report.total_errors
            );
            callback(Ok(Completion { message }));
        }
        Err(err) => callback(Err(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use serde_json::Map;

    use super::*;
    use crate::dispatch::fake::RecordingDispatcher;
    use crate::runner::fake::FixedEngine;
    use crate::runner::{EngineReport, EngineRunner};
    use crate::script::{Phase, ScriptConfig};

    fn script_with(phases: Vec<Phase>) -> Script {
        Script {
            config: ScriptConfig {
                phases,
                extra: Map::new(),
            },
            split: None,
            genesis: None,
            start: None,
            trace: false,
            extra: Map::new(),
        }
    }

    fn constant(arrival_rate: f64, duration: f64) -> Phase {
        Phase::Constant {
            arrival_rate,
            duration,
            extra: Map::new(),
        }
    }

    fn test_context(dispatcher: Arc<RecordingDispatcher>) -> Context {
        Context {
            dispatcher,
            runner: Arc::new(EngineRunner::new(FixedEngine {
                report: EngineReport {
                    total_requests: 10,
                    total_errors: 0,
                },
            })),
            stage: "test".into(),
            completion_deadline: Some(Duration::from_secs(5)),
            depth: 0,
        }
    }

    #[tokio::test]
    async fn leaf_script_runs_directly_without_dispatch() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let context = test_context(Arc::clone(&dispatcher));
        let script = script_with(vec![constant(10.0, 5.0)]);

        let (tx, rx) = mpsc::channel();
        run(
            0,
            script,
            context,
            Box::new(move |result| {
                tx.send(result).unwrap();
            }),
        )
        .await;

        let result = rx.recv().unwrap();
        assert!(result.is_ok());
        assert!(dispatcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_duration_dispatches_two_chunks() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let context = test_context(Arc::clone(&dispatcher));
        let script = script_with(vec![constant(10.0, 600.0)]);

        let (tx, rx) = mpsc::channel();
        run(
            0,
            script,
            context,
            Box::new(move |result| {
                tx.send(result).unwrap();
            }),
        )
        .await;

        // Give the spawned dispatch tasks a chance to run.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let calls = dispatcher.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let starts: Vec<i64> = calls
            .iter()
            .map(|(_, req)| req.script.start.unwrap())
            .collect();
        assert!(starts[1] > starts[0]);
        assert_eq!(starts[1] - starts[0], 240 * 1000);

        let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn oversized_width_dispatches_four_chunks() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let context = test_context(Arc::clone(&dispatcher));
        let script = script_with(vec![constant(100.0, 60.0)]);

        let (tx, rx) = mpsc::channel();
        run(
            0,
            script,
            context,
            Box::new(move |result| {
                tx.send(result).unwrap();
            }),
        )
        .await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        let calls = dispatcher.calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        for (_, req) in calls.iter() {
            assert!(req.script.max_width() <= 25.0);
        }

        let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn invalid_script_is_rejected_without_dispatch() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let context = test_context(Arc::clone(&dispatcher));
        let script = script_with(vec![]);

        let (tx, rx) = mpsc::channel();
        run(
            0,
            script,
            context,
            Box::new(move |result| {
                tx.send(result).unwrap();
            }),
        )
        .await;

        assert!(rx.recv().unwrap().is_err());
        assert!(dispatcher.calls.lock().unwrap().is_empty());
    }
}
