//! Runner adapter (`spec.md` §4.7): `runLoad`, a thin binding to the
//! embedded load-generation engine that actually emits traffic for a leaf
//! script. The engine itself is out of scope (`spec.md` §1); this module
//! only defines the interface the orchestrator calls through and the
//! diagnostic event subscription described in the spec.

use serde::Serialize;

use crate::clock::now_millis;
use crate::error::{Error, Result};
use crate::script::Script;

/// Aggregated result of running a leaf script, with latency samples
/// suppressed per `spec.md` §4.7.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Report {
    pub genesis: Option<i64>,
    pub started_at: i64,
    pub completed_at: i64,
    pub total_requests: u64,
    pub total_errors: u64,
}

/// What the embedded engine reports back once it finishes a leaf script.
#[derive(Clone, Debug, Default)]
pub struct EngineReport {
    pub total_requests: u64,
    pub total_errors: u64,
}

/// Phase-start/phase-end/done diagnostics the engine emits while running.
/// Only consulted when a script's `_trace` flag is set.
pub trait EngineEvents: Send + Sync {
    fn phase_start(&self, phase_index: usize);
    fn phase_end(&self, phase_index: usize);
}

/// A no-op event sink, used when `_trace` is off.
pub struct SilentEvents;

impl EngineEvents for SilentEvents {
    fn phase_start(&self, _phase_index: usize) {}
    fn phase_end(&self, _phase_index: usize) {}
}

/// Emits `tracing` events, used when a script's `_trace` flag is set.
pub struct TracingEvents;

impl EngineEvents for TracingEvents {
    fn phase_start(&self, phase_index: usize) {
        tracing::debug!(phase_index, "phase started");
    }

    fn phase_end(&self, phase_index: usize) {
        tracing::debug!(phase_index, "phase ended");
    }
}

/// The external load-generation engine. Out of scope per `spec.md` §1(a) —
/// specified only by this interface.
#[async_trait::async_trait]
pub trait LoadEngine: Send + Sync {
    async fn run(&self, script: &Script, events: &dyn EngineEvents) -> anyhow::Result<EngineReport>;
}

/// `runLoad(start, script, context, callback)`.
#[async_trait::async_trait]
pub trait LoadRunner: Send + Sync {
    async fn run_load(&self, start: i64, script: Script) -> Result<Report>;
}

/// Adapts a [`LoadEngine`] into a [`LoadRunner`], subscribing to its
/// diagnostic events and catching engine exceptions as
/// [`Error::Engine`] (`spec.md` §4.7, §7).
pub struct EngineRunner<E> {
    engine: E,
}

impl<E> EngineRunner<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }
}

#[async_trait::async_trait]
impl<E> LoadRunner for EngineRunner<E>
where
    E: LoadEngine,
{
    async fn run_load(&self, start: i64, script: Script) -> Result<Report> {
        let events: Box<dyn EngineEvents> = if script.trace {
            Box::new(TracingEvents)
        } else {
            Box::new(SilentEvents)
        };

        let genesis = script.genesis;

        let result = self
            .engine
            .run(&script, events.as_ref())
            .await
            .map_err(|e| Error::Engine(e.to_string()))?;

        Ok(Report {
            genesis,
            started_at: start,
            completed_at: now_millis(),
            total_requests: result.total_requests,
            total_errors: result.total_errors,
        })
    }
}
