//! Recursive splitter/scheduler for distributed load-test orchestration.
//!
//! A [`script::Script`] describes a load-test timeline as a sequence of
//! [`script::Phase`]s. [`orchestrator::run`] recursively splits a script
//! along duration and arrival-rate until every piece is small enough to run
//! directly, dispatching the pieces to peers and tracking completion across
//! the resulting task graph.

pub mod clock;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod orchestrator;
pub mod phase_split;
pub mod runner;
pub mod script;
pub mod script_split;
pub mod validate;

pub use error::{Error, Result};
pub use orchestrator::{run, Callback, Completion, Context};
pub use script::{Phase, Script, ScriptConfig, SplitSettings};
