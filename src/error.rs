use thiserror::Error;

/// Errors produced by the splitter/scheduler core.
///
/// Every variant is surfaced to the top-level completion callback as a
/// single human-readable message (see `spec.md` §7) — the orchestrator
/// never retries and never distinguishes error kinds once they leave this
/// crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Schema or numeric-bound violation in the input script, reported by
    /// the validator.
    #[error("{0}")]
    Structural(String),

    /// A geometric invariant was violated (parallel lines, a phase with
    /// negative length/width slipping past validation). Should be
    /// unreachable by construction.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Submitting a sub-script to a peer failed. Fatal for the sub-tree
    /// rooted at that dispatch; the peer's own execution is not visible
    /// from here.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// The embedded load-generation engine raised an error while running a
    /// leaf script.
    #[error("engine error: {0}")]
    Engine(String),

    /// A completion counter failed to drain before its deadline.
    #[error("orchestration deadline exceeded: {0}")]
    Deadline(String),

    /// Anything else, typically bubbled up from an adapter via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
