//! Script splitter (`spec.md` §4.3): applying phase splitting across a
//! whole script.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::phase_split::{split_phase_by_length, split_phase_by_width};
use crate::script::{Phase, Script};

/// `splitScriptByLength(script, k)`.
///
/// Deep-copies `script` into `chunk` (phases cleared) and `remainder`
/// (`_start` deleted), then walks phases off the front of `remainder`:
/// a phase whose length is strictly less than the remaining budget moves
/// whole to `chunk`; the first phase that does not fit is itself split by
/// length at the remaining budget, with its chunk-side appended to
/// `chunk` and its remainder-side pushed back onto `remainder`. This
/// strict-less-than comparison (rather than `<=`) is deliberate — see
/// `DESIGN.md`, Open Question (a).
pub fn split_script_by_length(script: &Script, k: f64) -> Result<(Script, Script)> {
    let mut chunk = script.clone();
    chunk.config.phases = Vec::new();

    let mut remainder = script.clone();
    remainder.start = None;

    let mut pending: VecDeque<Phase> = remainder.config.phases.drain(..).collect();
    let mut remaining = k;

    while let Some(phase) = pending.pop_front() {
        let len = phase.length();
        if len < 0.0 {
            return Err(Error::Arithmetic(
                "cannot length-split a script containing an invalid phase".into(),
            ));
        }

        if len < remaining {
            remaining -= len;
            chunk.config.phases.push(phase);
        } else {
            let (chunk_side, remainder_side) = split_phase_by_length(&phase, remaining)?;
            chunk.config.phases.push(chunk_side);
            pending.push_front(remainder_side);
            break;
        }
    }

    remainder.config.phases = pending.into_iter().collect();

    Ok((chunk, remainder))
}

/// `splitScriptByWidth(script, c)`.
///
/// Deep-copies `script` twice and applies [`split_phase_by_width`] to each
/// input phase in turn, appending the resulting sub-phases to the
/// corresponding side. Both sides span the same total duration as the
/// input and keep its `_start` (width-split siblings are concurrent).
pub fn split_script_by_width(script: &Script, c: f64) -> Result<(Script, Script)> {
    let mut chunk = script.clone();
    chunk.config.phases = Vec::new();

    let mut remainder = script.clone();
    remainder.config.phases = Vec::new();

    for phase in &script.config.phases {
        let (mut chunk_phases, mut remainder_phases) = split_phase_by_width(phase, c)?;
        chunk.config.phases.append(&mut chunk_phases);
        remainder.config.phases.append(&mut remainder_phases);
    }

    Ok((chunk, remainder))
}
