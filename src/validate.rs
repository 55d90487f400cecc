//! Validator (`spec.md` §4.4): structural and numeric bounds on a script
//! and its embedded `_split` overrides.
//!
//! The original implementation signals "which phase is invalid" by negating
//! the phase's index (with the caveat that index `0` can't be represented
//! that way). A typed Rust error carrying an explicit `usize` index doesn't
//! need that convention at all, so this module reports indices directly
//! instead of reproducing the negated-index trick.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::script::{Script, SplitSettings};

/// Validates `script`, resolving its `_split` overrides against the
/// defaults/ceilings in the process. On success, returns the effective
/// [`SplitSettings`] to use for this invocation.
pub fn validate(script: &Script) -> Result<SplitSettings> {
    let settings = resolve_settings(script.split.as_ref())?;

    if script.config.phases.is_empty() {
        return Err(Error::Structural(
            "config.phases must be a non-empty list of phases".into(),
        ));
    }

    for (index, phase) in script.config.phases.iter().enumerate() {
        if phase.length() < 0.0 {
            return Err(Error::Structural(format!(
                "phases[{index}] has an invalid length: {}",
                phase.describe()
            )));
        }
    }

    let total_duration = script.total_duration();
    if total_duration > settings.max_script_duration_in_seconds as f64 {
        return Err(Error::Structural(format!(
            "total script duration {total_duration}s exceeds maxScriptDurationInSeconds ({})",
            settings.max_script_duration_in_seconds
        )));
    }

    for (index, phase) in script.config.phases.iter().enumerate() {
        if phase.width() < 0.0 {
            return Err(Error::Structural(format!(
                "phases[{index}] has an invalid width: {}",
                phase.describe()
            )));
        }
    }

    for (index, phase) in script.config.phases.iter().enumerate() {
        let width = phase.width();
        if width > settings.max_script_requests_per_second as f64 {
            return Err(Error::Structural(format!(
                "phases[{index}] width {width} exceeds maxScriptRequestsPerSecond ({})",
                settings.max_script_requests_per_second
            )));
        }
    }

    Ok(settings)
}

/// Merges `_split` overrides over [`SplitSettings::default`], rejecting any
/// field that isn't a positive integer at or below its default ceiling
/// (`spec.md` §6: the default doubles as the ceiling an override may not
/// exceed).
fn resolve_settings(split: Option<&Value>) -> Result<SplitSettings> {
    let mut settings = SplitSettings::default();

    let Some(split) = split else {
        return Ok(settings);
    };

    let object = split.as_object().ok_or_else(|| {
        Error::Structural("_split must be a structured object".to_string())
    })?;

    apply_bounded_override(
        object,
        "maxScriptDurationInSeconds",
        SplitSettings::MAX_SCRIPT_DURATION_IN_SECONDS,
        &mut settings.max_script_duration_in_seconds,
    )?;
    apply_bounded_override(
        object,
        "maxScriptRequestsPerSecond",
        SplitSettings::MAX_SCRIPT_REQUESTS_PER_SECOND,
        &mut settings.max_script_requests_per_second,
    )?;
    apply_bounded_override(
        object,
        "maxChunkDurationInSeconds",
        SplitSettings::MAX_CHUNK_DURATION_IN_SECONDS,
        &mut settings.max_chunk_duration_in_seconds,
    )?;
    apply_bounded_override(
        object,
        "maxChunkRequestsPerSecond",
        SplitSettings::MAX_CHUNK_REQUESTS_PER_SECOND,
        &mut settings.max_chunk_requests_per_second,
    )?;

    if let Some(value) = object.get("timeBufferInMilliseconds") {
        let millis = value
            .as_i64()
            .filter(|v| *v >= 0)
            .ok_or_else(|| Error::Structural("timeBufferInMilliseconds must be a non-negative integer".into()))?;
        settings.time_buffer_in_milliseconds = millis;
    }

    Ok(settings)
}

fn apply_bounded_override(
    object: &serde_json::Map<String, Value>,
    key: &str,
    ceiling: i64,
    target: &mut i64,
) -> Result<()> {
    let Some(value) = object.get(key) else {
        return Ok(());
    };

    let parsed = value.as_i64().filter(|v| *v > 0 && *v <= ceiling);
    match parsed {
        Some(v) => {
            *target = v;
            Ok(())
        }
        None => Err(Error::Structural(format!(
            "{key} must be a positive integer no greater than {ceiling}"
        ))),
    }
}
