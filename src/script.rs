//! The script/phase data model (`spec.md` §3) and the `_split` settings
//! table (`spec.md` §6).
//!
//! Phase "shape" is discriminated by which fields are present in the
//! source JSON, per the Design Notes' guidance to model this as a typed,
//! tagged variant rather than an untyped bag of optional fields. The
//! `Invalid` variant exists purely so a structurally malformed phase can
//! survive parsing and be reported by name/index by the validator instead
//! of aborting deserialization outright.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Auxiliary JSON object fields (names, scenarios, anything the downstream
/// load-generation engine cares about) that must survive a split untouched.
pub type Extra = Map<String, Value>;

/// One interval of the load curve.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    /// Fixed rate for a fixed duration.
    Constant {
        arrival_rate: f64,
        duration: f64,
        extra: Extra,
    },
    /// Rate varies linearly from `arrival_rate` at `t=0` to `ramp_to` at
    /// `t=duration`.
    Ramp {
        arrival_rate: f64,
        ramp_to: f64,
        duration: f64,
        extra: Extra,
    },
    /// A fixed number of arrivals spread evenly over `duration`.
    Count {
        arrival_count: f64,
        duration: f64,
        extra: Extra,
    },
    /// Zero-rate interval.
    Pause { pause: f64, extra: Extra },
    /// Present in the input but matches none of the four recognized
    /// shapes. Carried through so the validator can name the offending
    /// phase and show its contents.
    Invalid { raw: Extra },
}

impl Phase {
    /// `phaseLength` (`spec.md` §4.1): `duration` if present, else `pause`,
    /// else `-1` for an invalid phase.
    pub fn length(&self) -> f64 {
        match self {
            Phase::Constant { duration, .. } => *duration,
            Phase::Ramp { duration, .. } => *duration,
            Phase::Count { duration, .. } => *duration,
            Phase::Pause { pause, .. } => *pause,
            Phase::Invalid { .. } => -1.0,
        }
    }

    /// `phaseWidth` (`spec.md` §4.1).
    pub fn width(&self) -> f64 {
        match self {
            Phase::Constant { arrival_rate, .. } => *arrival_rate,
            Phase::Ramp {
                arrival_rate,
                ramp_to,
                ..
            } => arrival_rate.max(*ramp_to),
            Phase::Count {
                arrival_count,
                duration,
                ..
            } => {
                if *duration == 0.0 {
                    -1.0
                } else {
                    arrival_count / duration
                }
            }
            Phase::Pause { .. } => 0.0,
            Phase::Invalid { .. } => -1.0,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Phase::Invalid { .. })
    }

    pub fn extra(&self) -> &Extra {
        match self {
            Phase::Constant { extra, .. }
            | Phase::Ramp { extra, .. }
            | Phase::Count { extra, .. }
            | Phase::Pause { extra, .. } => extra,
            Phase::Invalid { raw } => raw,
        }
    }

    /// A short description used in validator messages, e.g. `{"arrivalRate":10,"duration":60}`.
    pub fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "<unrepresentable phase>".to_string())
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64()
}

fn take_num(map: &mut Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(as_f64)
}

impl<'de> Deserialize<'de> for Phase {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;

        let pause = take_num(&mut map, "pause");
        let duration = take_num(&mut map, "duration");
        let arrival_rate = take_num(&mut map, "arrivalRate");
        let ramp_to = take_num(&mut map, "rampTo");
        let arrival_count = take_num(&mut map, "arrivalCount");

        let phase = if let Some(pause) = pause {
            map.remove("pause");
            Phase::Pause {
                pause,
                extra: map,
            }
        } else if let (Some(duration), Some(arrival_rate), Some(ramp_to)) =
            (duration, arrival_rate, ramp_to)
        {
            map.remove("duration");
            map.remove("arrivalRate");
            map.remove("rampTo");
            Phase::Ramp {
                arrival_rate,
                ramp_to,
                duration,
                extra: map,
            }
        } else if let (Some(duration), Some(arrival_rate)) = (duration, arrival_rate) {
            map.remove("duration");
            map.remove("arrivalRate");
            Phase::Constant {
                arrival_rate,
                duration,
                extra: map,
            }
        } else if let (Some(duration), Some(arrival_count)) = (duration, arrival_count) {
            map.remove("duration");
            map.remove("arrivalCount");
            Phase::Count {
                arrival_count,
                duration,
                extra: map,
            }
        } else {
            Phase::Invalid { raw: map }
        };

        Ok(phase)
    }
}

impl Serialize for Phase {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = self.extra().clone();
        match self {
            Phase::Constant {
                arrival_rate,
                duration,
                ..
            } => {
                map.insert("arrivalRate".into(), json_num(*arrival_rate));
                map.insert("duration".into(), json_num(*duration));
            }
            Phase::Ramp {
                arrival_rate,
                ramp_to,
                duration,
                ..
            } => {
                map.insert("arrivalRate".into(), json_num(*arrival_rate));
                map.insert("rampTo".into(), json_num(*ramp_to));
                map.insert("duration".into(), json_num(*duration));
            }
            Phase::Count {
                arrival_count,
                duration,
                ..
            } => {
                map.insert("arrivalCount".into(), json_num(*arrival_count));
                map.insert("duration".into(), json_num(*duration));
            }
            Phase::Pause { pause, .. } => {
                map.insert("pause".into(), json_num(*pause));
            }
            Phase::Invalid { .. } => {}
        }
        map.serialize(serializer)
    }
}

fn json_num(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// `config.phases` plus any forward-compatible extra fields under `config`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The top-level script (`spec.md` §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Script {
    pub config: ScriptConfig,

    /// Raw `_split` overrides, kept untyped until the validator resolves
    /// them against [`SplitSettings`] — this is what lets the validator
    /// reject "`_split` present but not a structured object" as a distinct
    /// failure from "a `_split` field is out of range".
    #[serde(rename = "_split", skip_serializing_if = "Option::is_none")]
    pub split: Option<Value>,

    /// Epoch-millisecond timestamp of the top-level invocation. Immutable
    /// once set; propagated unchanged to every descendant.
    #[serde(rename = "_genesis", skip_serializing_if = "Option::is_none")]
    pub genesis: Option<i64>,

    /// Epoch-millisecond wall-clock time this chunk must begin emitting
    /// load. Assigned by a parent, never decreased by a child.
    #[serde(rename = "_start", skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,

    /// When true, the orchestrator emits progress diagnostics.
    #[serde(rename = "_trace", default)]
    pub trace: bool,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Script {
    /// Total duration of the script in seconds: the sum of its phases'
    /// lengths. Returns `-1.0` if any phase is invalid (mirrors
    /// `phaseLength`'s error convention).
    pub fn total_duration(&self) -> f64 {
        let mut total = 0.0;
        for phase in &self.config.phases {
            let len = phase.length();
            if len < 0.0 {
                return -1.0;
            }
            total += len;
        }
        total
    }

    /// Maximum instantaneous width across all phases. Returns `-1.0` if any
    /// phase is invalid.
    pub fn max_width(&self) -> f64 {
        let mut max = 0.0_f64;
        for phase in &self.config.phases {
            let w = phase.width();
            if w < 0.0 {
                return -1.0;
            }
            max = max.max(w);
        }
        max
    }
}

/// Resolved, effective `_split` settings (`spec.md` §6). Every field is
/// mandatory once resolved — defaults have already been applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitSettings {
    pub max_script_duration_in_seconds: i64,
    pub max_script_requests_per_second: i64,
    pub max_chunk_duration_in_seconds: i64,
    pub max_chunk_requests_per_second: i64,
    pub time_buffer_in_milliseconds: i64,
}

impl SplitSettings {
    pub const MAX_SCRIPT_DURATION_IN_SECONDS: i64 = 86_400;
    pub const MAX_SCRIPT_REQUESTS_PER_SECOND: i64 = 5_000;
    pub const MAX_CHUNK_DURATION_IN_SECONDS: i64 = 240;
    pub const MAX_CHUNK_REQUESTS_PER_SECOND: i64 = 25;
    pub const TIME_BUFFER_IN_MILLISECONDS: i64 = 15_000;
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            max_script_duration_in_seconds: Self::MAX_SCRIPT_DURATION_IN_SECONDS,
            max_script_requests_per_second: Self::MAX_SCRIPT_REQUESTS_PER_SECOND,
            max_chunk_duration_in_seconds: Self::MAX_CHUNK_DURATION_IN_SECONDS,
            max_chunk_requests_per_second: Self::MAX_CHUNK_REQUESTS_PER_SECOND,
            time_buffer_in_milliseconds: Self::TIME_BUFFER_IN_MILLISECONDS,
        }
    }
}
