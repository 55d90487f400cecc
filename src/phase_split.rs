//! Phase splitter (`spec.md` §4.2): splitting a single phase by length or by
//! width into a `{chunk, remainder}` pair.

use crate::error::{Error, Result};
use crate::geometry::intersection;
use crate::script::{Extra, Phase};

fn constant(extra: Extra, arrival_rate: f64, duration: f64) -> Phase {
    Phase::Constant {
        arrival_rate,
        duration,
        extra,
    }
}

fn ramp(extra: Extra, arrival_rate: f64, ramp_to: f64, duration: f64) -> Phase {
    Phase::Ramp {
        arrival_rate,
        ramp_to,
        duration,
        extra,
    }
}

fn count(extra: Extra, arrival_count: f64, duration: f64) -> Phase {
    Phase::Count {
        arrival_count,
        duration,
        extra,
    }
}

fn pause(extra: Extra, duration: f64) -> Phase {
    Phase::Pause {
        pause: duration,
        extra,
    }
}

/// Discards a ramp's `rampTo` when it equals `arrivalRate`, i.e. normalizes
/// a degenerate ramp down to a constant-rate phase before width-splitting
/// it (`spec.md` §4.2.2).
fn normalize(phase: Phase) -> Phase {
    match phase {
        Phase::Ramp {
            arrival_rate,
            ramp_to,
            duration,
            extra,
        } if ramp_to == arrival_rate => constant(extra, arrival_rate, duration),
        other => other,
    }
}

/// `splitPhaseByLength(phase, k)` (`spec.md` §4.2.1). `k` must be strictly
/// less than `phase.length()`; the caller (the script splitter) guarantees
/// this.
pub fn split_phase_by_length(phase: &Phase, k: f64) -> Result<(Phase, Phase)> {
    let extra = phase.extra().clone();

    let pair = match phase {
        Phase::Constant {
            arrival_rate,
            duration,
            ..
        } => (
            constant(extra.clone(), *arrival_rate, k),
            constant(extra, *arrival_rate, duration - k),
        ),
        Phase::Ramp {
            arrival_rate,
            ramp_to,
            duration,
            ..
        } => {
            let ratio = k / duration;
            let diff = ramp_to - arrival_rate;
            let seam = (arrival_rate + diff * ratio).round();
            (
                ramp(extra.clone(), *arrival_rate, seam, k),
                ramp(extra, seam, *ramp_to, duration - k),
            )
        }
        Phase::Count {
            arrival_count,
            duration,
            ..
        } => {
            let ratio = k / duration;
            let chunk_count = (arrival_count * ratio).round();
            (
                count(extra.clone(), chunk_count, k),
                count(extra, arrival_count - chunk_count, duration - k),
            )
        }
        Phase::Pause { .. } => (pause(extra.clone(), k), pause(extra, phase.length() - k)),
        Phase::Invalid { .. } => {
            return Err(Error::Arithmetic(
                "cannot split an invalid phase by length".into(),
            ))
        }
    };

    Ok(pair)
}

/// `splitPhaseByWidth(phase, c)` (`spec.md` §4.2.2). Each side is a `Vec`
/// because a single ramp phase may decompose into two sub-phases when it
/// crosses the ceiling.
pub fn split_phase_by_width(phase: &Phase, c: f64) -> Result<(Vec<Phase>, Vec<Phase>)> {
    let phase = normalize(phase.clone());
    let extra = phase.extra().clone();

    match phase {
        Phase::Ramp {
            arrival_rate,
            ramp_to,
            duration,
            ..
        } => {
            let hi = arrival_rate.max(ramp_to);
            let lo = arrival_rate.min(ramp_to);

            if hi <= c {
                Ok((
                    vec![ramp(extra.clone(), arrival_rate, ramp_to, duration)],
                    vec![pause(extra, duration)],
                ))
            } else if lo >= c {
                Ok((
                    vec![constant(extra.clone(), c, duration)],
                    vec![ramp(extra, arrival_rate - c, ramp_to - c, duration)],
                ))
            } else {
                let (x, y) = intersection(arrival_rate, ramp_to, duration, c)?;
                let x = x as f64;
                if y != c as i64 {
                    return Err(Error::Arithmetic(
                        "ramp/ceiling intersection did not land on the ceiling".into(),
                    ));
                }
                if x <= 0.0 || x >= duration {
                    // Design note (b): undefined by the source; treat as an
                    // internal error rather than guess at behavior.
                    return Err(Error::Arithmetic(format!(
                        "ramp/ceiling intersection at x={x} is degenerate for duration={duration}"
                    )));
                }

                if arrival_rate < ramp_to {
                    Ok((
                        vec![
                            ramp(extra.clone(), arrival_rate, c, x),
                            constant(extra.clone(), c, duration - x),
                        ],
                        vec![
                            pause(extra.clone(), x),
                            ramp(extra, 1.0, ramp_to - c, duration - x),
                        ],
                    ))
                } else {
                    Ok((
                        vec![
                            constant(extra.clone(), c, x),
                            ramp(extra.clone(), c, ramp_to, duration - x),
                        ],
                        vec![
                            ramp(extra.clone(), arrival_rate - c, 1.0, x),
                            pause(extra, duration - x),
                        ],
                    ))
                }
            }
        }
        Phase::Constant {
            arrival_rate,
            duration,
            ..
        } => {
            if arrival_rate > c {
                Ok((
                    vec![constant(extra.clone(), c, duration)],
                    vec![constant(extra, arrival_rate - c, duration)],
                ))
            } else {
                Ok((
                    vec![constant(extra.clone(), arrival_rate, duration)],
                    vec![pause(extra, duration)],
                ))
            }
        }
        Phase::Count {
            arrival_count,
            duration,
            ..
        } => {
            let rps = arrival_count / duration;
            if rps >= c {
                let chunk_count = (c * duration).floor();
                Ok((
                    vec![count(extra.clone(), chunk_count, duration)],
                    vec![count(extra, arrival_count - chunk_count, duration)],
                ))
            } else {
                Ok((
                    vec![count(extra.clone(), arrival_count, duration)],
                    vec![pause(extra, duration)],
                ))
            }
        }
        Phase::Pause { pause: duration, .. } => Ok((
            vec![pause(extra.clone(), duration)],
            vec![pause(extra, duration)],
        )),
        Phase::Invalid { .. } => Err(Error::Arithmetic(
            "cannot split an invalid phase by width".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn constant_phase(arrival_rate: f64, duration: f64) -> Phase {
        Phase::Constant {
            arrival_rate,
            duration,
            extra: Map::new(),
        }
    }

    #[test]
    fn length_split_constant_preserves_rate() {
        let p = constant_phase(10.0, 120.0);
        let (chunk, remainder) = split_phase_by_length(&p, 40.0).unwrap();
        assert_eq!(chunk.length(), 40.0);
        assert_eq!(remainder.length(), 80.0);
        assert_eq!(chunk.width(), 10.0);
        assert_eq!(remainder.width(), 10.0);
    }

    #[test]
    fn width_split_ramp_crossing_ceiling() {
        let p = Phase::Ramp {
            arrival_rate: 0.0,
            ramp_to: 50.0,
            duration: 100.0,
            extra: Map::new(),
        };
        let (chunk, remainder) = split_phase_by_width(&p, 25.0).unwrap();
        assert_eq!(chunk.len(), 2);
        assert_eq!(remainder.len(), 2);
        assert_eq!(chunk[0], Phase::Ramp { arrival_rate: 0.0, ramp_to: 25.0, duration: 50.0, extra: Map::new() });
        assert_eq!(chunk[1], Phase::Constant { arrival_rate: 25.0, duration: 50.0, extra: Map::new() });
        assert_eq!(remainder[0], Phase::Pause { pause: 50.0, extra: Map::new() });
        assert_eq!(remainder[1], Phase::Ramp { arrival_rate: 1.0, ramp_to: 25.0, duration: 50.0, extra: Map::new() });
    }

    #[test]
    fn width_split_count_phase() {
        let p = count_phase(100.0, 10.0);
        let (chunk, remainder) = split_phase_by_width(&p, 5.0).unwrap();
        assert_eq!(chunk[0], count_phase(50.0, 10.0));
        assert_eq!(remainder[0], count_phase(50.0, 10.0));
    }

    fn count_phase(arrival_count: f64, duration: f64) -> Phase {
        Phase::Count {
            arrival_count,
            duration,
            extra: Map::new(),
        }
    }
}
