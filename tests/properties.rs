//! Property-based invariants for the splitter core (`spec.md` §8), in the
//! style of the pack's `proptest`-based cost-model invariant tests: small
//! targeted strategies over the public split/validate API rather than
//! full-script fuzzing.

use proptest::prelude::*;
use serde_json::{json, Map};

use loadtest_orchestrator::phase_split::{split_phase_by_length, split_phase_by_width};
use loadtest_orchestrator::script::{Phase, Script, ScriptConfig};
use loadtest_orchestrator::script_split::{split_script_by_length, split_script_by_width};
use loadtest_orchestrator::validate::validate;

fn constant(arrival_rate: f64, duration: f64) -> Phase {
    Phase::Constant {
        arrival_rate,
        duration,
        extra: Map::new(),
    }
}

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

proptest! {
    /// Splitting a single constant-rate phase by length preserves its
    /// total length and leaves its rate untouched on both sides.
    #[test]
    fn length_split_of_constant_phase_preserves_length_and_rate(
        rate in 1.0f64..1000.0,
        duration in 2.0f64..10_000.0,
        k_fraction in 0.01f64..0.99,
    ) {
        let k = duration * k_fraction;
        let phase = constant(rate, duration);
        let (chunk, remainder) = split_phase_by_length(&phase, k).unwrap();

        prop_assert!((chunk.length() - k).abs() < 1e-6);
        prop_assert!((remainder.length() - (duration - k)).abs() < 1e-6);
        prop_assert!((chunk.width() - rate).abs() < 1e-6);
        prop_assert!((remainder.width() - rate).abs() < 1e-6);
    }

    /// Width-splitting a constant-rate phase never leaves either side
    /// above the ceiling.
    #[test]
    fn width_split_of_constant_phase_respects_ceiling(
        rate in 0.0f64..1000.0,
        duration in 1.0f64..1000.0,
        ceiling in 1.0f64..500.0,
    ) {
        let phase = constant(rate, duration);
        let (chunk, remainder) = split_phase_by_width(&phase, ceiling).unwrap();

        for p in chunk.iter().chain(remainder.iter()) {
            prop_assert!(p.width() <= ceiling + 1e-6);
        }
    }

    /// Splitting a whole script by length always yields two sides whose
    /// durations sum back to the original (`spec.md` §8, length
    /// preservation).
    #[test]
    fn script_length_split_preserves_total_duration(
        rate in 1.0f64..100.0,
        phase_duration in 10.0f64..100.0,
        phase_count in 2usize..6,
        k_fraction in 0.01f64..0.99,
    ) {
        let phases = (0..phase_count).map(|_| constant(rate, phase_duration)).collect();
        let script = script_with(phases);
        let total = script.total_duration();
        let k = total * k_fraction;

        let (chunk, remainder) = split_script_by_length(&script, k).unwrap();
        prop_assert!((chunk.total_duration() + remainder.total_duration() - total).abs() < 1e-6);
    }

    /// Splitting a whole script by width never leaves a phase above the
    /// ceiling on the chunk side (`spec.md` §8, width bound).
    #[test]
    fn script_width_split_bounds_chunk_width(
        rate in 1.0f64..500.0,
        duration in 1.0f64..100.0,
        ceiling in 1.0f64..100.0,
    ) {
        let script = script_with(vec![constant(rate, duration)]);
        let (chunk, _remainder) = split_script_by_width(&script, ceiling).unwrap();
        prop_assert!(chunk.max_width() <= ceiling + 1e-6);
    }

    /// Width-splitting a script already under the ceiling is idempotent:
    /// the chunk side is unchanged and the remainder carries no load
    /// (`spec.md` §8, idempotence).
    #[test]
    fn script_width_split_is_idempotent_when_already_under_ceiling(
        rate in 1.0f64..50.0,
        duration in 1.0f64..100.0,
        ceiling in 50.0f64..100.0,
    ) {
        let script = script_with(vec![constant(rate, duration)]);
        let (chunk, remainder) = split_script_by_width(&script, ceiling).unwrap();
        prop_assert_eq!(chunk.config.phases, script.config.phases);
        prop_assert!(remainder.max_width() <= 1e-9);
    }

    /// The validator always rejects a script whose single phase exceeds
    /// the effective per-script rate ceiling (`spec.md` §8, validator
    /// correctness).
    #[test]
    fn validator_rejects_scripts_over_the_rate_ceiling(
        rate in 101.0f64..1000.0,
        duration in 1.0f64..100.0,
    ) {
        let mut script = script_with(vec![constant(rate, duration)]);
        script.split = Some(json!({ "maxScriptRequestsPerSecond": 100 }));
        prop_assert!(validate(&script).is_err());
    }
}
