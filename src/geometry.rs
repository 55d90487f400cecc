//! Phase geometry (`spec.md` §4.1): duration/width accessors plus the line
//! intersection used to find where a ramp crosses a rate ceiling.

use crate::error::{Error, Result};
use crate::script::Phase;

/// A line `Ax + By = C`, in the representation used by `spec.md` §4.1's
/// `lineThroughPoints`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Line {
    /// `lineThroughPoints(p1, p2)`.
    pub fn through_points(p1: (f64, f64), p2: (f64, f64)) -> Line {
        let a = p2.1 - p1.1;
        let b = p1.0 - p2.0;
        let c = a * p1.0 + b * p1.1;
        Line { a, b, c }
    }

    /// `intersect(l1, l2)` via Cramer's rule. Fails with
    /// [`Error::Arithmetic`] if the lines are parallel (`det == 0`); the
    /// caller must avoid this case by construction (a horizontal rate
    /// ceiling crossed against a non-horizontal ramp).
    pub fn intersect(&self, other: &Line) -> Result<(f64, f64)> {
        let det = self.a * other.b - other.a * self.b;
        if det == 0.0 {
            return Err(Error::Arithmetic("parallel lines have no intersection".into()));
        }

        let x = (other.b * self.c - self.b * other.c) / det;
        let y = (self.a * other.c - other.a * self.c) / det;
        Ok((x, y))
    }
}

/// Intersects a ramp phase's line `(0, arrivalRate) -> (duration, rampTo)`
/// with the horizontal line `y = ceiling`, rounding the result to the
/// nearest integer (`spec.md` §4.1's `intersection`).
pub fn intersection(arrival_rate: f64, ramp_to: f64, duration: f64, ceiling: f64) -> Result<(i64, i64)> {
    let ramp_line = Line::through_points((0.0, arrival_rate), (duration, ramp_to));
    let ceiling_line = Line::through_points((0.0, ceiling), (1.0, ceiling));

    let (x, y) = ramp_line.intersect(&ceiling_line)?;
    Ok((x.round() as i64, y.round() as i64))
}

/// `phaseLength` (`spec.md` §4.1).
pub fn phase_length(phase: &Phase) -> f64 {
    phase.length()
}

/// `phaseWidth` (`spec.md` §4.1).
pub fn phase_width(phase: &Phase) -> f64 {
    phase.width()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn through_points_horizontal() {
        let l = Line::through_points((0.0, 5.0), (1.0, 5.0));
        assert_eq!(l, Line { a: 0.0, b: -1.0, c: -5.0 });
    }

    #[test]
    fn intersect_ramp_up_crosses_ceiling() {
        // Ramp from 0 to 50 over 100s, ceiling at 25 -> crosses at x=50, y=25.
        let (x, y) = intersection(0.0, 50.0, 100.0, 25.0).unwrap();
        assert_eq!((x, y), (50, 25));
    }

    #[test]
    fn intersect_parallel_is_error() {
        // A horizontal "ramp" (arrivalRate == rampTo) intersected with a
        // horizontal ceiling at a different rate has no solution.
        let ramp_line = Line::through_points((0.0, 10.0), (100.0, 10.0));
        let ceiling_line = Line::through_points((0.0, 25.0), (1.0, 25.0));
        assert!(ramp_line.intersect(&ceiling_line).is_err());
    }
}
