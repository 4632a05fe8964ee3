//! De Boor basis weights.
//!
//! Evaluation runs the Cox–de Boor recurrence bottom-up over a single buffer.
//! Level `k` occupies `buffer[..m + d - k]` and only the indices in
//! [`DeBoorBasis::active_window`] can be non-zero, so each level can be
//! inspected (and its partition of unity checked) before the next one is
//! raised.

use std::ops::Range;

use super::{SplineError, SplineResult};
use crate::geom::Tolerance;

/// Per-control blend weights for one curve parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisWeights {
    parameter: f64,
    values: Vec<f64>,
}

impl BasisWeights {
    #[must_use]
    pub fn new(parameter: f64, values: Vec<f64>) -> Self {
        Self { parameter, values }
    }

    /// Weight 1 at `index`, 0 elsewhere.
    #[must_use]
    pub fn one_hot(parameter: f64, len: usize, index: usize) -> Self {
        let mut values = vec![0.0; len];
        values[index] = 1.0;
        Self { parameter, values }
    }

    /// Folds weights computed on an extended control sequence back onto the
    /// original controls: `original[sequence[k]] += extended[k]`.
    #[must_use]
    pub fn fold(parameter: f64, extended: &[f64], sequence: &[usize], original_count: usize) -> Self {
        let mut values = vec![0.0; original_count];
        for (&weight, &target) in extended.iter().zip(sequence) {
            values[target] += weight;
        }
        Self { parameter, values }
    }

    #[must_use]
    pub const fn parameter(&self) -> f64 {
        self.parameter
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    #[must_use]
    pub fn is_partition_of_unity(&self, tol: Tolerance) -> bool {
        tol.approx_eq_f64(self.sum(), 1.0)
    }

    /// Zeroes weights within [`Tolerance::ZERO_LENGTH`] of zero, so the
    /// stored vector agrees with [`BasisWeights::influences`].
    #[must_use]
    pub fn pruned(mut self) -> Self {
        for w in &mut self.values {
            if w.abs() <= Tolerance::ZERO_LENGTH.eps {
                *w = 0.0;
            }
        }
        self
    }

    /// `(control index, weight)` for every weight that is not numerically zero.
    pub fn influences(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, w)| w.abs() > Tolerance::ZERO_LENGTH.eps)
    }
}

/// Bottom-up Cox–de Boor triangle for a single parameter.
#[derive(Debug, Clone)]
pub struct DeBoorBasis<'k> {
    knots: &'k [f64],
    control_count: usize,
    degree: usize,
    t: f64,
    level: usize,
    buffer: Vec<f64>,
    window: Range<usize>,
}

impl<'k> DeBoorBasis<'k> {
    /// Level-0 indicator: 1 on the span with `knots[i] <= t < knots[i+1]`.
    ///
    /// When `t` lies outside every non-empty span the window is empty and all
    /// weights stay zero.
    pub fn new(control_count: usize, degree: usize, t: f64, knots: &'k [f64]) -> SplineResult<Self> {
        let expected = control_count + degree + 1;
        if knots.len() != expected {
            return Err(SplineError::KnotLengthMismatch {
                expected,
                actual: knots.len(),
            });
        }
        if control_count <= degree {
            return Err(SplineError::DegenerateCurve {
                control_count,
                degree,
            });
        }
        if !t.is_finite() {
            return Err(SplineError::NonFiniteParameter);
        }

        let mut buffer = vec![0.0; control_count + degree];
        let upper = knots.partition_point(|&k| k <= t);
        let window = if upper == 0 || upper >= knots.len() {
            0..0
        } else {
            let span = upper - 1;
            buffer[span] = 1.0;
            span..span + 1
        };

        Ok(Self {
            knots,
            control_count,
            degree,
            t,
            level: 0,
            buffer,
            window,
        })
    }

    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Indices of the current level that may hold non-zero weights.
    #[must_use]
    pub fn active_window(&self) -> Range<usize> {
        self.window.clone()
    }

    /// Weights of the current level (`m + d - level` entries).
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.buffer[..self.level_len(self.level)]
    }

    /// Sum over the active window; 1 inside the domain at every level.
    #[must_use]
    pub fn window_sum(&self) -> f64 {
        self.buffer[self.window.clone()].iter().sum()
    }

    /// Raises the triangle by one degree. Returns `false` once the target
    /// degree has been reached.
    pub fn raise(&mut self) -> bool {
        if self.level >= self.degree {
            return false;
        }

        let k = self.level + 1;
        let len = self.level_len(k);
        let lo = self.window.start.saturating_sub(1);
        let hi = self.window.end.min(len);
        let knots = self.knots;
        let t = self.t;

        for i in lo..hi {
            let here = self.buffer[i];
            let next = self.buffer[i + 1];
            if here == 0.0 && next == 0.0 {
                continue;
            }

            let mut value = 0.0;
            let left = knots[i + k] - knots[i];
            if !Tolerance::ZERO_LENGTH.is_zero_length(left) {
                value += (t - knots[i]) * here / left;
            }
            let right = knots[i + k + 1] - knots[i + 1];
            if !Tolerance::ZERO_LENGTH.is_zero_length(right) {
                value += (knots[i + k + 1] - t) * next / right;
            }
            self.buffer[i] = value;
        }

        self.level = k;
        self.window = if lo < hi { lo..hi } else { 0..0 };
        true
    }

    /// Raises to the target degree and returns the `control_count` weights.
    #[must_use]
    pub fn finish(mut self) -> Vec<f64> {
        while self.raise() {}
        self.buffer.truncate(self.control_count);
        self.buffer
    }

    fn level_len(&self, level: usize) -> usize {
        self.control_count + self.degree - level
    }
}

/// Basis weights of `control_count` controls of degree `degree` at `t`.
///
/// Parameters at or past the end of the domain (within `tol`) return the
/// one-hot weight on the last control; parameters before the start are
/// clamped to it.
pub fn evaluate_basis(
    control_count: usize,
    degree: usize,
    t: f64,
    knots: &[f64],
    tol: Tolerance,
) -> SplineResult<BasisWeights> {
    if !t.is_finite() {
        return Err(SplineError::NonFiniteParameter);
    }
    if control_count <= degree {
        return Err(SplineError::DegenerateCurve {
            control_count,
            degree,
        });
    }
    let expected = control_count + degree + 1;
    if knots.len() != expected {
        return Err(SplineError::KnotLengthMismatch {
            expected,
            actual: knots.len(),
        });
    }

    let (start, end) = (knots[degree], knots[control_count]);
    if t + tol.eps >= end {
        return Ok(BasisWeights::one_hot(t, control_count, control_count - 1));
    }

    let t = t.max(start);
    let values = DeBoorBasis::new(control_count, degree, t, knots)?.finish();
    Ok(BasisWeights::new(t, values))
}
