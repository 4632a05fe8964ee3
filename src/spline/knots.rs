use super::curve::KnotForm;
use super::{SplineError, SplineResult};

/// Non-decreasing knot sequence of length `control_count + degree + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotVector {
    values: Vec<f64>,
    degree: usize,
}

impl KnotVector {
    /// Wraps an explicit knot sequence after checking its length and ordering.
    pub fn new(values: Vec<f64>, control_count: usize, degree: usize) -> SplineResult<Self> {
        let expected = control_count + degree + 1;
        if values.len() != expected {
            return Err(SplineError::KnotLengthMismatch {
                expected,
                actual: values.len(),
            });
        }
        if control_count <= degree {
            return Err(SplineError::DegenerateCurve {
                control_count,
                degree,
            });
        }
        if !is_non_decreasing(&values) {
            return Err(SplineError::DecreasingKnots);
        }
        Ok(Self { values, degree })
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
    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// Number of control points (or extended control points) this vector serves.
    #[must_use]
    pub fn control_count(&self) -> usize {
        self.values.len() - self.degree - 1
    }

    /// Valid evaluation domain `[knots[d], knots[m]]`.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        (self.values[self.degree], self.values[self.control_count()])
    }

    #[must_use]
    pub fn is_non_decreasing(&self) -> bool {
        is_non_decreasing(&self.values)
    }
}

/// A knot vector plus the control order it was built for.
///
/// `sequence[k]` is the original control index feeding extended slot `k`. For
/// the open form this is the identity; the periodic form prepends the last
/// `d` indices and appends the first `d`.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotLayout {
    pub form: KnotForm,
    pub knots: KnotVector,
    pub sequence: Vec<usize>,
}

impl KnotLayout {
    #[must_use]
    pub fn original_count(&self) -> usize {
        match self.form {
            KnotForm::Open => self.sequence.len(),
            KnotForm::Periodic => self.sequence.len() - 2 * self.knots.degree(),
        }
    }
}

/// Builds the knot vector and control order for `control_count` controls.
pub fn build_knot_layout(form: KnotForm, control_count: usize, degree: usize) -> SplineResult<KnotLayout> {
    let indices: Vec<usize> = (0..control_count).collect();
    let (knots, sequence) = match form {
        KnotForm::Open => (open_uniform_knots(control_count, degree)?, indices),
        KnotForm::Periodic => (
            periodic_uniform_knots(control_count, degree)?,
            wrap_periodic(&indices, degree),
        ),
    };

    log::debug!(
        "knot layout: form={form:?} controls={control_count} degree={degree} knots={}",
        knots.len()
    );

    Ok(KnotLayout {
        form,
        knots,
        sequence,
    })
}

/// Clamped uniform knots: `d + 1` zeros, evenly spaced interior knots, `d + 1` ones.
pub fn open_uniform_knots(control_count: usize, degree: usize) -> SplineResult<KnotVector> {
    if control_count <= degree {
        return Err(SplineError::DegenerateCurve {
            control_count,
            degree,
        });
    }

    let interior = control_count - degree - 1;
    let segments = (control_count - degree) as f64;

    let mut values = Vec::with_capacity(control_count + degree + 1);
    values.extend(std::iter::repeat_n(0.0, degree + 1));
    values.extend((0..interior).map(|j| (j + 1) as f64 / segments));
    values.extend(std::iter::repeat_n(1.0, degree + 1));

    KnotVector::new(values, control_count, degree)
}

/// Uniform knots for the wrapped sequence of a closed curve.
///
/// The vector serves `control_count + 2·degree` extended controls. Spacing is
/// `1 / (control_count + degree)`, so knot `d` sits at 0 and knot `m` at 1 with
/// `d` values spilling past each end.
pub fn periodic_uniform_knots(control_count: usize, degree: usize) -> SplineResult<KnotVector> {
    if control_count <= degree {
        return Err(SplineError::DegenerateCurve {
            control_count,
            degree,
        });
    }

    let extended = control_count + 2 * degree;
    let span = 1.0 / (control_count + degree) as f64;
    let values = (0..extended + degree + 1)
        .map(|i| (i as f64 - degree as f64) * span)
        .collect();

    KnotVector::new(values, extended, degree)
}

/// `items` with its last `degree` entries prepended and first `degree` appended.
#[must_use]
pub fn wrap_periodic<T: Clone>(items: &[T], degree: usize) -> Vec<T> {
    let n = items.len();
    let wrap = degree.min(n);
    let mut wrapped = Vec::with_capacity(n + 2 * wrap);
    wrapped.extend_from_slice(&items[n - wrap..]);
    wrapped.extend_from_slice(items);
    wrapped.extend_from_slice(&items[..wrap]);
    wrapped
}

fn is_non_decreasing(knots: &[f64]) -> bool {
    knots.windows(2).all(|w| w[0] <= w[1])
}
