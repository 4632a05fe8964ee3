//! B-spline machinery behind the ribbon: knot vectors, de Boor basis weights,
//! the curve over the control snapshot, and parameter sampling.
//!
//! The layers only depend downward:
//!
//! - `knots`: open/periodic uniform knot vectors and the periodic control wrap.
//! - `basis`: iterative Cox–de Boor evaluation with explicit level bounds.
//! - `curve`: [`RibbonCurve`], weights folded back onto the original controls.
//! - `sampler`: uniform and arc-length parameter placement.

mod basis;
mod curve;
mod knots;
mod sampler;

pub use basis::{BasisWeights, DeBoorBasis, evaluate_basis};
pub use curve::{Curve3, KnotForm, RibbonCurve};
pub use knots::{
    KnotLayout, KnotVector, build_knot_layout, open_uniform_knots, periodic_uniform_knots,
    wrap_periodic,
};
pub use sampler::{
    ArcLengthTable, SamplingMode, default_arc_length_samples, sample_parameters,
    sample_parameters_with_density,
};

/// Result type for spline construction and evaluation.
pub type SplineResult<T> = Result<T, SplineError>;

/// Structural errors raised while building or evaluating a spline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplineError {
    /// Fewer control points than `degree + 1`.
    #[error("curve of degree {degree} needs at least {} control points, got {control_count}", .degree.saturating_add(1))]
    DegenerateCurve { control_count: usize, degree: usize },
    /// Fewer than two output samples were requested.
    #[error("at least 2 samples are required, got {requested}")]
    InvalidSampleCount { requested: usize },
    /// The curve parameter is NaN or infinite.
    #[error("curve parameter must be finite")]
    NonFiniteParameter,
    /// The knot vector does not match `control_count + degree + 1`.
    #[error("knot vector length must be {expected}, got {actual}")]
    KnotLengthMismatch { expected: usize, actual: usize },
    /// The knot vector decreases somewhere (or contains NaN).
    #[error("knot vector must be non-decreasing")]
    DecreasingKnots,
}

#[cfg(test)]
mod tests;
