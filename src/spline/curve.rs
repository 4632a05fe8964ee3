use super::basis::{BasisWeights, evaluate_basis};
use super::knots::{KnotLayout, KnotVector, build_knot_layout};
use super::SplineResult;
use crate::geom::{Point3, Tolerance};

/// Knot vector family of a ribbon curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KnotForm {
    /// Clamped: the curve starts on the first control and ends on the last.
    #[default]
    Open,
    /// Closed loop without a curvature seam.
    Periodic,
}

/// A parametric curve that can be point-sampled over its domain.
pub trait Curve3 {
    fn point_at(&self, t: f64) -> Point3;

    #[must_use]
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    #[must_use]
    fn is_closed(&self) -> bool {
        false
    }
}

/// B-spline over a snapshot of control positions.
///
/// The snapshot only feeds geometric queries (arc length, debug output).
/// Live joint transforms blend the controls' current transforms with the
/// weights from [`RibbonCurve::weights_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct RibbonCurve {
    layout: KnotLayout,
    positions: Vec<Point3>,
    tolerance: Tolerance,
}

impl RibbonCurve {
    pub fn new(
        positions: Vec<Point3>,
        degree: usize,
        form: KnotForm,
        tolerance: Tolerance,
    ) -> SplineResult<Self> {
        let layout = build_knot_layout(form, positions.len(), degree)?;
        Ok(Self {
            layout,
            positions,
            tolerance,
        })
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.layout.knots.degree()
    }

    #[must_use]
    pub fn form(&self) -> KnotForm {
        self.layout.form
    }

    #[must_use]
    pub fn knots(&self) -> &KnotVector {
        &self.layout.knots
    }

    /// Original control index for every slot of the (possibly wrapped) sequence.
    #[must_use]
    pub fn sequence(&self) -> &[usize] {
        &self.layout.sequence
    }

    #[must_use]
    pub fn control_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    #[must_use]
    pub const fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Basis weights at `t`, one per original control.
    pub fn weights_at(&self, t: f64) -> SplineResult<BasisWeights> {
        let knots = &self.layout.knots;
        let extended = evaluate_basis(
            knots.control_count(),
            knots.degree(),
            t,
            knots.values(),
            self.tolerance,
        )?;

        Ok(match self.layout.form {
            KnotForm::Open => extended,
            KnotForm::Periodic => BasisWeights::fold(
                extended.parameter(),
                extended.values(),
                &self.layout.sequence,
                self.positions.len(),
            ),
        })
    }

    /// Parameter interval holding exactly one pass over the controls.
    ///
    /// Open curves use the whole `[0, 1]` domain. Periodic curves drop half of
    /// the wrap margin at each end, which leaves `n` knot spans between the
    /// two bounds.
    #[must_use]
    pub fn sampling_interval(&self) -> (f64, f64) {
        match self.layout.form {
            KnotForm::Open => self.layout.knots.domain(),
            KnotForm::Periodic => {
                let values = self.layout.knots.values();
                let degree = self.degree();
                let span = values[degree + 1] - values[degree];
                let margin = 0.5 * degree as f64 * span;
                let (start, end) = self.layout.knots.domain();
                (start + margin, end - margin)
            }
        }
    }

    /// Position on the snapshot curve for an already computed weight vector.
    #[must_use]
    pub fn blend_positions(&self, weights: &BasisWeights) -> Point3 {
        Point3::weighted_sum(
            weights
                .influences()
                .map(|(index, weight)| (self.positions[index], weight)),
        )
    }

    fn checked_point_at(&self, t: f64) -> SplineResult<Point3> {
        let weights = self.weights_at(t)?;
        Ok(self.blend_positions(&weights))
    }
}

impl Curve3 for RibbonCurve {
    fn point_at(&self, t: f64) -> Point3 {
        let t = if t.is_finite() { t } else { self.sampling_interval().0 };
        // knots are validated on construction, so only a bad parameter can fail
        self.checked_point_at(t).unwrap_or(self.positions[0])
    }

    fn domain(&self) -> (f64, f64) {
        self.sampling_interval()
    }

    fn is_closed(&self) -> bool {
        self.layout.form == KnotForm::Periodic
    }
}
