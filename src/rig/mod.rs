//! Ribbon rigging: output joints riding a spline through live controls.
//!
//! A [`Ribbon`] is built once from an ordered list of [`TransformProvider`]s.
//! Building resolves every control, lays out the knot vector, places the
//! joints and freezes each joint's basis weights. After that, every joint is
//! driven by a [`JointDriver`] that blends the *current* transforms of the
//! controls it depends on, so moving a control only touches the joints that
//! weight it.

mod blend;
mod provider;
mod ribbon;

pub use blend::{
    Axis, OrientationBlend, blend_aim_up, blend_quaternions, blend_transforms, frame_from_aim_up,
};
pub use provider::{ControlHandle, StaleReferenceWarning, TransformProvider, WorldTransform};
pub use ribbon::{
    ControlPoint, JointDriver, OutputJoint, Ribbon, RibbonDiagnostics, RibbonEvaluation,
    RibbonOptions, build_ribbon, build_ribbon_from_handles,
};

use crate::spline::SplineError;

pub type RibbonResult<T> = Result<T, RibbonError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RibbonError {
    #[error(transparent)]
    Spline(#[from] SplineError),
    #[error("aim axis {aim} and up axis {up} are parallel")]
    ParallelAxes { aim: Axis, up: Axis },
    #[error("control {index} has no world transform")]
    MissingControl { index: usize },
}

#[cfg(test)]
mod tests;
