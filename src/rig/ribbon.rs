use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::blend::{Axis, OrientationBlend, blend_transforms};
use super::provider::{ControlHandle, StaleReferenceWarning, TransformProvider, WorldTransform};
use super::{RibbonError, RibbonResult};
use crate::geom::{Point3, Tolerance};
use crate::spline::{
    ArcLengthTable, BasisWeights, KnotForm, RibbonCurve, SamplingMode, SplineError, SplineResult,
    default_arc_length_samples, sample_parameters_with_density,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Build-time settings for [`build_ribbon`].
#[derive(Debug, Clone, PartialEq)]
pub struct RibbonOptions {
    /// Spline degree; `None` uses `control_count - 1`.
    pub degree: Option<usize>,
    pub num_joints: usize,
    pub form: KnotForm,
    pub sampling: SamplingMode,
    pub aim_axis: Axis,
    pub up_axis: Axis,
    pub orientation: OrientationBlend,
    pub tolerance: Tolerance,
    /// Arc-length table density; `None` derives it from `num_joints`.
    pub arc_length_samples: Option<usize>,
}

impl Default for RibbonOptions {
    fn default() -> Self {
        Self {
            degree: None,
            num_joints: 5,
            form: KnotForm::Open,
            sampling: SamplingMode::Uniform,
            aim_axis: Axis::PosX,
            up_axis: Axis::PosY,
            orientation: OrientationBlend::Quaternion,
            tolerance: Tolerance::DEFAULT,
            arc_length_samples: None,
        }
    }
}

impl RibbonOptions {
    #[must_use]
    pub fn with_joints(num_joints: usize) -> Self {
        Self {
            num_joints,
            ..Default::default()
        }
    }

    /// Closed loop through all controls.
    #[must_use]
    pub fn closed(num_joints: usize) -> Self {
        Self {
            num_joints,
            form: KnotForm::Periodic,
            ..Default::default()
        }
    }

    /// Joints evenly spaced by distance instead of parameter.
    #[must_use]
    pub fn arc_length(num_joints: usize) -> Self {
        Self {
            num_joints,
            sampling: SamplingMode::ArcLength,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn degree(mut self, degree: usize) -> Self {
        self.degree = Some(degree);
        self
    }

    #[must_use]
    pub fn resolved_degree(&self, control_count: usize) -> usize {
        self.degree.unwrap_or(control_count.saturating_sub(1))
    }

    #[must_use]
    pub fn resolved_arc_length_samples(&self) -> usize {
        self.arc_length_samples
            .unwrap_or_else(|| default_arc_length_samples(self.num_joints))
    }
}

/// A control as seen by the ribbon: its source and build-time position.
#[derive(Clone)]
pub struct ControlPoint {
    index: usize,
    position: Point3,
    source: Arc<dyn TransformProvider>,
}

impl ControlPoint {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Position captured when the ribbon was built.
    #[must_use]
    pub const fn position(&self) -> Point3 {
        self.position
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn TransformProvider> {
        &self.source
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.source.name()
    }

    #[must_use]
    pub fn current(&self) -> Option<WorldTransform> {
        self.source.world_transform()
    }
}

impl fmt::Debug for ControlPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlPoint")
            .field("index", &self.index)
            .field("name", &self.name())
            .field("position", &self.position)
            .finish()
    }
}

/// Live evaluation of one output joint.
///
/// Holds only the controls with non-zero weight. Each evaluation reads their
/// current transforms; if any of them no longer resolves the joint keeps the
/// last transform it produced.
pub struct JointDriver {
    joint: usize,
    influences: Vec<(usize, f64)>,
    controls: Arc<[ControlPoint]>,
    aim_axis: Axis,
    up_axis: Axis,
    orientation: OrientationBlend,
    last_valid: Mutex<WorldTransform>,
}

impl JointDriver {
    #[must_use]
    pub const fn joint(&self) -> usize {
        self.joint
    }

    /// `(control index, weight)` pairs this joint reads.
    #[must_use]
    pub fn influences(&self) -> &[(usize, f64)] {
        &self.influences
    }

    #[must_use]
    pub fn depends_on(&self, control: usize) -> bool {
        self.influences.iter().any(|&(index, _)| index == control)
    }

    #[must_use]
    pub fn last_valid(&self) -> WorldTransform {
        *self.last_valid.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blends current control transforms and records the result.
    pub fn try_evaluate(&self) -> Result<WorldTransform, StaleReferenceWarning> {
        let mut samples = Vec::with_capacity(self.influences.len());
        for &(control, weight) in &self.influences {
            let point = &self.controls[control];
            let current = point.current().ok_or_else(|| StaleReferenceWarning {
                joint: self.joint,
                control,
                name: point.name().map(str::to_owned),
            })?;
            samples.push((current, weight));
        }

        let blended = blend_transforms(&samples, self.aim_axis, self.up_axis, self.orientation);
        *self.last_valid.lock().unwrap_or_else(PoisonError::into_inner) = blended;
        Ok(blended)
    }

    /// Current transform, or the last valid one if a control went stale.
    pub fn evaluate(&self) -> WorldTransform {
        match self.try_evaluate() {
            Ok(transform) => transform,
            Err(warning) => {
                log::warn!("{warning}");
                self.last_valid()
            }
        }
    }

    /// Boxes the driver as a plain closure for hosts that store callbacks.
    #[must_use]
    pub fn into_fn(self: Arc<Self>) -> Box<dyn Fn() -> WorldTransform + Send + Sync> {
        Box::new(move || self.evaluate())
    }
}

impl fmt::Debug for JointDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JointDriver")
            .field("joint", &self.joint)
            .field("influences", &self.influences)
            .field("orientation", &self.orientation)
            .finish_non_exhaustive()
    }
}

/// A joint placed on the ribbon and the weights that drive it.
#[derive(Debug, Clone)]
pub struct OutputJoint {
    index: usize,
    parameter: f64,
    weights: BasisWeights,
    driver: Arc<JointDriver>,
}

impl OutputJoint {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Curve parameter the joint was sampled at.
    #[must_use]
    pub const fn parameter(&self) -> f64 {
        self.parameter
    }

    /// One weight per control, zeros included. Weights too small to count
    /// as an influence are stored as exact zeros.
    #[must_use]
    pub fn weights(&self) -> &BasisWeights {
        &self.weights
    }

    #[must_use]
    pub fn driver(&self) -> &Arc<JointDriver> {
        &self.driver
    }

    pub fn transform(&self) -> WorldTransform {
        self.driver.evaluate()
    }

    /// Detached closure that re-evaluates the joint on every call.
    #[must_use]
    pub fn live_transform(&self) -> Box<dyn Fn() -> WorldTransform + Send + Sync> {
        Arc::clone(&self.driver).into_fn()
    }
}

/// Summary numbers recorded while building a ribbon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RibbonDiagnostics {
    pub control_count: usize,
    pub degree: usize,
    pub knot_count: usize,
    pub joint_count: usize,
    /// Chord length of the build-time curve over its sampling interval.
    pub curve_length: f64,
    /// Largest `|Σw - 1|` over all joints.
    pub max_partition_error: f64,
    pub warnings: Vec<String>,
}

/// Transforms of every joint after one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RibbonEvaluation {
    pub transforms: Vec<WorldTransform>,
    pub warnings: Vec<StaleReferenceWarning>,
}

impl RibbonEvaluation {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Joints distributed along a spline through live controls.
#[derive(Debug)]
pub struct Ribbon {
    curve: RibbonCurve,
    controls: Arc<[ControlPoint]>,
    joints: Vec<OutputJoint>,
    options: RibbonOptions,
    diagnostics: RibbonDiagnostics,
}

impl Ribbon {
    #[must_use]
    pub fn curve(&self) -> &RibbonCurve {
        &self.curve
    }

    #[must_use]
    pub fn controls(&self) -> &[ControlPoint] {
        &self.controls
    }

    #[must_use]
    pub fn joints(&self) -> &[OutputJoint] {
        &self.joints
    }

    #[must_use]
    pub fn options(&self) -> &RibbonOptions {
        &self.options
    }

    #[must_use]
    pub fn diagnostics(&self) -> &RibbonDiagnostics {
        &self.diagnostics
    }

    /// Joints whose weight on `control` is non-zero.
    #[must_use]
    pub fn joints_influenced_by(&self, control: usize) -> Vec<usize> {
        self.joints
            .iter()
            .filter(|joint| joint.driver.depends_on(control))
            .map(OutputJoint::index)
            .collect()
    }

    /// Evaluates all joints against the controls' current transforms.
    pub fn evaluate(&self) -> RibbonEvaluation {
        let results = evaluate_drivers(&self.joints);

        let mut evaluation = RibbonEvaluation {
            transforms: Vec::with_capacity(results.len()),
            warnings: Vec::new(),
        };
        for (joint, result) in self.joints.iter().zip(results) {
            match result {
                Ok(transform) => evaluation.transforms.push(transform),
                Err(warning) => {
                    log::warn!("{warning}");
                    evaluation.transforms.push(joint.driver.last_valid());
                    evaluation.warnings.push(warning);
                }
            }
        }
        evaluation
    }
}

/// Builds a ribbon over `controls` in order.
///
/// Every control must resolve at build time; the resolved positions define
/// the curve used for sampling. Joint parameters and weights are fixed from
/// then on, while joint transforms follow the controls live.
pub fn build_ribbon(
    controls: Vec<Arc<dyn TransformProvider>>,
    options: &RibbonOptions,
) -> RibbonResult<Ribbon> {
    if options.num_joints < 2 {
        return Err(SplineError::InvalidSampleCount {
            requested: options.num_joints,
        }
        .into());
    }
    if options.aim_axis.is_parallel_to(options.up_axis) {
        return Err(RibbonError::ParallelAxes {
            aim: options.aim_axis,
            up: options.up_axis,
        });
    }

    let degree = options.resolved_degree(controls.len());
    if controls.len() <= degree {
        return Err(SplineError::DegenerateCurve {
            control_count: controls.len(),
            degree,
        }
        .into());
    }

    let mut snapshot = Vec::with_capacity(controls.len());
    for (index, source) in controls.iter().enumerate() {
        let transform = source
            .world_transform()
            .ok_or(RibbonError::MissingControl { index })?;
        snapshot.push(transform);
    }

    let positions = snapshot.iter().map(|t| t.position).collect();
    let curve = RibbonCurve::new(positions, degree, options.form, options.tolerance)?;
    let table_samples = options.resolved_arc_length_samples();
    let parameters =
        sample_parameters_with_density(&curve, options.num_joints, options.sampling, table_samples)?;
    let weights = weights_for(&curve, &parameters)?;

    let controls: Arc<[ControlPoint]> = controls
        .into_iter()
        .zip(&snapshot)
        .enumerate()
        .map(|(index, (source, transform))| ControlPoint {
            index,
            position: transform.position,
            source,
        })
        .collect();

    let mut diagnostics = RibbonDiagnostics {
        control_count: controls.len(),
        degree,
        knot_count: curve.knots().len(),
        joint_count: options.num_joints,
        curve_length: ArcLengthTable::build(&curve, table_samples).total_length(),
        ..Default::default()
    };

    let mut joints = Vec::with_capacity(options.num_joints);
    for (index, weights) in weights.into_iter().enumerate() {
        let error = (weights.sum() - 1.0).abs();
        diagnostics.max_partition_error = diagnostics.max_partition_error.max(error);
        if error > Tolerance::LOOSE.eps {
            diagnostics
                .warnings
                .push(format!("joint {index}: weights sum to {:.9}", weights.sum()));
        }

        let weights = weights.pruned();
        let influences: Vec<(usize, f64)> = weights.influences().collect();
        let initial: Vec<(WorldTransform, f64)> = influences
            .iter()
            .map(|&(control, weight)| (snapshot[control], weight))
            .collect();
        let rest = blend_transforms(&initial, options.aim_axis, options.up_axis, options.orientation);

        let driver = JointDriver {
            joint: index,
            influences,
            controls: Arc::clone(&controls),
            aim_axis: options.aim_axis,
            up_axis: options.up_axis,
            orientation: options.orientation,
            last_valid: Mutex::new(rest),
        };
        joints.push(OutputJoint {
            index,
            parameter: weights.parameter(),
            weights,
            driver: Arc::new(driver),
        });
    }

    log::debug!(
        "ribbon built: {} controls, degree {degree}, {:?}, {} joints, length {:.6}",
        diagnostics.control_count,
        options.form,
        diagnostics.joint_count,
        diagnostics.curve_length
    );

    Ok(Ribbon {
        curve,
        controls,
        joints,
        options: options.clone(),
        diagnostics,
    })
}

/// [`build_ribbon`] over shared control handles.
pub fn build_ribbon_from_handles(
    handles: &[ControlHandle],
    options: &RibbonOptions,
) -> RibbonResult<Ribbon> {
    build_ribbon(handles.iter().map(ControlHandle::provider).collect(), options)
}

#[cfg(feature = "parallel")]
fn weights_for(curve: &RibbonCurve, parameters: &[f64]) -> SplineResult<Vec<BasisWeights>> {
    parameters.par_iter().map(|&t| curve.weights_at(t)).collect()
}

#[cfg(not(feature = "parallel"))]
fn weights_for(curve: &RibbonCurve, parameters: &[f64]) -> SplineResult<Vec<BasisWeights>> {
    parameters.iter().map(|&t| curve.weights_at(t)).collect()
}

#[cfg(feature = "parallel")]
fn evaluate_drivers(joints: &[OutputJoint]) -> Vec<Result<WorldTransform, StaleReferenceWarning>> {
    joints.par_iter().map(|joint| joint.driver.try_evaluate()).collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_drivers(joints: &[OutputJoint]) -> Vec<Result<WorldTransform, StaleReferenceWarning>> {
    joints.iter().map(|joint| joint.driver.try_evaluate()).collect()
}
