#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]

//! Spline ribbon deformation engine.
//!
//! Output joints are spread along a B-spline through a set of moving control
//! transforms and follow those controls live. [`spline`] holds the curve
//! math, [`rig`] the live joints, [`parse`] the XML presets, and
//! [`RibbonEngine`] wraps a preset for the browser.

pub mod geom;
pub mod parse;
pub mod rig;
pub mod spline;

use std::fmt;

use parse::PresetRig;
use rig::{RibbonEvaluation, WorldTransform};
use serde::Serialize;
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

pub use geom::{Point3, Quat, Tolerance, Transform, Vec3};
pub use rig::{
    Axis, ControlHandle, OrientationBlend, Ribbon, RibbonError, RibbonOptions, TransformProvider,
    build_ribbon,
};
pub use spline::{KnotForm, SamplingMode, SplineError};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| {
            std::thread::available_parallelism()
                .map(|value| value.get())
                .ok()
        })
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("could not start rayon thread pool: {err}")))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlExport {
    pub name: String,
    pub index: usize,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointExport {
    pub index: usize,
    pub parameter: f64,
    pub position: [f64; 3],
    /// `[x, y, z, w]`
    pub orientation: [f64; 4],
    /// Held at its last valid transform because a control went stale.
    pub frozen: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationExport {
    pub joints: Vec<JointExport>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightsExport {
    pub joint: usize,
    pub weights: Vec<f64>,
}

/// Browser-facing wrapper around one preset rig.
#[wasm_bindgen]
pub struct RibbonEngine {
    rig: Option<PresetRig>,
    last: Option<EvaluationExport>,
}

impl Default for RibbonEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl RibbonEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> RibbonEngine {
        RibbonEngine {
            rig: None,
            last: None,
        }
    }

    #[wasm_bindgen]
    pub fn is_loaded(&self) -> bool {
        self.rig.is_some()
    }

    /// Parses a preset and builds its ribbon, replacing any loaded rig.
    #[wasm_bindgen]
    pub fn load_preset(&mut self, xml: &str) -> Result<(), JsValue> {
        let rig = parse::parse_str(xml)
            .and_then(|preset| preset.build())
            .map_err(to_js_error)?;
        self.rig = Some(rig);
        self.last = None;
        Ok(())
    }

    #[wasm_bindgen]
    pub fn set_control_position(&mut self, name: &str, x: f64, y: f64, z: f64) -> Result<(), JsValue> {
        self.move_control(name, Point3::new(x, y, z)).map_err(|err| js_error(&err))
    }

    #[wasm_bindgen]
    pub fn set_control_rotation(
        &mut self,
        name: &str,
        x: f64,
        y: f64,
        z: f64,
        w: f64,
    ) -> Result<(), JsValue> {
        self.rotate_control(name, Quat::new(x, y, z, w))
            .map_err(|err| js_error(&err))
    }

    /// Invalidates a control; dependent joints freeze on the next evaluation.
    #[wasm_bindgen]
    pub fn remove_control(&mut self, name: &str) -> Result<(), JsValue> {
        self.delete_control(name).map_err(|err| js_error(&err))
    }

    #[wasm_bindgen]
    pub fn get_controls(&self) -> Result<JsValue, JsValue> {
        let controls = self.controls().map_err(|err| js_error(&err))?;
        serde_wasm_bindgen::to_value(&controls).map_err(|err| JsError::new(&err.to_string()).into())
    }

    /// Evaluates the joints and returns `{ joints, warnings }`.
    #[wasm_bindgen]
    pub fn evaluate(&mut self) -> Result<JsValue, JsValue> {
        let export = self.evaluate_export().map_err(|err| js_error(&err))?;
        serde_wasm_bindgen::to_value(export).map_err(|err| JsError::new(&err.to_string()).into())
    }

    #[wasm_bindgen]
    pub fn get_weights(&self) -> Result<JsValue, JsValue> {
        let weights = self.weights().map_err(|err| js_error(&err))?;
        serde_wasm_bindgen::to_value(&weights).map_err(|err| JsError::new(&err.to_string()).into())
    }
}

impl RibbonEngine {
    #[must_use]
    pub fn rig(&self) -> Option<&PresetRig> {
        self.rig.as_ref()
    }

    pub fn move_control(&mut self, name: &str, position: Point3) -> Result<(), String> {
        if !position.is_finite() {
            return Err("control position must be finite".to_owned());
        }
        let handle = self.find_handle(name)?;
        if !handle.set_position(position) {
            return Err(format!("control `{name}` was removed"));
        }
        Ok(())
    }

    pub fn rotate_control(&mut self, name: &str, rotation: Quat) -> Result<(), String> {
        let Some(rotation) = rotation.normalized() else {
            return Err("control rotation must be a non-zero quaternion".to_owned());
        };
        let handle = self.find_handle(name)?;
        if !handle.set_orientation(rotation) {
            return Err(format!("control `{name}` was removed"));
        }
        Ok(())
    }

    pub fn delete_control(&mut self, name: &str) -> Result<(), String> {
        self.find_handle(name)?.remove();
        Ok(())
    }

    pub fn controls(&self) -> Result<Vec<ControlExport>, String> {
        let rig = self.loaded()?;
        Ok(rig
            .handles
            .iter()
            .enumerate()
            .map(|(index, handle)| {
                let current = handle.world_transform();
                ControlExport {
                    name: handle.name().to_owned(),
                    index,
                    valid: current.is_some(),
                    position: current.map(|t| t.position.to_array()),
                }
            })
            .collect())
    }

    /// Evaluates against the controls' current transforms. Handles reached
    /// through [`RibbonEngine::rig`] may move controls behind the engine's
    /// back, so nothing is cached between calls.
    pub fn evaluate_export(&mut self) -> Result<&EvaluationExport, String> {
        let rig = self.rig.as_ref().ok_or_else(no_preset)?;
        let evaluation = rig.ribbon.evaluate();
        Ok(&*self.last.insert(export_evaluation(rig, &evaluation)))
    }

    pub fn weights(&self) -> Result<Vec<WeightsExport>, String> {
        let rig = self.loaded()?;
        Ok(rig
            .ribbon
            .joints()
            .iter()
            .map(|joint| WeightsExport {
                joint: joint.index(),
                weights: joint.weights().values().to_vec(),
            })
            .collect())
    }

    fn loaded(&self) -> Result<&PresetRig, String> {
        self.rig.as_ref().ok_or_else(no_preset)
    }

    fn find_handle(&self, name: &str) -> Result<&ControlHandle, String> {
        let rig = self.loaded()?;
        let trimmed = name.trim();
        rig.handle(trimmed)
            .or_else(|| {
                rig.handles
                    .iter()
                    .find(|handle| handle.name().eq_ignore_ascii_case(trimmed))
            })
            .ok_or_else(|| format!("unknown control `{trimmed}`"))
    }
}

fn export_evaluation(rig: &PresetRig, evaluation: &RibbonEvaluation) -> EvaluationExport {
    let joints = rig
        .ribbon
        .joints()
        .iter()
        .zip(&evaluation.transforms)
        .map(|(joint, transform)| JointExport {
            index: joint.index(),
            parameter: joint.parameter(),
            position: transform.position.to_array(),
            orientation: quat_to_array(transform),
            frozen: evaluation.warnings.iter().any(|w| w.joint == joint.index()),
        })
        .collect();

    EvaluationExport {
        joints,
        warnings: evaluation.warnings.iter().map(ToString::to_string).collect(),
    }
}

fn quat_to_array(transform: &WorldTransform) -> [f64; 4] {
    let q = transform.orientation;
    [q.x, q.y, q.z, q.w]
}

fn no_preset() -> String {
    "no ribbon preset is loaded".to_owned()
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}
