//! Reader for ribbon preset XML.
//!
//! ```xml
//! <ribbon name="spine" degree="3" joints="7" form="open" sampling="arc_length"
//!         aim="+x" up="+y" blend="quaternion">
//!   <control name="hips" x="0" y="0" z="0"/>
//!   <control name="chest" x="0" y="2" z="0" rx="0" ry="0" rz="0" rw="1"/>
//! </ribbon>
//! ```
//!
//! Every attribute on `<ribbon>` is optional and falls back to
//! [`RibbonOptions::default`]. Control orientation defaults to identity.

use std::collections::HashSet;

use quick_xml::de::from_str;
use serde::Deserialize;
use thiserror::Error;

use crate::geom::{Point3, Quat, Tolerance};
use crate::rig::{
    Axis, ControlHandle, OrientationBlend, Ribbon, RibbonError, RibbonOptions, WorldTransform,
    build_ribbon_from_handles,
};
use crate::spline::{KnotForm, SamplingMode};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub type ParseResult<T> = Result<T, ParseError>;

/// Upper bound for the `joints` attribute.
pub const MAX_JOINTS: usize = 4096;
/// Upper bound for the `samples` attribute; matches the derived density ceiling.
pub const MAX_ARC_LENGTH_SAMPLES: usize = 4096;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("expected a <ribbon> root element")]
    UnknownRoot,
    #[error("unknown value `{value}` for attribute `{attribute}`")]
    UnknownToken { attribute: &'static str, value: String },
    #[error("control `{control}` has a non-finite {attribute}")]
    NonFinite {
        control: String,
        attribute: &'static str,
    },
    #[error("attribute `{attribute}` is {value}, the limit is {max}")]
    OutOfRange {
        attribute: &'static str,
        value: usize,
        max: usize,
    },
    #[error("control name `{0}` is used more than once")]
    DuplicateControl(String),
    #[error(transparent)]
    Ribbon(#[from] RibbonError),
}

/// One control from a preset.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub name: String,
    pub transform: WorldTransform,
}

/// A parsed preset: ribbon options plus the initial control transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct RibbonPreset {
    pub name: Option<String>,
    pub options: RibbonOptions,
    pub controls: Vec<ControlSpec>,
}

/// Controls created from a preset together with the ribbon they drive.
#[derive(Debug)]
pub struct PresetRig {
    pub handles: Vec<ControlHandle>,
    pub ribbon: Ribbon,
}

impl PresetRig {
    #[must_use]
    pub fn handle(&self, name: &str) -> Option<&ControlHandle> {
        self.handles.iter().find(|handle| handle.name() == name)
    }

    #[must_use]
    pub fn control_index(&self, name: &str) -> Option<usize> {
        self.handles.iter().position(|handle| handle.name() == name)
    }
}

impl RibbonPreset {
    /// Fresh handles at the preset's transforms.
    #[must_use]
    pub fn handles(&self) -> Vec<ControlHandle> {
        self.controls
            .iter()
            .map(|spec| ControlHandle::new(spec.name.clone(), spec.transform))
            .collect()
    }

    pub fn build(&self) -> ParseResult<PresetRig> {
        let handles = self.handles();
        let ribbon = build_ribbon_from_handles(&handles, &self.options)?;
        Ok(PresetRig { handles, ribbon })
    }
}

/// Parses a ribbon preset document.
pub fn parse_str(input: &str) -> ParseResult<RibbonPreset> {
    if root_element_name(strip_xml_preamble(input)) != Some("ribbon") {
        return Err(ParseError::UnknownRoot);
    }

    let document: RibbonDocument = from_str(input)?;
    log::debug!(
        "ribbon preset {:?}: {} controls",
        document.name,
        document.controls.len()
    );

    let options = document.options()?;
    let controls = build_control_specs(document.controls)?;

    let mut seen = HashSet::with_capacity(controls.len());
    for spec in &controls {
        if !seen.insert(spec.name.as_str()) {
            return Err(ParseError::DuplicateControl(spec.name.clone()));
        }
    }

    Ok(RibbonPreset {
        name: document.name,
        options,
        controls,
    })
}

pub fn parse_knot_form(value: &str) -> ParseResult<KnotForm> {
    match value.trim().to_ascii_lowercase().as_str() {
        "open" => Ok(KnotForm::Open),
        "periodic" | "closed" => Ok(KnotForm::Periodic),
        _ => Err(unknown("form", value)),
    }
}

pub fn parse_sampling(value: &str) -> ParseResult<SamplingMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "uniform" | "parameter" => Ok(SamplingMode::Uniform),
        "arc_length" | "arclength" | "arc-length" => Ok(SamplingMode::ArcLength),
        _ => Err(unknown("sampling", value)),
    }
}

pub fn parse_blend(value: &str) -> ParseResult<OrientationBlend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "quaternion" | "quat" | "slerp" => Ok(OrientationBlend::Quaternion),
        "aim_up" | "aimup" | "aim-up" => Ok(OrientationBlend::AimUp),
        _ => Err(unknown("blend", value)),
    }
}

pub fn parse_axis(attribute: &'static str, value: &str) -> ParseResult<Axis> {
    Axis::from_token(value).ok_or_else(|| unknown(attribute, value))
}

fn unknown(attribute: &'static str, value: &str) -> ParseError {
    ParseError::UnknownToken {
        attribute,
        value: value.to_owned(),
    }
}

fn strip_xml_preamble(input: &str) -> &str {
    let trimmed = input.trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace());
    if let Some(rest) = trimmed.strip_prefix("<?xml") {
        if let Some(idx) = rest.find("?>") {
            return rest[idx + 2..].trim_start();
        }
    }
    trimmed
}

/// Name of the first element, skipping comments, doctypes and processing
/// instructions.
fn root_element_name(mut rest: &str) -> Option<&str> {
    loop {
        rest = rest.trim_start();
        let skip = if rest.starts_with("<!--") {
            rest.find("-->").map(|idx| idx + 3)
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            rest.find('>').map(|idx| idx + 1)
        } else {
            break;
        };
        rest = &rest[skip?..];
    }

    let tag = rest.strip_prefix('<')?;
    let end = tag
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(tag.len());
    Some(&tag[..end])
}

fn check_limit(attribute: &'static str, value: Option<usize>, max: usize) -> ParseResult<()> {
    match value {
        Some(value) if value > max => Err(ParseError::OutOfRange {
            attribute,
            value,
            max,
        }),
        _ => Ok(()),
    }
}

fn build_control_spec((index, control): (usize, XmlControl)) -> ParseResult<ControlSpec> {
    let name = control
        .name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("control{index}"));

    let position = Point3::new(control.x, control.y, control.z);
    if !position.is_finite() {
        return Err(ParseError::NonFinite {
            control: name,
            attribute: "position",
        });
    }

    let rotation = Quat::new(control.rx, control.ry, control.rz, control.rw);
    let finite = [rotation.x, rotation.y, rotation.z, rotation.w]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err(ParseError::NonFinite {
            control: name,
            attribute: "rotation",
        });
    }

    Ok(ControlSpec {
        name,
        transform: WorldTransform::new(position, rotation),
    })
}

#[cfg(feature = "parallel")]
fn build_control_specs(controls: Vec<XmlControl>) -> ParseResult<Vec<ControlSpec>> {
    controls
        .into_par_iter()
        .enumerate()
        .map(build_control_spec)
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn build_control_specs(controls: Vec<XmlControl>) -> ParseResult<Vec<ControlSpec>> {
    controls
        .into_iter()
        .enumerate()
        .map(build_control_spec)
        .collect()
}

#[derive(Debug, Deserialize)]
struct RibbonDocument {
    #[serde(default, rename = "@name")]
    name: Option<String>,
    #[serde(default, rename = "@degree")]
    degree: Option<usize>,
    #[serde(default, rename = "@joints")]
    joints: Option<usize>,
    #[serde(default, rename = "@form")]
    form: Option<String>,
    #[serde(default, rename = "@sampling")]
    sampling: Option<String>,
    #[serde(default, rename = "@aim")]
    aim: Option<String>,
    #[serde(default, rename = "@up")]
    up: Option<String>,
    #[serde(default, rename = "@blend")]
    blend: Option<String>,
    #[serde(default, rename = "@tolerance")]
    tolerance: Option<f64>,
    #[serde(default, rename = "@samples")]
    arc_length_samples: Option<usize>,
    #[serde(default, rename = "control")]
    controls: Vec<XmlControl>,
}

impl RibbonDocument {
    fn options(&self) -> ParseResult<RibbonOptions> {
        check_limit("joints", self.joints, MAX_JOINTS)?;
        check_limit("samples", self.arc_length_samples, MAX_ARC_LENGTH_SAMPLES)?;

        let defaults = RibbonOptions::default();
        let tolerance = match self.tolerance {
            Some(eps) if eps.is_finite() && eps > 0.0 => Tolerance::new(eps),
            Some(eps) => return Err(unknown("tolerance", &eps.to_string())),
            None => defaults.tolerance,
        };

        Ok(RibbonOptions {
            degree: self.degree,
            num_joints: self.joints.unwrap_or(defaults.num_joints),
            form: self
                .form
                .as_deref()
                .map_or(Ok(defaults.form), parse_knot_form)?,
            sampling: self
                .sampling
                .as_deref()
                .map_or(Ok(defaults.sampling), parse_sampling)?,
            aim_axis: self
                .aim
                .as_deref()
                .map_or(Ok(defaults.aim_axis), |v| parse_axis("aim", v))?,
            up_axis: self
                .up
                .as_deref()
                .map_or(Ok(defaults.up_axis), |v| parse_axis("up", v))?,
            orientation: self
                .blend
                .as_deref()
                .map_or(Ok(defaults.orientation), parse_blend)?,
            tolerance,
            arc_length_samples: self.arc_length_samples,
        })
    }
}

#[derive(Debug, Deserialize)]
struct XmlControl {
    #[serde(default, rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@x")]
    x: f64,
    #[serde(rename = "@y")]
    y: f64,
    #[serde(rename = "@z")]
    z: f64,
    #[serde(default, rename = "@rx")]
    rx: f64,
    #[serde(default, rename = "@ry")]
    ry: f64,
    #[serde(default, rename = "@rz")]
    rz: f64,
    #[serde(default = "unit_w", rename = "@rw")]
    rw: f64,
}

fn unit_w() -> f64 {
    1.0
}
