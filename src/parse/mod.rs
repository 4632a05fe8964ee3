//! Preset readers.

pub mod ribbon_xml;

pub use ribbon_xml::{
    ControlSpec, MAX_ARC_LENGTH_SAMPLES, MAX_JOINTS, ParseError, ParseResult, PresetRig,
    RibbonPreset, parse_str,
};
