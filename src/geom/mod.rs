//! Small fixed-size math kernel shared by the spline and rig layers.

mod core;

pub use core::{Point3, Quat, Tolerance, Transform, Vec3};
