use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::blend::Axis;
use crate::geom::{Point3, Quat, Transform};

/// Rigid world transform: translation plus unit orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub position: Point3,
    pub orientation: Quat,
}

impl WorldTransform {
    pub const IDENTITY: Self = Self {
        position: Point3::ORIGIN,
        orientation: Quat::IDENTITY,
    };

    /// Normalizes `orientation`; a degenerate quaternion becomes identity.
    #[must_use]
    pub fn new(position: Point3, orientation: Quat) -> Self {
        Self {
            position,
            orientation: orientation.normalized().unwrap_or(Quat::IDENTITY),
        }
    }

    #[must_use]
    pub const fn from_position(position: Point3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Splits an affine matrix into translation and rotation.
    ///
    /// Scale and shear are dropped by Gram–Schmidt on the X and Y columns; the
    /// Z axis is rebuilt as `X × Y`, so mirrored inputs come back as proper
    /// rotations. Returns `None` for collapsed bases.
    #[must_use]
    pub fn from_matrix(matrix: Transform) -> Option<Self> {
        let x_axis = matrix.axis(0).normalized()?;
        let y_raw = matrix.axis(1);
        let y_axis = y_raw.sub(x_axis.mul_scalar(y_raw.dot(x_axis))).normalized()?;
        let z_axis = x_axis.cross(y_axis);
        Some(Self {
            position: matrix.origin(),
            orientation: Quat::from_axes(x_axis, y_axis, z_axis),
        })
    }

    #[must_use]
    pub fn to_matrix(self) -> Transform {
        Transform::from_rotation_translation(self.orientation, self.position)
    }

    /// World direction of a signed local axis.
    #[must_use]
    pub fn axis(self, axis: Axis) -> crate::geom::Vec3 {
        self.orientation.rotate_vec(axis.unit())
    }
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Source of a control's current world transform.
///
/// `None` means the reference no longer resolves (the node was deleted or
/// detached); ribbons treat that as a recoverable condition.
pub trait TransformProvider: Send + Sync {
    fn world_transform(&self) -> Option<WorldTransform>;

    fn name(&self) -> Option<&str> {
        None
    }
}

/// A fixed transform that never goes stale.
impl TransformProvider for WorldTransform {
    fn world_transform(&self) -> Option<WorldTransform> {
        Some(*self)
    }
}

/// Shared, mutable control transform.
///
/// Clones share state, so a host can keep one handle to animate the control
/// while the ribbon holds another.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    name: Arc<str>,
    state: Arc<RwLock<Option<WorldTransform>>>,
}

impl ControlHandle {
    #[must_use]
    pub fn new(name: impl Into<String>, transform: WorldTransform) -> Self {
        Self {
            name: Arc::from(name.into()),
            state: Arc::new(RwLock::new(Some(transform))),
        }
    }

    #[must_use]
    pub fn at(name: impl Into<String>, position: Point3) -> Self {
        Self::new(name, WorldTransform::from_position(position))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the transform; also revives a removed handle.
    pub fn set_world_transform(&self, transform: WorldTransform) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(transform);
    }

    /// Moves the control, keeping its orientation. Returns `false` if the
    /// handle was removed.
    pub fn set_position(&self, position: Point3) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.as_mut() {
            Some(transform) => {
                transform.position = position;
                true
            }
            None => false,
        }
    }

    /// Rotates the control in place. Returns `false` if the handle was removed.
    pub fn set_orientation(&self, orientation: Quat) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.as_mut() {
            Some(transform) => {
                transform.orientation = orientation.normalized().unwrap_or(Quat::IDENTITY);
                true
            }
            None => false,
        }
    }

    /// Invalidates the reference, as if the underlying node was deleted.
    pub fn remove(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Erases the handle into the provider type ribbons consume.
    #[must_use]
    pub fn provider(&self) -> Arc<dyn TransformProvider> {
        Arc::new(self.clone())
    }
}

impl TransformProvider for ControlHandle {
    fn world_transform(&self) -> Option<WorldTransform> {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// A control stopped resolving after the ribbon was built. The affected joint
/// keeps its last valid transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleReferenceWarning {
    pub joint: usize,
    pub control: usize,
    pub name: Option<String>,
}

impl fmt::Display for StaleReferenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(
                f,
                "joint {} froze: control {} ({name}) no longer resolves",
                self.joint, self.control
            ),
            None => write!(
                f,
                "joint {} froze: control {} no longer resolves",
                self.joint, self.control
            ),
        }
    }
}
