use std::fmt;

use super::provider::WorldTransform;
use crate::geom::{Point3, Quat, Tolerance, Vec3};

/// Signed local axis of a joint frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Axis {
    #[default]
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Axis {
    pub const ALL: [Self; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    #[must_use]
    pub const fn unit(self) -> Vec3 {
        match self {
            Self::PosX => Vec3::new(1.0, 0.0, 0.0),
            Self::NegX => Vec3::new(-1.0, 0.0, 0.0),
            Self::PosY => Vec3::new(0.0, 1.0, 0.0),
            Self::NegY => Vec3::new(0.0, -1.0, 0.0),
            Self::PosZ => Vec3::new(0.0, 0.0, 1.0),
            Self::NegZ => Vec3::new(0.0, 0.0, -1.0),
        }
    }

    /// Same line, either sign.
    #[must_use]
    pub const fn is_parallel_to(self, other: Self) -> bool {
        self.index() == other.index()
    }

    const fn index(self) -> usize {
        match self {
            Self::PosX | Self::NegX => 0,
            Self::PosY | Self::NegY => 1,
            Self::PosZ | Self::NegZ => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PosX => "+x",
            Self::NegX => "-x",
            Self::PosY => "+y",
            Self::NegY => "-y",
            Self::PosZ => "+z",
            Self::NegZ => "-z",
        }
    }

    /// Accepts `x`, `+x`, `-x`, `posx`, `negx` (any case) and the same for y and z.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        let (negative, name) = if let Some(rest) = token.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = token.strip_prefix("neg") {
            (true, rest.trim_start_matches('_'))
        } else if let Some(rest) = token.strip_prefix('+') {
            (false, rest)
        } else if let Some(rest) = token.strip_prefix("pos") {
            (false, rest.trim_start_matches('_'))
        } else {
            (false, token.as_str())
        };

        match (name, negative) {
            ("x", false) => Some(Self::PosX),
            ("x", true) => Some(Self::NegX),
            ("y", false) => Some(Self::PosY),
            ("y", true) => Some(Self::NegY),
            ("z", false) => Some(Self::PosZ),
            ("z", true) => Some(Self::NegZ),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a joint combines the orientations of its influencing controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationBlend {
    /// Slerp for two influences, normalized hemisphere-aligned sum otherwise.
    #[default]
    Quaternion,
    /// Blend each control's aim and up directions, then rebuild the frame.
    AimUp,
}

/// Weighted blend of control transforms.
///
/// Positions are the plain weighted sum. `weights` are expected to be
/// non-negative with a positive total; an empty input yields identity.
#[must_use]
pub fn blend_transforms(
    samples: &[(WorldTransform, f64)],
    aim: Axis,
    up: Axis,
    mode: OrientationBlend,
) -> WorldTransform {
    if samples.is_empty() {
        return WorldTransform::IDENTITY;
    }

    let position = Point3::weighted_sum(samples.iter().map(|(t, w)| (t.position, *w)));
    let orientation = match mode {
        OrientationBlend::Quaternion => blend_quaternions(samples),
        OrientationBlend::AimUp => {
            blend_aim_up(samples, aim, up).unwrap_or_else(|| blend_quaternions(samples))
        }
    };

    WorldTransform {
        position,
        orientation,
    }
}

/// Orientation average used by [`OrientationBlend::Quaternion`].
#[must_use]
pub fn blend_quaternions(samples: &[(WorldTransform, f64)]) -> Quat {
    match samples {
        [] => Quat::IDENTITY,
        [(only, _)] => only.orientation,
        [(a, wa), (b, wb)] => {
            let total = wa + wb;
            if Tolerance::ZERO_LENGTH.is_zero_length(total) {
                return a.orientation;
            }
            a.orientation.slerp(b.orientation, wb / total)
        }
        _ => {
            let reference = samples
                .iter()
                .max_by(|x, y| x.1.total_cmp(&y.1))
                .map_or(Quat::IDENTITY, |(t, _)| t.orientation);

            let mut sum = Quat::new(0.0, 0.0, 0.0, 0.0);
            for (transform, weight) in samples {
                let q = transform.orientation;
                let aligned = if q.dot(reference) < 0.0 { q.neg() } else { q };
                sum = sum.add(aligned.mul_scalar(*weight));
            }
            sum.normalized().unwrap_or(reference)
        }
    }
}

/// Orientation from blended aim and up directions; `None` when they collapse.
#[must_use]
pub fn blend_aim_up(samples: &[(WorldTransform, f64)], aim: Axis, up: Axis) -> Option<Quat> {
    let mut aim_dir = Vec3::ZERO;
    let mut up_dir = Vec3::ZERO;
    for (transform, weight) in samples {
        aim_dir = aim_dir.add(transform.axis(aim).mul_scalar(*weight));
        up_dir = up_dir.add(transform.axis(up).mul_scalar(*weight));
    }
    frame_from_aim_up(aim_dir, up_dir, aim, up)
}

/// Rotation taking local `aim` onto `aim_dir` with local `up` as close to
/// `up_dir` as orthogonality allows.
#[must_use]
pub fn frame_from_aim_up(aim_dir: Vec3, up_dir: Vec3, aim: Axis, up: Axis) -> Option<Quat> {
    if aim.is_parallel_to(up) {
        return None;
    }

    let a = aim_dir.normalized()?;
    let u = up_dir.sub(a.mul_scalar(up_dir.dot(a))).normalized()?;
    let c = a.cross(u);

    let local_aim = aim.unit();
    let local_up = up.unit();
    let local_cross = local_aim.cross(local_up);

    // R = a·Aᵀ + u·Uᵀ + c·Cᵀ, one column per local basis vector
    let column = |pick: fn(Vec3) -> f64| {
        a.mul_scalar(pick(local_aim))
            .add(u.mul_scalar(pick(local_up)))
            .add(c.mul_scalar(pick(local_cross)))
    };
    Some(Quat::from_axes(
        column(|v| v.x),
        column(|v| v.y),
        column(|v| v.z),
    ))
}
