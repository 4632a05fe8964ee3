use crate::geom::{Point3, Quat, Tolerance, Transform, Vec3};
use crate::rig::{Axis, ControlHandle, StaleReferenceWarning, TransformProvider, WorldTransform};

#[test]
fn from_matrix_strips_scale() {
    let q = Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.8).unwrap();
    let matrix = Transform::from_rotation_translation(q, Point3::new(1.0, -2.0, 3.0))
        * Transform::scale(2.0, 3.0, 0.5);

    let world = WorldTransform::from_matrix(matrix).expect("non-degenerate basis");
    assert_eq!(world.position, Point3::new(1.0, -2.0, 3.0));
    assert!(world.orientation.angle_to(q) < 1e-9);
}

#[test]
fn from_matrix_rejects_collapsed_basis() {
    assert!(WorldTransform::from_matrix(Transform::scale(0.0, 1.0, 1.0)).is_none());
    assert!(WorldTransform::from_matrix(Transform::scale(1.0, 1.0, 1.0)).is_some());
}

#[test]
fn to_matrix_roundtrip() {
    let q = Quat::from_axis_angle(Vec3::Y, -1.2).unwrap();
    let world = WorldTransform::new(Point3::new(0.5, 0.0, 4.0), q);
    let back = WorldTransform::from_matrix(world.to_matrix()).unwrap();
    assert!(Tolerance::DEFAULT.approx_eq_point3(back.position, world.position));
    assert!(back.orientation.angle_to(world.orientation) < 1e-9);
}

#[test]
fn axis_follows_orientation() {
    let q = Quat::from_axis_angle(Vec3::Z, std::f64::consts::FRAC_PI_2).unwrap();
    let world = WorldTransform::new(Point3::ORIGIN, q);
    assert!(Tolerance::DEFAULT.approx_eq_vec3(world.axis(Axis::PosX), Vec3::Y));
    assert!(Tolerance::DEFAULT.approx_eq_vec3(world.axis(Axis::NegY), Vec3::X));
}

#[test]
fn degenerate_orientation_becomes_identity() {
    let world = WorldTransform::new(Point3::ORIGIN, Quat::new(0.0, 0.0, 0.0, 0.0));
    assert_eq!(world.orientation, Quat::IDENTITY);
}

#[test]
fn handle_clones_share_state() {
    let handle = ControlHandle::at("hips", Point3::new(1.0, 0.0, 0.0));
    let view = handle.clone();

    assert!(handle.set_position(Point3::new(2.0, 0.0, 0.0)));
    assert_eq!(
        view.world_transform().map(|t| t.position),
        Some(Point3::new(2.0, 0.0, 0.0))
    );
    assert_eq!(TransformProvider::name(&view), Some("hips"));

    let q = Quat::from_axis_angle(Vec3::X, 0.5).unwrap();
    assert!(view.set_orientation(q));
    let current = handle.world_transform().unwrap();
    assert!(current.orientation.angle_to(q) < 1e-12);
    assert_eq!(current.position, Point3::new(2.0, 0.0, 0.0));
}

#[test]
fn removed_handle_stops_resolving() {
    let handle = ControlHandle::at("tip", Point3::ORIGIN);
    let provider = handle.provider();
    handle.remove();

    assert!(!handle.is_valid());
    assert!(provider.world_transform().is_none());
    assert!(!handle.set_position(Point3::new(1.0, 1.0, 1.0)));

    handle.set_world_transform(WorldTransform::from_position(Point3::new(5.0, 0.0, 0.0)));
    assert!(handle.is_valid());
    assert_eq!(
        provider.world_transform().map(|t| t.position),
        Some(Point3::new(5.0, 0.0, 0.0))
    );
}

#[test]
fn fixed_transform_always_resolves() {
    let fixed = WorldTransform::from_position(Point3::new(0.0, 3.0, 0.0));
    assert_eq!(fixed.world_transform(), Some(fixed));
    assert_eq!(fixed.name(), None);
}

#[test]
fn stale_warning_names_the_control() {
    let named = StaleReferenceWarning {
        joint: 3,
        control: 4,
        name: Some("tip".to_owned()),
    };
    assert_eq!(
        named.to_string(),
        "joint 3 froze: control 4 (tip) no longer resolves"
    );

    let anonymous = StaleReferenceWarning {
        joint: 0,
        control: 1,
        name: None,
    };
    assert_eq!(anonymous.to_string(), "joint 0 froze: control 1 no longer resolves");
}
