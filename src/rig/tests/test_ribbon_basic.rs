use std::sync::Arc;

use crate::geom::{Point3, Quat, Tolerance, Vec3};
use crate::rig::{
    Axis, ControlHandle, RibbonError, RibbonOptions, TransformProvider, WorldTransform,
    build_ribbon, build_ribbon_from_handles,
};
use crate::spline::{KnotForm, SplineError};

fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

fn line_handles(count: usize) -> Vec<ControlHandle> {
    (0..count)
        .map(|i| ControlHandle::at(format!("ctl{i}"), Point3::new(i as f64, 0.0, 0.0)))
        .collect()
}

fn cubic_line() -> (Vec<ControlHandle>, crate::rig::Ribbon) {
    let handles = line_handles(5);
    let ribbon = build_ribbon_from_handles(&handles, &RibbonOptions::with_joints(5).degree(3))
        .expect("ribbon built");
    (handles, ribbon)
}

#[test]
fn colinear_controls_place_joints_along_the_line() {
    let (_handles, ribbon) = cubic_line();
    let evaluation = ribbon.evaluate();
    assert!(evaluation.is_clean());
    assert_eq!(evaluation.transforms.len(), 5);

    let positions: Vec<Point3> = evaluation.transforms.iter().map(|t| t.position).collect();
    assert_eq!(positions[0], Point3::new(0.0, 0.0, 0.0));
    assert_eq!(positions[4], Point3::new(4.0, 0.0, 0.0));
    assert!(approx_eq(positions[2].x, 2.0, 1e-9));
    for p in &positions {
        assert!(approx_eq(p.y, 0.0, 1e-12) && approx_eq(p.z, 0.0, 1e-12));
    }
    assert!(positions.windows(2).all(|w| w[0].x < w[1].x));
}

#[test]
fn joint_weights_are_fixed_at_build() {
    let (_handles, ribbon) = cubic_line();
    let joints = ribbon.joints();
    assert_eq!(joints[0].weights().values(), &[1.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(joints[4].weights().values(), &[0.0, 0.0, 0.0, 0.0, 1.0]);
    assert!(approx_eq(joints[2].parameter(), 0.5, 1e-12));
    for joint in joints {
        assert!(joint.weights().is_partition_of_unity(Tolerance::LOOSE));
    }
}

#[test]
fn diagnostics_summarize_the_build() {
    let (_handles, ribbon) = cubic_line();
    let diag = ribbon.diagnostics();
    assert_eq!(diag.control_count, 5);
    assert_eq!(diag.degree, 3);
    assert_eq!(diag.knot_count, 9);
    assert_eq!(diag.joint_count, 5);
    assert!(approx_eq(diag.curve_length, 4.0, 1e-9));
    assert!(diag.max_partition_error < 1e-9);
    assert!(diag.warnings.is_empty());
}

#[test]
fn moving_a_control_only_moves_joints_that_weight_it() {
    let (handles, ribbon) = cubic_line();
    let before = ribbon.evaluate();

    assert_eq!(ribbon.joints_influenced_by(0), vec![0, 1]);
    assert_eq!(ribbon.joints_influenced_by(2), vec![1, 2, 3]);

    handles[0].set_position(Point3::new(0.0, 2.0, 0.0));
    let after = ribbon.evaluate();

    assert_eq!(after.transforms[0].position, Point3::new(0.0, 2.0, 0.0));
    assert!(after.transforms[1].position.y > 0.0);
    for joint in 2..5 {
        assert_eq!(after.transforms[joint], before.transforms[joint], "joint {joint}");
    }
}

#[test]
fn joints_track_control_rotation() {
    let (handles, ribbon) = cubic_line();
    let q = Quat::from_axis_angle(Vec3::X, 1.0).unwrap();
    handles[4].set_orientation(q);

    let evaluation = ribbon.evaluate();
    assert!(evaluation.transforms[4].orientation.angle_to(q) < 1e-9);
    assert!(evaluation.transforms[0].orientation.angle_to(Quat::IDENTITY) < 1e-12);
    let mid = evaluation.transforms[3].orientation.angle_to(Quat::IDENTITY);
    assert!(mid > 0.0 && mid < 1.0);
}

#[test]
fn stale_control_freezes_dependent_joints() {
    let (handles, ribbon) = cubic_line();
    handles[4].set_position(Point3::new(4.0, 1.0, 0.0));
    let moved = ribbon.evaluate();
    assert!(moved.is_clean());

    handles[4].remove();
    handles[3].set_position(Point3::new(3.0, -1.0, 0.0));
    let stale = ribbon.evaluate();

    let frozen: Vec<usize> = stale.warnings.iter().map(|w| w.joint).collect();
    assert_eq!(frozen, vec![3, 4]);
    assert!(stale.warnings.iter().all(|w| w.control == 4));
    assert_eq!(stale.warnings[0].name.as_deref(), Some("ctl4"));

    assert_eq!(stale.transforms[3], moved.transforms[3]);
    assert_eq!(stale.transforms[4], moved.transforms[4]);
    // joint 2 does not read control 4 and keeps following control 3
    assert!(stale.transforms[2].position.y < 0.0);
    assert_eq!(stale.transforms[0], moved.transforms[0]);
}

#[test]
fn stale_before_first_evaluation_keeps_build_pose() {
    let (handles, ribbon) = cubic_line();
    let rest = ribbon.joints()[4].driver().last_valid();
    assert_eq!(rest.position, Point3::new(4.0, 0.0, 0.0));

    handles[4].remove();
    assert_eq!(ribbon.joints()[4].transform(), rest);
    assert!(ribbon.joints()[4].driver().try_evaluate().is_err());
}

#[test]
fn live_closure_follows_controls() {
    let (handles, ribbon) = cubic_line();
    let tip = ribbon.joints()[4].live_transform();
    assert_eq!(tip().position, Point3::new(4.0, 0.0, 0.0));

    handles[4].set_position(Point3::new(4.0, 0.0, 3.0));
    assert_eq!(tip().position, Point3::new(4.0, 0.0, 3.0));

    let driver = Arc::clone(ribbon.joints()[0].driver()).into_fn();
    handles[0].set_position(Point3::new(-1.0, 0.0, 0.0));
    assert_eq!(driver().position, Point3::new(-1.0, 0.0, 0.0));
}

#[test]
fn zero_weight_controls_are_never_read() {
    let (handles, ribbon) = cubic_line();
    let driver = ribbon.joints()[0].driver();
    assert_eq!(driver.influences(), &[(0, 1.0)]);

    handles[3].remove();
    assert!(driver.try_evaluate().is_ok());
}

#[test]
fn default_degree_uses_every_control() {
    let handles = line_handles(4);
    let ribbon = build_ribbon_from_handles(&handles, &RibbonOptions::default()).unwrap();
    assert_eq!(ribbon.curve().degree(), 3);
    assert_eq!(ribbon.joints().len(), 5);
}

#[test]
fn periodic_ribbon_closes_on_itself() {
    let handles: Vec<ControlHandle> = (0..6)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::TAU / 6.0;
            ControlHandle::at(format!("ring{i}"), Point3::new(angle.cos(), angle.sin(), 0.0))
        })
        .collect();
    let ribbon =
        build_ribbon_from_handles(&handles, &RibbonOptions::closed(12).degree(3)).unwrap();
    assert_eq!(ribbon.curve().form(), KnotForm::Periodic);

    let evaluation = ribbon.evaluate();
    let first = evaluation.transforms[0].position;
    let last = evaluation.transforms[11].position;
    assert!(Tolerance::LOOSE.approx_eq_point3(first, last));

    for joint in ribbon.joints() {
        assert_eq!(joint.weights().len(), 6);
        assert!(joint.weights().is_partition_of_unity(Tolerance::LOOSE));
    }
    for control in 0..6 {
        assert!(!ribbon.joints_influenced_by(control).is_empty(), "control {control}");
    }
}

#[test]
fn arc_length_ribbon_spaces_joints_evenly() {
    let points = [0.0, 1.0, 10.0];
    let providers: Vec<Arc<dyn TransformProvider>> = points
        .iter()
        .map(|&x| {
            Arc::new(WorldTransform::from_position(Point3::new(x, 0.0, 0.0)))
                as Arc<dyn TransformProvider>
        })
        .collect();
    let options = RibbonOptions {
        arc_length_samples: Some(65),
        ..RibbonOptions::arc_length(5).degree(1)
    };
    let ribbon = build_ribbon(providers, &options).unwrap();
    let evaluation = ribbon.evaluate();
    for (i, transform) in evaluation.transforms.iter().enumerate() {
        assert!(approx_eq(transform.position.x, 2.5 * i as f64, 1e-9), "joint {i}");
    }
}

#[test]
fn build_rejects_bad_input() {
    let handles = line_handles(3);

    let err = build_ribbon_from_handles(&handles, &RibbonOptions::with_joints(1)).unwrap_err();
    assert_eq!(err, RibbonError::Spline(SplineError::InvalidSampleCount { requested: 1 }));

    let err =
        build_ribbon_from_handles(&handles, &RibbonOptions::with_joints(4).degree(3)).unwrap_err();
    assert_eq!(
        err,
        RibbonError::Spline(SplineError::DegenerateCurve {
            control_count: 3,
            degree: 3
        })
    );

    let options = RibbonOptions {
        aim_axis: Axis::PosZ,
        up_axis: Axis::NegZ,
        ..Default::default()
    };
    assert_eq!(
        build_ribbon_from_handles(&handles, &options).unwrap_err(),
        RibbonError::ParallelAxes {
            aim: Axis::PosZ,
            up: Axis::NegZ
        }
    );

    handles[1].remove();
    assert_eq!(
        build_ribbon_from_handles(&handles, &RibbonOptions::default()).unwrap_err(),
        RibbonError::MissingControl { index: 1 }
    );

    assert!(build_ribbon(Vec::new(), &RibbonOptions::default()).is_err());
}

fn wavy_handles(count: usize) -> Vec<ControlHandle> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            ControlHandle::at(format!("wave{i}"), Point3::new(x, (x * 0.9).sin(), 0.3 * x))
        })
        .collect()
}

#[test]
fn stored_weights_agree_with_influences() {
    let handles = wavy_handles(8);
    for options in [
        RibbonOptions::arc_length(23).degree(3),
        RibbonOptions::closed(17).degree(2),
        RibbonOptions::with_joints(11).degree(4),
    ] {
        let ribbon = build_ribbon_from_handles(&handles, &options).unwrap();
        for joint in ribbon.joints() {
            for control in 0..handles.len() {
                assert_eq!(
                    joint.weights().get(control) != 0.0,
                    joint.driver().depends_on(control),
                    "joint {} control {control}",
                    joint.index()
                );
            }
        }
    }
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_build_matches_per_joint_evaluation() {
    let handles = wavy_handles(9);
    handles[4].set_orientation(Quat::from_axis_angle(Vec3::Y, 0.6).unwrap());
    for options in [
        RibbonOptions::arc_length(33).degree(3),
        RibbonOptions::closed(24).degree(2),
    ] {
        let ribbon = build_ribbon_from_handles(&handles, &options).unwrap();
        for joint in ribbon.joints() {
            let expected = ribbon.curve().weights_at(joint.parameter()).unwrap().pruned();
            assert_eq!(joint.weights(), &expected, "joint {}", joint.index());
        }

        handles[2].set_position(Point3::new(2.0, 1.5, -0.4));
        let evaluation = ribbon.evaluate();
        let sequential: Vec<WorldTransform> = ribbon
            .joints()
            .iter()
            .map(|joint| joint.driver().try_evaluate().unwrap())
            .collect();
        assert_eq!(evaluation.transforms, sequential);
        assert!(evaluation.is_clean());
    }
}
