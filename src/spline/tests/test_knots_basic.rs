use crate::spline::{
    KnotForm, KnotVector, SplineError, build_knot_layout, open_uniform_knots,
    periodic_uniform_knots, wrap_periodic,
};

fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

fn assert_knots(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "knot count");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(approx_eq(*a, *e, 1e-12), "knot {i}: {a} != {e}");
    }
}

#[test]
fn open_knots_clamp_both_ends() {
    let knots = open_uniform_knots(5, 3).unwrap();
    assert_knots(knots.values(), &[0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0]);
    assert_eq!(knots.domain(), (0.0, 1.0));
    assert_eq!(knots.control_count(), 5);
}

#[test]
fn open_knots_without_interior_are_bezier() {
    let knots = open_uniform_knots(4, 3).unwrap();
    assert_knots(knots.values(), &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn open_knots_interior_spacing_is_uniform() {
    let knots = open_uniform_knots(7, 2).unwrap();
    assert_knots(
        knots.values(),
        &[0.0, 0.0, 0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 1.0, 1.0],
    );
    assert!(knots.is_non_decreasing());
}

#[test]
fn periodic_knots_are_uniform_past_both_ends() {
    let knots = periodic_uniform_knots(4, 2).unwrap();
    let expected: Vec<f64> = (0..11).map(|i| (i as f64 - 2.0) / 6.0).collect();
    assert_knots(knots.values(), &expected);
    assert_eq!(knots.control_count(), 8);

    let (start, end) = knots.domain();
    assert!(approx_eq(start, 0.0, 1e-12));
    assert!(approx_eq(end, 1.0, 1e-12));
}

#[test]
fn wrap_periodic_prepends_tail_and_appends_head() {
    assert_eq!(wrap_periodic(&[0, 1, 2, 3], 2), vec![2, 3, 0, 1, 2, 3, 0, 1]);
    assert_eq!(wrap_periodic(&['a', 'b'], 0), vec!['a', 'b']);
}

#[test]
fn layout_sequences_match_form() {
    let open = build_knot_layout(KnotForm::Open, 4, 2).unwrap();
    assert_eq!(open.sequence, vec![0, 1, 2, 3]);
    assert_eq!(open.original_count(), 4);

    let periodic = build_knot_layout(KnotForm::Periodic, 4, 3).unwrap();
    assert_eq!(periodic.sequence, vec![1, 2, 3, 0, 1, 2, 3, 0, 1, 2]);
    assert_eq!(periodic.original_count(), 4);
    assert_eq!(periodic.knots.len(), 4 + 2 * 3 + 3 + 1);
}

#[test]
fn too_few_controls_is_degenerate() {
    let err = open_uniform_knots(3, 3).unwrap_err();
    assert_eq!(
        err,
        SplineError::DegenerateCurve {
            control_count: 3,
            degree: 3
        }
    );
    assert!(periodic_uniform_knots(2, 2).is_err());
    assert!(build_knot_layout(KnotForm::Open, 0, 0).is_err());
}

#[test]
fn explicit_knot_vector_is_validated() {
    assert_eq!(
        KnotVector::new(vec![0.0, 0.0, 1.0], 2, 1).unwrap_err(),
        SplineError::KnotLengthMismatch {
            expected: 4,
            actual: 3
        }
    );
    assert_eq!(
        KnotVector::new(vec![0.0, 0.5, 0.2, 1.0], 2, 1).unwrap_err(),
        SplineError::DecreasingKnots
    );
    assert!(KnotVector::new(vec![0.0, 0.0, 1.0, 1.0], 2, 1).is_ok());
}
