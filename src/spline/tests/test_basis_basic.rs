use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geom::{Point3, Tolerance};
use crate::spline::{
    BasisWeights, Curve3, DeBoorBasis, KnotForm, RibbonCurve, SplineError, evaluate_basis,
    open_uniform_knots, periodic_uniform_knots,
};

fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

fn line_controls(count: usize) -> Vec<Point3> {
    (0..count).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect()
}

fn square_controls() -> Vec<Point3> {
    vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.5, -0.5, 0.5),
    ]
}

fn assert_levels_partition_unity(count: usize, degree: usize, knots: &[f64], t: f64) {
    let mut basis = DeBoorBasis::new(count, degree, t, knots).unwrap();
    loop {
        let sum = basis.window_sum();
        assert!(
            approx_eq(sum, 1.0, 1e-9),
            "m={count} d={degree} t={t} level {}: sum {sum}",
            basis.level()
        );
        let total: f64 = basis.weights().iter().sum();
        assert!(approx_eq(total, sum, 1e-12), "weights outside the window");
        if !basis.raise() {
            break;
        }
    }
    assert_eq!(basis.level(), degree);
}

#[test]
fn every_level_is_a_partition_of_unity() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for (count, degree) in [(5, 3), (4, 1), (9, 4), (6, 5)] {
        let knots = open_uniform_knots(count, degree).unwrap();
        for _ in 0..64 {
            let t: f64 = rng.random_range(0.0..1.0);
            assert_levels_partition_unity(count, degree, knots.values(), t);
        }
    }
}

#[test]
fn every_level_is_a_partition_of_unity_on_periodic_knots() {
    let mut rng = StdRng::seed_from_u64(0xc10c);
    for (count, degree) in [(5, 3), (4, 1), (6, 2), (7, 4), (3, 2)] {
        let knots = periodic_uniform_knots(count, degree).unwrap();
        let extended = knots.control_count();
        assert_eq!(extended, count + 2 * degree);
        let (start, end) = knots.domain();
        for _ in 0..64 {
            let t: f64 = rng.random_range(start..end);
            assert_levels_partition_unity(extended, degree, knots.values(), t);
        }
    }
}

#[test]
fn weights_are_non_negative_and_sum_to_one() {
    let mut rng = StdRng::seed_from_u64(11);
    let tol = Tolerance::DEFAULT;
    for (count, degree) in [(5, 3), (7, 2), (3, 2), (8, 1)] {
        let knots = open_uniform_knots(count, degree).unwrap();
        for _ in 0..128 {
            let t: f64 = rng.random_range(0.0..=1.0);
            let weights = evaluate_basis(count, degree, t, knots.values(), tol).unwrap();
            assert_eq!(weights.len(), count);
            assert!(weights.is_partition_of_unity(Tolerance::LOOSE), "t={t}");
            assert!(weights.values().iter().all(|&w| w >= -1e-12), "t={t}");
        }
    }
}

#[test]
fn open_curve_ends_on_first_and_last_controls() {
    let knots = open_uniform_knots(5, 3).unwrap();
    let tol = Tolerance::DEFAULT;

    let start = evaluate_basis(5, 3, 0.0, knots.values(), tol).unwrap();
    assert_eq!(start.values(), &[1.0, 0.0, 0.0, 0.0, 0.0]);

    let end = evaluate_basis(5, 3, 1.0, knots.values(), tol).unwrap();
    assert_eq!(end.values(), &[0.0, 0.0, 0.0, 0.0, 1.0]);

    // within tolerance of the end still snaps to the last control
    let near_end = evaluate_basis(5, 3, 1.0 - 1e-12, knots.values(), tol).unwrap();
    assert_eq!(near_end.get(4), 1.0);
}

#[test]
fn parameters_before_start_clamp_to_start() {
    let knots = open_uniform_knots(4, 2).unwrap();
    let tol = Tolerance::DEFAULT;
    let before = evaluate_basis(4, 2, -0.5, knots.values(), tol).unwrap();
    let at = evaluate_basis(4, 2, 0.0, knots.values(), tol).unwrap();
    assert_eq!(before.values(), at.values());
    assert_eq!(before.parameter(), 0.0);
}

#[test]
fn non_finite_parameter_is_rejected() {
    let knots = open_uniform_knots(4, 2).unwrap();
    let tol = Tolerance::DEFAULT;
    assert_eq!(
        evaluate_basis(4, 2, f64::NAN, knots.values(), tol).unwrap_err(),
        SplineError::NonFiniteParameter
    );
    assert!(evaluate_basis(4, 2, f64::INFINITY, knots.values(), tol).is_err());
}

#[test]
fn mismatched_knot_count_is_rejected() {
    let err = evaluate_basis(5, 3, 0.5, &[0.0; 4], Tolerance::DEFAULT).unwrap_err();
    assert_eq!(
        err,
        SplineError::KnotLengthMismatch {
            expected: 9,
            actual: 4
        }
    );
}

#[test]
fn degree_one_is_linear_interpolation() {
    let knots = open_uniform_knots(3, 1).unwrap();
    let weights = evaluate_basis(3, 1, 0.25, knots.values(), Tolerance::DEFAULT).unwrap();
    assert!(approx_eq(weights.get(0), 0.5, 1e-12));
    assert!(approx_eq(weights.get(1), 0.5, 1e-12));
    assert!(approx_eq(weights.get(2), 0.0, 1e-12));

    let curve = RibbonCurve::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
        ],
        1,
        KnotForm::Open,
        Tolerance::DEFAULT,
    )
    .unwrap();
    let p = curve.point_at(0.75);
    assert!(Tolerance::DEFAULT.approx_eq_point3(p, Point3::new(1.0, 1.0, 0.0)));
}

#[test]
fn degree_zero_is_a_step_function() {
    let knots = open_uniform_knots(4, 0).unwrap();
    let tol = Tolerance::DEFAULT;
    let w = evaluate_basis(4, 0, 0.3, knots.values(), tol).unwrap();
    assert_eq!(w.values(), &[0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn colinear_controls_give_colinear_points() {
    let curve = RibbonCurve::new(line_controls(5), 3, KnotForm::Open, Tolerance::DEFAULT).unwrap();
    let mid = curve.point_at(0.5);
    assert!(approx_eq(mid.x, 2.0, 1e-9));
    assert!(approx_eq(mid.y, 0.0, 1e-12));
    assert_eq!(curve.point_at(0.0), Point3::new(0.0, 0.0, 0.0));
    assert_eq!(curve.point_at(1.0), Point3::new(4.0, 0.0, 0.0));
}

#[test]
fn periodic_weights_fold_onto_original_controls() {
    let curve =
        RibbonCurve::new(square_controls(), 3, KnotForm::Periodic, Tolerance::DEFAULT).unwrap();
    let (start, end) = curve.sampling_interval();

    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..64 {
        let t = rng.random_range(start..end);
        let weights = curve.weights_at(t).unwrap();
        assert_eq!(weights.len(), 5);
        assert!(weights.is_partition_of_unity(Tolerance::LOOSE));
        assert!(weights.values().iter().all(|&w| w >= -1e-12));
    }
}

#[test]
fn periodic_curve_closes_at_the_seam() {
    let tol = Tolerance::LOOSE;
    for degree in 1..=4 {
        let curve =
            RibbonCurve::new(square_controls(), degree, KnotForm::Periodic, Tolerance::DEFAULT)
                .unwrap();
        assert!(curve.is_closed());

        let (start, end) = curve.sampling_interval();
        assert!(start < end);
        assert!(
            tol.approx_eq_point3(curve.point_at(start), curve.point_at(end)),
            "degree {degree} seam is open"
        );

        let w_start = curve.weights_at(start).unwrap();
        let w_end = curve.weights_at(end).unwrap();
        for (a, b) in w_start.values().iter().zip(w_end.values()) {
            assert!(approx_eq(*a, *b, 1e-9), "degree {degree}");
        }
    }
}

#[test]
fn periodic_interval_spans_one_loop() {
    let knots = periodic_uniform_knots(5, 3).unwrap();
    let span = knots.values()[4] - knots.values()[3];
    let curve =
        RibbonCurve::new(square_controls(), 3, KnotForm::Periodic, Tolerance::DEFAULT).unwrap();
    let (start, end) = curve.sampling_interval();
    assert!(approx_eq(end - start, 5.0 * span, 1e-12));
    assert!(approx_eq(start, 1.5 * span, 1e-12));
}

#[test]
fn pruning_zeroes_only_negligible_weights() {
    let weights = BasisWeights::new(0.3, vec![0.25, 1e-13, 0.75 - 1e-13, -1e-14]).pruned();
    assert_eq!(weights.values(), &[0.25, 0.0, 0.75 - 1e-13, 0.0]);
    let influences: Vec<usize> = weights.influences().map(|(index, _)| index).collect();
    assert_eq!(influences, vec![0, 2]);
}
