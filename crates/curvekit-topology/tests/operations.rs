use approx::assert_abs_diff_eq;
use curvekit_core::ContinuityTolerance;
use curvekit_geometry::{AnyCurve, Continuity, Curve, NurbsCurve};
use curvekit_math::{DVec3, Plane};
use curvekit_topology::{
    blend_curves, extend, join_curves, offset, BlendContinuity, CornerStyle, CurveEnd, EndStyle,
    ExtendTarget, ExtensionStyle,
};

fn line(a: [f64; 2], b: [f64; 2]) -> AnyCurve {
    NurbsCurve::line(DVec3::new(a[0], a[1], 0.0), DVec3::new(b[0], b[1], 0.0)).into()
}

#[test]
fn test_join_is_idempotent_on_closed_curve() {
    let circle: AnyCurve = NurbsCurve::circle(&Plane::xy(), 3.0).unwrap().into();
    let once = join_curves(std::slice::from_ref(&circle), 1e-6, false).unwrap();
    let twice = join_curves(&[once[0].curve.clone()], 1e-6, false).unwrap();
    assert_eq!(twice.len(), 1);
    assert_eq!(twice[0].curve, circle);
    assert!(twice[0].closed);
}

#[test]
fn test_joined_outline_offsets_outward() {
    // Triangle given as loose, partly reversed edges.
    let edges = vec![
        line([0.0, 0.0], [4.0, 0.0]),
        line([0.0, 3.0], [4.0, 0.0]),
        line([0.0, 3.0], [0.0, 0.0]),
    ];
    let joined = join_curves(&edges, 1e-9, false).unwrap();
    assert_eq!(joined.len(), 1);
    let triangle = &joined[0].curve;
    assert!(triangle.is_closed());

    let outer = offset(triangle, &Plane::xy(), -1.0, 1e-6, CornerStyle::Round, EndStyle::None).unwrap();
    assert_eq!(outer.len(), 1);
    // Perimeter 12 plus one full turn of corner arcs.
    assert_abs_diff_eq!(outer[0].length(None, 1e-10).value, 12.0 + std::f64::consts::TAU, epsilon = 1e-6);
}

#[test]
fn test_extended_line_keeps_its_parameters() {
    let base = line([0.0, 0.0], [2.0, 0.0]);
    let longer = extend(&base, CurveEnd::End, ExtensionStyle::Line, ExtendTarget::Length(3.0))
        .unwrap()
        .unwrap();
    assert_abs_diff_eq!(longer.length(None, 1e-10).value, 5.0, epsilon = 1e-9);
    assert!((longer.point_at(0.5) - base.point_at(0.5)).length() < 1e-12);
    assert_eq!(longer.domain().t0(), base.domain().t0());
}

#[test]
fn test_blend_then_join_is_tangent_continuous() {
    let a = line([0.0, 0.0], [1.0, 0.0]);
    let b = line([3.0, 1.0], [3.0, 3.0]);
    let blend: AnyCurve = blend_curves(&a, &b, BlendContinuity::Tangency).unwrap().unwrap().into();
    let joined = join_curves(&[a, blend, b], 1e-9, true).unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].sources, vec![(0, false), (1, false), (2, false)]);

    let chain = &joined[0].curve;
    let tol = ContinuityTolerance::default();
    assert_eq!(chain.next_discontinuity(Continuity::G1, chain.domain().t0(), chain.domain().t1(), &tol), None);
}
