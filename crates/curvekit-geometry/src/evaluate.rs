//! Differential quantities derived from curve derivatives.

use curvekit_core::{KernelError, Result};
use curvekit_math::{DQuat, Plane, Vector3};

use crate::curve::Curve;

/// `C' / |C'|`, or `None` when the first derivative vanishes.
pub fn unit_tangent(d1: Vector3) -> Option<Vector3> {
    d1.try_normalize()
}

/// Curvature vector `(C' × C'') × C' / |C'|^4`.
///
/// Its length is the curvature and it points toward the center of the
/// osculating circle. `None` when the first derivative vanishes.
pub fn curvature_vector(d1: Vector3, d2: Vector3) -> Option<Vector3> {
    let len2 = d1.length_squared();
    if len2 == 0.0 || !len2.is_finite() {
        return None;
    }
    Some(d1.cross(d2).cross(d1) / (len2 * len2))
}

/// Torsion `(C' × C'') · C''' / |C' × C''|^2`.
///
/// `None` where the curvature vanishes and the binormal is undefined.
pub fn torsion(d1: Vector3, d2: Vector3, d3: Vector3) -> Option<f64> {
    let b = d1.cross(d2);
    let len2 = b.length_squared();
    if len2 == 0.0 || len2 <= f64::EPSILON * d1.length_squared() * d2.length_squared() {
        return None;
    }
    Some(b.dot(d3) / len2)
}

/// Frenet frame from `[C, C', C'']`: x = tangent, y = principal normal,
/// normal = binormal. Straight stretches get an arbitrary normal.
pub fn frenet_frame(ders: &[Vector3]) -> Option<Plane> {
    let tangent = unit_tangent(ders[1])?;
    let principal = curvature_vector(ders[1], ders[2])
        .and_then(|k| k.try_normalize())
        .unwrap_or_else(|| tangent.any_orthonormal_vector());
    Some(Plane {
        origin: ders[0],
        x_axis: tangent,
        y_axis: principal,
        normal: tangent.cross(principal),
    })
}

/// Rotation-minimizing frames at strictly increasing parameters.
///
/// Each plane has its normal along the tangent. The first x axis follows
/// the curvature (or an arbitrary perpendicular on straight stretches); later
/// frames carry it along by the smallest rotation between tangents.
/// `Ok(None)` when the tangent vanishes at any parameter.
pub fn perpendicular_frames<C: Curve + ?Sized>(curve: &C, params: &[f64]) -> Result<Option<Vec<Plane>>> {
    if let Some(i) = params.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(KernelError::NonIncreasing { index: i + 1 });
    }
    let mut frames: Vec<Plane> = Vec::with_capacity(params.len());
    let Some((&first, rest)) = params.split_first() else {
        return Ok(Some(frames));
    };

    let d = curve.derivatives_at(first, 2);
    let Some(tangent) = unit_tangent(d[1]) else {
        return Ok(None);
    };
    let x_axis = curvature_vector(d[1], d[2])
        .and_then(|k| k.try_normalize())
        .unwrap_or_else(|| tangent.any_orthonormal_vector());
    frames.push(Plane {
        origin: d[0],
        x_axis,
        y_axis: tangent.cross(x_axis),
        normal: tangent,
    });

    for &t in rest {
        let prev = frames[frames.len() - 1];
        let d = curve.derivatives_at(t, 1);
        let Some(tangent) = unit_tangent(d[1]) else {
            return Ok(None);
        };
        let rotated = DQuat::from_rotation_arc(prev.normal, tangent) * prev.x_axis;
        let x_axis = (rotated - tangent * rotated.dot(tangent))
            .try_normalize()
            .unwrap_or_else(|| tangent.any_orthonormal_vector());
        frames.push(Plane {
            origin: d[0],
            x_axis,
            y_axis: tangent.cross(x_axis),
            normal: tangent,
        });
    }
    Ok(Some(frames))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{BezierCurve, NurbsCurve};
    use curvekit_math::DVec3;

    #[test]
    fn test_unit_tangent_zero() {
        assert!(unit_tangent(DVec3::ZERO).is_none());
        assert_eq!(unit_tangent(DVec3::new(0.0, 3.0, 0.0)), Some(DVec3::Y));
    }

    #[test]
    fn test_curvature_of_circle() {
        let circle = NurbsCurve::circle(&Plane::xy(), 4.0).unwrap();
        let t = circle.domain().parameter_at(0.3);
        let k = circle.curvature_at(t).unwrap();
        assert!((k.length() - 0.25).abs() < 1e-9);
        // Points toward the center.
        let p = circle.point_at(t);
        assert!(k.normalize().dot(-p.normalize()) > 1.0 - 1e-9);
    }

    #[test]
    fn test_torsion_of_planar_and_straight() {
        let line = NurbsCurve::line(DVec3::ZERO, DVec3::X);
        assert!(line.torsion_at(0.5).is_none());
        let circle = NurbsCurve::circle(&Plane::xy(), 1.0).unwrap();
        assert!(circle.torsion_at(1.0).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_torsion_of_helix_like_cubic() {
        // C(t) = (t, t^2, t^3) has torsion 3 at t = 0.
        let curve = BezierCurve::new(vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0 / 3.0, 0.0, 0.0),
            DVec3::new(2.0 / 3.0, 1.0 / 3.0, 0.0),
            DVec3::new(1.0, 1.0, 1.0),
        ])
        .unwrap();
        assert!((curve.torsion_at(0.0).unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_frenet_frame_is_orthonormal() {
        let curve = BezierCurve::new(vec![
            DVec3::ZERO,
            DVec3::new(1.0, 2.0, 0.0),
            DVec3::new(3.0, 1.0, 1.0),
        ])
        .unwrap();
        let f = curve.frame_at(0.4).unwrap();
        assert!(f.x_axis.dot(f.y_axis).abs() < 1e-12);
        assert!((f.normal.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_perpendicular_frames() {
        let circle = NurbsCurve::circle(&Plane::xy(), 1.0).unwrap();
        let d = circle.domain();
        let params: Vec<f64> = (0..8).map(|i| d.parameter_at(i as f64 / 8.0)).collect();
        let frames = perpendicular_frames(&circle, &params).unwrap().unwrap();
        assert_eq!(frames.len(), 8);
        for (f, &t) in frames.iter().zip(&params) {
            let tangent = circle.tangent_at(t).unwrap();
            assert!((f.normal - tangent).length() < 1e-9);
            assert!(f.x_axis.dot(tangent).abs() < 1e-9);
            // Transport around a planar circle stays in the plane.
            assert!(f.x_axis.z.abs() < 1e-9);
        }
        assert!(perpendicular_frames(&circle, &[1.0, 1.0]).is_err());
        assert_eq!(perpendicular_frames(&circle, &[]).unwrap(), Some(vec![]));
    }

    #[test]
    fn test_perpendicular_frames_fail_on_cusp() {
        let cusp = BezierCurve::new(vec![DVec3::ZERO, DVec3::ZERO, DVec3::X]).unwrap();
        assert_eq!(perpendicular_frames(&cusp, &[0.0, 0.5]).unwrap(), None);
    }
}
