//! Extending open curves past their ends.

use std::f64::consts::TAU;

use curvekit_core::{KernelError, Result, LINEAR_TOLERANCE};
use curvekit_geometry::{AnyCurve, Curve, GeometryTarget, NurbsCurve, PolyCurve};
use curvekit_math::{Interval, Plane, Point3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blend::{curvature_connector, curvature_extension, BlendEnd};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveEnd {
    Start,
    End,
    Both,
}

/// Shape of the added piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionStyle {
    /// Straight continuation along the end tangent.
    Line,
    /// Circular continuation with the end curvature.
    Arc,
    /// Cubic continuation matching tangent and curvature.
    Smooth,
}

/// How far to extend.
#[derive(Clone, Copy)]
pub enum ExtendTarget<'a> {
    /// Analytic continuation of the end spans over a larger domain. The
    /// side and style are ignored.
    Domain(Interval),
    /// Add this much arc length at each extended end.
    Length(f64),
    /// Reach this point.
    Point(Point3),
    /// Extend until the target is hit, searching at most `max_length`.
    Geometry {
        target: &'a dyn GeometryTarget,
        max_length: f64,
    },
}

/// Extend `curve` at `side`.
///
/// Returns the original parameters unchanged on the original portion;
/// extension pieces sit before `t0` and after `t1`. `None` for closed
/// curves, ends without a tangent, and targets that cannot be reached.
pub fn extend(
    curve: &AnyCurve,
    side: CurveEnd,
    style: ExtensionStyle,
    target: ExtendTarget<'_>,
) -> Result<Option<AnyCurve>> {
    if curve.is_closed() {
        debug!("closed curves are not extended");
        return Ok(None);
    }
    if let ExtendTarget::Domain(domain) = target {
        return curve.extend_domain(domain).map(Some);
    }

    let domain = curve.domain();
    let mut before: Option<AnyCurve> = None;
    let mut after: Option<AnyCurve> = None;
    if matches!(side, CurveEnd::Start | CurveEnd::Both) {
        let Some(end) = BlendEnd::at_start(curve).map(BlendEnd::reversed) else {
            return Ok(None);
        };
        let Some(mut piece) = extension_piece(&end, style, target)? else {
            return Ok(None);
        };
        piece.reverse();
        before = Some(piece);
    }
    if matches!(side, CurveEnd::End | CurveEnd::Both) {
        let Some(end) = BlendEnd::at_end(curve) else {
            return Ok(None);
        };
        let Some(piece) = extension_piece(&end, style, target)? else {
            return Ok(None);
        };
        after = Some(piece);
    }

    let lead = before.as_ref().map_or(0.0, |p| p.domain().length());
    let trail = after.as_ref().map_or(0.0, |p| p.domain().length());
    let mut chain = match before {
        Some(piece) => {
            let mut chain = PolyCurve::new(piece);
            chain.append(curve.clone())?;
            chain
        }
        None => PolyCurve::new(curve.clone()),
    };
    if let Some(piece) = after {
        chain.append(piece)?;
    }
    chain.remove_nesting();
    chain.set_domain(Interval::new(domain.t0() - lead, domain.t1() + trail))?;
    Ok(Some(chain.into()))
}

/// Piece leaving `end` outward, oriented away from the curve.
fn extension_piece(
    end: &BlendEnd,
    style: ExtensionStyle,
    target: ExtendTarget<'_>,
) -> Result<Option<AnyCurve>> {
    match target {
        ExtendTarget::Domain(_) => Ok(None),
        ExtendTarget::Length(length) => by_length(end, style, length),
        ExtendTarget::Point(point) => to_point(end, style, point),
        ExtendTarget::Geometry { target, max_length } => {
            let Some(piece) = by_length(end, style, max_length)? else {
                return Ok(None);
            };
            let domain = piece.domain();
            let tolerance = LINEAR_TOLERANCE;
            let hit = target
                .intersect_curve(&piece, tolerance)
                .into_iter()
                .find(|&t| (piece.point_at(t) - end.point).length() > tolerance);
            match hit {
                Some(t) if t < domain.t1() => piece.trim(Interval::new(domain.t0(), t)).map(Some),
                Some(_) => Ok(Some(piece)),
                None => {
                    debug!(max_length, "extension target not reached");
                    Ok(None)
                }
            }
        }
    }
}

fn by_length(end: &BlendEnd, style: ExtensionStyle, length: f64) -> Result<Option<AnyCurve>> {
    if !(length > 0.0 && length.is_finite()) {
        return Err(KernelError::InvalidOperation(format!(
            "extension length {length} must be positive"
        )));
    }
    let radius = 1.0 / end.curvature.length();
    Ok(match style {
        ExtensionStyle::Line => Some(straight(end, length)),
        ExtensionStyle::Arc if !radius.is_finite() || radius > 1e12 => Some(straight(end, length)),
        ExtensionStyle::Arc => {
            let sweep = length / radius;
            if sweep >= TAU {
                debug!(sweep, "arc extension would wrap around");
                return Ok(None);
            }
            let center = end.point + end.curvature * (radius * radius);
            let plane = Plane::from_frame(center, end.point - center, end.tangent)
                .ok_or_else(|| KernelError::Geometry("degenerate arc frame".into()))?;
            Some(NurbsCurve::arc(&plane, radius, 0.0, sweep)?.into())
        }
        ExtensionStyle::Smooth => Some(curvature_extension(end, length)?.into()),
    })
}

fn to_point(end: &BlendEnd, style: ExtensionStyle, point: Point3) -> Result<Option<AnyCurve>> {
    if (point - end.point).length() <= LINEAR_TOLERANCE {
        return Ok(None);
    }
    Ok(match style {
        ExtensionStyle::Line => Some(NurbsCurve::line(end.point, point).into()),
        ExtensionStyle::Arc => NurbsCurve::tangent_arc(end.point, end.tangent, point).map(Into::into),
        ExtensionStyle::Smooth => curvature_connector(end, point)?.map(Into::into),
    })
}

fn straight(end: &BlendEnd, length: f64) -> AnyCurve {
    NurbsCurve::line(end.point, end.point + end.tangent * length).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvekit_core::ContinuityTolerance;
    use curvekit_geometry::Continuity;
    use curvekit_math::DVec3;

    fn unit_line() -> AnyCurve {
        NurbsCurve::line(DVec3::ZERO, DVec3::X).into()
    }

    #[test]
    fn test_line_by_length_keeps_parameters() {
        let line = unit_line();
        let longer = extend(&line, CurveEnd::Both, ExtensionStyle::Line, ExtendTarget::Length(2.0))
            .unwrap()
            .unwrap();
        assert!((longer.start_point() - DVec3::new(-2.0, 0.0, 0.0)).length() < 1e-12);
        assert!((longer.end_point() - DVec3::new(3.0, 0.0, 0.0)).length() < 1e-12);
        assert!((longer.point_at(0.5) - line.point_at(0.5)).length() < 1e-12);
        assert!((longer.length(None, 1e-8).value - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_arc_extension_follows_circle() {
        let arc: AnyCurve = NurbsCurve::arc(&Plane::xy(), 2.0, 0.0, 1.0).unwrap().into();
        let longer = extend(&arc, CurveEnd::End, ExtensionStyle::Arc, ExtendTarget::Length(1.0))
            .unwrap()
            .unwrap();
        let expected = DVec3::new(1.5f64.cos(), 1.5f64.sin(), 0.0) * 2.0;
        assert!((longer.end_point() - expected).length() < 1e-9);
        let tol = ContinuityTolerance::default();
        assert!(longer.is_continuous(Continuity::G1, arc.domain().t1(), &tol));
    }

    #[test]
    fn test_smooth_extension_is_curvature_continuous() {
        let arc: AnyCurve = NurbsCurve::arc(&Plane::xy(), 2.0, 0.0, 1.0).unwrap().into();
        let longer = extend(&arc, CurveEnd::Start, ExtensionStyle::Smooth, ExtendTarget::Length(0.5))
            .unwrap()
            .unwrap();
        let tol = ContinuityTolerance::with_angle_and_curvature(ContinuityTolerance::DEFAULT_COS_ANGLE, 1e-9);
        assert!(longer.is_continuous(Continuity::G2, arc.domain().t0(), &tol));
        assert!((longer.point_at(0.7) - arc.point_at(0.7)).length() < 1e-12);
    }

    #[test]
    fn test_extend_to_point_and_plane() {
        let line = unit_line();
        let to_point = extend(&line, CurveEnd::End, ExtensionStyle::Line, ExtendTarget::Point(DVec3::new(2.0, 1.0, 0.0)))
            .unwrap()
            .unwrap();
        assert!((to_point.end_point() - DVec3::new(2.0, 1.0, 0.0)).length() < 1e-12);

        let wall = Plane::new(DVec3::new(4.0, 0.0, 0.0), DVec3::X);
        let target = ExtendTarget::Geometry { target: &wall, max_length: 10.0 };
        let to_wall = extend(&line, CurveEnd::End, ExtensionStyle::Line, target).unwrap().unwrap();
        assert!((to_wall.end_point() - DVec3::new(4.0, 0.0, 0.0)).length() < 1e-7);

        let short = ExtendTarget::Geometry { target: &wall, max_length: 1.0 };
        assert!(extend(&line, CurveEnd::End, ExtensionStyle::Line, short).unwrap().is_none());
    }

    #[test]
    fn test_extend_to_point_with_arc_and_smooth() {
        let line = unit_line();
        let target = DVec3::new(2.0, 1.0, 0.0);
        let tol = ContinuityTolerance::default();
        for style in [ExtensionStyle::Arc, ExtensionStyle::Smooth] {
            let longer = extend(&line, CurveEnd::End, style, ExtendTarget::Point(target))
                .unwrap()
                .unwrap();
            assert!((longer.end_point() - target).length() < 1e-9, "{style:?}");
            assert!(longer.is_continuous(Continuity::G1, line.domain().t1(), &tol), "{style:?}");
            assert!((longer.point_at(0.5) - line.point_at(0.5)).length() < 1e-12);
        }
    }

    #[test]
    fn test_closed_curve_is_not_extended() {
        let circle: AnyCurve = NurbsCurve::circle(&Plane::xy(), 1.0).unwrap().into();
        assert!(extend(&circle, CurveEnd::End, ExtensionStyle::Line, ExtendTarget::Length(1.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_domain_target_and_bad_length() {
        let line = unit_line();
        let longer = extend(&line, CurveEnd::End, ExtensionStyle::Line, ExtendTarget::Domain(Interval::new(0.0, 2.0)))
            .unwrap()
            .unwrap();
        assert!((longer.end_point() - DVec3::new(2.0, 0.0, 0.0)).length() < 1e-12);
        assert!(extend(&line, CurveEnd::End, ExtensionStyle::Line, ExtendTarget::Length(-1.0)).is_err());
    }
}
