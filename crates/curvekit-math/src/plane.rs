use crate::{DVec3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// An oriented plane with an orthonormal frame.
///
/// Curve frames are returned as planes: `normal` carries the frame's third axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub normal: Vector3,
}

impl Plane {
    /// Plane through `origin` with the given normal; in-plane axes are chosen
    /// from whichever world axis is least parallel to the normal.
    pub fn new(origin: Point3, normal: Vector3) -> Self {
        let n = normal.normalize();
        let ref_vec = if n.x.abs() < 0.9 { DVec3::X } else { DVec3::Y };
        let y_axis = n.cross(ref_vec).normalize();
        let x_axis = y_axis.cross(n).normalize();
        Self {
            origin,
            x_axis,
            y_axis,
            normal: n,
        }
    }

    /// Orthonormal frame from two (not necessarily perpendicular) directions.
    pub fn from_frame(origin: Point3, x_dir: Vector3, y_dir: Vector3) -> Option<Self> {
        let x_axis = x_dir.try_normalize()?;
        let y_axis = (y_dir - x_axis * y_dir.dot(x_axis)).try_normalize()?;
        Some(Self {
            origin,
            x_axis,
            y_axis,
            normal: x_axis.cross(y_axis),
        })
    }

    pub fn xy() -> Self {
        Self {
            origin: Point3::ZERO,
            x_axis: Vector3::X,
            y_axis: Vector3::Y,
            normal: Vector3::Z,
        }
    }

    pub fn xz() -> Self {
        Self::new(Point3::ZERO, Vector3::Y)
    }

    pub fn yz() -> Self {
        Self::new(Point3::ZERO, Vector3::X)
    }

    /// Signed distance from a point to this plane.
    pub fn signed_distance(&self, point: Point3) -> f64 {
        (point - self.origin).dot(self.normal)
    }

    /// Project a point onto this plane.
    pub fn project_point(&self, point: Point3) -> Point3 {
        point - self.normal * self.signed_distance(point)
    }

    /// Coordinates of `point` in the plane frame `(x, y, height)`.
    pub fn to_local(&self, point: Point3) -> DVec3 {
        let d = point - self.origin;
        DVec3::new(d.dot(self.x_axis), d.dot(self.y_axis), d.dot(self.normal))
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.origin + self.x_axis * u + self.y_axis * v
    }

    /// Least-squares plane through `points` and the largest distance of any
    /// point from it. `None` for fewer than three points.
    pub fn fit_to_points(points: &[Point3]) -> Option<(Plane, f64)> {
        if points.len() < 3 {
            return None;
        }
        let centroid = points.iter().copied().sum::<DVec3>() / points.len() as f64;
        let mut covariance = nalgebra::Matrix3::<f64>::zeros();
        for p in points {
            let d = *p - centroid;
            let v = nalgebra::Vector3::new(d.x, d.y, d.z);
            covariance += v * v.transpose();
        }
        let eigen = nalgebra::SymmetricEigen::new(covariance);
        let (smallest, _) = eigen
            .eigenvalues
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        let column = eigen.eigenvectors.column(smallest);
        let normal = DVec3::new(column[0], column[1], column[2]).try_normalize()?;
        let plane = Plane::new(centroid, normal);
        let deviation = points
            .iter()
            .map(|p| plane.signed_distance(*p).abs())
            .fold(0.0, f64::max);
        Some((plane, deviation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec3;

    #[test]
    fn test_signed_distance() {
        let plane = Plane::xy();
        assert!((plane.signed_distance(dvec3(0.0, 0.0, 5.0)) - 5.0).abs() < 1e-10);
        assert!((plane.signed_distance(dvec3(0.0, 0.0, -3.0)) + 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_project_point() {
        let plane = Plane::xy();
        let projected = plane.project_point(dvec3(1.0, 2.0, 5.0));
        assert!((projected - dvec3(1.0, 2.0, 0.0)).length() < 1e-10);
    }

    #[test]
    fn test_frame_is_orthonormal() {
        let plane = Plane::new(dvec3(1.0, 1.0, 1.0), dvec3(1.0, 2.0, 3.0));
        assert!((plane.x_axis.length() - 1.0).abs() < 1e-12);
        assert!(plane.x_axis.dot(plane.y_axis).abs() < 1e-12);
        assert!(plane.x_axis.dot(plane.normal).abs() < 1e-12);
        assert!((plane.x_axis.cross(plane.y_axis) - plane.normal).length() < 1e-12);
    }

    #[test]
    fn test_fit_tilted_points() {
        let base = Plane::new(dvec3(0.0, 0.0, 2.0), dvec3(0.0, 1.0, 1.0));
        let pts: Vec<_> = (0..10)
            .map(|i| base.point_at(i as f64, (i * i) as f64 * 0.1))
            .collect();
        let (fit, dev) = Plane::fit_to_points(&pts).unwrap();
        assert!(dev < 1e-9);
        assert!(fit.normal.dot(base.normal).abs() > 1.0 - 1e-9);
    }

    #[test]
    fn test_local_round_trip() {
        let plane = Plane::new(dvec3(1.0, 0.0, 0.0), dvec3(0.0, 0.0, 1.0));
        let p = dvec3(3.0, 4.0, 0.0);
        let local = plane.to_local(p);
        assert!((plane.point_at(local.x, local.y) - p).length() < 1e-12);
    }
}
