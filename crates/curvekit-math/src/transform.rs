use crate::{DMat4, DQuat, Plane, Point3, Point4, Vector3};
use serde::{Deserialize, Serialize};

/// General 4x4 transform applied to points, vectors and homogeneous control vertices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub matrix: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        Self::from_mat4(DMat4::IDENTITY)
    }

    pub fn from_translation(t: Vector3) -> Self {
        Self::from_mat4(DMat4::from_translation(t))
    }

    pub fn from_scale(s: Vector3) -> Self {
        Self::from_mat4(DMat4::from_scale(s))
    }

    /// Rotation by `angle` radians about the axis through `center`.
    pub fn from_rotation(center: Point3, axis: Vector3, angle: f64) -> Self {
        let rotation = DMat4::from_quat(DQuat::from_axis_angle(axis.normalize(), angle));
        Self::from_mat4(
            DMat4::from_translation(center) * rotation * DMat4::from_translation(-center),
        )
    }

    /// Orthogonal projection onto `plane`.
    pub fn planar_projection(plane: &Plane) -> Self {
        let n = plane.normal;
        let d = plane.origin.dot(n);
        // p' = p - n (n.p - d)
        let m = DMat4::from_cols_array(&[
            1.0 - n.x * n.x,
            -n.y * n.x,
            -n.z * n.x,
            0.0,
            -n.x * n.y,
            1.0 - n.y * n.y,
            -n.z * n.y,
            0.0,
            -n.x * n.z,
            -n.y * n.z,
            1.0 - n.z * n.z,
            0.0,
            d * n.x,
            d * n.y,
            d * n.z,
            1.0,
        ]);
        Self::from_mat4(m)
    }

    pub fn from_mat4(m: DMat4) -> Self {
        Self {
            matrix: m.to_cols_array(),
        }
    }

    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_cols_array(&self.matrix)
    }

    pub fn transform_point(&self, p: Point3) -> Point3 {
        self.to_mat4().transform_point3(p)
    }

    pub fn transform_vector(&self, v: Vector3) -> Vector3 {
        self.to_mat4().transform_vector3(v)
    }

    /// Applies the full matrix to a weighted vertex; for affine maps this is
    /// the same as transforming the Euclidean point and keeping the weight.
    pub fn transform_homogeneous(&self, h: Point4) -> Point4 {
        self.to_mat4() * h
    }

    pub fn then(&self, other: &Transform) -> Transform {
        Self::from_mat4(other.to_mat4() * self.to_mat4())
    }

    pub fn inverse(&self) -> Option<Transform> {
        let m = self.to_mat4();
        if m.determinant().abs() < 1e-15 {
            None
        } else {
            Some(Self::from_mat4(m.inverse()))
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::homogeneous::{from_homogeneous, to_homogeneous};
    use glam::dvec3;

    #[test]
    fn test_translation() {
        let t = Transform::from_translation(dvec3(10.0, 20.0, 30.0));
        let p = dvec3(1.0, 2.0, 3.0);
        let result = t.transform_point(p);
        assert!((result - dvec3(11.0, 22.0, 33.0)).length() < 1e-10);
    }

    #[test]
    fn test_inverse() {
        let t = Transform::from_rotation(dvec3(1.0, 0.0, 0.0), Vector3::Z, 0.7)
            .then(&Transform::from_translation(dvec3(10.0, 20.0, 30.0)));
        let inv = t.inverse().unwrap();
        let p = dvec3(1.0, 2.0, 3.0);
        let result = inv.transform_point(t.transform_point(p));
        assert!((result - p).length() < 1e-10);
    }

    #[test]
    fn test_homogeneous_matches_point_transform() {
        let t = Transform::from_rotation(Point3::ZERO, Vector3::Y, 1.2)
            .then(&Transform::from_translation(dvec3(1.0, -2.0, 0.5)));
        let p = dvec3(0.3, 0.4, 0.5);
        let h = t.transform_homogeneous(to_homogeneous(p, 0.25));
        assert!((from_homogeneous(h) - t.transform_point(p)).length() < 1e-12);
        assert!((h.w - 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_planar_projection() {
        let plane = Plane::new(dvec3(0.0, 0.0, 2.0), Vector3::Z);
        let t = Transform::planar_projection(&plane);
        let p = t.transform_point(dvec3(3.0, 4.0, 9.0));
        assert!((p - dvec3(3.0, 4.0, 2.0)).length() < 1e-12);
    }
}
