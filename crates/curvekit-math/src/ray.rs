use crate::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray {
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at parameter t.
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }

    /// Find the closest point on the ray to a given point.
    pub fn closest_point(&self, point: Point3) -> Point3 {
        let t = (point - self.origin).dot(self.direction).max(0.0);
        self.at(t)
    }

    /// Distance from a point to the ray.
    pub fn distance_to_point(&self, point: Point3) -> f64 {
        (point - self.closest_point(point)).length()
    }

    /// Parameters of the mutually closest points of the two carrier lines.
    /// `None` when the directions are parallel.
    pub fn closest_approach(&self, other: &Ray) -> Option<(f64, f64)> {
        let w = self.origin - other.origin;
        let b = self.direction.dot(other.direction);
        let denom = 1.0 - b * b;
        if denom < 1e-12 {
            return None;
        }
        let d = self.direction.dot(w);
        let e = other.direction.dot(w);
        Some(((b * e - d) / denom, (e - b * d) / denom))
    }

}
