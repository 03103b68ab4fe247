//! curvekit math primitives.

pub mod aabb;
pub mod homogeneous;
pub mod interval;
pub mod plane;
pub mod ray;
pub mod transform;

pub use glam::{DMat4, DQuat, DVec2, DVec3, DVec4};
pub use aabb::Aabb3;
pub use homogeneous::{binomial, euclidean_derivatives, from_homogeneous, to_homogeneous};
pub use interval::Interval;
pub use plane::Plane;
pub use ray::Ray;
pub use transform::Transform;

pub type Point2 = DVec2;
pub type Point3 = DVec3;
pub type Vector3 = DVec3;
/// Homogeneous control vertex `(x*w, y*w, z*w, w)`.
pub type Point4 = DVec4;
