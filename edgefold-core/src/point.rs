//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: &Point3f, b: &Point3f) -> f32 {
    nalgebra::distance(a, b)
}

/// Point halfway between `a` and `b`.
#[inline]
pub fn midpoint(a: &Point3f, b: &Point3f) -> Point3f {
    nalgebra::center(a, b)
}
