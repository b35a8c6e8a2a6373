//! Core data structures and error types for edgefold
//!
//! This crate provides the mesh model shared by the loader and the
//! simplifier: points, faces with 3 or 4 corners, and the polygon mesh that
//! holds them, together with the common error type.

pub mod error;
pub mod mesh;
pub mod point;

pub use error::*;
pub use mesh::*;
pub use point::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};

// Type aliases for easier imports
pub type Point = Point3f;
pub type Mesh = PolyMesh;
