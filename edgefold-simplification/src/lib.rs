//! Edge collapse mesh simplification
//!
//! This crate reduces a polygon mesh by repeatedly collapsing an edge into a
//! new vertex at its midpoint:
//! - An arena-backed priority heap with stable handles ([`heap`])
//! - The active edge set with vertex adjacency ([`edge_index`])
//! - Redirects from retired vertices to their survivors ([`redirect`])
//! - The stepwise collapse engine ([`simplifier`])

pub mod edge;
pub mod edge_collapse;
pub mod edge_index;
pub mod heap;
pub mod redirect;
pub mod simplifier;

pub use edge::*;
pub use edge_collapse::*;
pub use edge_index::*;
pub use heap::*;
pub use redirect::*;
pub use simplifier::*;

use edgefold_core::{PolyMesh, Result};

/// Simplify a mesh in one call
pub trait MeshSimplifier {
    /// Simplify `mesh`, leaving the input untouched
    fn simplify(&self, mesh: &PolyMesh) -> Result<SimplifiedMesh>;
}
