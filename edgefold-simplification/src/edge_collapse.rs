//! One-call edge collapse simplification
//!
//! [`EdgeCollapseSimplifier`] wraps a [`Simplifier`] run behind the
//! [`MeshSimplifier`] trait for callers that only want the end result.

use crate::edge::{Edge, LongestFirst, ShortestFirst};
use crate::heap::HeapOrder;
use crate::simplifier::{SimplifiedMesh, Simplifier, SimplifyParams};
use crate::MeshSimplifier;
use edgefold_core::{PolyMesh, Result};
use serde::{Deserialize, Serialize};

/// Which end of the length ordering is collapsed first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseOrder {
    #[default]
    ShortestFirst,
    LongestFirst,
}

/// Midpoint edge collapse with configurable stop conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeCollapseSimplifier {
    pub params: SimplifyParams,
    pub order: CollapseOrder,
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: SimplifyParams, order: CollapseOrder) -> Self {
        Self { params, order }
    }

    fn run<O: HeapOrder<Edge>>(&self, mesh: &PolyMesh, order: O) -> Result<SimplifiedMesh> {
        let mut simplifier =
            Simplifier::with_order(mesh.clone(), order)?.with_params(self.params.clone())?;
        simplifier.run()?;
        Ok(simplifier.finish())
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify(&self, mesh: &PolyMesh) -> Result<SimplifiedMesh> {
        match self.order {
            CollapseOrder::ShortestFirst => self.run(mesh, ShortestFirst),
            CollapseOrder::LongestFirst => self.run(mesh, LongestFirst),
        }
    }
}
