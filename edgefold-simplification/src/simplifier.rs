//! Edge collapse loop
//!
//! [`Simplifier`] repeatedly takes the best edge from its [`EdgeIndex`],
//! replaces the two endpoints with a new vertex at the edge midpoint and
//! brings the index, the redirect map and the face list back into agreement
//! before the next step. Stop conditions are only ever checked between whole
//! steps; a step is never left half done.

use crate::edge::{Edge, ShortestFirst};
use crate::edge_index::{EdgeIndex, Reconciliation};
use crate::heap::HeapOrder;
use crate::redirect::RedirectMap;
use edgefold_core::{midpoint, Error, Face, Point3f, PolyMesh, Result, Vector3f};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, instrument};

/// Where a simplification run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimplifierState {
    /// More edges remain and no stop condition has fired
    Running,
    /// Every edge has been collapsed
    Done,
    /// A stop condition was met between two steps
    StoppedByBudget,
}

/// Stop conditions for a run. Any condition that is set and satisfied ends
/// the run; with none set the run continues until no edges remain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimplifyParams {
    /// Stop once the number of live vertices is at or below this count
    pub target_vertices: Option<usize>,
    /// Stop once the number of faces not removed is at or below this count
    pub target_faces: Option<usize>,
    /// Stop once the next edge to collapse is at least this long
    pub min_edge_length: Option<f32>,
    /// Stop after this many collapses
    pub max_collapses: Option<usize>,
}

impl SimplifyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_vertices(mut self, count: usize) -> Self {
        self.target_vertices = Some(count);
        self
    }

    pub fn with_target_faces(mut self, count: usize) -> Self {
        self.target_faces = Some(count);
        self
    }

    pub fn with_min_edge_length(mut self, length: f32) -> Self {
        self.min_edge_length = Some(length);
        self
    }

    pub fn with_max_collapses(mut self, count: usize) -> Self {
        self.max_collapses = Some(count);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(length) = self.min_edge_length {
            if !length.is_finite() || length < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Minimum edge length must be a finite non-negative number, got {}",
                    length
                )));
            }
        }
        Ok(())
    }

    /// True if any configured condition holds for `progress`
    pub fn is_satisfied(&self, progress: &Progress) -> bool {
        let reached = |target: Option<usize>, value: usize| target.is_some_and(|n| value <= n);
        reached(self.target_vertices, progress.live_vertices)
            || reached(self.target_faces, progress.active_faces)
            || self.max_collapses.is_some_and(|n| progress.collapses >= n)
            || match (self.min_edge_length, progress.next_edge_length) {
                (Some(min), Some(next)) => next >= min,
                _ => false,
            }
    }
}

/// Snapshot of a run between two steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub collapses: usize,
    pub live_vertices: usize,
    pub active_faces: usize,
    pub active_edges: usize,
    /// Length of the edge the next step would collapse
    pub next_edge_length: Option<f32>,
}

/// Everything one collapse did
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseRecord {
    /// The collapsed edge's endpoints, now retired
    pub retired: (usize, usize),
    /// Index of the vertex appended in their place
    pub survivor: usize,
    pub position: Point3f,
    /// Length of the collapsed edge
    pub length: f32,
    pub reconciliation: Reconciliation,
    /// Faces flagged removed by this collapse
    pub faces_removed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Collapsed(CollapseRecord),
    /// No edges were left
    Done,
}

/// Result of a run.
///
/// `vertices` keeps every vertex ever created, retired ones included, so
/// that face indices and the redirect map stay meaningful. `faces` holds only
/// faces that were not removed, with every corner resolved to a live vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedMesh {
    pub vertices: Vec<Point3f>,
    pub normals: Vec<Vector3f>,
    pub faces: Vec<Face>,
    /// Retired vertex to the live vertex that replaced it
    pub redirects: BTreeMap<usize, usize>,
    pub state: SimplifierState,
    pub collapses: usize,
}

impl SimplifiedMesh {
    /// Number of vertices that have not been retired
    pub fn live_vertex_count(&self) -> usize {
        self.vertices.len() - self.redirects.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// The result as a plain mesh, vertex indices unchanged
    pub fn to_poly_mesh(&self) -> PolyMesh {
        PolyMesh {
            vertices: self.vertices.clone(),
            normals: self.normals.clone(),
            faces: self.faces.clone(),
        }
    }

    /// A mesh holding only the vertices the faces reference, renumbered in
    /// order of first use.
    pub fn compacted(&self) -> PolyMesh {
        let mut remap: HashMap<usize, usize> = HashMap::new();
        let mut vertices = Vec::new();
        let mut faces = Vec::with_capacity(self.faces.len());

        for face in &self.faces {
            let mut face = face.clone();
            for corner in face.corners_mut() {
                let old = corner.vertex;
                corner.vertex = *remap.entry(old).or_insert_with(|| {
                    vertices.push(self.vertices[old]);
                    vertices.len() - 1
                });
            }
            faces.push(face);
        }

        PolyMesh {
            vertices,
            normals: self.normals.clone(),
            faces,
        }
    }
}

/// Stepwise edge-collapse engine over one mesh
pub struct Simplifier<O = ShortestFirst> {
    vertices: Vec<Point3f>,
    normals: Vec<Vector3f>,
    faces: Vec<Face>,
    edges: EdgeIndex<O>,
    redirects: RedirectMap,
    params: SimplifyParams,
    state: SimplifierState,
    collapses: usize,
    active_faces: usize,
}

impl Simplifier<ShortestFirst> {
    /// Shortest-edge-first simplifier over `mesh`
    pub fn new(mesh: PolyMesh) -> Result<Self> {
        Self::with_order(mesh, ShortestFirst)
    }
}

impl<O: HeapOrder<Edge>> Simplifier<O> {
    /// Simplifier collapsing edges in the order given by `order`
    pub fn with_order(mesh: PolyMesh, order: O) -> Result<Self> {
        mesh.validate()?;
        let edges = EdgeIndex::build(&mesh.vertices, &mesh.faces, order)?;
        let active_faces = mesh.active_face_count();
        Ok(Self {
            vertices: mesh.vertices,
            normals: mesh.normals,
            faces: mesh.faces,
            edges,
            redirects: RedirectMap::new(),
            params: SimplifyParams::default(),
            state: SimplifierState::Running,
            collapses: 0,
            active_faces,
        })
    }

    /// Set the stop conditions used by [`Simplifier::run`]
    pub fn with_params(mut self, params: SimplifyParams) -> Result<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    pub fn params(&self) -> &SimplifyParams {
        &self.params
    }

    pub fn state(&self) -> SimplifierState {
        self.state
    }

    pub fn collapses(&self) -> usize {
        self.collapses
    }

    pub fn vertices(&self) -> &[Point3f] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn edges(&self) -> &EdgeIndex<O> {
        &self.edges
    }

    pub fn redirects(&self) -> &RedirectMap {
        &self.redirects
    }

    pub fn live_vertex_count(&self) -> usize {
        self.vertices.len() - self.redirects.len()
    }

    pub fn active_face_count(&self) -> usize {
        self.active_faces
    }

    pub fn progress(&self) -> Progress {
        Progress {
            collapses: self.collapses,
            live_vertices: self.live_vertex_count(),
            active_faces: self.active_faces,
            active_edges: self.edges.len(),
            next_edge_length: self.edges.peek_best().ok().map(Edge::length),
        }
    }

    /// Collapse the best remaining edge
    pub fn step(&mut self) -> Result<StepOutcome> {
        let edge = match self.edges.pop_best() {
            Ok(edge) => edge,
            Err(e) if e.is_empty_heap() => {
                self.state = SimplifierState::Done;
                return Ok(StepOutcome::Done);
            }
            Err(e) => return Err(e),
        };
        self.state = SimplifierState::Running;

        let (a, b) = edge.ends();
        if a == b {
            return Err(Error::InvariantViolation(format!(
                "popped degenerate edge ({}, {})",
                a, b
            )));
        }

        // Faces must be gathered before reconciliation empties the adjacency
        // of the retired vertices.
        let mut touched = edge.faces().clone();
        touched.extend(self.edges.faces_around(a));
        touched.extend(self.edges.faces_around(b));

        let position = midpoint(&self.vertices[a], &self.vertices[b]);
        let survivor = self.vertices.len();
        self.vertices.push(position);
        self.redirects.record(a, survivor)?;
        self.redirects.record(b, survivor)?;

        let reconciliation = self.edges.reconcile_after_collapse(
            a,
            b,
            survivor,
            &self.vertices,
            &self.redirects,
        )?;
        let faces_removed = self.resolve_faces(&touched);
        self.collapses += 1;

        debug!(
            a,
            b,
            survivor,
            length = edge.length(),
            updated = reconciliation.updated,
            merged = reconciliation.merged,
            dropped = reconciliation.dropped,
            faces_removed,
            "Collapsed edge"
        );

        Ok(StepOutcome::Collapsed(CollapseRecord {
            retired: (a, b),
            survivor,
            position,
            length: edge.length(),
            reconciliation,
            faces_removed,
        }))
    }

    /// Rewrite the given faces through the redirect map, flagging any face
    /// whose corners now coincide. Returns how many were flagged.
    fn resolve_faces(&mut self, touched: &BTreeSet<usize>) -> usize {
        let mut removed = 0;
        for &face_index in touched {
            let face = &mut self.faces[face_index];
            if face.is_removed() {
                continue;
            }
            let resolved: Vec<usize> = face
                .vertices()
                .map(|v| self.redirects.resolve(v))
                .collect();
            let degenerate = resolved
                .iter()
                .enumerate()
                .any(|(i, v)| resolved[i + 1..].contains(v));

            if degenerate {
                face.mark_removed();
                self.edges.detach_face(face_index, &resolved);
                self.active_faces -= 1;
                removed += 1;
            } else {
                for (corner, vertex) in face.corners_mut().iter_mut().zip(resolved) {
                    corner.vertex = vertex;
                }
            }
        }
        removed
    }

    /// Run until no edges remain or the configured stop conditions are met
    pub fn run(&mut self) -> Result<SimplifierState> {
        let params = self.params.clone();
        self.run_until(|progress| params.is_satisfied(progress))
    }

    /// Run until no edges remain or `stop` returns true. `stop` is consulted
    /// before every step, including the first.
    #[instrument(skip_all, fields(edges = self.edges.len()))]
    pub fn run_until<F>(&mut self, mut stop: F) -> Result<SimplifierState>
    where
        F: FnMut(&Progress) -> bool,
    {
        let start = self.collapses;
        loop {
            if self.edges.is_empty() {
                self.state = SimplifierState::Done;
                break;
            }
            if stop(&self.progress()) {
                self.state = SimplifierState::StoppedByBudget;
                break;
            }
            if let StepOutcome::Done = self.step()? {
                break;
            }
        }

        info!(
            collapses = self.collapses - start,
            live_vertices = self.live_vertex_count(),
            active_faces = self.active_faces,
            remaining_edges = self.edges.len(),
            state = ?self.state,
            "Simplification finished"
        );
        Ok(self.state)
    }

    /// Check every cross-structure invariant: index consistency, redirect
    /// closure, and that no surviving face references a retired vertex or
    /// repeats one.
    pub fn validate(&self) -> Result<()> {
        self.edges.check_consistency()?;

        for edge in self.edges.iter() {
            for v in [edge.a(), edge.b()] {
                if self.redirects.is_retired(v) {
                    return Err(Error::InvariantViolation(format!(
                        "active edge {:?} touches retired vertex {}",
                        edge.ends(),
                        v
                    )));
                }
            }
        }

        for (retired, _) in self.redirects.iter() {
            let (live, hops) = self.redirects.resolve_with_hops(retired);
            if self.redirects.is_retired(live) || hops > self.collapses {
                return Err(Error::InvariantViolation(format!(
                    "vertex {} resolves to {} after {} hops",
                    retired, live, hops
                )));
            }
        }

        let mut active = 0;
        for (index, face) in self.faces.iter().enumerate() {
            if face.is_removed() {
                continue;
            }
            active += 1;
            // A face with a single distinct vertex has no edges and is never
            // rewritten before finish().
            let has_edge = face.boundary_pairs().any(|(p, q)| p != q);
            if has_edge && face.vertices().any(|v| self.redirects.is_retired(v)) {
                return Err(Error::InvariantViolation(format!(
                    "face {} still references a retired vertex",
                    index
                )));
            }
            if self.collapses > 0 && face.has_repeated_vertex() {
                // Input faces may repeat a vertex; collapses never produce one.
                let first_survivor = self.vertices.len() - self.collapses;
                if face.vertices().any(|v| v >= first_survivor) {
                    return Err(Error::InvariantViolation(format!(
                        "face {} repeats a vertex after a collapse",
                        index
                    )));
                }
            }
        }
        if active != self.active_faces {
            return Err(Error::InvariantViolation(format!(
                "{} faces active but {} counted",
                active, self.active_faces
            )));
        }
        Ok(())
    }

    /// Consume the simplifier and produce the output buffers
    pub fn finish(self) -> SimplifiedMesh {
        let redirects = self.redirects;
        let faces = self
            .faces
            .into_iter()
            .filter(|face| !face.is_removed())
            .map(|mut face| {
                for corner in face.corners_mut() {
                    corner.vertex = redirects.resolve(corner.vertex);
                }
                face
            })
            .collect();

        SimplifiedMesh {
            vertices: self.vertices,
            normals: self.normals,
            faces,
            redirects: redirects.into_map(),
            state: self.state,
            collapses: self.collapses,
        }
    }
}
