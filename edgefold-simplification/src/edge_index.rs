//! Active edge set and vertex adjacency
//!
//! [`EdgeIndex`] owns the heap of active edges together with two lookups that
//! must agree with it at every point between collapses: canonical vertex pair
//! to heap handle, and vertex to the handles of the edges touching it. After
//! each collapse, [`EdgeIndex::reconcile_after_collapse`] re-homes, merges or
//! drops every edge that touched one of the retired vertices.

use crate::edge::{canonical, Edge, ShortestFirst};
use crate::heap::{HeapHandle, HeapOrder, PriorityHeap};
use crate::redirect::RedirectMap;
use edgefold_core::{Error, Face, Point3f, Result};
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{info, instrument, trace, warn};

/// What happened to the edges around a collapse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Edges moved onto the survivor and remeasured
    pub updated: usize,
    /// Edges folded into an existing edge with the same endpoints
    pub merged: usize,
    /// Edges whose endpoints collapsed onto each other
    pub dropped: usize,
}

pub struct EdgeIndex<O = ShortestFirst> {
    heap: PriorityHeap<Edge, O>,
    pairs: HashMap<(usize, usize), HeapHandle>,
    adjacency: HashMap<usize, HashSet<HeapHandle>>,
}

impl<O: HeapOrder<Edge>> EdgeIndex<O> {
    /// Create an empty index
    pub fn new(order: O) -> Self {
        Self {
            heap: PriorityHeap::new(order),
            pairs: HashMap::new(),
            adjacency: HashMap::new(),
        }
    }

    /// Index every boundary edge of every face that is not flagged removed.
    ///
    /// Edges shared by several faces are created once and collect all of
    /// their faces. A face that repeats a vertex contributes no edge for the
    /// repeated pair.
    #[instrument(skip_all, fields(vertices = vertices.len(), faces = faces.len()))]
    pub fn build(vertices: &[Point3f], faces: &[Face], order: O) -> Result<Self> {
        let mut index = Self::new(order);
        for (face_index, face) in faces.iter().enumerate() {
            if face.is_removed() {
                continue;
            }
            for (p, q) in face.boundary_pairs() {
                index.register(face_index, p, q, vertices)?;
            }
        }
        info!(edges = index.len(), "Built edge index");
        Ok(index)
    }

    fn register(&mut self, face: usize, p: usize, q: usize, vertices: &[Point3f]) -> Result<()> {
        if p == q {
            warn!(face, vertex = p, "Skipping repeated vertex in face");
            return Ok(());
        }
        let key = canonical(p, q);
        if let Some(&handle) = self.pairs.get(&key) {
            self.edge_mut(handle)?.add_face(face);
            return Ok(());
        }

        let mut edge = Edge::between(p, q, vertices)?;
        edge.add_face(face);
        let handle = self.heap.insert(edge);
        self.pairs.insert(key, handle);
        self.attach(p, handle);
        self.attach(q, handle);
        Ok(())
    }

    /// Number of active edges
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The next edge to collapse
    pub fn peek_best(&self) -> Result<&Edge> {
        self.heap.peek_min()
    }

    /// Remove the next edge to collapse from the heap and from both lookups
    pub fn pop_best(&mut self) -> Result<Edge> {
        let (handle, edge) = self.heap.pop_entry()?;
        self.pairs.remove(&edge.ends());
        self.detach(edge.a(), handle);
        self.detach(edge.b(), handle);
        Ok(edge)
    }

    /// Remove the active edge between two vertices
    pub fn remove_edge(&mut self, a: usize, b: usize) -> Result<Edge> {
        let handle = self
            .pairs
            .remove(&canonical(a, b))
            .ok_or_else(|| Error::InvalidData(format!("no active edge between {} and {}", a, b)))?;
        let edge = self.heap.delete(handle)?;
        self.detach(edge.a(), handle);
        self.detach(edge.b(), handle);
        Ok(edge)
    }

    /// The active edge between two vertices, in either order
    pub fn edge(&self, a: usize, b: usize) -> Option<&Edge> {
        let handle = self.pairs.get(&canonical(a, b))?;
        self.heap.get(*handle)
    }

    /// Active edges touching `vertex`
    pub fn incident(&self, vertex: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.adjacency
            .get(&vertex)
            .into_iter()
            .flatten()
            .filter_map(|handle| self.heap.get(*handle))
    }

    /// Number of active edges touching `vertex`
    pub fn degree(&self, vertex: usize) -> usize {
        self.adjacency.get(&vertex).map_or(0, HashSet::len)
    }

    /// Union of the faces bounded by edges touching `vertex`
    pub fn faces_around(&self, vertex: usize) -> BTreeSet<usize> {
        self.incident(vertex)
            .flat_map(|edge| edge.faces().iter().copied())
            .collect()
    }

    /// Every active edge, in heap level order
    pub fn iter(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.heap.iter().map(|(_, edge)| edge)
    }

    /// Re-home the edges of two vertices that were just collapsed into
    /// `survivor`.
    ///
    /// Every handle registered at `retired_a` or `retired_b` is classified
    /// against the far endpoint it resolves to:
    ///
    /// - far endpoint is `survivor`: the edge is degenerate and is dropped;
    /// - an edge from `survivor` to the far endpoint already exists: the faces
    ///   are merged into it and this edge is dropped;
    /// - otherwise the edge is reconnected to `survivor`, remeasured against
    ///   `vertices` and reheapified.
    ///
    /// The collapsed edge itself must already be gone (see
    /// [`EdgeIndex::pop_best`]), and `survivor` must already be in `vertices`.
    pub fn reconcile_after_collapse(
        &mut self,
        retired_a: usize,
        retired_b: usize,
        survivor: usize,
        vertices: &[Point3f],
        redirects: &RedirectMap,
    ) -> Result<Reconciliation> {
        let handles: BTreeSet<HeapHandle> = [retired_a, retired_b]
            .iter()
            .filter_map(|v| self.adjacency.remove(v))
            .flatten()
            .collect();

        let mut tally = Reconciliation::default();
        for handle in handles {
            let edge = self.heap.get(handle).ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "adjacency of ({}, {}) holds stale handle {:?}",
                    retired_a, retired_b, handle
                ))
            })?;
            let old_key = edge.ends();
            let far = match (edge.other(retired_a), edge.other(retired_b)) {
                (Some(far), _) | (None, Some(far)) => far,
                (None, None) => {
                    return Err(Error::InvariantViolation(format!(
                        "edge {:?} is registered at a retired vertex it does not touch",
                        old_key
                    )))
                }
            };
            let far_live = redirects.resolve(far);
            self.pairs.remove(&old_key);

            if far_live == survivor {
                self.heap.delete(handle)?;
                self.detach(far, handle);
                trace!(edge = ?old_key, "Dropped degenerate edge");
                tally.dropped += 1;
                continue;
            }

            let key = canonical(survivor, far_live);
            if let Some(&keeper) = self.pairs.get(&key) {
                let duplicate = self.heap.delete(handle)?;
                self.detach(far, handle);
                self.edge_mut(keeper)?.merge_faces(duplicate.faces());
                trace!(edge = ?old_key, into = ?key, "Merged duplicate edge");
                tally.merged += 1;
                continue;
            }

            if far_live != far {
                self.detach(far, handle);
                self.attach(far_live, handle);
            }
            self.edge_mut(handle)?
                .reconnect(survivor, far_live, vertices)?;
            self.heap.reheapify(handle)?;
            self.pairs.insert(key, handle);
            self.attach(survivor, handle);
            tally.updated += 1;
        }

        Ok(tally)
    }

    /// Forget a removed face on the edges along its (resolved) boundary
    pub fn detach_face(&mut self, face: usize, corners: &[usize]) {
        for (&p, &q) in corners.iter().circular_tuple_windows() {
            if p == q {
                continue;
            }
            if let Some(&handle) = self.pairs.get(&canonical(p, q)) {
                if let Some(edge) = self.heap.get_mut(handle) {
                    edge.remove_face(face);
                }
            }
        }
    }

    /// Confirm that the heap, the pair lookup and the adjacency sets describe
    /// the same set of edges, with no duplicate or degenerate edge among them.
    pub fn check_consistency(&self) -> Result<()> {
        let violation = |msg: String| Err(Error::InvariantViolation(msg));

        self.heap.check_invariants()?;
        if self.pairs.len() != self.heap.len() {
            return violation(format!(
                "{} keyed edges but {} edges in the heap",
                self.pairs.len(),
                self.heap.len()
            ));
        }

        for (handle, edge) in self.heap.iter() {
            let (a, b) = edge.ends();
            if a >= b {
                return violation(format!(
                    "edge ({}, {}) is degenerate or not canonical",
                    a, b
                ));
            }
            if self.pairs.get(&(a, b)) != Some(&handle) {
                return violation(format!(
                    "edge ({}, {}) is not keyed by its endpoints",
                    a, b
                ));
            }
            for v in [a, b] {
                if !self.adjacency.get(&v).is_some_and(|set| set.contains(&handle)) {
                    return violation(format!(
                        "edge ({}, {}) missing from adjacency of vertex {}",
                        a, b, v
                    ));
                }
            }
        }

        let mut registrations = 0usize;
        for (&vertex, handles) in &self.adjacency {
            for &handle in handles {
                match self.heap.get(handle) {
                    Some(edge) if edge.touches(vertex) => registrations += 1,
                    Some(edge) => {
                        return violation(format!(
                            "vertex {} lists edge {:?} that does not touch it",
                            vertex,
                            edge.ends()
                        ))
                    }
                    None => {
                        return violation(format!(
                            "vertex {} lists stale handle {:?}",
                            vertex, handle
                        ))
                    }
                }
            }
        }
        if registrations != 2 * self.heap.len() {
            return violation(format!(
                "{} adjacency registrations for {} edges",
                registrations,
                self.heap.len()
            ));
        }
        Ok(())
    }

    fn edge_mut(&mut self, handle: HeapHandle) -> Result<&mut Edge> {
        self.heap.get_mut(handle).ok_or(Error::StaleHandle {
            slot: handle.slot(),
            generation: handle.generation(),
        })
    }

    fn attach(&mut self, vertex: usize, handle: HeapHandle) {
        self.adjacency.entry(vertex).or_default().insert(handle);
    }

    fn detach(&mut self, vertex: usize, handle: HeapHandle) {
        if let Some(set) = self.adjacency.get_mut(&vertex) {
            set.remove(&handle);
            if set.is_empty() {
                self.adjacency.remove(&vertex);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::LongestFirst;
    use approx::assert_relative_eq;

    /// Unit square split along the 0-2 diagonal
    fn square() -> (Vec<Point3f>, Vec<Face>) {
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![Face::triangle(0, 1, 2), Face::triangle(0, 2, 3)];
        (vertices, faces)
    }

    #[test]
    fn test_build_shares_edges() {
        let (vertices, faces) = square();
        let index = EdgeIndex::build(&vertices, &faces, ShortestFirst).unwrap();
        assert_eq!(index.len(), 5);
        let diagonal = index.edge(2, 0).unwrap();
        assert_eq!(diagonal.faces().len(), 2);
        assert_relative_eq!(diagonal.length(), 2.0f32.sqrt());
        assert_eq!(index.degree(0), 3);
        assert_eq!(index.degree(1), 2);
        assert_eq!(index.faces_around(1), BTreeSet::from([0]));
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_build_skips_removed_and_repeated() {
        let (vertices, mut faces) = square();
        faces[1].mark_removed();
        faces.push(Face::triangle(1, 1, 3));
        let index = EdgeIndex::build(&vertices, &faces, ShortestFirst).unwrap();
        // 0-1, 1-2, 2-0 from the first face plus 1-3 from the repeated one
        assert_eq!(index.len(), 4);
        assert!(index.edge(1, 3).is_some());
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_pop_best_clears_lookups() {
        let (vertices, faces) = square();
        let mut index = EdgeIndex::build(&vertices, &faces, LongestFirst).unwrap();
        let longest = index.pop_best().unwrap();
        assert_eq!(longest.ends(), (0, 2));
        assert!(index.edge(0, 2).is_none());
        assert_eq!(index.degree(0), 2);
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_reconcile_merges_and_updates() {
        let (mut vertices, faces) = square();
        let mut index = EdgeIndex::build(&vertices, &faces, ShortestFirst).unwrap();

        // Collapse side 0-1 by hand.
        let mut redirects = RedirectMap::new();
        let edge = index.remove_edge(1, 0).unwrap();
        assert_eq!(edge.ends(), (0, 1));
        vertices.push(Point3f::new(0.5, 0.0, 0.0));
        let survivor = vertices.len() - 1;
        redirects.record(0, survivor).unwrap();
        redirects.record(1, survivor).unwrap();

        let tally = index
            .reconcile_after_collapse(0, 1, survivor, &vertices, &redirects)
            .unwrap();
        // 1-2 and 0-2 both become survivor-2; 0-3 becomes survivor-3.
        assert_eq!(
            tally,
            Reconciliation {
                updated: 2,
                merged: 1,
                dropped: 0
            }
        );
        assert_eq!(index.len(), 3);
        let merged = index.edge(survivor, 2).unwrap();
        assert_eq!(merged.faces(), &BTreeSet::from([0, 1]));
        let moved = index.edge(3, survivor).unwrap();
        assert_relative_eq!(moved.length(), (0.25f32 + 1.0).sqrt());
        assert_eq!(index.degree(0), 0);
        assert_eq!(index.degree(1), 0);
        assert_eq!(index.degree(survivor), 2);
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_reconcile_drops_degenerate() {
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(5.0, 0.0, 0.0),
            Point3f::new(0.5, 0.0, 0.0),
        ];
        let faces = vec![Face::triangle(0, 1, 2)];
        let mut index = EdgeIndex::build(&vertices[..3], &faces, ShortestFirst).unwrap();
        let mut redirects = RedirectMap::new();

        // Retire 0 and 2 without removing 0-2 first, so that edge's far end
        // resolves to the survivor.
        redirects.record(0, 3).unwrap();
        redirects.record(2, 3).unwrap();
        let tally = index
            .reconcile_after_collapse(0, 2, 3, &vertices, &redirects)
            .unwrap();
        assert_eq!(tally.dropped, 1);
        assert_eq!(tally.merged, 1);
        assert!(index.edge(1, 3).is_some());
        assert_eq!(index.len(), 1);
        index.check_consistency().unwrap();
    }

    #[test]
    fn test_remove_missing_edge() {
        let (vertices, faces) = square();
        let mut index = EdgeIndex::build(&vertices, &faces, ShortestFirst).unwrap();
        assert!(index.remove_edge(1, 3).is_err());
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn test_detach_face() {
        let (vertices, faces) = square();
        let mut index = EdgeIndex::build(&vertices, &faces, ShortestFirst).unwrap();
        index.detach_face(1, &[0, 2, 3]);
        assert_eq!(index.edge(0, 2).unwrap().faces(), &BTreeSet::from([0]));
        assert!(index.edge(2, 3).unwrap().faces().is_empty());
        assert!(index.edge(0, 3).unwrap().faces().is_empty());
    }
}
