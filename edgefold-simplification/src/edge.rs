//! Mesh edges and their heap orderings

use crate::heap::HeapOrder;
use edgefold_core::{distance, Error, Point3f, Result};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Order a vertex pair as `(min, max)` so every edge has a single key.
#[inline]
pub fn canonical(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// An undirected edge between two distinct vertices.
///
/// Endpoints are stored canonically (`a < b`). The length is cached and must
/// be refreshed whenever an endpoint moves; `faces` holds the indices of the
/// faces currently bounded by this edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    a: usize,
    b: usize,
    length: f32,
    faces: BTreeSet<usize>,
}

impl Edge {
    /// Create an edge with a precomputed length
    pub fn new(a: usize, b: usize, length: f32) -> Result<Self> {
        if a == b {
            return Err(Error::InvariantViolation(format!(
                "edge endpoints must differ, both are {}",
                a
            )));
        }
        let (a, b) = canonical(a, b);
        Ok(Self {
            a,
            b,
            length,
            faces: BTreeSet::new(),
        })
    }

    /// Create an edge measuring its length against `vertices`
    pub fn between(a: usize, b: usize, vertices: &[Point3f]) -> Result<Self> {
        let length = measure(a, b, vertices)?;
        Self::new(a, b, length)
    }

    pub fn a(&self) -> usize {
        self.a
    }

    pub fn b(&self) -> usize {
        self.b
    }

    /// Canonical endpoint pair, also the edge's key
    pub fn ends(&self) -> (usize, usize) {
        (self.a, self.b)
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn faces(&self) -> &BTreeSet<usize> {
        &self.faces
    }

    pub fn touches(&self, vertex: usize) -> bool {
        self.a == vertex || self.b == vertex
    }

    /// The endpoint opposite `vertex`, if `vertex` is an endpoint
    pub fn other(&self, vertex: usize) -> Option<usize> {
        if vertex == self.a {
            Some(self.b)
        } else if vertex == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn add_face(&mut self, face: usize) {
        self.faces.insert(face);
    }

    pub fn remove_face(&mut self, face: usize) -> bool {
        self.faces.remove(&face)
    }

    /// Union another edge's incident faces into this one
    pub fn merge_faces(&mut self, faces: &BTreeSet<usize>) {
        self.faces.extend(faces.iter().copied());
    }

    /// Move the edge onto a new pair of endpoints and remeasure it.
    ///
    /// The heap position is not touched; callers holding the edge inside a
    /// heap must reheapify afterwards.
    pub fn reconnect(&mut self, a: usize, b: usize, vertices: &[Point3f]) -> Result<()> {
        if a == b {
            return Err(Error::InvariantViolation(format!(
                "cannot reconnect edge ({}, {}) onto a single vertex {}",
                self.a, self.b, a
            )));
        }
        let length = measure(a, b, vertices)?;
        let (a, b) = canonical(a, b);
        self.a = a;
        self.b = b;
        self.length = length;
        Ok(())
    }
}

fn measure(a: usize, b: usize, vertices: &[Point3f]) -> Result<f32> {
    match (vertices.get(a), vertices.get(b)) {
        (Some(pa), Some(pb)) => Ok(distance(pa, pb)),
        _ => Err(Error::InvalidData(format!(
            "edge ({}, {}) references a vertex beyond the {} available",
            a,
            b,
            vertices.len()
        ))),
    }
}

/// Shortest edge at the root of the heap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortestFirst;

/// Longest edge at the root of the heap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LongestFirst;

impl HeapOrder<Edge> for ShortestFirst {
    fn precedes(&self, a: &Edge, b: &Edge) -> bool {
        a.length.total_cmp(&b.length) == Ordering::Less
    }
}

impl HeapOrder<Edge> for LongestFirst {
    fn precedes(&self, a: &Edge, b: &Edge) -> bool {
        a.length.total_cmp(&b.length) == Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn points() -> Vec<Point3f> {
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(3.0, 4.0, 0.0),
            Point3f::new(0.0, 0.0, 2.0),
        ]
    }

    #[test]
    fn test_new_is_canonical() {
        let e = Edge::new(7, 2, 1.0).unwrap();
        assert_eq!(e.ends(), (2, 7));
        assert_eq!(e.other(2), Some(7));
        assert_eq!(e.other(7), Some(2));
        assert_eq!(e.other(3), None);
    }

    #[test]
    fn test_equal_endpoints_rejected() {
        assert!(matches!(
            Edge::new(4, 4, 0.0),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_between_measures_length() {
        let e = Edge::between(1, 0, &points()).unwrap();
        assert_relative_eq!(e.length(), 5.0);
        assert!(Edge::between(0, 9, &points()).is_err());
    }

    #[test]
    fn test_reconnect_remeasures() {
        let verts = points();
        let mut e = Edge::between(0, 1, &verts).unwrap();
        e.add_face(3);
        e.reconnect(2, 0, &verts).unwrap();
        assert_eq!(e.ends(), (0, 2));
        assert_relative_eq!(e.length(), 2.0);
        assert!(e.faces().contains(&3));
        assert!(e.reconnect(1, 1, &verts).is_err());
    }

    #[test]
    fn test_merge_faces() {
        let mut e = Edge::new(0, 1, 1.0).unwrap();
        e.add_face(0);
        let mut other = Edge::new(1, 2, 1.0).unwrap();
        other.add_face(0);
        other.add_face(5);
        e.merge_faces(other.faces());
        assert_eq!(e.faces().iter().copied().collect::<Vec<_>>(), vec![0, 5]);
        assert!(e.remove_face(0));
        assert!(!e.remove_face(0));
    }

    #[test]
    fn test_orderings() {
        let short = Edge::new(0, 1, 1.0).unwrap();
        let long = Edge::new(0, 2, 2.0).unwrap();
        assert!(ShortestFirst.precedes(&short, &long));
        assert!(!ShortestFirst.precedes(&long, &short));
        assert!(!ShortestFirst.precedes(&short, &short));
        assert!(LongestFirst.precedes(&long, &short));
    }
}
