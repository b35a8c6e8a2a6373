//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// Smallest number of corners a face may have (triangle)
pub const MIN_FACE_CORNERS: usize = 3;
/// Largest number of corners a face may have (quad)
pub const MAX_FACE_CORNERS: usize = 4;

/// One corner of a face: a vertex reference plus optional texture and
/// normal references. All indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Corner {
    pub vertex: usize,
    pub texture: Option<usize>,
    pub normal: Option<usize>,
}

impl Corner {
    /// Corner referencing only a vertex
    pub fn new(vertex: usize) -> Self {
        Self {
            vertex,
            texture: None,
            normal: None,
        }
    }

    /// Corner with texture and normal references
    pub fn with_refs(vertex: usize, texture: Option<usize>, normal: Option<usize>) -> Self {
        Self {
            vertex,
            texture,
            normal,
        }
    }
}

/// A triangle or quad.
///
/// Faces are never physically deleted while a mesh is being simplified; a
/// face whose corners collapse onto each other is flagged as removed instead,
/// which keeps face indices stable for everything that refers to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    corners: Vec<Corner>,
    #[serde(default)]
    removed: bool,
}

impl Face {
    /// Create a face from 3 or 4 corners
    pub fn new(corners: Vec<Corner>) -> Result<Self> {
        if !(MIN_FACE_CORNERS..=MAX_FACE_CORNERS).contains(&corners.len()) {
            return Err(Error::InvalidData(format!(
                "Face must have {} or {} corners, got {}",
                MIN_FACE_CORNERS,
                MAX_FACE_CORNERS,
                corners.len()
            )));
        }
        Ok(Self {
            corners,
            removed: false,
        })
    }

    /// Create a face from bare vertex indices
    pub fn from_vertices(vertices: &[usize]) -> Result<Self> {
        Self::new(vertices.iter().copied().map(Corner::new).collect())
    }

    /// Create a triangle from vertex indices
    pub fn triangle(a: usize, b: usize, c: usize) -> Self {
        Self {
            corners: vec![Corner::new(a), Corner::new(b), Corner::new(c)],
            removed: false,
        }
    }

    /// Create a quad from vertex indices
    pub fn quad(a: usize, b: usize, c: usize, d: usize) -> Self {
        Self {
            corners: vec![
                Corner::new(a),
                Corner::new(b),
                Corner::new(c),
                Corner::new(d),
            ],
            removed: false,
        }
    }

    pub fn corners(&self) -> &[Corner] {
        &self.corners
    }

    /// Mutable access to the corners. The corner count cannot change.
    pub fn corners_mut(&mut self) -> &mut [Corner] {
        &mut self.corners
    }

    /// Number of corners (3 or 4)
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    /// Vertex indices in corner order
    pub fn vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.corners.iter().map(|c| c.vertex)
    }

    /// Boundary vertex pairs in winding order, including the closing pair
    pub fn boundary_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.corners.len();
        (0..n).map(move |i| (self.corners[i].vertex, self.corners[(i + 1) % n].vertex))
    }

    /// True if any two corners reference the same vertex
    pub fn has_repeated_vertex(&self) -> bool {
        let n = self.corners.len();
        (0..n).any(|i| ((i + 1)..n).any(|j| self.corners[i].vertex == self.corners[j].vertex))
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Flag the face as degenerate
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }
}

/// A polygon mesh of triangles and quads, as decoded from a geometry file.
///
/// Normals are carried for completeness; nothing downstream of the loader
/// reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolyMesh {
    pub vertices: Vec<Point3f>,
    pub normals: Vec<Vector3f>,
    pub faces: Vec<Face>,
}

impl PolyMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<Face>) -> Self {
        Self {
            vertices,
            normals: Vec::new(),
            faces,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces, removed ones included
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of faces not flagged as removed
    pub fn active_face_count(&self) -> usize {
        self.faces.iter().filter(|f| !f.is_removed()).count()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh, returning its index
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh, returning its index
    pub fn add_face(&mut self, face: Face) -> usize {
        let index = self.faces.len();
        self.faces.push(face);
        index
    }

    /// Check every corner's vertex reference against the vertex list.
    ///
    /// Texture and normal references are carried through untouched and not
    /// checked here; see [`PolyMesh::validate_normals`].
    pub fn validate(&self) -> Result<()> {
        let nv = self.vertices.len();
        for (fi, face) in self.faces.iter().enumerate() {
            if let Some(v) = face.vertices().find(|&v| v >= nv) {
                return Err(Error::InvalidData(format!(
                    "Face {} references vertex {} but the mesh has {} vertices",
                    fi, v, nv
                )));
            }
        }
        Ok(())
    }

    /// Check every corner's normal reference against the normal list
    pub fn validate_normals(&self) -> Result<()> {
        let nn = self.normals.len();
        for (fi, face) in self.faces.iter().enumerate() {
            for n in face.corners().iter().filter_map(|c| c.normal) {
                if n >= nn {
                    return Err(Error::InvalidData(format!(
                        "Face {} references normal {} but the mesh has {} normals",
                        fi, n, nn
                    )));
                }
            }
        }
        Ok(())
    }
}
