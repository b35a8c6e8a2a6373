//! Run summary in text and JSON form

use std::fmt;
use std::path::Path;

use edgefold_core::PolyMesh;
use edgefold_simplification::{SimplifiedMesh, SimplifierState};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Summary {
    pub input: String,
    pub input_vertices: usize,
    pub input_faces: usize,
    /// Live vertices, or referenced vertices when compacted
    pub output_vertices: usize,
    pub output_faces: usize,
    /// Length of the vertex buffer including retired vertices
    pub vertex_buffer: usize,
    pub collapses: usize,
    pub state: SimplifierState,
    pub compacted: bool,
}

impl Summary {
    pub fn new(input: &Path, mesh: &PolyMesh, result: &SimplifiedMesh, compact: bool) -> Self {
        let output_vertices = if compact {
            result.compacted().vertex_count()
        } else {
            result.live_vertex_count()
        };
        Self {
            input: input.display().to_string(),
            input_vertices: mesh.vertex_count(),
            input_faces: mesh.active_face_count(),
            output_vertices,
            output_faces: result.face_count(),
            vertex_buffer: result.vertices.len(),
            collapses: result.collapses,
            state: result.state,
            compacted: compact,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input:      {}", self.input)?;
        writeln!(
            f,
            "  {} vertices, {} faces",
            self.input_vertices, self.input_faces
        )?;
        writeln!(
            f,
            "Output:     {} vertices, {} faces{}",
            self.output_vertices,
            self.output_faces,
            if self.compacted { " (compacted)" } else { "" }
        )?;
        writeln!(f, "  vertex buffer holds {}", self.vertex_buffer)?;
        writeln!(f, "Collapses:  {}", self.collapses)?;
        writeln!(f, "State:      {:?}", self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgefold_core::{Face, Point3f};
    use edgefold_simplification::{Simplifier, SimplifyParams};

    fn simplified(max_collapses: usize) -> (PolyMesh, SimplifiedMesh) {
        let mesh = PolyMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(0.1, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
            ],
            vec![Face::triangle(0, 1, 2), Face::triangle(1, 3, 2)],
        );
        let mut s = Simplifier::new(mesh.clone())
            .unwrap()
            .with_params(SimplifyParams::new().with_max_collapses(max_collapses))
            .unwrap();
        s.run().unwrap();
        (mesh, s.finish())
    }

    #[test]
    fn test_summary_counts() {
        let (mesh, result) = simplified(1);
        let summary = Summary::new(Path::new("in.obj"), &mesh, &result, false);
        assert_eq!(summary.input_vertices, 4);
        assert_eq!(summary.input_faces, 2);
        assert_eq!(summary.output_vertices, 3);
        assert_eq!(summary.output_faces, 1);
        assert_eq!(summary.vertex_buffer, 5);
        assert_eq!(summary.collapses, 1);

        let text = summary.to_string();
        assert!(text.contains("3 vertices, 1 faces"));
        assert!(text.contains("StoppedByBudget"));
    }

    #[test]
    fn test_summary_json() {
        let (mesh, result) = simplified(1);
        let summary = Summary::new(Path::new("in.obj"), &mesh, &result, true);
        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["output_vertices"], 3);
        assert_eq!(json["state"], "StoppedByBudget");
        assert_eq!(json["compacted"], true);
    }
}
