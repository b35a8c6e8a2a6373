//! Geometry file decoding for edgefold
//!
//! This crate turns text geometry descriptions into [`PolyMesh`] values for
//! the simplifier. Only the OBJ line-record format is supported.

pub mod obj;

pub use obj::ObjLoader;

use edgefold_core::{PolyMesh, Result};

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<std::path::Path>>(path: P) -> Result<PolyMesh>;
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<std::path::Path>>(path: P) -> Result<PolyMesh> {
    let path = path.as_ref();
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("obj") => obj::ObjLoader::read_mesh(path),
        _ => Err(edgefold_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}
