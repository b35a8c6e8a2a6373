//! OBJ format support
//!
//! Decodes the line-record subset the simplifier consumes:
//!
//! - `v x y z` vertex position
//! - `vn x y z` vertex normal (kept, but unused downstream)
//! - `f c1 c2 c3 [c4]` face with 3 or 4 corners, where each corner is one of
//!   `v`, `v/t`, `v//n` or `v/t/n`
//!
//! References in the file are 1-based and are converted to 0-based here.
//! Texture coordinates, groups, materials and comments are skipped.

use crate::MeshReader;
use edgefold_core::{
    Corner, Error, Face, Point3f, PolyMesh, Result, Vector3f, MAX_FACE_CORNERS, MIN_FACE_CORNERS,
};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Stateless OBJ decoder
pub struct ObjLoader;

impl ObjLoader {
    /// Load a mesh from a file on disk
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<PolyMesh> {
        let file = File::open(path.as_ref())?;
        let mesh = Self::read(BufReader::new(file))?;
        info!(
            vertices = mesh.vertex_count(),
            normals = mesh.normals.len(),
            faces = mesh.face_count(),
            "Loaded OBJ mesh"
        );
        Ok(mesh)
    }

    /// Decode a mesh from an in-memory string
    pub fn parse_str(source: &str) -> Result<PolyMesh> {
        Self::read(source.as_bytes())
    }

    /// Decode a mesh from any buffered reader
    pub fn read<R: BufRead>(reader: R) -> Result<PolyMesh> {
        let mut mesh = PolyMesh::new();
        let mut skipped = 0usize;

        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Err(Error::format(line_number, "<invalid utf-8>", e.to_string()));
                }
                Err(e) => return Err(e.into()),
            };

            let content = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line.as_str(),
            };
            let mut tokens = content.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };

            match keyword {
                "v" => {
                    let [x, y, z] = parse_triple(tokens, line_number, &line, "vertex")?;
                    mesh.vertices.push(Point3f::new(x, y, z));
                }
                "vn" => {
                    let [x, y, z] = parse_triple(tokens, line_number, &line, "normal")?;
                    mesh.normals.push(Vector3f::new(x, y, z));
                }
                "f" => {
                    let face = parse_face(tokens, line_number, &line)?;
                    mesh.faces.push(face);
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, "Ignored unsupported OBJ records");
        }
        Ok(mesh)
    }
}

impl MeshReader for ObjLoader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<PolyMesh> {
        Self::load(path)
    }
}

fn parse_triple<'a>(
    mut tokens: impl Iterator<Item = &'a str>,
    line_number: usize,
    line: &str,
    what: &str,
) -> Result<[f32; 3]> {
    let mut out = [0.0f32; 3];
    for (axis, slot) in out.iter_mut().enumerate() {
        let token = tokens.next().ok_or_else(|| {
            Error::format(
                line_number,
                line,
                format!("{} needs 3 coordinates, found {}", what, axis),
            )
        })?;
        *slot = token.parse::<f32>().map_err(|_| {
            Error::format(
                line_number,
                line,
                format!("{} coordinate `{}` is not a number", what, token),
            )
        })?;
    }
    Ok(out)
}

fn parse_face<'a>(
    tokens: impl Iterator<Item = &'a str>,
    line_number: usize,
    line: &str,
) -> Result<Face> {
    let tokens: Vec<&str> = tokens.collect();
    if !(MIN_FACE_CORNERS..=MAX_FACE_CORNERS).contains(&tokens.len()) {
        return Err(Error::format(
            line_number,
            line,
            format!("face has {} corners, expected 3 or 4", tokens.len()),
        ));
    }

    let corners = tokens
        .iter()
        .map(|token| parse_corner(token, line_number, line))
        .collect::<Result<Vec<_>>>()?;
    Face::new(corners).map_err(|e| Error::format(line_number, line, e.to_string()))
}

/// Parse a corner token: `v`, `v/t`, `v//n` or `v/t/n`.
fn parse_corner(token: &str, line_number: usize, line: &str) -> Result<Corner> {
    let parts: Vec<&str> = token.split('/').collect();
    let reference = |text: &str| parse_reference(text, token, line_number, line);

    match parts[..] {
        [v] => Ok(Corner::new(reference(v)?)),
        [v, t] => Ok(Corner::with_refs(reference(v)?, Some(reference(t)?), None)),
        [v, t, n] => {
            let texture = if t.is_empty() {
                None
            } else {
                Some(reference(t)?)
            };
            Ok(Corner::with_refs(reference(v)?, texture, Some(reference(n)?)))
        }
        _ => Err(Error::format(
            line_number,
            line,
            format!("unrecognized face corner `{}`", token),
        )),
    }
}

/// Convert a 1-based reference to a 0-based index.
fn parse_reference(text: &str, token: &str, line_number: usize, line: &str) -> Result<usize> {
    match text.parse::<usize>() {
        Ok(value) if value >= 1 => Ok(value - 1),
        _ => Err(Error::format(
            line_number,
            line,
            format!("face corner `{}` has invalid reference `{}`", token, text),
        )),
    }
}
