// src/io/obj_read.rs
// Wavefront OBJ warp mesh importer

//! Reads warp meshes stored as Wavefront OBJ.
//!
//! Only the subset emitted by warping tools is understood: `v` records
//! carry normalized device coordinates (any z component is ignored),
//! `vt` records carry texture coordinates, and faces must be triangles
//! with full `a/b/c` reference triples. Texture coordinates are matched
//! to vertices by record order, so the file must carry exactly one `vt`
//! per `v`. Positions and texcoords are used as stored, with no
//! viewport remap.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{CorrectionVertex, GeometryBuffer, Topology};

/// Import a warp mesh from a Wavefront OBJ file.
pub fn import_obj_mesh<P: AsRef<Path>>(path: P) -> MeshResult<GeometryBuffer> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| MeshError::file_not_found(path, e))?;
    parse_obj(BufReader::new(file))
}

/// A corner must be a full `v/vt/vn` reference with numeric fields; only
/// the vertex index is kept.
fn face_corner(token: &str) -> Option<u32> {
    let mut parts = token.split('/');
    let vertex = parts.next()?.parse::<i32>().ok()?;
    parts.next()?.parse::<i32>().ok()?;
    parts.next()?.parse::<i32>().ok()?;
    // OBJ references are 1-based; out-of-range results are caught by the
    // buffer validation at the end
    Some(vertex.wrapping_sub(1) as u32)
}

fn parse_obj<R: BufRead>(reader: R) -> MeshResult<GeometryBuffer> {
    let mut vertices: Vec<CorrectionVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut tex_coords_seen = 0usize;

    for line in reader.lines() {
        let line = line?;
        let mut it = line.split_whitespace();
        match it.next() {
            Some("v") => {
                let (Some(x), Some(y)) = (
                    it.next().and_then(|t| t.parse::<f32>().ok()),
                    it.next().and_then(|t| t.parse::<f32>().ok()),
                ) else {
                    continue;
                };
                vertices.push(CorrectionVertex::white([x, y], [0.0, 0.0]));
            }
            Some("vt") => {
                let (Some(s), Some(t)) = (
                    it.next().and_then(|t| t.parse::<f32>().ok()),
                    it.next().and_then(|t| t.parse::<f32>().ok()),
                ) else {
                    continue;
                };
                if let Some(vertex) = vertices.get_mut(tex_coords_seen) {
                    vertex.tex_coord = [s, t];
                }
                tex_coords_seen += 1;
            }
            Some("f") => {
                let (Some(a), Some(b), Some(c)) = (
                    it.next().and_then(face_corner),
                    it.next().and_then(face_corner),
                    it.next().and_then(face_corner),
                ) else {
                    continue;
                };
                indices.extend_from_slice(&[a, b, c]);
            }
            _ => {}
        }
    }

    if vertices.is_empty() {
        return Err(MeshError::invalid_geometry("OBJ mesh contains no vertices"));
    }
    if tex_coords_seen != vertices.len() {
        return Err(MeshError::count_mismatch(
            "OBJ texture coordinates",
            vertices.len(),
            tex_coords_seen,
        ));
    }

    let buf = GeometryBuffer {
        vertices,
        indices,
        topology: Topology::TriangleList,
    };
    buf.validate()?;
    log::debug!(
        "OBJ mesh read: {} vertices, {} indices",
        buf.vertex_count(),
        buf.index_count()
    );
    Ok(buf)
}
