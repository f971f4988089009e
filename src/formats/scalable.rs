// src/formats/scalable.rs
// Scalable Display / MeshMapper warp files (.ol)

//! Parser for Scalable Display Technologies mesh files.
//!
//! The file interleaves sizing/metadata keywords (`VERTICES n`, `FACES n`,
//! `ORTHO_LEFT/RIGHT/BOTTOM/TOP v`, `NATIVEXRES/NATIVEYRES n`) with data
//! lines: `x y intensity s t` for vertices and `[ a b c ]` for faces.
//!
//! Data lines only land once their sizing keyword has been seen, so the
//! format is order-dependent: vertex lines seen before `VERTICES` and both
//! native resolutions are dropped, and face lines seen before `FACES` are
//! counted but not stored. That hazard is inherent to the format; the
//! declared-vs-read count check at the end is what surfaces it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{CorrectionVertex, GeometryBuffer, Topology};
use crate::viewport::Viewport;

/// Load a Scalable `.ol` warp mesh and map it into the viewport.
pub fn load_scalable_mesh<P: AsRef<Path>>(
    path: P,
    viewport: &Viewport,
) -> MeshResult<GeometryBuffer> {
    let path = path.as_ref();
    log::info!("reading Scalable mesh data from '{}'", path.display());

    let file = File::open(path).map_err(|e| MeshError::file_not_found(path, e))?;
    parse_scalable(BufReader::new(file), viewport)
}

fn parse_scalable<R: BufRead>(reader: R, viewport: &Viewport) -> MeshResult<GeometryBuffer> {
    let origin = viewport.position;
    let size = viewport.size;

    let mut declared_vertices: Option<usize> = None;
    let mut declared_faces: Option<usize> = None;
    let mut vertices: Vec<CorrectionVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut faces_read = 0usize;

    // left, right, bottom, top
    let mut ortho = [-1.0f32, 1.0, -1.0, 1.0];
    let mut resolution = [0u32; 2];

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some((x, y, intensity, s, t)) = parse_vertex_line(trimmed) {
            if declared_vertices.is_some() && resolution[0] != 0 && resolution[1] != 0 {
                let grey = intensity as f32 / 255.0;
                // s and t are swapped and flipped in this format
                vertices.push(CorrectionVertex {
                    position: [
                        (x / resolution[0] as f32) * size.x + origin.x,
                        (y / resolution[1] as f32) * size.y + origin.y,
                    ],
                    tex_coord: [
                        (1.0 - t) * size.x + origin.x,
                        (1.0 - s) * size.y + origin.y,
                    ],
                    color: [grey, grey, grey, 1.0],
                });
            }
        } else if let Some([a, b, c]) = parse_face_line(trimmed) {
            // faces land at the slot the running count points at, so faces
            // seen before the FACES keyword shift later ones and leave
            // zero-filled slots behind
            if let Some(declared) = declared_faces {
                if faces_read < declared {
                    let base = faces_read * 3;
                    if indices.len() < base + 3 {
                        indices.resize(base + 3, 0);
                    }
                    indices[base..base + 3].copy_from_slice(&[a, b, c]);
                }
            }
            faces_read += 1;
        } else if let Some(rest) = trimmed.strip_prefix("VERTICES") {
            if let Some(n) = parse_first_token::<usize>(rest) {
                declared_vertices = Some(n);
            }
        } else if let Some(rest) = trimmed.strip_prefix("FACES") {
            if let Some(n) = parse_first_token::<usize>(rest) {
                declared_faces = Some(n);
                // the index store grows as faces arrive; until then the
                // declared count is only a bound
                indices.clear();
            }
        } else if let Some(rest) = trimmed.strip_prefix("ORTHO_") {
            let mut it = rest.split_whitespace();
            let side = it.next().unwrap_or("");
            if let Some(v) = it.next().and_then(|t| t.parse::<f32>().ok()) {
                match side {
                    "LEFT" => ortho[0] = v,
                    "RIGHT" => ortho[1] = v,
                    "BOTTOM" => ortho[2] = v,
                    "TOP" => ortho[3] = v,
                    _ => {}
                }
            }
        } else if let Some(rest) = trimmed.strip_prefix("NATIVEXRES") {
            if let Some(n) = parse_first_token::<u32>(rest) {
                resolution[0] = n;
            }
        } else if let Some(rest) = trimmed.strip_prefix("NATIVEYRES") {
            if let Some(n) = parse_first_token::<u32>(rest) {
                resolution[1] = n;
            }
        }
    }

    let declared_vertices = declared_vertices.unwrap_or(0);
    let declared_faces = declared_faces.unwrap_or(0);
    if declared_vertices != vertices.len() {
        return Err(MeshError::count_mismatch(
            "Scalable vertices",
            declared_vertices,
            vertices.len(),
        ));
    }
    if declared_faces != faces_read {
        return Err(MeshError::count_mismatch(
            "Scalable faces",
            declared_faces,
            faces_read,
        ));
    }
    // faces counted before the keyword never wrote a slot; pad so the
    // buffer still spans every declared face
    indices.resize(declared_faces * 3, 0);

    // positions came in as ortho-window coordinates; normalize to clip space
    let [left, right, bottom, top] = ortho;
    for v in &mut vertices {
        let x = (v.position[0] - left) / (right - left);
        let y = (v.position[1] - bottom) / (top - bottom);
        v.position[0] = x * 2.0 - 1.0;
        v.position[1] = y * 2.0 - 1.0;
    }

    let buf = GeometryBuffer {
        vertices,
        indices,
        topology: Topology::TriangleList,
    };
    buf.validate()?;
    log::info!(
        "Scalable mesh read: {} vertices, {} faces",
        buf.vertex_count(),
        faces_read
    );
    Ok(buf)
}

fn parse_vertex_line(line: &str) -> Option<(f32, f32, u32, f32, f32)> {
    let mut it = line.split_whitespace();
    let x = it.next()?.parse().ok()?;
    let y = it.next()?.parse().ok()?;
    let intensity = it.next()?.parse().ok()?;
    let s = it.next()?.parse().ok()?;
    let t = it.next()?.parse().ok()?;
    Some((x, y, intensity, s, t))
}

fn parse_face_line(line: &str) -> Option<[u32; 3]> {
    let inner = line.strip_prefix('[')?;
    let inner = inner.strip_suffix(']').unwrap_or(inner);
    let mut it = inner.split_whitespace();
    let a = it.next()?.parse().ok()?;
    let b = it.next()?.parse().ok()?;
    let c = it.next()?.parse().ok()?;
    Some([a, b, c])
}

fn parse_first_token<T: std::str::FromStr>(rest: &str) -> Option<T> {
    rest.split_whitespace().next()?.parse().ok()
}
