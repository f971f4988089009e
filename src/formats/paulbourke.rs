// src/formats/paulbourke.rs
// Paul Bourke spherical mirror warp files (.data)

//! Parser for Paul Bourke's spherical mirror mesh format.
//!
//! Line one is a mapping-type id (validated for presence, otherwise
//! unused), line two the grid dimensions, then `x y s t intensity` rows.
//! Positions arrive in [-1,1] assuming square pixels, so they are divided
//! by the effective aspect ratio before the viewport remap; intensity is a
//! grayscale blend weight copied into all three color channels.
//!
//! The format expects the dependent projection to stop compensating for
//! aspect ratio once the mesh handles it, so a successful parse calls
//! `ignore_aspect_ratio` on the frustum collaborator.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{grid_triangle_indices, CorrectionVertex, GeometryBuffer, Topology};
use crate::viewport::{FrustumUpdater, Viewport};

/// Load a Paul Bourke `.data` mesh. `window_aspect` is the aspect ratio of
/// the window the viewport lives in.
pub fn load_paulbourke_mesh<P: AsRef<Path>>(
    path: P,
    viewport: &Viewport,
    frustum: &mut dyn FrustumUpdater,
    window_aspect: f32,
) -> MeshResult<GeometryBuffer> {
    let path = path.as_ref();
    log::info!(
        "reading Paul Bourke spherical mirror mesh data from '{}'",
        path.display()
    );

    let file = File::open(path).map_err(|e| MeshError::file_not_found(path, e))?;
    parse_paulbourke(BufReader::new(file), viewport, frustum, window_aspect)
}

fn parse_paulbourke<R: BufRead>(
    reader: R,
    viewport: &Viewport,
    frustum: &mut dyn FrustumUpdater,
    window_aspect: f32,
) -> MeshResult<GeometryBuffer> {
    let mut lines = reader.lines();

    let mapping_type: Option<i32> = lines
        .next()
        .transpose()?
        .and_then(|l| first_token(&l));
    let dims: Option<(u32, u32)> = lines.next().transpose()?.and_then(|l| {
        let mut it = l.split_whitespace();
        let cols = it.next()?.parse().ok()?;
        let rows = it.next()?.parse().ok()?;
        Some((cols, rows))
    });

    let (Some(mapping_type), Some((cols, rows))) = (mapping_type, dims) else {
        return Err(MeshError::corrupt_header(
            "PaulBourke header incomplete: mapping type and grid dimensions are required",
        ));
    };
    if cols < 2 || rows < 2 {
        return Err(MeshError::invalid_geometry(format!(
            "PaulBourke grid is {cols}x{rows}; need at least 2x2"
        )));
    }
    log::debug!("PaulBourke mapping type {}, grid {}x{}", mapping_type, cols, rows);

    // storage grows with the rows actually read; the declared grid is
    // checked against it once the file ends
    let cells = cols as u64 * rows as u64;
    let mut raw: Vec<[f32; 5]> = Vec::new();
    for line in lines {
        let line = line?;
        let Some(values) = parse_data_line(&line) else {
            continue;
        };
        // rows past the declared grid are dropped
        if (raw.len() as u64) < cells {
            raw.push(values);
        }
    }
    if (raw.len() as u64) != cells {
        return Err(MeshError::count_mismatch(
            "PaulBourke grid cells",
            cells as usize,
            raw.len(),
        ));
    }

    let indices = grid_triangle_indices(cols, rows);

    // source positions assume square pixels; fold the real aspect in
    // before placing the mesh in the viewport
    let aspect = window_aspect * (viewport.size.x / viewport.size.y);
    let origin = viewport.position;
    let size = viewport.size;
    let vertices = raw
        .into_iter()
        .map(|[x, y, s, t, intensity]| {
            let x = (x / aspect + 1.0) / 2.0;
            let y = (y + 1.0) / 2.0;
            CorrectionVertex {
                position: [
                    (x * size.x + origin.x) * 2.0 - 1.0,
                    (y * size.y + origin.y) * 2.0 - 1.0,
                ],
                tex_coord: [s * size.x + origin.x, t * size.y + origin.y],
                color: [intensity, intensity, intensity, 1.0],
            }
        })
        .collect();

    // the mesh now owns aspect handling; the projection must stop
    frustum.ignore_aspect_ratio();

    let buf = GeometryBuffer {
        vertices,
        indices,
        topology: Topology::TriangleList,
    };
    log::debug!(
        "PaulBourke mesh read: {} vertices, {} indices",
        buf.vertex_count(),
        buf.index_count()
    );
    Ok(buf)
}

fn first_token(line: &str) -> Option<i32> {
    line.split_whitespace().next()?.parse().ok()
}

fn parse_data_line(line: &str) -> Option<[f32; 5]> {
    let mut it = line.split_whitespace();
    let x = it.next()?.parse().ok()?;
    let y = it.next()?.parse().ok()?;
    let s = it.next()?.parse().ok()?;
    let t = it.next()?.parse().ok()?;
    let intensity = it.next()?.parse().ok()?;
    Some([x, y, s, t, intensity])
}
