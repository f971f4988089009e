// src/formats/domeprojection.rs
// DomeProjection camera-based calibration grids (.csv)

//! Parser for semicolon-delimited warp grids produced by the
//! DomeProjection calibration camera.
//!
//! Each data line carries `x;y;u;v;column;row`. Grid dimensions are not
//! declared up front; they are the largest column/row index seen plus one.
//! Lines that do not match the six-field shape (headers, comments, blanks)
//! are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{grid_triangle_indices, CorrectionVertex, GeometryBuffer, Topology};
use crate::viewport::Viewport;

/// Load a DomeProjection correction grid and map it into the viewport.
pub fn load_domeprojection_mesh<P: AsRef<Path>>(
    path: P,
    viewport: &Viewport,
) -> MeshResult<GeometryBuffer> {
    let path = path.as_ref();
    log::info!("reading DomeProjection mesh data from '{}'", path.display());

    let file = File::open(path).map_err(|e| MeshError::file_not_found(path, e))?;
    parse_domeprojection(BufReader::new(file), viewport)
}

fn parse_domeprojection<R: BufRead>(reader: R, viewport: &Viewport) -> MeshResult<GeometryBuffer> {
    let origin = viewport.position;
    let size = viewport.size;

    let mut vertices: Vec<CorrectionVertex> = Vec::new();
    let mut max_col = 0u32;
    let mut max_row = 0u32;

    for line in reader.lines() {
        let line = line?;
        let Some((x, y, u, v, col, row)) = parse_data_line(&line) else {
            continue;
        };
        max_col = max_col.max(col);
        max_row = max_row.max(row);

        let x = x.clamp(0.0, 1.0);
        let y = y.clamp(0.0, 1.0);

        // The grid runs top-down while clip space runs bottom-up, so the
        // y axis flips for both position and sample coordinate.
        vertices.push(CorrectionVertex::white(
            [
                2.0 * (x * size.x + origin.x) - 1.0,
                2.0 * ((1.0 - y) * size.y + origin.y) - 1.0,
            ],
            [u * size.x + origin.x, (1.0 - v) * size.y + origin.y],
        ));
    }

    // widen before the +1 and the product so corner indices near u32::MAX
    // cannot wrap past the count check
    let cols = max_col as u64 + 1;
    let rows = max_row as u64 + 1;
    if cols < 2 || rows < 2 {
        return Err(MeshError::invalid_geometry(format!(
            "DomeProjection grid is {cols}x{rows}; need at least 2x2"
        )));
    }
    let expected = cols.saturating_mul(rows);
    if vertices.len() as u64 != expected {
        return Err(MeshError::count_mismatch(
            "DomeProjection vertices",
            expected as usize,
            vertices.len(),
        ));
    }

    let buf = GeometryBuffer {
        indices: grid_triangle_indices(cols as u32, rows as u32),
        vertices,
        topology: Topology::TriangleList,
    };
    log::debug!(
        "DomeProjection mesh read: {} vertices, {} indices",
        buf.vertex_count(),
        buf.index_count()
    );
    Ok(buf)
}

fn parse_data_line(line: &str) -> Option<(f32, f32, f32, f32, u32, u32)> {
    let mut it = line.trim().split(';');
    let x = it.next()?.trim().parse().ok()?;
    let y = it.next()?.trim().parse().ok()?;
    let u = it.next()?.trim().parse().ok()?;
    let v = it.next()?.trim().parse().ok()?;
    let col = it.next()?.trim().parse().ok()?;
    let row = it.next()?.trim().parse().ok()?;
    Some((x, y, u, v, col, row))
}
