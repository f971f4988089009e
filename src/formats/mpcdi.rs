// src/formats/mpcdi.rs
// MPCDI warp grids in PFM encoding (.mpcdi / .pfm)

//! Parser for MPCDI correction grids stored as PFM images.
//!
//! MPCDI reuses the PFM 3-channel layout: red carries the X correction,
//! green the Y correction, blue an error estimate (NaN when absent). The
//! ASCII preamble is three newline-terminated lines (`PF`, `cols rows`,
//! endianness indicator); the body is packed little-endian floats in
//! raster order. Rows map straight onto the y axis without inversion, so
//! a file that looks right in an image viewer comes out right.
//!
//! The mesh can arrive as a standalone file or as a slice of a larger
//! configuration archive already in memory; both go through the same
//! strict reader, so a truncated body fails identically either way.
//! Unlike the text formats, positions and texcoords are emitted as-is,
//! with no viewport remap.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{MeshError, MeshResult};
use crate::formats::{le_f32, read_block};
use crate::geometry::{grid_triangle_indices, CorrectionVertex, GeometryBuffer, Topology};

const MAX_HEADER_LEN: usize = 100;

/// Load an MPCDI mesh from a PFM file on disk.
pub fn load_mpcdi_mesh<P: AsRef<Path>>(path: P) -> MeshResult<GeometryBuffer> {
    let path = path.as_ref();
    log::info!("reading MPCDI mesh (PFM format) data from '{}'", path.display());

    let file = File::open(path).map_err(|e| MeshError::file_not_found(path, e))?;
    parse_pfm(BufReader::new(file))
}

/// Load an MPCDI mesh from an in-memory PFM image, the path taken when the
/// mesh came embedded in an archived configuration.
pub fn load_mpcdi_mesh_from_buffer(buffer: &[u8]) -> MeshResult<GeometryBuffer> {
    log::info!("reading MPCDI mesh (PFM format) from buffer");
    parse_pfm(buffer)
}

fn parse_pfm<R: Read>(mut reader: R) -> MeshResult<GeometryBuffer> {
    // preamble runs to the third newline
    let mut header = Vec::new();
    let mut byte = [0u8; 1];
    let mut newlines = 0;
    while newlines < 3 {
        read_block(&mut reader, &mut byte, "MPCDI header")?;
        header.push(byte[0]);
        if byte[0] == b'\n' {
            newlines += 1;
        }
        if header.len() > MAX_HEADER_LEN {
            return Err(MeshError::corrupt_header(
                "MPCDI header exceeds 100 bytes without three lines",
            ));
        }
    }

    let magic = [header[0], header[1]];
    let rest = String::from_utf8_lossy(&header[2..]);
    let mut it = rest.split_whitespace();
    let (Some(cols), Some(rows), Some(endianness)) = (
        it.next().and_then(|t| t.parse::<u32>().ok()),
        it.next().and_then(|t| t.parse::<u32>().ok()),
        it.next().and_then(|t| t.parse::<f32>().ok()),
    ) else {
        return Err(MeshError::corrupt_header("invalid MPCDI header syntax"));
    };

    // grayscale 'Pf' files are unsupported; only the tag is policed, the
    // parse continues regardless
    if &magic != b"PF" {
        log::error!(
            "MPCDI mesh type is '{}{}', expected 'PF'",
            magic[0] as char,
            magic[1] as char
        );
    }
    log::debug!(
        "MPCDI mesh {}x{}, endianness indicator {}",
        cols,
        rows,
        endianness
    );

    if cols < 2 || rows < 2 {
        return Err(MeshError::invalid_geometry(format!(
            "MPCDI grid is {cols}x{rows}; need at least 2x2"
        )));
    }

    // storage grows with the records actually read; the declared grid
    // never sizes an allocation up front
    let cells = cols as u64 * rows as u64;
    let mut vertices = Vec::new();
    let mut record = [0u8; 12];
    for i in 0..cells {
        read_block(&mut reader, &mut record, "MPCDI correction values")?;
        let corr_x = le_f32(&record[0..]);
        let corr_y = le_f32(&record[4..]);
        // record[8..] is the per-point error estimate; nothing uses it

        let c = (i % cols as u64) as f32;
        let r = (i / cols as u64) as f32;
        let smooth_x = c / (cols - 1) as f32;
        let smooth_y = r / (rows - 1) as f32;

        // corrections are used as absolute sample positions, not offsets
        // added to the smooth grid; existing files depend on this
        vertices.push(CorrectionVertex::white(
            [2.0 * smooth_x - 1.0, 2.0 * smooth_y - 1.0],
            [corr_x, corr_y],
        ));
    }

    let buf = GeometryBuffer {
        vertices,
        indices: grid_triangle_indices(cols, rows),
        topology: Topology::TriangleList,
    };
    log::debug!(
        "MPCDI mesh read: {} vertices, {} indices",
        buf.vertex_count(),
        buf.index_count()
    );
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pfm_2x2(corrections: &[[f32; 2]; 4]) -> Vec<u8> {
        let mut out = Vec::from(&b"PF\n2 2\n-1.0\n"[..]);
        for [x, y] in corrections {
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
            out.extend_from_slice(&f32::NAN.to_le_bytes());
        }
        out
    }

    const IDENTITY: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

    #[test]
    fn positions_come_from_the_uniform_grid() {
        let buf = load_mpcdi_mesh_from_buffer(&pfm_2x2(&IDENTITY)).unwrap();
        assert_eq!(buf.vertex_count(), 4);
        assert_eq!(buf.index_count(), 6);
        assert_eq!(buf.topology, Topology::TriangleList);
        assert_eq!(buf.vertices[0].position, [-1.0, -1.0]);
        assert_eq!(buf.vertices[3].position, [1.0, 1.0]);
        buf.validate().unwrap();
    }

    #[test]
    fn corrections_become_sample_positions_verbatim() {
        let warped = [[0.1, 0.2], [0.9, 0.1], [0.2, 0.8], [1.1, 0.9]];
        let buf = load_mpcdi_mesh_from_buffer(&pfm_2x2(&warped)).unwrap();
        for (vertex, correction) in buf.vertices.iter().zip(warped) {
            assert_eq!(vertex.tex_coord, correction);
        }
    }

    #[test]
    fn truncated_body_is_a_short_read_with_exact_counts() {
        let mut data = pfm_2x2(&IDENTITY);
        data.truncate(data.len() - 4);
        let err = load_mpcdi_mesh_from_buffer(&data).unwrap_err();
        assert!(matches!(
            err,
            MeshError::ShortRead { expected: 12, actual: 8, .. }
        ));
    }

    #[test]
    fn truncated_header_is_a_short_read() {
        let err = load_mpcdi_mesh_from_buffer(b"PF\n2 2").unwrap_err();
        assert!(matches!(err, MeshError::ShortRead { .. }));
    }

    #[test]
    fn oversized_grid_declaration_is_a_short_read() {
        let err =
            load_mpcdi_mesh_from_buffer(b"PF\n4000000000 4000000000\n-1.0\n").unwrap_err();
        assert!(matches!(
            err,
            MeshError::ShortRead { expected: 12, actual: 0, .. }
        ));
    }

    #[test]
    fn wrong_type_tag_still_parses() {
        let mut data = pfm_2x2(&IDENTITY);
        data[1] = b'f';
        let buf = load_mpcdi_mesh_from_buffer(&data).unwrap();
        assert_eq!(buf.vertex_count(), 4);
    }

    #[test]
    fn garbled_dimensions_are_a_corrupt_header() {
        let err = load_mpcdi_mesh_from_buffer(b"PF\ntwo 2\n-1.0\n").unwrap_err();
        assert!(matches!(err, MeshError::CorruptHeader(_)));
    }

    #[test]
    fn single_column_grid_is_rejected() {
        let mut data = Vec::from(&b"PF\n1 4\n-1.0\n"[..]);
        for _ in 0..12 {
            data.extend_from_slice(&0.0f32.to_le_bytes());
        }
        let err = load_mpcdi_mesh_from_buffer(&data).unwrap_err();
        assert!(matches!(err, MeshError::InvalidGeometry(_)));
    }
}
