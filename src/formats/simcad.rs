// src/formats/simcad.rs
// SimCAD XML warp files (.simcad)

//! Parser for SimCAD geometry correction files.
//!
//! Alignment tools drive a square matrix of correction offsets (33x33 in
//! practice); the file stores those offsets as two flat space-separated
//! float lists under `GeometryFile/GeometryDefinition/{X,Y}-FlatParameters`,
//! each scaled by a `range` attribute. An unwarped channel is all zeros.
//! The corrections are added to a uniform parametric grid; texcoords stay
//! uncorrected.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{CorrectionVertex, GeometryBuffer, Topology};
use crate::viewport::Viewport;

/// Load a SimCAD `.simcad` correction grid and map it into the viewport.
pub fn load_simcad_mesh<P: AsRef<Path>>(
    path: P,
    viewport: &Viewport,
) -> MeshResult<GeometryBuffer> {
    let path = path.as_ref();
    log::info!("reading SimCAD warp data from '{}'", path.display());

    let mut file = File::open(path).map_err(|e| MeshError::file_not_found(path, e))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    parse_simcad(&xml, viewport)
}

#[derive(Copy, Clone)]
enum Axis {
    X,
    Y,
}

fn parse_simcad(xml: &str, viewport: &Viewport) -> MeshResult<GeometryBuffer> {
    let mut reader = Reader::from_str(xml);

    let mut saw_root = false;
    let mut saw_definition = false;
    // set while inside a parameter list that carries a range attribute;
    // lists without one are skipped entirely
    let mut active: Option<(Axis, f32)> = None;
    let mut xcorr: Vec<f32> = Vec::new();
    let mut ycorr: Vec<f32> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"GeometryFile" => saw_root = true,
                b"GeometryDefinition" if saw_root => saw_definition = true,
                b"X-FlatParameters" if saw_definition => {
                    active = range_attribute(&e)?.map(|r| (Axis::X, r));
                }
                b"Y-FlatParameters" if saw_definition => {
                    active = range_attribute(&e)?.map(|r| (Axis::Y, r));
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some((axis, range)) = active {
                    let text = t
                        .unescape()
                        .map_err(|e| MeshError::corrupt_header(format!("bad XML text: {e}")))?;
                    let dest = match axis {
                        Axis::X => &mut xcorr,
                        Axis::Y => &mut ycorr,
                    };
                    for token in text.split_whitespace() {
                        let value: f32 = token.parse().map_err(|_| {
                            MeshError::corrupt_header(format!(
                                "bad SimCAD correction value '{token}'"
                            ))
                        })?;
                        dest.push(value / range);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if matches!(e.name().as_ref(), b"X-FlatParameters" | b"Y-FlatParameters") {
                    active = None;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(MeshError::corrupt_header(format!("XML parse error: {e}")));
            }
        }
    }

    if !saw_root {
        return Err(MeshError::corrupt_header("no GeometryFile root element"));
    }
    if !saw_definition {
        return Err(MeshError::corrupt_header("no GeometryDefinition element"));
    }
    if xcorr.len() != ycorr.len() {
        return Err(MeshError::count_mismatch(
            "SimCAD y corrections",
            xcorr.len(),
            ycorr.len(),
        ));
    }

    let side = (xcorr.len() as f64).sqrt() as u32;
    if (side * side) as usize != xcorr.len() {
        return Err(MeshError::invalid_geometry(format!(
            "SimCAD correction count {} is not a square grid",
            xcorr.len()
        )));
    }
    let (cols, rows) = (side, side);
    if cols < 2 || rows < 2 {
        return Err(MeshError::invalid_geometry(format!(
            "SimCAD grid is {cols}x{rows}; need at least 2x2"
        )));
    }

    let origin = viewport.position;
    let size = viewport.size;
    let mut vertices = Vec::with_capacity(xcorr.len());
    let mut i = 0usize;
    for r in 0..rows {
        for c in 0..cols {
            let u = c as f32 / (cols - 1) as f32;
            let v = 1.0 - r as f32 / (rows - 1) as f32;
            let x = u + xcorr[i];
            let y = v - ycorr[i];
            vertices.push(CorrectionVertex::white(
                [
                    2.0 * (x * size.x + origin.x) - 1.0,
                    2.0 * (y * size.y + origin.y) - 1.0,
                ],
                [u * size.x + origin.x, v * size.y + origin.y],
            ));
            i += 1;
        }
    }

    // one continuous strip over the whole grid: even rows walk left to
    // right, odd rows walk back, so no degenerate stitch triangles
    let mut indices = Vec::new();
    for r in 0..rows - 1 {
        if r % 2 == 0 {
            for c in 0..cols {
                indices.push(c + r * cols);
                indices.push(c + (r + 1) * cols);
            }
        } else {
            for c in (1..cols).rev() {
                indices.push(c + (r + 1) * cols);
                indices.push(c - 1 + r * cols);
            }
        }
    }

    let buf = GeometryBuffer {
        vertices,
        indices,
        topology: Topology::TriangleStrip,
    };
    log::debug!(
        "SimCAD mesh read: {} vertices, {} indices",
        buf.vertex_count(),
        buf.index_count()
    );
    Ok(buf)
}

fn range_attribute(e: &BytesStart<'_>) -> MeshResult<Option<f32>> {
    for attr in e.attributes() {
        let attr =
            attr.map_err(|e| MeshError::corrupt_header(format!("bad XML attribute: {e}")))?;
        if attr.key.as_ref() == b"range" {
            return Ok(std::str::from_utf8(attr.value.as_ref())
                .ok()
                .and_then(|s| s.parse().ok()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(x_values: &str, y_values: &str) -> String {
        format!(
            "<GeometryFile version=\"1.0\">\
               <GeometryDefinition>\
                 <X-FlatParameters range=\"1.0\">{x_values}</X-FlatParameters>\
                 <Y-FlatParameters range=\"1.0\">{y_values}</Y-FlatParameters>\
               </GeometryDefinition>\
             </GeometryFile>"
        )
    }

    #[test]
    fn zero_corrections_give_a_uniform_grid() {
        let xml = wrap("0 0 0 0", "0 0 0 0");
        let vp = Viewport::fullscreen();
        let buf = parse_simcad(&xml, &vp).unwrap();
        assert_eq!(buf.vertex_count(), 4);
        assert_eq!(buf.topology, Topology::TriangleStrip);
        // row 0 is the top of the image (v = 1)
        assert_eq!(buf.vertices[0].position, [-1.0, 1.0]);
        assert_eq!(buf.vertices[0].tex_coord, [0.0, 1.0]);
        assert_eq!(buf.vertices[3].position, [1.0, -1.0]);
        buf.validate().unwrap();
    }

    #[test]
    fn strip_walks_rows_alternately() {
        let xml = wrap(
            "0 0 0 0 0 0 0 0 0",
            "0 0 0 0 0 0 0 0 0",
        );
        let vp = Viewport::fullscreen();
        let buf = parse_simcad(&xml, &vp).unwrap();
        // 3x3 grid: even row walks forward, odd row walks back
        assert_eq!(buf.indices, vec![0, 3, 1, 4, 2, 5, 8, 4, 7, 3]);
        buf.validate().unwrap();
    }

    #[test]
    fn corrections_are_scaled_by_range() {
        let xml = wrap("0 0 0 0", "0 0 0 0")
            .replace("range=\"1.0\">0 0 0 0</X", "range=\"2.0\">1 0 0 0</X");
        let vp = Viewport::fullscreen();
        let buf = parse_simcad(&xml, &vp).unwrap();
        // x offset 1/2 shifts the first vertex from -1 to 0 in clip space
        assert_eq!(buf.vertices[0].position[0], 0.0);
        // texcoord stays uncorrected
        assert_eq!(buf.vertices[0].tex_coord[0], 0.0);
    }

    #[test]
    fn mismatched_list_lengths_fail() {
        let xml = wrap(
            "0 0 0 0 0 0 0 0 0",
            "0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
        );
        let vp = Viewport::fullscreen();
        let err = parse_simcad(&xml, &vp).unwrap_err();
        assert!(matches!(
            err,
            MeshError::CountMismatch { expected: 9, actual: 16, .. }
        ));
    }

    #[test]
    fn non_square_count_fails() {
        let xml = wrap("0 0 0", "0 0 0");
        let vp = Viewport::fullscreen();
        let err = parse_simcad(&xml, &vp).unwrap_err();
        assert!(matches!(err, MeshError::InvalidGeometry(_)));
    }

    #[test]
    fn list_without_range_attribute_is_skipped() {
        let xml = wrap("0 0 0 0", "0 0 0 0")
            .replace("<X-FlatParameters range=\"1.0\">", "<X-FlatParameters>");
        let vp = Viewport::fullscreen();
        let err = parse_simcad(&xml, &vp).unwrap_err();
        assert!(matches!(
            err,
            MeshError::CountMismatch { expected: 0, actual: 4, .. }
        ));
    }

    #[test]
    fn missing_root_is_a_corrupt_header() {
        let xml = "<SomethingElse><GeometryDefinition>\
                   </GeometryDefinition></SomethingElse>";
        let vp = Viewport::fullscreen();
        let err = parse_simcad(xml, &vp).unwrap_err();
        assert!(matches!(err, MeshError::CorruptHeader(_)));
    }
}
