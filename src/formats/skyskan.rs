// src/formats/skyskan.rs
// SkySkan DigitalSky dome meshes (.txt / .skyskan)

//! Parser for SkySkan dome calibration files.
//!
//! A header of `Key=value` scalars (dome azimuth/elevation, FOVs, optional
//! tweak multipliers) is followed by a `cols rows` dimensions line and then
//! raw `x y u v` rows. Cells the projector cannot reach are marked with the
//! position sentinel (-1,-1); triangles touching a sentinel vertex are
//! dropped rather than drawn.
//!
//! Azimuth and elevation define the dome viewpoint, so a successful parse
//! pushes a rotation and FOV pair to the frustum collaborator.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use glam::{Quat, Vec3};

use crate::error::{MeshError, MeshResult};
use crate::geometry::{
    grid_triangle_indices_where, CorrectionVertex, GeometryBuffer, Topology,
};
use crate::viewport::{FovAngles, FrustumUpdater, Viewport};

/// Aspect assumed when a file only specifies the horizontal FOV.
const DERIVED_VFOV_ASPECT: f32 = 1200.0 / 2048.0;

/// Load a SkySkan mesh, pushing the dome orientation and FOV to `frustum`.
pub fn load_skyskan_mesh<P: AsRef<Path>>(
    path: P,
    viewport: &Viewport,
    frustum: &mut dyn FrustumUpdater,
) -> MeshResult<GeometryBuffer> {
    let path = path.as_ref();
    log::info!("reading SkySkan mesh data from '{}'", path.display());

    let file = File::open(path).map_err(|e| MeshError::file_not_found(path, e))?;
    parse_skyskan(BufReader::new(file), viewport, frustum)
}

fn parse_skyskan<R: BufRead>(
    reader: R,
    viewport: &Viewport,
    frustum: &mut dyn FrustumUpdater,
) -> MeshResult<GeometryBuffer> {
    let mut azimuth: Option<f32> = None;
    let mut elevation: Option<f32> = None;
    let mut h_fov: Option<f32> = None;
    let mut v_fov: Option<f32> = None;
    let mut fov_tweak = [1.0f32, 1.0];
    let mut uv_tweak = [1.0f32, 1.0];

    let mut dims: Option<(u32, u32)> = None;
    // raw x y s t rows; storage grows with the rows actually read, and
    // the declared cell count is checked against it after the loop
    let mut raw: Vec<[f32; 4]> = Vec::new();
    let mut cells = 0u64;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if let Some(v) = keyword_value(trimmed, "Dome Azimuth=") {
            azimuth = Some(v);
        } else if let Some(v) = keyword_value(trimmed, "Dome Elevation=") {
            elevation = Some(v);
        } else if let Some(v) = keyword_value(trimmed, "Horizontal FOV=") {
            h_fov = Some(v);
        } else if let Some(v) = keyword_value(trimmed, "Vertical FOV=") {
            v_fov = Some(v);
        } else if let Some(v) = keyword_value(trimmed, "Horizontal Tweak=") {
            fov_tweak[0] = v;
        } else if let Some(v) = keyword_value(trimmed, "Vertical Tweak=") {
            fov_tweak[1] = v;
        } else if let Some(v) = keyword_value(trimmed, "U Tweak=") {
            uv_tweak[0] = v;
        } else if let Some(v) = keyword_value(trimmed, "V Tweak=") {
            uv_tweak[1] = v;
        } else if dims.is_none() {
            if let Some((cols, rows)) = parse_dims_line(trimmed) {
                cells = cols as u64 * rows as u64;
                dims = Some((cols, rows));
            }
        } else if let Some([x, y, mut u, mut v]) = parse_data_line(trimmed) {
            if uv_tweak[0] > -1.0 {
                u *= uv_tweak[0];
            }
            if uv_tweak[1] > -1.0 {
                v *= uv_tweak[1];
            }
            // rows past the declared grid are dropped
            if (raw.len() as u64) < cells {
                raw.push([x, y, u, 1.0 - v]);
            }
        }
    }

    let (Some((cols, rows)), Some(azimuth), Some(elevation), Some(mut h_fov)) =
        (dims, azimuth, elevation, h_fov)
    else {
        return Err(MeshError::corrupt_header(
            "SkySkan header incomplete: dimensions, azimuth, elevation and horizontal FOV are required",
        ));
    };
    if h_fov <= 0.0 {
        return Err(MeshError::corrupt_header(format!(
            "SkySkan horizontal FOV {h_fov} is not positive"
        )));
    }
    if cols < 2 || rows < 2 {
        return Err(MeshError::invalid_geometry(format!(
            "SkySkan grid is {cols}x{rows}; need at least 2x2"
        )));
    }
    if (raw.len() as u64) != cells {
        return Err(MeshError::count_mismatch(
            "SkySkan grid cells",
            cells as usize,
            raw.len(),
        ));
    }

    let mut v_fov = match v_fov {
        Some(v) if v > 0.0 => v,
        _ => {
            // dome radius cancels out: half-width from the horizontal FOV,
            // half-height from the assumed panel aspect
            let half_width = (h_fov.to_radians() / 2.0).tan();
            let half_height = DERIVED_VFOV_ASPECT * half_width;
            let derived = 2.0 * half_height.atan().to_degrees();
            log::debug!(
                "SkySkan fov: horizontal = {}, vertical = {} (derived)",
                h_fov,
                derived
            );
            derived
        }
    };
    if fov_tweak[0] > 0.0 {
        h_fov *= fov_tweak[0];
    }
    if fov_tweak[1] > 0.0 {
        v_fov *= fov_tweak[1];
    }

    let rotation = Quat::from_axis_angle(Vec3::Y, (-azimuth).to_radians())
        * Quat::from_axis_angle(Vec3::X, elevation.to_radians());
    frustum.set_eye_position(Vec3::ZERO);
    frustum.set_view_plane_fov(
        FovAngles {
            up: v_fov / 2.0,
            down: -v_fov / 2.0,
            left: -h_fov / 2.0,
            right: h_fov / 2.0,
        },
        rotation,
    );

    // sentinel filtering runs on the raw file coordinates, before remap
    let indices = grid_triangle_indices_where(cols, rows, |i| {
        let v = raw[i as usize];
        v[0] != -1.0 && v[1] != -1.0
    });

    let origin = viewport.position;
    let size = viewport.size;
    let vertices = raw
        .into_iter()
        .map(|[x, y, s, t]| {
            CorrectionVertex::white(
                [
                    2.0 * (x * size.x + origin.x) - 1.0,
                    2.0 * ((1.0 - y) * size.y + origin.y) - 1.0,
                ],
                [s * size.x + origin.x, t * size.y + origin.y],
            )
        })
        .collect();

    let buf = GeometryBuffer {
        vertices,
        indices,
        topology: Topology::TriangleList,
    };
    log::debug!(
        "SkySkan mesh read: {} vertices, {} indices",
        buf.vertex_count(),
        buf.index_count()
    );
    Ok(buf)
}

fn keyword_value(line: &str, key: &str) -> Option<f32> {
    line.strip_prefix(key)?.trim().parse().ok()
}

fn parse_dims_line(line: &str) -> Option<(u32, u32)> {
    let mut it = line.split_whitespace();
    let cols = it.next()?.parse().ok()?;
    let rows = it.next()?.parse().ok()?;
    Some((cols, rows))
}

fn parse_data_line(line: &str) -> Option<[f32; 4]> {
    let mut it = line.split_whitespace();
    let x = it.next()?.parse().ok()?;
    let y = it.next()?.parse().ok()?;
    let u = it.next()?.parse().ok()?;
    let v = it.next()?.parse().ok()?;
    Some([x, y, u, v])
}
