// src/formats/sciss.rs
// SCISS / Uniview binary warp meshes (.sgc)

//! Parser for the SCISS binary calibration format.
//!
//! Little-endian layout: 3-byte magic `SGC`, version byte, u32 mapping
//! type, an 11-float view record (rotation quaternion, eye position, four
//! FOV half-angles), a 2xu32 grid size, the vertex records (six floats
//! each), a u32 index count and the index array. Every read is
//! strict-length; a truncated file fails instead of yielding partial
//! geometry.
//!
//! This is the format that carries a full projector frustum alongside the
//! mesh: a successful parse pushes eye position and FOV to the injected
//! frustum collaborator before returning the geometry.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use glam::{DQuat, EulerRot, Quat, Vec3};

use crate::error::{MeshError, MeshResult};
use crate::formats::{le_f32, le_u32, read_block};
use crate::geometry::{CorrectionVertex, GeometryBuffer, Topology};
use crate::viewport::{FovAngles, FrustumUpdater, Viewport};

/// Load a SCISS `.sgc` mesh, pushing its embedded view calibration to
/// `frustum`. `legacy_strip` is the topology used for version-1 files,
/// which were authored for quad strips.
pub fn load_sciss_mesh<P: AsRef<Path>>(
    path: P,
    viewport: &Viewport,
    frustum: &mut dyn FrustumUpdater,
    legacy_strip: Topology,
) -> MeshResult<GeometryBuffer> {
    let path = path.as_ref();
    log::info!("reading SCISS mesh data from '{}'", path.display());

    let file = File::open(path).map_err(|e| MeshError::file_not_found(path, e))?;
    parse_sciss(BufReader::new(file), viewport, frustum, legacy_strip)
}

fn parse_sciss<R: Read>(
    mut reader: R,
    viewport: &Viewport,
    frustum: &mut dyn FrustumUpdater,
    legacy_strip: Topology,
) -> MeshResult<GeometryBuffer> {
    let mut magic = [0u8; 3];
    read_block(&mut reader, &mut magic, "SCISS header")?;
    if &magic != b"SGC" {
        return Err(MeshError::corrupt_header(format!(
            "SCISS file id is {:?}, expected 'SGC'",
            magic
        )));
    }

    let mut version = [0u8; 1];
    read_block(&mut reader, &mut version, "SCISS version")?;
    let version = version[0];
    log::debug!("SCISS file version {}", version);

    let mut word = [0u8; 4];
    read_block(&mut reader, &mut word, "SCISS mapping type")?;
    let mapping = le_u32(&word);
    log::debug!(
        "SCISS mapping type = {} ({})",
        if mapping == 0 { "planar" } else { "cube" },
        mapping
    );

    // qx qy qz qw | eye x y z | fov up down left right
    let mut view = [0u8; 44];
    read_block(&mut reader, &mut view, "SCISS view data")?;
    let v = |i: usize| le_f32(&view[4 * i..]);
    let (qx, qy, qz, qw) = (v(0), v(1), v(2), v(3));
    let eye = Vec3::new(v(4), v(5), v(6));
    let fov = FovAngles {
        up: v(7),
        down: v(8),
        left: v(9),
        right: v(10),
    };

    // Diagnostic angles only. The x and y components are transposed going
    // into the euler extraction; that is the convention the calibration
    // tooling prints.
    let dq = DQuat::from_xyzw(qy as f64, qx as f64, qz as f64, qw as f64);
    let (rz, ry, rx) = dq.to_euler(EulerRot::ZYX);
    log::debug!(
        "SCISS rotation quat = [{} {} {} {}], yaw = {}, pitch = {}, roll = {}",
        qx,
        qy,
        qz,
        qw,
        -rx.to_degrees(),
        ry.to_degrees(),
        -rz.to_degrees()
    );
    log::debug!("SCISS position = [{} {} {}]", eye.x, eye.y, eye.z);
    log::debug!(
        "SCISS fov: up = {}, down = {}, left = {}, right = {}",
        fov.up,
        fov.down,
        fov.left,
        fov.right
    );

    let mut grid = [0u8; 8];
    read_block(&mut reader, &mut grid, "SCISS grid size")?;
    let grid = [le_u32(&grid[0..4]), le_u32(&grid[4..8])];

    // The vertex-count layout checks a numeric version, the topology below
    // checks ASCII '2'; a file writing the numeric byte always lands in
    // the legacy topology arm.
    let vertex_count = if version == 2 {
        log::debug!("SCISS vertex count = {}", grid[1]);
        grid[1] as usize
    } else {
        let n = grid[0].wrapping_mul(grid[1]);
        log::debug!("SCISS vertex count = {} ({}x{})", n, grid[0], grid[1]);
        n as usize
    };

    // x y z tx ty tz, of which z and tz are carried but unused
    let mut raw = Vec::new();
    let mut record = [0u8; 24];
    for _ in 0..vertex_count {
        read_block(&mut reader, &mut record, "SCISS vertex data")?;
        raw.push([
            le_f32(&record[0..]),
            le_f32(&record[4..]),
            le_f32(&record[12..]),
            le_f32(&record[16..]),
        ]);
    }

    read_block(&mut reader, &mut word, "SCISS index count")?;
    let index_count = le_u32(&word) as usize;
    log::debug!("SCISS index count = {}", index_count);

    let mut indices = Vec::new();
    for _ in 0..index_count {
        read_block(&mut reader, &mut word, "SCISS index data")?;
        indices.push(le_u32(&word));
    }

    // file fully consumed; hand the embedded calibration to the frustum
    frustum.set_eye_position(eye);
    frustum.set_view_plane_fov(fov, Quat::from_xyzw(qx, qy, qz, qw));

    let origin = viewport.position;
    let size = viewport.size;
    let vertices = raw
        .into_iter()
        .map(|[x, y, tx, ty]| {
            let x = x.clamp(0.0, 1.0);
            let y = y.clamp(0.0, 1.0);
            let tx = tx.clamp(0.0, 1.0);
            let ty = ty.clamp(0.0, 1.0);
            CorrectionVertex::white(
                [
                    2.0 * (x * size.x + origin.x) - 1.0,
                    2.0 * ((1.0 - y) * size.y + origin.y) - 1.0,
                ],
                [tx * size.x + origin.x, ty * size.y + origin.y],
            )
        })
        .collect();

    let topology = if version == b'2' && grid[0] == 4 {
        Topology::TriangleList
    } else if version == b'2' && grid[0] == 5 {
        Topology::TriangleStrip
    } else {
        // v1 files were quad strips; quad primitives no longer exist
        legacy_strip
    };

    let buf = GeometryBuffer {
        vertices,
        indices,
        topology,
    };
    buf.validate()?;
    log::debug!(
        "SCISS mesh read: {} vertices, {} indices",
        buf.vertex_count(),
        buf.index_count()
    );
    Ok(buf)
}
