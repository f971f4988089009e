// src/io/obj_write.rs
// Wavefront OBJ warp mesh exporter

//! Writes a loaded warp mesh back out as Wavefront OBJ so it can be
//! inspected in a standard model viewer.
//!
//! Vertices are written flat at z = 0 with a constant +z normal, six
//! decimals of precision, and a `v`/`vt`/`vn` reference triple per face
//! corner. Strip meshes are unrolled into one explicit triangle per
//! window position, so the output never needs strip support.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::MeshResult;
use crate::geometry::{GeometryBuffer, Topology};

/// Export `mesh` to `path` in Wavefront OBJ format.
pub fn export_obj_mesh<P: AsRef<Path>>(path: P, mesh: &GeometryBuffer) -> MeshResult<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "# warpmesh warping mesh")?;
    writeln!(w, "# Number of vertices: {}", mesh.vertex_count())?;

    for v in &mesh.vertices {
        writeln!(w, "v {:.6} {:.6} 0", v.position[0], v.position[1])?;
    }
    for v in &mesh.vertices {
        writeln!(w, "vt {:.6} {:.6} 0", v.tex_coord[0], v.tex_coord[1])?;
    }
    for _ in &mesh.vertices {
        writeln!(w, "vn 0 0 1")?;
    }

    writeln!(w, "# Number of faces: {}", mesh.triangle_count())?;
    match mesh.topology {
        Topology::TriangleList => {
            for tri in mesh.indices.chunks_exact(3) {
                write_face(&mut w, tri[0], tri[1], tri[2])?;
            }
        }
        Topology::TriangleStrip => {
            for i in 2..mesh.indices.len() {
                write_face(
                    &mut w,
                    mesh.indices[i],
                    mesh.indices[i - 1],
                    mesh.indices[i - 2],
                )?;
            }
        }
    }
    w.flush()?;

    log::info!("mesh '{}' exported successfully", path.display());
    Ok(())
}

fn write_face<W: Write>(w: &mut W, a: u32, b: u32, c: u32) -> MeshResult<()> {
    // OBJ references are 1-based
    let (a, b, c) = (a + 1, b + 1, c + 1);
    writeln!(w, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
    Ok(())
}
