// src/geometry/mod.rs
// Shared CPU-side mesh containers for the warp pipeline
// Every parser fills a GeometryBuffer; the generator owns it until GPU upload

//! Vertex and buffer types shared by all correction-mesh producers.

use bytemuck::{Pod, Zeroable};

use crate::error::{MeshError, MeshResult};

/// One warp-mesh vertex, 32 bytes, laid out for direct GPU upload.
///
/// `position` is where the vertex is drawn (NDC after viewport placement);
/// `tex_coord` is where it samples the rendered frame. Keeping the two
/// independent is the whole point of warping.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CorrectionVertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
    pub color: [f32; 4],
}

impl CorrectionVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    /// Vertex buffer layout matching the warp shader inputs
    /// (location 0 = position, 1 = tex_coord, 2 = color).
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<CorrectionVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &Self::ATTRIBUTES,
    };

    /// Opaque-white vertex at the given draw position and sample coordinate.
    pub fn white(position: [f32; 2], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            tex_coord,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Primitive topology of a geometry buffer.
///
/// Calibration formats that used to target quad strips are expressed as
/// triangle strips; quad primitives are gone from modern raster pipelines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    TriangleList,
    TriangleStrip,
}

/// Ordered vertices + indices + topology, produced fresh per parse attempt.
///
/// Insertion order is topology-significant. The buffer lives exactly as long
/// as one generation call; after GPU upload the CPU copy is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryBuffer {
    pub vertices: Vec<CorrectionVertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl GeometryBuffer {
    pub fn new(topology: Topology) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            topology,
        }
    }

    pub fn with_capacity(topology: Topology, vertex_capacity: usize, index_capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(index_capacity),
            topology,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Triangles this buffer rasterizes to.
    pub fn triangle_count(&self) -> usize {
        match self.topology {
            Topology::TriangleList => self.indices.len() / 3,
            Topology::TriangleStrip => self.indices.len().saturating_sub(2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Check the structural invariants: every index in range, triangle lists
    /// a multiple of three, non-empty strips at least one triangle long.
    /// An empty index list passes; some calibration files carry geometry
    /// that draws nothing.
    pub fn validate(&self) -> MeshResult<()> {
        let n = self.vertices.len() as u32;
        if let Some(&bad) = self.indices.iter().find(|&&i| i >= n) {
            return Err(MeshError::invalid_geometry(format!(
                "index {} out of range for {} vertices",
                bad, n
            )));
        }
        match self.topology {
            Topology::TriangleList if self.indices.len() % 3 != 0 => {
                Err(MeshError::invalid_geometry(format!(
                    "triangle list index count {} is not a multiple of 3",
                    self.indices.len()
                )))
            }
            Topology::TriangleStrip if !self.indices.is_empty() && self.indices.len() < 3 => {
                Err(MeshError::invalid_geometry(format!(
                    "triangle strip needs at least 3 indices, got {}",
                    self.indices.len()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Two triangles per cell over a (cols-1)x(rows-1) grid of row-major
/// vertices, column-outer sweep.
///
/// Cell corners and split:
/// ```text
/// 3      2
///  x____x
///  |   /|
///  |  / |
///  | /  |
///  |/   |
///  x----x
/// 0      1
/// ```
pub fn grid_triangle_indices(cols: u32, rows: u32) -> Vec<u32> {
    grid_triangle_indices_where(cols, rows, |_| true)
}

/// Like [`grid_triangle_indices`], but a triangle is emitted only when all
/// three of its vertices satisfy `keep`. Formats with "no data" sentinel
/// cells use this to drop dead triangles without renumbering the grid.
pub fn grid_triangle_indices_where(
    cols: u32,
    rows: u32,
    keep: impl Fn(u32) -> bool,
) -> Vec<u32> {
    let mut indices = Vec::new();
    if cols < 2 || rows < 2 {
        return indices;
    }
    for c in 0..cols - 1 {
        for r in 0..rows - 1 {
            let i0 = r * cols + c;
            let i1 = r * cols + c + 1;
            let i2 = (r + 1) * cols + c + 1;
            let i3 = (r + 1) * cols + c;

            if keep(i0) && keep(i1) && keep(i2) {
                indices.extend_from_slice(&[i0, i1, i2]);
            }
            if keep(i0) && keep(i2) && keep(i3) {
                indices.extend_from_slice(&[i0, i2, i3]);
            }
        }
    }
    indices
}
