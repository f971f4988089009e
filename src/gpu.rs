// src/gpu.rs
// GPU residency for correction meshes

//! Uploads [`GeometryBuffer`] contents into vertex and index buffers and
//! records indexed draws for them.
//!
//! Buffers are written once at upload and never touched again;
//! correction meshes are static for the lifetime of a viewport.

use wgpu::util::DeviceExt;
use wgpu::{Buffer, BufferUsages, Device, IndexFormat, RenderPass};

use crate::generator::{CorrectionMesh, MeshVariant};
use crate::geometry::{GeometryBuffer, Topology};

/// Map a mesh topology onto the pipeline primitive topology.
///
/// Strip pipelines additionally need `strip_index_format` set to
/// [`IndexFormat::Uint32`] in their primitive state.
pub fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// One mesh resident on the GPU.
#[derive(Debug)]
pub struct GpuMesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    topology: Topology,
}

impl GpuMesh {
    /// Upload `mesh` into device-local buffers.
    pub fn upload(device: &Device, mesh: &GeometryBuffer, label: &str) -> GpuMesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
        });
        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
            topology: mesh.topology,
        }
    }

    /// Topology the bound pipeline must be built with.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Record the buffer binds and the indexed draw. An empty index range
    /// draws nothing.
    pub fn draw<'a>(&'a self, pass: &mut RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// The full mesh set of one viewport, resident on the GPU.
#[derive(Debug)]
pub struct GpuCorrectionMesh {
    quad: GpuMesh,
    mask: Option<GpuMesh>,
    warp: GpuMesh,
}

impl GpuCorrectionMesh {
    pub fn upload(device: &Device, mesh: &CorrectionMesh) -> GpuCorrectionMesh {
        GpuCorrectionMesh {
            quad: GpuMesh::upload(device, mesh.quad(), "correction-quad"),
            mask: mesh
                .mask()
                .map(|m| GpuMesh::upload(device, m, "correction-mask")),
            warp: GpuMesh::upload(device, mesh.warp(), "correction-warp"),
        }
    }

    pub fn mesh(&self, variant: MeshVariant) -> Option<&GpuMesh> {
        match variant {
            MeshVariant::Quad => Some(&self.quad),
            MeshVariant::Mask => self.mask.as_ref(),
            MeshVariant::Warp => Some(&self.warp),
        }
    }

    /// Record the draw for `variant`; drawing the mask of a viewport that
    /// has none records nothing.
    pub fn draw<'a>(&'a self, pass: &mut RenderPass<'a>, variant: MeshVariant) {
        if let Some(mesh) = self.mesh(variant) {
            mesh.draw(pass);
        }
    }
}
