// src/generator.rs
// Correction mesh generation: format selection, loading, fallbacks

//! Builds the full set of correction meshes for one viewport.
//!
//! Every viewport gets three meshes: an unwarped quad used when warping
//! is disabled, an optional mask quad for blend and black level masking,
//! and the warp mesh itself, parsed from a calibration file. A mesh
//! that fails to load is replaced by the unwarped quad so rendering can
//! continue; the failure is reported through the log and through
//! [`CorrectionMesh::warp_format`] returning `None`.

use serde::{Deserialize, Serialize};

use crate::formats::{self, MeshFormat};
use crate::geometry::{CorrectionVertex, GeometryBuffer, Topology};
use crate::io::export_obj_mesh;
use crate::viewport::{FrustumUpdater, Viewport};
use crate::MeshResult;

/// Mesh generation knobs, usually read from the cluster configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// Write every successfully parsed warp mesh back out next to its
    /// source file as `<stem>_export.obj`.
    #[serde(default = "GeneratorOptions::default_export_warp_meshes")]
    pub export_warp_meshes: bool,
    /// Aspect ratio of the window the viewport lives in; only the
    /// PaulBourke format needs it.
    #[serde(default = "GeneratorOptions::default_window_aspect_ratio")]
    pub window_aspect_ratio: f32,
    /// Topology substituted for the quad strips of legacy SCISS files.
    #[serde(default = "GeneratorOptions::default_legacy_strip")]
    pub legacy_strip: Topology,
    #[serde(default = "GeneratorOptions::default_mask_flip")]
    pub mask_flip_x: bool,
    #[serde(default = "GeneratorOptions::default_mask_flip")]
    pub mask_flip_y: bool,
}

impl GeneratorOptions {
    const fn default_export_warp_meshes() -> bool {
        false
    }

    const fn default_window_aspect_ratio() -> f32 {
        1.0
    }

    const fn default_legacy_strip() -> Topology {
        Topology::TriangleStrip
    }

    const fn default_mask_flip() -> bool {
        false
    }
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            export_warp_meshes: Self::default_export_warp_meshes(),
            window_aspect_ratio: Self::default_window_aspect_ratio(),
            legacy_strip: Self::default_legacy_strip(),
            mask_flip_x: Self::default_mask_flip(),
            mask_flip_y: Self::default_mask_flip(),
        }
    }
}

/// Which of the per-viewport meshes to draw with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MeshVariant {
    /// The unwarped viewport quad.
    Quad,
    /// The quad used to apply blend and black level masks.
    Mask,
    /// The warp mesh, or the unwarped quad if loading failed.
    Warp,
}

/// The generated meshes for one viewport.
#[derive(Debug, Clone)]
pub struct CorrectionMesh {
    quad: GeometryBuffer,
    mask: Option<GeometryBuffer>,
    warp: GeometryBuffer,
    warp_format: Option<MeshFormat>,
}

impl CorrectionMesh {
    /// Load the warp mesh at `mesh_path` and assemble the per-viewport
    /// mesh set.
    ///
    /// This never fails: an empty path, an unrecognized extension, or a
    /// parse error all fall back to the unwarped quad, reported through
    /// the log. Calibration data carried by the file (eye position,
    /// field of view) is pushed into `frustum` as a side effect of
    /// parsing.
    pub fn generate(
        mesh_path: &str,
        hint: Option<MeshFormat>,
        viewport: &Viewport,
        frustum: &mut dyn FrustumUpdater,
        options: &GeneratorOptions,
    ) -> CorrectionMesh {
        let quad = unwarped_quad(viewport);

        let mask = if viewport.has_mask_texture() {
            log::debug!("creating mask mesh");
            Some(mask_quad(viewport, options.mask_flip_x, options.mask_flip_y))
        } else {
            None
        };

        if mesh_path.is_empty() {
            log::debug!("empty mesh path, using unwarped quad");
            let warp = quad.clone();
            return CorrectionMesh {
                quad,
                mask,
                warp,
                warp_format: None,
            };
        }

        let Some(format) = formats::select_format(mesh_path, hint) else {
            log::error!("loading mesh '{}' failed: no matching parser", mesh_path);
            let warp = quad.clone();
            return CorrectionMesh {
                quad,
                mask,
                warp,
                warp_format: None,
            };
        };

        match load_mesh(format, mesh_path, viewport, frustum, options) {
            Ok(warp) => {
                if options.export_warp_meshes {
                    export_next_to_source(mesh_path, &warp);
                }
                CorrectionMesh {
                    quad,
                    mask,
                    warp,
                    warp_format: Some(format),
                }
            }
            Err(e) => {
                log::error!("loading mesh '{}' failed: {}", mesh_path, e);
                let warp = quad.clone();
                CorrectionMesh {
                    quad,
                    mask,
                    warp,
                    warp_format: None,
                }
            }
        }
    }

    pub fn buffer(&self, variant: MeshVariant) -> Option<&GeometryBuffer> {
        match variant {
            MeshVariant::Quad => Some(&self.quad),
            MeshVariant::Mask => self.mask.as_ref(),
            MeshVariant::Warp => Some(&self.warp),
        }
    }

    pub fn quad(&self) -> &GeometryBuffer {
        &self.quad
    }

    pub fn mask(&self) -> Option<&GeometryBuffer> {
        self.mask.as_ref()
    }

    pub fn warp(&self) -> &GeometryBuffer {
        &self.warp
    }

    /// The format the warp mesh was read from, or `None` when the warp
    /// mesh is the unwarped fallback quad.
    pub fn warp_format(&self) -> Option<MeshFormat> {
        self.warp_format
    }

    pub fn is_warped(&self) -> bool {
        self.warp_format.is_some()
    }
}

fn load_mesh(
    format: MeshFormat,
    path: &str,
    viewport: &Viewport,
    frustum: &mut dyn FrustumUpdater,
    options: &GeneratorOptions,
) -> MeshResult<GeometryBuffer> {
    match format {
        MeshFormat::DomeProjection => formats::load_domeprojection_mesh(path, viewport),
        MeshFormat::Scalable => formats::load_scalable_mesh(path, viewport),
        MeshFormat::Sciss => {
            formats::load_sciss_mesh(path, viewport, frustum, options.legacy_strip)
        }
        MeshFormat::SimCad => formats::load_simcad_mesh(path, viewport),
        MeshFormat::SkySkan => formats::load_skyskan_mesh(path, viewport, frustum),
        MeshFormat::PaulBourke => {
            formats::load_paulbourke_mesh(path, viewport, frustum, options.window_aspect_ratio)
        }
        MeshFormat::Obj => crate::io::import_obj_mesh(path),
        MeshFormat::Mpcdi => match &viewport.mpcdi_buffer {
            Some(buffer) => formats::load_mpcdi_mesh_from_buffer(buffer),
            None => formats::load_mpcdi_mesh(path),
        },
    }
}

fn export_next_to_source(mesh_path: &str, warp: &GeometryBuffer) {
    // paths without an extension get no export; the name is derived by
    // replacing everything after the last dot
    let Some(dot) = mesh_path.rfind('.') else {
        return;
    };
    let export_path = format!("{}_export.obj", &mesh_path[..dot]);
    if let Err(e) = export_obj_mesh(&export_path, warp) {
        log::error!("failed to export '{}': {}", export_path, e);
    }
}

const QUAD_CORNERS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
// corner walk that avoids a bowtie when drawn as a strip
const QUAD_STRIP_INDICES: [u32; 4] = [0, 3, 1, 2];

fn corner_position(viewport: &Viewport, cx: f32, cy: f32) -> [f32; 2] {
    [
        2.0 * (cx * viewport.size.x + viewport.position.x) - 1.0,
        2.0 * (cy * viewport.size.y + viewport.position.y) - 1.0,
    ]
}

fn unwarped_quad(viewport: &Viewport) -> GeometryBuffer {
    let vertices = QUAD_CORNERS
        .iter()
        .map(|&[cx, cy]| {
            CorrectionVertex::white(
                corner_position(viewport, cx, cy),
                [
                    cx * viewport.size.x + viewport.position.x,
                    cy * viewport.size.y + viewport.position.y,
                ],
            )
        })
        .collect();
    GeometryBuffer {
        vertices,
        indices: QUAD_STRIP_INDICES.to_vec(),
        topology: Topology::TriangleStrip,
    }
}

fn mask_quad(viewport: &Viewport, flip_x: bool, flip_y: bool) -> GeometryBuffer {
    // mask textures cover the viewport directly, so texcoords stay in
    // texture space instead of being scaled into the viewport rectangle
    let vertices = QUAD_CORNERS
        .iter()
        .map(|&[cx, cy]| {
            let s = if flip_x { 1.0 - cx } else { cx };
            let t = if flip_y { 1.0 - cy } else { cy };
            CorrectionVertex::white(corner_position(viewport, cx, cy), [s, t])
        })
        .collect();
    GeometryBuffer {
        vertices,
        indices: QUAD_STRIP_INDICES.to_vec(),
        topology: Topology::TriangleStrip,
    }
}
