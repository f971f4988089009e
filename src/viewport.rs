// src/viewport.rs
// Target rectangle every parser remaps into, plus the collaborator contract
// for calibration data recovered from SCISS and SkySkan files

use glam::{Quat, Vec2, Vec3};

/// Normalized [0,1] screen-space rectangle a parsed mesh is placed into.
///
/// Read-only input to every parser. Also carries the mask-texture flags
/// that decide whether a mask mesh is generated, and the optional PFM
/// payload extracted from an `.mpcdi` bundle held in memory.
#[derive(Debug, Clone)]
pub struct Viewport {
    pub position: Vec2,
    pub size: Vec2,
    pub blend_mask: bool,
    pub black_level_mask: bool,
    pub mpcdi_buffer: Option<Vec<u8>>,
}

impl Viewport {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            blend_mask: false,
            black_level_mask: false,
            mpcdi_buffer: None,
        }
    }

    /// Whole-screen viewport, the common single-projector case.
    pub fn fullscreen() -> Self {
        Self::new(Vec2::ZERO, Vec2::ONE)
    }

    pub fn has_mask_texture(&self) -> bool {
        self.blend_mask || self.black_level_mask
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::fullscreen()
    }
}

/// Four-sided field of view, half-angles in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FovAngles {
    pub up: f32,
    pub down: f32,
    pub left: f32,
    pub right: f32,
}

/// Receiver for the calibration side-channel.
///
/// SCISS and SkySkan files embed the calibrated projector viewpoint; the
/// parsers are the only place that data is recovered, so they push it here
/// as part of a successful parse. Calls arrive synchronously, before the
/// next frustum computation for the viewport.
pub trait FrustumUpdater {
    /// Move the projection eye point.
    fn set_eye_position(&mut self, position: Vec3);

    /// Re-derive the view plane from four FOV half-angles and a rotation.
    fn set_view_plane_fov(&mut self, fov: FovAngles, rotation: Quat);

    /// Recompute the derived projection quad with aspect ratio ignored.
    /// Spherical-mirror meshes bake the aspect into the warp itself.
    fn ignore_aspect_ratio(&mut self);
}

/// No-op receiver for callers without a projection to update.
#[derive(Debug, Default)]
pub struct DiscardCalibration;

impl FrustumUpdater for DiscardCalibration {
    fn set_eye_position(&mut self, _position: Vec3) {}
    fn set_view_plane_fov(&mut self, _fov: FovAngles, _rotation: Quat) {}
    fn ignore_aspect_ratio(&mut self) {}
}
