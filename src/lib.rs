//! Warp mesh correction for multi-projector displays.
//!
//! Loads the calibration formats produced by common projection tools
//! (DomeProjection, Scalable Display, SCISS, SimCAD, SkySkan, Paul
//! Bourke, Wavefront OBJ, MPCDI/PFM), remaps them into a viewport
//! rectangle, and uploads the result as wgpu vertex/index buffers.
//! Rust: wgpu 0.19, glam, bytemuck.

pub mod error;
pub mod formats;
pub mod generator;
pub mod geometry;
pub mod gpu;
pub mod io;
pub mod viewport;

pub use error::{MeshError, MeshResult};
pub use formats::MeshFormat;
pub use generator::{CorrectionMesh, GeneratorOptions, MeshVariant};
pub use geometry::{CorrectionVertex, GeometryBuffer, Topology};
pub use gpu::{GpuCorrectionMesh, GpuMesh};
pub use viewport::{DiscardCalibration, FovAngles, FrustumUpdater, Viewport};
