// src/io/mod.rs

//! Wavefront OBJ import and export for warp meshes.
//!
//! OBJ is the interchange surface: meshes produced by external warping
//! tools come in through [`obj_read`], and any successfully loaded mesh
//! can be written back out through [`obj_write`] for inspection in a
//! standard model viewer.

pub mod obj_read;
pub mod obj_write;

pub use obj_read::import_obj_mesh;
pub use obj_write::export_obj_mesh;
