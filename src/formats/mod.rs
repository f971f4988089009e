//! Calibration mesh format parsers and format selection.
//!
//! Each vendor format gets its own module; all of them produce a
//! [`GeometryBuffer`](crate::geometry::GeometryBuffer) remapped into a
//! target viewport rectangle.

use std::fmt;
use std::io::Read;

use crate::error::{MeshError, MeshResult};

pub mod domeprojection;
pub mod mpcdi;
pub mod paulbourke;
pub mod scalable;
pub mod sciss;
pub mod simcad;
pub mod skyskan;

pub use domeprojection::load_domeprojection_mesh;
pub use mpcdi::{load_mpcdi_mesh, load_mpcdi_mesh_from_buffer};
pub use paulbourke::load_paulbourke_mesh;
pub use scalable::load_scalable_mesh;
pub use sciss::load_sciss_mesh;
pub use simcad::load_simcad_mesh;
pub use skyskan::load_skyskan_mesh;

/// The calibration formats this pipeline understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    DomeProjection,
    Scalable,
    Sciss,
    SimCad,
    SkySkan,
    PaulBourke,
    Obj,
    Mpcdi,
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeshFormat::DomeProjection => "DomeProjection",
            MeshFormat::Scalable => "Scalable",
            MeshFormat::Sciss => "SCISS",
            MeshFormat::SimCad => "SimCAD",
            MeshFormat::SkySkan => "SkySkan",
            MeshFormat::PaulBourke => "PaulBourke",
            MeshFormat::Obj => "OBJ",
            MeshFormat::Mpcdi => "MPCDI",
        };
        f.write_str(name)
    }
}

/// Fill `buf` completely or fail with a `ShortRead` carrying the byte
/// counts. The binary formats tolerate no partial records.
pub(crate) fn read_block<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> MeshResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(MeshError::short_read(what, buf.len(), filled));
        }
        filled += n;
    }
    Ok(())
}

pub(crate) fn le_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

pub(crate) fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Parse a configuration hint string into a format.
///
/// Empty input means no hint; anything else unrecognized is logged and
/// treated the same, so a typo in a config degrades to extension-only
/// selection instead of failing the viewport.
pub fn parse_hint(hint: &str) -> Option<MeshFormat> {
    if hint.is_empty() {
        return None;
    }
    match hint.to_lowercase().as_str() {
        "domeprojection" => Some(MeshFormat::DomeProjection),
        "scalable" => Some(MeshFormat::Scalable),
        "sciss" => Some(MeshFormat::Sciss),
        "simcad" => Some(MeshFormat::SimCad),
        "skyskan" => Some(MeshFormat::SkySkan),
        "mpcdi" => Some(MeshFormat::Mpcdi),
        _ => {
            log::warn!("mesh hint '{}' is invalid", hint);
            None
        }
    }
}

/// Pick a parser for `path`, honoring an optional explicit hint.
///
/// Matching is by lowercase substring, first hit wins. Ambiguous
/// extensions (`.txt`, `.csv`, `.data`, `.simcad`) accept their default
/// only when no hint was given or the hint agrees; `.pfm` is a raw image
/// encoding and resolves to MPCDI only on an explicit MPCDI hint.
pub fn select_format(path: &str, hint: Option<MeshFormat>) -> Option<MeshFormat> {
    let path = path.to_lowercase();
    let agrees = |fmt: MeshFormat| hint.is_none() || hint == Some(fmt);

    if path.contains(".sgc") {
        Some(MeshFormat::Sciss)
    } else if path.contains(".ol") {
        Some(MeshFormat::Scalable)
    } else if path.contains(".skyskan") {
        Some(MeshFormat::SkySkan)
    } else if path.contains(".txt") {
        agrees(MeshFormat::SkySkan).then_some(MeshFormat::SkySkan)
    } else if path.contains(".csv") {
        agrees(MeshFormat::DomeProjection).then_some(MeshFormat::DomeProjection)
    } else if path.contains(".data") {
        agrees(MeshFormat::PaulBourke).then_some(MeshFormat::PaulBourke)
    } else if path.contains(".obj") {
        Some(MeshFormat::Obj)
    } else if path.contains(".mpcdi") {
        Some(MeshFormat::Mpcdi)
    } else if path.contains(".pfm") {
        (hint == Some(MeshFormat::Mpcdi)).then_some(MeshFormat::Mpcdi)
    } else if path.contains(".simcad") {
        agrees(MeshFormat::SimCad).then_some(MeshFormat::SimCad)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unambiguous_extensions() {
        assert_eq!(select_format("dome.sgc", None), Some(MeshFormat::Sciss));
        assert_eq!(select_format("wall.ol", None), Some(MeshFormat::Scalable));
        assert_eq!(select_format("chan.skyskan", None), Some(MeshFormat::SkySkan));
        assert_eq!(select_format("warp.obj", None), Some(MeshFormat::Obj));
        assert_eq!(select_format("bundle.mpcdi", None), Some(MeshFormat::Mpcdi));
    }

    #[test]
    fn selection_is_case_insensitive() {
        assert_eq!(select_format("C:\\Meshes\\DOME.SGC", None), Some(MeshFormat::Sciss));
    }

    #[test]
    fn ambiguous_extensions_follow_hint() {
        assert_eq!(select_format("mesh.txt", None), Some(MeshFormat::SkySkan));
        assert_eq!(
            select_format("mesh.txt", Some(MeshFormat::SkySkan)),
            Some(MeshFormat::SkySkan)
        );
        assert_eq!(select_format("mesh.txt", Some(MeshFormat::DomeProjection)), None);

        assert_eq!(select_format("grid.csv", None), Some(MeshFormat::DomeProjection));
        assert_eq!(select_format("grid.csv", Some(MeshFormat::SkySkan)), None);

        assert_eq!(select_format("mirror.data", None), Some(MeshFormat::PaulBourke));
        assert_eq!(select_format("mirror.data", Some(MeshFormat::Sciss)), None);

        assert_eq!(select_format("warp.simcad", None), Some(MeshFormat::SimCad));
        assert_eq!(select_format("warp.simcad", Some(MeshFormat::Obj)), None);
    }

    #[test]
    fn pfm_requires_explicit_mpcdi_hint() {
        assert_eq!(select_format("warp.pfm", None), None);
        assert_eq!(select_format("warp.pfm", Some(MeshFormat::SkySkan)), None);
        assert_eq!(
            select_format("warp.pfm", Some(MeshFormat::Mpcdi)),
            Some(MeshFormat::Mpcdi)
        );
    }

    #[test]
    fn unknown_extension_yields_none() {
        assert_eq!(select_format("mesh.bin", None), None);
        assert_eq!(select_format("mesh", Some(MeshFormat::Sciss)), None);
    }

    #[test]
    fn hint_strings_round_trip() {
        assert_eq!(parse_hint(""), None);
        assert_eq!(parse_hint("DomeProjection"), Some(MeshFormat::DomeProjection));
        assert_eq!(parse_hint("scalable"), Some(MeshFormat::Scalable));
        assert_eq!(parse_hint("sciss"), Some(MeshFormat::Sciss));
        assert_eq!(parse_hint("simcad"), Some(MeshFormat::SimCad));
        assert_eq!(parse_hint("SKYSKAN"), Some(MeshFormat::SkySkan));
        assert_eq!(parse_hint("mpcdi"), Some(MeshFormat::Mpcdi));
        assert_eq!(parse_hint("nonsense"), None);
    }
}
