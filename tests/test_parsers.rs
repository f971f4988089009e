// tests/test_parsers.rs
// Loads every calibration format through the public file-level entry
// points, with fixtures written to disk the way the vendor tools write
// them.

use std::fs;
use std::path::PathBuf;

use glam::{Quat, Vec3};
use tempfile::TempDir;

use warpmesh::formats;
use warpmesh::{FovAngles, FrustumUpdater, MeshError, Topology, Viewport};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Default)]
struct RecordingFrustum {
    eye: Option<Vec3>,
    fov: Option<FovAngles>,
    rotation: Option<Quat>,
    aspect_ignored: bool,
}

impl FrustumUpdater for RecordingFrustum {
    fn set_eye_position(&mut self, position: Vec3) {
        self.eye = Some(position);
    }
    fn set_view_plane_fov(&mut self, fov: FovAngles, rotation: Quat) {
        self.fov = Some(fov);
        self.rotation = Some(rotation);
    }
    fn ignore_aspect_ratio(&mut self) {
        self.aspect_ignored = true;
    }
}

fn write_fixture(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn domeprojection_csv_loads_from_disk() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "dome.csv",
        b"x;y;u;v;col;row\n\
          0.0;0.0;0.0;0.0;0;0\n\
          1.0;0.0;1.0;0.0;1;0\n\
          0.0;1.0;0.0;1.0;0;1\n\
          1.0;1.0;1.0;1.0;1;1\n",
    );

    let vp = Viewport::fullscreen();
    let buf = formats::load_domeprojection_mesh(&path, &vp).unwrap();
    assert_eq!(buf.vertex_count(), 4);
    assert_eq!(buf.index_count(), 6);
    assert_eq!(buf.topology, Topology::TriangleList);
    // the first row of the file is the top of the image
    assert_eq!(buf.vertices[0].position, [-1.0, 1.0]);
}

#[test]
fn scalable_ol_loads_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "wall.ol",
        b"VERTICES 4\n\
          FACES 2\n\
          ORTHO_LEFT 0.0\n\
          ORTHO_RIGHT 1.0\n\
          ORTHO_BOTTOM 0.0\n\
          ORTHO_TOP 1.0\n\
          NATIVEXRES 100\n\
          NATIVEYRES 100\n\
          0.0 0.0 255 0.0 0.0\n\
          100.0 0.0 255 0.0 1.0\n\
          0.0 100.0 255 1.0 0.0\n\
          100.0 100.0 255 1.0 1.0\n\
          [ 0 1 2 ]\n\
          [ 2 1 3 ]\n",
    );

    let vp = Viewport::fullscreen();
    let buf = formats::load_scalable_mesh(&path, &vp).unwrap();
    assert_eq!(buf.vertex_count(), 4);
    assert_eq!(buf.indices, vec![0, 1, 2, 2, 1, 3]);
    assert_eq!(buf.vertices[0].position, [-1.0, -1.0]);
    assert_eq!(buf.vertices[3].position, [1.0, 1.0]);
}

#[test]
fn scalable_with_oversized_declarations_is_rejected() {
    // keywords announce counts no file could back up
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "huge.ol", b"VERTICES 4\nFACES 6000000000000000000\n");

    let vp = Viewport::fullscreen();
    let err = formats::load_scalable_mesh(&path, &vp).unwrap_err();
    assert!(matches!(err, MeshError::CountMismatch { .. }));
}

fn sciss_fixture() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"SGC");
    out.push(b'2');
    out.extend_from_slice(&0u32.to_le_bytes()); // planar mapping
    for v in [0.0f32, 0.0, 0.0, 1.0, /* eye */ 1.0, 2.0, 3.0] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in [30.0f32, -30.0, -40.0, 40.0] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    // grid width 4 selects the list topology; 4x1 cells give 4 vertices
    out.extend_from_slice(&4u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for [x, y] in [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]] {
        for v in [x, y, 0.0, x, y, 0.0] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out.extend_from_slice(&3u32.to_le_bytes());
    for i in [0u32, 1, 2] {
        out.extend_from_slice(&i.to_le_bytes());
    }
    out
}

#[test]
fn sciss_sgc_loads_and_pushes_calibration() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "dome.sgc", &sciss_fixture());

    let vp = Viewport::fullscreen();
    let mut frustum = RecordingFrustum::default();
    let buf =
        formats::load_sciss_mesh(&path, &vp, &mut frustum, Topology::TriangleStrip).unwrap();

    assert_eq!(buf.topology, Topology::TriangleList);
    assert_eq!(buf.vertex_count(), 4);
    assert_eq!(frustum.eye, Some(Vec3::new(1.0, 2.0, 3.0)));
    assert_eq!(frustum.fov.map(|f| f.right), Some(40.0));
    assert_eq!(frustum.rotation, Some(Quat::IDENTITY));
}

#[test]
fn sciss_truncated_file_fails_without_calibration() {
    let dir = TempDir::new().unwrap();
    let mut bytes = sciss_fixture();
    bytes.truncate(bytes.len() - 10);
    let path = write_fixture(&dir, "cut.sgc", &bytes);

    let vp = Viewport::fullscreen();
    let mut frustum = RecordingFrustum::default();
    let err = formats::load_sciss_mesh(&path, &vp, &mut frustum, Topology::TriangleStrip)
        .unwrap_err();
    assert!(matches!(err, MeshError::ShortRead { .. }));
    assert!(frustum.eye.is_none());
}

#[test]
fn skyskan_txt_loads_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "chan.txt",
        b"Dome Azimuth=0.0\n\
          Dome Elevation=90.0\n\
          Horizontal FOV=90.0\n\
          Vertical FOV=90.0\n\
          2 2\n\
          0.0 0.0 0.0 0.0\n\
          1.0 0.0 1.0 0.0\n\
          0.0 1.0 0.0 1.0\n\
          1.0 1.0 1.0 1.0\n",
    );

    let vp = Viewport::fullscreen();
    let mut frustum = RecordingFrustum::default();
    let buf = formats::load_skyskan_mesh(&path, &vp, &mut frustum).unwrap();
    assert_eq!(buf.vertex_count(), 4);
    assert_eq!(buf.index_count(), 6);
    assert_eq!(frustum.eye, Some(Vec3::ZERO));
    assert_eq!(frustum.fov.map(|f| f.up), Some(45.0));
}

#[test]
fn paulbourke_data_loads_and_ignores_aspect() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "mirror.data",
        b"3\n\
          2 2\n\
          -1.0 -1.0 0.0 0.0 1.0\n\
          1.0 -1.0 1.0 0.0 1.0\n\
          -1.0 1.0 0.0 1.0 1.0\n\
          1.0 1.0 1.0 1.0 0.5\n",
    );

    let vp = Viewport::fullscreen();
    let mut frustum = RecordingFrustum::default();
    let buf = formats::load_paulbourke_mesh(&path, &vp, &mut frustum, 1.0).unwrap();
    assert_eq!(buf.vertex_count(), 4);
    assert_eq!(buf.vertices[0].position, [-1.0, -1.0]);
    assert_eq!(buf.vertices[3].position, [1.0, 1.0]);
    // the per-point intensity lands in the vertex color
    assert_eq!(buf.vertices[3].color, [0.5, 0.5, 0.5, 1.0]);
    assert!(frustum.aspect_ignored);
}

#[test]
fn simcad_xml_loads_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "warp.simcad",
        b"<GeometryFile version=\"1.0\">\
            <GeometryDefinition>\
              <X-FlatParameters range=\"1.0\">0 0 0 0</X-FlatParameters>\
              <Y-FlatParameters range=\"1.0\">0 0 0 0</Y-FlatParameters>\
            </GeometryDefinition>\
          </GeometryFile>",
    );

    let vp = Viewport::fullscreen();
    let buf = formats::load_simcad_mesh(&path, &vp).unwrap();
    assert_eq!(buf.vertex_count(), 4);
    assert_eq!(buf.topology, Topology::TriangleStrip);
}

fn pfm_fixture() -> Vec<u8> {
    let mut out = Vec::from(&b"PF\n2 2\n-1.0\n"[..]);
    for [x, y] in [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]] {
        for v in [x, y, f32::NAN] {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

#[test]
fn mpcdi_pfm_loads_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "warp.pfm", &pfm_fixture());

    let buf = formats::load_mpcdi_mesh(&path).unwrap();
    assert_eq!(buf.vertex_count(), 4);
    assert_eq!(buf.topology, Topology::TriangleList);
}

#[test]
fn mpcdi_truncated_file_is_rejected() {
    // the file path applies the same strict record reads as the buffer
    // path: a body cut mid-record must not yield partial geometry
    let dir = TempDir::new().unwrap();
    let mut bytes = pfm_fixture();
    bytes.truncate(bytes.len() - 4);
    let path = write_fixture(&dir, "cut.pfm", &bytes);

    let err = formats::load_mpcdi_mesh(&path).unwrap_err();
    assert!(matches!(
        err,
        MeshError::ShortRead { expected: 12, actual: 8, .. }
    ));
}

#[test]
fn missing_file_reports_the_path() {
    let vp = Viewport::fullscreen();
    let err = formats::load_scalable_mesh("/nonexistent/wall.ol", &vp).unwrap_err();
    match err {
        MeshError::FileNotFound { path, .. } => {
            assert!(path.ends_with("wall.ol"));
        }
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}
