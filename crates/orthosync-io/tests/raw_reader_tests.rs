//! Raw volume reader tests against files on disk

use std::fs;
use std::path::{Path, PathBuf};

use orthosync_core::{OrthoError, VolumeHolder, VolumeSource};
use orthosync_io::{open_volume, IoError, RawVolumeReader, DEFAULT_SPACING};
use tempfile::TempDir;

fn write_raw(dir: &Path, name: &str, values: &[f32]) -> PathBuf {
    let path = dir.join(name);
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    fs::write(&path, bytes).unwrap();
    path
}

fn ramp(n: usize) -> Vec<f32> {
    (0..n).map(|i| i as f32 * 0.5).collect()
}

#[test]
fn test_read_x_fastest() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_raw(temp_dir.path(), "phantom_4x3x2.raw", &ramp(24));

    let reader = RawVolumeReader::open(&path).unwrap();
    assert_eq!(reader.dims(), [4, 3, 2]);
    assert_eq!(reader.spacing(), [DEFAULT_SPACING; 3]);

    let volume = reader.read_volume().unwrap();
    assert_eq!(volume.dims(), [4, 3, 2]);
    assert_eq!(volume.value([1, 0, 0]), Some(0.5));
    assert_eq!(volume.value([0, 1, 0]), Some(2.0));
    assert_eq!(volume.value([0, 0, 1]), Some(6.0));
    assert_eq!(volume.scalar_range(), (0.0, 11.5));
}

#[test]
fn test_custom_spacing() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_raw(temp_dir.path(), "scan_2x2x2.raw", &ramp(8));

    let volume = RawVolumeReader::open(&path)
        .unwrap()
        .with_spacing([0.5, 0.5, 2.0])
        .read()
        .unwrap();
    assert_eq!(volume.spacing(), [0.5, 0.5, 2.0]);
    assert_eq!(volume.index_to_world([1, 1, 1]), [0.5, 0.5, 2.0]);
}

#[test]
fn test_trailing_bytes_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_raw(temp_dir.path(), "pad_2x2x1.raw", &ramp(6));
    let volume = RawVolumeReader::open(&path).unwrap().read().unwrap();
    assert_eq!(volume.scalars().len(), 4);
}

#[test]
fn test_short_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_raw(temp_dir.path(), "cut_4x4x4.raw", &ramp(10));

    let reader = RawVolumeReader::open(&path).unwrap();
    let err = reader.read_scalars().unwrap_err();
    assert!(matches!(
        err,
        IoError::ShortFile {
            expected: 256,
            actual: 40
        }
    ));
    assert!(matches!(reader.read_volume(), Err(OrthoError::Load(_))));
}

#[test]
fn test_name_without_dims() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_raw(temp_dir.path(), "volume.raw", &ramp(8));
    let err = RawVolumeReader::open(&path).unwrap_err();
    assert!(matches!(err, IoError::InvalidFormat(_)));
}

#[test]
fn test_unaddressable_dims_rejected_at_open() {
    let temp_dir = TempDir::new().unwrap();
    let name = format!("huge_{}x4x4.raw", usize::MAX);
    let path = write_raw(temp_dir.path(), &name, &ramp(8));

    let err = RawVolumeReader::open(&path).unwrap_err();
    assert!(matches!(err, IoError::InvalidFormat(_)));
    assert!(err.to_string().contains("too large"));

    // Byte count overflows even when the voxel count fits
    let name = format!("wide_{}x1x1.raw", usize::MAX / 2);
    let path = write_raw(temp_dir.path(), &name, &ramp(8));
    assert!(matches!(
        RawVolumeReader::open(&path),
        Err(IoError::InvalidFormat(_))
    ));
}

#[test]
fn test_open_volume_dispatch() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_raw(temp_dir.path(), "cube_2x2x2.RAW", &ramp(8));
    let source = open_volume(&path).unwrap();
    assert!(source.describe().contains("cube_2x2x2"));

    let other = write_raw(temp_dir.path(), "cube_2x2x2.h5", &ramp(8));
    assert!(matches!(open_volume(&other), Err(IoError::InvalidFormat(_))));
}

#[test]
fn test_failed_load_keeps_published_volume() {
    let temp_dir = TempDir::new().unwrap();
    let good = write_raw(temp_dir.path(), "good_2x2x2.raw", &ramp(8));
    let bad = write_raw(temp_dir.path(), "bad_3x3x3.raw", &ramp(8));
    let holder = VolumeHolder::new();

    let first = holder
        .load_with(&RawVolumeReader::open(&good).unwrap())
        .unwrap();
    assert_eq!(holder.generation(), 1);

    let source = open_volume(&bad).unwrap();
    assert!(holder.load_with(&*source).is_err());
    assert_eq!(holder.generation(), 1);
    assert_eq!(holder.current().unwrap().dims(), first.dims());
}
