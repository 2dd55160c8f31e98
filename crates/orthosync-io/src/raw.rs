//! Raw float volume reader
//!
//! A raw file is a headerless block of little-endian `f32` scalars, x
//! fastest. Its dimensions are encoded in the file name, e.g.
//! `head_256x256x113.raw`.

use lazy_static::lazy_static;
use orthosync_core::{voxel_count, Volume, VolumeSource};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IoError, IoResult};

/// Isotropic voxel spacing used when none is given
pub const DEFAULT_SPACING: f64 = 0.02125;

lazy_static! {
    static ref DIMS_PATTERN: Regex = Regex::new(r"(\d+)[xX](\d+)[xX](\d+)").unwrap();
}

/// Parse `WxHxD` from a file name. Only the final path component is searched.
pub fn dims_from_name(path: &Path) -> Option<[usize; 3]> {
    let name = path.file_name()?.to_str()?;
    let captures = DIMS_PATTERN.captures(name)?;
    let mut dims = [0usize; 3];
    for (axis, dim) in dims.iter_mut().enumerate() {
        *dim = captures.get(axis + 1)?.as_str().parse().ok()?;
    }
    Some(dims)
}

/// Reader for one raw volume file
#[derive(Debug, Clone)]
pub struct RawVolumeReader {
    path: PathBuf,
    dims: [usize; 3],
    expected_bytes: usize,
    spacing: [f64; 3],
    origin: [f64; 3],
}

impl RawVolumeReader {
    /// Check the file exists and parse its dimensions. Data is read later by
    /// [`RawVolumeReader::read`].
    pub fn open(path: impl AsRef<Path>) -> IoResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if !path.exists() {
            return Err(IoError::FileNotFound(display));
        }

        let dims = dims_from_name(path).ok_or_else(|| {
            IoError::InvalidFormat(format!("no WxHxD dimensions in file name: {}", display))
        })?;
        if dims.contains(&0) {
            return Err(IoError::InvalidFormat(format!(
                "zero dimension in file name: {}",
                display
            )));
        }

        let expected_bytes = voxel_count(dims)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
            .ok_or_else(|| {
                IoError::InvalidFormat(format!("dimensions too large to address: {}", display))
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            dims,
            expected_bytes,
            spacing: [DEFAULT_SPACING; 3],
            origin: [0.0; 3],
        })
    }

    pub fn with_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// Bytes a complete file must hold
    pub fn expected_bytes(&self) -> usize {
        self.expected_bytes
    }

    /// Read the scalars. Trailing bytes past `x*y*z` values are ignored.
    pub fn read_scalars(&self) -> IoResult<Vec<f32>> {
        let bytes = fs::read(&self.path).map_err(|e| IoError::OpenFailed(e.to_string()))?;
        let expected = self.expected_bytes();
        if bytes.len() < expected {
            return Err(IoError::ShortFile {
                expected,
                actual: bytes.len(),
            });
        }
        if bytes.len() > expected {
            tracing::debug!(
                "{}: ignoring {} trailing bytes",
                self.path.display(),
                bytes.len() - expected
            );
        }

        Ok(bytes[..expected]
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Read the whole file into a [`Volume`]
    pub fn read(&self) -> orthosync_core::Result<Volume> {
        let scalars = self.read_scalars()?;
        let volume = Volume::new(self.dims, self.spacing, self.origin, scalars)?;
        tracing::debug!(
            "read {} ({}x{}x{}, {} bytes)",
            self.path.display(),
            self.dims[0],
            self.dims[1],
            self.dims[2],
            volume.byte_size()
        );
        Ok(volume)
    }
}

impl VolumeSource for RawVolumeReader {
    fn read_volume(&self) -> orthosync_core::Result<Volume> {
        self.read()
    }

    fn describe(&self) -> String {
        format!("raw volume {}", self.path.display())
    }
}
