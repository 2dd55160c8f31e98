//! Volume data and the double-buffered Data Holder
//!
//! A [`Volume`] is immutable once built. The [`VolumeHolder`] publishes a new
//! `Arc<Volume>` on every successful load; readers copy the handle out under
//! the lock and keep using their copy, so a renderer still reading the old
//! buffer is unaffected by a swap.

use ndarray::Array3;
use std::sync::{Arc, Mutex};

use crate::error::{OrthoError, Result};
use crate::state::{clamp_index, lock};

/// Number of voxels in a grid, `None` if it does not fit in `usize`
pub fn voxel_count(dims: [usize; 3]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Scalar volume on a regular grid
///
/// Dimensions, spacing and origin are given in (x, y, z) order. Scalars are
/// stored `[z, y, x]`, matching a raw buffer laid out as
/// `index = z * dx * dy + y * dx + x`.
#[derive(Debug, Clone)]
pub struct Volume {
    dims: [usize; 3],
    spacing: [f64; 3],
    origin: [f64; 3],
    scalars: Array3<f32>,
    scalar_range: (f64, f64),
}

impl Volume {
    /// Build a volume from a flat x-fastest buffer
    pub fn new(dims: [usize; 3], spacing: [f64; 3], origin: [f64; 3], data: Vec<f32>) -> Result<Self> {
        let expected = voxel_count(dims).ok_or_else(|| {
            OrthoError::InvalidVolume(format!(
                "{}x{}x{} overflows the addressable size",
                dims[0], dims[1], dims[2]
            ))
        })?;
        if data.len() != expected {
            return Err(OrthoError::InvalidVolume(format!(
                "expected {} scalars for {}x{}x{}, got {}",
                expected,
                dims[0],
                dims[1],
                dims[2],
                data.len()
            )));
        }
        let scalars = Array3::from_shape_vec((dims[2], dims[1], dims[0]), data)
            .map_err(|e| OrthoError::InvalidVolume(e.to_string()))?;
        Self::from_array(scalars, spacing, origin)
    }

    /// Build a volume from a `[z, y, x]` array
    pub fn from_array(scalars: Array3<f32>, spacing: [f64; 3], origin: [f64; 3]) -> Result<Self> {
        let (nz, ny, nx) = scalars.dim();
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(OrthoError::InvalidVolume("empty dimension".to_string()));
        }
        if spacing.iter().any(|s| !(*s > 0.0)) {
            return Err(OrthoError::InvalidVolume(format!(
                "spacing must be positive, got {:?}",
                spacing
            )));
        }

        let scalar_range = scalars
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, &v| {
                let v = v as f64;
                Some(match acc {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                })
            })
            .unwrap_or((0.0, 0.0));

        Ok(Self {
            dims: [nx, ny, nz],
            spacing,
            origin,
            scalars,
            scalar_range,
        })
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn scalars(&self) -> &Array3<f32> {
        &self.scalars
    }

    /// Minimum and maximum finite scalar
    pub fn scalar_range(&self) -> (f64, f64) {
        self.scalar_range
    }

    /// Scalar at voxel (x, y, z)
    pub fn value(&self, index: [usize; 3]) -> Option<f32> {
        self.scalars.get((index[2], index[1], index[0])).copied()
    }

    /// Largest valid index along `axis`
    pub fn max_index(&self, axis: usize) -> i32 {
        clamp_index(i64::MAX, self.dims[axis])
    }

    /// World-space bounds `[xmin, xmax, ymin, ymax, zmin, zmax]`
    pub fn bounds(&self) -> [f64; 6] {
        let mut bounds = [0.0; 6];
        for axis in 0..3 {
            bounds[axis * 2] = self.origin[axis];
            bounds[axis * 2 + 1] =
                self.origin[axis] + (self.dims[axis] - 1) as f64 * self.spacing[axis];
        }
        bounds
    }

    /// World-space center of the bounds
    pub fn center(&self) -> [f64; 3] {
        let b = self.bounds();
        [
            (b[0] + b[1]) / 2.0,
            (b[2] + b[3]) / 2.0,
            (b[4] + b[5]) / 2.0,
        ]
    }

    /// Voxel index at the middle of the grid
    pub fn center_index(&self) -> [i32; 3] {
        [
            (self.dims[0] / 2) as i32,
            (self.dims[1] / 2) as i32,
            (self.dims[2] / 2) as i32,
        ]
    }

    /// World coordinate of one index along one axis
    pub fn axis_to_world(&self, axis: usize, index: i32) -> f64 {
        self.origin[axis] + index as f64 * self.spacing[axis]
    }

    pub fn index_to_world(&self, index: [i32; 3]) -> [f64; 3] {
        [
            self.axis_to_world(0, index[0]),
            self.axis_to_world(1, index[1]),
            self.axis_to_world(2, index[2]),
        ]
    }

    /// Nearest voxel to a world position, clamped into the grid
    pub fn world_to_index(&self, world: [f64; 3]) -> [i32; 3] {
        let mut index = [0; 3];
        for axis in 0..3 {
            let continuous = (world[axis] - self.origin[axis]) / self.spacing[axis];
            let rounded = if continuous.is_finite() {
                continuous.round() as i64
            } else {
                0
            };
            index[axis] = clamp_index(rounded, self.dims[axis]);
        }
        index
    }

    /// Approximate buffer size in bytes
    pub fn byte_size(&self) -> usize {
        self.scalars.len() * std::mem::size_of::<f32>()
    }
}

/// Producer of volumes for the Data Holder (file readers, generators)
pub trait VolumeSource {
    /// Read a complete volume; called off the holder's lock
    fn read_volume(&self) -> Result<Volume>;

    /// Human-readable description for logs
    fn describe(&self) -> String {
        "volume source".to_string()
    }
}

#[derive(Default)]
struct Published {
    volume: Option<Arc<Volume>>,
    generation: u64,
}

/// Double-buffered holder of the current volume
///
/// The lock is held only for a handle copy or a handle swap.
#[derive(Default)]
pub struct VolumeHolder {
    published: Mutex<Published>,
}

impl std::fmt::Debug for VolumeHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let published = lock(&self.published);
        f.debug_struct("VolumeHolder")
            .field("dims", &published.volume.as_ref().map(|v| v.dims()))
            .field("generation", &published.generation)
            .finish()
    }
}

impl VolumeHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current volume handle, or `None` when nothing was loaded yet
    pub fn current(&self) -> Option<Arc<Volume>> {
        lock(&self.published).volume.clone()
    }

    /// Number of successful publishes so far
    pub fn generation(&self) -> u64 {
        lock(&self.published).generation
    }

    /// Current handle and generation read under one lock
    pub fn snapshot(&self) -> (Option<Arc<Volume>>, u64) {
        let published = lock(&self.published);
        (published.volume.clone(), published.generation)
    }

    pub fn has_data(&self) -> bool {
        lock(&self.published).volume.is_some()
    }

    /// Replace the published volume with a fully built one
    pub fn publish(&self, volume: Volume) -> Arc<Volume> {
        let volume = Arc::new(volume);
        let mut published = lock(&self.published);
        published.volume = Some(Arc::clone(&volume));
        published.generation += 1;
        volume
    }

    /// Read from `source` without holding the lock, then publish on success.
    ///
    /// On failure the previously published volume stays current.
    pub fn load_with<S>(&self, source: &S) -> Result<Arc<Volume>>
    where
        S: VolumeSource + ?Sized,
    {
        let volume = source.read_volume()?;
        tracing::info!(
            source = %source.describe(),
            dims = ?volume.dims(),
            bytes = volume.byte_size(),
            "publishing volume"
        );
        Ok(self.publish(volume))
    }
}
