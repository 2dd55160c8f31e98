//! orthosync-io - Volume loaders for orthosync
//!
//! Readers here implement the core [`orthosync_core::VolumeSource`] trait, so
//! a view service can load through them and publish the result to every view.
//!
//! - **Raw**: headerless little-endian `f32` volumes, dimensions in the file name

pub mod error;
pub mod raw;

pub use error::{IoError, IoResult};
pub use raw::{dims_from_name, RawVolumeReader, DEFAULT_SPACING};

use orthosync_core::VolumeSource;
use std::path::Path;

/// A boxed volume source for dynamic dispatch
pub type BoxedSource = Box<dyn VolumeSource + Send + Sync>;

/// Open a volume file, choosing the reader from its extension
pub fn open_volume(path: impl AsRef<Path>) -> IoResult<BoxedSource> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "raw" | "bin" => Ok(Box::new(RawVolumeReader::open(path)?)),
        _ => Err(IoError::InvalidFormat(format!(
            "Unknown file extension: {}",
            extension
        ))),
    }
}

/// List supported file extensions
pub fn supported_extensions() -> Vec<&'static str> {
    vec!["raw", "bin"]
}
