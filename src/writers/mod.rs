//! Output files: multi-page GeoTIFFs and LPJ-GUESS gridlists.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod geotiff;
pub mod gridlist;

pub use geotiff::GeoTiffWriter;
pub use gridlist::write_gridlist;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("GeoTIFF error in '{path}': {message}")]
    GeoTiff { path: PathBuf, message: String },

    #[error("cannot serialize metadata of '{variable}': {source}")]
    Metadata {
        variable: String,
        source: serde_json::Error,
    },
}

/// Writes through `write` into a sibling `.part` file and moves it into
/// place once complete. Nothing is left behind on failure.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<(), WriteError>
where
    F: FnOnce(&Path) -> Result<(), WriteError>,
{
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    match write(&partial) {
        Ok(()) => std::fs::rename(&partial, path).map_err(io_error),
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            Err(e)
        }
    }
}
