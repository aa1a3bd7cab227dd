use super::types::{FileType, ReadError};
use std::path::Path;

pub fn reader_from_filetype(path: &Path) -> Result<FileType, ReadError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tif") | Some("tiff") => Ok(FileType::GeoTiff),
        Some("nc") | Some("nc4") => Ok(FileType::NetCDF),
        _ => Err(ReadError::UnknownFileType(path.to_path_buf())),
    }
}
