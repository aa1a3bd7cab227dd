//! Readers turning raster files into [`GridField`](crate::grid::GridField)s.

pub mod geotiff;
#[cfg(feature = "gdal")]
pub mod nc;
pub mod types;
pub mod utils;

pub use geotiff::GeoTiffReader;
#[cfg(feature = "gdal")]
pub use nc::NcReader;
pub use types::{DataReader, FieldMetadata, FileType, ReadError};
pub use utils::reader_from_filetype;

use std::path::Path;

/// Reader for `file_name`, picked by extension. `variable` names the NetCDF
/// variable to read and is ignored for GeoTIFFs.
pub fn create_reader(file_name: &Path, variable: &str) -> Result<Box<dyn DataReader>, ReadError> {
    match reader_from_filetype(file_name)? {
        FileType::GeoTiff => Ok(Box::new(GeoTiffReader {
            file_name: file_name.to_path_buf(),
        })),
        #[cfg(feature = "gdal")]
        FileType::NetCDF => Ok(Box::new(NcReader {
            file_name: file_name.to_path_buf(),
            variable: variable.to_string(),
        })),
        #[cfg(not(feature = "gdal"))]
        FileType::NetCDF => {
            let _ = variable;
            Err(ReadError::NetCDF {
                path: file_name.to_path_buf(),
                message: "built without the `gdal` feature".to_string(),
            })
        }
    }
}
