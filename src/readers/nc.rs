use super::{DataReader, FieldMetadata, ReadError};
use crate::grid::GridField;
use gdal::{Dataset, Metadata};
use ndarray::Array3;
use std::path::PathBuf;
use tracing::debug;

/// Reads one variable of a NetCDF file through GDAL's `NETCDF:` subdataset
/// syntax. Every band is one step; scale, offset and no-data are applied.
pub struct NcReader {
    pub file_name: PathBuf,
    pub variable: String,
}

impl NcReader {
    fn error(&self, message: impl std::fmt::Display) -> ReadError {
        ReadError::NetCDF {
            path: self.file_name.clone(),
            message: message.to_string(),
        }
    }
}

impl DataReader for NcReader {
    fn read_data(&self) -> Result<GridField, ReadError> {
        let subdataset = format!("NETCDF:\"{}\":{}", self.file_name.display(), self.variable);
        let dataset = Dataset::open(&subdataset).map_err(|e| self.error(e))?;

        let (width, height) = dataset.raster_size();
        let bands = dataset.raster_count();
        let geo_transform = dataset.geo_transform().map_err(|e| self.error(e))?;

        let mut buffer = Vec::with_capacity(bands * width * height);
        let mut time = Vec::with_capacity(bands);
        let mut units = String::new();
        let mut fill_value = None;

        for index in 1..=bands {
            let band = dataset.rasterband(index).map_err(|e| self.error(e))?;
            let data = band
                .read_as::<f64>((0, 0), (width, height), (width, height), None)
                .map_err(|e| self.error(e))?;

            let no_data = band.no_data_value();
            let scale = band.scale().unwrap_or(1.0);
            let offset = band.offset().unwrap_or(0.0);
            buffer.extend(data.data().iter().map(|&v| {
                if no_data.is_some_and(|nd| v == nd) {
                    f64::NAN
                } else {
                    v * scale + offset
                }
            }));

            if let Some(t) = band
                .metadata_item("NETCDF_DIM_time", "")
                .and_then(|t| t.parse::<f64>().ok())
            {
                time.push(t);
            }
            if index == 1 {
                units = band.unit();
                fill_value = no_data;
            }
        }

        let values = Array3::from_shape_vec((bands, height, width), buffer).map_err(|e| self.error(e))?;
        if time.len() != bands {
            time.clear();
        }

        let metadata = FieldMetadata {
            variable_name: self.variable.clone(),
            units,
            // No-data cells were turned into NaN above.
            fill_value: fill_value.map(|_| crate::grid::DEFAULT_FILL_VALUE),
            time,
            lat: (0..height)
                .map(|y| geo_transform[3] + (y as f64 + 0.5) * geo_transform[5])
                .collect(),
            lon: (0..width)
                .map(|x| geo_transform[0] + (x as f64 + 0.5) * geo_transform[1])
                .collect(),
            attributes: Default::default(),
        };

        debug!(
            file = %self.file_name.display(),
            variable = self.variable.as_str(),
            steps = bands,
            "read NetCDF variable"
        );
        Ok(metadata.into_field(values)?)
    }
}
