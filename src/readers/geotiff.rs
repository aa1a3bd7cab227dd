use super::{DataReader, FieldMetadata, ReadError};
use crate::grid::GridField;
use ndarray::Array3;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

/// GeoTIFF tag holding the pixel size.
pub const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
/// GeoTIFF tag tying a raster point to a model coordinate.
pub const MODEL_TIEPOINT_TAG: u16 = 33922;

/// Reads a multi-page TIFF with one page per step.
///
/// Rows are latitudes and columns longitudes. Metadata comes from the JSON
/// description of the first page when present; otherwise the variable is
/// named after the file and coordinates come from the GeoTIFF georeferencing
/// tags, assuming a north-up grid.
pub struct GeoTiffReader {
    pub file_name: PathBuf,
}

impl GeoTiffReader {
    fn error(&self, message: impl std::fmt::Display) -> ReadError {
        ReadError::GeoTiff {
            path: self.file_name.clone(),
            message: message.to_string(),
        }
    }
}

impl DataReader for GeoTiffReader {
    fn read_data(&self) -> Result<GridField, ReadError> {
        let file = File::open(&self.file_name).map_err(|source| ReadError::Io {
            path: self.file_name.clone(),
            source,
        })?;

        let reader = BufReader::new(file);

        let mut decoder = Decoder::new(reader).map_err(|e| self.error(format!("failed to decode TIFF: {e}")))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| self.error(format!("failed to get dimensions: {e}")))?;

        let description = decoder.get_tag_ascii_string(Tag::ImageDescription).ok();
        let pixel_scale = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE_TAG)).ok();
        let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT_TAG)).ok();

        let mut buffer: Vec<f64> = Vec::new();
        let mut pages = 0usize;
        loop {
            if decoder
                .dimensions()
                .map_err(|e| self.error(format!("failed to get dimensions: {e}")))?
                != (width, height)
            {
                return Err(self.error(format!("page {pages} differs in size from the first page")));
            }

            let page = decoder
                .read_image()
                .map_err(|e| self.error(format!("failed to read page {pages}: {e}")))?;
            buffer.extend(page_values(page).ok_or_else(|| self.error("unsupported pixel format"))?);
            pages += 1;

            if !decoder.more_images() {
                break;
            }
            decoder
                .next_image()
                .map_err(|e| self.error(format!("failed to seek to page {pages}: {e}")))?;
        }

        let values = Array3::from_shape_vec((pages, height as usize, width as usize), buffer)
            .map_err(|e| self.error(e))?;

        let metadata = match description.filter(|d| d.trim_start().starts_with('{')) {
            Some(json) => serde_json::from_str::<FieldMetadata>(&json).map_err(|source| ReadError::Metadata {
                path: self.file_name.clone(),
                source,
            })?,
            None => FieldMetadata {
                variable_name: file_stem(&self.file_name),
                lat: georeferenced_axis(&pixel_scale, &tiepoint, height as usize, Axis::Lat),
                lon: georeferenced_axis(&pixel_scale, &tiepoint, width as usize, Axis::Lon),
                ..FieldMetadata::default()
            },
        };

        debug!(
            file = %self.file_name.display(),
            variable = metadata.variable_name.as_str(),
            steps = pages,
            lat = height,
            lon = width,
            "read GeoTIFF"
        );
        Ok(metadata.into_field(values)?)
    }
}

fn page_values(page: DecodingResult) -> Option<Vec<f64>> {
    let values = match page {
        DecodingResult::U8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F64(data) => data,
        _ => return None,
    };
    Some(values)
}

#[derive(Clone, Copy)]
enum Axis {
    Lat,
    Lon,
}

/// Cell-centre coordinates from ModelPixelScale and ModelTiepoint. Empty if
/// the tags are missing.
fn georeferenced_axis(scale: &Option<Vec<f64>>, tiepoint: &Option<Vec<f64>>, len: usize, axis: Axis) -> Vec<f64> {
    let (Some(scale), Some(tiepoint)) = (scale, tiepoint) else {
        return Vec::new();
    };
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Vec::new();
    }
    match axis {
        Axis::Lon => (0..len)
            .map(|i| tiepoint[3] + (i as f64 + 0.5) * scale[0])
            .collect(),
        Axis::Lat => (0..len)
            .map(|i| tiepoint[4] - (i as f64 + 0.5) * scale[1])
            .collect(),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufWriter;
    use tempfile::tempdir;
    use tiff::encoder::{TiffEncoder, colortype};

    #[test]
    fn test_plain_geotiff_uses_tags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cru_tmp.tif");
        {
            let file = BufWriter::new(File::create(&path).unwrap());
            let mut encoder = TiffEncoder::new(file).unwrap();
            for page in 0..2 {
                let mut image = encoder.new_image::<colortype::Gray32Float>(3, 2).unwrap();
                image
                    .encoder()
                    .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE_TAG), &[0.5f64, 0.5, 0.0][..])
                    .unwrap();
                image
                    .encoder()
                    .write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), &[0.0f64, 0.0, 0.0, 10.0, 50.0, 0.0][..])
                    .unwrap();
                let data: Vec<f32> = (0..6).map(|i| (page * 10 + i) as f32).collect();
                image.write_data(&data).unwrap();
            }
        }

        let field = GeoTiffReader { file_name: path }.read_data().unwrap();
        assert_eq!(field.variable_name(), "cru_tmp");
        assert_eq!(field.shape().steps, 2);
        assert_eq!(field.lon(), &[10.25, 10.75, 11.25]);
        assert_eq!(field.lat(), &[49.75, 49.25]);
        assert_eq!(field.values()[[1, 1, 2]], 15.0);
    }

    #[test]
    fn test_missing_file() {
        let reader = GeoTiffReader {
            file_name: PathBuf::from("/nonexistent/field.tif"),
        };
        assert!(matches!(reader.read_data(), Err(ReadError::Io { .. })));
    }
}
