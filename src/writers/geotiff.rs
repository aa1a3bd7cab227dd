use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{Compression, DeflateLevel, TiffEncoder, colortype};
use tiff::tags::Tag;
use tracing::info;

use super::{WriteError, write_atomically};
use crate::grid::GridField;
use crate::readers::FieldMetadata;

/// Writes a field as a multi-page 64-bit float TIFF, one page per step, with
/// the field metadata as JSON in the description of the first page.
#[derive(Debug, Clone, Copy)]
pub struct GeoTiffWriter {
    compression_level: u8,
}

impl GeoTiffWriter {
    /// `compression_level` follows the usual deflate scale from 0 (off) to 9.
    pub fn new(compression_level: u8) -> Self {
        Self {
            compression_level: compression_level.min(9),
        }
    }

    fn compression(&self) -> Compression {
        match self.compression_level {
            0 => Compression::Uncompressed,
            1..=3 => Compression::Deflate(DeflateLevel::Fast),
            4..=6 => Compression::Deflate(DeflateLevel::Balanced),
            _ => Compression::Deflate(DeflateLevel::Best),
        }
    }

    pub fn write(&self, field: &GridField, path: &Path) -> Result<(), WriteError> {
        let description =
            serde_json::to_string(&FieldMetadata::of(field)).map_err(|source| WriteError::Metadata {
                variable: field.variable_name().to_string(),
                source,
            })?;
        let tiff_error = |e: tiff::TiffError| WriteError::GeoTiff {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let shape = field.shape();
        write_atomically(path, |partial| {
            let file = File::create(partial).map_err(|source| WriteError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let mut encoder = TiffEncoder::new(BufWriter::new(file))
                .map_err(tiff_error)?
                .with_compression(self.compression());

            for (step, page) in field.values().outer_iter().enumerate() {
                let mut image = encoder
                    .new_image::<colortype::Gray64Float>(shape.lon as u32, shape.lat as u32)
                    .map_err(tiff_error)?;
                if step == 0 {
                    image
                        .encoder()
                        .write_tag(Tag::ImageDescription, description.as_str())
                        .map_err(tiff_error)?;
                }
                let data: Vec<f64> = page.iter().copied().collect();
                image.write_data(&data).map_err(tiff_error)?;
            }
            Ok(())
        })?;

        info!(
            path = %path.display(),
            variable = field.variable_name(),
            steps = shape.steps,
            "wrote GeoTIFF"
        );
        Ok(())
    }
}
