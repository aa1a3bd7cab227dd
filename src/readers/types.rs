use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::grid::{FieldError, GridField};

pub trait DataReader {
    fn read_data(&self) -> Result<GridField, ReadError>;
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("GeoTIFF error in '{path}': {message}")]
    GeoTiff { path: PathBuf, message: String },

    #[error("NetCDF error in '{path}': {message}")]
    NetCDF { path: PathBuf, message: String },

    #[error("invalid field metadata in '{path}': {source}")]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unknown file type: '{0}'")]
    UnknownFileType(PathBuf),

    #[error(transparent)]
    Field(#[from] FieldError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    GeoTiff,
    NetCDF,
}

/// Everything about a [`GridField`] except its values. Stored as JSON in
/// the description of the first page of the GeoTIFFs this crate writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldMetadata {
    pub variable_name: String,
    #[serde(default)]
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_value: Option<f64>,
    #[serde(default)]
    pub time: Vec<f64>,
    #[serde(default)]
    pub lat: Vec<f64>,
    #[serde(default)]
    pub lon: Vec<f64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl FieldMetadata {
    pub fn of(field: &GridField) -> Self {
        Self {
            variable_name: field.variable_name().to_string(),
            units: field.units().to_string(),
            fill_value: field.fill_value(),
            time: field.time().to_vec(),
            lat: field.lat().to_vec(),
            lon: field.lon().to_vec(),
            attributes: field.attributes().clone(),
        }
    }

    pub fn into_field(self, values: ndarray::Array3<f64>) -> Result<GridField, FieldError> {
        let mut field = GridField::new(&self.variable_name, &self.units, values)
            .with_coordinates(self.time, self.lat, self.lon)?
            .with_attributes(&self.attributes);
        if let Some(fill) = self.fill_value {
            field = field.with_fill_value(fill);
        }
        Ok(field)
    }
}
