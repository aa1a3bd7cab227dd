//! Gridded fields over `(step, lat, lon)` and the typed wrappers the bias
//! correction works on.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array3, ArrayView2, Axis};

pub mod calendar;
pub mod error;
pub mod types;
pub mod units;

pub use error::FieldError;
pub use types::{BiasField, MonthlyClimatology, StdDevClimatology, TimeSeries, WetDayField};
pub use units::Unit;

/// Sentinel written into cells that could not be computed.
pub const DEFAULT_FILL_VALUE: f64 = -9999.0;

const COORDINATE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub steps: usize,
    pub lat: usize,
    pub lon: usize,
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} x {} x {}]", self.steps, self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridField {
    variable_name: String,
    units: String,
    fill_value: Option<f64>,
    values: Array3<f64>,
    time: Vec<f64>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    attributes: BTreeMap<String, String>,
}

impl GridField {
    pub fn new(variable_name: &str, units: &str, values: Array3<f64>) -> Self {
        Self {
            variable_name: variable_name.to_string(),
            units: units.to_string(),
            fill_value: None,
            values,
            time: Vec::new(),
            lat: Vec::new(),
            lon: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Field of `shape` with every cell set to `value`.
    pub fn filled(variable_name: &str, units: &str, shape: GridShape, value: f64) -> Self {
        Self::new(
            variable_name,
            units,
            Array3::from_elem((shape.steps, shape.lat, shape.lon), value),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        variable_name: &str,
        units: &str,
        fill_value: Option<f64>,
        values: Array3<f64>,
        time: Vec<f64>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        attributes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            variable_name: variable_name.to_string(),
            units: units.to_string(),
            fill_value,
            values,
            time,
            lat,
            lon,
            attributes,
        }
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = Some(fill_value);
        self
    }

    pub fn with_coordinates(
        mut self,
        time: Vec<f64>,
        lat: Vec<f64>,
        lon: Vec<f64>,
    ) -> Result<Self, FieldError> {
        let shape = self.shape();
        if (!time.is_empty() && time.len() != shape.steps)
            || (!lat.is_empty() && lat.len() != shape.lat)
            || (!lon.is_empty() && lon.len() != shape.lon)
        {
            return Err(FieldError::InvalidShape(format!(
                "coordinates ({}, {}, {}) do not fit '{}' {}",
                time.len(),
                lat.len(),
                lon.len(),
                self.variable_name,
                shape
            )));
        }
        self.time = time;
        self.lat = lat;
        self.lon = lon;
        Ok(self)
    }

    /// Copy NetCDF-style attributes onto the field. A `units` attribute also
    /// replaces the field's units.
    pub fn with_attributes(mut self, attributes: &BTreeMap<String, String>) -> Self {
        for (key, value) in attributes {
            if key == "units" {
                self.units = value.clone();
            }
            self.attributes.insert(key.clone(), value.clone());
        }
        self
    }

    /// Replace the longitude values, keeping their count.
    pub(crate) fn with_longitudes(mut self, lon: Vec<f64>) -> Self {
        debug_assert_eq!(lon.len(), self.shape().lon);
        self.lon = lon;
        self
    }

    pub fn variable_name(&self) -> &str {
        &self.variable_name
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn unit(&self) -> Unit {
        Unit::parse(&self.units)
    }

    pub fn fill_value(&self) -> Option<f64> {
        self.fill_value
    }

    /// Fill value to use for cells derived from this field.
    pub fn output_fill_value(&self) -> f64 {
        self.fill_value.unwrap_or(DEFAULT_FILL_VALUE)
    }

    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    pub fn step(&self, index: usize) -> ArrayView2<'_, f64> {
        self.values.index_axis(Axis(0), index)
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn shape(&self) -> GridShape {
        let (steps, lat, lon) = self.values.dim();
        GridShape { steps, lat, lon }
    }

    pub fn is_missing(&self, value: f64) -> bool {
        !value.is_finite() || self.fill_value.is_some_and(|fill| value == fill)
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|&&v| self.is_missing(v)).count()
    }

    /// New field with the same metadata as `self` but different values and
    /// time axis. The spatial grid stays the same.
    pub fn derive(&self, variable_name: &str, units: &str, values: Array3<f64>, time: Vec<f64>) -> Self {
        Self {
            variable_name: variable_name.to_string(),
            units: units.to_string(),
            fill_value: Some(self.output_fill_value()),
            values,
            time,
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            attributes: self.attributes.clone(),
        }
    }

    /// Checks that `other` lives on the same horizontal grid.
    pub fn ensure_same_grid(&self, other: &GridField) -> Result<(), FieldError> {
        let (a, b) = (self.shape(), other.shape());
        let mismatch = |reason: &str| FieldError::GridMismatch {
            left: self.variable_name.clone(),
            left_shape: a,
            right: other.variable_name.clone(),
            right_shape: b,
            reason: reason.to_string(),
        };

        if a.lat != b.lat || a.lon != b.lon {
            return Err(mismatch("different number of grid cells"));
        }
        if !coordinates_match(&self.lat, &other.lat) {
            return Err(mismatch("latitude coordinates differ"));
        }
        if !coordinates_match(&self.lon, &other.lon) {
            return Err(mismatch("longitude coordinates differ"));
        }
        Ok(())
    }

    /// Like [`GridField::ensure_same_grid`] but the step count must match too.
    pub fn ensure_same_shape(&self, other: &GridField) -> Result<(), FieldError> {
        self.ensure_same_grid(other)?;
        if self.shape().steps != other.shape().steps {
            return Err(FieldError::GridMismatch {
                left: self.variable_name.clone(),
                left_shape: self.shape(),
                right: other.variable_name.clone(),
                right_shape: other.shape(),
                reason: "different number of time steps".to_string(),
            });
        }
        Ok(())
    }

    /// Keep only the steps in `range`.
    pub fn slice_steps(&self, range: std::ops::Range<usize>) -> Self {
        let values = self
            .values
            .slice(ndarray::s![range.clone(), .., ..])
            .to_owned();
        let time = if self.time.is_empty() {
            Vec::new()
        } else {
            self.time[range].to_vec()
        };
        Self {
            values,
            time,
            ..self.clone()
        }
    }

    /// Keep only the cells with the given latitude and longitude indices, in
    /// that order.
    pub fn select_cells(&self, lat_indices: &[usize], lon_indices: &[usize]) -> Self {
        let values = self
            .values
            .select(Axis(1), lat_indices)
            .select(Axis(2), lon_indices);
        let pick = |coords: &[f64], indices: &[usize]| -> Vec<f64> {
            if coords.is_empty() {
                Vec::new()
            } else {
                indices.iter().map(|&i| coords[i]).collect()
            }
        };
        Self {
            values,
            lat: pick(&self.lat, lat_indices),
            lon: pick(&self.lon, lon_indices),
            ..self.clone()
        }
    }
}

fn coordinates_match(a: &[f64], b: &[f64]) -> bool {
    if a.is_empty() || b.is_empty() {
        return true;
    }
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= COORDINATE_TOLERANCE)
}
