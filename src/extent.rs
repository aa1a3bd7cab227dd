use std::cmp::Ordering;

use thiserror::Error;
use tracing::debug;

use crate::grid::GridField;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtentError {
    #[error("longitude {which} is out of range [0, 360]: {value}")]
    LongitudeOutOfRange { which: u8, value: f64 },

    #[error("latitude {which} is out of range [-90, 90]: {value}")]
    LatitudeOutOfRange { which: u8, value: f64 },

    #[error("longitude values are equal: {0}")]
    EqualLongitudes(f64),

    #[error("latitude 1 must be lower than latitude 2: {0} >= {1}")]
    LatitudeOrder(f64, f64),

    #[error("longitude {0} is outside any supported convention")]
    UnsupportedLongitude(f64),

    #[error("'{0}' has no coordinates to crop with")]
    MissingCoordinates(String),

    #[error("region {0} does not contain any grid cell of '{1}'")]
    EmptySelection(Extent, String),
}

/// Rectangular region `[lon1, lon2, lat1, lat2]` with longitude in
/// [0, 360] °E and latitude in [-90, 90] °N. `lon1 > lon2` wraps around 0°.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub lon1: f64,
    pub lon2: f64,
    pub lat1: f64,
    pub lat2: f64,
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.lon1, self.lon2, self.lat1, self.lat2)
    }
}

impl Extent {
    pub fn new(lon1: f64, lon2: f64, lat1: f64, lat2: f64) -> Result<Self, ExtentError> {
        for (which, value) in [(1, lon1), (2, lon2)] {
            if !(0.0..=360.0).contains(&value) {
                return Err(ExtentError::LongitudeOutOfRange { which, value });
            }
        }
        if lon1 == lon2 {
            return Err(ExtentError::EqualLongitudes(lon1));
        }
        for (which, value) in [(1, lat1), (2, lat2)] {
            if !(-90.0..=90.0).contains(&value) {
                return Err(ExtentError::LatitudeOutOfRange { which, value });
            }
        }
        if lat1 >= lat2 {
            return Err(ExtentError::LatitudeOrder(lat1, lat2));
        }
        Ok(Self { lon1, lon2, lat1, lat2 })
    }

    pub fn from_array(region: [f64; 4]) -> Result<Self, ExtentError> {
        Self::new(region[0], region[1], region[2], region[3])
    }

    /// Grow the region by `margin` degrees in all four directions.
    ///
    /// Latitude stops at the poles. Longitude wraps around 0°, and a region
    /// whose ends meet after growing covers the whole globe.
    pub fn expand(&self, margin: f64) -> Self {
        let Self { lon1, lon2, lat1, lat2 } = *self;
        let west = lon1 - margin;
        let east = lon2 + margin;

        let closes_around_globe = (lon1 > lon2 && west < east)
            || (lon1 < lon2 && east >= 360.0 && west < east.rem_euclid(360.0))
            || (lon1 < lon2 && west <= 0.0 && east > west.rem_euclid(360.0));

        let (lon1, lon2) = if closes_around_globe {
            (0.0, 360.0)
        } else {
            (west.rem_euclid(360.0), east.rem_euclid(360.0))
        };

        Self {
            lon1,
            lon2,
            lat1: (lat1 - margin).max(-90.0),
            lat2: (lat2 + margin).min(90.0),
        }
    }

    pub fn wraps(&self) -> bool {
        self.lon1 > self.lon2
    }

    pub fn covers_globe(&self) -> bool {
        self.lon2 - self.lon1 >= 360.0
    }

    /// Western and eastern edge in the convention of the longitude `axis`.
    /// The edges may come out in wrapping order.
    fn edges_on_axis(&self, axis: &[f64]) -> Result<(f64, f64), ExtentError> {
        Ok((
            adjust_longitude(self.lon1.rem_euclid(360.0), axis)?,
            adjust_longitude(self.lon2.rem_euclid(360.0), axis)?,
        ))
    }
}

/// Convert `lon` to the convention of a longitude axis: [-180, 180) or
/// [0, 360).
pub fn adjust_longitude(lon: f64, axis: &[f64]) -> Result<f64, ExtentError> {
    if !(-180.0..360.0).contains(&lon) {
        return Err(ExtentError::UnsupportedLongitude(lon));
    }
    let min = axis.iter().copied().fold(f64::INFINITY, f64::min);
    let max = axis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min < 0.0 && lon > 180.0 {
        Ok(lon - 360.0)
    } else if max > 180.0 && lon < 0.0 {
        Ok(lon + 360.0)
    } else {
        Ok(lon)
    }
}

/// Cut `field` down to the cells inside `extent`. The edges of `extent` are
/// first moved to the longitude convention of the field.
///
/// The result has longitudes in [0, 360) °E in ascending order, whatever the
/// convention of the input.
pub fn crop(field: &GridField, extent: &Extent) -> Result<GridField, ExtentError> {
    if field.lat().is_empty() || field.lon().is_empty() {
        return Err(ExtentError::MissingCoordinates(field.variable_name().to_string()));
    }

    let lat_indices: Vec<usize> = field
        .lat()
        .iter()
        .enumerate()
        .filter(|(_, y)| (extent.lat1..=extent.lat2).contains(*y))
        .map(|(i, _)| i)
        .collect();

    let (west, east) = extent.edges_on_axis(field.lon())?;
    let inside = |x: f64| {
        if extent.covers_globe() {
            true
        } else if west <= east {
            (west..=east).contains(&x)
        } else {
            x >= west || x <= east
        }
    };

    let mut lon_indices: Vec<(usize, f64)> = field
        .lon()
        .iter()
        .enumerate()
        .filter(|&(_, &x)| inside(x))
        .map(|(i, &x)| (i, x.rem_euclid(360.0)))
        .collect();
    lon_indices.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    if lat_indices.is_empty() || lon_indices.is_empty() {
        return Err(ExtentError::EmptySelection(*extent, field.variable_name().to_string()));
    }

    let lon_order: Vec<usize> = lon_indices.iter().map(|&(i, _)| i).collect();
    let cropped = field.select_cells(&lat_indices, &lon_order);
    let lon: Vec<f64> = lon_indices.iter().map(|&(_, x)| x).collect();

    debug!(
        variable = field.variable_name(),
        region = %extent,
        lat = lat_indices.len(),
        lon = lon.len(),
        "cropped field"
    );
    Ok(cropped.with_longitudes(lon))
}
