use std::collections::BTreeMap;

use ndarray::Array3;

use super::calendar::MONTHS_PER_YEAR;
use super::{FieldError, GridField, GridShape};
use crate::bias::CorrectionKind;

/// A field with exactly one step per calendar month, January first.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyClimatology(GridField);

impl MonthlyClimatology {
    pub fn new(field: GridField) -> Result<Self, FieldError> {
        let steps = field.shape().steps;
        if steps != MONTHS_PER_YEAR {
            return Err(FieldError::NotAClimatology {
                variable: field.variable_name().to_string(),
                steps,
            });
        }
        Ok(Self(field))
    }

    pub fn field(&self) -> &GridField {
        &self.0
    }

    pub fn into_field(self) -> GridField {
        self.0
    }

    /// Repeat the climatology `years` times into a monthly time series.
    pub fn tile(&self, years: usize) -> TimeSeries {
        let shape = self.0.shape();
        let values = Array3::from_shape_fn((years * MONTHS_PER_YEAR, shape.lat, shape.lon), |(t, y, x)| {
            self.0.values()[[t % MONTHS_PER_YEAR, y, x]]
        });
        let time = (0..years * MONTHS_PER_YEAR).map(|t| t as f64).collect();
        TimeSeries(
            self.0
                .derive(self.0.variable_name(), self.0.units(), values, time),
        )
    }
}

/// Whole years of monthly data in chronological order. Step 0 is January.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries(GridField);

impl TimeSeries {
    pub fn new(field: GridField) -> Result<Self, FieldError> {
        let steps = field.shape().steps;
        if steps % MONTHS_PER_YEAR != 0 {
            return Err(FieldError::IncompleteYear {
                variable: field.variable_name().to_string(),
                steps,
            });
        }
        Ok(Self(field))
    }

    pub fn field(&self) -> &GridField {
        &self.0
    }

    pub fn into_field(self) -> GridField {
        self.0
    }

    pub fn years(&self) -> usize {
        self.0.shape().steps / MONTHS_PER_YEAR
    }
}

/// Monthly bias together with the operator needed to remove it again.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasField {
    climatology: MonthlyClimatology,
    kind: CorrectionKind,
}

impl BiasField {
    pub fn new(climatology: MonthlyClimatology, kind: CorrectionKind) -> Self {
        Self { climatology, kind }
    }

    pub fn kind(&self) -> CorrectionKind {
        self.kind
    }

    pub fn climatology(&self) -> &MonthlyClimatology {
        &self.climatology
    }

    pub fn field(&self) -> &GridField {
        self.climatology.field()
    }
}

/// Monthly climatology of the day-to-day standard deviation of
/// precipitation, in mm/day.
#[derive(Debug, Clone, PartialEq)]
pub struct StdDevClimatology(MonthlyClimatology);

impl StdDevClimatology {
    pub fn new(field: GridField) -> Result<Self, FieldError> {
        let climatology = MonthlyClimatology::new(field)?;
        let units = climatology.field().units();
        if !units.is_empty() && climatology.field().unit() != super::Unit::MmPerDay {
            return Err(FieldError::UnsupportedUnits {
                variable: climatology.field().variable_name().to_string(),
                units: units.to_string(),
                expected: "a daily precipitation standard deviation (mm/day)",
            });
        }
        Ok(Self(climatology))
    }

    pub fn field(&self) -> &GridField {
        self.0.field()
    }
}

/// Integer number of wet days per grid cell and month.
#[derive(Debug, Clone, PartialEq)]
pub struct WetDayField {
    values: Array3<i32>,
    time: Vec<f64>,
    lat: Vec<f64>,
    lon: Vec<f64>,
}

impl WetDayField {
    pub const VARIABLE_NAME: &'static str = "wet_days";

    pub const FILL_VALUE: i32 = -9999;

    pub(crate) fn new(values: Array3<i32>, template: &GridField) -> Self {
        Self {
            values,
            time: template.time().to_vec(),
            lat: template.lat().to_vec(),
            lon: template.lon().to_vec(),
        }
    }

    pub fn values(&self) -> &Array3<i32> {
        &self.values
    }

    pub fn shape(&self) -> GridShape {
        let (steps, lat, lon) = self.values.dim();
        GridShape { steps, lat, lon }
    }

    /// Float field on the same grid, fill cells kept as fill.
    pub fn to_field(&self) -> GridField {
        GridField::from_parts(
            Self::VARIABLE_NAME,
            "days",
            Some(Self::FILL_VALUE as f64),
            self.values.mapv(|v| v as f64),
            self.time.clone(),
            self.lat.clone(),
            self.lon.clone(),
            BTreeMap::new(),
        )
    }
}
