//! Variables built from other variables with fixed physical formulas.
//!
//! Radiation follows a two-state mixing model: a cell with cloud fraction `c`
//! receives `c * overcast + (1 - c) * clear_sky`.

use ndarray::{Array3, Zip};
use tracing::{debug, warn};

use crate::grid::{FieldError, GridField, TimeSeries, Unit};

pub const PRECT: &str = "PRECT";
/// Downwelling solar flux at the surface.
pub const FSDS: &str = "FSDS";
/// Downwelling solar flux under a fully overcast sky.
pub const FSDSCL: &str = "FSDSCL";

/// Elementwise sum of convective and large-scale precipitation, optionally
/// multiplied by `unit_factor` afterwards.
pub fn sum_precip_components(
    convective: &TimeSeries,
    large_scale: &TimeSeries,
    unit_factor: Option<f64>,
) -> Result<TimeSeries, FieldError> {
    let (c, l) = (convective.field(), large_scale.field());
    c.ensure_same_shape(l)?;
    if c.units() != l.units() {
        return Err(FieldError::UnsupportedUnits {
            variable: l.variable_name().to_string(),
            units: l.units().to_string(),
            expected: "the same unit as the convective component",
        });
    }

    let factor = unit_factor.unwrap_or(1.0);
    let fill = c.output_fill_value();
    let mut masked = 0usize;
    let mut sum = Array3::<f64>::zeros(c.values().raw_dim());
    Zip::from(&mut sum)
        .and(c.values())
        .and(l.values())
        .for_each(|s, &a, &b| {
            if c.is_missing(a) || l.is_missing(b) {
                masked += 1;
                *s = fill;
            } else {
                *s = (a + b) * factor;
            }
        });

    report_masked(PRECT, masked);
    debug!(factor, "summed precipitation components");
    TimeSeries::new(c.derive(PRECT, c.units(), sum, c.time().to_vec()))
}

/// Radiation under a fully overcast sky, recovered from the actual and the
/// clear-sky radiation. Cells without clouds get the clear-sky value.
///
/// Computed as `(actual - (1 - c) * clear_sky) / c`, the exact inverse of
/// [`compose_actual_radiation`]. This is not the literal
/// `FSDS - FSDSC * (1 - CLDTOT) / CLDTOT` of the TraCE preprocessing
/// scripts, which does not give `actual` back when mixed again.
pub fn reconstruct_overcast_radiation(
    actual: &TimeSeries,
    clear_sky: &TimeSeries,
    cloud_fraction: &TimeSeries,
) -> Result<TimeSeries, FieldError> {
    let (a, clear, cloud) = (actual.field(), clear_sky.field(), cloud_fraction.field());
    ensure_radiation_inputs(a, clear, cloud)?;
    let scale = fraction_scale(cloud)?;

    let fill = a.output_fill_value();
    let mut masked = 0usize;
    let mut overcast = Array3::<f64>::zeros(a.values().raw_dim());
    Zip::from(&mut overcast)
        .and(a.values())
        .and(clear.values())
        .and(cloud.values())
        .for_each(|o, &act, &clr, &c| {
            if a.is_missing(act) || clear.is_missing(clr) || cloud.is_missing(c) {
                masked += 1;
                *o = fill;
                return;
            }
            let c = (c * scale).clamp(0.0, 1.0);
            *o = if c <= 0.0 {
                clr
            } else {
                (act - (1.0 - c) * clr) / c
            };
        });

    report_masked(FSDSCL, masked);
    TimeSeries::new(a.derive(FSDSCL, a.units(), overcast, a.time().to_vec()))
}

/// Actual radiation as the cloud-weighted mix of clear-sky and overcast
/// radiation.
pub fn compose_actual_radiation(
    clear_sky: &TimeSeries,
    overcast: &TimeSeries,
    cloud_fraction: &TimeSeries,
) -> Result<TimeSeries, FieldError> {
    let (clear, over, cloud) = (clear_sky.field(), overcast.field(), cloud_fraction.field());
    ensure_radiation_inputs(clear, over, cloud)?;
    let scale = fraction_scale(cloud)?;

    let fill = clear.output_fill_value();
    let mut masked = 0usize;
    let mut actual = Array3::<f64>::zeros(clear.values().raw_dim());
    Zip::from(&mut actual)
        .and(clear.values())
        .and(over.values())
        .and(cloud.values())
        .for_each(|a, &clr, &ovc, &c| {
            if clear.is_missing(clr) || over.is_missing(ovc) || cloud.is_missing(c) {
                masked += 1;
                *a = fill;
                return;
            }
            let c = (c * scale).clamp(0.0, 1.0);
            *a = c * ovc + (1.0 - c) * clr;
        });

    report_masked(FSDS, masked);
    TimeSeries::new(clear.derive(FSDS, clear.units(), actual, clear.time().to_vec()))
}

fn ensure_radiation_inputs(
    first: &GridField,
    second: &GridField,
    cloud: &GridField,
) -> Result<(), FieldError> {
    first.ensure_same_shape(second)?;
    first.ensure_same_shape(cloud)?;
    if first.units() != second.units() {
        return Err(FieldError::UnsupportedUnits {
            variable: second.variable_name().to_string(),
            units: second.units().to_string(),
            expected: "the same radiation unit as the other input",
        });
    }
    Ok(())
}

/// Factor turning the cloud cover of `cloud` into a fraction.
fn fraction_scale(cloud: &GridField) -> Result<f64, FieldError> {
    match cloud.unit() {
        Unit::Fraction => Ok(1.0),
        Unit::Percent => Ok(0.01),
        _ => Err(FieldError::UnsupportedUnits {
            variable: cloud.variable_name().to_string(),
            units: cloud.units().to_string(),
            expected: "a cloud fraction",
        }),
    }
}

fn report_masked(variable: &str, masked: usize) {
    if masked > 0 {
        warn!(variable, masked, "missing input cells, written as fill value");
    }
}
