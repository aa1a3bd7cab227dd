//! Number of wet days per month from monthly precipitation totals.
//!
//! Daily precipitation within a month is modelled as gamma distributed, with
//! the month's mean daily precipitation as mean and the observed day-to-day
//! standard deviation of that calendar month as standard deviation. A day is
//! wet when it exceeds the threshold.

use ndarray::{Array3, Axis, Zip};
use tracing::{debug, warn};

pub mod gamma;

pub use gamma::{GAMMA_EPSILON, NORMAL_APPROX_SHAPE, dry_day_probability};

use crate::grid::calendar::{days_in_month, month_of_step};
use crate::grid::{FieldError, StdDevClimatology, TimeSeries, WetDayField};

/// Default wet-day threshold [mm/day].
pub const DEFAULT_WET_THRESHOLD: f64 = 0.1;

/// Subtracted before rounding up so that values a rounding error above an
/// integer do not gain a day.
pub const CEIL_TOLERANCE: f64 = 1e-9;

/// Turns the probability of a dry day into a whole number of wet days in a
/// month of `days` days. Non-finite probabilities give zero.
pub fn wet_day_count(dry_probability: f64, days: u32) -> i32 {
    let wet = ((1.0 - dry_probability) * days as f64 - CEIL_TOLERANCE).ceil();
    if wet.is_finite() {
        wet.clamp(0.0, days as f64) as i32
    } else {
        0
    }
}

/// Estimates the wet days of every step of `precip`.
///
/// `precip` may be given as monthly totals, daily rates or a flux; it is
/// converted to mm/month with the true length of each month. Cells where
/// precipitation or standard deviation are missing get
/// [`WetDayField::FILL_VALUE`].
pub fn estimate_wet_days(
    precip: &TimeSeries,
    std: &StdDevClimatology,
    wet_threshold_mm_per_day: f64,
) -> Result<WetDayField, FieldError> {
    let precip_field = precip.field();
    let std_field = std.field();
    precip_field.ensure_same_grid(std_field)?;

    let unit = precip_field.unit();
    if unit.mm_per_month_factor(0).is_none() {
        return Err(FieldError::UnsupportedUnits {
            variable: precip_field.variable_name().to_string(),
            units: precip_field.units().to_string(),
            expected: "a precipitation flux or amount",
        });
    }

    let shape = precip_field.shape();
    let mut wet = Array3::<i32>::from_elem((shape.steps, shape.lat, shape.lon), WetDayField::FILL_VALUE);
    let mut masked = 0usize;

    for (t, mut slab) in wet.axis_iter_mut(Axis(0)).enumerate() {
        let month = month_of_step(t);
        let days = days_in_month(month);
        let Some(to_mm) = unit.mm_per_month_factor(month) else {
            continue;
        };

        Zip::from(&mut slab)
            .and(&precip_field.step(t))
            .and(&std_field.step(month))
            .for_each(|w, &p, &s| {
                if precip_field.is_missing(p) || std_field.is_missing(s) {
                    masked += 1;
                    return;
                }
                let mean_daily = p * to_mm / days as f64;
                let dry = dry_day_probability(wet_threshold_mm_per_day, mean_daily, s);
                *w = wet_day_count(dry, days);
            });
    }

    if masked > 0 {
        warn!(
            variable = precip_field.variable_name(),
            masked, "no wet days for cells with missing input, written as fill value"
        );
    }
    debug!(
        variable = precip_field.variable_name(),
        threshold = wet_threshold_mm_per_day,
        steps = shape.steps,
        "estimated wet days"
    );

    Ok(WetDayField::new(wet, precip_field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridField, GridShape};

    fn std_climatology(value: f64, lat: usize, lon: usize) -> StdDevClimatology {
        StdDevClimatology::new(GridField::filled(
            "prec_std",
            "mm/day",
            GridShape { steps: 12, lat, lon },
            value,
        ))
        .unwrap()
    }

    #[test]
    fn test_wet_day_count_rounding() {
        assert_eq!(wet_day_count(0.5, 30), 15);
        assert_eq!(wet_day_count(0.49, 30), 16);
        assert_eq!(wet_day_count(0.0, 28), 28);
        assert_eq!(wet_day_count(1.0, 31), 0);
        assert_eq!(wet_day_count(-0.5, 31), 31);
        assert_eq!(wet_day_count(f64::NAN, 31), 0);
    }

    #[test]
    fn test_wet_days_within_month_length() {
        let values = Array3::from_shape_fn((24, 2, 3), |(t, y, x)| {
            (t as f64 * 13.0 + y as f64 * 40.0 + x as f64 * 90.0) % 400.0
        });
        let precip = TimeSeries::new(GridField::new("PRECT", "mm/month", values)).unwrap();
        let wet = estimate_wet_days(&precip, &std_climatology(3.0, 2, 3), DEFAULT_WET_THRESHOLD).unwrap();

        assert_eq!(wet.shape(), precip.field().shape());
        for ((t, _, _), &w) in wet.values().indexed_iter() {
            assert!(w >= 0 && w <= days_in_month(month_of_step(t)) as i32);
        }
    }

    #[test]
    fn test_more_rain_never_fewer_wet_days() {
        let totals: Vec<f64> = (0..60).map(|i| i as f64 * 5.0).collect();
        let values = Array3::from_shape_fn((12, 1, totals.len()), |(_, _, x)| totals[x]);
        let precip = TimeSeries::new(GridField::new("PRECT", "mm/month", values)).unwrap();
        let wet = estimate_wet_days(&precip, &std_climatology(4.0, 1, totals.len()), 0.1).unwrap();

        for t in 0..12 {
            let row = wet.values().index_axis(Axis(0), t);
            for x in 1..totals.len() {
                assert!(row[[0, x]] >= row[[0, x - 1]], "month {t}, cell {x}");
            }
        }
    }

    #[test]
    fn test_dry_cells_have_no_wet_days() {
        let precip = TimeSeries::new(GridField::filled(
            "PRECT",
            "mm/month",
            GridShape { steps: 12, lat: 1, lon: 1 },
            0.0,
        ))
        .unwrap();
        let wet = estimate_wet_days(&precip, &std_climatology(0.0, 1, 1), 0.1).unwrap();
        assert!(wet.values().iter().all(|&w| w == 0));
    }

    #[test]
    fn test_flux_input_matches_monthly_totals() {
        let january_total = 93.0;
        let flux = january_total / (31.0 * 86_400.0);
        let in_mm = TimeSeries::new(GridField::filled(
            "PRECT",
            "mm/month",
            GridShape { steps: 12, lat: 1, lon: 1 },
            january_total,
        ))
        .unwrap();
        let as_flux = TimeSeries::new(GridField::filled(
            "PRECT",
            "kg m-2 s-1",
            GridShape { steps: 12, lat: 1, lon: 1 },
            flux,
        ))
        .unwrap();
        let std = std_climatology(5.0, 1, 1);

        let a = estimate_wet_days(&in_mm, &std, 0.1).unwrap();
        let b = estimate_wet_days(&as_flux, &std, 0.1).unwrap();
        assert_eq!(a.values()[[0, 0, 0]], b.values()[[0, 0, 0]]);
    }

    #[test]
    fn test_missing_precipitation_is_fill() {
        let mut values = Array3::from_elem((12, 1, 2), 60.0);
        values[[2, 0, 0]] = f64::NAN;
        let precip = TimeSeries::new(GridField::new("PRECT", "mm/month", values)).unwrap();
        let wet = estimate_wet_days(&precip, &std_climatology(2.0, 1, 2), 0.1).unwrap();
        assert_eq!(wet.values()[[2, 0, 0]], WetDayField::FILL_VALUE);
        assert!(wet.values()[[2, 0, 1]] > 0);
    }

    #[test]
    fn test_grid_mismatch() {
        let precip = TimeSeries::new(GridField::filled(
            "PRECT",
            "mm/month",
            GridShape { steps: 12, lat: 2, lon: 2 },
            10.0,
        ))
        .unwrap();
        assert!(matches!(
            estimate_wet_days(&precip, &std_climatology(1.0, 3, 2), 0.1),
            Err(FieldError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_temperature_is_rejected() {
        let temp = TimeSeries::new(GridField::filled(
            "TREFHT",
            "K",
            GridShape { steps: 12, lat: 1, lon: 1 },
            280.0,
        ))
        .unwrap();
        assert!(matches!(
            estimate_wet_days(&temp, &std_climatology(1.0, 1, 1), 0.1),
            Err(FieldError::UnsupportedUnits { .. })
        ));
    }
}
