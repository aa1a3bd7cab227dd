use ndarray::{Axis, Zip};
use tracing::{debug, warn};

use super::rules::CorrectionKind;
use crate::grid::calendar::month_of_step;
use crate::grid::{BiasField, FieldError, TimeSeries};

/// Removes a monthly bias from a whole-year monthly time series.
///
/// Step `i` of `raw` is corrected with month `i % 12` of `bias`, so `raw`
/// must start in January. The operator is the inverse of the one used to
/// compute the bias: correcting a climatology with its own bias against
/// itself returns it unchanged.
///
/// A multiplicative bias of exactly zero only arises where the simulated
/// climatology was zero; those cells stay zero.
///
/// A power bias relates fractions, so `raw` is taken to a fraction before
/// the exponent and back to its own unit afterwards.
///
/// # Errors
///
/// * [`FieldError::GridMismatch`] if the grids differ.
/// * [`FieldError::UnsupportedUnits`] for a power bias on values that are
///   neither a fraction nor a percentage.
pub fn apply_bias(raw: &TimeSeries, bias: &BiasField) -> Result<TimeSeries, FieldError> {
    let raw_field = raw.field();
    let bias_field = bias.field();
    raw_field.ensure_same_grid(bias_field)?;

    let fill = raw_field.output_fill_value();
    let kind = bias.kind();
    let to_fraction = match kind {
        CorrectionKind::Power => {
            raw_field
                .unit()
                .to_fraction(1.0)
                .ok_or_else(|| FieldError::UnsupportedUnits {
                    variable: raw_field.variable_name().to_string(),
                    units: raw_field.units().to_string(),
                    expected: "a cloud fraction",
                })?
        }
        _ => 1.0,
    };
    let mut masked = 0usize;
    let mut corrected = raw_field.values().clone();

    for (t, mut slab) in corrected.axis_iter_mut(Axis(0)).enumerate() {
        let month_bias = bias_field.step(month_of_step(t));
        Zip::from(&mut slab).and(&month_bias).for_each(|v, &b| {
            if raw_field.is_missing(*v) || bias_field.is_missing(b) {
                masked += 1;
                *v = fill;
                return;
            }
            let value = match kind {
                CorrectionKind::Additive => *v - b,
                CorrectionKind::Multiplicative if b == 0.0 => 0.0,
                CorrectionKind::Multiplicative => *v / b,
                CorrectionKind::Power => (*v * to_fraction).powf(1.0 / b) / to_fraction,
            };
            if value.is_finite() {
                *v = value;
            } else {
                masked += 1;
                *v = fill;
            }
        });
    }

    if masked > 0 {
        warn!(
            variable = raw_field.variable_name(),
            masked, "cells could not be corrected, written as fill value"
        );
    }
    debug!(
        variable = raw_field.variable_name(),
        years = raw.years(),
        kind = %kind,
        "applied monthly bias"
    );

    TimeSeries::new(raw_field.derive(
        raw_field.variable_name(),
        raw_field.units(),
        corrected,
        raw_field.time().to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::{BiasCalculator, BiasRules};
    use crate::grid::{GridField, GridShape, MonthlyClimatology};
    use approx::assert_relative_eq;
    use ndarray::Array3;

    fn varying_climatology(name: &str, units: &str, base: f64) -> MonthlyClimatology {
        let values = Array3::from_shape_fn((12, 3, 2), |(t, y, x)| {
            base + t as f64 * 0.7 + y as f64 * 0.1 + x as f64 * 0.05
        });
        MonthlyClimatology::new(GridField::new(name, units, values)).unwrap()
    }

    fn assert_self_correction_is_identity(name: &str, units: &str, base: f64) {
        let clim = varying_climatology(name, units, base);
        let bias = BiasCalculator::new(BiasRules::default())
            .compute_bias(&clim, name, &clim, name)
            .unwrap();
        let series = clim.tile(5);
        let corrected = apply_bias(&series, &bias).unwrap();

        assert_eq!(corrected.field().shape(), series.field().shape());
        for (a, b) in corrected.field().values().iter().zip(series.field().values()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_self_correction_additive() {
        assert_self_correction_is_identity("TREFHT", "K", 250.0);
    }

    #[test]
    fn test_self_correction_multiplicative() {
        assert_self_correction_is_identity("PRECT", "kg/m2/s", 1e-5);
    }

    #[test]
    fn test_self_correction_power() {
        let values = Array3::from_shape_fn((12, 2, 2), |(t, y, x)| {
            0.05 + 0.07 * t as f64 + 0.01 * (y + x) as f64
        });
        let clim = MonthlyClimatology::new(GridField::new("CLDTOT", "1", values)).unwrap();
        let bias = BiasCalculator::default()
            .compute_bias(&clim, "CLDTOT", &clim, "CLDTOT")
            .unwrap();
        let series = clim.tile(2);
        let corrected = apply_bias(&series, &bias).unwrap();
        for (a, b) in corrected.field().values().iter().zip(series.field().values()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_power_correction_of_percent_series() {
        let sim = MonthlyClimatology::new(GridField::filled(
            "CLDTOT",
            "%",
            GridShape { steps: 12, lat: 1, lon: 2 },
            50.0,
        ))
        .unwrap();
        let obs = MonthlyClimatology::new(GridField::filled(
            "cld",
            "%",
            GridShape { steps: 12, lat: 1, lon: 2 },
            25.0,
        ))
        .unwrap();
        let bias = BiasCalculator::default()
            .compute_bias(&sim, "CLDTOT", &obs, "cld")
            .unwrap();
        assert_relative_eq!(bias.field().values()[[0, 0, 0]], 0.5, max_relative = 1e-12);

        let corrected = apply_bias(&sim.tile(1), &bias).unwrap();
        assert_eq!(corrected.field().units(), "%");
        for &v in corrected.field().values() {
            assert_relative_eq!(v, 25.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_power_correction_needs_fraction_units() {
        let series = TimeSeries::new(GridField::filled(
            "CLDTOT",
            "",
            GridShape { steps: 12, lat: 1, lon: 1 },
            0.5,
        ))
        .unwrap();
        let bias = BiasField::new(
            MonthlyClimatology::new(GridField::filled(
                "CLDTOT",
                "1",
                GridShape { steps: 12, lat: 1, lon: 1 },
                2.0,
            ))
            .unwrap(),
            CorrectionKind::Power,
        );
        assert!(matches!(
            apply_bias(&series, &bias),
            Err(FieldError::UnsupportedUnits { .. })
        ));
    }

    #[test]
    fn test_self_correction_with_dry_cells() {
        let clim = MonthlyClimatology::new(GridField::filled(
            "PRECT",
            "mm/month",
            GridShape { steps: 12, lat: 1, lon: 1 },
            0.0,
        ))
        .unwrap();
        let bias = BiasCalculator::default()
            .compute_bias(&clim, "PRECT", &clim, "PRECT")
            .unwrap();
        let corrected = apply_bias(&clim.tile(1), &bias).unwrap();
        assert!(corrected.field().values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_multiplicative_scenario() {
        let series = TimeSeries::new(GridField::filled(
            "PRECT",
            "mm/month",
            GridShape { steps: 24, lat: 2, lon: 3 },
            62.0,
        ))
        .unwrap();
        let bias = BiasField::new(
            MonthlyClimatology::new(GridField::filled(
                "PRECT",
                "1",
                GridShape { steps: 12, lat: 2, lon: 3 },
                2.0,
            ))
            .unwrap(),
            CorrectionKind::Multiplicative,
        );

        let corrected = apply_bias(&series, &bias).unwrap();
        assert_eq!(corrected.field().shape().steps, 24);
        assert_eq!(corrected.field().units(), "mm/month");
        assert!(corrected.field().values().iter().all(|&v| v == 31.0));
    }

    #[test]
    fn test_additive_bias_is_subtracted_per_month() {
        let series = TimeSeries::new(GridField::filled(
            "TREFHT",
            "K",
            GridShape { steps: 24, lat: 1, lon: 1 },
            280.0,
        ))
        .unwrap();
        let bias_values = Array3::from_shape_fn((12, 1, 1), |(t, _, _)| t as f64);
        let bias = BiasField::new(
            MonthlyClimatology::new(GridField::new("TREFHT", "K", bias_values)).unwrap(),
            CorrectionKind::Additive,
        );

        let corrected = apply_bias(&series, &bias).unwrap();
        assert_eq!(corrected.field().values()[[0, 0, 0]], 280.0);
        assert_eq!(corrected.field().values()[[5, 0, 0]], 275.0);
        assert_eq!(corrected.field().values()[[17, 0, 0]], 275.0);
    }

    #[test]
    fn test_grid_mismatch() {
        let series = TimeSeries::new(GridField::filled(
            "TREFHT",
            "K",
            GridShape { steps: 12, lat: 2, lon: 2 },
            280.0,
        ))
        .unwrap();
        let bias = BiasField::new(
            MonthlyClimatology::new(GridField::filled(
                "TREFHT",
                "K",
                GridShape { steps: 12, lat: 2, lon: 3 },
                1.0,
            ))
            .unwrap(),
            CorrectionKind::Additive,
        );
        assert!(matches!(
            apply_bias(&series, &bias),
            Err(FieldError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_raw_cells_stay_missing() {
        let mut values = Array3::from_elem((12, 1, 2), 10.0);
        values[[3, 0, 1]] = f64::NAN;
        let series = TimeSeries::new(GridField::new("PRECT", "mm/month", values)).unwrap();
        let bias = BiasField::new(
            MonthlyClimatology::new(GridField::filled(
                "PRECT",
                "1",
                GridShape { steps: 12, lat: 1, lon: 2 },
                2.0,
            ))
            .unwrap(),
            CorrectionKind::Multiplicative,
        );
        let corrected = apply_bias(&series, &bias).unwrap();
        let field = corrected.field();
        assert_eq!(field.values()[[3, 0, 1]], crate::grid::DEFAULT_FILL_VALUE);
        assert!(field.is_missing(field.values()[[3, 0, 1]]));
        assert_eq!(field.values()[[3, 0, 0]], 5.0);
    }
}
