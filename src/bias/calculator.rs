//! Monthly bias of a simulated climatology against an observed one.
//!
//! Both climatologies hold 12 values per grid cell. The observed month axis
//! is relabeled to start at January like the simulated one; no values are
//! shifted. Units are harmonized per quantity before the bias operator is
//! applied:
//!
//! | quantity       | harmonization                 | bias                   |
//! |----------------|-------------------------------|------------------------|
//! | temperature    | °C → K                        | `sim - obs`            |
//! | precipitation  | flux → mm/month (true months) | `sim / obs`            |
//! | cloud fraction | % → fraction                  | `ln(sim) / ln(obs)`    |

use ndarray::{Array3, Zip};
use tracing::{debug, warn};

use super::rules::{BiasRules, CorrectionKind, Quantity};
use crate::grid::calendar::{MONTHS_PER_YEAR, month_of_step};
use crate::grid::units::KELVIN_OFFSET;
use crate::grid::{BiasField, FieldError, GridField, MonthlyClimatology, Unit};

/// Replaces observed precipitation of exactly zero before dividing [mm/month].
pub const PRECIP_RATIO_EPSILON: f64 = 1.0;

/// Cloud fractions are kept this far away from 0 and 1 so that neither
/// logarithm of the power-law bias vanishes or diverges.
pub const CLOUD_FRACTION_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Conversion {
    Identity,
    Offset(f64),
    Scale(f64),
    PerMonth,
}

/// Works out the conversion of `field` into the canonical unit of
/// `quantity`. Unknown units are accepted only when both sides carry the same
/// unit string, in which case nothing is converted.
fn conversion_for(
    field: &GridField,
    quantity: Quantity,
    peer: &GridField,
) -> Result<(Conversion, Unit), FieldError> {
    let unit = field.unit();
    let conversion = match quantity {
        Quantity::Temperature => match unit {
            Unit::Kelvin => Some(Conversion::Identity),
            Unit::Celsius => Some(Conversion::Offset(KELVIN_OFFSET)),
            _ => None,
        },
        Quantity::Precipitation => unit
            .mm_per_month_factor(0)
            .map(|_| Conversion::PerMonth),
        Quantity::CloudFraction => match unit {
            Unit::Fraction => Some(Conversion::Identity),
            Unit::Percent => Some(Conversion::Scale(0.01)),
            _ => None,
        },
    };

    match conversion {
        Some(conversion) => Ok((conversion, unit)),
        None if field.units() == peer.units() => Ok((Conversion::Identity, unit)),
        None => Err(FieldError::UnsupportedUnits {
            variable: field.variable_name().to_string(),
            units: field.units().to_string(),
            expected: match quantity {
                Quantity::Temperature => "a temperature",
                Quantity::Precipitation => "a precipitation flux or amount",
                Quantity::CloudFraction => "a cloud fraction",
            },
        }),
    }
}

/// Values of `field` in the canonical unit, missing cells as NaN.
fn harmonize(field: &GridField, conversion: Conversion, unit: &Unit) -> Array3<f64> {
    let mut values = field.values().clone();
    for ((t, _, _), v) in values.indexed_iter_mut() {
        if field.is_missing(*v) {
            *v = f64::NAN;
            continue;
        }
        *v = match conversion {
            Conversion::Identity => *v,
            Conversion::Offset(offset) => *v + offset,
            Conversion::Scale(scale) => *v * scale,
            Conversion::PerMonth => match unit.mm_per_month_factor(month_of_step(t)) {
                Some(f) => *v * f,
                None => f64::NAN,
            },
        };
    }
    values
}

#[derive(Debug, Clone, Default)]
pub struct BiasCalculator {
    rules: BiasRules,
}

impl BiasCalculator {
    pub fn new(rules: BiasRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &BiasRules {
        &self.rules
    }

    /// Computes the 12-month bias of `sim` against `obs`.
    ///
    /// `sim_variable` selects the rule; the result is named after it.
    /// `obs_variable` must be the variable name of `obs` (an empty string
    /// skips that check).
    ///
    /// # Errors
    ///
    /// * [`FieldError::UnsupportedVariable`] if no rule exists, before any
    ///   data is read.
    /// * [`FieldError::VariableMismatch`] if `obs` holds another variable.
    /// * [`FieldError::GridMismatch`] if the grids differ.
    /// * [`FieldError::UnsupportedUnits`] if the units cannot be harmonized.
    pub fn compute_bias(
        &self,
        sim: &MonthlyClimatology,
        sim_variable: &str,
        obs: &MonthlyClimatology,
        obs_variable: &str,
    ) -> Result<BiasField, FieldError> {
        let rule = *self.rules.get(sim_variable)?;

        let (sim_field, obs_field) = (sim.field(), obs.field());
        if !obs_variable.is_empty() && obs_field.variable_name() != obs_variable {
            return Err(FieldError::VariableMismatch {
                expected: obs_variable.to_string(),
                found: obs_field.variable_name().to_string(),
            });
        }
        sim_field.ensure_same_grid(obs_field)?;

        let (sim_conversion, sim_unit) = conversion_for(sim_field, rule.quantity, obs_field)?;
        let (obs_conversion, obs_unit) = conversion_for(obs_field, rule.quantity, sim_field)?;
        let sim_values = harmonize(sim_field, sim_conversion, &sim_unit);
        let obs_values = harmonize(obs_field, obs_conversion, &obs_unit);

        let fill = sim_field.output_fill_value();
        let clamp_fraction = rule.quantity == Quantity::CloudFraction;
        let mut masked = 0usize;
        let mut bias = Array3::<f64>::zeros(sim_values.raw_dim());

        Zip::from(&mut bias)
            .and(&sim_values)
            .and(&obs_values)
            .for_each(|b, &s, &o| {
                let value = if s.is_nan() || o.is_nan() {
                    f64::NAN
                } else {
                    match rule.correction {
                        CorrectionKind::Additive => s - o,
                        CorrectionKind::Multiplicative => {
                            let o = if o == 0.0 { PRECIP_RATIO_EPSILON } else { o };
                            s / o
                        }
                        CorrectionKind::Power => {
                            let (s, o) = if clamp_fraction {
                                (
                                    s.clamp(CLOUD_FRACTION_EPSILON, 1.0 - CLOUD_FRACTION_EPSILON),
                                    o.clamp(CLOUD_FRACTION_EPSILON, 1.0 - CLOUD_FRACTION_EPSILON),
                                )
                            } else {
                                (s, o)
                            };
                            s.ln() / o.ln()
                        }
                    }
                };
                if value.is_finite() {
                    *b = value;
                } else {
                    masked += 1;
                    *b = fill;
                }
            });

        if masked > 0 {
            warn!(
                variable = sim_variable,
                masked, "bias undefined for some cells, written as fill value"
            );
        }

        let units = match rule.correction {
            CorrectionKind::Additive if sim_conversion == Conversion::Identity => {
                sim_field.units().to_string()
            }
            CorrectionKind::Additive => rule.quantity.canonical_units().to_string(),
            _ => "1".to_string(),
        };
        debug!(
            variable = sim_variable,
            observed = obs_field.variable_name(),
            kind = %rule.correction,
            "computed monthly bias"
        );

        let time = (0..MONTHS_PER_YEAR).map(|m| m as f64).collect();
        let field = sim_field.derive(sim_variable, &units, bias, time);
        Ok(BiasField::new(MonthlyClimatology::new(field)?, rule.correction))
    }
}
