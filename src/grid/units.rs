//! Unit strings as they appear in TraCE-21ka and CRU files, and the
//! conversions needed before simulated and observed values can be combined.

use std::fmt;

use super::calendar;

pub const KELVIN_OFFSET: f64 = 273.15;

#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    Kelvin,
    Celsius,
    /// kg m-2 s-1, numerically mm/s.
    KgPerM2PerSecond,
    /// m/s, the native TraCE-21ka precipitation unit.
    MetresPerSecond,
    MmPerMonth,
    MmPerDay,
    Percent,
    Fraction,
    Other(String),
}

impl Unit {
    pub fn parse(units: &str) -> Self {
        let normalized: String = units
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        match normalized.as_str() {
            "k" | "kelvin" => Unit::Kelvin,
            "degc" | "°c" | "celsius" | "degreesc" | "degreescelsius" | "deg_c" | "degrees_celsius" => Unit::Celsius,
            "kg/m2/s" | "kg/m^2/s" | "kgm-2s-1" | "kg/(m2s)" | "kg/m²/s" | "mm/s" => {
                Unit::KgPerM2PerSecond
            }
            "m/s" | "ms-1" => Unit::MetresPerSecond,
            "mm/month" | "mm" | "mmmonth-1" | "mm/mon" => Unit::MmPerMonth,
            "mm/day" | "mm/d" | "mmday-1" | "mmd-1" => Unit::MmPerDay,
            "%" | "percent" | "percentage" => Unit::Percent,
            "1" | "fraction" => Unit::Fraction,
            _ => Unit::Other(units.to_string()),
        }
    }

    /// Factor turning a precipitation flux of this unit into mm for the given
    /// calendar month. `None` if the unit is not a flux or monthly total.
    pub fn mm_per_month_factor(&self, month: usize) -> Option<f64> {
        match self {
            Unit::KgPerM2PerSecond => Some(calendar::seconds_in_month(month)),
            Unit::MetresPerSecond => Some(calendar::seconds_in_month(month) * 1000.0),
            Unit::MmPerMonth => Some(1.0),
            Unit::MmPerDay => Some(calendar::days_in_month(month) as f64),
            _ => None,
        }
    }

    pub fn to_kelvin(&self, value: f64) -> Option<f64> {
        match self {
            Unit::Kelvin => Some(value),
            Unit::Celsius => Some(value + KELVIN_OFFSET),
            _ => None,
        }
    }

    pub fn to_fraction(&self, value: f64) -> Option<f64> {
        match self {
            Unit::Fraction => Some(value),
            Unit::Percent => Some(value / 100.0),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Kelvin => write!(f, "K"),
            Unit::Celsius => write!(f, "degC"),
            Unit::KgPerM2PerSecond => write!(f, "kg/m2/s"),
            Unit::MetresPerSecond => write!(f, "m/s"),
            Unit::MmPerMonth => write!(f, "mm/month"),
            Unit::MmPerDay => write!(f, "mm/day"),
            Unit::Percent => write!(f, "%"),
            Unit::Fraction => write!(f, "1"),
            Unit::Other(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_spellings() {
        assert_eq!(Unit::parse("K"), Unit::Kelvin);
        assert_eq!(Unit::parse("degrees Celsius"), Unit::Celsius);
        assert_eq!(Unit::parse("W/m2"), Unit::Other("W/m2".into()));
        assert_eq!(Unit::parse("deg C"), Unit::Celsius);
        assert_eq!(Unit::parse("kg m-2 s-1"), Unit::KgPerM2PerSecond);
        assert_eq!(Unit::parse("m/s"), Unit::MetresPerSecond);
        assert_eq!(Unit::parse("mm/month"), Unit::MmPerMonth);
        assert_eq!(Unit::parse("mm d-1"), Unit::MmPerDay);
        assert_eq!(Unit::parse("percentage"), Unit::Percent);
        assert_eq!(Unit::parse("fraction"), Unit::Fraction);
    }

    #[test]
    fn test_missing_units_are_not_guessed() {
        assert_eq!(Unit::parse(""), Unit::Other(String::new()));
        assert_eq!(Unit::parse("  ").to_fraction(50.0), None);
    }

    #[test]
    fn test_flux_to_mm_uses_true_month_length() {
        let january = Unit::KgPerM2PerSecond.mm_per_month_factor(0).unwrap();
        let february = Unit::KgPerM2PerSecond.mm_per_month_factor(1).unwrap();
        assert_eq!(january, 31.0 * 86_400.0);
        assert_eq!(february, 28.0 * 86_400.0);

        let metres = Unit::MetresPerSecond.mm_per_month_factor(3).unwrap();
        assert_eq!(metres, 30.0 * 86_400.0 * 1000.0);
    }

    #[test]
    fn test_temperature_and_cloud_conversions() {
        assert_eq!(Unit::Celsius.to_kelvin(0.0), Some(273.15));
        assert_eq!(Unit::Kelvin.to_kelvin(280.0), Some(280.0));
        assert_eq!(Unit::Percent.to_kelvin(1.0), None);
        assert_eq!(Unit::Percent.to_fraction(50.0), Some(0.5));
        assert_eq!(Unit::MmPerDay.to_fraction(50.0), None);
    }
}
