use serde::Deserialize;

use crate::bias::{CorrectionKind, Quantity, VariableRule};

/// Bias correction of one simulated variable.
///
/// `simulated_climatology` and `precip_std` may hold either a ready
/// 12-month climatology or the series it is aggregated from.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DebiasJob {
    pub variable: String,
    /// File names or glob patterns of the raw simulated series.
    pub series: Vec<String>,
    pub simulated_climatology: String,
    pub observed: String,
    #[serde(default)]
    pub observed_variable: String,
    #[serde(default)]
    pub precip_std: Option<String>,
}

/// Variable computed from other variables before any bias correction.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum DeriveJob {
    #[serde(rename(deserialize = "precip_sum"))]
    PrecipSum {
        convective: String,
        large_scale: String,
        #[serde(default)]
        unit_factor: Option<f64>,
        output: String,
    },
    #[serde(rename(deserialize = "overcast_radiation"))]
    OvercastRadiation {
        actual: String,
        clear_sky: String,
        cloud_fraction: String,
        output: String,
    },
    #[serde(rename(deserialize = "actual_radiation"))]
    ActualRadiation {
        clear_sky: String,
        overcast: String,
        cloud_fraction: String,
        output: String,
    },
}

impl DeriveJob {
    pub fn output(&self) -> &str {
        match self {
            DeriveJob::PrecipSum { output, .. }
            | DeriveJob::OvercastRadiation { output, .. }
            | DeriveJob::ActualRadiation { output, .. } => output,
        }
    }

    pub fn inputs(&self) -> Vec<&str> {
        match self {
            DeriveJob::PrecipSum { convective, large_scale, .. } => vec![convective.as_str(), large_scale.as_str()],
            DeriveJob::OvercastRadiation { actual, clear_sky, cloud_fraction, .. } => {
                vec![actual.as_str(), clear_sky.as_str(), cloud_fraction.as_str()]
            }
            DeriveJob::ActualRadiation { clear_sky, overcast, cloud_fraction, .. } => {
                vec![clear_sky.as_str(), overcast.as_str(), cloud_fraction.as_str()]
            }
        }
    }
}

/// Rule override for a variable, with the correction defaulting to the
/// usual one for its quantity.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct VariableRuleEntry {
    pub quantity: Quantity,
    #[serde(default)]
    pub correction: Option<CorrectionKind>,
}

impl From<VariableRuleEntry> for VariableRule {
    fn from(entry: VariableRuleEntry) -> Self {
        let mut rule = VariableRule::new(entry.quantity);
        if let Some(correction) = entry.correction {
            rule.correction = correction;
        }
        rule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_job_kinds() {
        let job: DeriveJob = serde_json::from_str(
            r#"{"kind": "precip_sum", "convective": "PRECC.tif", "large_scale": "PRECL.tif", "output": "PRECT.tif"}"#,
        )
        .unwrap();
        assert_eq!(job.output(), "PRECT.tif");
        assert_eq!(job.inputs(), vec!["PRECC.tif", "PRECL.tif"]);

        let unknown = serde_json::from_str::<DeriveJob>(r#"{"kind": "co2", "output": "x"}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn test_rule_entry_defaults_to_quantity() {
        let entry: VariableRuleEntry = serde_json::from_str(r#"{"quantity": "precipitation"}"#).unwrap();
        assert_eq!(VariableRule::from(entry).correction, CorrectionKind::Multiplicative);

        let entry: VariableRuleEntry =
            serde_json::from_str(r#"{"quantity": "cloud_fraction", "correction": "multiplicative"}"#).unwrap();
        assert_eq!(VariableRule::from(entry).correction, CorrectionKind::Multiplicative);
    }
}
