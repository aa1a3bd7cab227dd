use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::grid::FieldError;

/// How a bias is combined with the values it was computed from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionKind {
    /// `bias = sim - obs`, removed with `raw - bias`.
    #[serde(rename(deserialize = "additive"))]
    Additive,
    /// `bias = sim / obs`, removed with `raw / bias`.
    #[serde(rename(deserialize = "multiplicative"))]
    Multiplicative,
    /// `bias = ln(sim) / ln(obs)`, removed with `raw ^ (1 / bias)`.
    #[serde(rename(deserialize = "power"))]
    Power,
}

impl fmt::Display for CorrectionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CorrectionKind::Additive => write!(f, "additive"),
            CorrectionKind::Multiplicative => write!(f, "multiplicative"),
            CorrectionKind::Power => write!(f, "power"),
        }
    }
}

/// Physical quantity of a variable. Decides which unit conversions happen
/// before simulated and observed values are combined.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    #[serde(rename(deserialize = "temperature"))]
    Temperature,
    #[serde(rename(deserialize = "precipitation"))]
    Precipitation,
    #[serde(rename(deserialize = "cloud_fraction"))]
    CloudFraction,
}

impl Quantity {
    pub fn default_correction(&self) -> CorrectionKind {
        match self {
            Quantity::Temperature => CorrectionKind::Additive,
            Quantity::Precipitation => CorrectionKind::Multiplicative,
            Quantity::CloudFraction => CorrectionKind::Power,
        }
    }

    /// Unit both sides are converted to before combining.
    pub fn canonical_units(&self) -> &'static str {
        match self {
            Quantity::Temperature => "K",
            Quantity::Precipitation => "mm/month",
            Quantity::CloudFraction => "1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableRule {
    pub quantity: Quantity,
    pub correction: CorrectionKind,
}

impl VariableRule {
    pub fn new(quantity: Quantity) -> Self {
        Self {
            quantity,
            correction: quantity.default_correction(),
        }
    }
}

/// Lookup table from simulated variable name to its bias rule.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasRules {
    rules: BTreeMap<String, VariableRule>,
}

impl Default for BiasRules {
    fn default() -> Self {
        let rules = BTreeMap::from([
            ("TREFHT".to_string(), VariableRule::new(Quantity::Temperature)),
            ("PRECT".to_string(), VariableRule::new(Quantity::Precipitation)),
            ("CLDTOT".to_string(), VariableRule::new(Quantity::CloudFraction)),
        ]);
        Self { rules }
    }
}

impl BiasRules {
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    pub fn with_rule(mut self, variable: &str, rule: VariableRule) -> Self {
        self.rules.insert(variable.to_string(), rule);
        self
    }

    pub fn get(&self, variable: &str) -> Result<&VariableRule, FieldError> {
        self.rules
            .get(variable)
            .ok_or_else(|| FieldError::UnsupportedVariable(variable.to_string()))
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = BiasRules::default();
        assert_eq!(
            rules.get("TREFHT").unwrap().correction,
            CorrectionKind::Additive
        );
        assert_eq!(
            rules.get("PRECT").unwrap().correction,
            CorrectionKind::Multiplicative
        );
        assert_eq!(rules.get("CLDTOT").unwrap().correction, CorrectionKind::Power);
        assert_eq!(
            rules.get("FSDS"),
            Err(FieldError::UnsupportedVariable("FSDS".to_string()))
        );
    }

    #[test]
    fn test_rules_can_be_extended() {
        let rules = BiasRules::default().with_rule("TS", VariableRule::new(Quantity::Temperature));
        assert_eq!(rules.get("TS").unwrap().quantity, Quantity::Temperature);
        assert_eq!(rules.variables().count(), 4);
    }

    #[test]
    fn test_deserialize_kinds() {
        let kind: CorrectionKind = serde_json::from_str("\"power\"").unwrap();
        assert_eq!(kind, CorrectionKind::Power);
        let quantity: Quantity = serde_json::from_str("\"cloud_fraction\"").unwrap();
        assert_eq!(quantity, Quantity::CloudFraction);
        assert!(serde_json::from_str::<CorrectionKind>("\"exponential\"").is_err());
    }
}
