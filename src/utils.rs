use tracing::info;

use crate::grid::GridField;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub valid: usize,
    pub total: usize,
}

/// Min, max and mean over the cells of `field` that are not missing.
/// `None` if every cell is missing.
pub fn field_statistics(field: &GridField) -> Option<FieldStatistics> {
    let valid_values: Vec<f64> = field
        .values()
        .iter()
        .copied()
        .filter(|&v| !field.is_missing(v))
        .collect();

    if valid_values.is_empty() {
        return None;
    }

    Some(FieldStatistics {
        min: valid_values.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
        max: valid_values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        mean: valid_values.iter().sum::<f64>() / valid_values.len() as f64,
        valid: valid_values.len(),
        total: field.values().len(),
    })
}

pub fn log_field_statistics(field: &GridField) {
    match field_statistics(field) {
        Some(stats) => info!(
            variable = field.variable_name(),
            units = field.units(),
            min = stats.min,
            max = stats.max,
            mean = stats.mean,
            "valid cells: {} / {} ({:.1}%)",
            stats.valid,
            stats.total,
            100.0 * stats.valid as f64 / stats.total as f64
        ),
        None => info!(variable = field.variable_name(), "no valid cells"),
    }
}
