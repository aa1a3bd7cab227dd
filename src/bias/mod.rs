//! Monthly bias between simulated and observed climatologies, and its
//! removal from simulated time series.

pub mod calculator;
pub mod debias;
pub mod rules;

pub use calculator::BiasCalculator;
pub use debias::apply_bias;
pub use rules::{BiasRules, CorrectionKind, Quantity, VariableRule};
