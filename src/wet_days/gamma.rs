use statrs::distribution::{ContinuousCDF, Gamma, Normal};

/// Substituted for a mean or standard deviation of zero [mm/day].
pub const GAMMA_EPSILON: f64 = 1e-8;

/// Shape above which the gamma distribution is replaced by a normal one with
/// the same mean and standard deviation.
pub const NORMAL_APPROX_SHAPE: f64 = 1e6;

/// Probability that a day stays below `threshold` when daily precipitation
/// follows a gamma distribution with the given mean and standard deviation.
///
/// Returns NaN if no distribution can be built from the inputs.
pub fn dry_day_probability(threshold: f64, mean_daily: f64, std_daily: f64) -> f64 {
    let mean = guard(mean_daily);
    let std = guard(std_daily);
    let variance = std * std;

    let shape = mean * mean / variance;
    if shape > NORMAL_APPROX_SHAPE {
        return Normal::new(mean, std)
            .map(|n| n.cdf(threshold))
            .unwrap_or(f64::NAN);
    }

    // statrs is parameterized by rate, the inverse of the scale std²/mean.
    let rate = mean / variance;
    Gamma::new(shape, rate)
        .map(|g| g.cdf(threshold))
        .unwrap_or(f64::NAN)
}

fn guard(value: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.max(GAMMA_EPSILON)
    }
}
