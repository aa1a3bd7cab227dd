//! Reductions over the time axis: monthly climatologies, day-to-day
//! variability and slicing of long series.

use ndarray::{Array3, Axis, Zip, s};
use tracing::debug;

use crate::grid::calendar::{DAYS_PER_YEAR, MONTHS_PER_YEAR, days_in_month, month_of_step};
use crate::grid::{FieldError, GridField, MonthlyClimatology, StdDevClimatology, TimeSeries, Unit};

/// Steps per slice written by default: 100 years of monthly data.
pub const DEFAULT_SLICE_STEPS: usize = 1200;

/// Mean of every calendar month over all years. Missing cells are skipped; a
/// cell missing in every year is missing in the result.
pub fn monthly_climatology(series: &TimeSeries) -> Result<MonthlyClimatology, FieldError> {
    let field = series.field();
    let shape = field.shape();
    if series.years() == 0 {
        return Err(FieldError::InvalidShape(format!(
            "cannot average '{}' without any years",
            field.variable_name()
        )));
    }

    let mut sums = Array3::<f64>::zeros((MONTHS_PER_YEAR, shape.lat, shape.lon));
    let mut counts = Array3::<u32>::zeros((MONTHS_PER_YEAR, shape.lat, shape.lon));
    for (t, slab) in field.values().axis_iter(Axis(0)).enumerate() {
        let month = month_of_step(t);
        Zip::from(sums.index_axis_mut(Axis(0), month))
            .and(counts.index_axis_mut(Axis(0), month))
            .and(&slab)
            .for_each(|s, n, &v| {
                if !field.is_missing(v) {
                    *s += v;
                    *n += 1;
                }
            });
    }

    let fill = field.output_fill_value();
    Zip::from(&mut sums).and(&counts).for_each(|s, &n| {
        *s = if n == 0 { fill } else { *s / n as f64 };
    });

    debug!(
        variable = field.variable_name(),
        years = series.years(),
        "aggregated monthly climatology"
    );
    MonthlyClimatology::new(field.derive(
        field.variable_name(),
        field.units(),
        sums,
        (0..MONTHS_PER_YEAR).map(|m| m as f64).collect(),
    ))
}

/// Standard deviation of daily precipitation within every month, averaged
/// over the years for each calendar month.
///
/// `daily` holds one step per day on a 365-day calendar starting 1 January,
/// in mm/day. The deviation divides by the number of days in the month.
/// Months with a missing day are left out of the average.
pub fn daily_precip_std_climatology(daily: &GridField) -> Result<StdDevClimatology, FieldError> {
    let shape = daily.shape();
    if shape.steps == 0 || shape.steps % DAYS_PER_YEAR != 0 {
        return Err(FieldError::IncompleteYear {
            variable: daily.variable_name().to_string(),
            steps: shape.steps,
        });
    }
    if !daily.units().is_empty() && daily.unit() != Unit::MmPerDay {
        return Err(FieldError::UnsupportedUnits {
            variable: daily.variable_name().to_string(),
            units: daily.units().to_string(),
            expected: "daily precipitation (mm/day)",
        });
    }
    let years = shape.steps / DAYS_PER_YEAR;

    // Per calendar month: sum of monthly deviations and how many went in.
    let mut std_sums = Array3::<f64>::zeros((MONTHS_PER_YEAR, shape.lat, shape.lon));
    let mut std_counts = Array3::<u32>::zeros((MONTHS_PER_YEAR, shape.lat, shape.lon));

    for year in 0..years {
        let mut start = year * DAYS_PER_YEAR;
        for month in 0..MONTHS_PER_YEAR {
            let end = start + days_in_month(month) as usize;
            let days = daily.values().slice(s![start..end, .., ..]);
            let n = (end - start) as f64;
            for ((y, x), std_sum) in std_sums.index_axis_mut(Axis(0), month).indexed_iter_mut() {
                let column = days.slice(s![.., y, x]);
                if column.iter().any(|&v| daily.is_missing(v)) {
                    continue;
                }
                let mean = column.sum() / n;
                let variance = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
                *std_sum += variance.sqrt();
                std_counts[[month, y, x]] += 1;
            }
            start = end;
        }
    }

    let fill = daily.output_fill_value();
    Zip::from(&mut std_sums).and(&std_counts).for_each(|s, &n| {
        *s = if n == 0 { fill } else { *s / n as f64 };
    });

    debug!(variable = daily.variable_name(), years, "computed day-to-day precipitation deviation");
    StdDevClimatology::new(daily.derive(
        daily.variable_name(),
        "mm/day",
        std_sums,
        (0..MONTHS_PER_YEAR).map(|m| m as f64).collect(),
    ))
}

/// Chronological slices of `steps_per_slice` steps each; the last one may be
/// shorter.
pub fn split_series(series: &TimeSeries, steps_per_slice: usize) -> Result<Vec<TimeSeries>, FieldError> {
    if steps_per_slice == 0 || steps_per_slice % MONTHS_PER_YEAR != 0 {
        return Err(FieldError::InvalidShape(format!(
            "slices of {steps_per_slice} steps do not hold whole years"
        )));
    }

    let field = series.field();
    let steps = field.shape().steps;
    (0..steps)
        .step_by(steps_per_slice)
        .map(|start| TimeSeries::new(field.slice_steps(start..(start + steps_per_slice).min(steps))))
        .collect()
}

/// Lines of an LPJ-GUESS CF gridlist: the longitude and latitude index of
/// every cell, tab separated, longitude outer.
pub fn gridlist_lines(field: &GridField) -> Vec<String> {
    let shape = field.shape();
    (0..shape.lon)
        .flat_map(|x| (0..shape.lat).map(move |y| format!("{x}\t{y}")))
        .collect()
}
