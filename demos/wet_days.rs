use trace_for_guess::grid::calendar::{MONTHS_PER_YEAR, days_in_month, month_name};
use trace_for_guess::wet_days::{DEFAULT_WET_THRESHOLD, dry_day_probability, wet_day_count};

fn main() {
    // A cell with 60 mm per month and a day-to-day deviation of 4 mm/day.
    let monthly_total = 60.0;
    let std_daily = 4.0;

    for month in 0..MONTHS_PER_YEAR {
        let days = days_in_month(month);
        let mean_daily = monthly_total / days as f64;
        let p_dry = dry_day_probability(DEFAULT_WET_THRESHOLD, mean_daily, std_daily);
        println!(
            "{:>9}: mean {:5.2} mm/day, P(dry) {:.3}, {} wet days",
            month_name(month),
            mean_daily,
            p_dry,
            wet_day_count(p_dry, days)
        );
    }
}
