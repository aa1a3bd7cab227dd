//! No-leap monthly calendar used by every time axis in the crate.
//!
//! Step 0 of any monthly series is January of the first year. The series are
//! never re-indexed from date metadata here; callers that read files with a
//! different first month have to rotate them before handing them over.

use chrono::Month;

pub const MONTHS_PER_YEAR: usize = 12;

pub const DAYS_PER_YEAR: usize = 365;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Days per calendar month, January first. February always has 28 days.
pub const DAYS_IN_MONTH: [u32; MONTHS_PER_YEAR] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Calendar month (0 = January) of a monthly time step.
pub fn month_of_step(step: usize) -> usize {
    step % MONTHS_PER_YEAR
}

pub fn days_in_month(month: usize) -> u32 {
    DAYS_IN_MONTH[month % MONTHS_PER_YEAR]
}

pub fn seconds_in_month(month: usize) -> f64 {
    days_in_month(month) as f64 * SECONDS_PER_DAY
}

pub fn month_name(month: usize) -> &'static str {
    Month::try_from((month % MONTHS_PER_YEAR) as u8 + 1)
        .map(|m| m.name())
        .unwrap_or("unknown")
}

/// Calendar month (0 = January) of each day in a 365-day year.
pub fn month_of_day_of_year(day: usize) -> usize {
    let mut day = day % DAYS_PER_YEAR;
    for (month, &days) in DAYS_IN_MONTH.iter().enumerate() {
        if day < days as usize {
            return month;
        }
        day -= days as usize;
    }
    MONTHS_PER_YEAR - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_has_365_days() {
        assert_eq!(DAYS_IN_MONTH.iter().sum::<u32>() as usize, DAYS_PER_YEAR);
    }

    #[test]
    fn test_month_of_step_wraps_every_year() {
        assert_eq!(month_of_step(0), 0);
        assert_eq!(month_of_step(11), 11);
        assert_eq!(month_of_step(12), 0);
        assert_eq!(month_of_step(25), 1);
    }

    #[test]
    fn test_seconds_in_february() {
        assert_eq!(seconds_in_month(1), 28.0 * 86_400.0);
        assert_eq!(seconds_in_month(13), 28.0 * 86_400.0);
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_name(0), "January");
        assert_eq!(month_name(11), "December");
    }

    #[test]
    fn test_month_of_day_of_year() {
        assert_eq!(month_of_day_of_year(0), 0);
        assert_eq!(month_of_day_of_year(30), 0);
        assert_eq!(month_of_day_of_year(31), 1);
        assert_eq!(month_of_day_of_year(58), 1);
        assert_eq!(month_of_day_of_year(59), 2);
        assert_eq!(month_of_day_of_year(364), 11);
        assert_eq!(month_of_day_of_year(365), 0);
    }
}
