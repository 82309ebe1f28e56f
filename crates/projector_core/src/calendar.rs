//! Trading-calendar helpers.
//!
//! Simulation step `t` is mapped to the `t`-th weekday after the projection
//! start date. Holidays are not modelled; the calendar only needs to be
//! monotone and reproducible so rebalancing events can be reported as dates.
//!
//! Day arithmetic uses Rata Die numbering rather than `jiff::Span`, which keeps
//! the per-step cost O(1) without span normalisation.

use jiff::civil::{Date, Weekday};

use crate::error::{ProjectionError, Result};

/// Convert a civil date to a Rata Die day number (0001-01-01 is day 1).
#[inline]
fn rata_die(d: Date) -> i32 {
    let y = d.year() as i32;
    let m = d.month() as i32;
    let day = d.day() as i32;

    // March-based year so the leap day is the last day of the year
    let a = (14 - m) / 12;
    let y2 = y - a;
    let m2 = m + 12 * a - 3;

    day + (153 * m2 + 2) / 5 + 365 * y2 + y2 / 4 - y2 / 100 + y2 / 400 - 306
}

/// Inverse of [`rata_die`]. Fails for days outside jiff's supported range.
fn rd_to_date(rd: i32) -> Result<Date> {
    let z = rd + 306;
    let h = 100 * z - 25;
    let a = h / 3_652_425;
    let b = a - a / 4;
    let y = (100 * b + h) / 36_525;
    let c = b + z - 365 * y - y / 4;
    let m = (5 * c + 456) / 153;
    let day = c - (153 * m - 457) / 5;

    let (year, month) = if m > 12 { (y + 1, m - 12) } else { (y, m) };

    let year = i16::try_from(year)
        .map_err(|_| ProjectionError::invalid("start_date", "calendar overflow"))?;
    Date::new(year, month as i8, day as i8)
        .map_err(|e| ProjectionError::invalid("start_date", format!("calendar overflow: {e}")))
}

#[inline]
fn is_weekend(rd: i32) -> bool {
    // Day 1 (0001-01-01) is a Monday
    (rd - 1).rem_euclid(7) >= 5
}

/// The next weekday strictly after `date`.
pub fn next_trading_day(date: Date) -> Result<Date> {
    let mut rd = rata_die(date) + 1;
    while is_weekend(rd) {
        rd += 1;
    }
    rd_to_date(rd)
}

/// `start` followed by the next `steps` weekdays (length `steps + 1`).
///
/// `start` itself is kept even if it falls on a weekend; it stands for the
/// valuation date of the initial portfolio.
pub fn trading_days(start: Date, steps: usize) -> Result<Vec<Date>> {
    let mut dates = Vec::with_capacity(steps + 1);
    dates.push(start);

    let mut rd = rata_die(start);
    for _ in 0..steps {
        rd += 1;
        while is_weekend(rd) {
            rd += 1;
        }
        dates.push(rd_to_date(rd)?);
    }
    Ok(dates)
}

/// Step offsets expressed in years (`t / steps_per_year`).
#[must_use]
pub fn time_points(steps: usize, steps_per_year: usize) -> Vec<f64> {
    let per_year = steps_per_year as f64;
    (0..=steps).map(|t| t as f64 / per_year).collect()
}

#[must_use]
pub fn is_trading_day(date: Date) -> bool {
    !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}
