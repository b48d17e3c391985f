//! Date arithmetic for the day-walk and recurrence expansion.
//!
//! jiff `Span` operations are correct but heavy for a loop that touches every
//! day of a multi-decade window. Day stepping here goes through a flat
//! days-since-epoch number using the standard Gregorian era/day-of-era
//! conversion (Hinnant's civil-calendar algorithms), so day differences and
//! offsets are O(1). Month and year offsets use direct calendar arithmetic
//! with end-of-month clamping (Jan 31 + 1 month = Feb 28/29, Feb 29 + 1 year
//! = Feb 28 in non-leap years).

use jiff::civil::Date;

/// Gregorian leap year rule.
#[inline]
pub fn is_leap_year(year: i16) -> bool {
    year % 400 == 0 || (year % 4 == 0 && year % 100 != 0)
}

/// Length of a month without building a `jiff::civil::Date`.
#[inline]
pub fn days_in_month(year: i16, month: i8) -> i8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01 for a civil date.
///
/// Works in 400-year eras: years are shifted so the leap day falls at the
/// end of the internal year, then the era and day-of-era are combined.
#[inline]
fn days_from_civil(d: Date) -> i32 {
    let mut y = d.year() as i32;
    let m = d.month() as i32;
    if m <= 2 {
        y -= 1;
    }
    let era = y.div_euclid(400);
    let year_of_era = y.rem_euclid(400);
    // March-based month index, so Jan/Feb belong to the previous shifted year
    let shifted_month = if m > 2 { m - 3 } else { m + 9 };
    let day_of_year = (153 * shifted_month + 2) / 5 + d.day() as i32 - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Inverse of [`days_from_civil`].
#[inline]
fn civil_from_days(days: i32) -> Date {
    let shifted = days + 719_468;
    let era = shifted.div_euclid(146_097);
    let day_of_era = shifted.rem_euclid(146_097);
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year =
        day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let shifted_month = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * shifted_month + 2) / 5 + 1;
    let mut year = year_of_era + era * 400;
    let month = if shifted_month < 10 {
        shifted_month + 3
    } else {
        year += 1;
        shifted_month - 9
    };
    jiff::civil::date(year as i16, month as i8, day as i8)
}

/// Number of days between two dates (d2 - d1). Positive when `d2 > d1`.
#[inline]
pub fn days_between(d1: Date, d2: Date) -> i32 {
    days_from_civil(d2) - days_from_civil(d1)
}

/// Add `n` days to a date without going through `jiff::Span`.
#[inline]
pub fn add_days(d: Date, n: i32) -> Date {
    civil_from_days(days_from_civil(d) + n)
}

/// Add `n` calendar months, preserving the day of month and clamping at
/// month end.
#[inline]
pub fn add_months(d: Date, n: i32) -> Date {
    let total_months = d.year() as i32 * 12 + d.month() as i32 - 1 + n;
    let year = total_months.div_euclid(12) as i16;
    let month = (total_months.rem_euclid(12) + 1) as i8;
    let day = d.day().min(days_in_month(year, month));
    jiff::civil::date(year, month, day)
}

/// Add `n` calendar years, clamping Feb 29 to Feb 28 in non-leap years.
#[inline]
pub fn add_years(d: Date, n: i32) -> Date {
    let year = (d.year() as i32 + n) as i16;
    let day = d.day().min(days_in_month(year, d.month()));
    jiff::civil::date(year, d.month(), day)
}

/// Whole years elapsed from `birth` to `on` (the usual birthday rule).
#[inline]
pub fn age_on(birth: Date, on: Date) -> i32 {
    let mut years = (on.year() - birth.year()) as i32;
    if on.month() < birth.month() || (on.month() == birth.month() && on.day() < birth.day()) {
        years -= 1;
    }
    years
}

/// Round a monetary value to cents with half-to-even (banker's) rounding.
///
/// Every amount and running balance the engine emits passes through here so
/// that ledgers re-serialise byte-for-byte across runs.
#[inline]
pub fn round_cents(x: f64) -> f64 {
    let scaled = x * 100.0;
    let floor = scaled.floor();
    let frac = scaled - floor;
    let cents = if (frac - 0.5).abs() < 1e-9 {
        // Exactly half a cent: round to the even cent
        if (floor as i64) % 2 == 0 { floor } else { floor + 1.0 }
    } else {
        scaled.round_ties_even()
    };
    cents / 100.0
}
