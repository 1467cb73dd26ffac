use chrono::{Datelike, Days, Months, NaiveDate};

/// The Monday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(date.weekday().num_days_from_monday()))
}

pub fn add_days(date: NaiveDate, n: i64) -> NaiveDate {
    let shifted = if n >= 0 {
        date.checked_add_days(Days::new(n.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(n.unsigned_abs()))
    };
    // Only fails outside chrono's representable range (~262000 years).
    shifted.unwrap_or(date)
}

pub fn add_weeks(date: NaiveDate, n: i64) -> NaiveDate {
    add_days(date, n * 7)
}

/// Shifts a (year, month) pair by `delta` months, rolling the year as needed.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let shifted = first.and_then(|first| {
        let months = Months::new(delta.unsigned_abs());
        if delta >= 0 {
            first.checked_add_months(months)
        } else {
            first.checked_sub_months(months)
        }
    });
    match shifted {
        Some(date) => (date.year(), date.month()),
        None => (year, month),
    }
}
