use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, TimeZone};

use crate::Application;

/// Number of calendar days covered by the daily series, today included.
pub const DAILY_WINDOW_DAYS: usize = 30;

/// One bar of the daily applications chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    /// Month and day, e.g. `Oct 16`.
    pub label: String,
    pub applied: u32,
}

/// Count applications per calendar day for the window ending on `now`'s date.
///
/// Days are taken in `now`'s time zone. The result always has
/// [`DAILY_WINDOW_DAYS`] points, oldest first. Applications outside the window
/// or with unreadable timestamps are not counted.
pub fn daily_applications<Tz: TimeZone>(
    applications: &[Application],
    now: &DateTime<Tz>,
) -> Vec<DailyPoint> {
    let tz = now.timezone();
    let today = now.date_naive();
    let first_day = today
        .checked_sub_days(Days::new(DAILY_WINDOW_DAYS as u64 - 1))
        .unwrap_or(NaiveDate::MIN);

    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for day in applications
        .iter()
        .filter_map(|application| application.applied_at(&tz))
        .map(|at| at.with_timezone(&tz).date_naive())
        .filter(|day| (first_day..=today).contains(day))
    {
        *counts.entry(day).or_default() += 1;
    }

    first_day
        .iter_days()
        .take(DAILY_WINDOW_DAYS)
        .map(|date| DailyPoint {
            date,
            label: date.format("%b %-d").to_string(),
            applied: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}
