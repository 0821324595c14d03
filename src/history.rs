use crate::models::{DailyLog, DayPoint};
use chrono::{Duration, NaiveDate, Utc};

pub const WINDOW_DAYS: i64 = 7;

/// Source of "today" for the board.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Dates logs by the UTC calendar day.
pub struct UtcClock;

impl Clock for UtcClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// First day of the trailing window ending at `today`, by calendar days.
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(WINDOW_DAYS)
}

pub fn week_total(logs: &[DailyLog]) -> i64 {
    logs.iter().fold(0i64, |sum, log| sum.saturating_add(log.value))
}

/// One point per day of the window, newest first, with 0 for days that have
/// no log.
pub fn daily_points(today: NaiveDate, logs: &[DailyLog]) -> Vec<DayPoint> {
    (0..=WINDOW_DAYS)
        .map(|offset| {
            let date = today - Duration::days(offset);
            let value = logs
                .iter()
                .filter(|log| log.log_date == date)
                .fold(0i64, |sum, log| sum.saturating_add(log.value));
            DayPoint { date, value }
        })
        .collect()
}
