// src/scoring/week.rs

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, TimeDelta, Utc};
use serde::Serialize;

/// Time interval. `end` is the last whole second shown to users; membership
/// runs up to, but excluding, the second after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Exclusive upper bound. Sub-second timestamps after `end` still belong here.
    pub fn until(&self) -> DateTime<Utc> {
        self.end + TimeDelta::seconds(1)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.until()
    }
}

/// A reporting week: Monday 00:00:00 through Sunday 23:59:59 in the reporting timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    /// 1-based; week 1 contains the earliest observed timestamp.
    pub week: u32,
    #[serde(flatten)]
    pub window: TimeWindow,
}

/// Contiguous week windows covering every timestamp, anchored on the data
/// rather than a fixed calendar start. Empty input yields no weeks.
pub fn week_windows(timestamps: &[DateTime<Utc>], offset: FixedOffset) -> Vec<WeekWindow> {
    let (Some(first), Some(last)) = (timestamps.iter().min(), timestamps.iter().max()) else {
        return Vec::new();
    };

    let local_date = first.with_timezone(&offset).date_naive();
    let monday = local_date - TimeDelta::days(local_date.weekday().num_days_from_monday() as i64);
    let mut start = (monday.and_time(NaiveTime::MIN)
        - TimeDelta::seconds(offset.local_minus_utc() as i64))
    .and_utc();

    let mut weeks = Vec::new();
    while start <= *last {
        weeks.push(WeekWindow {
            week: weeks.len() as u32 + 1,
            window: TimeWindow {
                start,
                end: start + TimeDelta::weeks(1) - TimeDelta::seconds(1),
            },
        });
        start += TimeDelta::weeks(1);
    }
    weeks
}

/// The window for a 1-based week index, if the data reaches that far.
pub fn select_week(weeks: &[WeekWindow], week: u32) -> Option<WeekWindow> {
    weeks.iter().find(|w| w.week == week).copied()
}
