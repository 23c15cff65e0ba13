use chrono::{NaiveDate, TimeZone, Utc};
use foundation::time::{Time, TimeSpan};

pub struct TemporalAnalysis;

impl TemporalAnalysis {
    pub fn contains(span: TimeSpan, t: Time) -> bool {
        span.contains(t)
    }

    /// Midnight UTC on January 1 of `year`.
    pub fn year_start(year: i32) -> Option<Time> {
        let date = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let dt = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
        Some(Time(dt.timestamp_millis()))
    }
}
