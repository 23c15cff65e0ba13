use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use formats::Feature;
use foundation::time::{Time, TimeSpan};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::analysis::TemporalAnalysis;

pub const LAST_YEAR: i32 = 1912;
const EXCLUDED_PREFIXES: [&str; 2] = ["ak", "hi"];

/// Epoch milliseconds from a numeric timestamp, an RFC 3339 string, or a
/// bare `YYYY-MM-DD` / `YYYY/MM/DD` date (taken as midnight UTC).
pub fn parse_date(value: &Value) -> Option<Time> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .map(Time),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(Time(dt.timestamp_millis()));
            }
            ["%Y-%m-%d", "%Y/%m/%d"].iter().find_map(|fmt| {
                let date = NaiveDate::parse_from_str(s, fmt).ok()?;
                let dt = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
                Some(Time(dt.timestamp_millis()))
            })
        }
        _ => None,
    }
}

fn year_of(t: Time) -> Option<i32> {
    DateTime::from_timestamp_millis(t.0).map(|dt| dt.year())
}

/// Start and end of a normalized territory.
pub fn territory_span(feature: &Feature) -> Option<TimeSpan> {
    let start = feature.property("startDate")?.as_i64()?;
    let end = feature.property("endDate")?.as_i64()?;
    Some(TimeSpan::new(Time(start), Time(end)))
}

fn normalize(feature: &Feature, index: usize) -> Option<Feature> {
    let id = feature.property_str("ID").unwrap_or_default();
    if EXCLUDED_PREFIXES.iter().any(|p| id.starts_with(p)) {
        return None;
    }

    let date = |key: &str| {
        let parsed = feature.property(key).and_then(parse_date);
        if parsed.is_none() {
            warn!(index, id, key, "unparseable territory date, skipping");
        }
        parsed
    };
    let start = date("START_DATE")?;
    let end = date("END_DATE")?;
    if year_of(start)? > LAST_YEAR {
        return None;
    }

    let field = |key: &str| feature.property(key).cloned().unwrap_or(Value::Null);
    let mut props = Map::new();
    props.insert("id".to_string(), field("ID"));
    props.insert("name".to_string(), field("NAME"));
    props.insert("startDate".to_string(), json!(start.0));
    props.insert("endDate".to_string(), json!(end.0));
    props.insert("territoryType".to_string(), field("TERR_TYPE"));

    Some(Feature {
        id: feature.id.clone(),
        properties: props,
        geometry: feature.geometry.clone(),
    })
}

/// Normalizes raw territory records, keeps those that began by 1912 outside
/// Alaska and Hawaii, and sorts them by start date.
pub fn normalize_territories(raw: &[Feature]) -> Vec<Feature> {
    let mut out: Vec<Feature> = raw
        .iter()
        .enumerate()
        .filter_map(|(index, f)| normalize(f, index))
        .collect();
    out.sort_by_key(|f| territory_span(f).map(|s| s.start));
    out
}

/// For each decade from `from` through `to` (inclusive), the territories in
/// force on January 1 of that year.
pub fn decade_slices(territories: &[Feature], from: i32, to: i32, step: usize) -> Vec<(i32, Vec<Feature>)> {
    (from..=to)
        .step_by(step.max(1))
        .filter_map(|decade| {
            let instant = TemporalAnalysis::year_start(decade)?;
            let members = territories
                .iter()
                .filter(|t| {
                    territory_span(t).is_some_and(|span| TemporalAnalysis::contains(span, instant))
                })
                .cloned()
                .collect();
            Some((decade, members))
        })
        .collect()
}
