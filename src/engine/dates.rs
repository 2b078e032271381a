//! Chapter upload timestamps.

use chrono::NaiveDateTime;

const CHAPTER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse `YYYY-MM-DD HH:mm:ss` (UTC) into epoch milliseconds.
///
/// Returns `0` ("upload time unknown") for absent, blank or malformed input.
pub fn parse_chapter_date(raw: Option<&str>) -> i64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0;
    };
    NaiveDateTime::parse_from_str(raw, CHAPTER_DATE_FORMAT)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}
