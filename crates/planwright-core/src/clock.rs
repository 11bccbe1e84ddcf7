use chrono::{SecondsFormat, Utc};

/// Today's date as `YYYY-MM-DD` (UTC).
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Current instant as RFC 3339 with second precision, e.g. `2026-10-18T08:30:00Z`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
