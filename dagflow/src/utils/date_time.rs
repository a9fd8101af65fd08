use chrono::{DateTime, Local, Utc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const FMT_DATE_TIME_1: &str = "%Y-%m-%dT%T%.3f";

/// current timestamp, zero if the clock is before the epoch
pub fn current_timestamp() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

pub fn current_timestamp_millis() -> u64 {
    current_timestamp().as_millis() as u64
}

pub fn fmt_date_time(dur: Duration, fmt: &str) -> String {
    let utc_dt: DateTime<Utc> = (UNIX_EPOCH + dur).into();
    let local_dt = utc_dt.with_timezone(&Local);
    local_dt.format(fmt).to_string()
}

/// for timestamp debug print
pub fn timestamp_str(timestamp: u64) -> String {
    format!(
        "{}({})",
        fmt_date_time(Duration::from_millis(timestamp), FMT_DATE_TIME_1),
        timestamp
    )
}
