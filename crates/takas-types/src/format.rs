//! Turkish relative-time strings shown next to ads and responses.

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Whole seconds from `from` to `to`, rounding half up like a browser clock.
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let millis = (to - from).num_milliseconds() as f64;
    (millis / 1000.0 + 0.5).floor() as i64
}

fn largest_unit(seconds: i64, tail: &str) -> String {
    let days = seconds / DAY;
    let hours = (seconds % DAY) / HOUR;
    let minutes = (seconds % HOUR) / MINUTE;
    let secs = seconds % MINUTE;

    if days > 0 {
        format!("{days}g {tail}")
    } else if hours > 0 {
        format!("{hours}sa {tail}")
    } else if minutes > 0 {
        format!("{minutes}dk {tail}")
    } else {
        format!("{secs}sn {tail}")
    }
}

/// How long ago `ts` was, e.g. `3sa önce`.
pub fn time_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = seconds_between(ts, now);
    // Timestamps slightly in the future come from clock skew.
    if seconds < 0 {
        return "az önce".to_string();
    }
    largest_unit(seconds, "önce")
}

/// Expiry countdown, e.g. `6g kaldı`, or `süresi doldu` once past.
pub fn time_left(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = seconds_between(now, ts);
    if seconds < 0 {
        return "süresi doldu".to_string();
    }
    largest_unit(seconds, "kaldı")
}

/// Coarser, rounded variant used on the activity page.
pub fn time_ago_short(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = seconds_between(ts, now);
    if seconds < 5 {
        return "az önce".to_string();
    }
    if seconds < MINUTE {
        return format!("{seconds}sn önce");
    }
    let minutes = round_div(seconds, MINUTE);
    if minutes < 60 {
        return format!("{minutes}dk önce");
    }
    let hours = round_div(minutes, 60);
    if hours < 24 {
        return format!("{hours}sa önce");
    }
    format!("{}g önce", round_div(hours, 24))
}

fn round_div(value: i64, by: i64) -> i64 {
    (value as f64 / by as f64).round() as i64
}
