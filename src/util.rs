use std::fmt::Display;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Current wall-clock time as fractional seconds since epoch, the unit the backend uses
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// 1234567 -> "1,234,567"
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Rates are shown rounded to whole signatures
pub fn format_rate(rate: f64) -> String {
    let rounded = rate.round();
    if rounded < 0.0 {
        format!("-{}", format_thousands(rounded.abs() as u64))
    } else {
        format_thousands(rounded as u64)
    }
}

pub fn format_percentage(pct: f64) -> String {
    format!("{pct:.2}%")
}

/// Wall-clock time of an epoch timestamp in local time
pub fn format_clock(epoch_secs: f64) -> String {
    format_clock_in(epoch_secs, &Local)
}

pub fn format_clock_in<Tz: TimeZone>(epoch_secs: f64, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    let millis = (epoch_secs * 1000.0).round() as i64;
    match Utc.timestamp_millis_opt(millis).single() {
        Some(utc) => utc.with_timezone(tz).format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}

/// The backend reports completion as naive UTC ("%Y-%m-%d %H:%M:%S") or RFC 3339.
pub fn parse_completion_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_completion(raw: &str) -> String {
    format_completion_in(raw, &Local)
}

/// Unparseable dates are shown verbatim rather than dropped
pub fn format_completion_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    match parse_completion_date(raw) {
        Some(utc) => utc.with_timezone(tz).format("%B %-d, %Y %H:%M").to_string(),
        None => raw.to_string(),
    }
}
