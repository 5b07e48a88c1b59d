use std::fmt::Display;

use chrono::TimeZone;

use crate::parse_timestamp;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size in base-1024 units, rounded to two decimals (`1.5 KB`).
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut scale = 1u64;
    while unit + 1 < SIZE_UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }
    let value = (bytes as f64 / scale as f64 * 100.0).round() / 100.0;
    format!("{} {}", value, SIZE_UNITS[unit])
}

/// `Oct 16, 2026, 14:05` in `tz`, or the raw text when it cannot be parsed.
pub fn format_timestamp<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match parse_timestamp(raw, tz) {
        Some(at) => at
            .with_timezone(tz)
            .format("%b %-d, %Y, %H:%M")
            .to_string(),
        None => raw.to_string(),
    }
}
