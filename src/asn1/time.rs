//! UTCTime / GeneralizedTime parsing per X.690, restricted to the DER forms
//! actually emitted by CAs and timestamp authorities: `YYMMDDHHMMSSZ` for
//! UTCTime and `YYYYMMDDHHMMSSZ` for GeneralizedTime, both UTC ("Z" suffix,
//! no fractional seconds, no explicit offsets) — the forms DER requires.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Parse a DER UTCTime content (`YYMMDDHHMMSSZ`, ASCII).
///
/// Two-digit years are windowed per X.509/RFC 5280: `00`-`49` -> 2000-2049,
/// `50`-`99` -> 1950-1999. Returns a plain error message (not `crate::Error`)
/// so callers can attach their own node offset.
pub fn parse_utc_time(content: &[u8]) -> Result<DateTime<Utc>, String> {
    let s = as_ascii(content)?;
    if s.len() != 13 || !s.ends_with('Z') {
        return Err(malformed(s));
    }
    let digits = &s[..12];
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(s));
    }
    let yy: u32 = digits[0..2].parse().map_err(|_| malformed(s))?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    parse_fields(s, year as i32, &digits[2..4], &digits[4..6], &digits[6..8], &digits[8..10], &digits[10..12])
}

/// Parse a DER GeneralizedTime content (`YYYYMMDDHHMMSSZ`, ASCII).
pub fn parse_generalized_time(content: &[u8]) -> Result<DateTime<Utc>, String> {
    let s = as_ascii(content)?;
    if s.len() != 15 || !s.ends_with('Z') {
        return Err(malformed(s));
    }
    let digits = &s[..14];
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(s));
    }
    let year: i32 = digits[0..4].parse().map_err(|_| malformed(s))?;
    parse_fields(s, year, &digits[4..6], &digits[6..8], &digits[8..10], &digits[10..12], &digits[12..14])
}

fn as_ascii(content: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(content).map_err(|_| "time value is not ASCII".to_string())
}

fn parse_fields(
    original: &str,
    year: i32,
    month: &str,
    day: &str,
    hour: &str,
    minute: &str,
    second: &str,
) -> Result<DateTime<Utc>, String> {
    let month: u32 = month.parse().map_err(|_| malformed(original))?;
    let day: u32 = day.parse().map_err(|_| malformed(original))?;
    let hour: u32 = hour.parse().map_err(|_| malformed(original))?;
    let minute: u32 = minute.parse().map_err(|_| malformed(original))?;
    let second: u32 = second.parse().map_err(|_| malformed(original))?;

    // NaiveDate/NaiveTime validate ranges themselves (e.g. seconds == 60 is
    // rejected, months/days out of range are rejected), so 20240115103060Z
    // fails here rather than silently wrapping.
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| malformed(original))?;
    let time = date.and_hms_opt(hour, minute, second).ok_or_else(|| malformed(original))?;
    match Utc.from_local_datetime(&time).single() {
        Some(dt) => Ok(dt),
        None => Err(malformed(original)),
    }
}

fn malformed(s: &str) -> String {
    format!("malformed time value: {s:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generalized_time_valid() {
        let dt = parse_generalized_time(b"20240115103000Z").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 10:30:00 UTC");
    }

    #[test]
    fn generalized_time_rejects_invalid_seconds() {
        assert!(parse_generalized_time(b"20240115103060Z").is_err());
    }

    #[test]
    fn utc_time_windows_two_digit_year() {
        let dt = parse_utc_time(b"240115103000Z").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 10:30:00 UTC");

        let dt_old = parse_utc_time(b"990115103000Z").unwrap();
        assert_eq!(dt_old.to_string(), "1999-01-15 10:30:00 UTC");
    }

    #[test]
    fn rejects_missing_z_suffix() {
        assert!(parse_utc_time(b"240115103000").is_err());
        assert!(parse_generalized_time(b"20240115103000").is_err());
    }

    #[test]
    fn rejects_non_digit_fields() {
        assert!(parse_utc_time(b"24AB15103000Z").is_err());
    }
}
