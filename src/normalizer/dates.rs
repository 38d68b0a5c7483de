use chrono::{
    DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone, Utc,
};

use crate::app::{EstuaryError, Result};

/// Site timezone settings of the target publishing system.
///
/// A named zone takes priority; otherwise a fixed offset is derived from the
/// numeric GMT offset (fractional hours allowed, sign-aware).
#[derive(Debug, Clone, Default)]
pub struct TimezoneConfig {
    pub timezone_name: Option<String>,
    pub gmt_offset: f64,
}

/// Formats tried in order when no format hint is given.
///
/// Offset-aware formats are parsed as such; naive formats are taken as UTC.
const AUTO_DETECT_FORMATS: [(&str, DateKind); 7] = [
    // ISO 8601 with fractional seconds and offset.
    ("%Y-%m-%dT%H:%M:%S%.f%:z", DateKind::Offset),
    // ISO 8601 with offset.
    ("%Y-%m-%dT%H:%M:%S%:z", DateKind::Offset),
    // Millisecond-precision Z-suffixed format (Medium-style exports).
    ("%Y-%m-%dT%H:%M:%S%.3fZ", DateKind::NaiveUtc),
    // ISO 8601 Z-suffixed UTC.
    ("%Y-%m-%dT%H:%M:%SZ", DateKind::NaiveUtc),
    // Twitter-style format, e.g. "Mon Jan 15 10:30:00 +0000 2024".
    ("%a %b %d %H:%M:%S %z %Y", DateKind::Offset),
    // Generic datetime.
    ("%Y-%m-%d %H:%M:%S", DateKind::NaiveUtc),
    // Date only.
    ("%Y-%m-%d", DateKind::DateOnly),
];

#[derive(Clone, Copy)]
enum DateKind {
    Offset,
    NaiveUtc,
    DateOnly,
}

/// Parses dates from the many formats platforms emit into UTC timestamps.
#[derive(Debug, Clone, Default)]
pub struct DateConverter {
    timezone: TimezoneConfig,
}

impl DateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timezone(timezone: TimezoneConfig) -> Self {
        Self { timezone }
    }

    /// Convert a date string to a UTC timestamp.
    ///
    /// Purely numeric strings are Unix epochs; 13 or more digits means
    /// milliseconds. The cutoff is digit count, not magnitude.
    /// With a `format` hint only that format is accepted. Without
    /// one the known formats are tried in priority order, then RFC 3339 and
    /// RFC 2822 as a free-form fallback.
    pub fn convert(&self, date_string: &str, format: Option<&str>) -> Result<DateTime<Utc>> {
        let date_string = date_string.trim();

        if date_string.is_empty() {
            return Err(EstuaryError::Parse("date string cannot be empty".into()));
        }

        if date_string.bytes().all(|b| b.is_ascii_digit()) {
            return self.convert_timestamp(date_string);
        }

        if let Some(format) = format {
            return parse_with_format(date_string, format, None).ok_or_else(|| {
                EstuaryError::Parse(format!(
                    "could not parse date \"{date_string}\" with format \"{format}\""
                ))
            });
        }

        for (try_format, kind) in AUTO_DETECT_FORMATS {
            if let Some(date) = parse_with_format(date_string, try_format, Some(kind)) {
                return Ok(date);
            }
        }

        // Free-form fallback.
        if let Ok(date) = DateTime::parse_from_rfc3339(date_string) {
            return Ok(date.with_timezone(&Utc));
        }
        if let Ok(date) = DateTime::parse_from_rfc2822(date_string) {
            return Ok(date.with_timezone(&Utc));
        }

        Err(EstuaryError::Parse(format!(
            "could not parse date string: {date_string}"
        )))
    }

    fn convert_timestamp(&self, timestamp: &str) -> Result<DateTime<Utc>> {
        let mut seconds: i64 = timestamp
            .parse()
            .map_err(|_| EstuaryError::Parse(format!("timestamp out of range: {timestamp}")))?;

        // Thirteen or more digits means milliseconds.
        if timestamp.len() >= 13 {
            seconds /= 1000;
        }

        Utc.timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| EstuaryError::Parse(format!("timestamp out of range: {timestamp}")))
    }

    /// Format for the target system's content store (`YYYY-MM-DD HH:MM:SS`).
    pub fn to_storage_format(&self, date: &DateTime<Utc>) -> String {
        date.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Normalize any offset-carrying date to UTC.
    pub fn to_utc<Tz: TimeZone>(&self, date: &DateTime<Tz>) -> DateTime<Utc> {
        date.with_timezone(&Utc)
    }

    pub fn to_timezone<Tz: TimeZone>(&self, date: &DateTime<Utc>, timezone: &Tz) -> DateTime<Tz> {
        date.with_timezone(timezone)
    }

    /// Parse relative phrases like "2 days ago" or "yesterday".
    pub fn parse_relative(&self, relative: &str) -> Result<DateTime<Utc>> {
        let relative = relative.trim().to_lowercase();

        if relative.is_empty() {
            return Err(EstuaryError::Parse(
                "relative date string cannot be empty".into(),
            ));
        }

        let now = Utc::now();
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc());

        match relative.as_str() {
            "now" => return Ok(now),
            "today" => {
                if let Some(date) = midnight {
                    return Ok(date);
                }
            }
            "yesterday" => {
                if let Some(date) = midnight {
                    return Ok(date - Duration::days(1));
                }
            }
            "tomorrow" => {
                if let Some(date) = midnight {
                    return Ok(date + Duration::days(1));
                }
            }
            _ => {}
        }

        let pattern = regex::Regex::new(r"^(\d+)\s+(second|minute|hour|day|week|month|year)s?\s+ago$")
            .expect("relative date pattern is valid");

        if let Some(captures) = pattern.captures(&relative) {
            let amount: i64 = captures[1]
                .parse()
                .map_err(|_| EstuaryError::Parse(format!("amount out of range: {relative}")))?;

            let result = match &captures[2] {
                "second" => now.checked_sub_signed(Duration::seconds(amount)),
                "minute" => now.checked_sub_signed(Duration::minutes(amount)),
                "hour" => now.checked_sub_signed(Duration::hours(amount)),
                "day" => now.checked_sub_signed(Duration::days(amount)),
                "week" => now.checked_sub_signed(Duration::weeks(amount)),
                "month" => now.checked_sub_months(Months::new(amount as u32)),
                "year" => now.checked_sub_months(Months::new(amount as u32 * 12)),
                _ => None,
            };

            return result
                .ok_or_else(|| EstuaryError::Parse(format!("relative date out of range: {relative}")));
        }

        Err(EstuaryError::Parse(format!(
            "could not parse relative date: {relative}"
        )))
    }

    /// Timezone of the target site.
    ///
    /// A configured zone name wins when it parses as an offset spelling
    /// (`UTC`, `+05:30`, `-0800`); otherwise the numeric GMT offset is used.
    pub fn site_timezone(&self) -> FixedOffset {
        if let Some(name) = self.timezone.timezone_name.as_deref() {
            if let Some(offset) = parse_offset_name(name) {
                return offset;
            }
        }

        let seconds = (self.timezone.gmt_offset * 3600.0).round() as i32;
        FixedOffset::east_opt(seconds).unwrap_or_else(|| {
            FixedOffset::east_opt(0).expect("zero offset is always valid")
        })
    }

    pub fn to_site_timezone(&self, date: &DateTime<Utc>) -> DateTime<FixedOffset> {
        date.with_timezone(&self.site_timezone())
    }
}

fn parse_with_format(
    date_string: &str,
    format: &str,
    kind: Option<DateKind>,
) -> Option<DateTime<Utc>> {
    match kind {
        Some(DateKind::Offset) => DateTime::parse_from_str(date_string, format)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        Some(DateKind::NaiveUtc) => NaiveDateTime::parse_from_str(date_string, format)
            .ok()
            .map(|d| d.and_utc()),
        Some(DateKind::DateOnly) => NaiveDate::parse_from_str(date_string, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc()),
        // Caller-supplied format: try offset-aware, then naive, then date-only.
        None => DateTime::parse_from_str(date_string, format)
            .ok()
            .map(|d| d.with_timezone(&Utc))
            .or_else(|| {
                NaiveDateTime::parse_from_str(date_string, format)
                    .ok()
                    .map(|d| d.and_utc())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(date_string, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc())
            }),
    }
}

fn parse_offset_name(name: &str) -> Option<FixedOffset> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if name.eq_ignore_ascii_case("utc") || name.eq_ignore_ascii_case("gmt") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match name.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };

    let (hours, minutes) = if let Some((h, m)) = rest.split_once(':') {
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else if rest.len() == 4 {
        (rest[..2].parse().ok()?, rest[2..].parse().ok()?)
    } else {
        (rest.parse::<i32>().ok()?, 0)
    };

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
