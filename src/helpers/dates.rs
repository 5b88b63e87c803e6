use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// A parsed timestamp that remembers whether the text carried a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTimestamp {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl ParsedTimestamp {
    pub fn start_of_day(self) -> NaiveDateTime {
        match self {
            ParsedTimestamp::Date(date) => date.and_time(NaiveTime::MIN),
            ParsedTimestamp::DateTime(ts) => ts,
        }
    }
}

pub fn parse_timestamp_text(text: &str) -> Option<ParsedTimestamp> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(ParsedTimestamp::Date(date));
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(ParsedTimestamp::DateTime(ts));
        }
    }

    // Offsets are normalized to UTC
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ParsedTimestamp::DateTime(ts.naive_utc()))
}

/// Parses an order-date cell. Date-only text means midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    parse_timestamp_text(text).map(ParsedTimestamp::start_of_day)
}

/// Last representable instant of `date`.
pub fn end_of_day(date: NaiveDate) -> Option<NaiveDateTime> {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).map(|t| date.and_time(t))
}
