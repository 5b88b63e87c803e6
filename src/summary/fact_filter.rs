use chrono::{NaiveDate, NaiveDateTime};
use std::borrow::Cow;
use tracing::debug;

use crate::{
    helpers::dates::{ParsedTimestamp, end_of_day, parse_timestamp, parse_timestamp_text},
    processor::{
        FilterPredicate, ProcessorError, Value,
        column::{Column, ColumnType},
        table::Table,
    },
    summary::ORDER_DATE,
};

/// A date-range boundary as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

impl Boundary {
    fn resolve(&self) -> Result<ParsedTimestamp, ProcessorError> {
        match self {
            Boundary::Date(date) => Ok(ParsedTimestamp::Date(*date)),
            Boundary::DateTime(ts) => Ok(ParsedTimestamp::DateTime(*ts)),
            Boundary::Text(text) => parse_timestamp_text(text)
                .ok_or_else(|| ProcessorError::InvalidBoundary(text.clone())),
        }
    }
}

impl From<NaiveDate> for Boundary {
    fn from(date: NaiveDate) -> Self {
        Boundary::Date(date)
    }
}

impl From<NaiveDateTime> for Boundary {
    fn from(ts: NaiveDateTime) -> Self {
        Boundary::DateTime(ts)
    }
}

impl From<&str> for Boundary {
    fn from(text: &str) -> Self {
        Boundary::Text(text.to_string())
    }
}

impl From<String> for Boundary {
    fn from(text: String) -> Self {
        Boundary::Text(text)
    }
}

impl From<&String> for Boundary {
    fn from(text: &String) -> Self {
        Boundary::Text(text.clone())
    }
}

/// Inclusive order-date window.
///
/// A start given as a bare date means midnight of that day. An end given as
/// a bare date covers that whole calendar day; an end carrying a time of day
/// is that exact instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: impl Into<Boundary>, end: impl Into<Boundary>) -> Result<Self, ProcessorError> {
        let start = start.into().resolve()?.start_of_day();
        let end = match end.into().resolve()? {
            ParsedTimestamp::Date(date) => end_of_day(date)
                .ok_or_else(|| ProcessorError::InvalidBoundary(date.to_string()))?,
            ParsedTimestamp::DateTime(ts) => ts,
        };
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }

    pub fn as_predicate(&self) -> FilterPredicate {
        FilterPredicate::Between(Value::Timestamp(self.start), Value::Timestamp(self.end))
    }
}

/// Parses every order date of `column`. Fails on the first unparseable one.
pub fn parse_order_dates(column: &Column) -> Result<Cow<'_, Column>, ProcessorError> {
    if column.column_type() == ColumnType::Timestamp {
        return Ok(Cow::Borrowed(column));
    }

    let texts = column.iter_str().ok_or(ProcessorError::ColumnType {
        column: ORDER_DATE.to_string(),
        expected: "timestamp or date string",
        found: column.column_type(),
    })?;

    let parsed = texts
        .enumerate()
        .map(|(row, text)| {
            parse_timestamp(text).ok_or_else(|| ProcessorError::InvalidDate {
                column: ORDER_DATE.to_string(),
                row,
                value: text.to_string(),
            })
        })
        .collect::<Result<Vec<NaiveDateTime>, _>>()?;

    Ok(Cow::Owned(Column::from(parsed)))
}

/// Indices of fact rows whose order date lies within `range`, in table order.
///
/// # Errors
/// [`ProcessorError::InvalidDate`] if any order date, in range or not,
/// cannot be parsed. No rows are skipped.
pub fn filter_by_order_date(fact: &Table, range: &DateRange) -> Result<Vec<usize>, ProcessorError> {
    let order_dates = parse_order_dates(fact.get_col(ORDER_DATE)?)?;
    let rows = order_dates.filter(&range.as_predicate())?;

    debug!(total = fact.row_count(), kept = rows.len(), "filtered facts by order date");
    Ok(rows)
}
