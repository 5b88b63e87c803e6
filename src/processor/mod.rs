use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use thiserror::Error;

use crate::processor::column::ColumnType;

pub mod column;
pub mod table;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow2::error::Error),

    #[error("Schema/parse error: {0}")]
    Parse(String),

    #[error("{path}: {count} malformed row(s), first at line {first_row}: {first_error}")]
    MalformedRows {
        path: String,
        count: usize,
        first_row: usize,
        first_error: String,
    },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column '{column}' is {found:?}, expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: ColumnType,
    },

    #[error("Column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Predicate & column-type combination not supported: {0:?}")]
    UnsupportedPredicate(ColumnType),

    #[error("Invalid date in column '{column}' at row {row}: '{value}'")]
    InvalidDate {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Invalid date boundary: '{0}'")]
    InvalidBoundary(String),

    #[error("Join key '{column}' is {left:?} on one side and {right:?} on the other")]
    KeyTypeMismatch {
        column: String,
        left: ColumnType,
        right: ColumnType,
    },

    #[error("Ambiguous hierarchy in {table}: key {key} maps to both '{first}' and '{second}'")]
    AmbiguousHierarchy {
        table: &'static str,
        key: String,
        first: String,
        second: String,
    },

    #[error("Schema metadata missing columns: {}", .0.join(", "))]
    MissingMetadataColumns(Vec<String>),

    #[error("Schema metadata is missing required columns for sales summary: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("Value '{value}' in column '{column}' cannot be written as CSV")]
    UnwritableValue { column: String, value: String },
}

#[derive(Debug, Default)]
pub struct ParseSummary {
    pub rows_processed: usize,
    pub errors: Vec<ParseError>,
}

impl ParseSummary {
    /// Turns skipped rows into an error. Returns the number of loaded rows otherwise.
    pub fn ensure_clean(self, path: &str) -> Result<usize, ProcessorError> {
        match self.errors.first() {
            None => Ok(self.rows_processed),
            Some(first) => Err(ProcessorError::MalformedRows {
                path: path.to_string(),
                count: self.errors.len(),
                first_row: first.row,
                first_error: first.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// 1-based line in the source file (the header is line 1)
    pub row: usize,
    pub column: String,
    pub value: String,
    pub error: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{} '{}': {}", self.column, self.value, self.error)
        }
    }
}

/// Single cell value, used for predicates, join keys and random access
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer column
    Int(i64),
    /// Float column
    Float(f64),
    /// String column
    Str(String),
    /// Timestamp column
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int64,
            Value::Float(_) => ColumnType::Float64,
            Value::Str(_) => ColumnType::Str,
            Value::Timestamp(_) => ColumnType::Timestamp,
        }
    }

    /// Ordering between comparable values; ints and floats compare numerically.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Timestamp(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

/// Filter predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterPredicate {
    Equals(Value),
    GreaterThan(Value),
    LessThan(Value),
    /// Inclusive on both ends
    Between(Value, Value),
}

impl FilterPredicate {
    /// `None` when the operands cannot be compared with `value`.
    pub fn matches(&self, value: &Value) -> Option<bool> {
        match self {
            FilterPredicate::Equals(target) => value.compare(target).map(Ordering::is_eq),
            FilterPredicate::GreaterThan(target) => value.compare(target).map(Ordering::is_gt),
            FilterPredicate::LessThan(target) => value.compare(target).map(Ordering::is_lt),
            FilterPredicate::Between(low, high) => {
                let above = value.compare(low)?.is_ge();
                let below = value.compare(high)?.is_le();
                Some(above && below)
            }
        }
    }

    fn operand_type(&self) -> ColumnType {
        match self {
            FilterPredicate::Equals(v)
            | FilterPredicate::GreaterThan(v)
            | FilterPredicate::LessThan(v)
            | FilterPredicate::Between(v, _) => v.column_type(),
        }
    }

    /// Whether the predicate can be evaluated against a column of `column_type`.
    pub fn supports(&self, column_type: ColumnType) -> bool {
        let operands_agree = match self {
            FilterPredicate::Between(low, high) => low.compare(high).is_some(),
            _ => true,
        };
        operands_agree
            && match (self.operand_type(), column_type) {
                (ColumnType::Int64 | ColumnType::Float64, ColumnType::Int64 | ColumnType::Float64) => {
                    true
                }
                (a, b) => a == b,
            }
    }
}
