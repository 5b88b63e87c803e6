use chrono::NaiveDateTime;

use crate::processor::{FilterPredicate, ProcessorError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int64,
    Float64,
    Str,
    Timestamp,
}

/// Chunked column storage. Each chunk is one parsed batch; see [`Column::flatten_in_place`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Vec<Vec<i64>>),
    Float64(Vec<Vec<f64>>),
    Str(Vec<Vec<String>>),
    Timestamp(Vec<Vec<NaiveDateTime>>),
}

impl Column {
    pub fn new(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Int64 => Column::Int64(Vec::new()),
            ColumnType::Float64 => Column::Float64(Vec::new()),
            ColumnType::Str => Column::Str(Vec::new()),
            ColumnType::Timestamp => Column::Timestamp(Vec::new()),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::Float64(_) => ColumnType::Float64,
            Column::Str(_) => ColumnType::Str,
            Column::Timestamp(_) => ColumnType::Timestamp,
        }
    }

    /// Moves the chunks of `other` to the end of this column.
    pub fn append(&mut self, other: Column) -> Result<(), ProcessorError> {
        match (self, other) {
            (Column::Int64(chunks), Column::Int64(more)) => chunks.extend(more),
            (Column::Float64(chunks), Column::Float64(more)) => chunks.extend(more),
            (Column::Str(chunks), Column::Str(more)) => chunks.extend(more),
            (Column::Timestamp(chunks), Column::Timestamp(more)) => chunks.extend(more),
            (this, other) => {
                return Err(ProcessorError::Parse(format!(
                    "cannot append {:?} chunk to {:?} column",
                    other.column_type(),
                    this.column_type()
                )));
            }
        }
        Ok(())
    }

    // Efficient iteration
    pub fn iter_str(&self) -> Option<impl Iterator<Item = &str> + '_> {
        match self {
            Column::Str(chunks) => Some(chunks.iter().flat_map(|chunk| chunk.iter().map(String::as_str))),
            _ => None,
        }
    }

    /// Numeric values widened to `f64`; `None` for non-numeric columns.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Column::Int64(chunks) => Some(chunks.iter().flatten().map(|&v| v as f64).collect()),
            Column::Float64(chunks) => Some(chunks.iter().flatten().copied().collect()),
            _ => None,
        }
    }

    pub fn to_values(&self) -> Vec<Value> {
        match self {
            Column::Int64(chunks) => chunks.iter().flatten().map(|&v| Value::Int(v)).collect(),
            Column::Float64(chunks) => chunks.iter().flatten().map(|&v| Value::Float(v)).collect(),
            Column::Str(chunks) => chunks.iter().flatten().map(|v| Value::Str(v.clone())).collect(),
            Column::Timestamp(chunks) => {
                chunks.iter().flatten().map(|&v| Value::Timestamp(v)).collect()
            }
        }
    }

    // Random access
    pub fn get(&self, idx: usize) -> Option<Value> {
        match self {
            Column::Int64(chunks) => locate(chunks, idx).map(|v| Value::Int(*v)),
            Column::Float64(chunks) => locate(chunks, idx).map(|v| Value::Float(*v)),
            Column::Str(chunks) => locate(chunks, idx).map(|v| Value::Str(v.clone())),
            Column::Timestamp(chunks) => locate(chunks, idx).map(|v| Value::Timestamp(*v)),
        }
    }

    pub fn total_len(&self) -> usize {
        match self {
            Column::Int64(chunks) => chunks.iter().map(|c| c.len()).sum(),
            Column::Float64(chunks) => chunks.iter().map(|c| c.len()).sum(),
            Column::Str(chunks) => chunks.iter().map(|c| c.len()).sum(),
            Column::Timestamp(chunks) => chunks.iter().map(|c| c.len()).sum(),
        }
    }

    pub fn flatten_in_place(&mut self) {
        match self {
            Column::Int64(chunks) => flatten(chunks),
            Column::Float64(chunks) => flatten(chunks),
            Column::Str(chunks) => flatten(chunks),
            Column::Timestamp(chunks) => flatten(chunks),
        }
    }

    /// Row indices (in order) whose value satisfies `predicate`.
    pub fn filter(&self, predicate: &FilterPredicate) -> Result<Vec<usize>, ProcessorError> {
        if !predicate.supports(self.column_type()) {
            return Err(ProcessorError::UnsupportedPredicate(self.column_type()));
        }

        let keep = |value: Value| predicate.matches(&value) == Some(true);
        let out = match self {
            Column::Int64(chunks) => positions(chunks, |v| keep(Value::Int(*v))),
            Column::Float64(chunks) => positions(chunks, |v| keep(Value::Float(*v))),
            Column::Str(chunks) => positions(chunks, |v| keep(Value::Str(v.clone()))),
            Column::Timestamp(chunks) => positions(chunks, |v| keep(Value::Timestamp(*v))),
        };
        Ok(out)
    }
}

fn locate<T>(chunks: &[Vec<T>], idx: usize) -> Option<&T> {
    let mut remaining = idx;
    for chunk in chunks {
        if remaining < chunk.len() {
            return Some(&chunk[remaining]);
        }
        remaining -= chunk.len();
    }
    None
}

fn positions<T>(chunks: &[Vec<T>], mut keep: impl FnMut(&T) -> bool) -> Vec<usize> {
    chunks
        .iter()
        .flatten()
        .enumerate()
        .filter_map(|(i, v)| keep(v).then_some(i))
        .collect()
}

fn flatten<T>(chunks: &mut Vec<Vec<T>>) {
    if chunks.len() <= 1 {
        return; // Already flat
    }

    // Take ownership of chunks, leaving empty vec
    let mut owned_chunks = std::mem::take(chunks);
    let mut flattened = owned_chunks.remove(0);
    let total: usize = owned_chunks.iter().map(|c| c.len()).sum();
    flattened.reserve(total);

    for chunk in owned_chunks {
        flattened.extend(chunk);
    }

    chunks.push(flattened);
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Int64(vec![values])
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Float64(vec![values])
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Column::Str(vec![values])
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Column::Str(vec![values.into_iter().map(str::to_string).collect()])
    }
}

impl From<Vec<NaiveDateTime>> for Column {
    fn from(values: Vec<NaiveDateTime>) -> Self {
        Column::Timestamp(vec![values])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked_ints() -> Column {
        Column::Int64(vec![vec![1, 2], vec![], vec![3, 4, 5]])
    }

    #[test]
    fn test_random_access_across_chunks() {
        let col = chunked_ints();
        assert_eq!(col.total_len(), 5);
        assert_eq!(col.get(2), Some(Value::Int(3)));
        assert_eq!(col.get(4), Some(Value::Int(5)));
        assert_eq!(col.get(5), None);
    }

    #[test]
    fn test_flatten_keeps_order() {
        let mut col = chunked_ints();
        col.flatten_in_place();
        assert_eq!(col, Column::Int64(vec![vec![1, 2, 3, 4, 5]]));
    }

    #[test]
    fn test_filter_greater_than() {
        let col = chunked_ints();
        let rows = col.filter(&FilterPredicate::GreaterThan(Value::Int(2))).unwrap();
        assert_eq!(rows, vec![2, 3, 4]);
    }

    #[test]
    fn test_filter_equals_on_strings() {
        let col = Column::from(vec!["Bikes", "Clothing", "Bikes"]);
        let rows = col
            .filter(&FilterPredicate::Equals(Value::Str("Bikes".into())))
            .unwrap();
        assert_eq!(rows, vec![0, 2]);
    }

    #[test]
    fn test_filter_less_than_on_floats() {
        let col = Column::from(vec![10.0_f64, 0.5, 3.25]);
        let rows = col.filter(&FilterPredicate::LessThan(Value::Int(4))).unwrap();
        assert_eq!(rows, vec![1, 2]);
    }

    #[test]
    fn test_filter_rejects_mismatched_operand() {
        let col = Column::from(vec!["a", "b"]);
        let err = col
            .filter(&FilterPredicate::GreaterThan(Value::Int(1)))
            .unwrap_err();
        assert!(matches!(err, ProcessorError::UnsupportedPredicate(ColumnType::Str)));
    }

    #[test]
    fn test_append_type_mismatch() {
        let mut col = chunked_ints();
        assert!(col.append(Column::from(vec![1.0_f64])).is_err());
        assert!(col.append(Column::from(vec![6_i64])).is_ok());
        assert_eq!(col.total_len(), 6);
    }

    #[test]
    fn test_to_f64_widens_ints() {
        assert_eq!(chunked_ints().to_f64_vec(), Some(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(Column::from(vec!["x"]).to_f64_vec(), None);
    }
}
