use arrow2::{
    array::{Array, Float64Array, Int64Array, MutableUtf8Array, Utf8Array},
    chunk::Chunk,
    datatypes::{DataType, Field, Schema, TimeUnit},
    io::ipc::write::{FileWriter, WriteOptions},
};
use chrono::NaiveDateTime;
use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::{
    collections::HashSet,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    str,
};
use tracing::debug;

use crate::{
    helpers::dates::parse_timestamp,
    processor::{
        ParseError, ParseSummary, ProcessorError, Value,
        column::{Column, ColumnType},
    },
};

/// In-memory columnar table: named columns of equal length.
///
/// Tables are either built directly with [`Table::from_columns`] or loaded
/// from CSV with [`Table::load_csv`].
///
/// # Examples
///
/// ```rust
/// # use sales_summary::processor::{column::Column, table::Table};
/// let table = Table::from_columns(vec![
///     ("ProductKey", Column::from(vec![1000_i64, 2000])),
///     ("SalesAmount", Column::from(vec![100.0_f64, 50.0])),
/// ])
/// .unwrap();
/// assert_eq!(table.row_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
    headers: Vec<String>,
}

/// Output of parsing one newline-aligned chunk of a CSV body
struct BatchResult {
    columns: Vec<Column>,
    row_count: usize,
    lines_seen: usize,
    errors: Vec<ParseError>,
}

enum ChunkBuilder {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Str(Vec<String>),
    Timestamp(Vec<NaiveDateTime>),
}

impl ChunkBuilder {
    fn with_capacity(column_type: ColumnType, capacity: usize) -> Self {
        match column_type {
            ColumnType::Int64 => ChunkBuilder::Int64(Vec::with_capacity(capacity)),
            ColumnType::Float64 => ChunkBuilder::Float64(Vec::with_capacity(capacity)),
            ColumnType::Str => ChunkBuilder::Str(Vec::with_capacity(capacity)),
            ColumnType::Timestamp => ChunkBuilder::Timestamp(Vec::with_capacity(capacity)),
        }
    }

    fn push_field(&mut self, field: &[u8]) -> Result<(), String> {
        match self {
            ChunkBuilder::Int64(values) => {
                values.push(atoi_simd::parse::<i64>(field).map_err(|e| e.to_string())?)
            }
            ChunkBuilder::Float64(values) => {
                values.push(fast_float::parse::<f64, _>(field).map_err(|e| e.to_string())?)
            }
            ChunkBuilder::Str(values) => {
                values.push(str::from_utf8(field).map_err(|e| e.to_string())?.to_string())
            }
            ChunkBuilder::Timestamp(values) => {
                let text = str::from_utf8(field).map_err(|e| e.to_string())?;
                values.push(parse_timestamp(text).ok_or("invalid timestamp")?)
            }
        }
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        match self {
            ChunkBuilder::Int64(values) => values.truncate(len),
            ChunkBuilder::Float64(values) => values.truncate(len),
            ChunkBuilder::Str(values) => values.truncate(len),
            ChunkBuilder::Timestamp(values) => values.truncate(len),
        }
    }

    fn finish(self) -> Column {
        match self {
            ChunkBuilder::Int64(values) => Column::Int64(vec![values]),
            ChunkBuilder::Float64(values) => Column::Float64(vec![values]),
            ChunkBuilder::Str(values) => Column::Str(vec![values]),
            ChunkBuilder::Timestamp(values) => Column::Timestamp(vec![values]),
        }
    }
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Table {
            columns: Vec::new(),
            row_count: 0,
            headers: Vec::new(),
        }
    }

    /// Builds a table from named columns.
    ///
    /// # Errors
    /// [`ProcessorError::LengthMismatch`] when the columns differ in length and
    /// [`ProcessorError::DuplicateColumn`] when a name repeats.
    pub fn from_columns<S: Into<String>>(
        columns: Vec<(S, Column)>,
    ) -> Result<Self, ProcessorError> {
        let mut table = Table::new();
        let mut seen = HashSet::new();

        for (idx, (name, mut column)) in columns.into_iter().enumerate() {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(ProcessorError::DuplicateColumn(name));
            }

            let len = column.total_len();
            if idx == 0 {
                table.row_count = len;
            } else if len != table.row_count {
                return Err(ProcessorError::LengthMismatch {
                    column: name,
                    expected: table.row_count,
                    found: len,
                });
            }

            column.flatten_in_place();
            table.headers.push(name);
            table.columns.push(column);
        }

        Ok(table)
    }

    /// Loads a CSV file into memory using memory mapping
    ///
    /// Infers each column's type (Int, Float, Str) from its first non-empty
    /// cell. Rows that do not fit the schema, including rows with an empty
    /// numeric cell, are skipped and reported in the returned [`ParseSummary`].
    ///
    /// # Errors
    /// Returns a [`ProcessorError`] if:
    /// - File cannot be opened or mapped
    /// - The header is missing, has an empty or duplicate name, or the
    ///   first data row does not match it
    pub fn load_csv(&mut self, path: &Path) -> Result<ParseSummary, ProcessorError> {
        self.load_csv_typed(path, &[])
    }

    /// Same as [`Table::load_csv`], with the inferred type of the named
    /// columns replaced by the given hints. Hints for absent columns are ignored.
    pub fn load_csv_typed(
        &mut self,
        path: &Path,
        hints: &[(&str, ColumnType)],
    ) -> Result<ParseSummary, ProcessorError> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(ProcessorError::Parse("Missing header line".into()));
        }
        let mmap = unsafe { Mmap::map(&file)? };
        let buf: &[u8] = &mmap[..];

        // Parse header
        let (header_line, data_start) = match memchr::memchr(b'\n', buf) {
            Some(pos) => (&buf[..pos], pos + 1),
            None => (buf, buf.len()),
        };
        let headers: Vec<String> = trim_cr(header_line)
            .split(|&b| b == b',')
            .map(|s| String::from_utf8_lossy(s).trim().to_string())
            .collect();
        Self::check_headers(&headers)?;

        let data = &buf[data_start..];

        let first_line = data
            .split(|&b| b == b'\n')
            .map(trim_cr)
            .find(|line| !line.is_empty());
        let mut schema = Self::infer_schema(data, &headers)?;
        for (name, column_type) in hints {
            if let Some(pos) = headers.iter().position(|h| h == name) {
                schema[pos] = *column_type;
            }
        }

        // Find chunk boundaries (split by newlines)
        let num_threads = rayon::current_num_threads().max(1);
        let chunks = Self::find_chunk_boundaries(data, num_threads);

        // Estimate rows per chunk for preallocation
        let estimated_rows_per_chunk = match first_line {
            Some(line) => data.len() / num_threads / (line.len() + 1) + 16,
            None => 0,
        };

        // Parse chunks in parallel
        let batch_results: Vec<BatchResult> = chunks
            .par_iter()
            .map(|(start, end)| {
                Self::parse_chunk(
                    &data[*start..*end],
                    &schema,
                    &headers,
                    estimated_rows_per_chunk,
                )
            })
            .collect();

        // Merge batch results into chunked columns, in file order
        let mut columns: Vec<Column> = schema.iter().map(|t| Column::new(*t)).collect();
        let mut total_rows = 0;
        let mut lines_before = 0;
        let mut all_errors = Vec::new();

        for batch in batch_results {
            total_rows += batch.row_count;
            all_errors.extend(batch.errors.into_iter().map(|mut err| {
                // header is line 1
                err.row += lines_before + 2;
                err
            }));
            lines_before += batch.lines_seen;

            for (column, part) in columns.iter_mut().zip(batch.columns) {
                column.append(part)?;
            }
        }
        columns.iter_mut().for_each(Column::flatten_in_place);

        debug!(
            path = %path.display(),
            rows = total_rows,
            skipped = all_errors.len(),
            "loaded csv"
        );

        self.columns = columns;
        self.headers = headers;
        self.row_count = total_rows;

        Ok(ParseSummary {
            rows_processed: total_rows,
            errors: all_errors,
        })
    }

    fn check_headers(headers: &[String]) -> Result<(), ProcessorError> {
        let mut seen = HashSet::new();
        for header in headers {
            if header.is_empty() {
                return Err(ProcessorError::Parse("Empty column name in header".into()));
            }
            if !seen.insert(header.as_str()) {
                return Err(ProcessorError::DuplicateColumn(header.clone()));
            }
        }
        Ok(())
    }

    /// Each column takes the type of its first non-empty cell; a column with
    /// no such cell is `Str`. The first data line must match the header width.
    fn infer_schema(data: &[u8], headers: &[String]) -> Result<Vec<ColumnType>, ProcessorError> {
        let mut schema: Vec<Option<ColumnType>> = vec![None; headers.len()];
        let mut lines = data.split(|&b| b == b'\n').map(trim_cr).filter(|l| !l.is_empty());

        if let Some(first) = lines.next() {
            let width = first.split(|&b| b == b',').count();
            if width != headers.len() {
                return Err(ProcessorError::Parse(format!(
                    "Header/data mismatch: {} vs {}",
                    headers.len(),
                    width
                )));
            }

            for line in std::iter::once(first).chain(lines) {
                let fields: Vec<&[u8]> = line.split(|&b| b == b',').collect();
                // malformed rows are reported by the parser, not used for inference
                if fields.len() != headers.len() {
                    continue;
                }
                for (slot, field) in schema.iter_mut().zip(&fields) {
                    if slot.is_none() && !field.is_empty() {
                        *slot = Some(Self::field_type(field));
                    }
                }
                if schema.iter().all(Option::is_some) {
                    break;
                }
            }
        }

        Ok(schema
            .into_iter()
            .map(|t| t.unwrap_or(ColumnType::Str))
            .collect())
    }

    fn field_type(field: &[u8]) -> ColumnType {
        if atoi_simd::parse::<i64>(field).is_ok() {
            ColumnType::Int64
        } else if fast_float::parse::<f64, _>(field).is_ok() {
            ColumnType::Float64
        } else {
            ColumnType::Str
        }
    }

    fn find_chunk_boundaries(data: &[u8], num_chunks: usize) -> Vec<(usize, usize)> {
        if data.is_empty() {
            return vec![];
        }

        let chunk_size = data.len() / num_chunks;
        let mut boundaries = Vec::with_capacity(num_chunks);
        let mut start = 0;

        for i in 0..num_chunks - 1 {
            let mut end = ((i + 1) * chunk_size).max(start);

            // Find next newline
            while end < data.len() && data[end] != b'\n' {
                end += 1;
            }

            if end < data.len() {
                end += 1; // Include the newline
            }

            if start < end {
                boundaries.push((start, end));
            }
            start = end;
        }

        // Last chunk gets everything remaining
        if start < data.len() {
            boundaries.push((start, data.len()));
        }

        boundaries
    }

    fn parse_chunk(
        chunk: &[u8],
        schema: &[ColumnType],
        headers: &[String],
        estimated_rows: usize,
    ) -> BatchResult {
        let num_cols = schema.len();

        let mut builders: Vec<ChunkBuilder> = schema
            .iter()
            .map(|t| ChunkBuilder::with_capacity(*t, estimated_rows))
            .collect();

        let mut errors = Vec::new();
        let mut row_count = 0;
        let mut lines_seen = 0;
        let mut fields: Vec<&[u8]> = Vec::with_capacity(num_cols);

        // Iterate lines; the final line may lack a newline
        let mut start = 0;
        for end in memchr_iter(b'\n', chunk).chain(std::iter::once(chunk.len())) {
            if start == chunk.len() && end == chunk.len() {
                break;
            }
            let line = trim_cr(&chunk[start..end]);
            start = end + 1;

            let line_idx = lines_seen;
            lines_seen += 1;

            if line.is_empty() {
                continue;
            }

            // Split line into fields
            fields.clear();
            let mut field_start = 0;
            for comma_pos in memchr_iter(b',', line) {
                fields.push(&line[field_start..comma_pos]);
                field_start = comma_pos + 1;
            }
            fields.push(&line[field_start..]);

            if fields.len() != num_cols {
                errors.push(ParseError {
                    row: line_idx,
                    column: String::new(),
                    value: String::new(),
                    error: format!("Expected {} fields, got {}", num_cols, fields.len()),
                });
                continue;
            }

            // A row is kept whole or not at all
            let failed = fields
                .iter()
                .zip(builders.iter_mut())
                .enumerate()
                .find_map(|(col_idx, (field, builder))| {
                    builder.push_field(field).err().map(|error| ParseError {
                        row: line_idx,
                        column: headers[col_idx].clone(),
                        value: String::from_utf8_lossy(field).to_string(),
                        error,
                    })
                });

            match failed {
                Some(err) => {
                    builders.iter_mut().for_each(|b| b.truncate(row_count));
                    errors.push(err);
                }
                None => row_count += 1,
            }
        }

        BatchResult {
            columns: builders.into_iter().map(ChunkBuilder::finish).collect(),
            row_count,
            lines_seen,
            errors,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn has_column(&self, col_name: &str) -> bool {
        self.headers.iter().any(|h| h == col_name)
    }

    pub fn get_col(&self, col_name: &str) -> Result<&Column, ProcessorError> {
        let col_pos = self
            .headers
            .iter()
            .position(|cn| cn == col_name)
            .ok_or_else(|| ProcessorError::MissingColumn(col_name.to_string()))?;

        let col = self
            .columns
            .get(col_pos)
            .ok_or_else(|| ProcessorError::MissingColumn(col_name.to_string()))?;

        Ok(col)
    }

    /// Writes the table as CSV in the dialect [`Table::load_csv`] reads.
    ///
    /// Floats keep a fractional part (`300.0`) so they load back as floats.
    pub fn write_csv(&self, path: &Path) -> Result<(), ProcessorError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{}", self.headers.join(","))?;

        let values: Vec<Vec<Value>> = self.columns.iter().map(Column::to_values).collect();
        let mut line = Vec::with_capacity(self.columns.len());
        for row in 0..self.row_count {
            line.clear();
            for (col, name) in values.iter().zip(&self.headers) {
                let text = col[row].to_string();
                if text.contains([',', '\n', '\r']) {
                    return Err(ProcessorError::UnwritableValue {
                        column: name.clone(),
                        value: text,
                    });
                }
                line.push(text);
            }
            writeln!(writer, "{}", line.join(","))?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Exports the table as an Arrow schema plus one record chunk.
    pub fn to_arrow(&self) -> (Schema, Chunk<Box<dyn Array>>) {
        let fields: Vec<Field> = self
            .headers
            .iter()
            .zip(&self.columns)
            .map(|(h, col)| {
                let dtype = match col {
                    Column::Int64(_) => DataType::Int64,
                    Column::Float64(_) => DataType::Float64,
                    Column::Str(_) => DataType::Utf8,
                    Column::Timestamp(_) => DataType::Timestamp(TimeUnit::Microsecond, None),
                };
                Field::new(h, dtype, false)
            })
            .collect();

        let schema = Schema::from(fields);

        let arrays: Vec<Box<dyn Array>> = self
            .columns
            .par_iter()
            .map(|col| match col {
                Column::Int64(chunks) => {
                    let values = chunks.iter().flatten().copied().collect::<Vec<i64>>();
                    Box::new(Int64Array::from_vec(values)) as Box<dyn Array>
                }
                Column::Float64(chunks) => {
                    let values = chunks.iter().flatten().copied().collect::<Vec<f64>>();
                    Box::new(Float64Array::from_vec(values)) as Box<dyn Array>
                }
                Column::Str(chunks) => {
                    let mut arr = MutableUtf8Array::<i32>::with_capacity(col.total_len());
                    for s in chunks.iter().flatten() {
                        arr.push(Some(s.as_str()));
                    }
                    let array: Utf8Array<i32> = arr.into();
                    Box::new(array) as Box<dyn Array>
                }
                Column::Timestamp(chunks) => {
                    let micros = chunks
                        .iter()
                        .flatten()
                        .map(|ts| ts.and_utc().timestamp_micros())
                        .collect::<Vec<i64>>();
                    let array = Int64Array::from_vec(micros)
                        .to(DataType::Timestamp(TimeUnit::Microsecond, None));
                    Box::new(array) as Box<dyn Array>
                }
            })
            .collect();

        (schema, Chunk::new(arrays))
    }

    /// Writes the table as an Arrow IPC file holding one record batch.
    pub fn write_arrow_ipc(&self, path: &Path) -> Result<(), ProcessorError> {
        let (schema, chunk) = self.to_arrow();
        let file = File::create(path)?;

        let mut writer = FileWriter::try_new(file, schema, None, WriteOptions { compression: None })?;
        writer.write(&chunk, None)?;
        writer.finish()?;
        Ok(())
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
