//! Checks that a database's column metadata covers every column the sales
//! summary reads.
//!
//! The metadata is an `INFORMATION_SCHEMA.COLUMNS`-style table with one row
//! per column and at least the `TABLE_SCHEMA`, `TABLE_NAME` and
//! `COLUMN_NAME` attributes.

use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::processor::{ParseSummary, ProcessorError, column::ColumnType, table::Table};

pub const TABLE_SCHEMA: &str = "TABLE_SCHEMA";
pub const TABLE_NAME: &str = "TABLE_NAME";
pub const COLUMN_NAME: &str = "COLUMN_NAME";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredColumn {
    pub schema: &'static str,
    pub table: &'static str,
    pub column: &'static str,
}

const fn dbo(table: &'static str, column: &'static str) -> RequiredColumn {
    RequiredColumn {
        schema: "dbo",
        table,
        column,
    }
}

/// Every (schema, table, column) the summary depends on
pub const REQUIRED_COLUMNS: [RequiredColumn; 10] = [
    dbo("FactInternetSales", "SalesAmount"),
    dbo("FactInternetSales", "SalesOrderNumber"),
    dbo("FactInternetSales", "OrderDate"),
    dbo("FactInternetSales", "ProductKey"),
    dbo("DimProduct", "ProductKey"),
    dbo("DimProduct", "ProductSubcategoryKey"),
    dbo("DimProductSubcategory", "ProductSubcategoryKey"),
    dbo("DimProductSubcategory", "ProductCategoryKey"),
    dbo("DimProductCategory", "ProductCategoryKey"),
    dbo("DimProductCategory", "EnglishProductCategoryName"),
];

impl RequiredColumn {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.schema, self.table, self.column)
    }

    fn key(&self) -> (String, String, String) {
        (
            self.schema.to_lowercase(),
            self.table.to_lowercase(),
            self.column.to_lowercase(),
        )
    }
}

/// Verifies that `metadata` lists all of [`REQUIRED_COLUMNS`].
///
/// Names are compared case-insensitively. Every missing attribute or column
/// is reported at once, never just the first.
///
/// # Errors
/// - [`ProcessorError::MissingMetadataColumns`] when `TABLE_SCHEMA`,
///   `TABLE_NAME` or `COLUMN_NAME` is absent (sorted)
/// - [`ProcessorError::MissingRequiredColumns`] listing each absent column
///   as `schema.table.column`
pub fn validate_schema_for_sales_summary(metadata: &Table) -> Result<(), ProcessorError> {
    let mut missing_attrs: Vec<String> = [TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME]
        .into_iter()
        .filter(|attr| !metadata.has_column(attr))
        .map(str::to_string)
        .collect();
    if !missing_attrs.is_empty() {
        missing_attrs.sort();
        return Err(ProcessorError::MissingMetadataColumns(missing_attrs));
    }

    let schemas = metadata.get_col(TABLE_SCHEMA)?.to_values();
    let tables = metadata.get_col(TABLE_NAME)?.to_values();
    let columns = metadata.get_col(COLUMN_NAME)?.to_values();

    let available: HashSet<(String, String, String)> = schemas
        .iter()
        .zip(&tables)
        .zip(&columns)
        .map(|((s, t), c)| {
            (
                s.to_string().to_lowercase(),
                t.to_string().to_lowercase(),
                c.to_string().to_lowercase(),
            )
        })
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !available.contains(&required.key()))
        .map(RequiredColumn::qualified_name)
        .collect();

    debug!(
        metadata_rows = metadata.row_count(),
        missing = missing.len(),
        "validated schema metadata"
    );

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProcessorError::MissingRequiredColumns(missing))
    }
}

/// Loads a metadata CSV export. The three attribute columns are always read
/// as text, whatever their first value looks like.
pub fn load_schema_metadata(path: &Path) -> Result<(Table, ParseSummary), ProcessorError> {
    let mut table = Table::new();
    let summary = table.load_csv_typed(
        path,
        &[
            (TABLE_SCHEMA, ColumnType::Str),
            (TABLE_NAME, ColumnType::Str),
            (COLUMN_NAME, ColumnType::Str),
        ],
    )?;
    Ok((table, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::column::Column;

    fn metadata(rows: &[RequiredColumn]) -> Table {
        Table::from_columns(vec![
            (TABLE_SCHEMA, Column::from(rows.iter().map(|r| r.schema).collect::<Vec<_>>())),
            (TABLE_NAME, Column::from(rows.iter().map(|r| r.table).collect::<Vec<_>>())),
            (COLUMN_NAME, Column::from(rows.iter().map(|r| r.column).collect::<Vec<_>>())),
        ])
        .unwrap()
    }

    #[test]
    fn test_complete_metadata_passes() {
        assert!(validate_schema_for_sales_summary(&metadata(&REQUIRED_COLUMNS)).is_ok());
    }

    #[test]
    fn test_comparison_ignores_case() {
        let upper: Vec<(String, String, String)> = REQUIRED_COLUMNS
            .iter()
            .map(|r| (r.schema.to_uppercase(), r.table.to_uppercase(), r.column.to_lowercase()))
            .collect();
        let table = Table::from_columns(vec![
            (TABLE_SCHEMA, Column::from(upper.iter().map(|r| r.0.clone()).collect::<Vec<_>>())),
            (TABLE_NAME, Column::from(upper.iter().map(|r| r.1.clone()).collect::<Vec<_>>())),
            (COLUMN_NAME, Column::from(upper.iter().map(|r| r.2.clone()).collect::<Vec<_>>())),
        ])
        .unwrap();
        assert!(validate_schema_for_sales_summary(&table).is_ok());
    }

    #[test]
    fn test_all_missing_columns_reported_in_order() {
        let rows: Vec<RequiredColumn> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|r| r.column != "OrderDate" && r.column != "EnglishProductCategoryName")
            .collect();
        let err = validate_schema_for_sales_summary(&metadata(&rows)).unwrap_err();
        match err {
            ProcessorError::MissingRequiredColumns(missing) => assert_eq!(
                missing,
                vec![
                    "dbo.FactInternetSales.OrderDate",
                    "dbo.DimProductCategory.EnglishProductCategoryName",
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_attributes_sorted() {
        let table = Table::from_columns(vec![(
            TABLE_SCHEMA,
            Column::from(vec!["dbo"]),
        )])
        .unwrap();
        let err = validate_schema_for_sales_summary(&table).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::MissingMetadataColumns(ref attrs) if attrs == &["COLUMN_NAME", "TABLE_NAME"]
        ));
    }

    #[test]
    fn test_wrong_schema_counts_as_missing() {
        let rows: Vec<RequiredColumn> = REQUIRED_COLUMNS
            .iter()
            .map(|r| RequiredColumn { schema: "sales", ..*r })
            .collect();
        match validate_schema_for_sales_summary(&metadata(&rows)) {
            Err(ProcessorError::MissingRequiredColumns(missing)) => assert_eq!(missing.len(), 10),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_error_message_lists_every_column() {
        let err = ProcessorError::MissingRequiredColumns(vec![
            "dbo.DimProduct.ProductKey".into(),
            "dbo.FactInternetSales.OrderDate".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "Schema metadata is missing required columns for sales summary: \
             dbo.DimProduct.ProductKey, dbo.FactInternetSales.OrderDate"
        );
    }
}
