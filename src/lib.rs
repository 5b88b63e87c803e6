//! # sales_summary
//!
//! Category-level sales summaries over an AdventureWorks-style star schema,
//! computed on a small in-memory columnar engine.
//!
//! - Memory-mapped CSV loading, parsed in parallel with Rayon
//! - Typed columns (int, float, string, timestamp) with schema inference
//! - Inclusive order-date filtering, product → subcategory → category
//!   resolution, and per-category totals ordered by revenue
//! - Validation of database column metadata before a run
//! - Deterministic synthetic tables for demos and tests
//!
//! # Example
//!
//! ```rust,no_run
//! use sales_summary::{SalesTables, Table, calculate_sales_summary};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tables = Vec::new();
//!     for name in ["FactInternetSales", "DimProduct", "DimProductSubcategory", "DimProductCategory"] {
//!         let mut table = Table::new();
//!         table.load_csv(Path::new(&format!("{name}.csv")))?;
//!         tables.push(table);
//!     }
//!
//!     let input = SalesTables::new(&tables[0], &tables[1], &tables[2], &tables[3]);
//!     let summary = calculate_sales_summary(&input, "2013-01-01", "2013-12-31")?;
//!     print!("{summary}");
//!     Ok(())
//! }
//! ```

mod helpers;
pub mod processor;
pub mod schema;
pub mod summary;
pub mod synthetic;

pub use processor::{
    FilterPredicate, ParseError, ParseSummary, ProcessorError, Value,
    column::{Column, ColumnType},
    table::Table,
};
pub use schema::{load_schema_metadata, validate_schema_for_sales_summary};
pub use summary::{SalesSummary, SalesTables, SummaryRow, calculate_sales_summary};
