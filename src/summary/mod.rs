//! Category sales summary: date filter → hierarchy join → group/aggregate → sort.
//!
//! ```rust
//! # use sales_summary::summary::{SalesTables, calculate_sales_summary};
//! # use sales_summary::synthetic::{create_synthetic_dimensions, create_synthetic_fact_internet_sales};
//! let dims = create_synthetic_dimensions().unwrap();
//! let fact = create_synthetic_fact_internet_sales().unwrap();
//! let tables = SalesTables::new(&fact, &dims.product, &dims.subcategory, &dims.category);
//!
//! let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-02-28").unwrap();
//! assert_eq!(summary.rows()[0].category, "Bikes");
//! ```

use tracing::debug;

use crate::processor::{ProcessorError, table::Table};

pub mod aggregation;
pub mod fact_filter;
pub mod hierarchy;

pub use aggregation::{SalesSummary, SummaryRow, summarize};
pub use fact_filter::{Boundary, DateRange, filter_by_order_date};
pub use hierarchy::{CategoryLookup, resolve_categories};

pub const FACT_INTERNET_SALES: &str = "FactInternetSales";
pub const DIM_PRODUCT: &str = "DimProduct";
pub const DIM_PRODUCT_SUBCATEGORY: &str = "DimProductSubcategory";
pub const DIM_PRODUCT_CATEGORY: &str = "DimProductCategory";

pub const PRODUCT_KEY: &str = "ProductKey";
pub const ORDER_DATE: &str = "OrderDate";
pub const SALES_AMOUNT: &str = "SalesAmount";
pub const SALES_ORDER_NUMBER: &str = "SalesOrderNumber";
pub const PRODUCT_SUBCATEGORY_KEY: &str = "ProductSubcategoryKey";
pub const PRODUCT_CATEGORY_KEY: &str = "ProductCategoryKey";
pub const CATEGORY_NAME: &str = "EnglishProductCategoryName";

pub const PRODUCT_CATEGORY: &str = "ProductCategory";
pub const TOTAL_SALES: &str = "TotalSales";
pub const TOTAL_ORDERS: &str = "TotalOrders";
pub const AVERAGE_ORDER_VALUE: &str = "AverageOrderValue";

/// Output column identifiers, in output order
pub const SUMMARY_COLUMNS: [&str; 4] =
    [PRODUCT_CATEGORY, TOTAL_SALES, TOTAL_ORDERS, AVERAGE_ORDER_VALUE];

/// The four input tables of a summary run. Borrowed, never modified.
#[derive(Debug, Clone, Copy)]
pub struct SalesTables<'a> {
    pub fact: &'a Table,
    pub product: &'a Table,
    pub subcategory: &'a Table,
    pub category: &'a Table,
}

impl<'a> SalesTables<'a> {
    pub fn new(
        fact: &'a Table,
        product: &'a Table,
        subcategory: &'a Table,
        category: &'a Table,
    ) -> Self {
        SalesTables {
            fact,
            product,
            subcategory,
            category,
        }
    }
}

/// Computes total sales, order count and average order value per product
/// category for facts dated within `[start, end]`, highest total first.
///
/// # Errors
/// - [`ProcessorError::InvalidBoundary`] for an unparseable boundary
/// - [`ProcessorError::InvalidDate`] if any order date is unparseable
/// - missing columns, key-kind mismatches or an ambiguous hierarchy
pub fn calculate_sales_summary(
    tables: &SalesTables<'_>,
    start: impl Into<Boundary>,
    end: impl Into<Boundary>,
) -> Result<SalesSummary, ProcessorError> {
    let range = DateRange::new(start, end)?;
    let rows = filter_by_order_date(tables.fact, &range)?;
    let lookup = resolve_categories(tables.product, tables.subcategory, tables.category)?;
    let summary = summarize(tables.fact, &rows, &lookup)?;

    debug!(
        start = %range.start(),
        end = %range.end(),
        facts = tables.fact.row_count(),
        in_range = rows.len(),
        categories = summary.len(),
        "sales summary computed"
    );

    Ok(summary)
}
