use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::{
    processor::{
        ProcessorError,
        column::{Column, ColumnType},
        table::Table,
    },
    summary::{
        AVERAGE_ORDER_VALUE, PRODUCT_CATEGORY, PRODUCT_KEY, SALES_AMOUNT, SALES_ORDER_NUMBER,
        SUMMARY_COLUMNS, TOTAL_ORDERS, TOTAL_SALES, hierarchy::CategoryLookup,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub category: String,
    pub total_sales: f64,
    pub total_orders: i64,
    pub average_order_value: f64,
}

/// Per-category result, ordered by total sales (highest first)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesSummary {
    rows: Vec<SummaryRow>,
}

impl SalesSummary {
    /// Output column identifiers; present even when there are no rows
    pub fn columns(&self) -> [&'static str; 4] {
        SUMMARY_COLUMNS
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.category == category)
    }

    /// The summary as a four-column [`Table`]. An empty summary gives a
    /// zero-row table that still carries the typed columns.
    pub fn to_table(&self) -> Result<Table, ProcessorError> {
        let mut categories = Vec::with_capacity(self.rows.len());
        let mut totals = Vec::with_capacity(self.rows.len());
        let mut orders = Vec::with_capacity(self.rows.len());
        let mut averages = Vec::with_capacity(self.rows.len());

        for row in &self.rows {
            categories.push(row.category.clone());
            totals.push(row.total_sales);
            orders.push(row.total_orders);
            averages.push(row.average_order_value);
        }

        Table::from_columns(vec![
            (PRODUCT_CATEGORY, Column::from(categories)),
            (TOTAL_SALES, Column::from(totals)),
            (TOTAL_ORDERS, Column::from(orders)),
            (AVERAGE_ORDER_VALUE, Column::from(averages)),
        ])
    }
}

impl fmt::Display for SalesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<[String; 4]> = self
            .rows
            .iter()
            .map(|row| {
                [
                    row.category.clone(),
                    format!("{:.2}", row.total_sales),
                    row.total_orders.to_string(),
                    format!("{:.2}", row.average_order_value),
                ]
            })
            .collect();

        let mut widths = SUMMARY_COLUMNS.map(str::len);
        for line in &cells {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.len());
            }
        }

        writeln!(
            f,
            "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}",
            SUMMARY_COLUMNS[0],
            SUMMARY_COLUMNS[1],
            SUMMARY_COLUMNS[2],
            SUMMARY_COLUMNS[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        )?;
        for [category, total, orders, average] in &cells {
            writeln!(
                f,
                "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}",
                category,
                total,
                orders,
                average,
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
                w3 = widths[3],
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: i64,
}

/// Groups the fact rows at `rows` by category and aggregates their sales.
///
/// Rows whose product key has no category in `lookup` are dropped. Orders
/// are counted per row; `SalesOrderNumber` must be present but is not
/// deduplicated.
///
/// # Errors
/// - [`ProcessorError::MissingColumn`] for `ProductKey`, `SalesAmount` or
///   `SalesOrderNumber`
/// - [`ProcessorError::ColumnType`] if `SalesAmount` is not numeric
/// - [`ProcessorError::KeyTypeMismatch`] if fact and product keys differ in kind
pub fn summarize(
    fact: &Table,
    rows: &[usize],
    lookup: &CategoryLookup,
) -> Result<SalesSummary, ProcessorError> {
    let product_keys = fact.get_col(PRODUCT_KEY)?;
    let amount_col = fact.get_col(SALES_AMOUNT)?;
    fact.get_col(SALES_ORDER_NUMBER)?;
    let amounts = amount_col.to_f64_vec().ok_or(ProcessorError::ColumnType {
        column: SALES_AMOUNT.to_string(),
        expected: "numeric",
        found: amount_col.column_type(),
    })?;

    // Nothing selected or nothing to join against: key kinds cannot disagree
    if let Some(key_type) = lookup
        .key_type()
        .filter(|_| !rows.is_empty() && !lookup.is_empty())
    {
        check_fact_key(product_keys.column_type(), key_type)?;
    }

    let mut groups: HashMap<&str, Accumulator> = HashMap::new();
    for &row in rows {
        let key = product_keys.get(row).ok_or_else(|| {
            ProcessorError::Parse(format!("row {} out of range for {} fact rows", row, amounts.len()))
        })?;
        let Some(category) = lookup.category_of(&key) else {
            continue;
        };

        let acc = groups.entry(category).or_default();
        acc.sum += amounts[row];
        acc.count += 1;
    }

    let mut out: Vec<SummaryRow> = groups
        .into_iter()
        .map(|(category, acc)| SummaryRow {
            category: category.to_string(),
            total_sales: acc.sum,
            total_orders: acc.count,
            average_order_value: acc.sum / acc.count as f64,
        })
        .collect();

    out.sort_by(by_sales_desc);

    debug!(rows = rows.len(), groups = out.len(), "aggregated sales by category");
    Ok(SalesSummary { rows: out })
}

fn check_fact_key(fact: ColumnType, product: ColumnType) -> Result<(), ProcessorError> {
    if fact == product {
        return Ok(());
    }
    Err(ProcessorError::KeyTypeMismatch {
        column: PRODUCT_KEY.to_string(),
        left: fact,
        right: product,
    })
}

fn by_sales_desc(a: &SummaryRow, b: &SummaryRow) -> Ordering {
    b.total_sales
        .total_cmp(&a.total_sales)
        .then_with(|| a.category.cmp(&b.category))
}
