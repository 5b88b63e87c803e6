//! Small, deterministic AdventureWorks-shaped tables for demos and tests.

use chrono::{NaiveDate, NaiveDateTime};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{
    processor::{ProcessorError, column::Column, table::Table},
    summary::{
        CATEGORY_NAME, DIM_PRODUCT, DIM_PRODUCT_CATEGORY, DIM_PRODUCT_SUBCATEGORY,
        FACT_INTERNET_SALES, ORDER_DATE, PRODUCT_CATEGORY_KEY, PRODUCT_KEY,
        PRODUCT_SUBCATEGORY_KEY, SALES_AMOUNT, SALES_ORDER_NUMBER,
    },
};

/// The three product dimension tables
#[derive(Debug, Clone, PartialEq)]
pub struct Dimensions {
    pub product: Table,
    pub subcategory: Table,
    pub category: Table,
}

/// Categories 1 Bikes, 2 Accessories, 3 Clothing; five subcategories; six products.
pub fn create_synthetic_dimensions() -> Result<Dimensions, ProcessorError> {
    let category = Table::from_columns(vec![
        (PRODUCT_CATEGORY_KEY, Column::from(vec![1_i64, 2, 3])),
        (CATEGORY_NAME, Column::from(vec!["Bikes", "Accessories", "Clothing"])),
    ])?;

    // road bikes, mountain bikes, helmets, gloves, jerseys
    let subcategory = Table::from_columns(vec![
        (PRODUCT_SUBCATEGORY_KEY, Column::from(vec![10_i64, 11, 20, 21, 30])),
        (PRODUCT_CATEGORY_KEY, Column::from(vec![1_i64, 1, 2, 2, 3])),
    ])?;

    let product = Table::from_columns(vec![
        (PRODUCT_KEY, Column::from(vec![1000_i64, 1001, 1010, 2000, 2001, 3000])),
        (PRODUCT_SUBCATEGORY_KEY, Column::from(vec![10_i64, 10, 11, 20, 21, 30])),
    ])?;

    Ok(Dimensions {
        product,
        subcategory,
        category,
    })
}

/// Nine literal sales between 2012-12-31 and 2013-02-20.
pub fn create_synthetic_fact_internet_sales() -> Result<Table, ProcessorError> {
    let rows: [(i64, (i32, u32, u32), f64, &str); 9] = [
        (1000, (2013, 1, 1), 500.0, "SO100"),
        (1000, (2013, 1, 3), 750.0, "SO101"),
        (1001, (2013, 1, 15), 300.0, "SO102"),
        (1010, (2013, 2, 5), 900.0, "SO103"),
        (2000, (2013, 1, 10), 80.0, "SO200"),
        (2000, (2013, 2, 12), 120.0, "SO201"),
        (2001, (2013, 2, 20), 60.0, "SO202"),
        (3000, (2013, 1, 25), 45.0, "SO300"),
        // outside every 2013 range
        (3000, (2012, 12, 31), 999.0, "SO301"),
    ];

    let mut fact = FactBuilder::with_capacity(rows.len());
    for (product, (y, m, d), amount, order) in rows {
        fact.push(product, midnight(y, m, d)?, amount, order.to_string());
    }
    fact.finish()
}

/// Monthly multipliers over a per-category base ticket size
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalModel {
    /// Product key → category name
    pub product_category: BTreeMap<i64, String>,
    pub base_amount: BTreeMap<String, f64>,
    /// Factor for January first
    pub monthly_factors: BTreeMap<String, [f64; 12]>,
}

impl Default for SeasonalModel {
    /// Bikes peak in summer, accessories stay flat, clothing peaks in Q4.
    fn default() -> Self {
        let product_category = [
            (1000, "Bikes"),
            (1001, "Bikes"),
            (1010, "Bikes"),
            (2000, "Accessories"),
            (2001, "Accessories"),
            (3000, "Clothing"),
        ]
        .into_iter()
        .map(|(key, name)| (key, name.to_string()))
        .collect();

        let base_amount = [("Bikes", 600.0), ("Accessories", 60.0), ("Clothing", 45.0)]
            .into_iter()
            .map(|(name, amount)| (name.to_string(), amount))
            .collect();

        let monthly_factors = [
            ("Bikes", [0.5, 0.6, 0.8, 1.1, 1.3, 1.5, 1.6, 1.4, 1.1, 0.9, 0.6, 0.5]),
            ("Accessories", [0.9, 0.9, 1.0, 1.0, 1.1, 1.1, 1.1, 1.0, 1.0, 1.0, 0.9, 0.9]),
            ("Clothing", [1.3, 1.2, 1.0, 0.7, 0.5, 0.5, 0.6, 0.7, 0.9, 1.2, 1.5, 1.7]),
        ]
        .into_iter()
        .map(|(name, factors)| (name.to_string(), factors))
        .collect();

        SeasonalModel {
            product_category,
            base_amount,
            monthly_factors,
        }
    }
}

/// One sale per product per month of `year`.
///
/// Products are visited in ascending key order; the `i`-th (1-based) sells on
/// day `min(3i, 28)` for `round2(base * factor)` under order number
/// `SO-{year}{month:02}-{product}-{i}`.
pub fn seasonal_fact_table(model: &SeasonalModel, year: i32) -> Result<Table, ProcessorError> {
    let mut fact = FactBuilder::with_capacity(12 * model.product_category.len());

    for month in 1..=12u32 {
        for (idx, (&product, category)) in model.product_category.iter().enumerate() {
            let idx = idx + 1;
            let base = model.base_amount.get(category).ok_or_else(|| {
                ProcessorError::Parse(format!("no base amount for category '{}'", category))
            })?;
            let factor = model
                .monthly_factors
                .get(category)
                .map(|factors| factors[month as usize - 1])
                .ok_or_else(|| {
                    ProcessorError::Parse(format!("no seasonal factors for category '{}'", category))
                })?;

            let day = (3 * idx as u32).min(28);
            fact.push(
                product,
                midnight(year, month, day)?,
                round2(base * factor),
                format!("SO-{}{:02}-{}-{}", year, month, product, idx),
            );
        }
    }

    fact.finish()
}

pub fn create_synthetic_fact_internet_sales_with_seasonality(
    year: i32,
) -> Result<Table, ProcessorError> {
    seasonal_fact_table(&SeasonalModel::default(), year)
}

/// Seeded pseudo-random sales over the synthetic products, dated within 2013.
/// The same `seed` always yields the same table.
pub fn random_fact_table(rows: usize, seed: u64) -> Result<Table, ProcessorError> {
    const PRODUCTS: [i64; 6] = [1000, 1001, 1010, 2000, 2001, 3000];

    let mut rng = StdRng::seed_from_u64(seed);
    let mut fact = FactBuilder::with_capacity(rows);
    for i in 0..rows {
        let product = PRODUCTS[rng.random_range(0..PRODUCTS.len())];
        let date = midnight(2013, rng.random_range(1..=12), rng.random_range(1..=28))?;
        let amount = round2(rng.random_range(1.0..1000.0));
        fact.push(product, date, amount, format!("SO{}", i));
    }
    fact.finish()
}

/// Writes the dimensions and the literal fact table as
/// `{prefix}DimProduct.csv` and friends under `dir`.
pub fn export_synthetic_to_csv(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, ProcessorError> {
    let dims = create_synthetic_dimensions()?;
    let fact = create_synthetic_fact_internet_sales()?;
    export_tables(dir, prefix, &dims, &fact)
}

pub fn export_synthetic_with_seasonality_to_csv(
    dir: &Path,
    year: i32,
    prefix: &str,
) -> Result<Vec<PathBuf>, ProcessorError> {
    let dims = create_synthetic_dimensions()?;
    let fact = create_synthetic_fact_internet_sales_with_seasonality(year)?;
    export_tables(dir, prefix, &dims, &fact)
}

fn export_tables(
    dir: &Path,
    prefix: &str,
    dims: &Dimensions,
    fact: &Table,
) -> Result<Vec<PathBuf>, ProcessorError> {
    let outputs = [
        (DIM_PRODUCT, &dims.product),
        (DIM_PRODUCT_SUBCATEGORY, &dims.subcategory),
        (DIM_PRODUCT_CATEGORY, &dims.category),
        (FACT_INTERNET_SALES, fact),
    ];

    let mut written = Vec::with_capacity(outputs.len());
    for (name, table) in outputs {
        let path = dir.join(format!("{}{}.csv", prefix, name));
        table.write_csv(&path)?;
        debug!(path = %path.display(), rows = table.row_count(), "wrote synthetic table");
        written.push(path);
    }
    Ok(written)
}

struct FactBuilder {
    products: Vec<i64>,
    dates: Vec<NaiveDateTime>,
    amounts: Vec<f64>,
    orders: Vec<String>,
}

impl FactBuilder {
    fn with_capacity(n: usize) -> Self {
        FactBuilder {
            products: Vec::with_capacity(n),
            dates: Vec::with_capacity(n),
            amounts: Vec::with_capacity(n),
            orders: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, product: i64, date: NaiveDateTime, amount: f64, order: String) {
        self.products.push(product);
        self.dates.push(date);
        self.amounts.push(amount);
        self.orders.push(order);
    }

    fn finish(self) -> Result<Table, ProcessorError> {
        Table::from_columns(vec![
            (PRODUCT_KEY, Column::from(self.products)),
            (ORDER_DATE, Column::from(self.dates)),
            (SALES_AMOUNT, Column::from(self.amounts)),
            (SALES_ORDER_NUMBER, Column::from(self.orders)),
        ])
    }
}

fn midnight(year: i32, month: u32, day: u32) -> Result<NaiveDateTime, ProcessorError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ProcessorError::Parse(format!("invalid date {}-{}-{}", year, month, day)))
}

/// Rounds to cents, ties to even (12.5 cents becomes 12).
fn round2(amount: f64) -> f64 {
    (amount * 100.0).round_ties_even() / 100.0
}
