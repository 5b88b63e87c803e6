//! Writes a large random FactInternetSales CSV for the benches.
//!
//! Usage: data_generator [rows] [path]

use chrono::NaiveDate;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const PRODUCTS: [i64; 6] = [1000, 1001, 1010, 2000, 2001, 3000];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let rows: usize = match args.next() {
        Some(n) => n.parse()?,
        None => 10_000_000,
    };
    let path = args
        .next()
        .unwrap_or_else(|| "data/fact_internet_sales_10m.csv".to_string());

    if let Some(dir) = Path::new(&path).parent() {
        fs::create_dir_all(dir)?;
    }
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "ProductKey,OrderDate,SalesAmount,SalesOrderNumber")?;

    let start = NaiveDate::from_ymd_opt(2011, 1, 1).ok_or("invalid start date")?;
    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..rows {
        let product = PRODUCTS[rng.random_range(0..PRODUCTS.len())];
        let date = start + chrono::Days::new(rng.random_range(0..4 * 365));
        let cents: u32 = rng.random_range(100..300_000);
        writeln!(
            writer,
            "{},{},{}.{:02},SO{}",
            product,
            date.format("%Y-%m-%d"),
            cents / 100,
            cents % 100,
            i
        )?;
    }
    writer.flush()?;

    println!("Sample CSV generated: {}", path);
    Ok(())
}
