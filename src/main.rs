//! sales-summary CLI
//!
//! Usage:
//!   sales-summary summary --fact F --product P --subcategory S --category C --start D --end D [--output OUT]
//!   sales-summary validate-schema <metadata.csv>
//!   sales-summary generate [--seasonal] [--year Y] [--dir D] [--prefix P]

use clap::{Parser, Subcommand};
use jemallocator::Jemalloc;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sales_summary::{
    ColumnType, ParseSummary, SalesTables, Table, calculate_sales_summary,
    load_schema_metadata,
    summary::{ORDER_DATE, SALES_AMOUNT},
    synthetic::{export_synthetic_to_csv, export_synthetic_with_seasonality_to_csv},
    validate_schema_for_sales_summary,
};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser)]
#[command(name = "sales-summary")]
#[command(about = "Per-category sales totals over AdventureWorks-style CSV exports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize sales per product category within a date range
    Summary {
        /// FactInternetSales CSV
        #[arg(long)]
        fact: PathBuf,

        /// DimProduct CSV
        #[arg(long)]
        product: PathBuf,

        /// DimProductSubcategory CSV
        #[arg(long)]
        subcategory: PathBuf,

        /// DimProductCategory CSV
        #[arg(long)]
        category: PathBuf,

        /// First order date included (YYYY-MM-DD or a timestamp)
        #[arg(long)]
        start: String,

        /// Last order date included; a bare date covers the whole day
        #[arg(long)]
        end: String,

        /// Also write the summary to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the summary as an Arrow IPC file
        #[arg(long)]
        arrow: Option<PathBuf>,
    },

    /// Check column metadata (TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME) for required columns
    ValidateSchema {
        /// Metadata CSV export
        metadata: PathBuf,
    },

    /// Write the synthetic dimension and fact tables as CSV
    Generate {
        /// Twelve months of seasonal sales instead of the nine literal rows
        #[arg(long)]
        seasonal: bool,

        /// Year of the seasonal sales
        #[arg(long, default_value_t = 2013)]
        year: i32,

        /// Output directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// File name prefix
        #[arg(long)]
        prefix: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary {
            fact,
            product,
            subcategory,
            category,
            start,
            end,
            output,
            arrow,
        } => {
            // Amounts stay floats and dates stay text even if the first row looks otherwise
            let fact = load_fact(&fact)?;
            let product = load_dimension(&product)?;
            let subcategory = load_dimension(&subcategory)?;
            let category = load_dimension(&category)?;

            let tables = SalesTables::new(&fact, &product, &subcategory, &category);
            let summary = calculate_sales_summary(&tables, start.as_str(), end.as_str())?;
            print!("{}", summary);

            if let Some(path) = output {
                summary.to_table()?.write_csv(&path)?;
                info!(path = %path.display(), rows = summary.len(), "summary written");
            }
            if let Some(path) = arrow {
                summary.to_table()?.write_arrow_ipc(&path)?;
                info!(path = %path.display(), rows = summary.len(), "arrow summary written");
            }
        }
        Commands::ValidateSchema { metadata } => {
            let (table, parsed) = load_schema_metadata(&metadata)?;
            warn_skipped(&metadata, &parsed);
            validate_schema_for_sales_summary(&table)?;
            println!("Schema metadata has every column the sales summary needs");
        }
        Commands::Generate {
            seasonal,
            year,
            dir,
            prefix,
        } => {
            let written = if seasonal {
                let prefix = prefix.as_deref().unwrap_or("synthetic_seasonal_");
                export_synthetic_with_seasonality_to_csv(&dir, year, prefix)?
            } else {
                let prefix = prefix.as_deref().unwrap_or("synthetic_");
                export_synthetic_to_csv(&dir, prefix)?
            };
            for path in written {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn load_fact(path: &Path) -> Result<Table, Box<dyn std::error::Error>> {
    let mut table = Table::new();
    let rows = table
        .load_csv_typed(
            path,
            &[(SALES_AMOUNT, ColumnType::Float64), (ORDER_DATE, ColumnType::Str)],
        )?
        .ensure_clean(&path.display().to_string())?;
    info!(path = %path.display(), rows, "fact table loaded");
    Ok(table)
}

fn load_dimension(path: &Path) -> Result<Table, Box<dyn std::error::Error>> {
    let mut table = Table::new();
    let parsed = table.load_csv(path)?;
    warn_skipped(path, &parsed);
    info!(path = %path.display(), rows = parsed.rows_processed, "dimension table loaded");
    Ok(table)
}

fn warn_skipped(path: &Path, parsed: &ParseSummary) {
    for err in &parsed.errors {
        warn!(path = %path.display(), line = err.row, "skipped row: {}", err);
    }
}
