use std::io::Write;
use std::path::Path;

use sales_summary::{
    ColumnType, ProcessorError, SalesTables, Table, calculate_sales_summary,
    load_schema_metadata,
    synthetic::{
        create_synthetic_dimensions, create_synthetic_fact_internet_sales,
        create_synthetic_fact_internet_sales_with_seasonality, export_synthetic_to_csv,
        export_synthetic_with_seasonality_to_csv,
    },
    validate_schema_for_sales_summary,
};
use tempfile::NamedTempFile;

fn load(csv: &str) -> Table {
    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{}", csv).unwrap();
    let mut table = Table::new();
    let parsed = table.load_csv(tmp.path()).unwrap();
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    table
}

fn load_fact(csv: &str) -> Table {
    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{}", csv).unwrap();
    let mut table = Table::new();
    table
        .load_csv_typed(
            tmp.path(),
            &[("SalesAmount", ColumnType::Float64), ("OrderDate", ColumnType::Str)],
        )
        .unwrap()
        .ensure_clean("fact.csv")
        .unwrap();
    table
}

fn load_dir_table(dir: &Path, name: &str) -> Table {
    let mut table = Table::new();
    table
        .load_csv_typed(&dir.join(name), &[("SalesAmount", ColumnType::Float64)])
        .unwrap()
        .ensure_clean(name)
        .unwrap();
    table
}

fn bike_dimensions() -> (Table, Table, Table) {
    (
        load("ProductKey,ProductSubcategoryKey\n1000,100\n1001,100\n2000,200\n"),
        load("ProductSubcategoryKey,ProductCategoryKey\n100,1\n200,2\n"),
        load("ProductCategoryKey,EnglishProductCategoryName\n1,Bikes\n2,Accessories\n"),
    )
}

#[test]
fn test_bikes_and_accessories_from_csv() {
    let fact = load_fact(
        "ProductKey,OrderDate,SalesAmount,SalesOrderNumber\n\
         1000,2013-01-01,100,SO1\n\
         1000,2013-01-02,150,SO2\n\
         1001,2013-01-02,200,SO3\n\
         2000,2013-01-02,50,SO4\n\
         1000,2012-12-31,999,SOX\n",
    );
    let (product, subcategory, category) = bike_dimensions();
    let tables = SalesTables::new(&fact, &product, &subcategory, &category);

    let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-01-31").unwrap();
    let rows: Vec<(&str, f64, i64, f64)> = summary
        .rows()
        .iter()
        .map(|r| (r.category.as_str(), r.total_sales, r.total_orders, r.average_order_value))
        .collect();
    assert_eq!(
        rows,
        vec![("Bikes", 450.0, 3, 150.0), ("Accessories", 50.0, 1, 50.0)]
    );
}

#[test]
fn test_out_of_range_facts_give_empty_named_result() {
    let fact = load_fact(
        "ProductKey,OrderDate,SalesAmount,SalesOrderNumber\n\
         1000,2012-06-01,100,SO1\n\
         2000,2012-12-31 23:59:59,50,SO2\n",
    );
    let (product, subcategory, category) = bike_dimensions();
    let tables = SalesTables::new(&fact, &product, &subcategory, &category);

    let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-12-31").unwrap();
    assert!(summary.is_empty());
    assert_eq!(
        summary.columns(),
        ["ProductCategory", "TotalSales", "TotalOrders", "AverageOrderValue"]
    );
    let table = summary.to_table().unwrap();
    assert_eq!(table.row_count(), 0);
    assert_eq!(
        table.headers(),
        ["ProductCategory", "TotalSales", "TotalOrders", "AverageOrderValue"]
    );
}

#[test]
fn test_bad_order_date_fails_whole_run() {
    let fact = load_fact(
        "ProductKey,OrderDate,SalesAmount,SalesOrderNumber\n\
         1000,2013-01-05,100,SO1\n\
         1000,05.01.2013,100,SO2\n",
    );
    let (product, subcategory, category) = bike_dimensions();
    let tables = SalesTables::new(&fact, &product, &subcategory, &category);

    let err = calculate_sales_summary(&tables, "2013-01-01", "2013-01-31").unwrap_err();
    assert!(matches!(
        err,
        ProcessorError::InvalidDate { row: 1, ref value, .. } if value == "05.01.2013"
    ));
}

#[test]
fn test_unresolvable_products_excluded() {
    let fact = load_fact(
        "ProductKey,OrderDate,SalesAmount,SalesOrderNumber\n\
         1000,2013-01-05,100,SO1\n\
         7777,2013-01-06,5000,SO2\n",
    );
    let (product, subcategory, category) = bike_dimensions();
    let tables = SalesTables::new(&fact, &product, &subcategory, &category);

    let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-01-31").unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary.rows()[0].total_sales, 100.0);
}

#[test]
fn test_header_only_fact_gives_empty_summary() {
    let fact = load_fact("ProductKey,OrderDate,SalesAmount,SalesOrderNumber\n");
    assert_eq!(fact.row_count(), 0);
    let (product, subcategory, category) = bike_dimensions();
    let tables = SalesTables::new(&fact, &product, &subcategory, &category);

    let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-01-31").unwrap();
    assert!(summary.is_empty());
    assert_eq!(
        summary.to_table().unwrap().headers(),
        ["ProductCategory", "TotalSales", "TotalOrders", "AverageOrderValue"]
    );
}

#[test]
fn test_empty_leading_subcategory_key_keeps_integer_keys() {
    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "ProductKey,ProductSubcategoryKey\n1,\n1000,10\n2000,20\n").unwrap();
    let mut product = Table::new();
    let parsed = product.load_csv(tmp.path()).unwrap();
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(product.get_col("ProductSubcategoryKey").unwrap().column_type(), ColumnType::Int64);

    let subcategory = load("ProductSubcategoryKey,ProductCategoryKey\n10,1\n20,2\n");
    let category = load("ProductCategoryKey,EnglishProductCategoryName\n1,Bikes\n2,Accessories\n");
    let fact = load_fact(
        "ProductKey,OrderDate,SalesAmount,SalesOrderNumber\n\
         1000,2013-01-05,100,SO1\n",
    );
    let tables = SalesTables::new(&fact, &product, &subcategory, &category);

    let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-01-31").unwrap();
    assert_eq!(summary.len(), 1);
    let bikes = summary.get("Bikes").unwrap();
    assert_eq!((bikes.total_sales, bikes.total_orders), (100.0, 1));
}

#[test]
fn test_literal_fixture_january_february() {
    let dims = create_synthetic_dimensions().unwrap();
    let fact = create_synthetic_fact_internet_sales().unwrap();
    let tables = SalesTables::new(&fact, &dims.product, &dims.subcategory, &dims.category);

    let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-02-28").unwrap();
    let names: Vec<&str> = summary.rows().iter().map(|r| r.category.as_str()).collect();
    assert_eq!(names, vec!["Bikes", "Accessories", "Clothing"]);

    let bikes = summary.get("Bikes").unwrap();
    assert_eq!((bikes.total_sales, bikes.total_orders), (2450.0, 4));
    assert_eq!(bikes.average_order_value, 612.5);

    // the 2012-12-31 jersey sale is outside the range
    let clothing = summary.get("Clothing").unwrap();
    assert_eq!((clothing.total_sales, clothing.total_orders), (45.0, 1));
}

#[test]
fn test_seasonal_full_year_totals() {
    let dims = create_synthetic_dimensions().unwrap();
    let fact = create_synthetic_fact_internet_sales_with_seasonality(2013).unwrap();
    let tables = SalesTables::new(&fact, &dims.product, &dims.subcategory, &dims.category);

    let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-12-31").unwrap();
    let expected = [("Bikes", 21420.0, 36), ("Accessories", 1428.0, 24), ("Clothing", 531.0, 12)];
    assert_eq!(summary.len(), 3);
    for (row, (name, total, orders)) in summary.rows().iter().zip(expected) {
        assert_eq!(row.category, name);
        assert!((row.total_sales - total).abs() < 1e-6, "{}: {}", name, row.total_sales);
        assert_eq!(row.total_orders, orders);
    }
}

#[test]
fn test_exported_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let written = export_synthetic_to_csv(dir.path(), "synthetic_").unwrap();
    assert_eq!(written.len(), 4);
    assert!(dir.path().join("synthetic_DimProductCategory.csv").exists());

    let fact = load_dir_table(dir.path(), "synthetic_FactInternetSales.csv");
    let product = load_dir_table(dir.path(), "synthetic_DimProduct.csv");
    let subcategory = load_dir_table(dir.path(), "synthetic_DimProductSubcategory.csv");
    let category = load_dir_table(dir.path(), "synthetic_DimProductCategory.csv");
    assert_eq!(fact.row_count(), 9);

    let tables = SalesTables::new(&fact, &product, &subcategory, &category);
    let from_disk = calculate_sales_summary(&tables, "2013-01-01", "2013-02-28").unwrap();

    let dims = create_synthetic_dimensions().unwrap();
    let literal = create_synthetic_fact_internet_sales().unwrap();
    let in_memory = calculate_sales_summary(
        &SalesTables::new(&literal, &dims.product, &dims.subcategory, &dims.category),
        "2013-01-01",
        "2013-02-28",
    )
    .unwrap();

    assert_eq!(from_disk, in_memory);
}

#[test]
fn test_seasonal_export_uses_prefix() {
    let dir = tempfile::tempdir().unwrap();
    export_synthetic_with_seasonality_to_csv(dir.path(), 2014, "s_").unwrap();

    let fact = load_dir_table(dir.path(), "s_FactInternetSales.csv");
    assert_eq!(fact.row_count(), 72);
}

#[test]
fn test_summary_written_as_csv() {
    let dims = create_synthetic_dimensions().unwrap();
    let fact = create_synthetic_fact_internet_sales().unwrap();
    let tables = SalesTables::new(&fact, &dims.product, &dims.subcategory, &dims.category);
    let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-01-31").unwrap();

    let out = NamedTempFile::new().unwrap();
    summary.to_table().unwrap().write_csv(out.path()).unwrap();

    let text = std::fs::read_to_string(out.path()).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("ProductCategory,TotalSales,TotalOrders,AverageOrderValue")
    );
    assert_eq!(lines.next(), Some("Bikes,1550.0,3,516.6666666666666"));
}

#[test]
fn test_schema_validation_names_both_missing_columns() {
    let mut csv = String::from("TABLE_CATALOG,TABLE_SCHEMA,TABLE_NAME,COLUMN_NAME\n");
    for (table, column) in [
        ("FactInternetSales", "SalesAmount"),
        ("FactInternetSales", "OrderDate"),
        ("FactInternetSales", "ProductKey"),
        ("DimProduct", "ProductKey"),
        ("DimProduct", "ProductSubcategoryKey"),
        ("DimProductSubcategory", "ProductSubcategoryKey"),
        ("DimProductSubcategory", "ProductCategoryKey"),
        ("DimProductCategory", "ProductCategoryKey"),
    ] {
        csv.push_str(&format!("AdventureWorksDW,dbo,{},{}\n", table, column));
    }

    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{}", csv).unwrap();
    let (metadata, parsed) = load_schema_metadata(tmp.path()).unwrap();
    assert!(parsed.errors.is_empty());

    let message = validate_schema_for_sales_summary(&metadata)
        .unwrap_err()
        .to_string();
    assert!(message.contains("dbo.FactInternetSales.SalesOrderNumber"));
    assert!(message.contains("dbo.DimProductCategory.EnglishProductCategoryName"));
}

#[test]
fn test_malformed_fact_rows_are_reported() {
    let mut tmp = NamedTempFile::new().unwrap();
    write!(
        tmp,
        "ProductKey,OrderDate,SalesAmount,SalesOrderNumber\n1000,2013-01-05,100.0,SO1\n1000,2013-01-06,abc,SO2\n"
    )
    .unwrap();

    let mut table = Table::new();
    let err = table
        .load_csv(tmp.path())
        .unwrap()
        .ensure_clean("fact.csv")
        .unwrap_err();
    assert!(matches!(
        err,
        ProcessorError::MalformedRows { count: 1, first_row: 3, .. }
    ));
}
