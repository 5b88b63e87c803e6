use sales_summary::{
    SalesTables, calculate_sales_summary,
    synthetic::{create_synthetic_dimensions, random_fact_table},
};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _profiler = dhat::Profiler::new_heap();

    let dims = create_synthetic_dimensions()?;
    let fact = random_fact_table(1_000_000, 42)?;
    let tables = SalesTables::new(&fact, &dims.product, &dims.subcategory, &dims.category);

    let summary = calculate_sales_summary(&tables, "2013-01-01", "2013-12-31")?;
    print!("{}", summary);

    println!("Memory benchmark finished. See dhat-heap.json for details");
    Ok(())
}
