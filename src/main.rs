//! SalesForge: ABC product tiers and FRM customer segments from sales tables
//!
//! This is the main entrypoint that orchestrates configuration, data loading,
//! the requested analyses, console reports, JSON exports and charts.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use salesforge::config::AnalysisConfig;
use salesforge::data::Dataset;
use salesforge::insights::{
    customers_by_recent_purchase, daily_sales, inventory_by_category, inventory_by_product, segment_distribution,
};
use salesforge::model::OrderLine;
use salesforge::{classify_abc, derive_sales_amount, load_dataset, report, segment_frm, viz, Args, Command};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.verbose {
        println!("SalesForge - ABC and FRM sales analytics");
        println!("========================================\n");
    }

    let config = args.analysis_config().context("invalid configuration")?;
    debug!(?config, "configuration resolved");

    let start_time = Instant::now();

    // Step 1: Load the three tables
    if args.verbose {
        println!("Step 1: Loading data");
        println!("  Orders:    {}", args.orders.display());
        println!("  Products:  {}", args.products.display());
        println!("  Customers: {}", args.customers.display());
    }

    let data_start = Instant::now();
    let dataset = load_dataset(
        args.orders.clone(),
        args.products.clone(),
        args.customers.clone(),
        &config,
    )?;
    println!(
        "✓ Data loaded: {} order lines, {} products, {} customers",
        dataset.orders.len(),
        dataset.products.len(),
        dataset.customers.len()
    );
    if args.verbose {
        println!("  Loading time: {:.2}s", data_start.elapsed().as_secs_f64());
    }

    match &args.command {
        Command::Preview { rows } => run_preview(&dataset, *rows),
        Command::Inventory => run_inventory(&args, &dataset)?,
        Command::Customers => run_customers(&args, &dataset)?,
        command => {
            // Step 2: Sales amounts are shared by every order-based analysis
            let lines = derive_sales_amount(&dataset.orders, &config.limits)?;
            println!("✓ Sales amounts derived for {} order lines", lines.len());

            match command {
                Command::Abc => run_abc(&args, &config, &dataset, &lines)?,
                Command::Frm => run_frm(&args, &config, &lines)?,
                Command::Trends => run_trends(&args, &lines)?,
                // all
                _ => {
                    run_trends(&args, &lines)?;
                    run_inventory(&args, &dataset)?;
                    run_customers(&args, &dataset)?;
                    run_abc(&args, &config, &dataset, &lines)?;
                    run_frm(&args, &config, &lines)?;
                }
            }
        }
    }

    println!("\n=== Analysis Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Logs go to stderr so report tables on stdout stay clean.
/// `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: bool) {
    let default = if verbose { "salesforge=debug" } else { "salesforge=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_preview(dataset: &Dataset, rows: usize) {
    println!("\n=== Data Preview ===");
    for (table, frame) in dataset.preview(rows) {
        println!("\n{table}:");
        println!("{frame}");
    }
}

fn run_abc(args: &Args, config: &AnalysisConfig, dataset: &Dataset, lines: &[OrderLine]) -> Result<()> {
    println!("\n=== ABC Analysis ===");
    if args.verbose {
        println!(
            "  Thresholds: A <= {:.0}%, B <= {:.0}%",
            config.abc.a_max * 100.0,
            config.abc.b_max * 100.0
        );
        println!("  Join policy: {:?}", config.abc.join_policy);
    }

    let abc_start = Instant::now();
    let abc_report = classify_abc(lines, &dataset.products, &config.abc)?;
    println!("{}", report::format_abc_table(&abc_report));
    if args.verbose {
        println!("  Classification time: {:.2}s", abc_start.elapsed().as_secs_f64());
    }

    let written = viz::generate_visualization_report(Some(&abc_report), None, &args.output_dir)?;
    print_written(&written);

    if args.json {
        let path = args.output_dir.join("abc_analysis.json");
        report::write_json(&abc_report, &path)?;
        println!("✓ JSON saved to: {}", path.display());
    }
    Ok(())
}

fn run_frm(args: &Args, config: &AnalysisConfig, lines: &[OrderLine]) -> Result<()> {
    println!("\n=== FRM Analysis ===");

    let rules = config.segments.to_rules();
    let frm_start = Instant::now();
    let records = segment_frm(lines, &rules)?;
    println!("{}", report::format_frm_table(&records));
    println!(
        "{}",
        report::format_segment_summary(&segment_distribution(&records), &rules)
    );
    if args.verbose {
        println!("  Segmentation time: {:.2}s", frm_start.elapsed().as_secs_f64());
    }

    let written = viz::generate_visualization_report(None, Some((&records, &rules)), &args.output_dir)?;
    print_written(&written);

    if args.json {
        let path = args.output_dir.join("frm_segments.json");
        report::write_json(&records, &path)?;
        println!("✓ JSON saved to: {}", path.display());
    }
    Ok(())
}

fn run_trends(args: &Args, lines: &[OrderLine]) -> Result<()> {
    println!("\n=== Sales Trends ===");
    let daily = daily_sales(lines)?;
    println!("{}", report::format_daily_sales(&daily));

    ensure_dir(&args.output_dir)?;
    let path = args.output_dir.join("sales_trends.png");
    viz::create_sales_trend_chart(&daily, &path)?;
    println!("✓ Chart saved to: {}", path.display());

    if args.json {
        let path = args.output_dir.join("sales_trends.json");
        report::write_json(&daily, &path)?;
        println!("✓ JSON saved to: {}", path.display());
    }
    Ok(())
}

fn run_inventory(args: &Args, dataset: &Dataset) -> Result<()> {
    println!("\n=== Inventory Status ===");
    let by_category = inventory_by_category(&dataset.products);
    println!(
        "{}",
        report::format_inventory(&inventory_by_product(&dataset.products), &by_category)
    );

    ensure_dir(&args.output_dir)?;
    let path = args.output_dir.join("inventory_by_product.png");
    viz::create_inventory_by_product_chart(&inventory_by_product(&dataset.products), &path)?;
    println!("✓ Chart saved to: {}", path.display());

    let path = args.output_dir.join("inventory_levels.png");
    viz::create_inventory_chart(&by_category, &path)?;
    println!("✓ Chart saved to: {}", path.display());
    Ok(())
}

fn run_customers(args: &Args, dataset: &Dataset) -> Result<()> {
    println!("\n=== Customer Behavior ===");
    let customers = customers_by_recent_purchase(&dataset.customers);
    println!("{}", report::format_customers(&customers));

    ensure_dir(&args.output_dir)?;
    let path = args.output_dir.join("customer_spending.png");
    viz::create_customer_spending_chart(&dataset.customers, &path)?;
    println!("✓ Chart saved to: {}", path.display());
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create output directory {}", dir.display()))
}

fn print_written(paths: &[std::path::PathBuf]) {
    for path in paths {
        println!("✓ Chart saved to: {}", path.display());
    }
}
