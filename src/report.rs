//! Console tables and JSON export for analysis results
//!
//! Each table is a `Display` wrapper over borrowed results; the `format_*`
//! functions render them to a `String`.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::abc::{AbcCategory, AbcReport};
use crate::error::Result;
use crate::frm::FrmRecord;
use crate::insights::{CategoryStock, DailySales};
use crate::model::Customer;
use crate::segment::{Segment, SegmentRules};

/// ABC results as a fixed-width table followed by per-tier recommendations.
pub struct AbcTable<'a>(pub &'a AbcReport);

impl fmt::Display for AbcTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "{:<32} | {:>12} | {:>10} | Category", "Product", "Sales", "Cumulative")?;
        writeln!(f, "{:-<32}-+-{:->12}-+-{:->10}-+---------", "", "", "")?;
        for result in &report.results {
            writeln!(
                f,
                "{:<32} | {:>12.2} | {:>9.1}% | {}",
                result.product_name,
                result.total_sales,
                result.cumulative_sales_fraction * 100.0,
                result.category
            )?;
        }
        writeln!(f, "\nTotal sales: {:.2}", report.total_sales)?;
        if report.dropped_lines > 0 {
            writeln!(f, "Order lines dropped (unknown product): {}", report.dropped_lines)?;
        }

        writeln!(f, "\nRecommendations:")?;
        for (category, count) in report.category_counts() {
            writeln!(f, "  {} ({} products): {}", category, count, category.recommendation())?;
        }
        Ok(())
    }
}

/// FRM results, one row per customer.
pub struct FrmTable<'a>(pub &'a [FrmRecord]);

impl fmt::Display for FrmTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<14} | {:>7} | {:>9} | {:>12} | Score | Segment",
            "Customer", "Recency", "Frequency", "Monetary"
        )?;
        writeln!(f, "{:-<14}-+-{:->7}-+-{:->9}-+-{:->12}-+-------+--------", "", "", "", "")?;
        for record in self.0 {
            writeln!(
                f,
                "{:<14} | {:>7} | {:>9} | {:>12.2} | {:>5} | {}",
                record.customer_id,
                record.recency_days,
                record.frequency,
                record.monetary,
                record.score,
                record.segment_label
            )?;
        }
        Ok(())
    }
}

/// Customer count and recommendation per segment.
pub struct SegmentSummary<'a> {
    pub distribution: &'a [(Segment, usize)],
    pub rules: &'a SegmentRules,
}

impl fmt::Display for SegmentSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total: usize = self.distribution.iter().map(|(_, n)| n).sum();
        writeln!(f, "Segment distribution ({total} customers):")?;
        for (segment, count) in self.distribution {
            let share = if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64 * 100.0
            };
            writeln!(
                f,
                "  {:<20} {:>5} ({:>5.1}%)  {}",
                self.rules.label(*segment),
                count,
                share,
                segment.recommendation()
            )?;
        }
        Ok(())
    }
}

pub struct DailySalesTable<'a>(pub &'a [DailySales]);

impl fmt::Display for DailySalesTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10} | {:>12}", "Date", "Sales")?;
        for day in self.0 {
            writeln!(f, "{} | {:>12.2}", day.date, day.sales_amount)?;
        }
        Ok(())
    }
}

pub struct InventoryTable<'a> {
    pub by_product: &'a [(&'a str, u64)],
    pub by_category: &'a [CategoryStock],
}

impl fmt::Display for InventoryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inventory by product:")?;
        for (name, stock) in self.by_product {
            writeln!(f, "  {name:<32} {stock:>8}")?;
        }
        writeln!(f, "\nInventory by category:")?;
        for entry in self.by_category {
            writeln!(f, "  {:<32} {:>8}", entry.category, entry.stock)?;
        }
        Ok(())
    }
}

pub struct CustomerTable<'a>(pub &'a [&'a Customer]);

impl fmt::Display for CustomerTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<14} | {:<13} | {:>12}", "Customer", "Last purchase", "Total spent")?;
        for customer in self.0 {
            writeln!(
                f,
                "{:<14} | {:<13} | {:>12.2}",
                customer.customer_id,
                customer.last_purchase_date.to_string(),
                customer.total_spent
            )?;
        }
        Ok(())
    }
}

pub fn format_abc_table(report: &AbcReport) -> String {
    AbcTable(report).to_string()
}

pub fn format_frm_table(records: &[FrmRecord]) -> String {
    FrmTable(records).to_string()
}

pub fn format_segment_summary(distribution: &[(Segment, usize)], rules: &SegmentRules) -> String {
    SegmentSummary { distribution, rules }.to_string()
}

pub fn format_daily_sales(daily: &[DailySales]) -> String {
    DailySalesTable(daily).to_string()
}

pub fn format_inventory(by_product: &[(&str, u64)], by_category: &[CategoryStock]) -> String {
    InventoryTable {
        by_product,
        by_category,
    }
    .to_string()
}

pub fn format_customers(customers: &[&Customer]) -> String {
    CustomerTable(customers).to_string()
}

/// Writes any serializable result as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

/// Fraction of products that fall in `category`.
pub fn category_share(report: &AbcReport, category: AbcCategory) -> f64 {
    if report.results.is_empty() {
        return 0.0;
    }
    let count = report
        .results
        .iter()
        .filter(|r| r.category == category)
        .count();
    count as f64 / report.results.len() as f64
}
