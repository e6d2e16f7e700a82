//! Chart rendering using Plotters for ABC and FRM results

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use rust_decimal::prelude::ToPrimitive;

use crate::abc::{AbcCategory, AbcReport};
use crate::error::Result;
use crate::frm::FrmRecord;
use crate::insights::{segment_distribution, CategoryStock, DailySales};
use crate::model::Customer;
use crate::report::category_share;
use crate::segment::{Segment, SegmentRules};

/// Color per ABC tier
const CATEGORY_COLORS: [RGBColor; 3] = [GREEN, BLUE, RED];

/// Color per segment, in rule-table order
const SEGMENT_COLORS: [RGBColor; 6] = [
    RGBColor(218, 165, 32),
    GREEN,
    CYAN,
    BLUE,
    MAGENTA,
    RED,
];

fn category_color(category: AbcCategory) -> RGBColor {
    match category {
        AbcCategory::A => CATEGORY_COLORS[0],
        AbcCategory::B => CATEGORY_COLORS[1],
        AbcCategory::C => CATEGORY_COLORS[2],
    }
}

fn segment_color(segment: Segment) -> RGBColor {
    Segment::ALL
        .iter()
        .position(|s| *s == segment)
        .map(|i| SEGMENT_COLORS[i])
        .unwrap_or(BLACK)
}

fn to_f64(value: rust_decimal::Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Bar chart of total sales per product, colored by ABC category
///
/// # Arguments
/// * `report` - ABC classification result
/// * `output_path` - Path to save the PNG plot
pub fn create_abc_chart(report: &AbcReport, output_path: &Path) -> Result<()> {
    let n = report.results.len();
    let max_sales = report
        .results
        .iter()
        .map(|r| to_f64(r.total_sales))
        .fold(0.0, f64::max)
        .max(1.0);

    let root = BitMapBackend::new(output_path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("ABC Analysis", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..(n.max(1) as f64), 0f64..(max_sales * 1.1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Products (ranked by sales)")
        .y_desc("Sales")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for category in AbcCategory::ALL {
        let color = category_color(category);
        let bars: Vec<_> = report
            .results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.category == category)
            .map(|(i, r)| {
                Rectangle::new(
                    [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, to_f64(r.total_sales))],
                    color.filled(),
                )
            })
            .collect();

        chart
            .draw_series(bars)?
            .label(format!(
                "Category {} ({:.0}% of products)",
                category,
                category_share(report, category) * 100.0
            ))
            .legend(move |(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Scatter plot of recency vs monetary, point size by frequency, colored by segment
pub fn create_frm_scatter(records: &[FrmRecord], rules: &SegmentRules, output_path: &Path) -> Result<()> {
    let max_recency = records.iter().map(|r| r.recency_days as f64).fold(0.0, f64::max) + 1.0;
    let max_monetary = records.iter().map(|r| to_f64(r.monetary)).fold(0.0, f64::max) * 1.1 + 1.0;
    let max_frequency = records.iter().map(|r| r.frequency).max().unwrap_or(1).max(1) as f64;

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("FRM Customer Segmentation", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..max_recency, 0f64..max_monetary)?;

    chart
        .configure_mesh()
        .x_desc("Recency (days)")
        .y_desc("Monetary value")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for segment in Segment::ALL {
        let color = segment_color(segment);
        let points: Vec<_> = records
            .iter()
            .filter(|r| r.segment == segment)
            .map(|r| {
                let radius = 3 + (9.0 * r.frequency as f64 / max_frequency) as i32;
                Circle::new((r.recency_days as f64, to_f64(r.monetary)), radius, color.filled())
            })
            .collect();
        if points.is_empty() {
            continue;
        }

        chart
            .draw_series(points)?
            .label(rules.label(segment).to_string())
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Bar chart of customers per segment
pub fn create_segment_chart(records: &[FrmRecord], rules: &SegmentRules, output_path: &Path) -> Result<()> {
    let distribution = segment_distribution(records);
    let max_count = distribution.iter().map(|(_, n)| *n).max().unwrap_or(1).max(1) as f64;

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Customer Segment Distribution", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..(distribution.len() as f64), 0f64..(max_count * 1.1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Segment")
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, (segment, count)) in distribution.iter().enumerate() {
        let color = segment_color(*segment);
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, *count as f64)],
                color.filled(),
            )))?
            .label(format!("{} ({})", rules.label(*segment), count))
            .legend(move |(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], color.filled()));
    }

    chart.configure_series_labels().border_style(BLACK).draw()?;

    root.present()?;
    Ok(())
}

/// Line chart of daily sales
pub fn create_sales_trend_chart(daily: &[DailySales], output_path: &Path) -> Result<()> {
    let values: Vec<f64> = daily.iter().map(|d| to_f64(d.sales_amount)).collect();
    let max_sales = values.iter().copied().fold(0.0, f64::max).max(1.0);

    let root = BitMapBackend::new(output_path, (900, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let caption = match (daily.first(), daily.last()) {
        (Some(first), Some(last)) => format!("Daily Sales Trends ({} to {})", first.date, last.date),
        _ => "Daily Sales Trends".to_string(),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 26))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..(values.len().max(2) as f64 - 1.0), 0f64..(max_sales * 1.1))?;

    chart
        .configure_mesh()
        .x_desc("Day index")
        .y_desc("Sales")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(
        values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
        &BLUE,
    ))?;

    root.present()?;
    Ok(())
}

/// Bar chart of stock per product category
pub fn create_inventory_chart(by_category: &[CategoryStock], output_path: &Path) -> Result<()> {
    let max_stock = by_category.iter().map(|c| c.stock).max().unwrap_or(1).max(1) as f64;

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Inventory Levels by Category", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..(by_category.len().max(1) as f64), 0f64..(max_stock * 1.1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Product category")
        .y_desc("Inventory")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, entry) in by_category.iter().enumerate() {
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, entry.stock as f64)],
                BLUE.filled(),
            )))?
            .label(format!("{} ({})", entry.category, entry.stock))
            .legend(|(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], BLUE.filled()));
    }

    chart.configure_series_labels().border_style(BLACK).draw()?;

    root.present()?;
    Ok(())
}

/// Bar chart of stock per product, in table order
pub fn create_inventory_by_product_chart(by_product: &[(&str, u64)], output_path: &Path) -> Result<()> {
    let bars: Vec<(String, f64)> = by_product
        .iter()
        .map(|(name, stock)| (name.to_string(), *stock as f64))
        .collect();
    create_named_bar_chart("Inventory Levels by Product", "Product", "Inventory", &bars, output_path)
}

/// Bar chart of total spending per customer, in table order
pub fn create_customer_spending_chart(customers: &[Customer], output_path: &Path) -> Result<()> {
    let bars: Vec<(String, f64)> = customers
        .iter()
        .map(|c| (c.customer_id.clone(), to_f64(c.total_spent)))
        .collect();
    create_named_bar_chart("Total Spending per Customer", "Customer", "Total spent", &bars, output_path)
}

/// One bar per named entry, names along the x axis
fn create_named_bar_chart(
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    bars: &[(String, f64)],
    output_path: &Path,
) -> Result<()> {
    let n = bars.len().max(1);
    let max_value = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max).max(1.0);

    let root = BitMapBackend::new(output_path, (900, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d((0..n).into_segmented(), 0f64..(max_value * 1.1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(i) => bars.get(*i).map(|(name, _)| name.clone()).unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.filled())
            .margin(10)
            .data(bars.iter().enumerate().map(|(i, (_, value))| (i, *value))),
    )?;

    root.present()?;
    Ok(())
}

/// Render the ABC chart and the FRM scatter and distribution charts into `output_dir`
///
/// # Returns
/// * Paths of the written PNG files
pub fn generate_visualization_report(
    abc: Option<&AbcReport>,
    frm: Option<(&[FrmRecord], &SegmentRules)>,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    if let Some(report) = abc {
        let path = output_dir.join("abc_analysis.png");
        create_abc_chart(report, &path)?;
        written.push(path);
    }

    if let Some((records, rules)) = frm {
        let scatter = output_dir.join("frm_segments.png");
        create_frm_scatter(records, rules, &scatter)?;
        written.push(scatter);

        let distribution = output_dir.join("frm_distribution.png");
        create_segment_chart(records, rules, &distribution)?;
        written.push(distribution);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abc::classify_abc;
    use crate::config::AbcConfig;
    use crate::frm::segment_frm;
    use crate::insights::{daily_sales, inventory_by_category, inventory_by_product};
    use crate::model::{OrderLine, Product};
    use chrono::{Duration, NaiveDate};
    use rust_decimal::Decimal;
    use tempfile::tempdir;

    fn create_test_data() -> (Vec<OrderLine>, Vec<Product>) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let products: Vec<_> = (1..=4)
            .map(|i| Product {
                product_id: format!("P{i}"),
                product_name: format!("Blend {i}"),
                category: if i % 2 == 0 { "Beans" } else { "Drinks" }.into(),
                stock: 10 * i,
            })
            .collect();

        let mut lines = Vec::new();
        for k in 1..=8i64 {
            for n in 0..k {
                lines.push(OrderLine::new(
                    format!("O{k}-{n}"),
                    start + Duration::days(k * 4 - n),
                    format!("C{k}"),
                    format!("P{}", (k + n) % 4 + 1),
                    1,
                    Decimal::from(k * 5),
                ));
            }
        }
        (lines, products)
    }

    #[test]
    fn test_create_abc_chart() {
        let (lines, products) = create_test_data();
        let report = classify_abc(&lines, &products, &AbcConfig::default()).unwrap();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("abc.png");

        let result = create_abc_chart(&report, &output_path);
        assert!(result.is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_generate_visualization_report() {
        let (lines, products) = create_test_data();
        let report = classify_abc(&lines, &products, &AbcConfig::default()).unwrap();
        let rules = SegmentRules::default();
        let records = segment_frm(&lines, &rules).unwrap();
        let temp_dir = tempdir().unwrap();

        let written =
            generate_visualization_report(Some(&report), Some((&records, &rules)), temp_dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_trend_and_inventory_charts() {
        let (lines, products) = create_test_data();
        let temp_dir = tempdir().unwrap();

        let trend = temp_dir.path().join("trend.png");
        create_sales_trend_chart(&daily_sales(&lines).unwrap(), &trend).unwrap();
        assert!(trend.exists());

        let inventory = temp_dir.path().join("inventory.png");
        create_inventory_chart(&inventory_by_category(&products), &inventory).unwrap();
        assert!(inventory.exists());

        let by_product = temp_dir.path().join("inventory_by_product.png");
        create_inventory_by_product_chart(&inventory_by_product(&products), &by_product).unwrap();
        assert!(by_product.exists());
    }

    #[test]
    fn test_create_customer_spending_chart() {
        let customers: Vec<_> = (1..=5i64)
            .map(|k| Customer {
                customer_id: format!("C{k}"),
                last_purchase_date: NaiveDate::from_ymd_opt(2024, 2, k as u32).unwrap(),
                total_spent: Decimal::from(k * 25),
            })
            .collect();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("spending.png");

        let result = create_customer_spending_chart(&customers, &output_path);
        assert!(result.is_ok());
        assert!(output_path.exists());
    }
}
