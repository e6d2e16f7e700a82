//! ABC classification of products by cumulative sales contribution

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rust_decimal::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AbcConfig, JoinPolicy};
use crate::error::{DataError, Result, Table};
use crate::model::{OrderLine, Product};
use crate::sales::add_sales;

/// Priority tier of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AbcCategory {
    A,
    B,
    C,
}

impl AbcCategory {
    pub const ALL: [AbcCategory; 3] = [AbcCategory::A, AbcCategory::B, AbcCategory::C];

    /// Suggested stocking action for the tier.
    pub fn recommendation(&self) -> &'static str {
        match self {
            AbcCategory::A => "High priority: keep sufficient stock and focus marketing here.",
            AbcCategory::B => "Medium priority: monitor stock and consider targeted promotions.",
            AbcCategory::C => "Low priority: minimise investment and review profitability.",
        }
    }
}

impl fmt::Display for AbcCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbcCategory::A => write!(f, "A"),
            AbcCategory::B => write!(f, "B"),
            AbcCategory::C => write!(f, "C"),
        }
    }
}

/// Classification of a single product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbcResult {
    pub product_name: String,
    pub total_sales: Decimal,
    /// Share of all sales covered by this product and every higher-ranked one
    pub cumulative_sales_fraction: f64,
    pub category: AbcCategory,
}

/// Output of a classification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbcReport {
    /// One row per product name, highest sales first
    pub results: Vec<AbcResult>,
    /// Grand total of sales over the classified lines
    pub total_sales: Decimal,
    /// Lines skipped because their product was unknown (`JoinPolicy::Drop` only)
    pub dropped_lines: usize,
}

impl AbcReport {
    /// Number of products in each category, in A, B, C order.
    pub fn category_counts(&self) -> [(AbcCategory, usize); 3] {
        AbcCategory::ALL.map(|category| {
            let count = self
                .results
                .iter()
                .filter(|r| r.category == category)
                .count();
            (category, count)
        })
    }
}

/// Ranks products by total sales and assigns A/B/C tiers.
///
/// Lines are joined to `products` by `product_id` and summed per product
/// name. Products are sorted by total sales descending with ties broken by
/// name ascending. A product is `A` while its cumulative share is at most
/// `a_max`, `B` while it is at most `b_max`, and `C` beyond that. A lone
/// product covers the whole total and is `A`; otherwise the top product gets
/// no special treatment, so one that alone exceeds `a_max` lands in `B` or `C`.
///
/// # Arguments
/// * `lines` - Order lines with sales amounts derived
/// * `products` - Product table, `product_id` must be unique
/// * `config` - Thresholds and unknown-product policy
///
/// # Returns
/// * `AbcReport` with one result per product name
pub fn classify_abc(lines: &[OrderLine], products: &[Product], config: &AbcConfig) -> Result<AbcReport> {
    let (a_max, b_max) = {
        let thresholds = config.thresholds();
        thresholds.validate()?;
        thresholds.as_decimals()?
    };

    let catalog = index_products(products)?;

    // Sum per product name
    let mut sales_by_name: BTreeMap<&str, Decimal> = BTreeMap::new();
    let mut total_sales = Decimal::ZERO;
    let mut dropped_lines = 0;
    for (index, line) in lines.iter().enumerate() {
        match catalog.get(line.product_id.as_str()) {
            Some(product) => {
                // Amounts are non-negative, so no per-name sum exceeds the grand total
                total_sales = add_sales(total_sales, line.sales_amount(), index + 1)?;
                *sales_by_name.entry(product.product_name.as_str()).or_default() += line.sales_amount();
            }
            None => match config.join_policy {
                JoinPolicy::Reject => {
                    return Err(DataError::UnknownProduct {
                        order_id: line.order_id.clone(),
                        product_id: line.product_id.clone(),
                    }
                    .into());
                }
                JoinPolicy::Drop => dropped_lines += 1,
            },
        }
    }

    if dropped_lines > 0 {
        warn!(dropped_lines, "order lines with unknown products were dropped");
    }
    if sales_by_name.is_empty() {
        return Err(DataError::EmptyInput { table: Table::Orders }.into());
    }

    if total_sales.is_zero() {
        return Err(DataError::ZeroTotalSales.into());
    }

    // BTreeMap iteration is name-ascending, and the sort is stable
    let mut ranked: Vec<(&str, Decimal)> = sales_by_name.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let lone = ranked.len() == 1;
    let mut cumulative = Decimal::ZERO;
    let results: Vec<AbcResult> = ranked
        .into_iter()
        .map(|(name, sales)| {
            cumulative += sales;
            let fraction = cumulative / total_sales;
            let category = if lone || fraction <= a_max {
                AbcCategory::A
            } else if fraction <= b_max {
                AbcCategory::B
            } else {
                AbcCategory::C
            };
            AbcResult {
                product_name: name.to_string(),
                total_sales: sales,
                cumulative_sales_fraction: fraction.to_f64().unwrap_or(1.0),
                category,
            }
        })
        .collect();

    debug!(products = results.len(), %total_sales, "ranked products");
    info!(
        products = results.len(),
        dropped_lines, "ABC classification complete"
    );

    Ok(AbcReport {
        results,
        total_sales,
        dropped_lines,
    })
}

fn index_products(products: &[Product]) -> Result<HashMap<&str, &Product>> {
    let mut catalog = HashMap::with_capacity(products.len());
    for product in products {
        if catalog.insert(product.product_id.as_str(), product).is_some() {
            return Err(DataError::DuplicateKey {
                table: Table::Products,
                field: "product_id".into(),
                value: product.product_id.clone(),
            }
            .into());
        }
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AbcThresholds;
    use crate::error::AnalyticsError;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn product(id: &str, name: &str) -> Product {
        Product {
            product_id: id.into(),
            product_name: name.into(),
            category: "Coffee".into(),
            stock: 10,
        }
    }

    fn line(order_id: &str, product_id: &str, quantity: u32, price: Decimal) -> OrderLine {
        OrderLine::new(
            order_id,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "C1",
            product_id,
            quantity,
            price,
        )
    }

    fn three_products() -> (Vec<OrderLine>, Vec<Product>) {
        let products = vec![
            product("P1", "Espresso"),
            product("P2", "Latte"),
            product("P3", "Mocha"),
        ];
        let lines = vec![
            line("O1", "P3", 1, dec!(100)),
            line("O2", "P1", 5, dec!(100)),
            line("O3", "P2", 2, dec!(100)),
            line("O4", "P1", 2, dec!(100)),
        ];
        (lines, products)
    }

    #[test]
    fn test_classify_700_200_100() {
        let (lines, products) = three_products();
        let report = classify_abc(&lines, &products, &AbcConfig::default()).unwrap();

        assert_eq!(report.total_sales, dec!(1000));
        let names: Vec<_> = report.results.iter().map(|r| r.product_name.as_str()).collect();
        assert_eq!(names, ["Espresso", "Latte", "Mocha"]);

        let categories: Vec<_> = report.results.iter().map(|r| r.category).collect();
        assert_eq!(categories, [AbcCategory::A, AbcCategory::B, AbcCategory::C]);

        let fractions: Vec<_> = report
            .results
            .iter()
            .map(|r| r.cumulative_sales_fraction)
            .collect();
        assert!((fractions[0] - 0.70).abs() < 1e-9);
        assert!((fractions[1] - 0.90).abs() < 1e-9);
        assert!((fractions[2] - 1.00).abs() < 1e-9);
    }

    #[test]
    fn test_strict_thresholds_move_boundaries() {
        let (lines, products) = three_products();
        let config = AbcConfig::default().with_thresholds(AbcThresholds::STRICT);
        let report = classify_abc(&lines, &products, &config).unwrap();

        let categories: Vec<_> = report.results.iter().map(|r| r.category).collect();
        assert_eq!(categories, [AbcCategory::A, AbcCategory::B, AbcCategory::C]);

        let loose = AbcConfig::default().with_thresholds(AbcThresholds::new(0.75, 0.95).unwrap());
        let report = classify_abc(&lines, &products, &loose).unwrap();
        let categories: Vec<_> = report.results.iter().map(|r| r.category).collect();
        assert_eq!(categories, [AbcCategory::A, AbcCategory::B, AbcCategory::C]);

        let wide = AbcConfig::default().with_thresholds(AbcThresholds::new(0.9, 1.0).unwrap());
        let report = classify_abc(&lines, &products, &wide).unwrap();
        let categories: Vec<_> = report.results.iter().map(|r| r.category).collect();
        assert_eq!(categories, [AbcCategory::A, AbcCategory::A, AbcCategory::B]);
    }

    #[test]
    fn test_partition_and_monotone_fractions() {
        let products: Vec<_> = (0..12)
            .map(|i| product(&format!("P{i}"), &format!("Item {i:02}")))
            .collect();
        let lines: Vec<_> = (0..12u32)
            .map(|i| line(&format!("O{i}"), &format!("P{i}"), i + 1, dec!(3.25)))
            .collect();

        let report = classify_abc(&lines, &products, &AbcConfig::default()).unwrap();
        assert_eq!(report.results.len(), 12);

        let counts: usize = report.category_counts().iter().map(|(_, n)| n).sum();
        assert_eq!(counts, 12);

        let fractions: Vec<_> = report
            .results
            .iter()
            .map(|r| r.cumulative_sales_fraction)
            .collect();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert!((fractions.last().unwrap() - 1.0).abs() < 1e-9);

        let categories: Vec<_> = report.results.iter().map(|r| r.category).collect();
        assert!(categories.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_dominant_top_product_is_not_forced_into_a() {
        let (_, products) = three_products();
        let lines = vec![
            line("O1", "P1", 85, dec!(1)),
            line("O2", "P2", 10, dec!(1)),
            line("O3", "P3", 5, dec!(1)),
        ];

        let report = classify_abc(&lines, &products, &AbcConfig::default()).unwrap();
        let categories: Vec<_> = report.results.iter().map(|r| r.category).collect();
        assert_eq!(categories, [AbcCategory::B, AbcCategory::C, AbcCategory::C]);
        assert!((report.results[0].cumulative_sales_fraction - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_overflowing_total_is_an_error() {
        let (_, products) = three_products();
        let lines = vec![line("O1", "P1", 1, Decimal::MAX), line("O2", "P2", 1, Decimal::MAX)];

        let err = classify_abc(&lines, &products, &AbcConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Data(DataError::InvalidValue { row: 2, .. })
        ));
    }

    #[test]
    fn test_ties_broken_by_name() {
        let products = vec![product("P1", "Zebra Cake"), product("P2", "Apple Pie")];
        let lines = vec![line("O1", "P1", 1, dec!(10)), line("O2", "P2", 1, dec!(10))];

        let report = classify_abc(&lines, &products, &AbcConfig::default()).unwrap();
        assert_eq!(report.results[0].product_name, "Apple Pie");
        assert_eq!(report.results[1].product_name, "Zebra Cake");
    }

    #[test]
    fn test_single_product_is_a() {
        let products = vec![product("P1", "Espresso")];
        let lines = vec![line("O1", "P1", 3, dec!(2.50))];

        let report = classify_abc(&lines, &products, &AbcConfig::default()).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].category, AbcCategory::A);
        assert!((report.results[0].cumulative_sales_fraction - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_sales() {
        let (_, products) = three_products();
        let lines = vec![line("O1", "P1", 0, dec!(4.00)), line("O2", "P2", 3, dec!(0))];

        let err = classify_abc(&lines, &products, &AbcConfig::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::Data(DataError::ZeroTotalSales)));
    }

    #[test]
    fn test_unknown_product_policies() {
        let (mut lines, products) = three_products();
        lines.push(line("O9", "P404", 1, dec!(50)));

        let err = classify_abc(&lines, &products, &AbcConfig::default()).unwrap_err();
        match err {
            AnalyticsError::Data(DataError::UnknownProduct { order_id, product_id }) => {
                assert_eq!(order_id, "O9");
                assert_eq!(product_id, "P404");
            }
            other => panic!("unexpected error: {other}"),
        }

        let config = AbcConfig::default().with_join_policy(JoinPolicy::Drop);
        let report = classify_abc(&lines, &products, &config).unwrap();
        assert_eq!(report.dropped_lines, 1);
        assert_eq!(report.total_sales, dec!(1000));
    }

    #[test]
    fn test_everything_dropped_is_empty_input() {
        let products = vec![product("P1", "Espresso")];
        let lines = vec![line("O1", "P2", 1, dec!(1))];
        let config = AbcConfig::default().with_join_policy(JoinPolicy::Drop);

        let err = classify_abc(&lines, &products, &config).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Data(DataError::EmptyInput { table: Table::Orders })
        ));
    }

    #[test]
    fn test_duplicate_product_id() {
        let products = vec![product("P1", "Espresso"), product("P1", "Latte")];
        let lines = vec![line("O1", "P1", 1, dec!(1))];

        let err = classify_abc(&lines, &products, &AbcConfig::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::Data(DataError::DuplicateKey { .. })));
    }

    #[test]
    fn test_products_sharing_a_name_are_merged() {
        let products = vec![product("P1", "Espresso"), product("P2", "Espresso")];
        let lines = vec![line("O1", "P1", 1, dec!(3)), line("O2", "P2", 1, dec!(4))];

        let report = classify_abc(&lines, &products, &AbcConfig::default()).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].total_sales, dec!(7));
    }

    #[test]
    fn test_idempotent() {
        let (lines, products) = three_products();
        let config = AbcConfig::default();
        let first = classify_abc(&lines, &products, &config).unwrap();
        let second = classify_abc(&lines, &products, &config).unwrap();
        assert_eq!(first, second);
    }
}
