//! Descriptive views over the loaded tables: daily sales, inventory levels,
//! customer purchase recency and segment distribution.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Result;
use crate::frm::FrmRecord;
use crate::model::{Customer, OrderLine, Product};
use crate::sales::add_sales;
use crate::segment::Segment;

/// Sales total of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub sales_amount: Decimal,
}

/// Stock held under one product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStock {
    pub category: String,
    pub stock: u64,
}

/// Sums sales per order date, earliest day first.
pub fn daily_sales(lines: &[OrderLine]) -> Result<Vec<DailySales>> {
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for (index, line) in lines.iter().enumerate() {
        let total = by_date.entry(line.order_date).or_default();
        *total = add_sales(*total, line.sales_amount(), index + 1)?;
    }
    Ok(by_date
        .into_iter()
        .map(|(date, sales_amount)| DailySales { date, sales_amount })
        .collect())
}

/// Stock per product name, in table order.
pub fn inventory_by_product(products: &[Product]) -> Vec<(&str, u64)> {
    products
        .iter()
        .map(|p| (p.product_name.as_str(), p.stock))
        .collect()
}

/// Stock summed per category, categories in ascending order.
pub fn inventory_by_category(products: &[Product]) -> Vec<CategoryStock> {
    let mut by_category: BTreeMap<&str, u64> = BTreeMap::new();
    for product in products {
        *by_category.entry(product.category.as_str()).or_default() += product.stock;
    }
    by_category
        .into_iter()
        .map(|(category, stock)| CategoryStock {
            category: category.to_string(),
            stock,
        })
        .collect()
}

/// Customers ordered by last purchase, most recent first; ties by id.
pub fn customers_by_recent_purchase(customers: &[Customer]) -> Vec<&Customer> {
    let mut sorted: Vec<&Customer> = customers.iter().collect();
    sorted.sort_by(|a, b| {
        b.last_purchase_date
            .cmp(&a.last_purchase_date)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    sorted
}

/// Number of customers per segment, in rule-table order, empty segments included.
pub fn segment_distribution(records: &[FrmRecord]) -> Vec<(Segment, usize)> {
    Segment::ALL
        .iter()
        .map(|&segment| {
            let count = records.iter().filter(|r| r.segment == segment).count();
            (segment, count)
        })
        .collect()
}
