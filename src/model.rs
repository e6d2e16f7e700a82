//! Typed rows of the orders, products and customers tables

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// An order row as it comes out of the loader.
///
/// Quantity and unit price stay optional so that the sales amount derivation
/// can reject empty cells with the row they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: String,
    pub order_date: NaiveDate,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

/// An order row with its monetary value derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub order_id: String,
    pub order_date: NaiveDate,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// `quantity * unit_price`, never negative
    sales_amount: Decimal,
}

impl OrderLine {
    /// Builds a line and computes its sales amount.
    ///
    /// Callers are expected to have checked that price is non-negative.
    ///
    /// # Panics
    /// If `quantity * unit_price` overflows `Decimal`; use [`OrderLine::try_new`]
    /// for unchecked input.
    pub fn new(
        order_id: impl Into<String>,
        order_date: NaiveDate,
        customer_id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        match Self::try_new(order_id, order_date, customer_id, product_id, quantity, unit_price) {
            Some(line) => line,
            None => panic!("sales amount overflow: {quantity} * {unit_price}"),
        }
    }

    /// Like [`OrderLine::new`], but returns `None` when the sales amount overflows.
    pub fn try_new(
        order_id: impl Into<String>,
        order_date: NaiveDate,
        customer_id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Option<Self> {
        let sales_amount = Decimal::from(quantity).checked_mul(unit_price)?;
        Some(Self {
            order_id: order_id.into(),
            order_date,
            customer_id: customer_id.into(),
            product_id: product_id.into(),
            quantity,
            unit_price,
            sales_amount,
        })
    }

    pub fn sales_amount(&self) -> Decimal {
        self.sales_amount
    }
}

/// A row of the inventory table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub stock: u64,
}

/// A row of the customers table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Customer {
    pub customer_id: String,
    pub last_purchase_date: NaiveDate,
    pub total_spent: Decimal,
}
