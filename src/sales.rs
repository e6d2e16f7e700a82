//! Sales amount derivation for order lines

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::Limits;
use crate::error::{DataError, ResourceError, Result, Table};
use crate::model::{OrderLine, OrderRecord};

/// Computes `sales_amount = quantity * unit_price` for every order record.
///
/// The whole batch is rejected on the first row with a missing or negative
/// quantity or price; partial totals are never returned. Row numbers in
/// errors are 1-based positions in `records`.
///
/// # Arguments
/// * `records` - Order rows as loaded
/// * `limits` - Row ceiling for the orders table
///
/// # Returns
/// * One `OrderLine` per record, in input order
pub fn derive_sales_amount(records: &[OrderRecord], limits: &Limits) -> Result<Vec<OrderLine>> {
    if records.len() > limits.max_rows {
        return Err(ResourceError::RowLimitExceeded {
            table: Table::Orders,
            rows: records.len(),
            limit: limits.max_rows,
        }
        .into());
    }

    let lines = records
        .iter()
        .enumerate()
        .map(|(index, record)| derive_line(index + 1, record))
        .collect::<Result<Vec<_>>>()?;

    debug!(lines = lines.len(), "derived sales amounts");
    Ok(lines)
}

/// Total sales over a set of derived lines.
///
/// Fails naming the first line whose amount pushes the sum past `Decimal::MAX`.
pub fn total_sales(lines: &[OrderLine]) -> Result<Decimal> {
    lines
        .iter()
        .enumerate()
        .try_fold(Decimal::ZERO, |total, (index, line)| {
            add_sales(total, line.sales_amount(), index + 1)
        })
}

/// Adds one line's amount to a running total without overflowing.
pub(crate) fn add_sales(total: Decimal, amount: Decimal, row: usize) -> Result<Decimal> {
    total.checked_add(amount).ok_or_else(|| {
        DataError::InvalidValue {
            table: Table::Orders,
            field: "sales_amount".into(),
            row,
            reason: format!("adding {amount} to running total {total} overflows"),
        }
        .into()
    })
}

fn derive_line(row: usize, record: &OrderRecord) -> Result<OrderLine> {
    let quantity = record.quantity.ok_or_else(|| missing("quantity", row))?;
    let unit_price = record.unit_price.ok_or_else(|| missing("unit_price", row))?;

    let quantity = u32::try_from(quantity).map_err(|_| DataError::InvalidValue {
        table: Table::Orders,
        field: "quantity".into(),
        row,
        reason: format!("{quantity} is not a non-negative 32-bit integer"),
    })?;
    if unit_price < Decimal::ZERO {
        return Err(DataError::InvalidValue {
            table: Table::Orders,
            field: "unit_price".into(),
            row,
            reason: format!("{unit_price} is negative"),
        }
        .into());
    }

    OrderLine::try_new(
        record.order_id.clone(),
        record.order_date,
        record.customer_id.clone(),
        record.product_id.clone(),
        quantity,
        unit_price,
    )
    .ok_or_else(|| {
        DataError::InvalidValue {
            table: Table::Orders,
            field: "sales_amount".into(),
            row,
            reason: format!("{quantity} * {unit_price} overflows"),
        }
        .into()
    })
}

fn missing(field: &str, row: usize) -> DataError {
    DataError::MissingValue {
        table: Table::Orders,
        field: field.into(),
        row,
    }
}
