//! Table loading and validation using Polars
//!
//! Each table is read from CSV, checked against the row ceiling and the
//! configured schema mapping, then converted into typed records.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::{AnalysisConfig, CustomersSchema, Limits, OrdersSchema, ProductsSchema};
use crate::error::{DataError, ResourceError, Result, SchemaError, Table};
use crate::model::{Customer, OrderRecord, Product};

/// Where a table is read from.
#[derive(Debug, Clone)]
pub enum DataSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for DataSource {
    fn from(path: PathBuf) -> Self {
        DataSource::Path(path)
    }
}

impl From<&str> for DataSource {
    fn from(path: &str) -> Self {
        DataSource::Path(PathBuf::from(path))
    }
}

/// The three input tables, typed and validated.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub orders: Vec<OrderRecord>,
    pub products: Vec<Product>,
    pub customers: Vec<Customer>,
    frames: [DataFrame; 3],
}

impl Dataset {
    /// First `rows` rows of each raw table, as read.
    pub fn preview(&self, rows: usize) -> [(Table, DataFrame); 3] {
        let [orders, products, customers] = &self.frames;
        [
            (Table::Orders, orders.head(Some(rows))),
            (Table::Products, products.head(Some(rows))),
            (Table::Customers, customers.head(Some(rows))),
        ]
    }
}

/// Reads and validates all three tables.
///
/// # Arguments
/// * `orders`, `products`, `customers` - CSV sources of each table
/// * `config` - Schema mapping and row ceiling
///
/// # Returns
/// * `Dataset` with typed records for every table
pub fn load_dataset(
    orders: impl Into<DataSource>,
    products: impl Into<DataSource>,
    customers: impl Into<DataSource>,
    config: &AnalysisConfig,
) -> Result<Dataset> {
    let schema = &config.schema;
    let orders_df = read_table(&orders.into(), &schema.orders.text_columns())?;
    let products_df = read_table(&products.into(), &schema.products.text_columns())?;
    let customers_df = read_table(&customers.into(), &schema.customers.text_columns())?;

    let orders = orders_from_frame(&orders_df, &config.schema.orders, &config.limits)?;
    let products = products_from_frame(&products_df, &config.schema.products, &config.limits)?;
    let customers = customers_from_frame(&customers_df, &config.schema.customers, &config.limits)?;

    info!(
        orders = orders.len(),
        products = products.len(),
        customers = customers.len(),
        "dataset loaded"
    );

    Ok(Dataset {
        orders,
        products,
        customers,
        frames: [orders_df, products_df, customers_df],
    })
}

/// Reads one CSV table with a header row, inferring types from every row.
///
/// Columns named in `text_columns` keep their cells verbatim as strings, so
/// identifiers such as `007` and `7` stay distinct.
pub fn read_table(source: &DataSource, text_columns: &[&str]) -> Result<DataFrame> {
    let df = read_csv(source, None)?;

    let inferred: Vec<Field> = text_columns
        .iter()
        .filter(|name| matches!(df.column(name), Ok(series) if series.dtype() != &DataType::String))
        .map(|name| Field::new(name, DataType::String))
        .collect();
    let df = if inferred.is_empty() {
        df
    } else {
        debug!(columns = inferred.len(), "re-reading identifier columns as text");
        read_csv(source, Some(Arc::new(Schema::from_iter(inferred))))?
    };

    debug!(rows = df.height(), columns = df.width(), "read table");
    Ok(df)
}

fn read_csv(source: &DataSource, schema_overwrite: Option<SchemaRef>) -> Result<DataFrame> {
    let options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_schema_overwrite(schema_overwrite);

    let df = match source {
        DataSource::Path(path) => options
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()?,
        DataSource::Bytes(bytes) => options
            .into_reader_with_file_handle(Cursor::new(bytes.clone()))
            .finish()?,
    };
    Ok(df)
}

/// Converts an orders frame into order records.
///
/// Quantity and price cells may be empty; they are rejected later by the
/// sales amount derivation with their row number.
pub fn orders_from_frame(df: &DataFrame, schema: &OrdersSchema, limits: &Limits) -> Result<Vec<OrderRecord>> {
    let table = Table::Orders;
    check_rows(df, table, limits)?;
    require_columns(df, table, &schema.columns())?;

    let order_ids = string_values(df, &schema.order_id)?;
    let dates = string_values(df, &schema.order_date)?;
    let customer_ids = string_values(df, &schema.customer_id)?;
    let product_ids = string_values(df, &schema.product_id)?;
    let quantities = numeric_values(df, table, &schema.quantity)?;
    let prices = numeric_values(df, table, &schema.unit_price)?;

    (0..df.height())
        .map(|i| -> Result<OrderRecord> {
            let row = i + 1;
            Ok(OrderRecord {
                order_id: required(table, &schema.order_id, row, &order_ids[i])?,
                order_date: parse_date(
                    table,
                    &schema.order_date,
                    row,
                    &required(table, &schema.order_date, row, &dates[i])?,
                )?,
                customer_id: required(table, &schema.customer_id, row, &customer_ids[i])?,
                product_id: required(table, &schema.product_id, row, &product_ids[i])?,
                quantity: quantities[i]
                    .map(|q| to_integer(table, &schema.quantity, row, q))
                    .transpose()?,
                unit_price: prices[i]
                    .map(|p| to_decimal(table, &schema.unit_price, row, p))
                    .transpose()?,
            })
        })
        .collect()
}

/// Converts an inventory frame into products.
pub fn products_from_frame(df: &DataFrame, schema: &ProductsSchema, limits: &Limits) -> Result<Vec<Product>> {
    let table = Table::Products;
    check_rows(df, table, limits)?;
    require_columns(df, table, &schema.columns())?;

    let ids = string_values(df, &schema.product_id)?;
    let names = string_values(df, &schema.product_name)?;
    let categories = string_values(df, &schema.category)?;
    let stock = numeric_values(df, table, &schema.stock)?;

    (0..df.height())
        .map(|i| -> Result<Product> {
            let row = i + 1;
            let units = stock[i].ok_or_else(|| missing(table, &schema.stock, row))?;
            let units = to_integer(table, &schema.stock, row, units)?;
            Ok(Product {
                product_id: required(table, &schema.product_id, row, &ids[i])?,
                product_name: required(table, &schema.product_name, row, &names[i])?,
                category: required(table, &schema.category, row, &categories[i])?,
                stock: u64::try_from(units).map_err(|_| DataError::InvalidValue {
                    table,
                    field: schema.stock.clone(),
                    row,
                    reason: format!("{units} is negative"),
                })?,
            })
        })
        .collect()
}

/// Converts a customers frame into customers; `customer_id` must be unique.
pub fn customers_from_frame(df: &DataFrame, schema: &CustomersSchema, limits: &Limits) -> Result<Vec<Customer>> {
    let table = Table::Customers;
    check_rows(df, table, limits)?;
    require_columns(df, table, &schema.columns())?;

    let ids = string_values(df, &schema.customer_id)?;
    let dates = string_values(df, &schema.last_purchase_date)?;
    let spent = numeric_values(df, table, &schema.total_spent)?;

    let mut seen = HashSet::new();
    (0..df.height())
        .map(|i| -> Result<Customer> {
            let row = i + 1;
            let customer_id = required(table, &schema.customer_id, row, &ids[i])?;
            if !seen.insert(customer_id.clone()) {
                return Err(DataError::DuplicateKey {
                    table,
                    field: schema.customer_id.clone(),
                    value: customer_id,
                }
                .into());
            }
            let date = required(table, &schema.last_purchase_date, row, &dates[i])?;
            let total = spent[i].ok_or_else(|| missing(table, &schema.total_spent, row))?;
            let total_spent = to_decimal(table, &schema.total_spent, row, total)?;
            if total_spent < Decimal::ZERO {
                return Err(DataError::InvalidValue {
                    table,
                    field: schema.total_spent.clone(),
                    row,
                    reason: format!("{total_spent} is negative"),
                }
                .into());
            }
            Ok(Customer {
                customer_id,
                last_purchase_date: parse_date(table, &schema.last_purchase_date, row, &date)?,
                total_spent,
            })
        })
        .collect()
}

fn check_rows(df: &DataFrame, table: Table, limits: &Limits) -> Result<()> {
    if df.height() > limits.max_rows {
        return Err(ResourceError::RowLimitExceeded {
            table,
            rows: df.height(),
            limit: limits.max_rows,
        }
        .into());
    }
    Ok(())
}

/// Fails with every missing column listed, not just the first.
fn require_columns(df: &DataFrame, table: Table, columns: &[&str]) -> Result<()> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns { table, columns: missing }.into())
    }
}

/// Column values as trimmed strings; empty cells become `None`.
fn string_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(column)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .collect();
    Ok(values)
}

fn numeric_values(df: &DataFrame, table: Table, column: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(column)?;
    if !series.dtype().is_numeric() {
        return Err(SchemaError::ColumnType {
            table,
            column: column.to_string(),
            expected: "numeric",
            found: series.dtype().to_string(),
        }
        .into());
    }
    let series = series.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

fn required(table: Table, field: &str, row: usize, value: &Option<String>) -> Result<String> {
    value.clone().ok_or_else(|| missing(table, field, row).into())
}

fn missing(table: Table, field: &str, row: usize) -> DataError {
    DataError::MissingValue {
        table,
        field: field.to_string(),
        row,
    }
}

fn to_integer(table: Table, field: &str, row: usize, value: f64) -> Result<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(DataError::InvalidValue {
            table,
            field: field.to_string(),
            row,
            reason: format!("{value} is not a whole number"),
        }
        .into());
    }
    Ok(value as i64)
}

fn to_decimal(table: Table, field: &str, row: usize, value: f64) -> Result<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| {
        DataError::InvalidValue {
            table,
            field: field.to_string(),
            row,
            reason: format!("{value} is not a finite amount"),
        }
        .into()
    })
}

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, RFC 3339 and naive date-times.
fn parse_date(table: Table, field: &str, row: usize, value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .ok_or_else(|| {
            DataError::InvalidValue {
                table,
                field: field.to_string(),
                row,
                reason: format!("'{value}' is not a date"),
            }
            .into()
        })
}
