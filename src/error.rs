//! Error taxonomy for the analytics core.
//!
//! Every variant names the table, field or metric it refers to so callers can
//! render a specific message instead of a generic failure.

use std::fmt;

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

/// Input tables known to the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Orders,
    Products,
    Customers,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Orders => write!(f, "orders"),
            Table::Products => write!(f, "products"),
            Table::Customers => write!(f, "customers"),
        }
    }
}

/// FRM metric names used in scoring errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Recency => write!(f, "recency"),
            Metric::Frequency => write!(f, "frequency"),
            Metric::Monetary => write!(f, "monetary"),
        }
    }
}

/// A required column is absent or has the wrong type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// One or more mapped columns are missing from the source table
    #[error("{table} table is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Table that was checked
        table: Table,
        /// Source column names that were not found
        columns: Vec<String>,
    },

    /// A column exists but cannot hold the expected values
    #[error("{table} table column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        table: Table,
        column: String,
        expected: &'static str,
        found: String,
    },
}

/// Values are present but the analysis cannot be computed from them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// A required cell is empty
    #[error("{table} table row {row}: missing value for '{field}'")]
    MissingValue {
        table: Table,
        field: String,
        row: usize,
    },

    /// A cell holds a value outside its domain
    #[error("{table} table row {row}: invalid value for '{field}': {reason}")]
    InvalidValue {
        table: Table,
        field: String,
        row: usize,
        reason: String,
    },

    /// Nothing to analyse
    #[error("{table} table has no rows to analyse")]
    EmptyInput { table: Table },

    /// A key that must be unique appears more than once
    #[error("{table} table has duplicate {field} '{value}'")]
    DuplicateKey {
        table: Table,
        field: String,
        value: String,
    },

    /// An order line references a product that does not exist
    #[error("order '{order_id}' references unknown product '{product_id}'")]
    UnknownProduct {
        order_id: String,
        product_id: String,
    },

    /// Total sales are zero, so contribution shares are undefined
    #[error("total sales are zero; ABC classification is undefined")]
    ZeroTotalSales,

    /// Too few distinct values to form quartiles
    #[error("cannot form quartiles for {metric}: only {distinct} distinct values, need at least 4")]
    InsufficientDistinctValues { metric: Metric, distinct: usize },

    /// Quartile edges collapse onto each other
    #[error("cannot form quartiles for {metric}: quartile edges are not unique")]
    DuplicateQuantileEdges { metric: Metric },
}

/// Input exceeds a configured resource ceiling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("{table} table has {rows} rows, limit is {limit}")]
    RowLimitExceeded {
        table: Table,
        rows: usize,
        limit: usize,
    },
}

/// Top-level error for every fallible operation in the crate.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read table: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Chart rendering failed in the drawing backend
    #[error("failed to render chart: {0}")]
    Chart(String),
}

impl<E> From<DrawingAreaErrorKind<E>> for AnalyticsError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        AnalyticsError::Chart(err.to_string())
    }
}

impl AnalyticsError {
    /// Returns the data error if this is one.
    pub fn as_data(&self) -> Option<&DataError> {
        match self {
            AnalyticsError::Data(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the schema error if this is one.
    pub fn as_schema(&self) -> Option<&SchemaError> {
        match self {
            AnalyticsError::Schema(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias used throughout the library.
pub type Result<T, E = AnalyticsError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_field() {
        let err = AnalyticsError::from(SchemaError::MissingColumns {
            table: Table::Orders,
            columns: vec!["Quantity".into(), "Price".into()],
        });
        assert_eq!(
            err.to_string(),
            "schema error: orders table is missing required columns: Quantity, Price"
        );

        let err = AnalyticsError::from(DataError::InsufficientDistinctValues {
            metric: Metric::Frequency,
            distinct: 2,
        });
        assert!(err.to_string().contains("frequency"));
        assert_eq!(
            err.as_data(),
            Some(&DataError::InsufficientDistinctValues {
                metric: Metric::Frequency,
                distinct: 2
            })
        );
    }
}
