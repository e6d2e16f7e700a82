//! SalesForge: sales analytics over order, product and customer tables
//!
//! This library derives per-line sales amounts, ranks products into ABC
//! tiers by cumulative sales share, and scores customers on Frequency,
//! Recency and Monetary quartiles to place them in named segments.

pub mod abc;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod frm;
pub mod insights;
pub mod model;
pub mod report;
pub mod sales;
pub mod segment;
pub mod viz;

// Re-export public items for easier access
pub use abc::{classify_abc, AbcCategory, AbcReport, AbcResult};
pub use cli::{Args, Command};
pub use config::{AbcConfig, AbcThresholds, AnalysisConfig, JoinPolicy, Limits};
pub use data::{load_dataset, DataSource, Dataset};
pub use error::{AnalyticsError, DataError, ResourceError, Result, SchemaError};
pub use frm::{segment_frm, FrmRecord};
pub use model::{Customer, OrderLine, OrderRecord, Product};
pub use sales::derive_sales_amount;
pub use segment::{LabelPreset, Segment, SegmentRules};
pub use viz::generate_visualization_report;
