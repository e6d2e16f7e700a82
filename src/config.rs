//! Analysis configuration.
//!
//! Settings that shape a run:
//! - ABC thresholds and the unknown-product join policy
//! - Segment rules and display labels
//! - Row ceilings
//! - Source column names for each logical field
//!
//! Every field has a default, so an empty TOML file is a valid configuration.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::segment::{canonical_rules, LabelPreset, Segment, SegmentLabels, SegmentRule, SegmentRules};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub abc: AbcConfig,
    pub segments: SegmentsConfig,
    pub limits: Limits,
    pub schema: SchemaMapping,
}

impl AnalysisConfig {
    /// Parses a TOML document and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.abc.thresholds().validate()?;
        if self.limits.max_rows == 0 {
            return Err(AnalyticsError::Config("limits.max_rows must be positive".into()));
        }
        self.segments.validate()
    }
}

/// Cumulative-share cutoffs for the A and B tiers, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbcThresholds {
    pub a_max: f64,
    pub b_max: f64,
}

impl AbcThresholds {
    /// 70% / 90%
    pub const STANDARD: AbcThresholds = AbcThresholds {
        a_max: 0.70,
        b_max: 0.90,
    };

    /// 80% / 95%
    pub const STRICT: AbcThresholds = AbcThresholds {
        a_max: 0.80,
        b_max: 0.95,
    };

    pub fn new(a_max: f64, b_max: f64) -> Result<Self> {
        let thresholds = Self { a_max, b_max };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Requires `0 < a_max < b_max <= 1`.
    pub fn validate(&self) -> Result<()> {
        let valid = self.a_max.is_finite()
            && self.b_max.is_finite()
            && self.a_max > 0.0
            && self.a_max < self.b_max
            && self.b_max <= 1.0;
        if valid {
            Ok(())
        } else {
            Err(AnalyticsError::Config(format!(
                "ABC thresholds must satisfy 0 < a_max < b_max <= 1, got a_max={} b_max={}",
                self.a_max, self.b_max
            )))
        }
    }

    /// Thresholds as exact decimals for comparison against cumulative shares.
    pub(crate) fn as_decimals(&self) -> Result<(Decimal, Decimal)> {
        let convert = |v: f64| {
            Decimal::from_f64(v)
                .ok_or_else(|| AnalyticsError::Config(format!("threshold {v} is not representable")))
        };
        Ok((convert(self.a_max)?, convert(self.b_max)?))
    }
}

impl Default for AbcThresholds {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// What to do with order lines whose product is not in the products table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Fail the whole analysis on the first unknown product
    #[default]
    Reject,
    /// Skip the line and report how many were skipped
    Drop,
}

/// ABC classification settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbcConfig {
    pub a_max: f64,
    pub b_max: f64,
    pub join_policy: JoinPolicy,
}

impl AbcConfig {
    pub fn thresholds(&self) -> AbcThresholds {
        AbcThresholds {
            a_max: self.a_max,
            b_max: self.b_max,
        }
    }

    pub fn with_thresholds(mut self, thresholds: AbcThresholds) -> Self {
        self.a_max = thresholds.a_max;
        self.b_max = thresholds.b_max;
        self
    }

    pub fn with_join_policy(mut self, join_policy: JoinPolicy) -> Self {
        self.join_policy = join_policy;
        self
    }
}

impl Default for AbcConfig {
    fn default() -> Self {
        Self {
            a_max: AbcThresholds::STANDARD.a_max,
            b_max: AbcThresholds::STANDARD.b_max,
            join_policy: JoinPolicy::default(),
        }
    }
}

/// Segment table and label settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentsConfig {
    /// Label preset for the six segments
    pub labels: LabelPreset,
    /// Per-segment label overrides applied on top of the preset, keyed by
    /// snake_case segment name
    pub label_overrides: BTreeMap<String, String>,
    /// Ordered rules; the canonical table when absent
    pub rules: Option<Vec<SegmentRule>>,
    /// Segment for score triples no rule matches
    pub fallback: Segment,
}

impl Default for SegmentsConfig {
    fn default() -> Self {
        Self {
            labels: LabelPreset::default(),
            label_overrides: BTreeMap::new(),
            rules: None,
            fallback: Segment::LostCustomers,
        }
    }
}

impl SegmentsConfig {
    pub fn to_rules(&self) -> SegmentRules {
        let labels = self
            .label_overrides
            .iter()
            .filter_map(|(key, label)| Segment::from_key(key).map(|segment| (segment, label)))
            .fold(SegmentLabels::preset(self.labels), |labels, (segment, label)| {
                labels.with_label(segment, label.clone())
            });
        SegmentRules {
            rules: self.rules.clone().unwrap_or_else(canonical_rules),
            fallback: self.fallback,
            labels,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(key) = self
            .label_overrides
            .keys()
            .find(|key| Segment::from_key(key).is_none())
        {
            return Err(AnalyticsError::Config(format!(
                "segments.label_overrides has unknown segment '{key}'"
            )));
        }
        let Some(rules) = &self.rules else {
            return Ok(());
        };
        if rules.is_empty() {
            return Err(AnalyticsError::Config("segments.rules must not be empty".into()));
        }
        for rule in rules {
            for range in [rule.recency, rule.frequency, rule.monetary] {
                if range.min < 1 || range.max > 4 || range.min > range.max {
                    return Err(AnalyticsError::Config(format!(
                        "rule for {:?} has score range {}..={}, expected bounds within 1..=4",
                        rule.segment, range.min, range.max
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Row ceilings applied to every input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_rows: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rows: 1_000_000,
        }
    }
}

/// Source column names for every logical field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaMapping {
    pub orders: OrdersSchema,
    pub products: ProductsSchema,
    pub customers: CustomersSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersSchema {
    pub order_id: String,
    pub order_date: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: String,
    pub unit_price: String,
}

impl Default for OrdersSchema {
    fn default() -> Self {
        Self {
            order_id: "Order_ID".into(),
            order_date: "Order_Date".into(),
            customer_id: "Customer_ID".into(),
            product_id: "Product_ID".into(),
            quantity: "Quantity".into(),
            unit_price: "Price".into(),
        }
    }
}

impl OrdersSchema {
    pub fn columns(&self) -> [&str; 6] {
        [
            self.order_id.as_str(),
            self.order_date.as_str(),
            self.customer_id.as_str(),
            self.product_id.as_str(),
            self.quantity.as_str(),
            self.unit_price.as_str(),
        ]
    }

    /// Columns read verbatim as text, never type-inferred.
    pub fn text_columns(&self) -> [&str; 3] {
        [
            self.order_id.as_str(),
            self.customer_id.as_str(),
            self.product_id.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductsSchema {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub stock: String,
}

impl Default for ProductsSchema {
    fn default() -> Self {
        Self {
            product_id: "Product_ID".into(),
            product_name: "Product_Name".into(),
            category: "Category".into(),
            stock: "Stock".into(),
        }
    }
}

impl ProductsSchema {
    pub fn columns(&self) -> [&str; 4] {
        [
            self.product_id.as_str(),
            self.product_name.as_str(),
            self.category.as_str(),
            self.stock.as_str(),
        ]
    }

    pub fn text_columns(&self) -> [&str; 3] {
        [
            self.product_id.as_str(),
            self.product_name.as_str(),
            self.category.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomersSchema {
    pub customer_id: String,
    pub last_purchase_date: String,
    pub total_spent: String,
}

impl Default for CustomersSchema {
    fn default() -> Self {
        Self {
            customer_id: "Customer_ID".into(),
            last_purchase_date: "Last_Purchase_Date".into(),
            total_spent: "Total_Spent".into(),
        }
    }
}

impl CustomersSchema {
    pub fn columns(&self) -> [&str; 3] {
        [
            self.customer_id.as_str(),
            self.last_purchase_date.as_str(),
            self.total_spent.as_str(),
        ]
    }

    pub fn text_columns(&self) -> [&str; 1] {
        [self.customer_id.as_str()]
    }
}
