//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{AbcThresholds, AnalysisConfig, JoinPolicy};
use crate::segment::LabelPreset;

/// Sales analytics CLI: ABC product tiers and FRM customer segments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the orders CSV file
    #[arg(long, default_value = "orders.csv")]
    pub orders: PathBuf,

    /// Path to the products CSV file
    #[arg(long, default_value = "products.csv")]
    pub products: PathBuf,

    /// Path to the customers CSV file
    #[arg(long, default_value = "customers.csv")]
    pub customers: PathBuf,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for charts and JSON exports
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Also write results as JSON into the output directory
    #[arg(long)]
    pub json: bool,

    /// Named ABC threshold preset
    #[arg(long, value_enum)]
    pub thresholds: Option<ThresholdPreset>,

    /// Upper cumulative share of tier A, e.g. 0.7
    #[arg(long)]
    pub a_threshold: Option<f64>,

    /// Upper cumulative share of tier B, e.g. 0.9
    #[arg(long)]
    pub b_threshold: Option<f64>,

    /// Segment label set
    #[arg(long, value_enum)]
    pub labels: Option<LabelsArg>,

    /// Handling of order lines whose product is unknown
    #[arg(long, value_enum)]
    pub join_policy: Option<JoinPolicyArg>,

    /// Maximum rows accepted per input table
    #[arg(long)]
    pub max_rows: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the first rows of each input table
    Preview {
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,
    },
    /// ABC classification of products
    Abc,
    /// FRM scoring and customer segmentation
    Frm,
    /// Daily sales trend
    Trends,
    /// Inventory levels by product and category
    Inventory,
    /// Customers by most recent purchase
    Customers,
    /// Every analysis in sequence
    All,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdPreset {
    /// 70% / 90%
    Standard,
    /// 80% / 95%
    Strict,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelsArg {
    Champions,
    Vips,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicyArg {
    Reject,
    Drop,
}

impl From<ThresholdPreset> for AbcThresholds {
    fn from(preset: ThresholdPreset) -> Self {
        match preset {
            ThresholdPreset::Standard => AbcThresholds::STANDARD,
            ThresholdPreset::Strict => AbcThresholds::STRICT,
        }
    }
}

impl From<LabelsArg> for LabelPreset {
    fn from(labels: LabelsArg) -> Self {
        match labels {
            LabelsArg::Champions => LabelPreset::Champions,
            LabelsArg::Vips => LabelPreset::Vips,
        }
    }
}

impl From<JoinPolicyArg> for JoinPolicy {
    fn from(policy: JoinPolicyArg) -> Self {
        match policy {
            JoinPolicyArg::Reject => JoinPolicy::Reject,
            JoinPolicyArg::Drop => JoinPolicy::Drop,
        }
    }
}

impl Args {
    /// Build the run configuration: the config file (or defaults) with
    /// command-line overrides applied on top, then validated.
    ///
    /// A threshold preset is applied before the individual
    /// `--a-threshold`/`--b-threshold` values.
    pub fn analysis_config(&self) -> crate::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(preset) = self.thresholds {
            config.abc = config.abc.with_thresholds(preset.into());
        }
        if self.a_threshold.is_some() || self.b_threshold.is_some() {
            let current = config.abc.thresholds();
            let thresholds = AbcThresholds::new(
                self.a_threshold.unwrap_or(current.a_max),
                self.b_threshold.unwrap_or(current.b_max),
            )?;
            config.abc = config.abc.with_thresholds(thresholds);
        }
        if let Some(policy) = self.join_policy {
            config.abc = config.abc.with_join_policy(policy.into());
        }
        if let Some(labels) = self.labels {
            config.segments.labels = labels.into();
        }
        if let Some(max_rows) = self.max_rows {
            config.limits.max_rows = max_rows;
        }

        config.validate()?;
        Ok(config)
    }
}
