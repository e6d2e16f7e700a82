//! Customer segments and the ordered rule table that assigns them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named customer-behaviour category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Champions,
    LoyalCustomers,
    PotentialLoyalists,
    NeedAttention,
    AtRisk,
    LostCustomers,
}

impl Segment {
    /// All segments in rule-table order.
    pub const ALL: [Segment; 6] = [
        Segment::Champions,
        Segment::LoyalCustomers,
        Segment::PotentialLoyalists,
        Segment::NeedAttention,
        Segment::AtRisk,
        Segment::LostCustomers,
    ];

    /// Parses the snake_case configuration key of a segment.
    pub fn from_key(key: &str) -> Option<Segment> {
        match key {
            "champions" => Some(Segment::Champions),
            "loyal_customers" => Some(Segment::LoyalCustomers),
            "potential_loyalists" => Some(Segment::PotentialLoyalists),
            "need_attention" => Some(Segment::NeedAttention),
            "at_risk" => Some(Segment::AtRisk),
            "lost_customers" => Some(Segment::LostCustomers),
            _ => None,
        }
    }

    /// Suggested follow-up for customers in this segment.
    pub fn recommendation(&self) -> &'static str {
        match self {
            Segment::Champions => {
                "Reward with VIP programs, exclusive discounts and personalised offers; encourage referrals."
            }
            Segment::LoyalCustomers => {
                "Promote cross-sell and upsell; keep engaged with loyalty rewards and product news."
            }
            Segment::PotentialLoyalists => {
                "Nurture with welcome offers and loyalty programs; watch for conversion to loyal."
            }
            Segment::NeedAttention => {
                "Re-engage with personalised offers or reminders; follow up on past issues."
            }
            Segment::AtRisk => "Run win-back campaigns with discounts or reactivation emails.",
            Segment::LostCustomers => {
                "Re-engage only with strong offers or new launches; otherwise focus on acquisition."
            }
        }
    }
}

/// Display label set presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPreset {
    /// Top segment labelled "Champions"
    #[default]
    Champions,
    /// Top segment labelled "VIPs"
    Vips,
}

/// Display names for every segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentLabels {
    labels: [String; 6],
}

impl SegmentLabels {
    pub fn preset(preset: LabelPreset) -> Self {
        let top = match preset {
            LabelPreset::Champions => "Champions",
            LabelPreset::Vips => "VIPs",
        };
        Self {
            labels: [
                top.to_string(),
                "Loyal Customers".to_string(),
                "Potential Loyalists".to_string(),
                "Need Attention".to_string(),
                "At Risk".to_string(),
                "Lost Customers".to_string(),
            ],
        }
    }

    /// Replaces the label of a single segment.
    pub fn with_label(mut self, segment: Segment, label: impl Into<String>) -> Self {
        self.labels[index_of(segment)] = label.into();
        self
    }

    pub fn label(&self, segment: Segment) -> &str {
        &self.labels[index_of(segment)]
    }
}

impl Default for SegmentLabels {
    fn default() -> Self {
        Self::preset(LabelPreset::default())
    }
}

fn index_of(segment: Segment) -> usize {
    Segment::ALL
        .iter()
        .position(|s| *s == segment)
        .unwrap_or_default()
}

/// Quartile scores of one customer, each in `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Scores {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

impl Scores {
    pub fn new(recency: u8, frequency: u8, monetary: u8) -> Self {
        Self {
            recency,
            frequency,
            monetary,
        }
    }

    /// Three-digit code in recency, frequency, monetary order, e.g. `"434"`.
    pub fn code(&self) -> String {
        format!("{}{}{}", self.recency, self.frequency, self.monetary)
    }
}

/// Inclusive score bounds for one metric of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    #[serde(default = "min_score")]
    pub min: u8,
    #[serde(default = "max_score")]
    pub max: u8,
}

fn min_score() -> u8 {
    1
}

fn max_score() -> u8 {
    4
}

impl ScoreRange {
    pub const ANY: ScoreRange = ScoreRange { min: 1, max: 4 };

    pub const fn at_least(min: u8) -> Self {
        Self { min, max: 4 }
    }

    pub const fn exactly(score: u8) -> Self {
        Self {
            min: score,
            max: score,
        }
    }

    pub fn contains(&self, score: u8) -> bool {
        (self.min..=self.max).contains(&score)
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::ANY
    }
}

/// One row of the rule table: the segment assigned when all three ranges match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRule {
    pub segment: Segment,
    #[serde(default)]
    pub recency: ScoreRange,
    #[serde(default)]
    pub frequency: ScoreRange,
    #[serde(default)]
    pub monetary: ScoreRange,
}

impl SegmentRule {
    pub fn matches(&self, scores: &Scores) -> bool {
        self.recency.contains(scores.recency)
            && self.frequency.contains(scores.frequency)
            && self.monetary.contains(scores.monetary)
    }
}

/// Ordered rule list; the first matching rule wins, otherwise `fallback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRules {
    pub rules: Vec<SegmentRule>,
    pub fallback: Segment,
    pub labels: SegmentLabels,
}

impl SegmentRules {
    /// The standard six-segment table with the given labels.
    pub fn canonical(labels: SegmentLabels) -> Self {
        Self {
            rules: canonical_rules(),
            fallback: Segment::LostCustomers,
            labels,
        }
    }

    pub fn classify(&self, scores: &Scores) -> Segment {
        self.rules
            .iter()
            .find(|rule| rule.matches(scores))
            .map(|rule| rule.segment)
            .unwrap_or(self.fallback)
    }

    pub fn label(&self, segment: Segment) -> &str {
        self.labels.label(segment)
    }
}

impl Default for SegmentRules {
    fn default() -> Self {
        Self::canonical(SegmentLabels::default())
    }
}

/// R=4,F>=3,M>=3 / R>=3,F>=3 / R>=3,F>=2 / R=2,F>=2 / R=1,F>=2
pub fn canonical_rules() -> Vec<SegmentRule> {
    vec![
        SegmentRule {
            segment: Segment::Champions,
            recency: ScoreRange::exactly(4),
            frequency: ScoreRange::at_least(3),
            monetary: ScoreRange::at_least(3),
        },
        SegmentRule {
            segment: Segment::LoyalCustomers,
            recency: ScoreRange::at_least(3),
            frequency: ScoreRange::at_least(3),
            monetary: ScoreRange::ANY,
        },
        SegmentRule {
            segment: Segment::PotentialLoyalists,
            recency: ScoreRange::at_least(3),
            frequency: ScoreRange::at_least(2),
            monetary: ScoreRange::ANY,
        },
        SegmentRule {
            segment: Segment::NeedAttention,
            recency: ScoreRange::exactly(2),
            frequency: ScoreRange::at_least(2),
            monetary: ScoreRange::ANY,
        },
        SegmentRule {
            segment: Segment::AtRisk,
            recency: ScoreRange::exactly(1),
            frequency: ScoreRange::at_least(2),
            monetary: ScoreRange::ANY,
        },
    ]
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SegmentLabels::default().label(*self))
    }
}
