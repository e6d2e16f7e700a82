//! Recency / Frequency / Monetary scoring and customer segmentation
//!
//! Metrics are computed per customer, each metric is cut into quartiles
//! across all customers, and the resulting score triple is mapped to a
//! segment by an ordered rule table.
//!
//! Quartile edges are the 0, 25, 50, 75 and 100 percent quantiles with
//! linear interpolation between order statistics. Bins are closed on the
//! right and the first bin also holds the minimum, so equal values always
//! share a score. A metric with fewer than four distinct values, or whose
//! edges collapse onto each other, cannot be scored and fails with a
//! `DataError` naming the metric.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{DataError, Metric, Result, Table};
use crate::model::OrderLine;
use crate::sales::add_sales;
use crate::segment::{Scores, Segment, SegmentRules};

/// Raw per-customer metrics before scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerMetrics {
    pub customer_id: String,
    /// Days between the latest order in the dataset and the customer's latest order
    pub recency_days: i64,
    /// Number of order lines
    pub frequency: usize,
    /// Sum of sales amounts
    pub monetary: Decimal,
}

/// Scored and segmented customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrmRecord {
    pub customer_id: String,
    pub recency_days: i64,
    pub frequency: usize,
    pub monetary: Decimal,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    /// Scores concatenated in R, F, M order
    pub score: String,
    pub segment: Segment,
    /// Display label of `segment` under the configured label set
    pub segment_label: String,
}

impl FrmRecord {
    pub fn scores(&self) -> Scores {
        Scores::new(self.recency_score, self.frequency_score, self.monetary_score)
    }
}

/// Which end of a metric earns the top score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreDirection {
    /// Smallest values score 4
    LowerIsBetter,
    /// Largest values score 4
    HigherIsBetter,
}

/// Aggregates order lines into per-customer metrics, sorted by customer id.
pub fn compute_metrics(lines: &[OrderLine]) -> Result<Vec<CustomerMetrics>> {
    let latest_overall = lines
        .iter()
        .map(|line| line.order_date)
        .max()
        .ok_or(DataError::EmptyInput { table: Table::Orders })?;

    let mut by_customer: BTreeMap<&str, (NaiveDate, usize, Decimal)> = BTreeMap::new();
    for (index, line) in lines.iter().enumerate() {
        let entry = by_customer
            .entry(line.customer_id.as_str())
            .or_insert((line.order_date, 0, Decimal::ZERO));
        entry.0 = entry.0.max(line.order_date);
        entry.1 += 1;
        entry.2 = add_sales(entry.2, line.sales_amount(), index + 1)?;
    }

    let metrics: Vec<CustomerMetrics> = by_customer
        .into_iter()
        .map(|(customer_id, (latest, frequency, monetary))| CustomerMetrics {
            customer_id: customer_id.to_string(),
            recency_days: latest_overall.signed_duration_since(latest).num_days(),
            frequency,
            monetary,
        })
        .collect();

    debug!(customers = metrics.len(), %latest_overall, "computed customer metrics");
    Ok(metrics)
}

/// Quartile edges of `values` at 0, 25, 50, 75 and 100 percent.
///
/// Uses linear interpolation between the two nearest order statistics.
/// `values` must not be empty.
pub fn quartile_edges(values: &[f64]) -> [f64; 5] {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let last = sorted.len() - 1;

    [0.0, 0.25, 0.5, 0.75, 1.0].map(|q| {
        let position = q * last as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let weight = position - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * weight
    })
}

/// Assigns a 1..=4 quartile score to each value.
///
/// # Arguments
/// * `values` - Metric value per customer
/// * `metric` - Metric name reported in errors
/// * `direction` - Which end of the distribution scores 4
///
/// # Returns
/// * One score per input value, in input order
pub fn quartile_scores(values: &[f64], metric: Metric, direction: ScoreDirection) -> Result<Vec<u8>> {
    let mut distinct = values.to_vec();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();
    if distinct.len() < 4 {
        return Err(DataError::InsufficientDistinctValues {
            metric,
            distinct: distinct.len(),
        }
        .into());
    }

    let edges = quartile_edges(values);
    if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(DataError::DuplicateQuantileEdges { metric }.into());
    }

    Ok(values
        .iter()
        .map(|&value| {
            let bin = edges[1..]
                .iter()
                .position(|&edge| value <= edge)
                .unwrap_or(3) as u8;
            match direction {
                ScoreDirection::LowerIsBetter => 4 - bin,
                ScoreDirection::HigherIsBetter => bin + 1,
            }
        })
        .collect())
}

/// Computes FRM metrics, quartile scores and segments for every customer.
///
/// # Arguments
/// * `lines` - Order lines with sales amounts derived
/// * `rules` - Ordered segment rules and their labels
///
/// # Returns
/// * One `FrmRecord` per customer, sorted by customer id
pub fn segment_frm(lines: &[OrderLine], rules: &SegmentRules) -> Result<Vec<FrmRecord>> {
    let metrics = compute_metrics(lines)?;

    let recency: Vec<f64> = metrics.iter().map(|m| m.recency_days as f64).collect();
    let frequency: Vec<f64> = metrics.iter().map(|m| m.frequency as f64).collect();
    let monetary: Vec<f64> = metrics
        .iter()
        .map(|m| m.monetary.to_f64().unwrap_or(f64::MAX))
        .collect();

    let recency_scores = quartile_scores(&recency, Metric::Recency, ScoreDirection::LowerIsBetter)?;
    let frequency_scores = quartile_scores(&frequency, Metric::Frequency, ScoreDirection::HigherIsBetter)?;
    let monetary_scores = quartile_scores(&monetary, Metric::Monetary, ScoreDirection::HigherIsBetter)?;

    let records: Vec<FrmRecord> = metrics
        .into_iter()
        .enumerate()
        .map(|(i, m)| {
            let scores = Scores::new(recency_scores[i], frequency_scores[i], monetary_scores[i]);
            let segment = rules.classify(&scores);
            FrmRecord {
                customer_id: m.customer_id,
                recency_days: m.recency_days,
                frequency: m.frequency,
                monetary: m.monetary,
                recency_score: scores.recency,
                frequency_score: scores.frequency,
                monetary_score: scores.monetary,
                score: scores.code(),
                segment,
                segment_label: rules.label(segment).to_string(),
            }
        })
        .collect();

    info!(customers = records.len(), "FRM segmentation complete");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::segment::{LabelPreset, SegmentLabels};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn latest() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    /// Customer `k` in 1..=8 has `k` orders, the latest `(8 - k) * 5` days
    /// before the newest order, each worth `k * 10`.
    fn ladder() -> Vec<OrderLine> {
        let mut lines = Vec::new();
        for k in 1..=8i64 {
            let last_date = latest() - Duration::days((8 - k) * 5);
            for n in 0..k {
                lines.push(OrderLine::new(
                    format!("O{k}-{n}"),
                    last_date - Duration::days(n * 30),
                    format!("C{k}"),
                    "P1",
                    1,
                    Decimal::from(k * 10),
                ));
            }
        }
        lines
    }

    #[test]
    fn test_compute_metrics() {
        let metrics = compute_metrics(&ladder()).unwrap();
        assert_eq!(metrics.len(), 8);

        let c8 = metrics.iter().find(|m| m.customer_id == "C8").unwrap();
        assert_eq!(c8.recency_days, 0);
        assert_eq!(c8.frequency, 8);
        assert_eq!(c8.monetary, dec!(640));

        let c1 = metrics.iter().find(|m| m.customer_id == "C1").unwrap();
        assert_eq!(c1.recency_days, 35);
        assert_eq!(c1.frequency, 1);
        assert_eq!(c1.monetary, dec!(10));

        assert!(metrics.iter().all(|m| m.recency_days >= 0 && m.frequency >= 1));
    }

    #[test]
    fn test_quartile_edges_interpolate() {
        let edges = quartile_edges(&[0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0]);
        assert_eq!(edges, [0.0, 8.75, 17.5, 26.25, 35.0]);
    }

    #[test]
    fn test_quartile_scores_directions() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let up = quartile_scores(&values, Metric::Frequency, ScoreDirection::HigherIsBetter).unwrap();
        assert_eq!(up, [1, 1, 2, 2, 3, 3, 4, 4]);

        let down = quartile_scores(&values, Metric::Recency, ScoreDirection::LowerIsBetter).unwrap();
        assert_eq!(down, [4, 4, 3, 3, 2, 2, 1, 1]);
    }

    #[test]
    fn test_equal_values_share_a_score() {
        // edges: 1, 2, 3.5, 5.25, 7
        let values = [1.0, 2.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(quartile_edges(&values), [1.0, 2.0, 3.5, 5.25, 7.0]);

        let scores = quartile_scores(&values, Metric::Monetary, ScoreDirection::HigherIsBetter).unwrap();
        assert_eq!(scores, [1, 1, 1, 2, 3, 3, 4, 4]);

        let scores = quartile_scores(&values, Metric::Recency, ScoreDirection::LowerIsBetter).unwrap();
        assert_eq!(scores, [4, 4, 4, 3, 2, 2, 1, 1]);
    }

    #[test]
    fn test_overflowing_monetary_is_an_error() {
        let day = latest();
        let lines = vec![
            OrderLine::new("O1", day, "C1", "P1", 1, Decimal::MAX),
            OrderLine::new("O2", day, "C1", "P1", 1, Decimal::MAX),
        ];

        let err = compute_metrics(&lines).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Data(DataError::InvalidValue { row: 2, .. })
        ));
    }

    #[test]
    fn test_segment_ladder() {
        let records = segment_frm(&ladder(), &SegmentRules::default()).unwrap();
        let by_id: BTreeMap<_, _> = records.iter().map(|r| (r.customer_id.as_str(), r)).collect();

        assert_eq!(by_id["C8"].score, "444");
        assert_eq!(by_id["C7"].segment, Segment::Champions);
        assert_eq!(by_id["C6"].score, "333");
        assert_eq!(by_id["C5"].segment, Segment::LoyalCustomers);
        assert_eq!(by_id["C4"].score, "222");
        assert_eq!(by_id["C3"].segment, Segment::NeedAttention);
        assert_eq!(by_id["C2"].score, "111");
        assert_eq!(by_id["C1"].segment, Segment::LostCustomers);
        assert_eq!(by_id["C1"].segment_label, "Lost Customers");
    }

    #[test]
    fn test_top_customer_label_sets() {
        let mut lines = ladder();
        // C8 ends up with ten orders, the most recent date and the top spend
        for n in 8..10 {
            lines.push(OrderLine::new(
                format!("O8-{n}"),
                latest() - Duration::days(n * 30),
                "C8",
                "P1",
                1,
                dec!(80),
            ));
        }

        let champions = segment_frm(&lines, &SegmentRules::default()).unwrap();
        let top = champions.iter().find(|r| r.customer_id == "C8").unwrap();
        assert_eq!(top.recency_days, 0);
        assert_eq!(top.frequency, 10);
        assert_eq!(top.scores(), Scores::new(4, 4, 4));
        assert_eq!(top.segment_label, "Champions");

        let vips = SegmentRules::canonical(SegmentLabels::preset(LabelPreset::Vips));
        let records = segment_frm(&lines, &vips).unwrap();
        let top = records.iter().find(|r| r.customer_id == "C8").unwrap();
        assert_eq!(top.segment, Segment::Champions);
        assert_eq!(top.segment_label, "VIPs");
    }

    #[test]
    fn test_fewer_than_four_customers() {
        let lines: Vec<_> = ladder()
            .into_iter()
            .filter(|l| ["C6", "C7", "C8"].contains(&l.customer_id.as_str()))
            .collect();

        let err = segment_frm(&lines, &SegmentRules::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Data(DataError::InsufficientDistinctValues {
                metric: Metric::Recency,
                distinct: 3
            })
        ));
    }

    #[test]
    fn test_names_the_failing_metric() {
        // distinct recency and spend, but everyone ordered exactly once
        let lines: Vec<_> = (0..8i64)
            .map(|k| {
                OrderLine::new(
                    format!("O{k}"),
                    latest() - Duration::days(k * 3),
                    format!("C{k}"),
                    "P1",
                    1,
                    Decimal::from(k + 1),
                )
            })
            .collect();

        let err = segment_frm(&lines, &SegmentRules::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Data(DataError::InsufficientDistinctValues {
                metric: Metric::Frequency,
                distinct: 1
            })
        ));
        assert!(err.to_string().contains("frequency"));
    }

    #[test]
    fn test_duplicate_edges() {
        let values = [1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0];
        let err = quartile_scores(&values, Metric::Monetary, ScoreDirection::HigherIsBetter).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Data(DataError::DuplicateQuantileEdges { metric: Metric::Monetary })
        ));
    }

    #[test]
    fn test_empty_input() {
        let err = segment_frm(&[], &SegmentRules::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::Data(DataError::EmptyInput { .. })));
    }

    #[test]
    fn test_independent_of_row_order() {
        let lines = ladder();
        let mut reversed = lines.clone();
        reversed.reverse();

        let rules = SegmentRules::default();
        assert_eq!(segment_frm(&lines, &rules).unwrap(), segment_frm(&reversed, &rules).unwrap());
    }

    #[test]
    fn test_independent_of_customer_ids() {
        let lines = ladder();
        let renamed: Vec<_> = lines
            .iter()
            .map(|l| {
                OrderLine::new(
                    l.order_id.clone(),
                    l.order_date,
                    format!("X{}", 9 - l.customer_id[1..].parse::<i64>().unwrap()),
                    l.product_id.clone(),
                    l.quantity,
                    l.unit_price,
                )
            })
            .collect();

        let rules = SegmentRules::default();
        let original = segment_frm(&lines, &rules).unwrap();
        let relabelled = segment_frm(&renamed, &rules).unwrap();
        for record in &original {
            let k: i64 = record.customer_id[1..].parse().unwrap();
            let twin = relabelled
                .iter()
                .find(|r| r.customer_id == format!("X{}", 9 - k))
                .unwrap();
            assert_eq!(twin.score, record.score);
            assert_eq!(twin.segment, record.segment);
        }
    }

    #[test]
    fn test_idempotent() {
        let lines = ladder();
        let snapshot = lines.clone();
        let rules = SegmentRules::default();
        let first = segment_frm(&lines, &rules).unwrap();
        let second = segment_frm(&lines, &rules).unwrap();
        assert_eq!(first, second);
        assert_eq!(lines, snapshot);
    }
}
