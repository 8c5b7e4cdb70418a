//! Display-ready values derived from loaded domain data.
//!
//! Everything here is a pure function of its (borrowed) input and recomputes
//! from scratch on every call.

use crate::models::{ContentRecord, SummaryData};

/// Fixed-decimal text of the exact binary `value`.
///
/// Non-tie values format as-is. An exact tie (the product with the scale is
/// exact and ends in .5) rounds away from zero instead of to even.
fn to_fixed(value: f64, decimals: usize) -> String {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let exact = value.mul_add(factor, -scaled) == 0.0;
    if exact && scaled.fract().abs() == 0.5 {
        return format!("{:.*}", decimals, scaled.round() / factor);
    }
    format!("{:.*}", decimals, value)
}

/// Compact magnitude: `1.2M`, `450K`, `999`.
pub fn format_magnitude(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{}M", to_fixed(value / 1_000_000.0, 1))
    } else if value >= 1_000.0 {
        format!("{}K", to_fixed(value / 1_000.0, 0))
    } else {
        format!("{}", value)
    }
}

/// Whole number with thousands separators: `1,200,000`.
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Direction of a period-over-period change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaClass {
    Positive,
    Negative,
    /// Exactly zero (or not a number). Not shown as an increase.
    Zero,
}

impl DeltaClass {
    pub fn is_positive(&self) -> bool {
        matches!(self, DeltaClass::Positive)
    }
}

pub fn classify_delta(change: f64) -> DeltaClass {
    if change > 0.0 {
        DeltaClass::Positive
    } else if change < 0.0 {
        DeltaClass::Negative
    } else {
        DeltaClass::Zero
    }
}

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn average_engagement(records: &[ContentRecord]) -> Option<f64> {
    let values: Vec<f64> = records.iter().map(|r| r.engagement).collect();
    mean(&values)
}

pub fn average_growth(records: &[ContentRecord]) -> Option<f64> {
    let values: Vec<f64> = records.iter().map(|r| r.growth).collect();
    mean(&values)
}

/// One KPI card on the dashboard overview.
#[derive(Debug, Clone, PartialEq)]
pub struct StatCard {
    pub title: &'static str,
    pub value: String,
    pub change: String,
    pub delta: DeltaClass,
}

impl StatCard {
    fn new(title: &'static str, value: String, change: f64) -> Self {
        Self {
            title,
            value,
            change: format!("{}% from last period", change.abs()),
            delta: classify_delta(change),
        }
    }
}

/// The four overview cards, in display order.
pub fn summary_cards(summary: &SummaryData) -> [StatCard; 4] {
    [
        StatCard::new(
            "Total Audience",
            format_grouped(summary.total_audience),
            summary.audience_growth,
        ),
        StatCard::new(
            "Engagement Rate",
            format!("{}%", summary.engagement_rate),
            summary.engagement_change,
        ),
        StatCard::new(
            "Content Consistency",
            format!("{}%", summary.content_consistency),
            summary.consistency_change,
        ),
        StatCard::new("ROI", format!("{}%", summary.roi), summary.roi_change),
    ]
}

/// Quality band of a 0-100 consistency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Good,
    Fair,
    Poor,
}

pub fn consistency_band(score: f64) -> Band {
    if score >= 80.0 {
        Band::Good
    } else if score >= 60.0 {
        Band::Fair
    } else {
        Band::Poor
    }
}

/// Whole-percent label for an audience share: `37.5` → `"38%"`.
pub fn share_label(percentage: f64) -> String {
    format!("{}%", to_fixed(percentage, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(engagement: f64, growth: f64) -> ContentRecord {
        ContentRecord {
            kind: "Video".into(),
            engagement,
            reach: 1000.0,
            growth,
        }
    }

    #[test]
    fn test_format_magnitude() {
        assert_eq!(format_magnitude(1_200_000.0), "1.2M");
        assert_eq!(format_magnitude(450_000.0), "450K");
        assert_eq!(format_magnitude(999.0), "999");
        assert_eq!(format_magnitude(1_000.0), "1K");
        assert_eq!(format_magnitude(1_000_000.0), "1.0M");
        assert_eq!(format_magnitude(12.5), "12.5");
    }

    #[test]
    fn test_format_magnitude_rounds_half_away_from_zero() {
        assert_eq!(format_magnitude(1_250_000.0), "1.3M");
        assert_eq!(format_magnitude(2_500.0), "3K");
        assert_eq!(format_magnitude(999_999.0), "1000K");
    }

    #[test]
    fn test_format_magnitude_rounds_once_from_binary_value() {
        // 1.15 and friends are stored just below the tie.
        assert_eq!(format_magnitude(1_150_000.0), "1.1M");
        assert_eq!(format_magnitude(1_450_000.0), "1.4M");
        assert_eq!(format_magnitude(1_950_000.0), "1.9M");
        assert_eq!(format_magnitude(2_050_000.0), "2.0M");
        assert_eq!(format_magnitude(1_149_999.0), "1.1M");
        assert_eq!(format_magnitude(1_160_000.0), "1.2M");
        assert_eq!(format_magnitude(3_500.0), "4K");
        assert_eq!(format_magnitude(3_499.0), "3K");
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(1_200_000.0), "1,200,000");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_grouped(1_000.0), "1,000");
        assert_eq!(format_grouped(-45_000.4), "-45,000");
        assert_eq!(format_grouped(0.0), "0");
    }

    #[test]
    fn test_classify_delta_boundaries() {
        assert_ne!(classify_delta(0.0), DeltaClass::Positive);
        assert_eq!(classify_delta(0.0), DeltaClass::Zero);
        assert_eq!(classify_delta(-0.0), DeltaClass::Zero);
        assert_eq!(classify_delta(-0.1), DeltaClass::Negative);
        assert_eq!(classify_delta(12.3), DeltaClass::Positive);
        assert!(!classify_delta(f64::NAN).is_positive());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[4.0]), Some(4.0));
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_content_averages() {
        let records = [content(8.0, 10.0), content(4.0, 20.0)];
        assert_eq!(average_engagement(&records), Some(6.0));
        assert_eq!(average_growth(&records), Some(15.0));
        assert_eq!(average_engagement(&[]), None);
        assert_eq!(average_growth(&[]), None);
    }

    #[test]
    fn test_summary_cards() {
        let summary = SummaryData {
            total_audience: 1_200_000.0,
            audience_growth: 12.3,
            engagement_rate: 4.5,
            engagement_change: 0.8,
            content_consistency: 85.0,
            consistency_change: -2.1,
            roi: 3.2,
            roi_change: 0.0,
        };
        let before = summary.clone();
        let cards = summary_cards(&summary);

        assert_eq!(cards[0].title, "Total Audience");
        assert_eq!(cards[0].value, "1,200,000");
        assert_eq!(cards[0].change, "12.3% from last period");
        assert_eq!(cards[0].delta, DeltaClass::Positive);

        assert_eq!(cards[1].value, "4.5%");
        assert_eq!(cards[2].value, "85%");
        assert_eq!(cards[2].change, "2.1% from last period");
        assert_eq!(cards[2].delta, DeltaClass::Negative);

        assert_eq!(cards[3].title, "ROI");
        assert_eq!(cards[3].change, "0% from last period");
        assert!(!cards[3].delta.is_positive());

        assert_eq!(summary, before);
    }

    #[test]
    fn test_consistency_band() {
        assert_eq!(consistency_band(85.0), Band::Good);
        assert_eq!(consistency_band(80.0), Band::Good);
        assert_eq!(consistency_band(79.9), Band::Fair);
        assert_eq!(consistency_band(60.0), Band::Fair);
        assert_eq!(consistency_band(59.0), Band::Poor);
    }

    #[test]
    fn test_share_label() {
        assert_eq!(share_label(37.5), "38%");
        assert_eq!(share_label(26.7), "27%");
        assert_eq!(share_label(15.0), "15%");
    }
}
