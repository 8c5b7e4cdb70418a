//! Analytics domains and their typed payloads.
//!
//! Providers hand back loosely shaped JSON. [`Payload::decode`] is the single
//! place where that JSON becomes one of the explicit per-domain structures
//! below; anything that fails to deserialize or validate is rejected before it
//! can enter the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadError;

// =============================================================================
// Domain Keys
// =============================================================================

/// One independent analytics data category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Summary,
    ChannelMetrics,
    AudienceMetrics,
    ContentMetrics,
    TrendSeries,
}

impl Domain {
    /// Every domain, in dashboard display order.
    pub const ALL: [Domain; 5] = [
        Domain::Summary,
        Domain::ChannelMetrics,
        Domain::AudienceMetrics,
        Domain::ContentMetrics,
        Domain::TrendSeries,
    ];

    /// Stable key used in logs, config and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Summary => "summary",
            Domain::ChannelMetrics => "channels",
            Domain::AudienceMetrics => "audience",
            Domain::ContentMetrics => "content",
            Domain::TrendSeries => "trends",
        }
    }

    /// Short human label.
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Summary => "Dashboard",
            Domain::ChannelMetrics => "Channel",
            Domain::AudienceMetrics => "Audience",
            Domain::ContentMetrics => "Content",
            Domain::TrendSeries => "Trend",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown domain '{}' (expected one of: summary, channels, audience, content, trends)",
                    s
                )
            })
    }
}

// =============================================================================
// Payload Types
// =============================================================================

/// Aggregate KPIs, each paired with its period-over-period delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryData {
    pub total_audience: f64,
    pub audience_growth: f64,
    pub engagement_rate: f64,
    pub engagement_change: f64,
    pub content_consistency: f64,
    pub consistency_change: f64,
    pub roi: f64,
    pub roi_change: f64,
}

/// Performance of one distribution channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub name: String,
    pub reach: f64,
    /// Engagement rate in percent.
    pub engagement: f64,
    /// Conversion rate in percent.
    pub conversion: f64,
}

/// A platform's share of the total audience.
///
/// `percentage` is supplied by the provider, not derived from `value`, and the
/// shares of a list need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceShare {
    pub platform: String,
    pub value: f64,
    pub percentage: f64,
}

/// Performance of one content format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub engagement: f64,
    pub reach: f64,
    pub growth: f64,
}

/// Audience per tracked channel for one month.
///
/// A series is chronological within one payload. A refresh replaces the held
/// series as a whole, even when it is shorter or rewrites earlier periods;
/// the provider owns the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub month: String,
    pub website: f64,
    pub social_media: f64,
    pub streaming: f64,
    pub traditional_media: f64,
}

impl TrendPoint {
    /// Per-channel values in a fixed order, labelled.
    pub fn channels(&self) -> [(&'static str, f64); 4] {
        [
            ("Website", self.website),
            ("Social Media", self.social_media),
            ("Streaming", self.streaming),
            ("Traditional Media", self.traditional_media),
        ]
    }

    /// Sum across all tracked channels.
    pub fn total(&self) -> f64 {
        self.channels().iter().map(|(_, v)| v).sum()
    }
}

/// A validated payload for exactly one domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Summary(SummaryData),
    ChannelMetrics(Vec<ChannelRecord>),
    AudienceMetrics(Vec<AudienceShare>),
    ContentMetrics(Vec<ContentRecord>),
    /// Replaces any previously held series wholesale.
    TrendSeries(Vec<TrendPoint>),
}

impl Payload {
    /// The domain this payload belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            Payload::Summary(_) => Domain::Summary,
            Payload::ChannelMetrics(_) => Domain::ChannelMetrics,
            Payload::AudienceMetrics(_) => Domain::AudienceMetrics,
            Payload::ContentMetrics(_) => Domain::ContentMetrics,
            Payload::TrendSeries(_) => Domain::TrendSeries,
        }
    }

    /// Decode and validate raw provider JSON for `domain`.
    pub fn decode(domain: Domain, raw: Value) -> Result<Self, PayloadError> {
        let payload = match domain {
            Domain::Summary => Payload::Summary(serde_json::from_value(raw)?),
            Domain::ChannelMetrics => Payload::ChannelMetrics(serde_json::from_value(raw)?),
            Domain::AudienceMetrics => Payload::AudienceMetrics(serde_json::from_value(raw)?),
            Domain::ContentMetrics => Payload::ContentMetrics(serde_json::from_value(raw)?),
            Domain::TrendSeries => Payload::TrendSeries(serde_json::from_value(raw)?),
        };
        payload.validate()?;
        Ok(payload)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        match self {
            Payload::Summary(s) => {
                finite("totalAudience", s.total_audience)?;
                non_negative("totalAudience", s.total_audience)?;
                finite("audienceGrowth", s.audience_growth)?;
                finite("engagementRate", s.engagement_rate)?;
                finite("engagementChange", s.engagement_change)?;
                percentage("contentConsistency", s.content_consistency)?;
                finite("consistencyChange", s.consistency_change)?;
                finite("roi", s.roi)?;
                finite("roiChange", s.roi_change)?;
            }
            Payload::ChannelMetrics(rows) => {
                for (i, r) in rows.iter().enumerate() {
                    non_negative(&format!("channels[{i}].reach"), r.reach)?;
                    percentage(&format!("channels[{i}].engagement"), r.engagement)?;
                    percentage(&format!("channels[{i}].conversion"), r.conversion)?;
                }
            }
            Payload::AudienceMetrics(rows) => {
                for (i, r) in rows.iter().enumerate() {
                    non_negative(&format!("audience[{i}].value"), r.value)?;
                    percentage(&format!("audience[{i}].percentage"), r.percentage)?;
                }
            }
            Payload::ContentMetrics(rows) => {
                for (i, r) in rows.iter().enumerate() {
                    percentage(&format!("content[{i}].engagement"), r.engagement)?;
                    non_negative(&format!("content[{i}].reach"), r.reach)?;
                    finite(&format!("content[{i}].growth"), r.growth)?;
                }
            }
            Payload::TrendSeries(points) => {
                let mut previous: Option<(&str, u32)> = None;
                for (i, p) in points.iter().enumerate() {
                    for (name, value) in p.channels() {
                        non_negative(&format!("trends[{i}].{name}"), value)?;
                    }
                    let month = p
                        .month
                        .parse::<chrono::Month>()
                        .map_err(|_| PayloadError::UnknownMonth(p.month.clone()))?
                        .number_from_month();
                    if let Some((label, prev)) = previous {
                        if month <= prev {
                            return Err(PayloadError::OutOfOrder {
                                previous: label.to_string(),
                                next: p.month.clone(),
                            });
                        }
                    }
                    previous = Some((p.month.as_str(), month));
                }
            }
        }
        Ok(())
    }
}

fn finite(field: &str, value: f64) -> Result<(), PayloadError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PayloadError::NonFinite {
            field: field.to_string(),
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), PayloadError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(PayloadError::Negative {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

fn percentage(field: &str, value: f64) -> Result<(), PayloadError> {
    finite(field, value)?;
    if !(0.0..=100.0).contains(&value) {
        return Err(PayloadError::PercentageOutOfRange {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}
