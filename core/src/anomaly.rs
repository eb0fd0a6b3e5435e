//! Severity labelling of usage anomaly scores.

use crate::{
    bundle::ResultBundle,
    error::{AnalyticsError, AnalyticsResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Label for an anomaly score. Scores at or below 0.3 are not reported.
    pub fn from_score(score: f64) -> Option<Self> {
        if score > 0.7 {
            Some(Self::Critical)
        } else if score > 0.5 {
            Some(Self::High)
        } else if score > 0.3 {
            Some(Self::Medium)
        } else {
            None
        }
    }
}

impl FromStr for Severity {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low"      => Ok(Self::Low),
            "medium"   => Ok(Self::Medium),
            "high"     => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(AnalyticsError::InvalidRequest(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub account_name:       String,
    pub anomaly_type:       String,
    pub anomaly_score:      f64,
    pub severity:           Severity,
    pub description:        String,
    pub detected_at:        DateTime<Utc>,
    pub recommended_action: String,
}

pub fn detect(
    bundle: &ResultBundle,
    severity_filter: Option<Severity>,
    now: DateTime<Utc>,
) -> Vec<Anomaly> {
    bundle
        .usage_analyses
        .iter()
        .filter_map(|usage| {
            let severity = Severity::from_score(usage.anomaly_score)?;
            if severity_filter.is_some_and(|wanted| wanted != severity) {
                return None;
            }
            Some(Anomaly {
                account_name: usage.account_name.clone(),
                anomaly_type: "usage".into(),
                anomaly_score: usage.anomaly_score,
                severity,
                description: format!(
                    "Unusual usage pattern detected (score: {:.2})",
                    usage.anomaly_score
                ),
                detected_at: now,
                recommended_action: "Investigate usage patterns and verify meter readings".into(),
            })
        })
        .collect()
}

/// Parse an optional severity filter string.
pub fn parse_filter(raw: Option<&str>) -> AnalyticsResult<Option<Severity>> {
    raw.map(str::parse).transpose()
}
