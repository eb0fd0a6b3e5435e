//! Attribute filters and pagination over the cached analysis lists.

use crate::{
    commission_analysis::CommissionAnalysis,
    error::{AnalyticsError, AnalyticsResult},
    pricing_analysis::PricingAnalysis,
    types::{MarketPosition, UsagePattern},
    usage_analysis::UsageAnalysis,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageFilter {
    /// Case-insensitive substring match on the account name.
    pub account_name:  Option<String>,
    pub usage_pattern: Option<UsagePattern>,
    pub min_usage:     Option<f64>,
    pub max_usage:     Option<f64>,
}

impl UsageFilter {
    pub fn matches(&self, analysis: &UsageAnalysis) -> bool {
        if let Some(needle) = &self.account_name {
            if !analysis
                .account_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if self.usage_pattern.is_some_and(|p| p != analysis.usage_pattern) {
            return false;
        }
        if self.min_usage.is_some_and(|min| analysis.total_usage_kwh < min) {
            return false;
        }
        if self.max_usage.is_some_and(|max| analysis.total_usage_kwh > max) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingFilter {
    pub zone:            Option<String>,
    pub provider:        Option<String>,
    pub market_position: Option<MarketPosition>,
}

impl PricingFilter {
    pub fn matches(&self, analysis: &PricingAnalysis) -> bool {
        self.zone.as_ref().is_none_or(|z| *z == analysis.zone)
            && self.provider.as_ref().is_none_or(|p| *p == analysis.provider)
            && self.market_position.is_none_or(|m| m == analysis.market_position)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionFilter {
    pub provider: Option<String>,
}

impl CommissionFilter {
    pub fn matches(&self, analysis: &CommissionAnalysis) -> bool {
        self.provider.as_ref().is_none_or(|p| *p == analysis.provider)
    }
}

/// Offset pagination. `limit` of None means the configured default.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub skip:  usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub total:   usize,
    pub page:    usize,
    pub pages:   usize,
}

impl PageRequest {
    pub fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit: Some(limit) }
    }

    /// Resolve the limit and validate it against `max_limit`.
    pub fn resolve(&self, default_limit: usize, max_limit: usize) -> AnalyticsResult<usize> {
        let limit = self.limit.unwrap_or(default_limit);
        if limit == 0 || limit > max_limit {
            return Err(AnalyticsError::InvalidRequest(format!(
                "limit must be between 1 and {max_limit}, got {limit}"
            )));
        }
        Ok(limit)
    }

    pub fn apply<T: Clone>(&self, items: &[T], limit: usize) -> Page<T> {
        let total = items.len();
        let results = items.iter().skip(self.skip).take(limit).cloned().collect();
        Page {
            results,
            total,
            page: self.skip / limit + 1,
            pages: total.div_ceil(limit),
        }
    }
}
