//! The result bundle: everything one refresh produces.
//!
//! A bundle is immutable once published. The cache swaps whole bundles;
//! nothing mutates one in place. The same JSON form is written to the
//! store as the durable snapshot.

use crate::{
    commission_analysis::CommissionAnalysis,
    error::AnalyticsResult,
    market_intelligence::MarketIntelligence,
    pricing_analysis::PricingAnalysis,
    usage_analysis::UsageAnalysis,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub usage_analyses:      Vec<UsageAnalysis>,
    pub pricing_analyses:    Vec<PricingAnalysis>,
    pub commission_analyses: Vec<CommissionAnalysis>,
    pub market_intelligence: MarketIntelligence,
    pub computed_at:         DateTime<Utc>,
}

impl ResultBundle {
    pub fn to_json(&self) -> AnalyticsResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> AnalyticsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> AnalyticsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn usage_for(&self, account_name: &str) -> Option<&UsageAnalysis> {
        self.usage_analyses.iter().find(|u| u.account_name == account_name)
    }

    /// Time elapsed between `computed_at` and `now`. Never negative.
    pub fn age_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.computed_at).to_std().unwrap_or_default()
    }
}
