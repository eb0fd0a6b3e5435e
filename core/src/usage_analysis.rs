//! Usage analyzer: per-account consumption profile.
//!
//! For every account with at least two service points:
//!   1. Aggregates monthly kWh and bills
//!   2. Classifies variation across service points
//!   3. Scores cost efficiency
//!   4. Flags outlier service points (z-score > 2)
//!   5. Projects next-period usage with the seasonal table
//!
//! Pure and synchronous. Degenerate inputs clamp to zero; nothing errors.

use crate::{
    stats,
    types::{UsagePattern, UsageRecord},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum service points an account needs before it carries a variance signal.
pub const MIN_SERVICE_POINTS: usize = 2;

const OUTLIER_Z_SCORE: f64 = 2.0;

/// Seasonal consumption factor by calendar month. Winter high, summer low.
const SEASONAL_FACTORS: [f64; 12] = [
    1.2, 1.1, 1.0, 0.9, 0.8, 0.7, // Jan-Jun
    0.6, 0.7, 0.8, 0.9, 1.0, 1.1, // Jul-Dec
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageAnalysis {
    pub account_name:        String,
    pub esiid_count:         usize,
    pub total_usage_kwh:     f64,
    pub avg_usage_kwh:       f64,
    pub usage_pattern:       UsagePattern,
    pub efficiency_score:    f64,
    pub anomaly_score:       f64,
    pub seasonal_factor:     f64,
    pub predicted_usage_kwh: f64,
    pub cost_per_kwh:        f64,
    pub total_monthly_bill:  f64,
}

/// Factor for a calendar month (1-12). Out-of-range months get 1.0.
pub fn seasonal_factor(month: u32) -> f64 {
    match month {
        1..=12 => SEASONAL_FACTORS[(month - 1) as usize],
        _ => 1.0,
    }
}

/// Efficiency on a 0-100 scale; lower cost per kWh scores higher.
pub fn efficiency_score(cost_per_kwh: f64) -> f64 {
    (100.0 - cost_per_kwh * 1000.0).max(0.0)
}

/// Fraction of values whose z-score exceeds the outlier threshold.
fn anomaly_score(values: &[f64], avg: f64, std: f64) -> f64 {
    if values.is_empty() || std <= 0.0 {
        return 0.0;
    }
    let outliers = values
        .iter()
        .filter(|v| ((*v - avg).abs() / std) > OUTLIER_Z_SCORE)
        .count();
    outliers as f64 / values.len() as f64
}

/// Analyze every qualifying account. Output is ordered by account name.
pub fn analyze_usage(records: &[UsageRecord], current_month: u32) -> Vec<UsageAnalysis> {
    let mut by_account: BTreeMap<&str, Vec<&UsageRecord>> = BTreeMap::new();
    for record in records {
        by_account.entry(record.account_name.as_str()).or_default().push(record);
    }

    let season = seasonal_factor(current_month);

    let analyses: Vec<UsageAnalysis> = by_account
        .into_iter()
        .filter(|(_, group)| group.len() >= MIN_SERVICE_POINTS)
        .map(|(account_name, group)| {
            let kwh: Vec<f64> = group.iter().map(|r| r.monthly_kwh).collect();
            let total_usage = stats::sum(&kwh);
            let avg_usage = stats::mean(&kwh);
            let usage_std = stats::std_dev(&kwh);
            let total_bill: f64 = group.iter().map(|r| r.total_bill).sum();

            let cv = stats::ratio(usage_std, avg_usage);
            let cost_per_kwh = stats::ratio(total_bill, total_usage);

            UsageAnalysis {
                account_name:        account_name.to_string(),
                esiid_count:         group.len(),
                total_usage_kwh:     total_usage,
                avg_usage_kwh:       avg_usage,
                usage_pattern:       UsagePattern::from_cv(cv),
                efficiency_score:    efficiency_score(cost_per_kwh),
                anomaly_score:       anomaly_score(&kwh, avg_usage, usage_std),
                seasonal_factor:     season,
                predicted_usage_kwh: total_usage * season,
                cost_per_kwh,
                total_monthly_bill:  total_bill,
            }
        })
        .collect();

    log::debug!(
        "usage: {} records -> {} account analyses",
        records.len(),
        analyses.len()
    );
    analyses
}
