//! Commission analyzer: per-provider revenue performance.
//!
//! Providers need at least three payments. Trend and growth use monthly
//! totals and need at least three distinct months; otherwise the trend is
//! stable and the forecast falls back to the average payment.

use crate::{
    stats,
    types::{CommissionRecord, Trend, YearMonth},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MIN_PAYMENTS: usize = 3;
const TREND_MONTHS: usize = 3;
const TREND_BAND: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionAnalysis {
    pub provider:                     String,
    pub total_commission:             f64,
    pub avg_commission:               f64,
    pub commission_count:             usize,
    pub commission_trend:             Trend,
    pub predicted_monthly_commission: f64,
    pub monthly_performance:          BTreeMap<YearMonth, f64>,
}

/// Sum payments per calendar month, chronologically ordered.
pub fn monthly_totals<'a>(
    records: impl IntoIterator<Item = &'a CommissionRecord>,
) -> BTreeMap<YearMonth, f64> {
    let mut months = BTreeMap::new();
    for record in records {
        *months.entry(YearMonth::of(record.payment_date)).or_insert(0.0) += record.payment_amount;
    }
    months
}

/// Trend and next-month forecast from chronologically ordered monthly totals.
fn forecast_from_months(monthly: &[f64], avg_commission: f64) -> (Trend, f64) {
    if monthly.len() < TREND_MONTHS {
        return (Trend::Stable, avg_commission);
    }
    let older = stats::mean(&monthly[..TREND_MONTHS]);
    let recent = stats::mean(&monthly[monthly.len() - TREND_MONTHS..]);

    let trend = Trend::classify(recent, older, TREND_BAND);
    let growth_rate = if older > 0.0 { recent / older - 1.0 } else { 0.0 };
    (trend, recent * (1.0 + growth_rate))
}

/// Analyze every qualifying provider, ordered by provider name.
pub fn analyze_commissions(records: &[CommissionRecord]) -> Vec<CommissionAnalysis> {
    let mut by_provider: BTreeMap<&str, Vec<&CommissionRecord>> = BTreeMap::new();
    for record in records {
        by_provider.entry(record.provider.as_str()).or_default().push(record);
    }

    let analyses: Vec<CommissionAnalysis> = by_provider
        .into_iter()
        .filter(|(_, group)| group.len() >= MIN_PAYMENTS)
        .map(|(provider, group)| {
            let amounts: Vec<f64> = group.iter().map(|r| r.payment_amount).collect();
            let avg_commission = stats::mean(&amounts);
            let monthly_performance = monthly_totals(group.iter().copied());
            let series: Vec<f64> = monthly_performance.values().copied().collect();
            let (trend, predicted) = forecast_from_months(&series, avg_commission);

            CommissionAnalysis {
                provider:                     provider.to_string(),
                total_commission:             stats::sum(&amounts),
                avg_commission,
                commission_count:             group.len(),
                commission_trend:             trend,
                predicted_monthly_commission: predicted,
                monthly_performance,
            }
        })
        .collect();

    log::debug!(
        "commission: {} records -> {} provider analyses",
        records.len(),
        analyses.len()
    );
    analyses
}
