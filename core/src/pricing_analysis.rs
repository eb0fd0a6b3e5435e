//! Pricing analyzer: rate statistics and competitiveness per (zone, provider).
//!
//! Groups need at least five quotes. Trend detection needs ten; shorter
//! histories are reported as stable.
//!
//! Percentile rank compares the group's current rate against every quote in
//! the zone, the group's own history included. A provider that dominates a
//! zone therefore partly ranks against itself; this is intentional.

use crate::{
    stats,
    types::{MarketPosition, PricingRecord, Trend},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const MIN_DATA_POINTS: usize = 5;
pub const MIN_TREND_POINTS: usize = 10;
const TREND_WINDOW: usize = 5;
const TREND_BAND: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingAnalysis {
    pub zone:            String,
    pub provider:        String,
    pub current_rate:    f64,
    pub avg_rate:        f64,
    pub min_rate:        f64,
    pub max_rate:        f64,
    pub rate_trend:      Trend,
    pub market_position: MarketPosition,
    pub volatility:      f64,
    pub percentile_rank: f64,
    pub predicted_rate:  f64,
    pub data_points:     usize,
}

/// Multiplier applied to the current rate for a one-period forecast.
pub fn trend_factor(trend: Trend) -> f64 {
    match trend {
        Trend::Increasing => 1.05,
        Trend::Stable     => 1.00,
        Trend::Decreasing => 0.95,
    }
}

/// Trend over a date-ordered rate series.
fn rate_trend(rates: &[f64]) -> Trend {
    if rates.len() < MIN_TREND_POINTS {
        return Trend::Stable;
    }
    let older = stats::mean(&rates[..TREND_WINDOW]);
    let recent = stats::mean(&rates[rates.len() - TREND_WINDOW..]);
    Trend::classify(recent, older, TREND_BAND)
}

/// Percentage of `zone_rates` strictly below `rate`.
fn percentile_rank(zone_rates: &[f64], rate: f64) -> f64 {
    if zone_rates.is_empty() {
        return 0.0;
    }
    let below = zone_rates.iter().filter(|r| **r < rate).count();
    below as f64 / zone_rates.len() as f64 * 100.0
}

/// Analyze every qualifying (zone, provider) group, ordered by zone then provider.
pub fn analyze_pricing(records: &[PricingRecord]) -> Vec<PricingAnalysis> {
    let mut zone_rates: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut groups: BTreeMap<(&str, &str), Vec<&PricingRecord>> = BTreeMap::new();
    for record in records {
        zone_rates.entry(record.zone.as_str()).or_default().push(record.daily_rate);
        groups
            .entry((record.zone.as_str(), record.provider.as_str()))
            .or_default()
            .push(record);
    }

    let mut analyses = Vec::new();
    for ((zone, provider), mut group) in groups {
        if group.len() < MIN_DATA_POINTS {
            continue;
        }
        // Stable: same-day quotes keep their source order.
        group.sort_by_key(|r| r.effective_date);

        let rates: Vec<f64> = group.iter().map(|r| r.daily_rate).collect();
        let current_rate = rates[rates.len() - 1];
        let avg_rate = stats::mean(&rates);
        let trend = rate_trend(&rates);
        let percentile = percentile_rank(
            zone_rates.get(zone).map(Vec::as_slice).unwrap_or_default(),
            current_rate,
        );

        analyses.push(PricingAnalysis {
            zone:            zone.to_string(),
            provider:        provider.to_string(),
            current_rate,
            avg_rate,
            min_rate:        stats::min(&rates),
            max_rate:        stats::max(&rates),
            rate_trend:      trend,
            market_position: MarketPosition::from_percentile(percentile),
            volatility:      stats::ratio(stats::std_dev(&rates), avg_rate),
            percentile_rank: percentile,
            predicted_rate:  current_rate * trend_factor(trend),
            data_points:     rates.len(),
        });
    }

    log::debug!(
        "pricing: {} records -> {} zone/provider analyses",
        records.len(),
        analyses.len()
    );
    analyses
}
