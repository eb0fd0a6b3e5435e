//! Market intelligence: zone, provider and market-wide rollups.
//!
//! Built from the raw usage and pricing tables, not from the analyzer
//! outputs. No minimum group size: every zone or provider with a record
//! is represented.

use crate::{
    stats,
    types::{PricingRecord, UsageRecord},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Monthly figures are annualized by this factor.
const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    pub total_annual_kwh:             f64,
    pub total_annual_value:           f64,
    pub avg_cost_per_kwh:             f64,
    pub distinct_account_count:       usize,
    pub distinct_service_point_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStats {
    pub total_kwh:           f64,
    pub avg_kwh:             f64,
    pub service_point_count: usize,
    pub total_bill:          f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderShare {
    pub total_kwh:  f64,
    pub total_bill: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSummary {
    pub avg_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketIntelligence {
    pub market_overview:         MarketOverview,
    pub zone_analysis:           BTreeMap<String, ZoneStats>,
    /// Serialized largest-first by consumed kWh.
    #[serde(serialize_with = "serialize_ranked")]
    pub provider_market_share:   BTreeMap<String, ProviderShare>,
    pub pricing_competitiveness: BTreeMap<String, RateSummary>,
    pub analysis_timestamp:      DateTime<Utc>,
}

impl MarketIntelligence {
    /// Providers by consumed kWh, largest first. Ties break by name.
    pub fn ranked_market_share(&self) -> Vec<(&str, &ProviderShare)> {
        rank_shares(&self.provider_market_share)
    }

    /// Zones by total kWh, largest first.
    pub fn top_zones(&self, n: usize) -> Vec<String> {
        let mut zones: Vec<(&String, &ZoneStats)> = self.zone_analysis.iter().collect();
        zones.sort_by(|a, b| b.1.total_kwh.total_cmp(&a.1.total_kwh).then(a.0.cmp(b.0)));
        zones.into_iter().take(n).map(|(z, _)| z.clone()).collect()
    }

    /// Providers by average quoted rate, cheapest first.
    pub fn most_competitive_providers(&self, n: usize) -> Vec<String> {
        let mut providers: Vec<(&String, &RateSummary)> =
            self.pricing_competitiveness.iter().collect();
        providers.sort_by(|a, b| a.1.avg_rate.total_cmp(&b.1.avg_rate).then(a.0.cmp(b.0)));
        providers.into_iter().take(n).map(|(p, _)| p.clone()).collect()
    }
}

fn rank_shares(shares: &BTreeMap<String, ProviderShare>) -> Vec<(&str, &ProviderShare)> {
    let mut ranked: Vec<(&str, &ProviderShare)> = shares
        .iter()
        .map(|(name, share)| (name.as_str(), share))
        .collect();
    ranked.sort_by(|a, b| b.1.total_kwh.total_cmp(&a.1.total_kwh).then(a.0.cmp(b.0)));
    ranked
}

fn serialize_ranked<S: Serializer>(
    shares: &BTreeMap<String, ProviderShare>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(rank_shares(shares))
}

fn market_overview(usage: &[UsageRecord]) -> MarketOverview {
    let total_annual_kwh = usage.iter().map(|r| r.monthly_kwh).sum::<f64>() * MONTHS_PER_YEAR;
    let total_annual_value = usage.iter().map(|r| r.total_bill).sum::<f64>() * MONTHS_PER_YEAR;
    let accounts: BTreeSet<&str> = usage.iter().map(|r| r.account_name.as_str()).collect();

    MarketOverview {
        total_annual_kwh,
        total_annual_value,
        avg_cost_per_kwh: stats::ratio(total_annual_value, total_annual_kwh),
        distinct_account_count: accounts.len(),
        distinct_service_point_count: usage.len(),
    }
}

fn zone_analysis(usage: &[UsageRecord]) -> BTreeMap<String, ZoneStats> {
    let mut zones: BTreeMap<&str, (Vec<f64>, f64)> = BTreeMap::new();
    for record in usage {
        let entry = zones.entry(record.zone.as_str()).or_default();
        entry.0.push(record.monthly_kwh);
        entry.1 += record.total_bill;
    }
    zones
        .into_iter()
        .map(|(zone, (kwh, bill))| {
            let zone_stats = ZoneStats {
                total_kwh:           stats::round2(stats::sum(&kwh)),
                avg_kwh:             stats::round2(stats::mean(&kwh)),
                service_point_count: kwh.len(),
                total_bill:          stats::round2(bill),
            };
            (zone.to_string(), zone_stats)
        })
        .collect()
}

fn provider_market_share(usage: &[UsageRecord]) -> BTreeMap<String, ProviderShare> {
    let mut providers: BTreeMap<String, ProviderShare> = BTreeMap::new();
    for record in usage {
        let share = providers
            .entry(record.provider.clone())
            .or_insert(ProviderShare { total_kwh: 0.0, total_bill: 0.0 });
        share.total_kwh += record.monthly_kwh;
        share.total_bill += record.total_bill;
    }
    providers
}

fn pricing_competitiveness(pricing: &[PricingRecord]) -> BTreeMap<String, RateSummary> {
    let mut providers: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in pricing {
        providers.entry(record.provider.as_str()).or_default().push(record.daily_rate);
    }
    providers
        .into_iter()
        .map(|(provider, rates)| {
            let summary = RateSummary {
                avg_rate: stats::round2(stats::mean(&rates)),
                min_rate: stats::round2(stats::min(&rates)),
                max_rate: stats::round2(stats::max(&rates)),
            };
            (provider.to_string(), summary)
        })
        .collect()
}

pub fn synthesize(
    usage: &[UsageRecord],
    pricing: &[PricingRecord],
    now: DateTime<Utc>,
) -> MarketIntelligence {
    let intelligence = MarketIntelligence {
        market_overview:         market_overview(usage),
        zone_analysis:           zone_analysis(usage),
        provider_market_share:   provider_market_share(usage),
        pricing_competitiveness: pricing_competitiveness(pricing),
        analysis_timestamp:      now,
    };
    log::debug!(
        "market: {} zones, {} providers with usage, {} providers with pricing",
        intelligence.zone_analysis.len(),
        intelligence.provider_market_share.len(),
        intelligence.pricing_competitiveness.len(),
    );
    intelligence
}
