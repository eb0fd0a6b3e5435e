//! Cost optimization recommendations from cached pricing analyses.

use crate::{
    bundle::ResultBundle,
    config::OptimizeConfig,
    error::{AnalyticsError, AnalyticsResult},
    pricing_analysis::PricingAnalysis,
    stats::{round2, round_to},
    types::MarketPosition,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationGoal {
    #[default]
    Cost,
    Efficiency,
    Sustainability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ProviderSwitch,
    UsageOptimization,
    ContractTiming,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationRequest {
    pub account_name:      Option<String>,
    pub current_usage_kwh: Option<f64>,
    pub current_rate:      Option<f64>,
    pub zone:              Option<String>,
    pub optimization_goal: OptimizationGoal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind:                  RecommendationKind,
    pub description:           String,
    pub potential_savings:     f64,
    pub implementation_effort: Effort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestOption {
    pub zone:         String,
    pub provider:     String,
    pub current_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResponse {
    pub optimization_goal:       OptimizationGoal,
    pub current_cost:            f64,
    pub optimized_cost:          f64,
    pub potential_savings:       f64,
    pub savings_percentage:      f64,
    pub recommendations:         Vec<Recommendation>,
    pub implementation_timeline: String,
    pub best_option:             BestOption,
}

fn non_negative(value: Option<f64>, default: f64, field: &str) -> AnalyticsResult<f64> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AnalyticsError::InvalidRequest(format!(
            "{field} must be a non-negative number, got {v}"
        ))),
        Some(v) => Ok(v),
        None => Ok(default),
    }
}

/// Candidate offers: competitive ones, else the cheapest few by current rate.
fn candidate_options<'a>(
    zone_pricing: &[&'a PricingAnalysis],
    fallback_count: usize,
) -> Vec<&'a PricingAnalysis> {
    let competitive: Vec<&PricingAnalysis> = zone_pricing
        .iter()
        .copied()
        .filter(|p| p.market_position == MarketPosition::Competitive)
        .collect();
    if !competitive.is_empty() {
        return competitive;
    }
    let mut cheapest = zone_pricing.to_vec();
    cheapest.sort_by(|a, b| a.current_rate.total_cmp(&b.current_rate));
    cheapest.truncate(fallback_count);
    cheapest
}

pub fn optimize(
    bundle: &ResultBundle,
    request: &OptimizationRequest,
    config: &OptimizeConfig,
) -> AnalyticsResult<OptimizationResponse> {
    let usage = non_negative(request.current_usage_kwh, config.default_usage_kwh, "current_usage_kwh")?;
    let rate = non_negative(request.current_rate, config.default_rate, "current_rate")?;

    let zone_pricing: Vec<&PricingAnalysis> = bundle
        .pricing_analyses
        .iter()
        .filter(|p| request.zone.as_ref().is_none_or(|z| *z == p.zone))
        .collect();
    if zone_pricing.is_empty() {
        return Err(AnalyticsError::not_found(
            "Pricing data for zone",
            request.zone.clone().unwrap_or_else(|| "any".into()),
        ));
    }

    let best = candidate_options(&zone_pricing, config.fallback_option_count)
        .into_iter()
        .min_by(|a, b| a.current_rate.total_cmp(&b.current_rate))
        .ok_or_else(|| AnalyticsError::not_found("Pricing option", "any"))?;

    let current_cost = usage * rate * config.billing_days;
    let optimized_cost = usage * best.current_rate * config.billing_days;
    let potential_savings = current_cost - optimized_cost;
    let savings_percentage = if current_cost > 0.0 {
        potential_savings / current_cost * 100.0
    } else {
        0.0
    };

    let recommendations = vec![
        Recommendation {
            kind: RecommendationKind::ProviderSwitch,
            description: format!("Switch to {} in {} zone", best.provider, best.zone),
            potential_savings: round2(potential_savings),
            implementation_effort: Effort::Medium,
        },
        Recommendation {
            kind: RecommendationKind::UsageOptimization,
            description: "Implement energy efficiency measures".into(),
            potential_savings: round2(current_cost * config.efficiency_savings_share),
            implementation_effort: Effort::High,
        },
        Recommendation {
            kind: RecommendationKind::ContractTiming,
            description: "Optimize contract renewal timing".into(),
            potential_savings: round2(current_cost * config.contract_timing_savings_share),
            implementation_effort: Effort::Low,
        },
    ];

    log::debug!(
        "optimize: best option {} / {} at {:.4}",
        best.zone,
        best.provider,
        best.current_rate
    );

    Ok(OptimizationResponse {
        optimization_goal: request.optimization_goal,
        current_cost: round2(current_cost),
        optimized_cost: round2(optimized_cost),
        potential_savings: round2(potential_savings),
        savings_percentage: round_to(savings_percentage, 1),
        recommendations,
        implementation_timeline: config.implementation_timeline.clone(),
        best_option: BestOption {
            zone:         best.zone.clone(),
            provider:     best.provider.clone(),
            current_rate: best.current_rate,
        },
    })
}
