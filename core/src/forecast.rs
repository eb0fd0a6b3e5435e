//! Multi-period consumption forecasts over a published bundle.
//!
//! Account forecasts start from the account's seasonal prediction and
//! compound 2% per period with a sinusoidal ripple (one cycle per 12
//! periods). Market forecasts spread annual consumption over 12 periods and
//! compound 3% per period. Both are fixed heuristics.

use crate::{
    bundle::ResultBundle,
    config::ForecastConfig,
    error::{AnalyticsError, AnalyticsResult},
    stats::round2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Periods per full seasonal cycle.
const SEASONAL_CYCLE: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastPeriod {
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastKind {
    Usage,
    Market,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastRequest {
    pub account_name:     Option<String>,
    pub zone:             Option<String>,
    pub provider:         Option<String>,
    pub forecast_period:  ForecastPeriod,
    pub forecast_horizon: i64,
}

impl Default for ForecastRequest {
    fn default() -> Self {
        Self {
            account_name:     None,
            zone:             None,
            provider:         None,
            forecast_period:  ForecastPeriod::Monthly,
            forecast_horizon: 12,
        }
    }
}

impl ForecastRequest {
    pub fn for_account(account_name: impl Into<String>, horizon: i64) -> Self {
        Self {
            account_name: Some(account_name.into()),
            forecast_horizon: horizon,
            ..Self::default()
        }
    }

    pub fn for_market(horizon: i64) -> Self {
        Self { forecast_horizon: horizon, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period:          u32,
    pub forecasted_kwh:  f64,
    pub confidence_low:  f64,
    pub confidence_high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub forecast_type:    ForecastKind,
    pub forecast_period:  ForecastPeriod,
    pub forecast_horizon: u32,
    pub forecast_data:    Vec<ForecastPoint>,
    pub confidence_level: f64,
    pub model_accuracy:   f64,
    pub generated_at:     DateTime<Utc>,
}

fn point(period: u32, value: f64, band: f64) -> ForecastPoint {
    ForecastPoint {
        period,
        forecasted_kwh:  round2(value),
        confidence_low:  round2(value * (1.0 - band)),
        confidence_high: round2(value * (1.0 + band)),
    }
}

fn validate_horizon(horizon: i64, max_horizon: u32) -> AnalyticsResult<u32> {
    if horizon <= 0 || horizon > i64::from(max_horizon) {
        return Err(AnalyticsError::InvalidRequest(format!(
            "forecast_horizon must be between 1 and {max_horizon}, got {horizon}"
        )));
    }
    Ok(horizon as u32)
}

/// Project `request.forecast_horizon` periods for one account or the market.
pub fn forecast(
    bundle: &ResultBundle,
    request: &ForecastRequest,
    config: &ForecastConfig,
    now: DateTime<Utc>,
) -> AnalyticsResult<ForecastResponse> {
    let horizon = validate_horizon(request.forecast_horizon, config.max_horizon)?;

    let response = match &request.account_name {
        Some(account_name) => {
            let usage = bundle
                .usage_for(account_name)
                .ok_or_else(|| AnalyticsError::not_found("Account", account_name.clone()))?;

            let forecast_data = (0..horizon)
                .map(|i| {
                    let step = f64::from(i);
                    let growth = (1.0 + config.account_growth_rate).powf(step);
                    let ripple = 1.0
                        + config.seasonal_amplitude * (step * 2.0 * PI / SEASONAL_CYCLE).sin();
                    let value = usage.predicted_usage_kwh * growth * usage.seasonal_factor * ripple;
                    point(i + 1, value, config.account_band)
                })
                .collect();

            ForecastResponse {
                forecast_type: ForecastKind::Usage,
                forecast_period: request.forecast_period,
                forecast_horizon: horizon,
                forecast_data,
                confidence_level: config.account_confidence_level,
                model_accuracy: config.account_model_accuracy,
                generated_at: now,
            }
        }
        None => {
            let annual_kwh = bundle.market_intelligence.market_overview.total_annual_kwh;

            let forecast_data = (0..horizon)
                .map(|i| {
                    let growth = (1.0 + config.market_growth_rate).powf(f64::from(i));
                    let value = annual_kwh * growth / SEASONAL_CYCLE;
                    point(i + 1, value, config.market_band)
                })
                .collect();

            ForecastResponse {
                forecast_type: ForecastKind::Market,
                forecast_period: request.forecast_period,
                forecast_horizon: horizon,
                forecast_data,
                confidence_level: config.market_confidence_level,
                model_accuracy: config.market_model_accuracy,
                generated_at: now,
            }
        }
    };

    log::debug!(
        "forecast: {:?} over {} periods",
        response.forecast_type,
        response.forecast_horizon
    );
    Ok(response)
}
