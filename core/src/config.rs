use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// A published bundle older than this is stale.
    pub cache_ttl_secs:     u64,
    /// Persist each published bundle so a restart can serve it.
    pub snapshot_enabled:   bool,
    pub default_page_limit: usize,
    pub max_page_limit:     usize,
    pub forecast:           ForecastConfig,
    pub optimize:           OptimizeConfig,
}

// ── Forecast heuristics ────────────────────────────────────────────
//
// Literal constants carried over unchanged. They are not fitted to
// anything; do not tune them.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForecastConfig {
    pub account_growth_rate:      f64,
    pub market_growth_rate:       f64,
    pub seasonal_amplitude:       f64,
    pub account_band:             f64,
    pub market_band:              f64,
    pub account_confidence_level: f64,
    pub market_confidence_level:  f64,
    pub account_model_accuracy:   f64,
    pub market_model_accuracy:    f64,
    pub max_horizon:              u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OptimizeConfig {
    pub default_usage_kwh:             f64,
    pub default_rate:                  f64,
    pub billing_days:                  f64,
    pub efficiency_savings_share:      f64,
    pub contract_timing_savings_share: f64,
    pub fallback_option_count:         usize,
    pub implementation_timeline:       String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs:     3600,
            snapshot_enabled:   true,
            default_page_limit: 100,
            max_page_limit:     1000,
            forecast:           ForecastConfig::default(),
            optimize:           OptimizeConfig::default(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            account_growth_rate:      0.02,
            market_growth_rate:       0.03,
            seasonal_amplitude:       0.10,
            account_band:             0.10,
            market_band:              0.15,
            account_confidence_level: 0.85,
            market_confidence_level:  0.75,
            account_model_accuracy:   0.78,
            market_model_accuracy:    0.72,
            max_horizon:              120,
        }
    }
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            default_usage_kwh:             10_000.0,
            default_rate:                  0.12,
            billing_days:                  30.0,
            efficiency_savings_share:      0.15,
            contract_timing_savings_share: 0.05,
            fallback_option_count:         3,
            implementation_timeline:       "3-6 months".into(),
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AnalyticsConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache_ttl_secs == 0 {
            anyhow::bail!("cache_ttl_secs must be positive");
        }
        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            anyhow::bail!(
                "default_page_limit must be in 1..={}, got {}",
                self.max_page_limit,
                self.default_page_limit
            );
        }
        if self.forecast.max_horizon == 0 {
            anyhow::bail!("forecast.max_horizon must be positive");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
