//! Read-side analytics service used by the request boundary.
//!
//! Every read is a projection over the currently published bundle.
//! Refreshes happen on the worker thread unless the caller opts into
//! blocking on stale data.

use crate::{
    anomaly::{self, Anomaly},
    bundle::ResultBundle,
    cache::ResultCache,
    clock::Clock,
    commission_analysis::CommissionAnalysis,
    config::AnalyticsConfig,
    error::AnalyticsResult,
    forecast::{self, ForecastRequest, ForecastResponse},
    market_intelligence::MarketIntelligence,
    optimize::{self, OptimizationRequest, OptimizationResponse},
    pricing_analysis::PricingAnalysis,
    query::{CommissionFilter, Page, PageRequest, PricingFilter, UsageFilter},
    refresher::RefreshWorker,
    source::RecordSource,
    usage_analysis::UsageAnalysis,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SUMMARY_TOP_N: usize = 3;
const DATA_QUALITY_SCORE: f64 = 0.87;
const MODEL_ACCURACY: f64 = 0.78;

/// What a read does when the published bundle has outlived its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Serve the stale bundle and ask the worker for a refresh.
    #[default]
    ServeStaleAndRefresh,
    /// Refresh inline first; fall back to the stale bundle if that fails.
    BlockUntilRefreshed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub market_size_kwh:            f64,
    pub market_value_usd:           f64,
    pub top_performing_zones:       Vec<String>,
    pub most_competitive_providers: Vec<String>,
    pub growth_opportunities:       Vec<String>,
    pub risk_factors:               Vec<String>,
    pub key_insights:               Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_accounts_analyzed:        usize,
    pub total_service_points_processed: usize,
    pub analysis_duration_seconds:      f64,
    pub data_quality_score:             f64,
    pub model_accuracy:                 f64,
    pub last_updated:                   DateTime<Utc>,
}

pub struct AnalyticsService {
    config:       AnalyticsConfig,
    cache:        Arc<ResultCache>,
    source:       Arc<dyn RecordSource>,
    worker:       RefreshWorker,
    stale_policy: StalePolicy,
}

impl AnalyticsService {
    /// Build a service with a fresh cache and its own refresh worker.
    pub fn new(
        config: AnalyticsConfig,
        source: Arc<dyn RecordSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(ResultCache::new(config.cache_ttl(), clock));
        Self::with_cache(config, cache, source)
    }

    /// Build a service around an existing cache (e.g. one with snapshots).
    pub fn with_cache(
        config: AnalyticsConfig,
        cache: Arc<ResultCache>,
        source: Arc<dyn RecordSource>,
    ) -> Self {
        let worker = RefreshWorker::spawn(Arc::clone(&cache), Arc::clone(&source));
        Self {
            config,
            cache,
            source,
            worker,
            stale_policy: StalePolicy::default(),
        }
    }

    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn worker(&self) -> &RefreshWorker {
        &self.worker
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.cache.clock().now()
    }

    /// The bundle every read works from, with the stale policy applied.
    fn current(&self) -> AnalyticsResult<Arc<ResultBundle>> {
        let cached = self.cache.get()?;
        if !cached.stale {
            return Ok(cached.bundle);
        }
        match self.stale_policy {
            StalePolicy::ServeStaleAndRefresh => {
                log::debug!(
                    "analytics: serving stale bundle ({}s old), refresh requested",
                    cached.age.as_secs()
                );
                self.worker.trigger();
                Ok(cached.bundle)
            }
            StalePolicy::BlockUntilRefreshed => match self.cache.refresh(self.source.as_ref()) {
                Ok(fresh) => Ok(fresh),
                Err(e) => {
                    log::warn!("analytics: inline refresh failed, serving stale bundle: {e}");
                    Ok(cached.bundle)
                }
            },
        }
    }

    // ── Refresh ────────────────────────────────────────────────

    /// Ask the worker to refresh. Returns immediately.
    pub fn trigger_refresh(&self) -> bool {
        log::info!("analytics: refresh triggered");
        self.worker.trigger()
    }

    /// Refresh on the calling thread and return the published bundle.
    pub fn refresh_now(&self) -> AnalyticsResult<Arc<ResultBundle>> {
        self.cache.refresh(self.source.as_ref())
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn get_results(&self) -> AnalyticsResult<Arc<ResultBundle>> {
        self.current()
    }

    pub fn get_summary(&self) -> AnalyticsResult<AnalyticsSummary> {
        let bundle = self.current()?;
        Ok(summarize(&bundle.market_intelligence))
    }

    pub fn get_usage_analysis(
        &self,
        filter: &UsageFilter,
        page: PageRequest,
    ) -> AnalyticsResult<Page<UsageAnalysis>> {
        let limit = page.resolve(self.config.default_page_limit, self.config.max_page_limit)?;
        let bundle = self.current()?;
        let matching: Vec<UsageAnalysis> = bundle
            .usage_analyses
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        Ok(page.apply(&matching, limit))
    }

    pub fn get_pricing_analysis(&self, filter: &PricingFilter) -> AnalyticsResult<Vec<PricingAnalysis>> {
        let bundle = self.current()?;
        Ok(bundle
            .pricing_analyses
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    pub fn get_commission_analysis(
        &self,
        filter: &CommissionFilter,
    ) -> AnalyticsResult<Vec<CommissionAnalysis>> {
        let bundle = self.current()?;
        Ok(bundle
            .commission_analyses
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    pub fn get_market_intelligence(&self) -> AnalyticsResult<MarketIntelligence> {
        Ok(self.current()?.market_intelligence.clone())
    }

    // ── On-demand computations ─────────────────────────────────

    pub fn forecast(&self, request: &ForecastRequest) -> AnalyticsResult<ForecastResponse> {
        let bundle = self.current()?;
        forecast::forecast(&bundle, request, &self.config.forecast, self.now())
    }

    pub fn optimize(&self, request: &OptimizationRequest) -> AnalyticsResult<OptimizationResponse> {
        let bundle = self.current()?;
        optimize::optimize(&bundle, request, &self.config.optimize)
    }

    pub fn anomalies(&self, severity: Option<&str>) -> AnalyticsResult<Vec<Anomaly>> {
        let filter = anomaly::parse_filter(severity)?;
        let bundle = self.current()?;
        Ok(anomaly::detect(&bundle, filter, self.now()))
    }

    pub fn performance_metrics(&self) -> AnalyticsResult<PerformanceMetrics> {
        let cached = self.cache.get()?;
        let bundle = &cached.bundle;
        Ok(PerformanceMetrics {
            total_accounts_analyzed: bundle.usage_analyses.len(),
            total_service_points_processed: bundle
                .market_intelligence
                .market_overview
                .distinct_service_point_count,
            analysis_duration_seconds: cached.refresh_duration.as_secs_f64(),
            data_quality_score: DATA_QUALITY_SCORE,
            model_accuracy: MODEL_ACCURACY,
            last_updated: bundle.computed_at,
        })
    }
}

fn summarize(market: &MarketIntelligence) -> AnalyticsSummary {
    let overview = &market.market_overview;
    let top_zones = market.top_zones(SUMMARY_TOP_N);
    let competitive = market.most_competitive_providers(SUMMARY_TOP_N);

    let key_insights = vec![
        format!(
            "Total market size: {} kWh/year",
            group_thousands(overview.total_annual_kwh)
        ),
        format!("Average cost per kWh: ${:.4}", overview.avg_cost_per_kwh),
        format!(
            "Top performing zone: {}",
            top_zones.first().map(String::as_str).unwrap_or("N/A")
        ),
        format!(
            "Most competitive provider: {}",
            competitive.first().map(String::as_str).unwrap_or("N/A")
        ),
    ];

    AnalyticsSummary {
        market_size_kwh: overview.total_annual_kwh,
        market_value_usd: overview.total_annual_value,
        top_performing_zones: top_zones,
        most_competitive_providers: competitive,
        growth_opportunities: to_strings(&[
            "High-usage accounts",
            "Underserved zones",
            "Seasonal optimization",
        ]),
        risk_factors: to_strings(&["Price volatility", "Demand fluctuation", "Competitive pressure"]),
        key_insights,
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Round to a whole number and group digits with commas: 1234567.8 -> "1,234,568".
pub fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && rounded != "0" {
        grouped.insert(0, '-');
    }
    grouped
}
