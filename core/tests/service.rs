//! Read-side service: summaries, filters, pagination, stale handling.

use chrono::NaiveDate;
use kilowatt_core::{
    clock::{Clock, FixedClock},
    config::AnalyticsConfig,
    demo::DemoDataset,
    error::{AnalyticsError, ErrorStatus},
    query::{CommissionFilter, PageRequest, PricingFilter, UsageFilter},
    service::{AnalyticsService, StalePolicy},
    source::{MemorySource, RecordSource},
    types::{CommissionRecord, MarketPosition, PricingRecord, UsagePattern, UsageRecord},
};
use std::sync::Arc;
use std::time::Duration;

fn usage(account: &str, esiid: &str, provider: &str, zone: &str, kwh: f64, bill: f64) -> UsageRecord {
    UsageRecord {
        account_name: account.into(),
        esiid:        esiid.into(),
        provider:     provider.into(),
        zone:         zone.into(),
        load_profile: "BUSMEDLF".into(),
        monthly_kwh:  kwh,
        annual_kwh:   kwh * 12.0,
        total_bill:   bill,
    }
}

fn quote(zone: &str, provider: &str, day: u32, rate: f64) -> PricingRecord {
    PricingRecord {
        effective_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        zone:           zone.into(),
        provider:       provider.into(),
        load_profile:   "BUSMEDLF".into(),
        daily_rate:     rate,
        term_months:    Some(24),
    }
}

fn payment(provider: &str, month: u32, amount: f64) -> CommissionRecord {
    CommissionRecord {
        account_name:    "Acme".into(),
        provider:        provider.into(),
        commission_type: "residual".into(),
        payment_amount:  amount,
        payment_date:    NaiveDate::from_ymd_opt(2024, month, 10).unwrap(),
    }
}

fn small_market() -> MemorySource {
    let usage = vec![
        usage("Acme Foods", "A1", "Reliant", "HOUSTON", 1000.0, 100.0),
        usage("Acme Foods", "A2", "Reliant", "HOUSTON", 3000.0, 240.0),
        usage("Brazos Medical", "B1", "TXU", "NORTH", 250.0, 30.0),
        usage("Brazos Medical", "B2", "TXU", "NORTH", 250.0, 30.0),
    ];
    let mut pricing = Vec::new();
    for day in 1..=5 {
        pricing.push(quote("HOUSTON", "Reliant", day, 0.12));
        pricing.push(quote("NORTH", "TXU", day, 0.09));
    }
    let commissions = vec![
        payment("Reliant", 1, 100.0),
        payment("Reliant", 2, 100.0),
        payment("Reliant", 3, 100.0),
        payment("TXU", 1, 50.0),
    ];
    MemorySource::new(usage, pricing, commissions)
}

fn service_over(source: MemorySource, clock: Arc<FixedClock>) -> AnalyticsService {
    let source: Arc<dyn RecordSource> = Arc::new(source);
    AnalyticsService::new(AnalyticsConfig::default(), source, clock)
}

#[test]
fn reads_before_first_refresh_are_not_computed() {
    let service = service_over(small_market(), Arc::new(FixedClock::at_month(2024, 6)));
    let err = service.get_results().unwrap_err();
    assert!(matches!(err, AnalyticsError::NotComputed));
    assert_eq!(err.status(), ErrorStatus::NotFound);
    assert!(service.get_summary().is_err());
    assert!(service.performance_metrics().is_err());
}

#[test]
fn summary_reports_market_headlines() {
    let service = service_over(small_market(), Arc::new(FixedClock::at_month(2024, 6)));
    service.refresh_now().unwrap();

    let summary = service.get_summary().unwrap();
    assert_eq!(summary.market_size_kwh, 4500.0 * 12.0);
    assert_eq!(summary.top_performing_zones, vec!["HOUSTON".to_string(), "NORTH".to_string()]);
    assert_eq!(summary.most_competitive_providers[0], "TXU");
    assert_eq!(
        summary.key_insights,
        vec![
            "Total market size: 54,000 kWh/year".to_string(),
            "Average cost per kWh: $0.0889".to_string(),
            "Top performing zone: HOUSTON".to_string(),
            "Most competitive provider: TXU".to_string(),
        ]
    );
    assert_eq!(summary.growth_opportunities.len(), 3);
    assert_eq!(summary.risk_factors[0], "Price volatility");
}

#[test]
fn empty_market_summary_uses_placeholders() {
    let service = service_over(MemorySource::default(), Arc::new(FixedClock::at_month(2024, 6)));
    service.refresh_now().unwrap();
    let summary = service.get_summary().unwrap();
    assert!(summary.key_insights.contains(&"Top performing zone: N/A".to_string()));
    assert!(summary.key_insights.contains(&"Most competitive provider: N/A".to_string()));
}

#[test]
fn usage_reads_filter_then_paginate() {
    let data = DemoDataset::generate(77);
    let service = service_over(data.into_source(), Arc::new(FixedClock::at_month(2024, 6)));
    let bundle = service.refresh_now().unwrap();
    let total = bundle.usage_analyses.len();
    assert!(total > 4, "demo set should have several multi-point accounts");

    let page = service
        .get_usage_analysis(&UsageFilter::default(), PageRequest::new(2, 2))
        .unwrap();
    assert_eq!(page.total, total);
    assert_eq!(page.page, 2);
    assert_eq!(page.results, bundle.usage_analyses[2..4].to_vec());

    let stable = UsageFilter {
        usage_pattern: Some(UsagePattern::Stable),
        ..UsageFilter::default()
    };
    let stable_page = service.get_usage_analysis(&stable, PageRequest::default()).unwrap();
    assert!(stable_page.results.iter().all(|u| u.usage_pattern == UsagePattern::Stable));

    let err = service
        .get_usage_analysis(&UsageFilter::default(), PageRequest::new(0, 5000))
        .unwrap_err();
    assert_eq!(err.status(), ErrorStatus::ClientInput);
}

#[test]
fn account_name_filter_is_case_insensitive_substring() {
    let service = service_over(small_market(), Arc::new(FixedClock::at_month(2024, 6)));
    service.refresh_now().unwrap();
    let filter = UsageFilter {
        account_name: Some("acme".into()),
        ..UsageFilter::default()
    };
    let page = service.get_usage_analysis(&filter, PageRequest::default()).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.results[0].account_name, "Acme Foods");
}

#[test]
fn pricing_and_commission_filters() {
    let service = service_over(small_market(), Arc::new(FixedClock::at_month(2024, 6)));
    service.refresh_now().unwrap();

    let north = service
        .get_pricing_analysis(&PricingFilter { zone: Some("NORTH".into()), ..PricingFilter::default() })
        .unwrap();
    assert_eq!(north.len(), 1);
    assert_eq!(north[0].provider, "TXU");

    let competitive = service
        .get_pricing_analysis(&PricingFilter {
            market_position: Some(MarketPosition::Competitive),
            ..PricingFilter::default()
        })
        .unwrap();
    assert_eq!(competitive.len(), 2, "each provider is alone in its zone");

    let reliant = service
        .get_commission_analysis(&CommissionFilter { provider: Some("Reliant".into()) })
        .unwrap();
    assert_eq!(reliant.len(), 1);
    assert!(service
        .get_commission_analysis(&CommissionFilter { provider: Some("TXU".into()) })
        .unwrap()
        .is_empty());
}

#[test]
fn performance_metrics_describe_last_refresh() {
    let clock = Arc::new(FixedClock::at_month(2024, 6));
    let service = service_over(small_market(), clock.clone());
    service.refresh_now().unwrap();

    let metrics = service.performance_metrics().unwrap();
    assert_eq!(metrics.total_accounts_analyzed, 2);
    assert_eq!(metrics.total_service_points_processed, 4);
    assert_eq!(metrics.data_quality_score, 0.87);
    assert_eq!(metrics.model_accuracy, 0.78);
    assert_eq!(metrics.last_updated, clock.now());
    assert!(metrics.analysis_duration_seconds >= 0.0);
}

#[test]
fn stale_reads_serve_old_bundle_and_refresh_in_background() {
    let clock = Arc::new(FixedClock::at_month(2024, 6));
    let config = AnalyticsConfig { cache_ttl_secs: 60, ..AnalyticsConfig::default() };
    let source: Arc<dyn RecordSource> = Arc::new(small_market());
    let service = AnalyticsService::new(config, source, clock.clone());

    let first = service.refresh_now().unwrap();
    clock.advance(chrono::Duration::seconds(120));

    let served = service.get_results().unwrap();
    assert_eq!(served.computed_at, first.computed_at, "stale bundle is served, not withheld");

    assert!(service.worker().wait_for_attempts(1, Duration::from_secs(10)));
    let refreshed = service.cache().get().unwrap();
    assert_eq!(refreshed.bundle.computed_at, clock.now());
    assert!(!refreshed.stale);
}

#[test]
fn blocking_policy_refreshes_inline() {
    let clock = Arc::new(FixedClock::at_month(2024, 6));
    let config = AnalyticsConfig { cache_ttl_secs: 60, ..AnalyticsConfig::default() };
    let source: Arc<dyn RecordSource> = Arc::new(small_market());
    let service = AnalyticsService::new(config, source, clock.clone())
        .with_stale_policy(StalePolicy::BlockUntilRefreshed);

    service.refresh_now().unwrap();
    clock.advance(chrono::Duration::seconds(120));
    let served = service.get_results().unwrap();
    assert_eq!(served.computed_at, clock.now());
}

#[test]
fn anomaly_severity_filter_is_validated() {
    let service = service_over(small_market(), Arc::new(FixedClock::at_month(2024, 6)));
    service.refresh_now().unwrap();
    assert!(service.anomalies(None).unwrap().is_empty(), "no service point sits two deviations out");
    assert!(service.anomalies(Some("critical")).unwrap().is_empty());
    let err = service.anomalies(Some("catastrophic")).unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidRequest(_)));
}
