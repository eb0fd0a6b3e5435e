//! On-demand forecasts and optimization over a published bundle.

use chrono::{NaiveDate, TimeZone, Utc};
use kilowatt_core::{
    bundle::ResultBundle,
    config::{ForecastConfig, OptimizeConfig},
    error::AnalyticsError,
    forecast::{forecast, ForecastKind, ForecastRequest},
    market_intelligence::synthesize,
    optimize::{optimize, OptimizationRequest, RecommendationKind},
    pricing_analysis::analyze_pricing,
    types::{PricingRecord, UsageRecord},
    usage_analysis::analyze_usage,
};

fn usage(account: &str, esiid: &str, kwh: f64) -> UsageRecord {
    UsageRecord {
        account_name: account.into(),
        esiid:        esiid.into(),
        provider:     "Reliant".into(),
        zone:         "HOUSTON".into(),
        load_profile: "BUSHIDR".into(),
        monthly_kwh:  kwh,
        annual_kwh:   kwh * 12.0,
        total_bill:   kwh * 0.1,
    }
}

fn quotes(zone: &str, provider: &str, rates: &[f64]) -> Vec<PricingRecord> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    rates
        .iter()
        .enumerate()
        .map(|(day, rate)| PricingRecord {
            effective_date: start + chrono::Duration::days(day as i64),
            zone:           zone.into(),
            provider:       provider.into(),
            load_profile:   "BUSHIDR".into(),
            daily_rate:     *rate,
            term_months:    Some(12),
        })
        .collect()
}

/// Acme: 2 x 1000 kWh in January. HOUSTON: Cheap flat at 0.08, Pricey at 0.12.
fn bundle_with(pricing: Vec<PricingRecord>) -> ResultBundle {
    let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
    let usage = vec![usage("Acme", "A1", 1000.0), usage("Acme", "A2", 1000.0)];
    ResultBundle {
        usage_analyses:      analyze_usage(&usage, 1),
        pricing_analyses:    analyze_pricing(&pricing),
        commission_analyses: Vec::new(),
        market_intelligence: synthesize(&usage, &pricing, now),
        computed_at:         now,
    }
}

fn houston_pricing() -> Vec<PricingRecord> {
    let mut pricing = quotes("HOUSTON", "Cheap", &[0.08; 5]);
    pricing.extend(quotes("HOUSTON", "Pricey", &[0.12; 5]));
    pricing
}

// ── Forecast ────────────────────────────────────────────────────

#[test]
fn unknown_account_forecast_is_not_found() {
    let bundle = bundle_with(houston_pricing());
    let err = forecast(
        &bundle,
        &ForecastRequest::for_account("Nobody", 6),
        &ForecastConfig::default(),
        Utc::now(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalyticsError::NotFound { kind: "Account", .. }), "{err}");
}

#[test]
fn horizon_outside_bounds_is_rejected() {
    let bundle = bundle_with(houston_pricing());
    for horizon in [0, -1, 121] {
        let err = forecast(
            &bundle,
            &ForecastRequest::for_market(horizon),
            &ForecastConfig::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidRequest(_)), "horizon {horizon}: {err}");
    }
}

#[test]
fn account_forecast_starts_from_seasonal_prediction() {
    let bundle = bundle_with(houston_pricing());
    let response = forecast(
        &bundle,
        &ForecastRequest::for_account("Acme", 12),
        &ForecastConfig::default(),
        Utc::now(),
    )
    .unwrap();

    assert_eq!(response.forecast_type, ForecastKind::Usage);
    assert_eq!(response.forecast_data.len(), 12);
    assert_eq!(response.confidence_level, 0.85);

    // Period 1: 2000 kWh * 1.2 (January) predicted, times the factor again.
    let first = &response.forecast_data[0];
    assert_eq!(first.period, 1);
    assert!((first.forecasted_kwh - 2880.0).abs() < 0.01, "{}", first.forecasted_kwh);
    assert!(first.confidence_low < first.forecasted_kwh);
    assert!(first.confidence_high > first.forecasted_kwh);

    let periods: Vec<u32> = response.forecast_data.iter().map(|p| p.period).collect();
    assert_eq!(periods, (1..=12).collect::<Vec<_>>());
}

#[test]
fn market_forecast_compounds_monthly_share() {
    let bundle = bundle_with(houston_pricing());
    let response = forecast(
        &bundle,
        &ForecastRequest::for_market(3),
        &ForecastConfig::default(),
        Utc::now(),
    )
    .unwrap();

    assert_eq!(response.forecast_type, ForecastKind::Market);
    let values: Vec<f64> = response.forecast_data.iter().map(|p| p.forecasted_kwh).collect();
    // 24,000 kWh/year spread over 12 periods, growing 3% per period.
    assert_eq!(values, vec![2000.0, 2060.0, 2121.8]);
    assert_eq!(response.forecast_data[0].confidence_low, 1700.0);
    assert_eq!(response.forecast_data[0].confidence_high, 2300.0);
}

// ── Optimize ────────────────────────────────────────────────────

#[test]
fn best_option_is_cheapest_competitive_offer() {
    let bundle = bundle_with(houston_pricing());
    let request = OptimizationRequest {
        current_usage_kwh: Some(1000.0),
        current_rate: Some(0.12),
        zone: Some("HOUSTON".into()),
        ..OptimizationRequest::default()
    };
    let response = optimize(&bundle, &request, &OptimizeConfig::default()).unwrap();

    assert_eq!(response.best_option.provider, "Cheap");
    assert_eq!(response.current_cost, 3600.0);
    assert_eq!(response.optimized_cost, 2400.0);
    assert_eq!(response.potential_savings, 1200.0);
    assert_eq!(response.savings_percentage, 33.3);
    assert_eq!(response.recommendations.len(), 3);
    assert_eq!(response.recommendations[0].kind, RecommendationKind::ProviderSwitch);
    assert_eq!(response.recommendations[1].potential_savings, 540.0);
    assert_eq!(response.recommendations[2].potential_savings, 180.0);
    assert_eq!(response.implementation_timeline, "3-6 months");
}

#[test]
fn without_competitive_offers_falls_back_to_cheapest() {
    // A at 40th percentile, B at 90th: nobody in the bottom quartile.
    let mut pricing = quotes("WEST", "A", &[0.10, 0.10, 0.10, 0.10, 0.10]);
    pricing.extend(quotes("WEST", "B", &[0.09, 0.09, 0.09, 0.09, 0.11]));
    let bundle = bundle_with(pricing);
    assert!(bundle
        .pricing_analyses
        .iter()
        .all(|p| p.percentile_rank >= 25.0));

    let request = OptimizationRequest {
        zone: Some("WEST".into()),
        ..OptimizationRequest::default()
    };
    let response = optimize(&bundle, &request, &OptimizeConfig::default()).unwrap();
    assert_eq!(response.best_option.provider, "A");
    assert_eq!(response.best_option.current_rate, 0.10);
}

#[test]
fn unknown_zone_is_not_found() {
    let bundle = bundle_with(houston_pricing());
    let request = OptimizationRequest {
        zone: Some("FAR WEST".into()),
        ..OptimizationRequest::default()
    };
    let err = optimize(&bundle, &request, &OptimizeConfig::default()).unwrap_err();
    assert!(matches!(err, AnalyticsError::NotFound { .. }), "{err}");
}

#[test]
fn negative_inputs_are_rejected() {
    let bundle = bundle_with(houston_pricing());
    let request = OptimizationRequest {
        current_rate: Some(-0.1),
        ..OptimizationRequest::default()
    };
    let err = optimize(&bundle, &request, &OptimizeConfig::default()).unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidRequest(_)));
}
