//! Per-provider commission rollups and next-month forecast.

use chrono::NaiveDate;
use kilowatt_core::{
    commission_analysis::analyze_commissions,
    types::{CommissionRecord, Trend, YearMonth},
};

fn payment(provider: &str, year: i32, month: u32, day: u32, amount: f64) -> CommissionRecord {
    CommissionRecord {
        account_name:    "Acme".into(),
        provider:        provider.into(),
        commission_type: "residual".into(),
        payment_amount:  amount,
        payment_date:    NaiveDate::from_ymd_opt(year, month, day).unwrap(),
    }
}

#[test]
fn growing_provider_trends_up_and_forecasts_above_average() {
    let records = vec![
        payment("Z", 2024, 1, 5, 100.0),
        payment("Z", 2024, 2, 5, 100.0),
        payment("Z", 2024, 3, 5, 200.0),
        payment("Z", 2024, 4, 5, 300.0),
    ];
    let analyses = analyze_commissions(&records);
    assert_eq!(analyses.len(), 1);

    let z = &analyses[0];
    assert_eq!(z.commission_count, 4);
    assert_eq!(z.total_commission, 700.0);
    assert_eq!(z.avg_commission, 175.0);
    assert_eq!(z.commission_trend, Trend::Increasing);
    // recent 200 vs older 133.33: growth 50%, so 200 * 1.5.
    assert!((z.predicted_monthly_commission - 300.0).abs() < 1e-9);
    assert!(z.predicted_monthly_commission > z.avg_commission);
}

#[test]
fn two_distinct_months_fall_back_to_stable_average() {
    // Three $100 payments in January and one $300 payment in April.
    let records = vec![
        payment("Z", 2024, 1, 3, 100.0),
        payment("Z", 2024, 1, 12, 100.0),
        payment("Z", 2024, 1, 24, 100.0),
        payment("Z", 2024, 4, 8, 300.0),
    ];
    let z = &analyze_commissions(&records)[0];
    assert_eq!(z.commission_count, 4);
    assert_eq!(z.monthly_performance.len(), 2);
    assert_eq!(z.avg_commission, 150.0);
    assert_eq!(z.commission_trend, Trend::Stable);
    assert_eq!(z.predicted_monthly_commission, z.avg_commission);
}

#[test]
fn monthly_performance_is_chronological_and_summed() {
    let records = vec![
        payment("Z", 2024, 11, 2, 50.0),
        payment("Z", 2023, 12, 9, 10.0),
        payment("Z", 2024, 11, 20, 25.0),
        payment("Z", 2024, 1, 1, 5.0),
    ];
    let z = &analyze_commissions(&records)[0];
    let months: Vec<(YearMonth, f64)> = z.monthly_performance.iter().map(|(m, v)| (*m, *v)).collect();
    assert_eq!(
        months,
        vec![
            (YearMonth::new(2023, 12), 10.0),
            (YearMonth::new(2024, 1), 5.0),
            (YearMonth::new(2024, 11), 75.0),
        ]
    );
    let json = serde_json::to_string(&z.monthly_performance).unwrap();
    assert_eq!(json, r#"{"2023-12":10.0,"2024-01":5.0,"2024-11":75.0}"#);
}

#[test]
fn fewer_than_three_payments_are_excluded() {
    let records = vec![
        payment("Sparse", 2024, 1, 1, 900.0),
        payment("Sparse", 2024, 2, 1, 900.0),
        payment("Busy", 2024, 1, 1, 10.0),
        payment("Busy", 2024, 1, 2, 10.0),
        payment("Busy", 2024, 1, 3, 10.0),
    ];
    let providers: Vec<String> = analyze_commissions(&records)
        .into_iter()
        .map(|c| c.provider)
        .collect();
    assert_eq!(providers, vec!["Busy".to_string()]);
}

#[test]
fn under_three_months_is_stable_at_the_average() {
    let records = vec![
        payment("Two", 2024, 5, 1, 100.0),
        payment("Two", 2024, 5, 15, 200.0),
        payment("Two", 2024, 6, 1, 600.0),
    ];
    let two = &analyze_commissions(&records)[0];
    assert_eq!(two.commission_trend, Trend::Stable);
    assert_eq!(two.predicted_monthly_commission, two.avg_commission);
    assert_eq!(two.avg_commission, 300.0);
}

#[test]
fn shrinking_provider_trends_down() {
    let records = vec![
        payment("Fade", 2024, 1, 1, 400.0),
        payment("Fade", 2024, 2, 1, 300.0),
        payment("Fade", 2024, 3, 1, 200.0),
        payment("Fade", 2024, 4, 1, 100.0),
    ];
    let fade = &analyze_commissions(&records)[0];
    assert_eq!(fade.commission_trend, Trend::Decreasing);
    assert!(fade.predicted_monthly_commission < fade.avg_commission);
}
