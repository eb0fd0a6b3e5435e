//! Seeded demo dataset.
//!
//! RULE: the same seed always yields the same records. All randomness
//! flows through DemoRng streams derived from the one seed, one stream
//! per table, so growing one table never reshuffles the others.

use crate::{
    error::AnalyticsResult,
    source::MemorySource,
    store::RecordStore,
    types::{CommissionRecord, PricingRecord, UsageRecord},
};
use chrono::{Duration, NaiveDate};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub const ZONES: [&str; 4] = ["HOUSTON", "NORTH", "SOUTH", "WEST"];
pub const PROVIDERS: [&str; 6] = [
    "Reliant Energy",
    "TXU Energy",
    "Direct Energy",
    "Green Mountain",
    "Gexa Energy",
    "Champion Energy",
];
const LOAD_PROFILES: [&str; 3] = ["BUSHIDR", "BUSMEDLF", "BUSLOLF"];
const ACCOUNT_PREFIXES: [&str; 8] = [
    "Lone Star", "Gulf Coast", "Pecos", "Brazos", "Red River", "Hill Country", "Permian", "Bluebonnet",
];
const ACCOUNT_SUFFIXES: [&str; 6] = [
    "Logistics", "Cold Storage", "Manufacturing", "Properties", "Foods", "Medical",
];

/// Stable stream slots. Append only.
#[derive(Clone, Copy, Debug)]
#[repr(u64)]
enum Stream {
    Usage = 0,
    Pricing = 1,
    Commissions = 2,
}

/// A deterministic RNG stream for one table.
pub struct DemoRng {
    inner: Pcg64Mcg,
}

impl DemoRng {
    pub fn new(seed: u64, stream: u64) -> Self {
        let derived_seed = seed ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self { inner: Pcg64Mcg::seed_from_u64(derived_seed) }
    }

    /// A float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        (self.inner.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// A float in [low, high).
    pub fn between(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// An index in [0, n). `n` must be non-zero.
    pub fn index(&mut self, n: usize) -> usize {
        (self.inner.next_u64() % n as u64) as usize
    }

    pub fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.index(items.len())]
    }
}

/// Sizes of the generated tables.
#[derive(Debug, Clone, Copy)]
pub struct DemoShape {
    pub accounts:           usize,
    pub max_service_points: usize,
    pub pricing_days:       usize,
    pub payment_months:     usize,
}

impl Default for DemoShape {
    fn default() -> Self {
        Self {
            accounts:           24,
            max_service_points: 6,
            pricing_days:       30,
            payment_months:     12,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoDataset {
    pub usage:       Vec<UsageRecord>,
    pub pricing:     Vec<PricingRecord>,
    pub commissions: Vec<CommissionRecord>,
}

impl DemoDataset {
    pub fn generate(seed: u64) -> Self {
        Self::generate_with(seed, DemoShape::default())
    }

    pub fn generate_with(seed: u64, shape: DemoShape) -> Self {
        let accounts = account_names(shape.accounts);
        let usage = usage_records(&mut DemoRng::new(seed, Stream::Usage as u64), &accounts, shape);
        let pricing = pricing_records(&mut DemoRng::new(seed, Stream::Pricing as u64), shape);
        let commissions = commission_records(
            &mut DemoRng::new(seed, Stream::Commissions as u64),
            &accounts,
            shape,
        );
        log::info!(
            "demo: seed {seed} -> {} usage, {} pricing, {} commission rows",
            usage.len(),
            pricing.len(),
            commissions.len()
        );
        Self { usage, pricing, commissions }
    }

    pub fn into_source(self) -> MemorySource {
        MemorySource::new(self.usage, self.pricing, self.commissions)
    }

    /// Insert every record into `store` in one pass.
    pub fn load_into(&self, store: &RecordStore) -> AnalyticsResult<()> {
        for record in &self.usage {
            store.insert_usage(record)?;
        }
        for record in &self.pricing {
            store.insert_pricing(record)?;
        }
        for record in &self.commissions {
            store.insert_commission(record)?;
        }
        Ok(())
    }
}

fn account_names(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let prefix = ACCOUNT_PREFIXES[i % ACCOUNT_PREFIXES.len()];
            let suffix = ACCOUNT_SUFFIXES[(i / ACCOUNT_PREFIXES.len()) % ACCOUNT_SUFFIXES.len()];
            format!("{prefix} {suffix}")
        })
        .collect()
}

fn usage_records(rng: &mut DemoRng, accounts: &[String], shape: DemoShape) -> Vec<UsageRecord> {
    let mut records = Vec::new();
    for (account_idx, account) in accounts.iter().enumerate() {
        let zone = rng.pick(&ZONES);
        let provider = rng.pick(&PROVIDERS);
        let base_kwh = rng.between(2_000.0, 60_000.0);
        let spread = rng.between(0.05, 0.8);
        let rate = rng.between(0.07, 0.16);
        let points = 1 + rng.index(shape.max_service_points.max(1));

        for point in 0..points {
            let monthly_kwh = (base_kwh * (1.0 + spread * (rng.next_f64() - 0.5) * 2.0)).max(1.0);
            records.push(UsageRecord {
                account_name: account.clone(),
                esiid:        format!("1008901{account_idx:04}{point:06}"),
                provider:     provider.to_string(),
                zone:         zone.to_string(),
                load_profile: rng.pick(&LOAD_PROFILES).to_string(),
                monthly_kwh,
                annual_kwh:   monthly_kwh * 12.0,
                total_bill:   monthly_kwh * rate,
            });
        }
    }
    records
}

fn pricing_records(rng: &mut DemoRng, shape: DemoShape) -> Vec<PricingRecord> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let mut records = Vec::new();
    for zone in ZONES {
        for provider in PROVIDERS {
            let base_rate = rng.between(0.08, 0.15);
            let drift = rng.between(-0.0004, 0.0004);
            for day in 0..shape.pricing_days {
                let noise = rng.between(-0.002, 0.002);
                records.push(PricingRecord {
                    effective_date: start + Duration::days(day as i64),
                    zone:           zone.to_string(),
                    provider:       provider.to_string(),
                    load_profile:   rng.pick(&LOAD_PROFILES).to_string(),
                    daily_rate:     (base_rate + drift * day as f64 + noise).max(0.01),
                    term_months:    Some([12, 24, 36][rng.index(3)]),
                });
            }
        }
    }
    records
}

fn commission_records(
    rng: &mut DemoRng,
    accounts: &[String],
    shape: DemoShape,
) -> Vec<CommissionRecord> {
    let mut records = Vec::new();
    if accounts.is_empty() {
        return records;
    }
    for provider in PROVIDERS {
        let monthly_base = rng.between(500.0, 5_000.0);
        for month in 0..shape.payment_months {
            let year = 2024 + (month / 12) as i32;
            let month_of_year = (month % 12) as u32 + 1;
            let payments = 1 + rng.index(3);
            for _ in 0..payments {
                let day = 1 + rng.index(28) as u32;
                let Some(payment_date) = NaiveDate::from_ymd_opt(year, month_of_year, day) else {
                    continue;
                };
                records.push(CommissionRecord {
                    account_name:    accounts[rng.index(accounts.len())].clone(),
                    provider:        provider.to_string(),
                    commission_type: if rng.next_f64() < 0.7 { "residual" } else { "upfront" }.into(),
                    payment_amount:  monthly_base * rng.between(0.6, 1.4) / payments as f64,
                    payment_date,
                });
            }
        }
    }
    records
}
