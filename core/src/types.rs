//! Shared record and label types used across the analytics pipeline.
//!
//! Records are validated once at the source boundary. Analyzers assume
//! every field they read is present and finite.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One metered service point (ESIID) belonging to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub account_name: String,
    pub esiid:        String,
    pub provider:     String,
    pub zone:         String,
    pub load_profile: String,
    pub monthly_kwh:  f64,
    pub annual_kwh:   f64,
    pub total_bill:   f64,
}

/// A provider's daily rate quote for a zone on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRecord {
    pub effective_date: NaiveDate,
    pub zone:           String,
    pub provider:       String,
    pub load_profile:   String,
    pub daily_rate:     f64,
    #[serde(default)]
    pub term_months:    Option<u32>,
}

/// A commission payment attributed to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionRecord {
    pub account_name:    String,
    pub provider:        String,
    #[serde(default)]
    pub commission_type: String,
    pub payment_amount:  f64,
    pub payment_date:    NaiveDate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UsagePattern {
    Stable,
    ModerateVariation,
    HighVariation,
}

impl UsagePattern {
    /// Classify a coefficient of variation.
    pub fn from_cv(cv: f64) -> Self {
        if cv < 0.2 {
            Self::Stable
        } else if cv < 0.5 {
            Self::ModerateVariation
        } else {
            Self::HighVariation
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    /// Compare a recent mean against an older one with a symmetric band.
    /// `band` of 0.05 means "more than 5% above" is increasing.
    pub fn classify(recent: f64, older: f64, band: f64) -> Self {
        if recent > older * (1.0 + band) {
            Self::Increasing
        } else if recent < older * (1.0 - band) {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MarketPosition {
    Competitive,
    Average,
    Expensive,
}

impl MarketPosition {
    pub fn from_percentile(percentile_rank: f64) -> Self {
        if percentile_rank < 25.0 {
            Self::Competitive
        } else if percentile_rank < 75.0 {
            Self::Average
        } else {
            Self::Expensive
        }
    }
}

/// A calendar month used as the key for monthly series.
/// Serializes as `"YYYY-MM"` and orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year:  i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
        let year: i32 = y.parse().map_err(|_| format!("bad year in '{s}'"))?;
        let month: u32 = m.parse().map_err(|_| format!("bad month in '{s}'"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in '{s}'"));
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
