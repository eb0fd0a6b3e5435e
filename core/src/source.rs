//! Record source seam.
//!
//! RULE: analyzers never read storage. A refresh pulls all three tables
//! through a RecordSource, then runs the analyzers on owned vectors.
//!
//! Implementations must pre-filter rows the analyzers cannot use:
//! zero/missing monthly kWh, zero/missing daily rate, missing payment.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    types::{CommissionRecord, PricingRecord, UsageRecord},
};

pub trait RecordSource: Send + Sync {
    fn read_usage(&self) -> AnalyticsResult<Vec<UsageRecord>>;
    fn read_pricing(&self) -> AnalyticsResult<Vec<PricingRecord>>;
    fn read_commissions(&self) -> AnalyticsResult<Vec<CommissionRecord>>;
}

/// Which table a source read touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Usage,
    Pricing,
    Commissions,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Usage       => "usage",
            Self::Pricing     => "pricing",
            Self::Commissions => "commission",
        }
    }
}

/// An in-process source over owned vectors.
///
/// Applies the same filters as the SQLite store so tests can feed raw rows.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub usage:       Vec<UsageRecord>,
    pub pricing:     Vec<PricingRecord>,
    pub commissions: Vec<CommissionRecord>,
    failing:         Option<Table>,
}

impl MemorySource {
    pub fn new(
        usage: Vec<UsageRecord>,
        pricing: Vec<PricingRecord>,
        commissions: Vec<CommissionRecord>,
    ) -> Self {
        Self { usage, pricing, commissions, failing: None }
    }

    /// Make reads of `table` fail with SourceReadFailure (used in tests).
    pub fn failing_on(mut self, table: Table) -> Self {
        self.failing = Some(table);
        self
    }

    fn check(&self, table: Table) -> AnalyticsResult<()> {
        match self.failing {
            Some(t) if t == table => Err(AnalyticsError::source_read(table.name(), "source unavailable")),
            _ => Ok(()),
        }
    }
}

impl RecordSource for MemorySource {
    fn read_usage(&self) -> AnalyticsResult<Vec<UsageRecord>> {
        self.check(Table::Usage)?;
        Ok(self
            .usage
            .iter()
            .filter(|r| r.monthly_kwh.is_finite() && r.monthly_kwh > 0.0)
            .cloned()
            .collect())
    }

    fn read_pricing(&self) -> AnalyticsResult<Vec<PricingRecord>> {
        self.check(Table::Pricing)?;
        Ok(self
            .pricing
            .iter()
            .filter(|r| r.daily_rate.is_finite() && r.daily_rate > 0.0)
            .cloned()
            .collect())
    }

    fn read_commissions(&self) -> AnalyticsResult<Vec<CommissionRecord>> {
        self.check(Table::Commissions)?;
        Ok(self
            .commissions
            .iter()
            .filter(|r| r.payment_amount.is_finite())
            .cloned()
            .collect())
    }
}
