//! The analytics engine: one full pass from raw records to a bundle.
//!
//! EXECUTION ORDER (fixed):
//!   1. Read usage, pricing and commission tables (any failure aborts)
//!   2. Usage analyzer
//!   3. Pricing analyzer
//!   4. Commission analyzer
//!   5. Market intelligence synthesizer (raw usage + pricing)
//!
//! RULES:
//!   - All reads finish before any analyzer runs.
//!   - Analyzers are pure; the engine owns the clock reading so every
//!     part of one bundle shares a single timestamp.

use crate::{
    bundle::ResultBundle,
    clock::Clock,
    commission_analysis::analyze_commissions,
    error::AnalyticsResult,
    market_intelligence::synthesize,
    pricing_analysis::analyze_pricing,
    source::RecordSource,
    usage_analysis::analyze_usage,
};
use chrono::Datelike;

/// Row counts read by one refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputCounts {
    pub usage:       usize,
    pub pricing:     usize,
    pub commissions: usize,
}

pub struct AnalyticsEngine;

impl AnalyticsEngine {
    /// Run every analyzer over a fresh read of `source`.
    pub fn compute(
        source: &dyn RecordSource,
        clock: &dyn Clock,
    ) -> AnalyticsResult<(ResultBundle, InputCounts)> {
        let usage = source.read_usage()?;
        let pricing = source.read_pricing()?;
        let commissions = source.read_commissions()?;

        let counts = InputCounts {
            usage:       usage.len(),
            pricing:     pricing.len(),
            commissions: commissions.len(),
        };
        log::info!(
            "analytics: loaded {} usage, {} pricing, {} commission records",
            counts.usage,
            counts.pricing,
            counts.commissions,
        );

        let now = clock.now();
        let bundle = ResultBundle {
            usage_analyses:      analyze_usage(&usage, now.month()),
            pricing_analyses:    analyze_pricing(&pricing),
            commission_analyses: analyze_commissions(&commissions),
            market_intelligence: synthesize(&usage, &pricing, now),
            computed_at:         now,
        };

        log::info!(
            "analytics: {} accounts, {} zone/provider pairs, {} providers analyzed",
            bundle.usage_analyses.len(),
            bundle.pricing_analyses.len(),
            bundle.commission_analyses.len(),
        );
        Ok((bundle, counts))
    }
}
