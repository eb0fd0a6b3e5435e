//! Energy-reselling analytics: per-account usage, per-zone pricing,
//! per-provider commissions and market rollups, computed in one refresh
//! and served from an atomically published cache.

pub mod anomaly;
pub mod bundle;
pub mod cache;
pub mod clock;
pub mod commission_analysis;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod market_intelligence;
pub mod optimize;
pub mod pricing_analysis;
pub mod query;
pub mod refresher;
pub mod service;
pub mod source;
pub mod stats;
pub mod store;
pub mod types;
pub mod usage_analysis;

pub use bundle::ResultBundle;
pub use cache::ResultCache;
pub use error::{AnalyticsError, AnalyticsResult};
pub use service::AnalyticsService;
