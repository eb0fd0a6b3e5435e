//! Background refresh worker: fire-and-forget triggers, coalescing, failure counting.

use kilowatt_core::{
    cache::ResultCache,
    clock::FixedClock,
    demo::DemoDataset,
    error::AnalyticsResult,
    refresher::RefreshWorker,
    source::{MemorySource, RecordSource, Table},
    types::{CommissionRecord, PricingRecord, UsageRecord},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

#[test]
fn trigger_publishes_without_blocking_caller() {
    let _ = env_logger::builder().is_test(true).try_init();
    let cache = Arc::new(ResultCache::new(
        Duration::from_secs(3600),
        Arc::new(FixedClock::at_month(2024, 3)),
    ));
    let source: Arc<dyn RecordSource> = Arc::new(DemoDataset::generate(5).into_source());
    let worker = RefreshWorker::spawn(Arc::clone(&cache), source);

    assert!(worker.trigger());
    assert!(worker.wait_for_attempts(1, WAIT), "worker never finished a refresh");
    assert_eq!(worker.stats().completed, 1);
    assert!(!cache.is_empty());
}

/// Holds the first usage read until the test releases it. Later reads pass.
struct FirstReadGate {
    inner:   MemorySource,
    armed:   AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl RecordSource for FirstReadGate {
    fn read_usage(&self) -> AnalyticsResult<Vec<UsageRecord>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
        self.inner.read_usage()
    }

    fn read_pricing(&self) -> AnalyticsResult<Vec<PricingRecord>> {
        self.inner.read_pricing()
    }

    fn read_commissions(&self) -> AnalyticsResult<Vec<CommissionRecord>> {
        self.inner.read_commissions()
    }
}

#[test]
fn burst_of_triggers_is_coalesced() {
    let cache = Arc::new(ResultCache::new(
        Duration::from_secs(3600),
        Arc::new(FixedClock::at_month(2024, 3)),
    ));
    let gate = Arc::new(FirstReadGate {
        inner:   DemoDataset::generate(6).into_source(),
        armed:   AtomicBool::new(true),
        entered: Barrier::new(2),
        release: Barrier::new(2),
    });
    let source: Arc<dyn RecordSource> = gate.clone();
    let worker = RefreshWorker::spawn(Arc::clone(&cache), source);

    assert!(worker.trigger());
    gate.entered.wait();
    // The first refresh is in flight; everything below queues behind it.
    for _ in 0..19 {
        assert!(worker.trigger());
    }
    gate.release.wait();

    assert!(worker.wait_for_attempts(2, WAIT));
    // Nothing else was queued, so no third refresh may start.
    std::thread::sleep(Duration::from_millis(200));
    let stats = worker.stats();
    assert_eq!(stats.attempts(), 2, "{stats:?}");
    assert_eq!(stats.failed, 0);
    assert!(!cache.is_empty());
}

#[test]
fn failed_refresh_is_counted_and_cache_stays_empty() {
    let cache = Arc::new(ResultCache::new(
        Duration::from_secs(3600),
        Arc::new(FixedClock::at_month(2024, 3)),
    ));
    let source: Arc<dyn RecordSource> =
        Arc::new(MemorySource::default().failing_on(Table::Commissions));
    let worker = RefreshWorker::spawn(Arc::clone(&cache), source);

    assert!(worker.trigger());
    assert!(worker.wait_for_attempts(1, WAIT));
    assert_eq!(worker.stats().failed, 1);
    assert!(cache.is_empty());
}
