//! Result cache: the only shared mutable state in the pipeline.
//!
//! States: EMPTY -> READY -> READY -> ...
//!   - A successful refresh publishes a new bundle with one pointer swap.
//!   - A failed refresh leaves the previous state untouched.
//!
//! RULES:
//!   - Readers never wait on a refresh. They clone the current Arc and go.
//!   - At most one refresh runs at a time (refresh_lock).
//!   - The cache defines staleness; callers choose what to do about it.

use crate::{
    bundle::ResultBundle,
    clock::Clock,
    engine::{AnalyticsEngine, InputCounts},
    error::{AnalyticsError, AnalyticsResult},
    source::RecordSource,
    store::RecordStore,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use std::time::{Duration, Instant};

/// A published bundle plus facts about the refresh that produced it.
#[derive(Debug)]
struct Published {
    bundle:           Arc<ResultBundle>,
    refresh_duration: Duration,
    input_counts:     InputCounts,
}

/// What a reader gets back from `get()`.
#[derive(Debug, Clone)]
pub struct CachedBundle {
    pub bundle:           Arc<ResultBundle>,
    pub age:              Duration,
    pub stale:            bool,
    pub refresh_duration: Duration,
    pub input_counts:     InputCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new bundle computed at this instant is now published.
    Published(DateTime<Utc>),
    /// Another refresh was already running; its result will be published.
    Coalesced,
}

pub struct ResultCache {
    current:      RwLock<Option<Arc<Published>>>,
    refresh_lock: Mutex<()>,
    ttl:          Duration,
    clock:        Arc<dyn Clock>,
    snapshots:    Option<Arc<RecordStore>>,
}

impl ResultCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            ttl,
            clock,
            snapshots: None,
        }
    }

    /// Persist every published bundle to `store` and allow `restore()`.
    pub fn with_snapshots(mut self, store: Arc<RecordStore>) -> Self {
        self.snapshots = Some(store);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn load(&self) -> Option<Arc<Published>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn publish(&self, published: Published) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(published));
    }

    /// The current bundle and its age. Fails with NotComputed while EMPTY.
    pub fn get(&self) -> AnalyticsResult<CachedBundle> {
        let published = self.load().ok_or(AnalyticsError::NotComputed)?;
        let age = published.bundle.age_at(self.clock.now());
        Ok(CachedBundle {
            bundle:           Arc::clone(&published.bundle),
            age,
            stale:            age > self.ttl,
            refresh_duration: published.refresh_duration,
            input_counts:     published.input_counts,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.load().is_none()
    }

    /// `None` while EMPTY, otherwise whether the bundle has outlived the TTL.
    pub fn is_stale(&self) -> Option<bool> {
        self.get().ok().map(|cached| cached.stale)
    }

    /// Refresh now, waiting for any in-flight refresh to finish first.
    pub fn refresh(&self, source: &dyn RecordSource) -> AnalyticsResult<Arc<ResultBundle>> {
        let _guard = self.refresh_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.run_refresh(source)
    }

    /// Refresh unless one is already running, in which case do nothing.
    pub fn try_refresh(&self, source: &dyn RecordSource) -> AnalyticsResult<RefreshOutcome> {
        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                log::debug!("analytics: refresh already in flight, coalescing");
                return Ok(RefreshOutcome::Coalesced);
            }
        };
        let bundle = self.run_refresh(source)?;
        Ok(RefreshOutcome::Published(bundle.computed_at))
    }

    fn run_refresh(&self, source: &dyn RecordSource) -> AnalyticsResult<Arc<ResultBundle>> {
        log::info!("analytics: refresh started");
        let started = Instant::now();

        let (bundle, input_counts) = match AnalyticsEngine::compute(source, self.clock.as_ref()) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("analytics: refresh failed, keeping previous results: {e}");
                return Err(e);
            }
        };
        let bundle = Arc::new(bundle);
        let refresh_duration = started.elapsed();

        self.publish(Published {
            bundle: Arc::clone(&bundle),
            refresh_duration,
            input_counts,
        });
        log::info!(
            "analytics: refresh published at {} in {:.3}s",
            bundle.computed_at,
            refresh_duration.as_secs_f64()
        );

        self.save_snapshot(&bundle);
        Ok(bundle)
    }

    fn save_snapshot(&self, bundle: &ResultBundle) {
        let Some(store) = &self.snapshots else {
            return;
        };
        let saved = bundle
            .to_json()
            .and_then(|json| store.save_snapshot(bundle.computed_at, &json));
        if let Err(e) = saved {
            log::warn!("analytics: snapshot not saved: {e}");
        }
    }

    /// Load the last persisted bundle if nothing is published yet.
    /// Returns true if a snapshot was installed.
    pub fn restore(&self) -> AnalyticsResult<bool> {
        let Some(store) = &self.snapshots else {
            return Ok(false);
        };
        if !self.is_empty() {
            return Ok(false);
        }
        let Some(json) = store.latest_snapshot()? else {
            return Ok(false);
        };
        let bundle = ResultBundle::from_json(&json)?;
        let input_counts = InputCounts {
            usage: bundle.market_intelligence.market_overview.distinct_service_point_count,
            ..InputCounts::default()
        };
        log::info!("analytics: restored snapshot computed at {}", bundle.computed_at);

        let _guard = self.refresh_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_empty() {
            self.publish(Published {
                bundle: Arc::new(bundle),
                refresh_duration: Duration::ZERO,
                input_counts,
            });
            return Ok(true);
        }
        Ok(false)
    }
}
