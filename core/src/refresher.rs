//! Background refresh worker.
//!
//! A dedicated thread owns the refresh loop. Callers send a message and
//! return immediately; they never wait on the computation.
//!
//! Triggers that pile up while a refresh runs are drained and served by
//! a single follow-up refresh.

use crate::{cache::ResultCache, source::RecordSource};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug)]
enum RefreshMessage {
    Refresh,
    Shutdown,
}

/// Counters the worker bumps after each attempt.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub completed: u64,
    pub failed:    u64,
}

impl RefreshStats {
    pub fn attempts(&self) -> u64 {
        self.completed + self.failed
    }
}

#[derive(Default)]
struct Progress {
    stats: Mutex<RefreshStats>,
    bumped: Condvar,
}

pub struct RefreshWorker {
    sender:   Sender<RefreshMessage>,
    handle:   Option<JoinHandle<()>>,
    progress: Arc<Progress>,
}

impl RefreshWorker {
    pub fn spawn(cache: Arc<ResultCache>, source: Arc<dyn RecordSource>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let progress = Arc::new(Progress::default());
        let worker_progress = Arc::clone(&progress);

        let handle = std::thread::Builder::new()
            .name("analytics-refresh".into())
            .spawn(move || run_loop(receiver, cache, source, worker_progress))
            .map_err(|e| log::error!("analytics: cannot start refresh worker: {e}"))
            .ok();

        Self { sender, handle, progress }
    }

    /// Request a refresh. Returns false if the worker is gone.
    pub fn trigger(&self) -> bool {
        if self.handle.is_none() {
            return false;
        }
        self.sender.send(RefreshMessage::Refresh).is_ok()
    }

    pub fn stats(&self) -> RefreshStats {
        *self.progress.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until at least `attempts` refreshes have finished (either way)
    /// or `timeout` elapses. Returns whether the target was reached.
    pub fn wait_for_attempts(&self, attempts: u64, timeout: Duration) -> bool {
        let guard = self.progress.stats.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .progress
            .bumped
            .wait_timeout_while(guard, timeout, |stats| stats.attempts() < attempts)
            .unwrap_or_else(|e| e.into_inner());
        guard.attempts() >= attempts
    }
}

impl Drop for RefreshWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(RefreshMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("analytics: refresh worker panicked");
            }
        }
    }
}

fn run_loop(
    receiver: Receiver<RefreshMessage>,
    cache: Arc<ResultCache>,
    source: Arc<dyn RecordSource>,
    progress: Arc<Progress>,
) {
    while let Ok(message) = receiver.recv() {
        if let RefreshMessage::Shutdown = message {
            break;
        }

        // Coalesce everything already queued into this one refresh.
        let mut shutdown = false;
        let mut coalesced = 0usize;
        loop {
            match receiver.try_recv() {
                Ok(RefreshMessage::Refresh) => coalesced += 1,
                Ok(RefreshMessage::Shutdown) | Err(TryRecvError::Disconnected) => {
                    shutdown = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        if coalesced > 0 {
            log::debug!("analytics: coalesced {coalesced} queued refresh triggers");
        }

        let result = cache.refresh(source.as_ref());
        {
            let mut stats = progress.stats.lock().unwrap_or_else(|e| e.into_inner());
            match result {
                Ok(_) => stats.completed += 1,
                Err(_) => stats.failed += 1,
            }
        }
        progress.bumped.notify_all();

        if shutdown {
            break;
        }
    }
    log::debug!("analytics: refresh worker stopped");
}
