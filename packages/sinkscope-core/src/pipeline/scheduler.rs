//! Bounded worker pool over call paths
//!
//! The path enumerator produces; constraint-engine invocations are the
//! unit of work. Two budgets apply: a per-path wall clock enforced inside
//! the engine through `WorkBudget`, and a global budget enforced by a
//! watchdog thread flipping the shared cancel flag. Cancellation is
//! cooperative; a cancelled path returns without touching shared state.
//!
//! Panics never cross the worker boundary: each path runs under
//! `catch_unwind` and failures surface through the caller's recovery
//! closure.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use rayon::prelude::*;
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::features::constraints::infrastructure::engine::WorkBudget;
use crate::features::pathfinder::domain::CallPath;

pub struct PathScheduler {
    workers: usize,
    per_path: Option<Duration>,
    global: Option<Duration>,
    cancel: Arc<AtomicBool>,
}

/// Stops the global watchdog when dropped.
pub struct WatchdogGuard {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for WatchdogGuard {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl PathScheduler {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            per_path: config.per_path_timeout,
            global: config.global_timeout,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fresh per-path budget bound to the shared cancel flag.
    pub fn budget(&self) -> WorkBudget {
        WorkBudget::new(self.per_path, Arc::clone(&self.cancel))
    }

    /// Budget for post-pool work (dependency resolution) that honors the
    /// global cancel but not the per-path clock.
    pub fn follow_up_budget(&self) -> WorkBudget {
        WorkBudget::new(None, Arc::clone(&self.cancel))
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Arm the global-budget watchdog. Hold the guard for the duration of
    /// the run.
    pub fn watchdog(&self) -> WatchdogGuard {
        let Some(global) = self.global else {
            return WatchdogGuard {
                stop: None,
                handle: None,
            };
        };
        let (tx, rx) = mpsc::channel::<()>();
        let cancel = Arc::clone(&self.cancel);
        let handle = std::thread::spawn(move || {
            match rx.recv_timeout(global) {
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    warn!(?global, "global budget exhausted; cancelling in-flight paths");
                    cancel.store(true, std::sync::atomic::Ordering::Relaxed);
                }
                // Sender dropped: the run finished inside its budget.
                _ => {}
            }
        });
        WatchdogGuard {
            stop: Some(tx),
            handle: Some(handle),
        }
    }

    /// Run `work` over every path on the bounded pool. `recover` converts a
    /// worker panic into a result value.
    pub fn run<T, F, R>(&self, paths: &[CallPath], work: F, recover: R) -> AnalysisResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize, &CallPath, &WorkBudget) -> T + Sync,
        R: Fn(usize, &CallPath, String) -> T + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| AnalysisError::Internal(format!("worker pool: {e}")))?;

        let results = pool.install(|| {
            paths
                .par_iter()
                .enumerate()
                .map(|(index, path)| {
                    let budget = self.budget();
                    match catch_unwind(AssertUnwindSafe(|| work(index, path, &budget))) {
                        Ok(value) => value,
                        Err(payload) => recover(index, path, panic_message(payload)),
                    }
                })
                .collect()
        });
        Ok(results)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panic".to_string()
    }
}
