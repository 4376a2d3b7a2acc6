//! Detached background tasks.
//!
//! Tasks run on their own threads; the export pipeline never waits on them
//! for correctness. Outcomes land in a shared [`StatusSink`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;

use crate::util::Result;

/// Keys of once-per-process tasks already started.
static STARTED: Mutex<BTreeSet<String>> = parking_lot::const_mutex(BTreeSet::new());

/// Outcome of one finished task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskStatus {
    pub key: String,
    /// `None` on success, the error message otherwise.
    pub error: Option<String>,
    pub millis: u128,
}

/// Collected task outcomes.
#[derive(Debug, Default)]
pub struct StatusSink {
    entries: Mutex<Vec<TaskStatus>>,
}

impl StatusSink {
    pub fn record(&self, status: TaskStatus) {
        match &status.error {
            Some(e) => tracing::warn!("background task {} failed: {e}", status.key),
            None => tracing::debug!("background task {} done in {}ms", status.key, status.millis),
        }
        self.entries.lock().push(status);
    }

    pub fn snapshot(&self) -> Vec<TaskStatus> {
        self.entries.lock().clone()
    }

    pub fn failures(&self) -> Vec<TaskStatus> {
        self.entries
            .lock()
            .iter()
            .filter(|s| s.error.is_some())
            .cloned()
            .collect()
    }
}

/// Handle to spawned background tasks.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    status: Arc<StatusSink>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &Arc<StatusSink> {
        &self.status
    }

    /// Run `task` on a new thread.
    pub fn spawn<F>(&self, key: &str, task: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let key = key.to_string();
        let sink = Arc::clone(&self.status);
        let spawned = thread::Builder::new()
            .name(format!("sceneweave-{key}"))
            .spawn(move || {
                let start = Instant::now();
                let error = task().err().map(|e| e.to_string());
                sink.record(TaskStatus {
                    key,
                    error,
                    millis: start.elapsed().as_millis(),
                });
            });
        match spawned {
            Ok(handle) => self.handles.lock().push(handle),
            Err(e) => tracing::warn!("could not start background task: {e}"),
        }
    }

    /// Like [`Self::spawn`], but at most once per process for `key`.
    /// Returns whether the task was started.
    pub fn spawn_once<F>(&self, key: &str, task: F) -> bool
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        if !STARTED.lock().insert(key.to_string()) {
            return false;
        }
        self.spawn(key, task);
        true
    }

    /// Block until every task spawned through this handle has finished.
    pub fn join_all(&self) {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for h in handles {
            let _ = h.join();
        }
    }
}
