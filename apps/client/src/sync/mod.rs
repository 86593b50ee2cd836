//! Keeps a client-side view of the server's file listing.
//!
//! The listing is the only source of truth: every refresh replaces the
//! records wholesale, and deletions are reconciled by refetching rather than
//! by removing entries locally. Refreshes are serialized through an async
//! gate, so the last refresh issued is the last one applied.

pub mod listing;
pub mod schedule;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api_client::{FileApi, FileRecord};
use crate::download::Downloads;
use crate::errors::Result;
use crate::notify::{Notification, Notifier};

use schedule::{spawn_interval, IntervalHandle, NextTick, RetryPolicy};

pub const NEW_FILES_MESSAGE: &str = "New files detected! List has been updated.";

#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    /// How long the new-arrival flag stays raised.
    pub arrival_window: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            arrival_window: Duration::from_secs(5),
        }
    }
}

/// Point-in-time view of the synchronizer's bookkeeping.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncState {
    pub current_records: Vec<FileRecord>,
    pub previous_count: usize,
    pub is_refreshing: bool,
    pub new_arrival_flag: bool,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<FileRecord>,
    previous_count: usize,
    is_refreshing: bool,
    arrival_until: Option<Instant>,
    detached: bool,
}

impl Inner {
    fn arrival_flag(&self) -> bool {
        self.arrival_until
            .map(|until| Instant::now() < until)
            .unwrap_or(false)
    }
}

/// Per-item result of a batch delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub name: String,
    pub error: Option<String>,
}

pub struct FileSynchronizer {
    api: Arc<dyn FileApi>,
    notifier: Arc<dyn Notifier>,
    downloads: Downloads,
    settings: SyncSettings,
    retry_policy: Arc<dyn RetryPolicy>,
    state: Mutex<Inner>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl FileSynchronizer {
    pub fn new(
        api: Arc<dyn FileApi>,
        notifier: Arc<dyn Notifier>,
        downloads: Downloads,
        settings: SyncSettings,
    ) -> Self {
        Self {
            api,
            notifier,
            downloads,
            settings,
            retry_policy: Arc::new(NextTick),
            state: Mutex::new(Inner::default()),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces the default "retry on the next tick" behavior.
    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = policy;
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SyncState {
        let state = self.lock_state();
        SyncState {
            current_records: state.records.clone(),
            previous_count: state.previous_count,
            is_refreshing: state.is_refreshing,
            new_arrival_flag: state.arrival_flag(),
        }
    }

    pub fn records(&self) -> Vec<FileRecord> {
        self.lock_state().records.clone()
    }

    /// Fetches the listing once and applies it. A failure is reported once
    /// and leaves the current view untouched; there is no retry here.
    pub async fn fetch_files(&self) -> Result<usize> {
        let _gate = self.refresh_gate.lock().await;
        self.lock_state().is_refreshing = true;

        let result = self.api.list_files().await;

        let mut state = self.lock_state();
        state.is_refreshing = false;

        if state.detached {
            debug!("Discarding listing response after unmount");
            return result.map(|files| files.len());
        }

        match result {
            Ok(files) => {
                let count = files.len();
                let arrived = state.previous_count > 0 && count > state.previous_count;
                // a raised flag keeps its original deadline
                if arrived && !state.arrival_flag() {
                    state.arrival_until = Some(Instant::now() + self.settings.arrival_window);
                }
                state.records = files;
                state.previous_count = count;
                drop(state);

                debug!("Listing refreshed: {count} file(s)");
                if arrived {
                    info!("New files detected ({count} total)");
                    self.notifier.notify(Notification::info(NEW_FILES_MESSAGE));
                }
                Ok(count)
            }
            Err(e) => {
                drop(state);
                warn!("Failed to fetch files: {e}");
                self.notifier.notify(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Downloads one file into the download directory. The listing is not touched.
    pub async fn download_file(&self, name: &str) -> Result<PathBuf> {
        let result = match self.api.download_file(name).await {
            Ok(file) => self.downloads.save(&file).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(path) => {
                debug!("Downloaded {name} to {}", path.display());
                self.notifier.notify(Notification::success(format!(
                    "File \"{name}\" downloaded successfully"
                )));
            }
            Err(e) => {
                warn!("Failed to download {name}: {e}");
                self.notifier.notify(Notification::error(e.user_message()));
            }
        }

        result
    }

    /// Deletes one file, then refetches the listing to reconcile.
    pub async fn delete_file(&self, name: &str) -> Result<()> {
        if let Err(e) = self.api.delete_file(name).await {
            warn!("Failed to delete {name}: {e}");
            self.notifier.notify(Notification::error(e.user_message()));
            return Err(e);
        }

        info!("Deleted {name}");
        self.notifier.notify(Notification::success(format!(
            "File \"{name}\" deleted successfully"
        )));

        // refresh failures are reported by fetch_files itself
        let _ = self.fetch_files().await;
        Ok(())
    }

    /// Attempts every deletion independently, reports once, then refetches once.
    pub async fn delete_many(&self, names: &[String]) -> Vec<DeleteOutcome> {
        if names.is_empty() {
            self.notifier
                .notify(Notification::error("No files selected for deletion"));
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            let error = match self.api.delete_file(name).await {
                Ok(_) => None,
                Err(e) => {
                    warn!("Failed to delete {name}: {e}");
                    Some(e.user_message())
                }
            };
            outcomes.push(DeleteOutcome {
                name: name.clone(),
                error,
            });
        }

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.error.is_some())
            .map(|o| o.name.as_str())
            .collect();
        let deleted = outcomes.len() - failed.len();

        if failed.is_empty() {
            self.notifier
                .notify(Notification::success(format!("Deleted {deleted} file(s)")));
        } else {
            self.notifier.notify(Notification::error(format!(
                "Deleted {deleted} of {} file(s); failed: {}",
                outcomes.len(),
                failed.join(", ")
            )));
        }

        let _ = self.fetch_files().await;
        outcomes
    }

    /// Starts polling: one fetch now, then one per interval until the
    /// returned guard is unmounted or dropped.
    pub fn mount(self: &Arc<Self>) -> Mounted {
        self.lock_state().detached = false;

        let sync = Arc::clone(self);
        let handle = spawn_interval(
            self.settings.poll_interval,
            Arc::clone(&self.retry_policy),
            move || {
                let sync = Arc::clone(&sync);
                async move { sync.fetch_files().await.is_ok() }
            },
        );

        info!(
            "File synchronizer mounted (every {}s)",
            self.settings.poll_interval.as_secs()
        );

        Mounted {
            sync: Arc::clone(self),
            handle,
        }
    }

    fn detach(&self) {
        self.lock_state().detached = true;
    }
}

/// A mounted synchronizer. Unmounting stops the timer and makes any
/// response still in flight a no-op.
pub struct Mounted {
    sync: Arc<FileSynchronizer>,
    handle: IntervalHandle,
}

impl Mounted {
    pub fn synchronizer(&self) -> &Arc<FileSynchronizer> {
        &self.sync
    }

    pub fn unmount(self) {
        self.sync.detach();
        self.handle.cancel();
        info!("File synchronizer unmounted");
    }
}

impl Drop for Mounted {
    fn drop(&mut self) {
        self.sync.detach();
        self.handle.cancel();
    }
}
