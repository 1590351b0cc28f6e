//! Debounced autosave with a pollable save status.
//!
//! [`AutosaveController`] turns a stream of content snapshots from an editor
//! into occasional calls on a [`SaveSink`]. Edits restart a quiet-period
//! timer; when it expires the latest snapshot is saved. Saves never overlap:
//! a save that becomes due while another is outstanding waits for it to
//! settle. A failed save leaves the baseline untouched so the next edit or a
//! forced save persists the content again.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use room404_proto::SaveStatus;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, trace, warn};

use crate::debounce::{DEFAULT_DELAY, Debouncer};
use crate::error::SaveFailed;
use crate::sink::SaveSink;

/// Autosave behaviour for one editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before an automatic save.
    pub debounce: Duration,
    /// When false, edits are ignored and only forced saves persist content.
    pub enabled: bool,
}

impl AutosaveConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DELAY,
            enabled: true,
        }
    }
}

struct EditState {
    /// Content known to be persisted.
    baseline: String,
    /// Latest content reported by the editor.
    pending: String,
    /// Set once the first edit established the baseline.
    primed: bool,
    disposed: bool,
}

struct Shared<S> {
    sink: S,
    /// Mirrors [`AutosaveConfig::enabled`]; no timer is armed when false.
    enabled: bool,
    edits: Mutex<EditState>,
    status: watch::Sender<SaveStatus>,
    /// Held for the whole duration of a save. Tokio's mutex is fair, so
    /// queued saves run in the order they became due.
    gate: AsyncMutex<()>,
    timer: Mutex<Debouncer>,
}

impl<S: SaveSink> Shared<S> {
    fn edits(&self) -> MutexGuard<'_, EditState> {
        self.edits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timer(&self) -> MutexGuard<'_, Debouncer> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: SaveStatus) {
        self.status.send_replace(status);
    }

    /// (Re)start the debounce timer for an automatic save.
    fn schedule_save(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        self.timer().call(move || {
            tokio::spawn(async move {
                shared.save_scheduled().await;
            });
        });
    }

    /// Save whatever content is latest once the gate is free, so edits made
    /// while waiting behind another save are not skipped over.
    async fn save_scheduled(self: &Arc<Self>) {
        let _gate = self.gate.lock().await;
        let (disposed, content) = {
            let edits = self.edits();
            (edits.disposed, edits.pending.clone())
        };
        if disposed {
            trace!("controller disposed, dropping scheduled save");
            return;
        }
        if let Err(err) = self.attempt(content).await {
            warn!(error = %err, "autosave failed");
        }
    }

    async fn save_forced(self: &Arc<Self>, content: String) -> Result<(), SaveFailed> {
        let _gate = self.gate.lock().await;
        let result = self.attempt(content).await;
        if let Err(err) = &result {
            debug!(error = %err, "forced save failed");
        }
        result
    }

    /// Persist `content` unless it is already the baseline. The caller
    /// holds the gate.
    async fn attempt(self: &Arc<Self>, content: String) -> Result<(), SaveFailed> {
        let (unchanged, clean) = {
            let edits = self.edits();
            (edits.baseline == content, edits.pending == edits.baseline)
        };
        if unchanged {
            if clean {
                // edits were reverted to the persisted content
                self.status.send_if_modified(|status| {
                    let stale = *status == SaveStatus::Unsaved;
                    if stale {
                        *status = SaveStatus::Saved;
                    }
                    stale
                });
            }
            return Ok(());
        }

        debug!(bytes = content.len(), "saving document");
        self.set_status(SaveStatus::Saving);
        match self.sink.save(content.clone()).await {
            Ok(()) => {
                let (dirty, disposed) = {
                    let mut edits = self.edits();
                    edits.baseline = content;
                    (edits.pending != edits.baseline, edits.disposed)
                };
                self.set_status(if dirty {
                    SaveStatus::Unsaved
                } else {
                    SaveStatus::Saved
                });
                // An edit made during the save may have matched the old
                // baseline and scheduled nothing; it still needs a save.
                let idle = !self.timer().is_pending();
                if dirty && idle && !disposed && self.enabled {
                    trace!("content changed during save, rescheduling");
                    self.schedule_save();
                }
                Ok(())
            }
            Err(err) => {
                self.set_status(SaveStatus::Error);
                Err(err)
            }
        }
    }
}

/// Autosave state for a single editing session.
///
/// Methods must be called from within a Tokio runtime. Dropping the
/// controller disposes it.
pub struct AutosaveController<S: SaveSink> {
    config: AutosaveConfig,
    shared: Arc<Shared<S>>,
}

impl<S: SaveSink> AutosaveController<S> {
    /// Create a controller whose baseline is `initial_content`.
    ///
    /// The first [`notify_edit`](Self::notify_edit) replaces the baseline
    /// without saving, since editors report their loaded content once on
    /// attach.
    pub fn new(config: AutosaveConfig, initial_content: impl Into<String>, sink: S) -> Self {
        let initial_content = initial_content.into();
        let (status, _) = watch::channel(SaveStatus::Saved);
        Self {
            config,
            shared: Arc::new(Shared {
                sink,
                enabled: config.enabled,
                edits: Mutex::new(EditState {
                    pending: initial_content.clone(),
                    baseline: initial_content,
                    primed: false,
                    disposed: false,
                }),
                status,
                gate: AsyncMutex::new(()),
                timer: Mutex::new(Debouncer::new(config.debounce)),
            }),
        }
    }

    pub fn config(&self) -> AutosaveConfig {
        self.config
    }

    /// Record a new content snapshot from the editor.
    ///
    /// Content that differs from the baseline marks the session unsaved and
    /// (re)starts the debounce timer. Whatever content is latest when the
    /// save actually starts is the content saved.
    pub fn notify_edit(&self, content: impl Into<String>) {
        if !self.config.enabled {
            return;
        }
        let content = content.into();
        {
            let mut edits = self.shared.edits();
            if edits.disposed {
                trace!("edit after dispose ignored");
                return;
            }
            if !edits.primed {
                edits.primed = true;
                edits.baseline = content.clone();
                edits.pending = content;
                trace!("baseline established");
                return;
            }
            let unchanged = content == edits.baseline;
            edits.pending = content;
            if unchanged {
                return;
            }
        }

        self.shared.set_status(SaveStatus::Unsaved);
        self.shared.schedule_save();
    }

    /// Save `content` now, bypassing the debounce window.
    ///
    /// Any scheduled save is cancelled and the save is started before this
    /// returns; awaiting the returned future yields its outcome, which is
    /// also reflected in [`status`](Self::status). If a save is already in
    /// flight the new one waits for it to settle. Works even when automatic
    /// saving is disabled.
    pub fn force_save(
        &self,
        content: impl Into<String>,
    ) -> impl Future<Output = Result<(), SaveFailed>> + Send + 'static {
        let content = content.into();
        self.shared.timer().cancel();
        {
            let mut edits = self.shared.edits();
            edits.primed = true;
            edits.pending = content.clone();
        }
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move { shared.save_forced(content).await });
        async move { task.await.unwrap_or_else(|err| Err(SaveFailed::new(err))) }
    }

    /// Current save status.
    pub fn status(&self) -> SaveStatus {
        *self.shared.status.borrow()
    }

    /// Watch status changes instead of polling.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.shared.status.subscribe()
    }

    /// Content of the most recent successful save.
    pub fn last_saved(&self) -> String {
        self.shared.edits().baseline.clone()
    }

    /// Returns true while an automatic save is scheduled.
    pub fn has_scheduled_save(&self) -> bool {
        self.shared.timer().is_pending()
    }

    /// Cancel any scheduled save and stop reacting to edits. A save that is
    /// already running completes. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.shared.timer().cancel();
        let mut edits = self.shared.edits();
        if !edits.disposed {
            edits.disposed = true;
            debug!("autosave disposed");
        }
    }
}

impl<S: SaveSink> Drop for AutosaveController<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
