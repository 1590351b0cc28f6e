use std::path::PathBuf;
use std::time::Duration;

use room404_core::{
    AutosaveConfig, AutosaveController, DocumentStore, SaveFailed, SaveSink, SaveStatus,
    StoreError,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

/// How often the session samples the controller's status.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Commands that can be sent to the session actor.
pub enum SessionCmd {
    /// The editor produced a new content snapshot.
    Edit { content: String },
    /// Save the current content now and report the outcome.
    Save {
        reply: oneshot::Sender<Result<(), SaveFailed>>,
    },
    /// Stop the session, cancelling any scheduled save.
    Close,
}

/// Handle for interacting with a running session.
pub struct SessionHandle {
    pub cmd: mpsc::Sender<SessionCmd>,
    /// Status changes observed by polling, ending when the session stops.
    pub statuses: mpsc::Receiver<SaveStatus>,
}

impl SessionHandle {
    /// Forward an edit to the session. Edits sent after the session has
    /// stopped are dropped.
    pub async fn edit(&self, content: impl Into<String>) {
        let cmd = SessionCmd::Edit {
            content: content.into(),
        };
        if self.cmd.send(cmd).await.is_err() {
            debug!("session closed, edit dropped");
        }
    }

    /// Force a save of the current content and wait for the outcome.
    pub async fn save(&self) -> Result<(), SaveFailed> {
        let (reply, outcome) = oneshot::channel();
        self.cmd
            .send(SessionCmd::Save { reply })
            .await
            .map_err(|_| SaveFailed::new("session closed"))?;
        outcome
            .await
            .map_err(|_| SaveFailed::new("session closed"))?
    }

    /// Ask the session to stop. Remaining statuses can still be drained.
    pub async fn close(&self) {
        if self.cmd.send(SessionCmd::Close).await.is_err() {
            debug!("session already closed");
        }
    }

    /// Receive the next published status.
    pub async fn next_status(&mut self) -> Option<SaveStatus> {
        self.statuses.recv().await
    }
}

struct Session<S: SaveSink> {
    controller: AutosaveController<S>,
    content: String,
    reported: SaveStatus,
    poll: Duration,
}

impl<S: SaveSink> Session<S> {
    /// Spawn a session actor driving `controller`, starting from `content`.
    fn spawn(controller: AutosaveController<S>, content: String, poll: Duration) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (status_tx, status_rx) = mpsc::channel(32);
        // Loaded content is the baseline, not an edit.
        controller.notify_edit(content.clone());
        let session = Session {
            reported: controller.status(),
            controller,
            content,
            poll,
        };
        tokio::spawn(async move {
            session.run(cmd_rx, status_tx).await;
        });
        SessionHandle {
            cmd: cmd_tx,
            statuses: status_rx,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<SessionCmd>, tx: mpsc::Sender<SaveStatus>) {
        let mut ticker = interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(SessionCmd::Edit { content }) => {
                        self.controller.notify_edit(content.clone());
                        self.content = content;
                    }
                    Some(SessionCmd::Save { reply }) => {
                        let outcome = self.controller.force_save(self.content.clone());
                        tokio::spawn(async move {
                            let _ = reply.send(outcome.await);
                        });
                    }
                    Some(SessionCmd::Close) | None => break,
                },
                _ = ticker.tick() => self.publish_status(&tx).await,
            }
        }
        self.controller.dispose();
        self.publish_status(&tx).await;
        debug!("session closed");
    }

    async fn publish_status(&mut self, tx: &mpsc::Sender<SaveStatus>) {
        let status = self.controller.status();
        if status != self.reported {
            self.reported = status;
            let _ = tx.send(status).await;
        }
    }
}

/// Spawn a session over any save sink.
pub fn spawn<S: SaveSink>(
    config: AutosaveConfig,
    content: impl Into<String>,
    sink: S,
    poll: Duration,
) -> SessionHandle {
    let content = content.into();
    let controller = AutosaveController::new(config, content.clone(), sink);
    Session::spawn(controller, content, poll)
}

/// Open the document at `path` and spawn a session saving into it.
pub fn open(
    path: impl Into<PathBuf>,
    config: AutosaveConfig,
    poll: Duration,
) -> Result<(SessionHandle, DocumentStore), StoreError> {
    let store = DocumentStore::open(path)?;
    let content = store.record().content;
    let handle = spawn(config, content, store.clone(), poll);
    Ok((handle, store))
}
