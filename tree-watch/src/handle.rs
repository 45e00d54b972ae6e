//! Caller side of a spawned dispatch loop.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, WatcherError};
use crate::watcher::Termination;

/// Questions the worker answers between readiness waits.
#[derive(Debug)]
pub(crate) enum RegistryRequest {
    /// Every directory currently registered.
    WatchedDirs(oneshot::Sender<Vec<PathBuf>>),
}

/// Handle to a dispatch loop running on a tokio task.
///
/// Dropping the handle detaches the loop; call [`WatchHandle::cancel`] to
/// stop it.
#[derive(Debug)]
pub struct WatchHandle {
    cancel: CancellationToken,
    requests: mpsc::Sender<RegistryRequest>,
    join: JoinHandle<Termination>,
}

impl WatchHandle {
    pub(crate) fn new(
        cancel: CancellationToken,
        requests: mpsc::Sender<RegistryRequest>,
        join: JoinHandle<Termination>,
    ) -> Self {
        Self {
            cancel,
            requests,
            join,
        }
    }

    /// Ask the loop to stop at its next wait.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that stops the loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Directories registered right now, sorted.
    ///
    /// Returns `None` once the loop has exited.
    pub async fn watched_dirs(&self) -> Option<Vec<PathBuf>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(RegistryRequest::WatchedDirs(reply_tx))
            .await
            .ok()?;
        reply_rx.await.ok()
    }

    /// Check if the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the loop to exit on its own.
    pub async fn join(self) -> Result<Termination> {
        self.join
            .await
            .map_err(|e| WatcherError::Worker(e.to_string()))
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn shutdown(self) -> Result<Termination> {
        self.cancel();
        self.join().await
    }
}
