//! Recursive directory watcher: registration and the dispatch loop.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use walkdir::WalkDir;

use crate::backend::{NotifyBackend, WatchBackend};
use crate::config::WatchConfig;
use crate::error::Result;
use crate::event::{ChangeEvent, ChangeKind, WatchListener};
use crate::filter::{should_deliver, should_register};
use crate::handle::{RegistryRequest, WatchHandle};
use crate::registry::{Upsert, WatchRegistry, WatchToken};

/// Pending registry questions from a [`WatchHandle`].
const REQUEST_CAPACITY: usize = 16;

/// Why the dispatch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Cancelled while waiting for readiness.
    Cancelled,

    /// Every watched directory became inaccessible.
    Drained,

    /// The backend stopped producing notifications.
    BackendClosed,
}

/// Watches a directory tree and reports changes to a listener.
pub struct WatchDir<B: WatchBackend = NotifyBackend> {
    /// OS watch primitive.
    backend: B,

    /// Registered directories, owned by the worker once running.
    registry: WatchRegistry,

    /// Canonical root path.
    root: PathBuf,

    /// Whether new subdirectories are picked up.
    recursive: bool,

    /// Log registrations; off during the initial pass.
    trace: bool,
}

impl WatchDir<NotifyBackend> {
    /// Create a watcher on the platform backend and register the tree.
    pub fn new(config: WatchConfig) -> Result<Self> {
        let root = config.resolved_root()?;
        let backend = NotifyBackend::new()?;
        Self::build(root, config.recursive, backend)
    }
}

impl<B: WatchBackend> WatchDir<B> {
    /// Create a watcher on a custom backend and register the tree.
    pub fn with_backend(config: WatchConfig, backend: B) -> Result<Self> {
        let root = config.resolved_root()?;
        Self::build(root, config.recursive, backend)
    }

    fn build(root: PathBuf, recursive: bool, backend: B) -> Result<Self> {
        let mut watch = Self {
            backend,
            registry: WatchRegistry::new(),
            root: root.clone(),
            recursive,
            trace: false,
        };

        if recursive {
            watch.register_all(&root)?;
        } else {
            watch.register(&root)?;
        }

        if watch.registry.is_empty() {
            warn!("Root {} is excluded; nothing to watch", root.display());
        }
        info!(
            "Registered {} directories under {}",
            watch.registry.len(),
            root.display()
        );

        watch.trace = true;
        Ok(watch)
    }

    /// The canonical root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether subdirectories are watched.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Registered directories.
    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    /// Register a single directory unless the exclusion rules reject it.
    pub fn register(&mut self, dir: &Path) -> Result<()> {
        if !should_register(dir) {
            trace!("Skipping excluded directory: {}", dir.display());
            return Ok(());
        }

        let token = self.backend.register(dir)?;
        let outcome = self.registry.upsert(token, dir.to_path_buf());
        if self.trace {
            match outcome {
                Upsert::Inserted => debug!("register: {}", dir.display()),
                Upsert::Replaced(stale) => {
                    debug!("update: {} {stale} -> {token}", dir.display());
                }
                Upsert::Unchanged => {}
            }
        }
        Ok(())
    }

    /// Register `start` and every directory below it.
    ///
    /// Fails only if `start` itself cannot be read or registered; problems
    /// further down are logged and that directory is left unwatched.
    pub fn register_all(&mut self, start: &Path) -> Result<()> {
        for entry in WalkDir::new(start).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {e}", start.display());
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            if let Err(e) = self.register(entry.path()) {
                if entry.depth() == 0 {
                    return Err(e);
                }
                warn!("Failed to register {}: {e}", entry.path().display());
            }
        }

        Ok(())
    }

    /// Run the dispatch loop on the current task until it terminates.
    pub async fn run<L: WatchListener>(
        self,
        listener: L,
        cancel: CancellationToken,
    ) -> Termination {
        self.dispatch(listener, cancel, None).await
    }

    /// Run the dispatch loop on a new tokio task.
    pub fn spawn<L>(self, listener: L) -> WatchHandle
    where
        L: WatchListener + 'static,
        B: 'static,
    {
        let cancel = CancellationToken::new();
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CAPACITY);
        let join = tokio::spawn(self.dispatch(listener, cancel.clone(), Some(request_rx)));
        WatchHandle::new(cancel, request_tx, join)
    }

    async fn dispatch<L: WatchListener>(
        mut self,
        mut listener: L,
        cancel: CancellationToken,
        mut requests: Option<mpsc::Receiver<RegistryRequest>>,
    ) -> Termination {
        info!("Watching {}", self.root.display());

        loop {
            let wake = tokio::select! {
                biased;
                () = cancel.cancelled() => Wake::Cancelled,
                request = next_request(&mut requests) => Wake::Request(request),
                token = self.backend.next_ready() => Wake::Ready(token),
            };

            match wake {
                Wake::Cancelled => {
                    info!("Stopped watching {}", self.root.display());
                    return Termination::Cancelled;
                }
                Wake::Request(Some(request)) => self.answer(request),
                // Handle dropped; keep watching without introspection.
                Wake::Request(None) => requests = None,
                Wake::Ready(None) => {
                    warn!("Watch backend closed for {}", self.root.display());
                    return Termination::BackendClosed;
                }
                Wake::Ready(Some(token)) => {
                    if self.process(token, &mut listener) {
                        info!(
                            "All watched directories under {} are gone",
                            self.root.display()
                        );
                        return Termination::Drained;
                    }
                }
            }
        }
    }

    fn answer(&self, request: RegistryRequest) {
        match request {
            RegistryRequest::WatchedDirs(reply) => {
                let _ = reply.send(self.registry.dirs());
            }
        }
    }

    /// Handle one ready token. Returns true once the registry is empty.
    fn process<L: WatchListener>(&mut self, token: WatchToken, listener: &mut L) -> bool {
        let Some(dir) = self.registry.get(token).map(Path::to_path_buf) else {
            let dropped = self.backend.poll_notifications(token).len();
            error!("Watch token {token} not recognized; dropped {dropped} notifications");
            return false;
        };

        for notification in self.backend.poll_notifications(token) {
            let Some(kind) = notification.kind.change_kind() else {
                debug!("Overflow in {}; notifications were lost", dir.display());
                continue;
            };
            let Some(name) = notification.name else {
                warn!("{kind} notification in {} ({token}) has no name", dir.display());
                continue;
            };

            let child = dir.join(name);
            if should_deliver(&child) {
                listener.on_watch_event(&ChangeEvent::new(kind, child.clone()));
            }

            if self.recursive && kind == ChangeKind::Created && is_real_dir(&child) {
                if let Err(e) = self.register_all(&child) {
                    warn!("Failed to watch new directory {}: {e}", child.display());
                }
            }
        }

        if !self.backend.reset(token) {
            self.registry.remove(token);
            debug!("No longer accessible: {} ({token})", dir.display());
            return self.registry.is_empty();
        }
        false
    }
}

enum Wake {
    Cancelled,
    Request(Option<RegistryRequest>),
    Ready(Option<WatchToken>),
}

async fn next_request(
    requests: &mut Option<mpsc::Receiver<RegistryRequest>>,
) -> Option<RegistryRequest> {
    match requests {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Directory check that does not follow symlinks.
fn is_real_dir(path: &Path) -> bool {
    path.symlink_metadata()
        .is_ok_and(|meta| meta.file_type().is_dir())
}
