//! OS watch primitive behind a trait, and its `notify` implementation.
//!
//! A backend hands out one [`WatchToken`] per registered directory and
//! multiplexes every directory into a single readiness queue. The dispatch
//! loop takes a ready token, drains its notifications, then resets it.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::event::{RawKind, RawNotification};
use crate::registry::WatchToken;

/// Notify results buffered for the worker before they are dropped as overflow.
const EVENT_CHANNEL_CAPACITY: usize = 1000;

type NotifyResult = notify::Result<notify::Event>;

/// A per-directory watch primitive.
#[async_trait]
pub trait WatchBackend: Send {
    /// Start watching `dir` (not its subdirectories).
    ///
    /// Registering the same directory again returns the same token.
    fn register(&mut self, dir: &Path) -> Result<WatchToken>;

    /// Wait for a token with pending notifications.
    ///
    /// Returns `None` once the backend can no longer produce notifications.
    async fn next_ready(&mut self) -> Option<WatchToken>;

    /// Take the pending notifications for `token`, in delivery order.
    fn poll_notifications(&mut self, token: WatchToken) -> Vec<RawNotification>;

    /// Re-arm `token`. Returns false if its directory is gone, in which case
    /// the backend has dropped the watch.
    fn reset(&mut self, token: WatchToken) -> bool;
}

/// Backend built on the platform's recommended `notify` watcher.
pub struct NotifyBackend {
    /// Internal notify watcher.
    watcher: RecommendedWatcher,

    /// Raw results forwarded from the notify callback.
    event_rx: mpsc::Receiver<NotifyResult>,

    /// Set by the callback when a result was dropped on a full channel.
    overflowed: Arc<AtomicBool>,

    dirs: HashMap<WatchToken, PathBuf>,
    tokens: HashMap<PathBuf, WatchToken>,

    /// Notifications not yet polled, per token.
    pending: HashMap<WatchToken, Vec<RawNotification>>,

    /// Signalled tokens; each appears at most once.
    ready: VecDeque<WatchToken>,

    next_id: u64,
}

impl NotifyBackend {
    /// Create a new backend.
    pub fn new() -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let overflowed = Arc::new(AtomicBool::new(false));

        let callback_overflowed = overflowed.clone();
        let watcher = notify::recommended_watcher(move |res: NotifyResult| {
            forward(&event_tx, &callback_overflowed, res);
        })?;

        Ok(Self {
            watcher,
            event_rx,
            overflowed,
            dirs: HashMap::new(),
            tokens: HashMap::new(),
            pending: HashMap::new(),
            ready: VecDeque::new(),
            next_id: 0,
        })
    }

    /// Number of directories currently watched.
    pub fn watch_count(&self) -> usize {
        self.dirs.len()
    }

    fn route(&mut self, res: notify::Result<notify::Event>) {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!("Watch error: {e}");
                return;
            }
        };

        if event.need_rescan() {
            self.route_overflow(&event.paths);
            return;
        }

        match event.kind {
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                for path in &event.paths {
                    self.notify_parent(path, RawKind::Created);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let Some(from) = event.paths.first() {
                    self.signal_dir(from);
                }
                if let Some(to) = event.paths.get(1) {
                    self.notify_parent(to, RawKind::Created);
                }
            }
            EventKind::Modify(ModifyKind::Name(_)) | EventKind::Remove(_) => {
                // No event kind for removals or renames away; wake the
                // directory itself so its reset notices it is gone.
                for path in &event.paths {
                    self.signal_dir(path);
                }
            }
            EventKind::Modify(_) => {
                for path in &event.paths {
                    self.notify_parent(path, RawKind::Modified);
                }
            }
            kind => trace!("Ignoring event {kind:?} for {:?}", event.paths),
        }
    }

    fn route_overflow(&mut self, paths: &[PathBuf]) {
        let mut targets: Vec<WatchToken> = paths
            .iter()
            .filter_map(|path| path.parent())
            .filter_map(|parent| self.tokens.get(parent).copied())
            .collect();
        if targets.is_empty() {
            targets = self.dirs.keys().copied().collect();
        }

        debug!("Overflow reported for {} watched directories", targets.len());
        for token in targets {
            self.push(token, RawNotification::overflow());
        }
    }

    fn notify_parent(&mut self, path: &Path, kind: RawKind) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        let Some(token) = self.tokens.get(parent).copied() else {
            trace!("No watch covers {}", path.display());
            return;
        };

        self.push(
            token,
            RawNotification {
                kind,
                name: Some(name.to_os_string()),
            },
        );
    }

    fn signal_dir(&mut self, dir: &Path) {
        if let Some(token) = self.tokens.get(dir).copied() {
            self.signal(token);
        }
    }

    /// Queue a notification. A modification repeating the last pending one
    /// for the same entry is folded into it until the token is polled.
    fn push(&mut self, token: WatchToken, notification: RawNotification) {
        let pending = self.pending.entry(token).or_default();
        let repeated = notification.kind == RawKind::Modified
            && pending.last() == Some(&notification);
        if !repeated {
            pending.push(notification);
        }
        self.signal(token);
    }

    fn take_overflow(&mut self) {
        if self.overflowed.swap(false, Ordering::AcqRel) {
            warn!("Watch event channel was full; notifications were lost");
            self.route_overflow(&[]);
        }
    }

    fn signal(&mut self, token: WatchToken) {
        if !self.ready.contains(&token) {
            self.ready.push_back(token);
        }
    }
}

#[async_trait]
impl WatchBackend for NotifyBackend {
    fn register(&mut self, dir: &Path) -> Result<WatchToken> {
        self.watcher.watch(dir, RecursiveMode::NonRecursive)?;

        if let Some(token) = self.tokens.get(dir) {
            return Ok(*token);
        }

        let token = WatchToken::new(self.next_id);
        self.next_id += 1;
        self.dirs.insert(token, dir.to_path_buf());
        self.tokens.insert(dir.to_path_buf(), token);
        Ok(token)
    }

    async fn next_ready(&mut self) -> Option<WatchToken> {
        loop {
            self.take_overflow();
            if let Some(token) = self.ready.pop_front() {
                return Some(token);
            }

            let res = self.event_rx.recv().await?;
            self.route(res);
            while let Ok(res) = self.event_rx.try_recv() {
                self.route(res);
            }
        }
    }

    fn poll_notifications(&mut self, token: WatchToken) -> Vec<RawNotification> {
        self.pending.remove(&token).unwrap_or_default()
    }

    fn reset(&mut self, token: WatchToken) -> bool {
        let Some(dir) = self.dirs.get(&token) else {
            return false;
        };
        if dir
            .symlink_metadata()
            .is_ok_and(|meta| meta.file_type().is_dir())
        {
            return true;
        }

        let Some(dir) = self.dirs.remove(&token) else {
            return false;
        };
        self.tokens.remove(&dir);
        self.pending.remove(&token);
        self.ready.retain(|queued| *queued != token);

        // The OS usually drops the watch itself when the directory goes away.
        if let Err(e) = self.watcher.unwatch(&dir) {
            debug!("Unwatch {} failed: {e}", dir.display());
        }
        false
    }
}

/// Hand a notify result to the worker without blocking the notify thread.
fn forward(
    event_tx: &mpsc::Sender<NotifyResult>,
    overflowed: &AtomicBool,
    res: NotifyResult,
) {
    match event_tx.try_send(res) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => overflowed.store(true, Ordering::Release),
        // The receiver only goes away when the backend is dropped.
        Err(TrySendError::Closed(_)) => {}
    }
}
