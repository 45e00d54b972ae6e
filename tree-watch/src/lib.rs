//! # Tree Watch
//!
//! Recursive change watching for a notes directory. Every directory under a
//! root gets its own watch, new subdirectories are picked up as they appear,
//! and changes are reported to a listener as [`ChangeEvent`]s.
//!
//! ## Features
//!
//! - **Recursive Registration**: Walk the tree once, then follow new directories
//! - **Exclusion Rules**: Skip internal data directories and hidden files
//! - **Single Worker**: One task owns the registry and calls the listener
//! - **Clean Shutdown**: Cancellation, or the whole tree disappearing
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Tree Watch                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatchConfig ──► WatchDir ──► ChangeEvent ──► WatchListener     │
//! │                    │    ▲                                       │
//! │                    ▼    │                                       │
//! │  filter ◄──── WatchRegistry      WatchBackend (notify)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```no_run
//! use tree_watch::{ChangeEvent, WatchConfig, WatchDir};
//!
//! # async fn demo() -> tree_watch::Result<()> {
//! let watch = WatchDir::new(WatchConfig::new("/home/me/notes"))?;
//! let handle = watch.spawn(|event: &ChangeEvent| {
//!     println!("{} {}", event.kind, event.path.display());
//! });
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod handle;
pub mod registry;
pub mod watcher;

pub use backend::{NotifyBackend, WatchBackend};
pub use config::WatchConfig;
pub use error::{Result, WatcherError};
pub use event::{ChangeEvent, ChangeKind, RawKind, RawNotification, WatchListener};
pub use handle::WatchHandle;
pub use registry::{WatchRegistry, WatchToken};
pub use watcher::{Termination, WatchDir};
