//! Exclusion rules for registration and event delivery.

use std::path::Path;

/// Path substrings marking internal data directories.
pub const INTERNAL_MARKERS: [&str; 2] = [".meta", ".imagecache"];

/// Suffix of attachment directories.
pub const ATTACHMENTS_SUFFIX: &str = ".attachments";

/// Prefix of hidden file names.
pub const HIDDEN_PREFIX: &str = ".";

/// Hidden file that is still delivered; written on every save.
pub const SAVE_TIMESTAMP_FILE: &str = ".lastSaveTs";

/// Check whether a directory may be registered for watching.
///
/// Rules match against the whole path string, so any directory below an
/// internal data directory is rejected too.
pub fn should_register(dir: &Path) -> bool {
    let path = dir.to_string_lossy();
    !INTERNAL_MARKERS.iter().any(|marker| path.contains(marker))
        && !path.ends_with(ATTACHMENTS_SUFFIX)
}

/// Check whether a change to `path` is delivered to the listener.
pub fn should_deliver(path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return true;
    };
    let name = name.to_string_lossy();
    !name.starts_with(HIDDEN_PREFIX) || name == SAVE_TIMESTAMP_FILE
}
