//! Mapping from watch tokens to the directories they watch.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque handle for one directory registration with a watch backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchToken(u64);

impl WatchToken {
    /// Wrap a backend-specific id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The backend-specific id.
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an upsert did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// The path was not registered before.
    Inserted,

    /// The path was already registered under this token.
    Unchanged,

    /// The path moved to a new token; the stale one was dropped.
    Replaced(WatchToken),
}

/// Registered directories, keyed by token.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    dirs: HashMap<WatchToken, PathBuf>,
    tokens: HashMap<PathBuf, WatchToken>,
}

impl WatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `token` as watching `dir`, keeping one entry per path.
    pub fn upsert(&mut self, token: WatchToken, dir: PathBuf) -> Upsert {
        // A token reused for a different path loses its old path.
        if let Some(old_dir) = self.dirs.get(&token) {
            if old_dir != &dir {
                self.tokens.remove(old_dir);
            }
        }

        let outcome = match self.tokens.insert(dir.clone(), token) {
            None => Upsert::Inserted,
            Some(previous) if previous == token => Upsert::Unchanged,
            Some(previous) => {
                self.dirs.remove(&previous);
                Upsert::Replaced(previous)
            }
        };
        self.dirs.insert(token, dir);
        outcome
    }

    /// Directory watched by `token`.
    pub fn get(&self, token: WatchToken) -> Option<&Path> {
        self.dirs.get(&token).map(PathBuf::as_path)
    }

    /// Token watching `dir`, if any.
    pub fn token_for(&self, dir: &Path) -> Option<WatchToken> {
        self.tokens.get(dir).copied()
    }

    /// Whether `dir` is registered.
    pub fn contains_dir(&self, dir: &Path) -> bool {
        self.tokens.contains_key(dir)
    }

    /// Drop the entry for `token`, returning its directory.
    pub fn remove(&mut self, token: WatchToken) -> Option<PathBuf> {
        let dir = self.dirs.remove(&token)?;
        self.tokens.remove(&dir);
        Some(dir)
    }

    /// Number of registered directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Registered directories, sorted.
    pub fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.dirs.values().cloned().collect();
        dirs.sort();
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upsert_and_lookup() {
        let mut registry = WatchRegistry::new();
        let token = WatchToken::new(1);

        assert_eq!(registry.upsert(token, "/notes".into()), Upsert::Inserted);
        assert_eq!(registry.get(token), Some(Path::new("/notes")));
        assert_eq!(registry.token_for(Path::new("/notes")), Some(token));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_same_token_is_unchanged() {
        let mut registry = WatchRegistry::new();
        let token = WatchToken::new(1);

        registry.upsert(token, "/notes".into());
        assert_eq!(registry.upsert(token, "/notes".into()), Upsert::Unchanged);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_replaces_stale_token() {
        let mut registry = WatchRegistry::new();
        let stale = WatchToken::new(1);
        let fresh = WatchToken::new(2);

        registry.upsert(stale, "/notes".into());
        assert_eq!(
            registry.upsert(fresh, "/notes".into()),
            Upsert::Replaced(stale)
        );
        assert_eq!(registry.get(stale), None);
        assert_eq!(registry.get(fresh), Some(Path::new("/notes")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_token_reused_for_new_path() {
        let mut registry = WatchRegistry::new();
        let token = WatchToken::new(7);

        registry.upsert(token, "/notes/old".into());
        registry.upsert(token, "/notes/new".into());

        assert!(!registry.contains_dir(Path::new("/notes/old")));
        assert_eq!(registry.dirs(), vec![PathBuf::from("/notes/new")]);
    }

    #[test]
    fn test_remove_until_empty() {
        let mut registry = WatchRegistry::new();
        registry.upsert(WatchToken::new(1), "/notes".into());
        registry.upsert(WatchToken::new(2), "/notes/sub".into());

        assert_eq!(
            registry.remove(WatchToken::new(2)),
            Some(PathBuf::from("/notes/sub"))
        );
        assert_eq!(registry.remove(WatchToken::new(2)), None);
        assert!(!registry.is_empty());

        registry.remove(WatchToken::new(1));
        assert!(registry.is_empty());
        assert!(!registry.contains_dir(Path::new("/notes")));
    }
}
