//! # Workspace persistence contract
//!
//! The canvas core does not own settings or state-document storage; it
//! consumes a minimal interface implemented by the host. This module records
//! that contract as a trait so the engine's own code (and its tests) can
//! depend on it without committing to a concrete backend. Grounded on
//! `Environment.hpp`'s `BasicEnvironment`/`PersistencePolicy` split.

use serde::{Deserialize, Serialize};

/// Which settings/state namespace a key or document lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Workspace,
    Session,
}

/// Default cap on a single state document, enforced by the store on both
/// write and read.
pub const MAX_STATE_DOCUMENT_BYTES: usize = 4 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Ok,
    NotFound,
    Corrupt,
}

#[derive(Clone, Debug)]
pub struct LoadResult {
    pub status: LoadStatus,
    pub object: Option<serde_json::Value>,
    pub from_backup: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SaveResult {
    pub ok: bool,
    pub error: Option<String>,
}

/// The settings/state-document interface the host must provide. The core
/// treats every method as synchronous and side-effect-free on failure: a
/// failed `save_state` or `remove_state` leaves prior storage untouched, and
/// `load_state` never partially populates its result.
///
/// Implementations are responsible for the write discipline described in the
/// external interfaces: a state document is written to a temp file and
/// committed by rename, the previous contents copied to a `.bak` file first,
/// and `MAX_STATE_DOCUMENT_BYTES` enforced before the write lands. On load,
/// a corrupt primary document falls back to `.bak`; a corrupt backup is
/// surfaced as `LoadStatus::Corrupt` rather than silently discarded.
pub trait StateStore {
    fn get_setting(&self, scope: Scope, key: &str) -> Option<serde_json::Value>;
    fn set_setting(&mut self, scope: Scope, key: &str, value: serde_json::Value);
    fn remove_setting(&mut self, scope: Scope, key: &str);
    fn contains_setting(&self, scope: Scope, key: &str) -> bool;

    fn load_state(&self, scope: Scope, name: &str) -> LoadResult;
    fn save_state(&mut self, scope: Scope, name: &str, object: serde_json::Value) -> SaveResult;
    fn remove_state(&mut self, scope: Scope, name: &str, remove_backup: bool) -> Result<(), String>;
}

#[cfg(test)]
pub mod test_double {
    //! An in-memory `StateStore` used only by this crate's own tests to
    //! exercise the backup-fallback contract without touching a filesystem.

    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct InMemoryStateStore {
        settings: HashMap<(Scope, String), serde_json::Value>,
        primary: HashMap<(Scope, String), Vec<u8>>,
        backup: HashMap<(Scope, String), Vec<u8>>,
        corrupt_primary: std::collections::HashSet<(Scope, String)>,
        corrupt_backup: std::collections::HashSet<(Scope, String)>,
    }

    impl InMemoryStateStore {
        pub fn mark_primary_corrupt(&mut self, scope: Scope, name: &str) {
            self.corrupt_primary.insert((scope, name.to_string()));
        }

        pub fn mark_backup_corrupt(&mut self, scope: Scope, name: &str) {
            self.corrupt_backup.insert((scope, name.to_string()));
        }
    }

    impl StateStore for InMemoryStateStore {
        fn get_setting(&self, scope: Scope, key: &str) -> Option<serde_json::Value> {
            self.settings.get(&(scope, key.to_string())).cloned()
        }

        fn set_setting(&mut self, scope: Scope, key: &str, value: serde_json::Value) {
            self.settings.insert((scope, key.to_string()), value);
        }

        fn remove_setting(&mut self, scope: Scope, key: &str) {
            self.settings.remove(&(scope, key.to_string()));
        }

        fn contains_setting(&self, scope: Scope, key: &str) -> bool {
            self.settings.contains_key(&(scope, key.to_string()))
        }

        fn load_state(&self, scope: Scope, name: &str) -> LoadResult {
            let k = (scope, name.to_string());

            if !self.corrupt_primary.contains(&k) {
                if let Some(bytes) = self.primary.get(&k) {
                    if bytes.len() <= MAX_STATE_DOCUMENT_BYTES {
                        if let Ok(object) = serde_json::from_slice(bytes) {
                            return LoadResult { status: LoadStatus::Ok, object: Some(object), from_backup: false, error: None };
                        }
                    }
                }
            }

            if !self.corrupt_backup.contains(&k) {
                if let Some(bytes) = self.backup.get(&k) {
                    if bytes.len() <= MAX_STATE_DOCUMENT_BYTES {
                        if let Ok(object) = serde_json::from_slice(bytes) {
                            return LoadResult { status: LoadStatus::Ok, object: Some(object), from_backup: true, error: None };
                        }
                    }
                }
            }

            if self.primary.contains_key(&k) || self.backup.contains_key(&k) {
                return LoadResult {
                    status: LoadStatus::Corrupt,
                    object: None,
                    from_backup: self.backup.contains_key(&k),
                    error: Some("state document is invalid".to_string()),
                };
            }

            LoadResult { status: LoadStatus::NotFound, object: None, from_backup: false, error: None }
        }

        fn save_state(&mut self, scope: Scope, name: &str, object: serde_json::Value) -> SaveResult {
            let k = (scope, name.to_string());
            let bytes = match serde_json::to_vec(&object) {
                Ok(b) => b,
                Err(e) => return SaveResult { ok: false, error: Some(e.to_string()) },
            };
            if bytes.len() > MAX_STATE_DOCUMENT_BYTES {
                return SaveResult { ok: false, error: Some("state document exceeds maxStateDocumentBytes".to_string()) };
            }
            if let Some(prev) = self.primary.remove(&k) {
                self.backup.insert(k.clone(), prev);
            }
            self.primary.insert(k, bytes);
            SaveResult { ok: true, error: None }
        }

        fn remove_state(&mut self, scope: Scope, name: &str, remove_backup: bool) -> Result<(), String> {
            let k = (scope, name.to_string());
            self.primary.remove(&k);
            if remove_backup {
                self.backup.remove(&k);
            }
            Ok(())
        }
    }

    #[test]
    fn corrupt_primary_falls_back_to_backup() {
        let mut store = InMemoryStateStore::default();
        store.save_state(Scope::Workspace, "canvas", serde_json::json!({"version": 1}));
        store.save_state(Scope::Workspace, "canvas", serde_json::json!({"version": 2}));
        store.mark_primary_corrupt(Scope::Workspace, "canvas");

        let result = store.load_state(Scope::Workspace, "canvas");
        assert_eq!(result.status, LoadStatus::Ok);
        assert!(result.from_backup);
        assert_eq!(result.object.unwrap()["version"], 1);
    }

    #[test]
    fn corrupt_primary_and_backup_surfaces_as_corrupt() {
        let mut store = InMemoryStateStore::default();
        store.save_state(Scope::Session, "canvas", serde_json::json!({"version": 1}));
        store.mark_primary_corrupt(Scope::Session, "canvas");
        store.mark_backup_corrupt(Scope::Session, "canvas");

        let result = store.load_state(Scope::Session, "canvas");
        assert_eq!(result.status, LoadStatus::Corrupt);
    }

    #[test]
    fn missing_document_is_not_found() {
        let store = InMemoryStateStore::default();
        let result = store.load_state(Scope::Global, "missing");
        assert_eq!(result.status, LoadStatus::NotFound);
    }
}
