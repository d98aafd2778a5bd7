//! Persisted prefix -> type index.
//!
//! The index file lets a fresh process resolve identities without scanning
//! the registry. A miss triggers at most one rescan per prefix for the
//! lifetime of the process.
//!
//! ```json
//! {
//!   "entries": {
//!     "counter-component": "app::widgets::CounterComponent"
//!   },
//!   "created_at": 1735689600
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::{ComponentType, Registry};
use crate::{debug, log};

/// Custom tag -> component type, as used by markup expansion.
pub type TagTable = FxHashMap<String, Arc<ComponentType>>;

/// On-disk shape of the index.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    entries: BTreeMap<String, String>,
    #[serde(default)]
    created_at: u64,
}

#[derive(Default)]
struct IndexState {
    loaded: bool,
    entries: BTreeMap<String, String>,
    /// Prefixes a miss already triggered a rescan for.
    refreshed: FxHashSet<String>,
    /// Namespaces registered while rendering.
    dynamic: BTreeSet<String>,
    tags: Option<Arc<TagTable>>,
}

pub struct ComponentIndex {
    registry: Arc<Registry>,
    path: Option<PathBuf>,
    declared: Vec<String>,
    state: Mutex<IndexState>,
}

impl ComponentIndex {
    /// `path = None` keeps the index in memory only. Empty `namespaces`
    /// covers every namespace in the registry.
    pub fn new(registry: Arc<Registry>, path: Option<PathBuf>, namespaces: Vec<String>) -> Self {
        Self {
            registry,
            path,
            declared: namespaces,
            state: Mutex::new(IndexState::default()),
        }
    }

    /// Type registered under `prefix`.
    ///
    /// An entry naming a type the registry no longer knows counts as a miss.
    pub fn lookup(&self, prefix: &str) -> Option<Arc<ComponentType>> {
        let mut state = self.state.lock();
        self.ensure_loaded(&mut state);

        let name = state.entries.get(prefix)?;
        let found = self.registry.get(name).cloned();
        if found.is_none() {
            debug!("index"; "stale entry {} -> {}", prefix, name);
        }
        found
    }

    /// Rebuild from the registry and persist. Returns the entry count.
    pub fn refresh(&self) -> usize {
        let mut state = self.state.lock();
        let entries: BTreeMap<String, String> = self
            .covered(&state)
            .map(|ty| (ty.index_prefix(), ty.name().to_owned()))
            .collect();
        state.loaded = true;
        state.entries = entries;
        state.tags = None;

        debug!("index"; "rebuilt with {} entries", state.entries.len());
        if let Err(err) = self.persist(&state.entries) {
            log!("index"; "failed to persist index: {}", err);
        }
        state.entries.len()
    }

    /// Rescan once for a missing prefix. Returns `false` if already attempted.
    pub fn refresh_once(&self, prefix: &str) -> bool {
        if !self.state.lock().refreshed.insert(prefix.to_owned()) {
            return false;
        }
        debug!("resolve"; "no index entry for `{}`, rescanning", prefix);
        self.refresh();
        true
    }

    /// Custom tags of every concrete type in a covered namespace.
    pub fn tags(&self) -> Arc<TagTable> {
        let mut state = self.state.lock();
        if let Some(tags) = &state.tags {
            return tags.clone();
        }

        let mut table = TagTable::default();
        for ty in self.covered(&state).filter(|ty| !ty.is_abstract()) {
            for tag in ty.tags() {
                table.entry(tag).or_insert_with(|| ty.clone());
            }
        }
        let table = Arc::new(table);
        state.tags = Some(table.clone());
        table
    }

    /// Add a namespace discovered at render time.
    pub fn register_namespace(&self, namespace: &str) {
        let mut state = self.state.lock();
        if !state.dynamic.contains(namespace) {
            state.dynamic.insert(namespace.to_owned());
            state.tags = None;
        }
    }

    /// Declared plus dynamically registered namespaces.
    pub fn namespaces(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut out: BTreeSet<String> = self.declared.iter().cloned().collect();
        out.extend(state.dynamic.iter().cloned());
        out.into_iter().collect()
    }

    pub fn entries(&self) -> BTreeMap<String, String> {
        let mut state = self.state.lock();
        self.ensure_loaded(&mut state);
        state.entries.clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn covered<'a>(
        &'a self,
        state: &'a IndexState,
    ) -> impl Iterator<Item = &'a Arc<ComponentType>> + 'a {
        let all = self.declared.is_empty();
        self.registry.iter().filter(move |ty| {
            all || self
                .declared
                .iter()
                .chain(state.dynamic.iter())
                .any(|ns| ty.in_namespace(ns))
        })
    }

    fn ensure_loaded(&self, state: &mut IndexState) {
        if state.loaded {
            return;
        }
        state.loaded = true;

        let Some(path) = &self.path else { return };
        match load_index_file(path) {
            Ok(Some(file)) => {
                debug!("index"; "loaded {} entries from {}", file.entries.len(), path.display());
                state.entries = file.entries;
            }
            Ok(None) => {}
            Err(err) => log!("index"; "ignoring unreadable index {}: {}", path.display(), err),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        let Some(path) = &self.path else { return Ok(()) };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if load_index_file(path).is_ok_and(|f| f.is_some_and(|f| &f.entries == entries)) {
            debug!("index"; "index unchanged, skipping write");
            return Ok(());
        }

        let file = IndexFile {
            entries: entries.clone(),
            created_at: current_timestamp(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json)
    }
}

fn load_index_file(path: &Path) -> std::io::Result<Option<IndexFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)?;
    let file = serde_json::from_str(&json)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(Some(file))
}

fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::testing::registry;
    use tempfile::TempDir;

    fn index(path: Option<PathBuf>, namespaces: &[&str]) -> ComponentIndex {
        let namespaces = namespaces.iter().map(|s| s.to_string()).collect();
        ComponentIndex::new(Arc::new(registry()), path, namespaces)
    }

    #[test]
    fn test_refresh_persists_pretty_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/index.json");
        let idx = index(Some(path.clone()), &[]);

        assert!(idx.refresh() > 0);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"entries\""));
        assert!(text.contains("\"counter-component\": \"app::widgets::CounterComponent\""));
    }

    #[test]
    fn test_lookup_uses_persisted_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        index(Some(path.clone()), &[]).refresh();

        let fresh = index(Some(path), &[]);
        assert_eq!(
            fresh.lookup("counter-component").unwrap().name(),
            "app::widgets::CounterComponent"
        );
    }

    #[test]
    fn test_stale_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, r#"{"entries": {"gone-component": "app::Gone"}}"#).unwrap();

        let idx = index(Some(path), &[]);
        assert!(idx.lookup("gone-component").is_none());
    }

    #[test]
    fn test_refresh_once_per_prefix() {
        let idx = index(None, &[]);
        assert!(idx.lookup("counter-component").is_none());
        assert!(idx.refresh_once("counter-component"));
        assert!(!idx.refresh_once("counter-component"));
        assert!(idx.lookup("counter-component").is_some());
        assert!(idx.refresh_once("other-component"));
    }

    #[test]
    fn test_declared_namespaces_limit_scan() {
        let idx = index(None, &["app::pages"]);
        idx.refresh();
        assert!(idx.lookup("counter-component").is_none());
        assert!(!idx.tags().contains_key("child-component"));

        idx.register_namespace("app::widgets");
        assert!(idx.tags().contains_key("child-component"));
        idx.refresh();
        assert!(idx.lookup("counter-component").is_some());
        assert_eq!(idx.namespaces(), vec!["app::pages", "app::widgets"]);
    }

    #[test]
    fn test_tag_table_skips_abstract_types() {
        let idx = index(None, &[]);
        let tags = idx.tags();
        assert!(tags.contains_key("child-component"));
        assert!(tags.contains_key("tag-list"));
        assert!(!tags.contains_key("base-widget-component"));
    }
}
