//! Local-storage bridge.
//!
//! The client sends its local-storage namespaces with each action request
//! (`_local_storage`); components read and write them through [`LocalStore`]
//! and the response carries the resulting snapshot back.

use serde_json::{Map, Value};

/// Upper bound on namespaces kept per request.
pub const MAX_STORES: usize = 50;
/// Size the store list is trimmed to once the bound is exceeded.
pub const TRIM_TO: usize = 30;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalStore {
    name: String,
    data: Map<String, Value>,
}

impl LocalStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Map::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn all(&self) -> &Map<String, Value> {
        &self.data
    }
}

/// Namespaced stores, most recently used last.
#[derive(Debug, Default)]
pub struct Store {
    stores: Vec<LocalStore>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed namespaces from the request payload.
    ///
    /// Values may be JSON objects or JSON text; anything else seeds an empty store.
    pub fn seed(&mut self, raw: &Map<String, Value>) {
        for (name, value) in raw {
            let data = match value {
                Value::Object(map) => map.clone(),
                Value::String(text) => match serde_json::from_str(text) {
                    Ok(Value::Object(map)) => map,
                    _ => Map::new(),
                },
                _ => Map::new(),
            };
            self.open(name).data = data;
        }
    }

    /// Open a namespace, creating it if needed.
    pub fn open(&mut self, name: &str) -> &mut LocalStore {
        match self.stores.iter().position(|s| s.name == name) {
            Some(pos) => {
                let store = self.stores.remove(pos);
                self.stores.push(store);
            }
            None => {
                self.stores.push(LocalStore::new(name));
                if self.stores.len() > MAX_STORES {
                    let excess = self.stores.len() - TRIM_TO;
                    self.stores.drain(..excess);
                }
            }
        }
        let last = self.stores.len() - 1;
        &mut self.stores[last]
    }

    pub fn get(&self, name: &str) -> Option<&LocalStore> {
        self.stores.iter().find(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Namespace -> data, for the response `localStorage` field.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.stores
            .iter()
            .map(|s| (s.name.clone(), Value::Object(s.data.clone())))
            .collect()
    }
}
