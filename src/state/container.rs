//! Per-instance state storage with change notification.
//!
//! Cells are keyed by `{identity}__{name}` so sibling instances of the same
//! type never share storage. Watchers receive the container itself, which
//! lets them write other cells through the same contract as any caller.

use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use smallvec::SmallVec;

use super::cell::{StateCell, StateMeta, StateSpec};
use super::cipher::{StateCipher, is_token};
use super::{StateError, StateKind};

/// Change callback invoked with `(new, old)`.
pub type Watcher = Rc<dyn Fn(&mut StateContainer, &Value, &Value) -> Result<(), StateError>>;

/// Property name -> declared kind, shared by every instance of a type.
pub type Schema = FxHashMap<String, StateKind>;

pub struct StateContainer {
    owner: String,
    cells: Vec<StateCell>,
    by_key: FxHashMap<String, usize>,
    watchers: FxHashMap<String, SmallVec<[Watcher; 2]>>,
    schema: Arc<Schema>,
    cipher: Option<Arc<StateCipher>>,
}

impl std::fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateContainer")
            .field("owner", &self.owner)
            .field("cells", &self.cells)
            .finish_non_exhaustive()
    }
}

impl StateContainer {
    pub fn new(
        owner: impl Into<String>,
        schema: Arc<Schema>,
        cipher: Option<Arc<StateCipher>>,
    ) -> Self {
        Self {
            owner: owner.into(),
            cells: Vec::new(),
            by_key: FxHashMap::default(),
            watchers: FxHashMap::default(),
            schema,
            cipher,
        }
    }

    /// Identity of the owning instance.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Storage key for a cell name.
    pub fn key_of(&self, name: &str) -> String {
        format!("{}__{}", self.owner, name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_key.contains_key(&self.key_of(name))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, name: &str) -> Option<&StateCell> {
        self.by_key.get(&self.key_of(name)).map(|&i| &self.cells[i])
    }

    /// Cells in declaration order.
    pub fn cells(&self) -> impl Iterator<Item = &StateCell> {
        self.cells.iter()
    }

    /// Declared kind for a property, from the type schema.
    pub fn schema_kind(&self, name: &str) -> StateKind {
        self.schema.get(name).copied().unwrap_or_default()
    }

    /// Declare a cell. Repeated declaration returns the existing cell untouched.
    pub fn declare(&mut self, name: &str, spec: StateSpec) -> Result<&StateCell, StateError> {
        let key = self.key_of(name);
        if let Some(&i) = self.by_key.get(&key) {
            return Ok(&self.cells[i]);
        }

        let kind = spec.kind.unwrap_or_else(|| self.schema_kind(name));
        let value = self.resolve_token(spec.default.clone());
        let cell = StateCell::new(name, key.clone(), value, &spec, kind);
        cell.check(cell.raw())?;

        self.by_key.insert(key, self.cells.len());
        self.cells.push(cell);
        Ok(&self.cells[self.cells.len() - 1])
    }

    /// Live value coerced to the declared kind.
    pub fn read(&self, name: &str) -> Option<Value> {
        self.cell(name).map(StateCell::value)
    }

    /// Write a value, firing watchers if it changed.
    ///
    /// Returns whether the stored value changed. A constraint violation leaves
    /// the cell untouched.
    pub fn write(&mut self, name: &str, value: Value) -> Result<bool, StateError> {
        let key = self.key_of(name);
        let Some(&index) = self.by_key.get(&key) else {
            return Err(StateError::Unknown(name.to_owned()));
        };

        let value = self.resolve_token(value);
        self.cells[index].check(&value)?;

        let Some(old) = self.cells[index].assign(value.clone()) else {
            return Ok(false);
        };

        let watchers = self.watchers.get(name).cloned().unwrap_or_default();
        for watcher in watchers {
            watcher(self, &value, &old)?;
        }
        Ok(true)
    }

    /// Register a change callback for a declared cell.
    pub fn watch(&mut self, name: &str, watcher: Watcher) -> Result<(), StateError> {
        if !self.contains(name) {
            return Err(StateError::Unknown(name.to_owned()));
        }
        self.watchers
            .entry(name.to_owned())
            .or_default()
            .push(watcher);
        Ok(())
    }

    /// Client-facing snapshot: protected cells are replaced by encrypted tokens.
    ///
    /// `only` restricts the snapshot to the given names, in that order.
    pub fn exposed(&self, only: Option<&[String]>) -> Result<Map<String, Value>, StateError> {
        let mut out = Map::new();
        let mut push = |cell: &StateCell| -> Result<(), StateError> {
            let value = if cell.is_protected() {
                let cipher = self
                    .cipher
                    .as_ref()
                    .ok_or_else(|| StateError::MissingKey(cell.name().to_owned()))?;
                Value::String(cipher.encrypt(cell.raw())?)
            } else {
                cell.value()
            };
            out.insert(cell.name().to_owned(), value);
            Ok(())
        };

        match only {
            Some(names) => {
                for name in names {
                    if let Some(cell) = self.cell(name) {
                        push(cell)?;
                    }
                }
            }
            None => {
                for cell in &self.cells {
                    push(cell)?;
                }
            }
        }
        Ok(out)
    }

    pub fn metadata(&self) -> Vec<StateMeta> {
        self.cells.iter().map(StateCell::meta).collect()
    }

    /// Decrypt token strings; undecryptable tokens become "no value".
    fn resolve_token(&self, value: Value) -> Value {
        match &value {
            Value::String(s) if is_token(s) => self
                .cipher
                .as_ref()
                .and_then(|c| c.decrypt(s))
                .unwrap_or(Value::Null),
            _ => value,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn container(owner: &str) -> StateContainer {
        StateContainer::new(owner, Arc::new(Schema::default()), None)
    }

    fn with_cipher(owner: &str) -> (StateContainer, Arc<StateCipher>) {
        let cipher = Arc::new(StateCipher::new(SECRET).unwrap());
        (StateContainer::new(owner, Arc::default(), Some(cipher.clone())), cipher)
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut s = container("c_1");
        s.declare("count", StateSpec::new(1)).unwrap();
        s.write("count", json!(5)).unwrap();
        let cell = s.declare("count", StateSpec::new(99)).unwrap();
        assert_eq!(cell.raw(), &json!(5));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_constraint_violation_leaves_value() {
        let mut s = container("c_1");
        s.declare("size", StateSpec::new("sm").allowed(["sm", "lg"]))
            .unwrap();

        let err = s.write("size", json!("xl")).unwrap_err();
        assert!(matches!(err, StateError::Constraint { .. }));
        assert_eq!(s.read("size"), Some(json!("sm")));
    }

    #[test]
    fn test_declare_rejects_default_outside_allowed() {
        let mut s = container("c_1");
        assert!(s.declare("size", StateSpec::new("xl").allowed(["sm"])).is_err());
        assert!(!s.contains("size"));
    }

    #[test]
    fn test_equal_write_does_not_notify() {
        let mut s = container("c_1");
        s.declare("count", StateSpec::new(1)).unwrap();

        let calls = Rc::new(RefCell::new(0));
        let seen = calls.clone();
        s.watch(
            "count",
            Rc::new(move |_, _, _| {
                *seen.borrow_mut() += 1;
                Ok(())
            }),
        )
        .unwrap();

        assert!(!s.write("count", json!(1)).unwrap());
        assert_eq!(*calls.borrow(), 0);
        assert!(s.write("count", json!(2)).unwrap());
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_watchers_fire_in_order_with_new_and_old() {
        let mut s = container("c_1");
        s.declare("count", StateSpec::new(1)).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let log = log.clone();
            s.watch(
                "count",
                Rc::new(move |_, new, old| {
                    log.borrow_mut().push(format!("{tag}:{new}:{old}"));
                    Ok(())
                }),
            )
            .unwrap();
        }

        s.write("count", json!(3)).unwrap();
        assert_eq!(*log.borrow(), vec!["first:3:1", "second:3:1"]);
    }

    #[test]
    fn test_watcher_writes_reenter_contract() {
        let mut s = container("c_1");
        s.declare("count", StateSpec::new(0)).unwrap();
        s.declare("double", StateSpec::new(0)).unwrap();
        s.declare("mode", StateSpec::new("a").allowed(["a", "b"]))
            .unwrap();

        s.watch(
            "count",
            Rc::new(|state, new, _| {
                let n = new.as_i64().unwrap_or(0);
                state.write("double", json!(n * 2)).map(|_| ())
            }),
        )
        .unwrap();
        s.watch(
            "double",
            Rc::new(|state, _, _| state.write("mode", json!("zzz")).map(|_| ())),
        )
        .unwrap();

        // The nested constraint violation surfaces to the original writer
        assert!(s.write("count", json!(2)).is_err());
        assert_eq!(s.read("double"), Some(json!(4)));
        assert_eq!(s.read("mode"), Some(json!("a")));
    }

    #[test]
    fn test_watch_unknown_state() {
        let mut s = container("c_1");
        assert!(matches!(
            s.watch("missing", Rc::new(|_, _, _| Ok(()))),
            Err(StateError::Unknown(_))
        ));
    }

    #[test]
    fn test_sibling_keys_are_distinct() {
        let mut a = container("item-component_1");
        let mut b = container("item-component_2");
        a.declare("value", StateSpec::new("x")).unwrap();
        b.declare("value", StateSpec::new("x")).unwrap();

        assert_ne!(
            a.cell("value").unwrap().key(),
            b.cell("value").unwrap().key()
        );
        a.write("value", json!("changed")).unwrap();
        assert_eq!(b.read("value"), Some(json!("x")));
    }

    #[test]
    fn test_schema_kind_applies_on_read() {
        let mut schema = Schema::default();
        schema.insert("tags".into(), StateKind::List);
        let mut s = StateContainer::new("c_1", Arc::new(schema), None);

        s.declare("tags", StateSpec::new(Value::Null)).unwrap();
        s.write("tags", json!(r#"["a","b"]"#)).unwrap();
        assert_eq!(s.read("tags"), Some(json!(["a", "b"])));
    }

    #[test]
    fn test_token_write_stores_decrypted_value() {
        let (mut s, cipher) = with_cipher("c_1");
        s.declare("secret", StateSpec::new("").protected()).unwrap();

        let token = cipher.encrypt(&json!({"user": 7})).unwrap();
        s.write("secret", json!(token)).unwrap();
        assert_eq!(s.read("secret"), Some(json!({"user": 7})));

        s.write("secret", json!("surge:garbage")).unwrap();
        assert_eq!(s.read("secret"), Some(Value::Null));
    }

    #[test]
    fn test_exposed_encrypts_protected_cells() {
        let (mut s, cipher) = with_cipher("c_1");
        s.declare("count", StateSpec::new(3)).unwrap();
        s.declare("secret", StateSpec::new("hidden").protected())
            .unwrap();

        let exposed = s.exposed(None).unwrap();
        assert_eq!(exposed["count"], json!(3));
        let token = exposed["secret"].as_str().unwrap();
        assert_ne!(token, "hidden");
        assert_eq!(cipher.decrypt(token), Some(json!("hidden")));
    }

    #[test]
    fn test_exposed_protected_without_key_fails() {
        let mut s = container("c_1");
        s.declare("secret", StateSpec::new("hidden").protected())
            .unwrap();
        assert!(matches!(s.exposed(None), Err(StateError::MissingKey(_))));
    }

    #[test]
    fn test_exposed_subset_and_metadata() {
        let mut s = container("c_1");
        s.declare("a", StateSpec::new(1)).unwrap();
        s.declare("b", StateSpec::new(2).kind(StateKind::Int))
            .unwrap();

        let only = ["b".to_string(), "zzz".to_string()];
        let exposed = s.exposed(Some(&only)).unwrap();
        assert_eq!(exposed.len(), 1);

        let meta = s.metadata();
        assert_eq!(meta[1].name, "b");
        assert_eq!(meta[1].kind, StateKind::Int);
        assert_eq!(meta[0].key, "c_1__a");
    }
}
