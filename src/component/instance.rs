//! One live occurrence of a component type.

use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use super::{ComponentError, ComponentType, NAMED_SLOT_PREFIX, SLOT_KEY, Scope};
use crate::core::RequestContext;
use crate::state::{StateContainer, StateSpec};
use crate::utils::json::scalar_to_string;

/// A callable registered on an instance at runtime.
#[derive(Clone)]
pub struct RuntimeMethod {
    pub(crate) handler: Rc<dyn Fn(&mut Scope<'_>, &[Value]) -> Result<Value, ComponentError>>,
    pub(crate) required: usize,
    pub(crate) accepts: usize,
}

impl RuntimeMethod {
    pub fn required(&self) -> usize {
        self.required
    }

    pub fn accepts(&self) -> usize {
        self.accepts
    }
}

pub struct ComponentInstance {
    pub(crate) ty: Arc<ComponentType>,
    pub(crate) identity: String,
    pub(crate) route: Option<String>,
    pub(crate) defaults: Map<String, Value>,
    pub(crate) slot: String,
    pub(crate) named_slots: FxHashMap<String, String>,
    pub(crate) state: StateContainer,
    pub(crate) methods: FxHashMap<String, RuntimeMethod>,
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("type", &self.ty.name())
            .field("identity", &self.identity)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ComponentInstance {
    /// Build an instance and run its `setup` hook.
    ///
    /// Slot keys in `defaults` become slot content. Every other scalar default
    /// not declared by `setup` becomes a state cell.
    pub fn construct(
        ty: Arc<ComponentType>,
        identity: String,
        route: Option<String>,
        defaults: Map<String, Value>,
        ctx: &mut RequestContext,
    ) -> Result<Self, ComponentError> {
        let (defaults, slot, named_slots) = split_slots(defaults);
        let state = StateContainer::new(&identity, ty.schema().clone(), ctx.engine().cipher());

        let mut instance = Self {
            ty,
            identity,
            route,
            defaults,
            slot,
            named_slots,
            state,
            methods: FxHashMap::default(),
        };

        let behavior = instance.ty.behavior().clone();
        behavior.setup(&mut Scope::new(&mut instance, ctx))?;
        instance.declare_defaults()?;

        crate::debug!("component"; "constructed {} ({})", instance.identity, instance.ty.name());
        Ok(instance)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn ty(&self) -> &Arc<ComponentType> {
        &self.ty
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn named_slot(&self, name: &str) -> Option<&str> {
        self.named_slots.get(name).map(String::as_str)
    }

    pub fn state(&self) -> &StateContainer {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateContainer {
        &mut self.state
    }

    pub fn method(&self, name: &str) -> Option<&RuntimeMethod> {
        self.methods.get(name)
    }

    /// Exposed state as JSON text, `None` when the type exposes nothing.
    pub fn exposed_json(&self) -> Result<Option<String>, ComponentError> {
        let behavior = self.ty.behavior();
        if !behavior.expose_states() {
            return Ok(None);
        }
        let names: Vec<String> = behavior
            .exposed_states()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let only = (!names.is_empty()).then_some(names.as_slice());
        let exposed = self.state.exposed(only)?;
        Ok(Some(Value::Object(exposed).to_string()))
    }

    fn declare_defaults(&mut self) -> Result<(), ComponentError> {
        for (name, value) in &self.defaults {
            if value.is_array() || value.is_object() || self.state.contains(name) {
                continue;
            }
            self.state.declare(name, StateSpec::new(value.clone()))?;
        }
        Ok(())
    }
}

/// Separate slot content from regular defaults.
fn split_slots(
    defaults: Map<String, Value>,
) -> (Map<String, Value>, String, FxHashMap<String, String>) {
    let mut rest = Map::new();
    let mut slot = String::new();
    let mut named = FxHashMap::default();

    for (key, value) in defaults {
        if let Some(name) = key.strip_prefix(NAMED_SLOT_PREFIX) {
            named.insert(name.to_owned(), scalar_to_string(&value));
        } else if key == SLOT_KEY {
            slot = scalar_to_string(&value);
        } else {
            rest.insert(key, value);
        }
    }
    (rest, slot, named)
}
