//! Access handle passed to component hooks and actions.

use std::rc::Rc;

use serde_json::{Map, Value};

use super::{ComponentError, ComponentInstance, RuntimeMethod};
use crate::collect::{ScriptCollector, StyleCollector};
use crate::core::RequestContext;
use crate::event::Event;
use crate::state::{StateContainer, StateError, StateSpec};
use crate::store::LocalStore;
use crate::utils::json::scalar_to_string;

/// Borrow of one instance together with the request it runs in.
pub struct Scope<'a> {
    instance: &'a mut ComponentInstance,
    ctx: &'a mut RequestContext,
}

impl<'a> Scope<'a> {
    pub fn new(instance: &'a mut ComponentInstance, ctx: &'a mut RequestContext) -> Self {
        Self { instance, ctx }
    }

    pub fn identity(&self) -> &str {
        &self.instance.identity
    }

    pub fn route(&self) -> Option<&str> {
        self.instance.route.as_deref()
    }

    pub fn instance(&self) -> &ComponentInstance {
        &*self.instance
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// Declare a cell and return its current value.
    ///
    /// A default supplied by the caller (tag attribute, factory argument)
    /// overrides `default`.
    pub fn state(
        &mut self,
        name: &str,
        default: impl Into<Value>,
    ) -> Result<Value, ComponentError> {
        self.state_with(name, StateSpec::new(default))
    }

    pub fn state_with(&mut self, name: &str, mut spec: StateSpec) -> Result<Value, ComponentError> {
        if let Some(given) = self.instance.defaults.get(name) {
            spec.default = given.clone();
        }
        let cell = self.instance.state.declare(name, spec)?;
        Ok(cell.value())
    }

    /// Current value, `Null` when undeclared.
    pub fn get(&self, name: &str) -> Value {
        self.instance.state.read(name).unwrap_or(Value::Null)
    }

    pub fn get_i64(&self, name: &str) -> i64 {
        match self.get(name) {
            Value::Number(n) => n.as_i64().unwrap_or(n.as_f64().unwrap_or(0.0) as i64),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            Value::Bool(b) => b as i64,
            _ => 0,
        }
    }

    pub fn get_str(&self, name: &str) -> String {
        scalar_to_string(&self.get(name))
    }

    pub fn get_bool(&self, name: &str) -> bool {
        crate::state::StateKind::Bool.coerce(&self.get(name)) == Value::Bool(true)
    }

    /// Write through the state contract. Returns whether the value changed.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<bool, ComponentError> {
        Ok(self.instance.state.write(name, value.into())?)
    }

    pub fn watch<F>(&mut self, name: &str, watcher: F) -> Result<(), ComponentError>
    where
        F: Fn(&mut StateContainer, &Value, &Value) -> Result<(), StateError> + 'static,
    {
        Ok(self.instance.state.watch(name, Rc::new(watcher))?)
    }

    pub fn states(&self) -> &StateContainer {
        &self.instance.state
    }

    pub fn states_mut(&mut self) -> &mut StateContainer {
        &mut self.instance.state
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    pub fn slot(&self) -> &str {
        &self.instance.slot
    }

    pub fn named_slot(&self, name: &str) -> Option<&str> {
        self.instance.named_slot(name)
    }

    /// Raw caller-supplied default.
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.instance.defaults.get(name)
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.instance.defaults
    }

    // ------------------------------------------------------------------------
    // Request
    // ------------------------------------------------------------------------

    /// Queue an event for the addressed components.
    pub fn emit(&mut self, name: &str, payload: Value) {
        self.ctx.events.queue(Event::new(name, payload));
    }

    /// Local-storage namespace, created on first use.
    pub fn store(&mut self, name: &str) -> &mut LocalStore {
        self.ctx.store.open(name)
    }

    /// Register a callable reachable from client actions.
    ///
    /// `required` arguments must be supplied; up to `accepts` are passed.
    pub fn register_method<F>(&mut self, name: &str, required: usize, accepts: usize, handler: F)
    where
        F: Fn(&mut Scope<'_>, &[Value]) -> Result<Value, ComponentError> + 'static,
    {
        self.instance.methods.insert(
            name.to_owned(),
            RuntimeMethod {
                handler: Rc::new(handler),
                required,
                accepts: accepts.max(required),
            },
        );
    }

    pub fn disable_page_cache(&mut self) {
        self.ctx.disable_page_cache();
    }

    pub fn styles(&mut self) -> &mut StyleCollector {
        &mut self.ctx.styles
    }

    pub fn scripts(&mut self) -> &mut ScriptCollector {
        &mut self.ctx.scripts
    }

    pub fn context(&mut self) -> &mut RequestContext {
        &mut *self.ctx
    }
}
