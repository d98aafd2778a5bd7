//! Component model.
//!
//! # Module Structure
//!
//! ```text
//! component/
//! ├── definition   # ComponentType, Action, PageMeta, Registry
//! ├── identity     # prefix / identity / tag derivation
//! ├── index        # persisted prefix -> type index, tag table
//! ├── instance     # ComponentInstance construction and slots
//! ├── render       # render pipeline, Rendered
//! ├── resolver     # identity -> instance
//! └── scope        # Scope handed to component hooks
//! ```
//!
//! A component type is registered once at startup as a [`ComponentType`]:
//! a name, a shared [`Component`] behaviour object, a property schema and an
//! explicit action table. Instances are created per request by markup
//! expansion, by the resolver, or by the factory, and never outlive the
//! [`RequestContext`](crate::core::RequestContext) that created them.

mod definition;
pub mod identity;
mod index;
mod instance;
mod render;
mod resolver;
mod scope;

#[cfg(test)]
pub(crate) mod testing;

pub use definition::{
    Action, ActionFn, ComponentKind, ComponentType, PageMeta, Registry, Visibility,
};
pub use index::{ComponentIndex, TagTable};
pub use instance::{ComponentInstance, RuntimeMethod};
pub use render::{FragmentEnvelope, Rendered};
pub use resolver::{create, resolve};
pub use scope::Scope;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::event::Event;
use crate::markup::ExpandError;
use crate::render::RenderError;
use crate::state::StateError;

/// Attribute carrying the instance identity on the wrapper element.
pub const IDENTITY_ATTR: &str = "data-surge-id";

/// Default key holding the unnamed slot content.
pub const SLOT_KEY: &str = "__slot";

/// Default key prefix for named slots (`__slot:footer`).
pub const NAMED_SLOT_PREFIX: &str = "__slot:";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("component `{identity}` not found (expected type `{expected}`)")]
    NotFound { identity: String, expected: String },

    #[error("component type `{0}` is abstract")]
    Abstract(String),

    #[error("unknown component type `{0}`")]
    UnknownType(String),

    #[error("component type `{0}` is already registered")]
    DuplicateType(String),
}

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Failure raised by component code.
    #[error("{0}")]
    Message(String),
}

impl ComponentError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

// ============================================================================
// Behaviour
// ============================================================================

/// Behaviour shared by every instance of a component type.
///
/// Only [`template`](Component::template) is required. State lives in the
/// instance; hooks reach it through the [`Scope`].
pub trait Component: Send + Sync + 'static {
    /// Declare state cells, watchers and runtime methods. Runs once per instance.
    fn setup(&self, _cx: &mut Scope<'_>) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Inline markup. Returning an empty string falls back to the renderer.
    fn template(&self, cx: &mut Scope<'_>) -> Result<String, ComponentError>;

    /// Renderer template used when [`template`](Component::template) is empty.
    fn template_name(&self) -> Option<&str> {
        None
    }

    /// Extra data handed to the renderer alongside the state values.
    fn view_data(&self, _cx: &mut Scope<'_>) -> Map<String, Value> {
        Map::new()
    }

    fn style(&self) -> Option<&str> {
        None
    }

    /// Scope [`style`](Component::style) selectors to the instance identity.
    fn scoped_style(&self) -> bool {
        true
    }

    fn script(&self) -> Option<&str> {
        None
    }

    /// Names of the cells sent to the client. Empty exposes every cell.
    fn exposed_states(&self) -> &[&'static str] {
        &[]
    }

    fn expose_states(&self) -> bool {
        !self.exposed_states().is_empty()
    }

    fn on_before_action(
        &self,
        _cx: &mut Scope<'_>,
        _method: &str,
        _args: &[Value],
    ) -> Result<(), ComponentError> {
        Ok(())
    }

    fn on_after_action(&self, _cx: &mut Scope<'_>) -> Result<(), ComponentError> {
        Ok(())
    }

    /// React to an emitted event. `None` or `Some(false)` means "not interested".
    fn on_event(
        &self,
        _cx: &mut Scope<'_>,
        _event: &Event,
    ) -> Result<Option<Value>, ComponentError> {
        Ok(None)
    }

    /// Whether pages containing this component may be served from the page cache.
    fn cache_enabled(&self) -> bool {
        true
    }
}
