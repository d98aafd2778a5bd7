//! Component type registration table.
//!
//! Everything the engine needs to know about a type is declared here, once,
//! at startup: its behaviour object, property schema, callable actions and
//! page routing metadata. Nothing is discovered at request time.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::identity::{derive_tags, index_prefix};
use super::{Component, ComponentError, ResolveError, Scope};
use crate::state::{Schema, StateKind};

/// Bound action handler.
pub type ActionFn =
    Arc<dyn Fn(&mut Scope<'_>, &[Value]) -> Result<Value, ComponentError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentKind {
    #[default]
    Component,
    Page,
    Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// A method a client action request may invoke.
#[derive(Clone)]
pub struct Action {
    handler: ActionFn,
    visibility: Visibility,
    required: usize,
    accepts: usize,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("visibility", &self.visibility)
            .field("required", &self.required)
            .field("accepts", &self.accepts)
            .finish_non_exhaustive()
    }
}

impl Action {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut Scope<'_>, &[Value]) -> Result<Value, ComponentError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            visibility: Visibility::Public,
            required: 0,
            accepts: 0,
        }
    }

    /// Number of required arguments.
    pub fn params(mut self, required: usize) -> Self {
        self.required = required;
        self.accepts = self.accepts.max(required);
        self
    }

    /// Number of optional arguments after the required ones.
    pub fn optional(mut self, count: usize) -> Self {
        self.accepts = self.required + count;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn accepts(&self) -> usize {
        self.accepts
    }

    pub fn call(&self, cx: &mut Scope<'_>, args: &[Value]) -> Result<Value, ComponentError> {
        (self.handler)(cx, args)
    }
}

/// Routing metadata for page types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub route: String,
    pub name: Option<String>,
    /// Fully-qualified name of the layout type wrapping the page.
    pub layout: Option<String>,
    /// `false` opts the page out of the page cache.
    pub cache: bool,
    /// Higher wins when several pages share a route.
    pub priority: i32,
}

impl PageMeta {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            name: None,
            layout: None,
            cache: true,
            priority: 0,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

// ============================================================================
// ComponentType
// ============================================================================

pub struct ComponentType {
    name: String,
    short_name: String,
    namespace: String,
    kind: ComponentKind,
    is_abstract: bool,
    tags: Vec<String>,
    schema: Arc<Schema>,
    actions: FxHashMap<String, Action>,
    page: Option<PageMeta>,
    behavior: Arc<dyn Component>,
}

impl std::fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("abstract", &self.is_abstract)
            .finish_non_exhaustive()
    }
}

impl ComponentType {
    /// Declare a type by its fully-qualified name (`app::widgets::CounterComponent`).
    pub fn new(name: impl Into<String>, behavior: impl Component) -> Self {
        let name = name.into();
        let (namespace, short_name) = match name.rsplit_once("::") {
            Some((ns, short)) => (ns.to_owned(), short.to_owned()),
            None => (String::new(), name.clone()),
        };
        Self {
            name,
            short_name,
            namespace,
            kind: ComponentKind::Component,
            is_abstract: false,
            tags: Vec::new(),
            schema: Arc::default(),
            actions: FxHashMap::default(),
            page: None,
            behavior: Arc::new(behavior),
        }
    }

    pub fn page(mut self, meta: PageMeta) -> Self {
        self.kind = ComponentKind::Page;
        self.page = Some(meta);
        self
    }

    pub fn layout(mut self) -> Self {
        self.kind = ComponentKind::Layout;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Add an explicit custom tag. Any explicit tag disables derivation.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into().to_ascii_lowercase());
        self
    }

    /// Declare the kind of a property, used for read coercion and hydration.
    pub fn property(mut self, name: impl Into<String>, kind: StateKind) -> Self {
        Arc::make_mut(&mut self.schema).insert(name.into(), kind);
        self
    }

    pub fn list_property(self, name: impl Into<String>) -> Self {
        self.property(name, StateKind::List)
    }

    pub fn action(mut self, name: impl Into<String>, action: Action) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Explicit tags, or the derived ones.
    pub fn tags(&self) -> Vec<String> {
        if self.tags.is_empty() {
            derive_tags(&self.short_name)
        } else {
            self.tags.clone()
        }
    }

    pub fn index_prefix(&self) -> String {
        index_prefix(&self.short_name)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn action_named(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    pub fn actions(&self) -> impl Iterator<Item = (&str, &Action)> {
        self.actions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn page_meta(&self) -> Option<&PageMeta> {
        self.page.as_ref()
    }

    pub fn behavior(&self) -> &Arc<dyn Component> {
        &self.behavior
    }

    /// Whether the type lives in `namespace` or one of its children.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace == namespace
            || self
                .namespace
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with("::"))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Every registered component type, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    types: Vec<Arc<ComponentType>>,
    by_name: FxHashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, ty: ComponentType) -> Result<Arc<ComponentType>, ResolveError> {
        if self.by_name.contains_key(ty.name()) {
            return Err(ResolveError::DuplicateType(ty.name().to_owned()));
        }
        let ty = Arc::new(ty);
        self.by_name.insert(ty.name().to_owned(), self.types.len());
        self.types.push(ty.clone());
        Ok(ty)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ComponentType>> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Distinct namespaces, sorted.
    pub fn namespaces(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.types.iter().map(|t| t.namespace()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Page types ordered by priority, highest first.
    pub fn pages(&self) -> Vec<&Arc<ComponentType>> {
        let mut pages: Vec<_> = self
            .types
            .iter()
            .filter(|t| t.page_meta().is_some() && !t.is_abstract())
            .collect();
        pages.sort_by_key(|t| std::cmp::Reverse(t.page_meta().map_or(0, |m| m.priority)));
        pages
    }

    /// Page type serving `path`, ignoring a trailing slash.
    pub fn route(&self, path: &str) -> Option<&Arc<ComponentType>> {
        let wanted = normalize_route(path);
        self.pages()
            .into_iter()
            .find(|t| t.page_meta().is_some_and(|m| normalize_route(&m.route) == wanted))
    }
}

fn normalize_route(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
