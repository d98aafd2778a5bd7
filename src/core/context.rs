//! Per-request state.
//!
//! Every cache that outlives a single component call but must not outlive the
//! request lives here: the instance cache, asset collectors, the event queue,
//! local storage, and the identity counters. A context is created from an
//! [`Engine`] at request start and dropped with the response.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::Engine;
use crate::collect::{ScriptCollector, StyleCollector};
use crate::component::ComponentInstance;
use crate::event::EventBus;
use crate::store::Store;

pub struct RequestContext {
    engine: Arc<Engine>,
    route: Option<String>,

    /// Instances resolved earlier in this request, keyed by identity.
    instances: FxHashMap<String, ComponentInstance>,

    /// `<prefix>_imbrication_<n>` counters, per prefix.
    imbrications: FxHashMap<String, usize>,
    /// `<prefix>_<n>` counters for factory-created instances.
    identities: FxHashMap<String, usize>,

    depth: usize,
    page_cache_disabled: bool,

    pub styles: StyleCollector,
    pub scripts: ScriptCollector,
    pub events: EventBus,
    pub store: Store,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("route", &self.route)
            .field("instances", &self.instances.len())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    pub fn new(engine: Arc<Engine>, route: Option<String>) -> Self {
        Self {
            engine,
            route,
            instances: FxHashMap::default(),
            imbrications: FxHashMap::default(),
            identities: FxHashMap::default(),
            depth: 0,
            page_cache_disabled: false,
            styles: StyleCollector::new(),
            scripts: ScriptCollector::new(),
            events: EventBus::new(),
            store: Store::new(),
        }
    }

    #[inline]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Route of the page that started the request, if any.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    // =========================================================================
    // Instance cache
    // =========================================================================

    /// Take a cached instance out while it runs.
    pub fn checkout(&mut self, identity: &str) -> Option<ComponentInstance> {
        self.instances.remove(identity)
    }

    /// Return an instance to the cache for later calls in this request.
    pub fn checkin(&mut self, instance: ComponentInstance) {
        self.instances.insert(instance.identity().to_owned(), instance);
    }

    pub fn is_cached(&self, identity: &str) -> bool {
        self.instances.contains_key(identity)
    }

    // =========================================================================
    // Identity counters
    // =========================================================================

    /// Next expansion counter for `prefix`, starting at 1.
    pub fn next_imbrication(&mut self, prefix: &str) -> usize {
        bump(&mut self.imbrications, prefix)
    }

    /// Next factory counter for `prefix`, starting at 1.
    pub fn next_identity(&mut self, prefix: &str) -> usize {
        bump(&mut self.identities, prefix)
    }

    // =========================================================================
    // Expansion depth
    // =========================================================================

    pub fn expansion_depth(&self) -> usize {
        self.depth
    }

    pub fn set_expansion_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    // =========================================================================
    // Page cache opt-out
    // =========================================================================

    pub fn disable_page_cache(&mut self) {
        self.page_cache_disabled = true;
    }

    pub fn page_cache_disabled(&self) -> bool {
        self.page_cache_disabled
    }
}

fn bump(counters: &mut FxHashMap<String, usize>, prefix: &str) -> usize {
    let n = counters.entry(prefix.to_owned()).or_insert(0);
    *n += 1;
    *n
}
