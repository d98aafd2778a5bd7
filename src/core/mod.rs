//! Engine and request context.
//!
//! The [`Engine`] is built once at startup and shared across threads. It owns
//! everything that is fixed for the life of the process: configuration, the
//! type registry, the component index, the state cipher, the renderer and
//! the page cache. Each request gets a fresh [`RequestContext`].

mod context;
mod state;

pub use context::RequestContext;
pub use state::{is_shutdown, register_server, setup_shutdown_handler};

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::cache::{PageCacheManager, PageRequest};
use crate::component::{ComponentError, ComponentIndex, Registry, SLOT_KEY, create};
use crate::config::SurgeConfig;
use crate::render::{HtmlRenderer, TemplateRenderer};
use crate::state::{StateCipher, StateError};
use crate::utils::html::inject_before;
use crate::{debug, log};

pub struct Engine {
    config: Arc<SurgeConfig>,
    registry: Arc<Registry>,
    index: ComponentIndex,
    cipher: Option<Arc<StateCipher>>,
    renderer: Arc<dyn TemplateRenderer>,
    page_cache: Option<PageCacheManager>,
}

impl Engine {
    /// Build an engine. Fails only when the encryption key is too weak.
    pub fn new(config: Arc<SurgeConfig>, registry: Registry) -> Result<Self, StateError> {
        let cipher = match config.state.encryption_key.as_deref() {
            Some(key) => Some(Arc::new(StateCipher::new(key)?)),
            None => None,
        };

        let registry = Arc::new(registry);
        let index = ComponentIndex::new(
            Arc::clone(&registry),
            config.engine.index_file().cloned(),
            config.engine.namespaces.clone(),
        );

        Ok(Self {
            config,
            registry,
            index,
            cipher,
            renderer: Arc::new(HtmlRenderer),
            page_cache: None,
        })
    }

    pub fn with_renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn with_page_cache(mut self, cache: PageCacheManager) -> Self {
        self.page_cache = Some(cache);
        self
    }

    pub fn config(&self) -> &SurgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn index(&self) -> &ComponentIndex {
        &self.index
    }

    pub fn cipher(&self) -> Option<Arc<StateCipher>> {
        self.cipher.clone()
    }

    pub fn renderer(&self) -> &Arc<dyn TemplateRenderer> {
        &self.renderer
    }

    pub fn page_cache(&self) -> Option<&PageCacheManager> {
        self.page_cache.as_ref()
    }

    /// Fresh context for an action request.
    pub fn context(self: &Arc<Self>) -> RequestContext {
        RequestContext::new(Arc::clone(self), None)
    }

    /// Fresh context for rendering the page at `route`.
    pub fn context_for(self: &Arc<Self>, route: &str) -> RequestContext {
        RequestContext::new(Arc::clone(self), Some(route.to_owned()))
    }

    /// Render the page registered for `request.path`.
    ///
    /// Returns `Ok(None)` when no page matches. The page is wrapped in its
    /// layout, collected styles go before `</head>` and scripts before
    /// `</body>`.
    pub fn render_page(
        self: &Arc<Self>,
        request: &PageRequest,
    ) -> Result<Option<String>, ComponentError> {
        let Some((ty, meta)) = self
            .registry
            .route(&request.path)
            .and_then(|ty| Some((Arc::clone(ty), ty.page_meta()?.clone())))
        else {
            debug!("page"; "no page for {}", request.path);
            return Ok(None);
        };

        if let Some(cache) = &self.page_cache
            && let Some(html) = cache.get(request, &meta)
        {
            return Ok(Some(html));
        }

        let mut ctx = self.context_for(&request.path);
        let mut page = create(&mut ctx, ty.name(), Map::new())?;
        let mut html = page.render(&mut ctx, None)?.into_body();

        if let Some(layout) = meta.layout.as_deref() {
            let mut defaults = Map::new();
            defaults.insert(SLOT_KEY.to_owned(), Value::String(html));
            let mut layout = create(&mut ctx, layout, defaults)?;
            html = layout.render(&mut ctx, None)?.into_body();
        }

        if let Some(styles) = ctx.styles.render() {
            html = inject_before(&html, "</head>", &styles)
                .unwrap_or_else(|| format!("{styles}{html}"));
        }
        if let Some(scripts) = ctx.scripts.render() {
            html = inject_before(&html, "</body>", &scripts)
                .unwrap_or_else(|| format!("{html}{scripts}"));
        }

        if let Some(cache) = &self.page_cache {
            if ctx.page_cache_disabled() {
                debug!("cache"; "skip {} (disabled while rendering)", request.path);
            } else {
                cache.put(request, &html, &meta);
            }
        }

        log!("page"; "rendered {} ({})", request.path, ty.name());
        Ok(Some(html))
    }
}
