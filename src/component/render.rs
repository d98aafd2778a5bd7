//! Instance render pipeline.
//!
//! ```text
//! template() ─► expand ─► collect css/js ─┬─► fragments (update group)
//!                                         └─► renderer fallback ─► wrap
//! ```

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{Component, ComponentError, ComponentInstance, ComponentKind, IDENTITY_ATTR, Scope};
use crate::collect::scope_css;
use crate::core::RequestContext;
use crate::markup;
use crate::render::RenderError;
use crate::utils::html::escape_attr;

/// Fragment-group rendering result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentEnvelope {
    /// `group@key` -> fragment markup, in document order.
    pub fragments: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Html(String),
    Fragments(FragmentEnvelope),
}

impl Rendered {
    /// Markup, or the JSON-encoded envelope.
    pub fn into_body(self) -> String {
        match self {
            Self::Html(html) => html,
            Self::Fragments(envelope) => serde_json::to_string(&envelope).unwrap_or_default(),
        }
    }

    pub fn is_fragments(&self) -> bool {
        matches!(self, Self::Fragments(_))
    }
}

impl ComponentInstance {
    /// Render the instance.
    ///
    /// With an `update` group (no `@`) whose markers exist in the output, the
    /// result is a fragment envelope; otherwise full markup wrapped in an
    /// identity-bearing `<div>` unless the type is a page or layout.
    pub fn render(
        &mut self,
        ctx: &mut RequestContext,
        update: Option<&str>,
    ) -> Result<Rendered, ComponentError> {
        let ty = self.ty.clone();
        let behavior = ty.behavior().clone();

        ctx.engine().index().register_namespace(ty.namespace());
        if !behavior.cache_enabled() {
            ctx.disable_page_cache();
        }

        let template = behavior.template(&mut Scope::new(self, ctx))?;
        let markup = markup::expand(ctx, &template)?;

        self.collect_assets(ctx, behavior.as_ref());
        let states = self.exposed_json()?;

        if let Some(group) = update.filter(|g| !g.is_empty() && !g.contains('@')) {
            let fragments = markup::extract_fragments(&markup, group);
            if !fragments.is_empty() {
                return Ok(Rendered::Fragments(FragmentEnvelope {
                    fragments,
                    styles: ctx.styles.render(),
                    states,
                }));
            }
            crate::debug!(
                "component";
                "no `{}@*` fragments in {}, rendering fully", group, self.identity
            );
        }

        let content = if markup.trim().is_empty() {
            self.render_fallback(ctx, behavior.as_ref())?
        } else {
            markup
        };
        let content = content.trim();

        Ok(Rendered::Html(match ty.kind() {
            ComponentKind::Page | ComponentKind::Layout => content.to_owned(),
            ComponentKind::Component => self.wrap(content, states.as_deref()),
        }))
    }

    fn collect_assets(&self, ctx: &mut RequestContext, behavior: &dyn Component) {
        if let Some(css) = behavior.style() {
            if behavior.scoped_style() {
                ctx.styles.add_css(&scope_css(css, &self.identity));
            } else {
                ctx.styles.add_css(css);
            }
        }
        if let Some(js) = behavior.script() {
            ctx.scripts.add_code(js);
        }
    }

    /// Render through the renderer collaborator. A missing template renders empty.
    fn render_fallback(
        &mut self,
        ctx: &mut RequestContext,
        behavior: &dyn Component,
    ) -> Result<String, ComponentError> {
        let Some(name) = behavior.template_name() else {
            return Ok(String::new());
        };

        let mut data = behavior.view_data(&mut Scope::new(self, ctx));
        for cell in self.state.cells() {
            data.entry(cell.name().to_owned())
                .or_insert_with(|| cell.value());
        }
        data.insert("slot".into(), Value::String(self.slot.clone()));

        let engine = ctx.engine().clone();
        match engine.renderer().render(name, &data) {
            Ok(html) => Ok(markup::expand(ctx, &html)?),
            Err(RenderError::NotFound(_)) => {
                crate::debug!("component"; "template `{}` not found for {}", name, self.identity);
                Ok(String::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn wrap(&self, content: &str, states: Option<&str>) -> String {
        let mut out = format!("<div {IDENTITY_ATTR}=\"{}\"", escape_attr(&self.identity));
        if let Some(states) = states {
            out.push_str(&format!(" data-states=\"{}\"", escape_attr(states)));
        }
        if !self.slot.is_empty() {
            out.push_str(&format!(" data-slot=\"{}\"", STANDARD.encode(&self.slot)));
        }
        out.push('>');
        out.push_str(content);
        out.push_str("</div>");
        out
    }
}
