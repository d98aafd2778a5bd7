//! Fixed-point expansion of custom component tags.
//!
//! Each pass walks the tree, renders every element whose name is a known
//! custom tag and splices the result in its place. Rendered output is not
//! walked again within the same pass; the component already expanded its own
//! template. Passes repeat until one makes no substitution.
//!
//! Nesting depth is carried on the request context, so recursion through a
//! child's own `render` counts against the same [`MAX_PASSES`] ceiling as
//! passes at the top level.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use super::preserve::Preserved;
use super::{Element, Node, parse, serialize};
use crate::component::identity::imbrication_identity;
use crate::component::{
    ComponentError, ComponentInstance, ComponentType, IDENTITY_ATTR, NAMED_SLOT_PREFIX, Rendered,
    SLOT_KEY, TagTable,
};
use crate::core::RequestContext;
use crate::log;
use crate::utils::{case::camel, json::looks_like_json};

/// Ceiling on nesting depth plus rewrite passes for one expansion.
pub const MAX_PASSES: usize = 10;

/// Attribute marking an addressable fragment (`group@key`).
const FRAGMENT_ATTR: &str = "data-update";

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error(
        "markup expansion exceeded {limit} passes, components are probably embedding each other"
    )]
    Runaway { limit: usize },

    #[error("component `{identity}` returned a JSON envelope where markup was expected")]
    FragmentLeak { identity: String },
}

/// Expand every custom component tag in `markup`.
///
/// Markup without custom tags comes back unchanged apart from line ending
/// normalization and BOM removal.
///
/// The [`MAX_PASSES`] ceiling covers nesting depth plus rewrite passes
/// combined: a component nested `n` levels down starts its own expansion at
/// pass `n + 1`. A finite tree deeper than the ceiling fails with
/// [`ExpandError::Runaway`] just like circular embedding does.
pub fn expand(ctx: &mut RequestContext, markup: &str) -> Result<String, ComponentError> {
    let normalized = normalize(markup);

    let mut tags = ctx.engine().index().tags();
    if !mentions_tag(&normalized, &tags) {
        return Ok(normalized);
    }

    let depth = ctx.expansion_depth();
    let mut preserved = Preserved::default();
    let mut nodes = parse(&preserved.protect(&normalized));

    let mut substituted = false;
    let mut pass = 1;
    while rewrite(ctx, &mut nodes, &tags, &mut preserved, depth + pass)? {
        substituted = true;
        pass += 1;
        // Rendering may have registered new namespaces
        tags = ctx.engine().index().tags();
    }

    if !substituted {
        return Ok(normalized);
    }
    Ok(preserved.restore(&serialize(&nodes)))
}

fn normalize(markup: &str) -> String {
    let text = markup.strip_prefix('\u{FEFF}').unwrap_or(markup);
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_owned()
    }
}

fn mentions_tag(markup: &str, tags: &TagTable) -> bool {
    if tags.is_empty() || !markup.contains('<') {
        return false;
    }
    let lower = markup.to_ascii_lowercase();
    tags.keys().any(|tag| lower.contains(&format!("<{tag}")))
}

/// One pass over `nodes`. Returns whether anything was substituted.
fn rewrite(
    ctx: &mut RequestContext,
    nodes: &mut Vec<Node>,
    tags: &TagTable,
    preserved: &mut Preserved,
    level: usize,
) -> Result<bool, ComponentError> {
    let mut changed = false;
    let mut i = 0;

    while i < nodes.len() {
        let replacement = match &mut nodes[i] {
            Node::Element(el) => match tags.get(el.name.as_str()) {
                Some(ty) => Some(render_tag(ctx, el, ty, preserved, level)?),
                None => {
                    changed |= rewrite(ctx, &mut el.children, tags, preserved, level)?;
                    None
                }
            },
            _ => None,
        };

        match replacement {
            Some(rendered) => {
                let len = rendered.len();
                nodes.splice(i..=i, rendered);
                i += len;
                changed = true;
            }
            None => i += 1,
        }
    }
    Ok(changed)
}

fn render_tag(
    ctx: &mut RequestContext,
    tag: &Element,
    ty: &Arc<ComponentType>,
    preserved: &mut Preserved,
    level: usize,
) -> Result<Vec<Node>, ComponentError> {
    if level > MAX_PASSES {
        log!("expand"; "<{}> still expanding after {} passes", tag.name, MAX_PASSES);
        return Err(ExpandError::Runaway { limit: MAX_PASSES }.into());
    }

    let mut defaults = Map::new();
    for (key, value) in &tag.attrs {
        defaults.insert(camel(key), Value::String(value.clone()));
    }

    let mut slot = String::new();
    for child in &tag.children {
        match child {
            Node::Element(el) if el.name == "slot" => {
                match el.attr("name").filter(|n| !n.is_empty()) {
                    Some(name) => {
                        let content = preserved.restore(&el.inner_html());
                        defaults.insert(
                            format!("{NAMED_SLOT_PREFIX}{name}"),
                            Value::String(content.trim().to_owned()),
                        );
                    }
                    None => slot.push_str(&el.inner_html()),
                }
            }
            other => slot.push_str(&serialize(std::slice::from_ref(other))),
        }
    }
    let slot = preserved.restore(&slot);
    if !slot.trim().is_empty() {
        defaults.insert(SLOT_KEY.to_owned(), Value::String(slot.trim().to_owned()));
    }

    let prefix = ty.index_prefix();
    let identity = imbrication_identity(&prefix, ctx.next_imbrication(&prefix));

    let previous = ctx.expansion_depth();
    ctx.set_expansion_depth(level);
    let rendered = render_child(ctx, ty, identity.clone(), defaults);
    ctx.set_expansion_depth(previous);

    let html = match rendered? {
        Rendered::Html(html) if !looks_like_json(&html) => html,
        _ => return Err(ExpandError::FragmentLeak { identity }.into()),
    };

    let mut nodes = parse(&preserved.protect(&html));
    merge_attributes(&mut nodes, tag);
    Ok(nodes)
}

fn render_child(
    ctx: &mut RequestContext,
    ty: &Arc<ComponentType>,
    identity: String,
    defaults: Map<String, Value>,
) -> Result<Rendered, ComponentError> {
    let route = ctx.route().map(str::to_owned);
    let mut instance = ComponentInstance::construct(ty.clone(), identity, route, defaults, ctx)?;
    instance.render(ctx, None)
}

/// Copy presentational attributes from the custom tag onto a single rendered root.
pub(super) fn merge_attributes(nodes: &mut [Node], tag: &Element) {
    let mut roots = nodes
        .iter_mut()
        .filter(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
    let (Some(Node::Element(root)), None) = (roots.next(), roots.next()) else {
        return;
    };

    for (key, value) in &tag.attrs {
        if key == IDENTITY_ATTR || !is_forwarded(key) {
            continue;
        }
        match key.as_str() {
            "class" => {
                let merged = union_classes(root.attr("class").unwrap_or_default(), value);
                root.set_attr("class", merged);
            }
            "style" => {
                let merged = match root.attr("style").map(str::trim).filter(|s| !s.is_empty()) {
                    Some(existing) => format!("{}; {}", existing.trim_end_matches(';'), value),
                    None => value.clone(),
                };
                root.set_attr("style", merged);
            }
            _ => root.set_attr(key, value.clone()),
        }
    }
}

fn is_forwarded(key: &str) -> bool {
    matches!(key, "id" | "class" | "style" | "title")
        || key.starts_with("data-")
        || key.starts_with("aria-")
}

fn union_classes(existing: &str, extra: &str) -> String {
    let mut classes: Vec<&str> = existing.split_whitespace().collect();
    for class in extra.split_whitespace() {
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
    classes.join(" ")
}

// ============================================================================
// Fragments
// ============================================================================

/// Every element whose fragment key starts with `group@`, in document order.
pub fn extract_fragments(markup: &str, group: &str) -> Map<String, Value> {
    let prefix = format!("{group}@");
    let mut preserved = Preserved::default();
    let nodes = parse(&preserved.protect(markup));

    let mut out = Map::new();
    visit(&nodes, &mut |el| {
        if let Some(key) = el.attr(FRAGMENT_ATTR).filter(|k| k.starts_with(&prefix)) {
            out.insert(
                key.to_owned(),
                Value::String(preserved.restore(&el.outer_html())),
            );
        }
    });
    out
}

/// Content of the fragment keyed exactly `key`: its inner markup, or the
/// element itself when empty.
pub fn find_fragment(markup: &str, key: &str) -> Option<String> {
    let mut preserved = Preserved::default();
    let nodes = parse(&preserved.protect(markup));

    let mut found = None;
    visit(&nodes, &mut |el| {
        if found.is_none() && el.attr(FRAGMENT_ATTR) == Some(key) {
            let html = if el.children.is_empty() { el.outer_html() } else { el.inner_html() };
            found = Some(preserved.restore(&html));
        }
    });
    found
}

fn visit(nodes: &[Node], f: &mut impl FnMut(&Element)) {
    for node in nodes {
        if let Node::Element(el) = node {
            f(el);
            visit(&el.children, f);
        }
    }
}
