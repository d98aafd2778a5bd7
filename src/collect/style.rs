//! CSS collection and identity scoping.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use rustc_hash::FxHashSet;

use crate::component::IDENTITY_ATTR;
use crate::utils::{hash, html::escape_attr};

/// `id` of the `<style>` element holding collected component CSS.
pub const STYLE_ELEMENT_ID: &str = "surge-dynamic-styles";

#[derive(Debug, Default)]
pub struct StyleCollector {
    blocks: Vec<String>,
    seen: FxHashSet<String>,
    sheets: Vec<String>,
}

impl StyleCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a CSS block. Returns `false` if an identical block was already added.
    pub fn add_css(&mut self, css: &str) -> bool {
        let css = css.trim();
        if css.is_empty() || !self.seen.insert(hash::fingerprint(css)) {
            return false;
        }
        self.blocks.push(css.to_owned());
        true
    }

    /// Add an external stylesheet, deduplicated by href.
    pub fn add_sheet(&mut self, href: &str) {
        if !self.sheets.iter().any(|s| s == href) {
            self.sheets.push(href.to_owned());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.sheets.is_empty()
    }

    /// Raw collected CSS, blocks separated by newlines.
    pub fn css(&self) -> String {
        self.blocks.join("\n")
    }

    /// `<link>` tags followed by the dynamic `<style>` element.
    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut out = String::new();
        for href in &self.sheets {
            out.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\">", escape_attr(href)));
        }
        if !self.blocks.is_empty() {
            out.push_str(&format!("<style id=\"{STYLE_ELEMENT_ID}\">{}</style>", self.css()));
        }
        Some(out)
    }
}

/// Prefix every selector group with the instance identity attribute.
///
/// At-rules and keyframe steps are left untouched.
pub fn scope_css(css: &str, identity: &str) -> String {
    static RE_SELECTOR: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s*([^{}]+?)\s*\{").unwrap());

    let scope = format!("[{IDENTITY_ATTR}=\"{identity}\"]");
    RE_SELECTOR
        .replace_all(css, |caps: &Captures| {
            let group = &caps[1];
            if group.starts_with('@') {
                return format!("{group} {{");
            }
            let selectors: Vec<String> = group
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    if is_keyframe_step(s) {
                        s.to_owned()
                    } else {
                        format!("{scope} {s}")
                    }
                })
                .collect();
            format!("{} {{", selectors.join(", "))
        })
        .into_owned()
}

fn is_keyframe_step(selector: &str) -> bool {
    selector == "from" || selector == "to" || selector.ends_with('%')
}
