//! JS collection: external files and inline code.

use rustc_hash::FxHashSet;

use crate::utils::{hash, html::escape_attr};

#[derive(Debug, Default)]
pub struct ScriptCollector {
    files: Vec<(String, bool)>,
    code: Vec<String>,
    seen_code: FxHashSet<String>,
}

impl ScriptCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an external script, deduplicated by path.
    pub fn add_file(&mut self, src: &str, defer: bool) {
        if !self.files.iter().any(|(s, _)| s == src) {
            self.files.push((src.to_owned(), defer));
        }
    }

    /// Add inline code. Returns `false` for an identical block.
    pub fn add_code(&mut self, js: &str) -> bool {
        let js = js.trim();
        if js.is_empty() || !self.seen_code.insert(hash::fingerprint(js)) {
            return false;
        }
        self.code.push(js.to_owned());
        true
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.code.is_empty()
    }

    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut out = String::new();
        for (src, defer) in &self.files {
            let defer = if *defer { " defer" } else { "" };
            out.push_str(&format!("<script src=\"{}\"{defer}></script>", escape_attr(src)));
        }
        for js in &self.code {
            out.push_str(&format!("<script>{js}</script>"));
        }
        Some(out)
    }
}
