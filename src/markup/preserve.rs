//! Literal regions that must survive expansion byte for byte.
//!
//! `<code>`, `<pre>`, `<script>`, `<style>`, `<textarea>`, comments and the
//! doctype are swapped for private-use placeholders before parsing, so the
//! parser never sees them and custom tags inside them are never expanded.

use std::sync::LazyLock;

use regex::{Captures, Regex};

const OPEN: char = '\u{E000}';
const CLOSE: char = '\u{E001}';

static RE_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)<code\b[^>]*>.*?</code\s*>",
        r"|<pre\b[^>]*>.*?</pre\s*>",
        r"|<script\b[^>]*>.*?</script\s*>",
        r"|<style\b[^>]*>.*?</style\s*>",
        r"|<textarea\b[^>]*>.*?</textarea\s*>",
        r"|<!--.*?-->",
        r"|<!doctype[^>]*>",
    ))
    .unwrap()
});

static RE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").unwrap());

#[derive(Debug, Default)]
pub(crate) struct Preserved {
    regions: Vec<String>,
}

impl Preserved {
    /// Replace literal regions with placeholders.
    pub fn protect(&mut self, text: &str) -> String {
        RE_REGION
            .replace_all(text, |caps: &Captures| {
                self.regions.push(caps[0].to_owned());
                format!("{OPEN}{}{CLOSE}", self.regions.len() - 1)
            })
            .into_owned()
    }

    /// Put the original regions back.
    pub fn restore(&self, text: &str) -> String {
        if self.regions.is_empty() || !text.contains(OPEN) {
            return text.to_owned();
        }
        RE_PLACEHOLDER
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| self.regions.get(i))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_owned())
            })
            .into_owned()
    }
}
