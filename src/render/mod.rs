//! Template renderer collaborator.
//!
//! Used only when a component's own template returns empty markup.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::utils::{html::escape, json::scalar_to_string};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("failed to read template `{0}`: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("template `{name}`: {message}")]
    Template { name: String, message: String },
}

/// Render a named template with a data bag.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, data: &Map<String, Value>) -> Result<String, RenderError>;
}

/// Treats the template name as inline markup and returns it verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl TemplateRenderer for HtmlRenderer {
    fn render(&self, template: &str, _data: &Map<String, Value>) -> Result<String, RenderError> {
        if template.trim().is_empty() {
            return Err(RenderError::NotFound(template.to_owned()));
        }
        Ok(template.to_owned())
    }
}

/// Loads `{root}/{name}.html` and substitutes `{{ key }}` with escaped values.
#[derive(Debug, Clone)]
pub struct FileRenderer {
    root: PathBuf,
}

impl FileRenderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, template: &str) -> Option<PathBuf> {
        if template.is_empty() || template.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            return None;
        }
        Some(self.root.join(format!("{template}.html")))
    }
}

impl TemplateRenderer for FileRenderer {
    fn render(&self, template: &str, data: &Map<String, Value>) -> Result<String, RenderError> {
        let path = self
            .path_for(template)
            .ok_or_else(|| RenderError::NotFound(template.to_owned()))?;
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::NotFound(template.to_owned()));
            }
            Err(e) => return Err(RenderError::Io(path, e)),
        };
        Ok(substitute(&source, data))
    }
}

/// Replace `{{ key }}` placeholders; unknown keys render empty.
pub fn substitute(source: &str, data: &Map<String, Value>) -> String {
    static RE_PLACEHOLDER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

    RE_PLACEHOLDER
        .replace_all(source, |caps: &Captures| match data.get(&caps[1]) {
            Some(value @ (Value::Array(_) | Value::Object(_))) => {
                escape(&value.to_string()).into_owned()
            }
            Some(value) => escape(&scalar_to_string(value)).into_owned(),
            None => String::new(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn data(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_html_renderer_passthrough() {
        let r = HtmlRenderer;
        assert_eq!(r.render("<p>hi</p>", &Map::new()).unwrap(), "<p>hi</p>");
        assert!(matches!(r.render("  ", &Map::new()), Err(RenderError::NotFound(_))));
    }

    #[test]
    fn test_substitute_escapes_values() {
        let out = substitute(
            "<b>{{ name }}</b>{{missing}}",
            &data(json!({"name": "<Ann>"})),
        );
        assert_eq!(out, "<b>&lt;Ann&gt;</b>");
    }

    #[test]
    fn test_file_renderer() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cards")).unwrap();
        std::fs::write(dir.path().join("cards/user.html"), "<div>{{ count }}</div>").unwrap();

        let r = FileRenderer::new(dir.path());
        assert_eq!(
            r.render("cards/user", &data(json!({"count": 3}))).unwrap(),
            "<div>3</div>"
        );
        assert!(matches!(
            r.render("cards/none", &Map::new()),
            Err(RenderError::NotFound(_))
        ));
        assert!(matches!(
            r.render("../etc/passwd", &Map::new()),
            Err(RenderError::NotFound(_))
        ));
    }
}
