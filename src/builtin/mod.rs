//! Built-in demo namespace (`surge::builtin`).
//!
//! Registered by the CLI so `surge serve` answers something useful before
//! any application components exist: a welcome page at `/` embedding a
//! counter that talks to the action endpoint.

use serde_json::json;

use crate::component::{
    Action, Component, ComponentError, ComponentType, PageMeta, Registry, ResolveError, Scope,
};
use crate::protocol::ACTION_PATH;

pub const NAMESPACE: &str = "surge::builtin";

// ============================================================================
// CounterComponent
// ============================================================================

pub struct CounterComponent;

impl Component for CounterComponent {
    fn setup(&self, cx: &mut Scope<'_>) -> Result<(), ComponentError> {
        cx.state("count", 0)?;
        Ok(())
    }

    fn template(&self, cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok(format!(
            r#"<div class="counter">
  <button data-action="decrement" data-group="count">-</button>
  <output data-update="count@value">{}</output>
  <button data-action="increment" data-group="count">+</button>
</div>"#,
            cx.get_i64("count")
        ))
    }

    fn style(&self) -> Option<&str> {
        Some(".counter { display: inline-flex; gap: .5rem; align-items: center }")
    }

    fn exposed_states(&self) -> &[&'static str] {
        &["count"]
    }
}

fn step(by: i64) -> Action {
    Action::new(move |cx, _| {
        let next = cx.get_i64("count") + by;
        cx.set("count", next)?;
        Ok(json!(next))
    })
}

// ============================================================================
// WelcomePage
// ============================================================================

pub struct WelcomePage;

/// Minimal client: posts `data-action` clicks and patches the response in.
const CLIENT_JS: &str = r#"document.addEventListener('click', function (e) {
  var button = e.target.closest('[data-action]');
  var root = button && button.closest('[data-surge-id]');
  if (!root) return;
  fetch('__ACTION__', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({
      id: root.dataset.surgeId,
      states: JSON.parse(root.dataset.states || '{}'),
      action: button.dataset.action,
      update: button.dataset.group
    })
  }).then(function (r) { return r.json(); }).then(function (res) {
    if (res.error) return console.error(res.message);
    Object.keys(res.fragments || {}).forEach(function (key) {
      var el = root.querySelector('[data-update="' + key + '"]');
      if (el) el.outerHTML = res.fragments[key];
    });
    if (res.states) root.dataset.states = res.states;
    (res.updates || []).forEach(function (u) {
      var el = u.html && document.querySelector('[data-surge-id="' + u.component + '"]');
      if (el) el.outerHTML = u.html;
    });
  });
});"#;

impl Component for WelcomePage {
    fn template(&self, _cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>surge</title></head>
<body>
  <h1>surge {}</h1>
  <p>Register components under your own namespace to replace this page.</p>
  <counter-component></counter-component>
</body>
</html>"#,
            env!("CARGO_PKG_VERSION")
        ))
    }

    fn script(&self) -> Option<&str> {
        Some(client_js())
    }
}

fn client_js() -> &'static str {
    static JS: std::sync::LazyLock<String> =
        std::sync::LazyLock::new(|| CLIENT_JS.replace("__ACTION__", ACTION_PATH));
    &JS
}

// ============================================================================
// registry
// ============================================================================

/// Registry holding the built-in types.
pub fn registry() -> Result<Registry, ResolveError> {
    let mut registry = Registry::new();
    registry.register(
        ComponentType::new(format!("{NAMESPACE}::CounterComponent"), CounterComponent)
            .property("count", crate::state::StateKind::Int)
            .action("increment", step(1))
            .action("decrement", step(-1)),
    )?;
    registry.register(
        ComponentType::new(format!("{NAMESPACE}::WelcomePage"), WelcomePage)
            .page(PageMeta::new("/").name("welcome")),
    )?;
    Ok(registry)
}
