//! Shared fixtures for engine, expansion and protocol tests.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Value, json};

use super::{Action, Component, ComponentError, ComponentType, PageMeta, Registry, Scope};
use crate::config::{Env, SurgeConfig};
use crate::core::Engine;
use crate::event::Event;
use crate::state::StateSpec;
use crate::utils::html::escape;
use crate::utils::json::scalar_to_string;

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";

const PARENT_MARKUP: &str = concat!(
    "<section>",
    r#"<child-component greeting="hi" class="extra" data-role="kid"></child-component>"#,
    "</section>"
);

/// Component rendering fixed markup.
pub struct Static(pub &'static str);

impl Component for Static {
    fn template(&self, _cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok(self.0.to_owned())
    }
}

struct Counter;

impl Component for Counter {
    fn setup(&self, cx: &mut Scope<'_>) -> Result<(), ComponentError> {
        cx.state("count", 0)?;
        cx.register_method("reset", 0, 1, |cx, args| {
            let to = args.first().cloned().unwrap_or(json!(0));
            cx.set("count", to)?;
            Ok(Value::Null)
        });
        Ok(())
    }

    fn template(&self, cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok(format!(
            r#"<strong class="count">Count</strong> <span data-update="count@value">{}</span>"#,
            cx.get_i64("count")
        ))
    }

    fn style(&self) -> Option<&str> {
        Some(".count { font-weight: bold }")
    }

    fn script(&self) -> Option<&str> {
        Some("window.counterReady = true;")
    }

    fn exposed_states(&self) -> &[&'static str] {
        &["count"]
    }
}

struct TagList;

impl Component for TagList {
    fn setup(&self, cx: &mut Scope<'_>) -> Result<(), ComponentError> {
        cx.state("tags", json!([]))?;
        Ok(())
    }

    fn template(&self, cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        let items: Vec<String> = match cx.get("tags") {
            Value::Array(tags) => tags
                .iter()
                .map(|t| format!("<li>{}</li>", escape(&scalar_to_string(t))))
                .collect(),
            _ => Vec::new(),
        };
        Ok(format!("<ul>{}</ul>", items.join("")))
    }
}

struct Child;

impl Component for Child {
    fn setup(&self, cx: &mut Scope<'_>) -> Result<(), ComponentError> {
        cx.state("greeting", "hello")?;
        Ok(())
    }

    fn template(&self, cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        let footer = cx.named_slot("footer").unwrap_or_default().to_owned();
        Ok(format!(
            r#"<p class="greeting">{}</p>{}{}"#,
            escape(&cx.get_str("greeting")),
            cx.slot(),
            footer
        ))
    }
}

struct Shell;

impl Component for Shell {
    fn template(&self, cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok(format!(
            "<html><head><title>t</title></head><body>{}</body></html>",
            cx.slot()
        ))
    }
}

struct Renderless;

impl Component for Renderless {
    fn template(&self, _cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok(String::new())
    }

    fn template_name(&self) -> Option<&str> {
        Some("<p>from renderer</p>")
    }
}

struct Clock;

impl Component for Clock {
    fn template(&self, _cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok("<time>now</time>".into())
    }

    fn cache_enabled(&self) -> bool {
        false
    }
}

/// Re-renders with the payload of every `counted` event.
struct Listener;

impl Component for Listener {
    fn setup(&self, cx: &mut Scope<'_>) -> Result<(), ComponentError> {
        cx.state("last", Value::Null)?;
        Ok(())
    }

    fn template(&self, cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok(format!("<em>{}</em>", cx.get_str("last")))
    }

    fn on_event(&self, cx: &mut Scope<'_>, event: &Event) -> Result<Option<Value>, ComponentError> {
        if event.name != "counted" {
            return Ok(None);
        }
        cx.set("last", event.payload.clone())?;
        Ok(Some(event.payload.clone()))
    }
}

/// Embeds itself `levels` times.
struct Nest;

impl Component for Nest {
    fn setup(&self, cx: &mut Scope<'_>) -> Result<(), ComponentError> {
        cx.state("levels", 0)?;
        Ok(())
    }

    fn template(&self, cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok(match cx.get_i64("levels") {
            0 => "<i>leaf</i>".to_owned(),
            n => format!(r#"<nest-component levels="{}"></nest-component>"#, n - 1),
        })
    }
}

struct Vault;

impl Component for Vault {
    fn setup(&self, cx: &mut Scope<'_>) -> Result<(), ComponentError> {
        cx.state_with("owner", StateSpec::new("alice").protected())?;
        cx.state_with("size", StateSpec::new("sm").allowed(["sm", "md", "lg"]))?;
        Ok(())
    }

    fn template(&self, cx: &mut Scope<'_>) -> Result<String, ComponentError> {
        Ok(format!("<b>{}</b>", cx.get_str("size")))
    }

    fn expose_states(&self) -> bool {
        true
    }
}

/// Types used across the test suites.
///
/// | Type                          | Notes                                 |
/// |-------------------------------|---------------------------------------|
/// | `app::widgets::CounterComponent` | `count`, actions, runtime `reset`  |
/// | `app::widgets::TagListComponent` | list property `tags`, deleter      |
/// | `app::widgets::ChildComponent`   | `greeting`, slots                  |
/// | `app::widgets::ParentComponent`  | embeds `<child-component>`         |
/// | `app::widgets::PingComponent`    | mutual recursion with Pong         |
/// | `app::widgets::NestComponent`    | self-embedding `levels` deep       |
pub fn registry() -> Registry {
    let mut reg = Registry::new();
    let types = [
        ComponentType::new("app::widgets::CounterComponent", Counter)
            .property("count", crate::state::StateKind::Int)
            .action(
                "increment",
                Action::new(|cx, _| {
                    let next = cx.get_i64("count") + 1;
                    cx.set("count", next)?;
                    Ok(json!(next))
                }),
            )
            .action(
                "add",
                Action::new(|cx, args| {
                    let by = args.first().and_then(Value::as_i64).unwrap_or(0);
                    let next = cx.get_i64("count") + by;
                    cx.set("count", next)?;
                    Ok(json!(next))
                })
                .params(1),
            )
            .action(
                "notify",
                Action::new(|cx, _| {
                    let count = cx.get("count");
                    cx.emit("counted", count);
                    Ok(Value::Null)
                }),
            )
            .action("current_filter", Action::new(|cx, _| Ok(cx.get("filter"))))
            .action("wipe", Action::new(|_, _| Ok(Value::Null)).private())
            .action("__internal", Action::new(|_, _| Ok(Value::Null))),
        ComponentType::new("app::widgets::TagListComponent", TagList)
            .list_property("tags")
            .action(
                "deleteItem",
                Action::new(|cx, args| {
                    let target = args.first().cloned().unwrap_or(Value::Null);
                    let remaining: Vec<Value> = match cx.get("tags") {
                        Value::Array(tags) => tags.into_iter().filter(|t| *t != target).collect(),
                        _ => Vec::new(),
                    };
                    cx.set("tags", Value::Array(remaining))?;
                    Ok(Value::Bool(false))
                })
                .params(1),
            ),
        ComponentType::new("app::widgets::ChildComponent", Child),
        ComponentType::new("app::widgets::ParentComponent", Static(PARENT_MARKUP)),
        ComponentType::new(
            "app::widgets::PingComponent",
            Static("<pong-component></pong-component>"),
        ),
        ComponentType::new(
            "app::widgets::PongComponent",
            Static("<ping-component></ping-component>"),
        ),
        ComponentType::new("app::widgets::NestComponent", Nest),
        ComponentType::new("app::widgets::BaseWidgetComponent", Static("")).abstract_type(),
        ComponentType::new("app::widgets::ViewComponent", Renderless),
        ComponentType::new("app::widgets::ClockComponent", Clock),
        ComponentType::new("app::widgets::ListenerComponent", Listener),
        ComponentType::new("app::widgets::VaultComponent", Vault),
        ComponentType::new(
            "app::pages::HomePage",
            Static("<main><child-component></child-component></main>"),
        )
        .page(PageMeta::new("/").layout("app::layouts::MainLayout")),
        ComponentType::new("app::pages::LeakPage", Static(r#"{"fragments": {}}"#))
            .page(PageMeta::new("/leak")),
        ComponentType::new(
            "app::pages::ClockPage",
            Static("<main><clock-component></clock-component></main>"),
        )
        .page(PageMeta::new("/clock")),
        ComponentType::new("app::layouts::MainLayout", Shell).layout(),
    ];
    for ty in types {
        reg.register(ty).unwrap();
    }
    reg
}

pub fn config() -> SurgeConfig {
    let mut config = SurgeConfig::default();
    config.engine.env = Env::Dev;
    config.engine.index_path = PathBuf::new();
    config
}

pub fn engine() -> Arc<Engine> {
    Arc::new(Engine::new(Arc::new(config()), registry()).unwrap())
}

pub fn engine_with_key() -> Arc<Engine> {
    let mut config = config();
    config.state.encryption_key = Some(SECRET.to_owned());
    Arc::new(Engine::new(Arc::new(config), registry()).unwrap())
}
