use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::*;
use crate::component::resolve;
use crate::component::testing::{config, engine, engine_with_key, registry};
use crate::config::{DEFAULT_MAX_PAYLOAD, Env};
use crate::core::{Engine, RequestContext};

// ============================================================================
// helpers
// ============================================================================

fn call(engine: &Arc<Engine>, body: Value) -> (u16, Value) {
    call_addressed(engine, body, &[])
}

fn call_addressed(engine: &Arc<Engine>, body: Value, addressed: &[&str]) -> (u16, Value) {
    let addressed: Vec<String> = addressed.iter().map(|s| s.to_string()).collect();
    let (status, body) = handle_action(engine, body.to_string().as_bytes(), &addressed);
    (status, serde_json::from_str(&body).unwrap())
}

/// Dispatch inside a caller-owned context so instances can be inspected.
fn dispatch_in(ctx: &mut RequestContext, body: Value) -> Result<ActionResponse, DispatchError> {
    let request = ActionRequest::decode(body.to_string().as_bytes(), DEFAULT_MAX_PAYLOAD)?;
    dispatch(ctx, request, &[])
}

fn states_of(response: &Value) -> Value {
    serde_json::from_str(response["states"].as_str().unwrap()).unwrap()
}

// ============================================================================
// actions
// ============================================================================

#[test]
fn test_increment_reports_update_and_states() {
    let engine = engine();
    let (status, v) = call(
        &engine,
        json!({"id": "counter-component_1", "action": "increment"}),
    );

    assert_eq!(status, 200);
    assert_eq!(v["updates"][0]["component"], "counter-component_1");
    assert_eq!(v["updates"][0]["result"], json!(true));
    let html = v["updates"][0]["html"].as_str().unwrap();
    assert!(html.contains(r#"<span data-update="count@value">1</span>"#));
    assert_eq!(states_of(&v), json!({"count": 1}));
}

#[test]
fn test_states_are_hydrated_before_the_action() {
    let engine = engine();
    let (_, v) = call(
        &engine,
        json!({"id": "counter-component_1", "states": {"count": "41"}, "action": "increment"}),
    );
    assert_eq!(states_of(&v), json!({"count": 42}));
}

#[test]
fn test_undeclared_states_reach_the_action() {
    let engine = engine();
    let mut ctx = engine.context();
    let body = json!({
        "id": "counter-component_1",
        "states": {"filter": "open"},
        "action": "current_filter"
    });
    let response = dispatch_in(&mut ctx, body).unwrap();
    assert_eq!(response.updates[0].result, json!("open"));

    let inst = ctx.checkout("counter-component_1").unwrap();
    assert_eq!(inst.state().read("filter"), Some(json!("open")));
}

#[test]
fn test_list_state_decodes_json_text() {
    let engine = engine();
    let mut ctx = engine.context();
    let body = json!({"id": "tag-list-component_1", "states": {"tags": "[\"a\",\"b\"]"}});
    dispatch_in(&mut ctx, body).unwrap();

    let inst = ctx.checkout("tag-list-component_1").unwrap();
    assert_eq!(inst.state().read("tags"), Some(json!(["a", "b"])));
}

#[test]
fn test_list_state_wraps_plain_text() {
    let engine = engine();
    let mut ctx = engine.context();
    let body = json!({"id": "tag-list-component_1", "states": {"tags": "solo"}});
    dispatch_in(&mut ctx, body).unwrap();

    let inst = ctx.checkout("tag-list-component_1").unwrap();
    assert_eq!(inst.state().read("tags"), Some(json!(["solo"])));
}

#[test]
fn test_false_result_suppresses_acting_update() {
    let engine = engine();
    let (status, v) = call(
        &engine,
        json!({
            "id": "tag-list-component_1",
            "states": {"tags": "[\"alpha\",\"beta\"]"},
            "action": "deleteItem(\"alpha\")"
        }),
    );
    assert_eq!(status, 200);
    assert_eq!(v["updates"], json!([]));
}

#[test]
fn test_sibling_cells_use_distinct_keys() {
    let engine = engine();
    let mut ctx = engine.context();
    let mut defaults = Map::new();
    defaults.insert("value".into(), json!(1));

    let mut a = resolve(&mut ctx, "child-component_1", defaults.clone())
        .unwrap()
        .unwrap();
    let b = resolve(&mut ctx, "child-component_2", defaults)
        .unwrap()
        .unwrap();
    assert_ne!(a.state().key_of("value"), b.state().key_of("value"));

    a.state_mut().write("value", json!(9)).unwrap();
    assert_eq!(a.state().read("value"), Some(json!(9)));
    assert_eq!(b.state().read("value"), Some(json!(1)));
}

#[test]
fn test_value_fills_missing_argument() {
    let engine = engine();
    let (_, v) = call(
        &engine,
        json!({"id": "counter-component_1", "action": "add", "value": 5}),
    );
    assert_eq!(states_of(&v), json!({"count": 5}));

    // Inline arguments take precedence over `value`
    let body = json!({"id": "counter-component_1", "action": "add(2)", "value": 5});
    let (_, v) = call(&engine, body);
    assert_eq!(states_of(&v), json!({"count": 2}));
}

#[test]
fn test_missing_arguments() {
    let engine = engine();
    let (status, v) = call(
        &engine,
        json!({"id": "counter-component_1", "action": "add"}),
    );
    assert_eq!(status, 400);
    assert_eq!(v["error"], json!(true));
    assert!(v["message"].as_str().unwrap().contains("at least 1"));
}

#[test]
fn test_private_action_is_refused() {
    let engine = engine();
    let (status, v) = call(
        &engine,
        json!({"id": "counter-component_1", "action": "wipe"}),
    );
    assert_eq!(status, 400);
    assert!(v["message"].as_str().unwrap().contains("not public"));
}

#[test]
fn test_reserved_and_unknown_actions_are_not_found() {
    let engine = engine();
    for action in ["__internal", "explode", "explode(1)"] {
        let (status, v) = call(
            &engine,
            json!({"id": "counter-component_1", "action": action}),
        );
        assert_eq!(status, 400, "{action}");
        assert!(v["message"].as_str().unwrap().contains("not found"));
    }
}

#[test]
fn test_runtime_method_receives_value() {
    let engine = engine();
    let (_, v) = call(
        &engine,
        json!({"id": "counter-component_1", "states": {"count": 3}, "action": "reset", "value": 7}),
    );
    assert_eq!(states_of(&v), json!({"count": 7}));

    let body = json!({"id": "counter-component_1", "states": {"count": 3}, "action": "reset"});
    let (_, v) = call(&engine, body);
    assert_eq!(states_of(&v), json!({"count": 0}));
}

// ============================================================================
// rendering modes
// ============================================================================

#[test]
fn test_update_group_returns_fragments() {
    let engine = engine();
    let (_, v) = call(
        &engine,
        json!({"id": "counter-component_1", "action": "increment", "update": "count"}),
    );

    assert_eq!(
        v["fragments"]["count@value"],
        r#"<span data-update="count@value">1</span>"#
    );
    assert_eq!(v["updates"][0]["component"], "counter-component_1");
    assert!(v["updates"][0].get("html").is_none());
    assert_eq!(states_of(&v), json!({"count": 1}));
}

#[test]
fn test_unknown_group_renders_fully() {
    let engine = engine();
    let (_, v) = call(
        &engine,
        json!({"id": "counter-component_1", "update": "nothing"}),
    );
    assert!(v.get("fragments").is_none());
    assert!(v["updates"][0]["html"].as_str().unwrap().starts_with("<div data-surge-id="));
}

#[test]
fn test_exact_fragment_key_returns_content() {
    let engine = engine();
    let (_, v) = call(
        &engine,
        json!({"id": "counter-component_1", "action": "increment", "update": "count@value"}),
    );
    assert_eq!(v["result"], "1");
}

#[test]
fn test_request_states_returns_html() {
    let engine = engine();
    let (_, v) = call(
        &engine,
        json!({"id": "counter-component_1", "requestStates": true}),
    );
    assert!(v["html"].as_str().unwrap().starts_with(r#"<div data-surge-id="counter-component_1""#));
    assert_eq!(states_of(&v), json!({"count": 0}));
}

#[test]
fn test_styles_and_local_storage_are_attached() {
    let engine = engine();
    let (_, v) = call(
        &engine,
        json!({"id": "counter-component_1", "_local_storage": {"prefs": "{\"dark\":true}"}}),
    );
    assert!(v["styles"].as_str().unwrap().contains("surge-dynamic-styles"));
    assert_eq!(v["localStorage"]["prefs"]["dark"], json!(true));
}

// ============================================================================
// events
// ============================================================================

#[test]
fn test_emit_only_reaches_listed_components() {
    let engine = engine();
    let (status, v) = call(
        &engine,
        json!({
            "emit": "counted",
            "payload": 3,
            "components": ["listener-component_1", "counter-component_1"]
        }),
    );

    assert_eq!(status, 200);
    let updates = v["updates"].as_array().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["component"], "listener-component_1");
    assert_eq!(updates[0]["result"], json!(3));
    assert!(updates[0]["html"].as_str().unwrap().contains("<em>3</em>"));
}

#[test]
fn test_queued_events_reach_addressed_components() {
    let engine = engine();
    let (_, v) = call_addressed(
        &engine,
        json!({"id": "counter-component_1", "states": {"count": 4}, "action": "notify"}),
        &["listener-component_1"],
    );

    let updates = v["updates"].as_array().unwrap();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0]["component"], "listener-component_1");
    assert_eq!(updates[0]["result"], json!(4));
    assert_eq!(updates[1]["component"], "counter-component_1");
}

#[test]
fn test_in_process_listeners_hear_queued_events() {
    use std::cell::Cell;
    use std::rc::Rc;

    let engine = engine();
    let mut ctx = engine.context();
    let heard = Rc::new(Cell::new(0));
    let seen = Rc::clone(&heard);
    ctx.events.listen("counted", move |_| seen.set(seen.get() + 1));

    dispatch_in(
        &mut ctx,
        json!({"id": "counter-component_1", "action": "notify"}),
    )
    .unwrap();
    assert_eq!(heard.get(), 1);
}

// ============================================================================
// failures
// ============================================================================

#[test]
fn test_oversized_body() {
    let engine = engine();
    let body = vec![b' '; DEFAULT_MAX_PAYLOAD + 1];
    let (status, body) = handle_action(&engine, &body, &[]);
    assert_eq!(status, 413);
    assert!(body.contains("too large"));
}

#[test]
fn test_malformed_body() {
    let engine = engine();
    let (status, _) = handle_action(&engine, b"{\"id\":", &[]);
    assert_eq!(status, 400);
}

#[test]
fn test_missing_id() {
    let engine = engine();
    let (status, v) = call(&engine, json!({"action": "increment"}));
    assert_eq!(status, 400);
    assert!(v["message"].as_str().unwrap().contains("`id`"));
}

#[test]
fn test_unresolvable_components() {
    let engine = engine();
    let (status, v) = call(&engine, json!({"id": "missing-component_1"}));
    assert_eq!(status, 404);
    assert!(v["message"].as_str().unwrap().contains("MissingComponent"));

    let (status, _) = call(&engine, json!({"id": "layout-main_1"}));
    assert_eq!(status, 404);
}

#[test]
fn test_constraint_violation_is_reported() {
    let engine = engine_with_key();
    let (status, v) = call(
        &engine,
        json!({"id": "vault-component_1", "states": {"size": "xl"}}),
    );
    assert_eq!(status, 400);
    let message = v["message"].as_str().unwrap();
    assert!(message.contains("size"));
    assert!(message.contains("md"));
}

#[test]
fn test_protected_state_without_key_fails() {
    let engine = engine();
    let (status, v) = call(&engine, json!({"id": "vault-component_1"}));
    assert_eq!(status, 500);
    assert!(v["message"].as_str().unwrap().contains("owner"));
}

#[test]
fn test_prod_diagnostics_are_generic() {
    let mut config = config();
    config.engine.env = Env::Prod;
    let engine = Arc::new(Engine::new(Arc::new(config), registry()).unwrap());

    let (status, v) = call(
        &engine,
        json!({"id": "counter-component_1", "action": "wipe"}),
    );
    assert_eq!(status, 400);
    assert_eq!(v["message"], "Internal error");
}

// ============================================================================
// protected state round trip
// ============================================================================

#[test]
fn test_protected_state_travels_as_token() {
    let engine = engine_with_key();
    let (_, v) = call(&engine, json!({"id": "vault-component_1"}));
    let states = states_of(&v);
    let token = states["owner"].as_str().unwrap().to_owned();
    assert!(token.starts_with(crate::state::TOKEN_PREFIX));
    assert_eq!(states["size"], "sm");

    let mut ctx = engine.context();
    let body = json!({"id": "vault-component_1", "states": {"owner": token, "size": "lg"}});
    dispatch_in(&mut ctx, body).unwrap();
    let inst = ctx.checkout("vault-component_1").unwrap();
    assert_eq!(inst.state().read("owner"), Some(json!("alice")));
    assert_eq!(inst.state().read("size"), Some(json!("lg")));
}

#[test]
fn test_tampered_token_degrades_to_no_value() {
    let engine = engine_with_key();
    let mut ctx = engine.context();
    let forged = format!("{}AAAAbm90IGEgdmFsaWQgdG9rZW4=", crate::state::TOKEN_PREFIX);

    dispatch_in(
        &mut ctx,
        json!({"id": "vault-component_1", "states": {"owner": forged}}),
    )
    .unwrap();
    let inst = ctx.checkout("vault-component_1").unwrap();
    assert_eq!(inst.state().read("owner"), Some(Value::Null));
}

#[test]
fn test_parse_addressed_header() {
    assert_eq!(parse_addressed(" a_1, ,b_2 "), vec!["a_1", "b_2"]);
    assert!(parse_addressed("").is_empty());
}
