//! Action pipeline.
//!
//! ```text
//! decode ─► emit-only? ──────────────────────────────► events ─► response
//!              │
//!              └─► resolve ─► hydrate ─► execute ─► render ─► events ─► response
//! ```
//!
//! Every stage returns `Result`; the first failure ends the request and is
//! turned into a diagnostic by the caller.

use serde_json::{Map, Value};

use super::DispatchError;
use super::call::parse_call;
use super::request::ActionRequest;
use super::response::{ActionResponse, Update};
use crate::component::{ComponentInstance, Rendered, SLOT_KEY, Scope, resolve};
use crate::core::RequestContext;
use crate::debug;
use crate::event::Event;
use crate::markup::find_fragment;
use crate::state::{StateSpec, is_token};
use crate::utils::json::parse_structured;

/// Handle one decoded action request.
///
/// `addressed` lists the components that should hear events queued by the
/// action (the `X-Surge-Components` header).
pub fn dispatch(
    ctx: &mut RequestContext,
    request: ActionRequest,
    addressed: &[String],
) -> Result<ActionResponse, DispatchError> {
    ctx.store.seed(&request.local_storage);

    if request.is_emit_only() {
        return dispatch_emit(ctx, &request);
    }

    let id = request
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or(DispatchError::MissingField("id"))?;

    let mut defaults = Map::new();
    if let Some(slot) = &request.slot {
        defaults.insert(SLOT_KEY.to_owned(), Value::String(slot.clone()));
    }
    let mut instance = resolve(ctx, &id, defaults)?
        .ok_or_else(|| DispatchError::ComponentNotFound(id.clone()))?;

    // The instance goes back to the request cache whatever happens, so event
    // handlers addressing the same identity see the mutated state.
    let outcome = run(ctx, &mut instance, &request);
    ctx.checkin(instance);
    let (result, mut response, acting_html) = outcome?;

    let mut targets: Vec<String> = addressed.to_vec();
    for component in &request.components {
        if !targets.contains(component) {
            targets.push(component.clone());
        }
    }
    for event in ctx.events.flush() {
        ctx.events.dispatch(&event);
        for target in &targets {
            if let Some(update) = deliver(ctx, target, &event)? {
                response.updates.push(update);
            }
        }
    }

    if result != Value::Bool(false) && !response.has_update_for(&id) {
        response.updates.push(Update {
            component: id.clone(),
            html: acting_html,
            result: Value::Bool(true),
        });
    }

    // Event handlers may have changed the acting instance
    if let Some(instance) = ctx.checkout(&id) {
        let states = instance.exposed_json();
        ctx.checkin(instance);
        response.states = states?;
    }
    finish(ctx, &mut response);
    Ok(response)
}

/// Hydrate, execute and render the acting instance.
///
/// Returns the action result, the response so far, and the markup for the
/// acting component's update entry.
fn run(
    ctx: &mut RequestContext,
    instance: &mut ComponentInstance,
    request: &ActionRequest,
) -> Result<(Value, ActionResponse, Option<String>), DispatchError> {
    if let Some(states) = &request.states {
        hydrate(instance, states)?;
    }

    let result = match &request.action {
        Some(action) => execute(ctx, instance, action, request.value.as_ref())?,
        None => Value::Null,
    };

    let behavior = instance.ty().behavior().clone();
    behavior.on_after_action(&mut Scope::new(instance, ctx))?;

    let mut response = ActionResponse::default();
    let html = match request.update() {
        _ if request.wants_states() => {
            let html = instance.render(ctx, None)?.into_body();
            response.html = Some(html.clone());
            Some(html)
        }
        Some(key) if key.contains('@') => {
            let html = instance.render(ctx, None)?.into_body();
            match find_fragment(&html, key) {
                Some(fragment) => {
                    response.result = Some(fragment);
                    None
                }
                None => Some(html),
            }
        }
        group => match instance.render(ctx, group)? {
            Rendered::Fragments(envelope) => {
                response.fragments = Some(envelope.fragments);
                None
            }
            Rendered::Html(html) => Some(html),
        },
    };

    Ok((result, response, html.map(|h| h.trim().to_owned())))
}

/// Apply client-sent property values through the normal write contract.
///
/// String values for list-typed cells are decoded. Names the component never
/// declared are declared on the spot with the sent value as default.
fn hydrate(
    instance: &mut ComponentInstance,
    states: &Map<String, Value>,
) -> Result<(), DispatchError> {
    for (name, value) in states {
        if !instance.state().contains(name) {
            debug!("action"; "declaring client state `{}` on {}", name, instance.identity());
            instance
                .state_mut()
                .declare(name, StateSpec::new(value.clone()))?;
        }
        let kind = instance
            .state()
            .cell(name)
            .map(|c| c.kind())
            .unwrap_or_default();

        let value = match value {
            Value::String(text) if kind.accepts_list() && !is_token(text) => {
                match parse_structured(text).or_else(|| scalar_json(text)) {
                    Some(Value::Array(items)) => Value::Array(items),
                    Some(other) => Value::Array(vec![other]),
                    None => Value::Array(vec![Value::String(text.clone())]),
                }
            }
            other => other.clone(),
        };
        instance.state_mut().write(name, value)?;
    }
    Ok(())
}

/// JSON scalars (`"3"`, `"\"a\""`) decoded as values.
fn scalar_json(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

/// Resolve and invoke the requested method.
fn execute(
    ctx: &mut RequestContext,
    instance: &mut ComponentInstance,
    action: &str,
    value: Option<&Value>,
) -> Result<Value, DispatchError> {
    let (method, mut args) = parse_call(action);
    let ty = instance.ty().clone();
    let behavior = ty.behavior().clone();

    behavior.on_before_action(&mut Scope::new(instance, ctx), &method, &args)?;

    if !method.starts_with("__")
        && let Some(declared) = ty.action_named(&method)
    {
        if !declared.is_public() {
            return Err(DispatchError::ActionNotPublic(method));
        }
        append_value(&mut args, value, declared.accepts());
        check_arity(&method, declared.required(), args.len())?;
        return Ok(declared.call(&mut Scope::new(instance, ctx), &args)?);
    }

    let Some(runtime) = instance.method(&method).cloned() else {
        return Err(DispatchError::ActionNotFound(method));
    };
    append_value(&mut args, value, runtime.accepts());
    check_arity(&method, runtime.required(), args.len())?;
    Ok((runtime.handler)(&mut Scope::new(instance, ctx), &args)?)
}

fn append_value(args: &mut Vec<Value>, value: Option<&Value>, accepts: usize) {
    if let Some(value) = value
        && args.len() < accepts
    {
        args.push(value.clone());
    }
}

fn check_arity(method: &str, required: usize, given: usize) -> Result<(), DispatchError> {
    if given < required {
        return Err(DispatchError::MissingArguments {
            method: method.to_owned(),
            required,
            given,
        });
    }
    Ok(())
}

/// Fan an event out to the listed components without running an action.
fn dispatch_emit(
    ctx: &mut RequestContext,
    request: &ActionRequest,
) -> Result<ActionResponse, DispatchError> {
    let event = Event::new(
        request.emit.clone().unwrap_or_default(),
        request.payload.clone(),
    );
    ctx.events.dispatch(&event);

    let mut response = ActionResponse::default();
    for target in &request.components {
        if let Some(update) = deliver(ctx, target, &event)? {
            response.updates.push(update);
        }
    }
    finish(ctx, &mut response);
    Ok(response)
}

/// Offer `event` to one component; re-render it if it reacted.
fn deliver(
    ctx: &mut RequestContext,
    identity: &str,
    event: &Event,
) -> Result<Option<Update>, DispatchError> {
    let Some(mut instance) = resolve(ctx, identity, Map::new())? else {
        return Ok(None);
    };

    let outcome = react(ctx, &mut instance, event);
    ctx.checkin(instance);
    outcome
}

fn react(
    ctx: &mut RequestContext,
    instance: &mut ComponentInstance,
    event: &Event,
) -> Result<Option<Update>, DispatchError> {
    let behavior = instance.ty().behavior().clone();
    let result = match behavior.on_event(&mut Scope::new(instance, ctx), event)? {
        None | Some(Value::Bool(false)) => return Ok(None),
        Some(result) => result,
    };

    debug!("event"; "`{}` handled by {}", event.name, instance.identity());
    let html = instance.render(ctx, None)?.into_body();
    Ok(Some(Update {
        component: instance.identity().to_owned(),
        html: Some(html),
        result,
    }))
}

/// Attach collected styles and local storage.
fn finish(ctx: &RequestContext, response: &mut ActionResponse) {
    response.styles = ctx.styles.render();
    if !ctx.store.is_empty() {
        response.local_storage = Some(ctx.store.snapshot());
    }
}
