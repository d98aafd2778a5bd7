//! Identity -> instance resolution and the instance factory.

use serde_json::{Map, Value};

use super::identity::{expected_type_name, factory_identity, is_layout_prefix, prefix_of};
use super::{ComponentError, ComponentInstance, ResolveError};
use crate::core::RequestContext;
use crate::debug;

/// Resolve an identity to a live instance.
///
/// The request's instance cache is consulted first, so a later call against
/// the same identity sees state set earlier in the request. Callers must hand
/// the instance back with [`RequestContext::checkin`] when done.
///
/// Layout identities resolve to `None`.
pub fn resolve(
    ctx: &mut RequestContext,
    identity: &str,
    defaults: Map<String, Value>,
) -> Result<Option<ComponentInstance>, ComponentError> {
    if let Some(instance) = ctx.checkout(identity) {
        return Ok(Some(instance));
    }

    let prefix = prefix_of(identity);
    if is_layout_prefix(prefix) {
        return Ok(None);
    }

    let engine = ctx.engine().clone();
    let index = engine.index();
    let ty = match index.lookup(prefix) {
        Some(ty) => ty,
        None => {
            debug!("resolve"; "index miss for `{}`", identity);
            let retried = if index.refresh_once(prefix) { index.lookup(prefix) } else { None };
            retried.ok_or_else(|| ResolveError::NotFound {
                identity: identity.to_owned(),
                expected: expected_type_name(prefix),
            })?
        }
    };

    if ty.is_abstract() {
        return Err(ResolveError::Abstract(ty.name().to_owned()).into());
    }

    let route = ctx.route().map(str::to_owned);
    ComponentInstance::construct(ty, identity.to_owned(), route, defaults, ctx).map(Some)
}

/// Instantiate a type by fully-qualified name with a fresh identity.
pub fn create(
    ctx: &mut RequestContext,
    type_name: &str,
    defaults: Map<String, Value>,
) -> Result<ComponentInstance, ComponentError> {
    let ty = ctx
        .engine()
        .registry()
        .get(type_name)
        .cloned()
        .ok_or_else(|| ResolveError::UnknownType(type_name.to_owned()))?;
    if ty.is_abstract() {
        return Err(ResolveError::Abstract(ty.name().to_owned()).into());
    }

    let prefix = ty.index_prefix();
    let identity = factory_identity(&prefix, ctx.next_identity(&prefix));
    let route = ctx.route().map(str::to_owned);
    ComponentInstance::construct(ty, identity, route, defaults, ctx)
}
