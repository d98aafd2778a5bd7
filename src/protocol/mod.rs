//! Partial-update action protocol.
//!
//! # Module Structure
//!
//! ```text
//! protocol/
//! ├── request    # ActionRequest decoding, size ceiling
//! ├── call       # `name(args)` parsing
//! ├── dispatch   # resolve -> hydrate -> execute -> render -> events
//! ├── response   # ActionResponse, Update, Diagnostic
//! └── error      # DispatchError and HTTP status mapping
//! ```
//!
//! # Wire format
//!
//! ```json
//! // request
//! { "id": "counter-component_1", "action": "add(2)", "update": "count" }
//!
//! // response
//! { "fragments": { "count@value": "<span ...>3</span>" },
//!   "updates": [ { "component": "counter-component_1", "result": true } ],
//!   "states": "{\"count\":3}" }
//! ```

mod call;
mod dispatch;
mod error;
mod request;
mod response;

#[cfg(test)]
mod tests;

pub use call::parse_call;
pub use dispatch::dispatch;
pub use error::DispatchError;
pub use request::ActionRequest;
pub use response::{ActionResponse, Diagnostic, Update};

use std::sync::Arc;

use crate::core::Engine;
use crate::log;

/// Path the client posts actions to.
pub const ACTION_PATH: &str = "/_surge/action";

/// Header listing the components that should hear emitted events.
pub const COMPONENTS_HEADER: &str = "X-Surge-Components";

/// Run one action request end to end.
///
/// Always produces a JSON body: the response on success, a [`Diagnostic`]
/// otherwise. Nothing is written after it.
pub fn handle_action(engine: &Arc<Engine>, body: &[u8], addressed: &[String]) -> (u16, String) {
    let detailed = engine.config().engine.env.is_dev();

    let max_payload = engine.config().engine.max_payload;
    let outcome = ActionRequest::decode(body, max_payload).and_then(|request| {
        let mut ctx = engine.context();
        dispatch(&mut ctx, request, addressed)
    });

    let (status, body) = match outcome {
        Ok(response) => (200, serde_json::to_string(&response)),
        Err(err) => {
            let status = err.status();
            log!("action"; "{} {}", status, err);
            (status, serde_json::to_string(&Diagnostic::new(err.to_string(), detailed)))
        }
    };

    match body {
        Ok(body) => (status, body),
        Err(e) => {
            log!("action"; "failed to encode response: {}", e);
            (500, r#"{"error":true,"message":"Internal error"}"#.to_owned())
        }
    }
}

/// Split a comma separated component header.
pub fn parse_addressed(header: &str) -> Vec<String> {
    header
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
