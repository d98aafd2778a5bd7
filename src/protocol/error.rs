//! Protocol failures and their HTTP status.

use thiserror::Error;

use crate::component::{ComponentError, ResolveError};
use crate::markup::ExpandError;
use crate::render::RenderError;
use crate::state::StateError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("payload too large ({size} bytes, limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("no component found for id `{0}`")]
    ComponentNotFound(String),

    #[error("`{0}` not found among the component's actions and methods")]
    ActionNotFound(String),

    #[error("action `{0}` is not public and cannot be called")]
    ActionNotPublic(String),

    #[error("`{method}` expects at least {required} argument(s), {given} given")]
    MissingArguments {
        method: String,
        required: usize,
        given: usize,
    },

    #[error(transparent)]
    Constraint(StateError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Failure raised while running component code.
    #[error(transparent)]
    Action(ComponentError),
}

impl DispatchError {
    pub fn status(&self) -> u16 {
        match self {
            Self::PayloadTooLarge { .. } => 413,
            Self::InvalidJson(_)
            | Self::MissingField(_)
            | Self::ActionNotFound(_)
            | Self::ActionNotPublic(_)
            | Self::MissingArguments { .. }
            | Self::Constraint(_) => 400,
            Self::ComponentNotFound(_) | Self::Resolve(_) => 404,
            Self::Expand(_) | Self::Render(_) | Self::Action(_) => 500,
        }
    }
}

impl From<ComponentError> for DispatchError {
    fn from(err: ComponentError) -> Self {
        match err {
            ComponentError::State(err @ StateError::Constraint { .. }) => Self::Constraint(err),
            ComponentError::Resolve(err) => Self::Resolve(err),
            ComponentError::Expand(err) => Self::Expand(err),
            ComponentError::Render(err) => Self::Render(err),
            other => Self::Action(other),
        }
    }
}

impl From<StateError> for DispatchError {
    fn from(err: StateError) -> Self {
        ComponentError::State(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DispatchError::PayloadTooLarge { size: 2, limit: 1 }.status(),
            413
        );
        assert_eq!(DispatchError::MissingField("id").status(), 400);
        assert_eq!(DispatchError::ComponentNotFound("x".into()).status(), 404);
        assert_eq!(
            DispatchError::Expand(ExpandError::Runaway { limit: 10 }).status(),
            500
        );
    }

    #[test]
    fn test_constraint_maps_to_bad_request() {
        let err: DispatchError = ComponentError::State(StateError::Constraint {
            name: "size".into(),
            value: "\"xl\"".into(),
            allowed: "sm, md".into(),
        })
        .into();
        assert!(matches!(err, DispatchError::Constraint(_)));
        assert_eq!(err.status(), 400);
        assert!(err.to_string().contains("size"));
    }

    #[test]
    fn test_other_state_errors_are_internal() {
        let err: DispatchError = StateError::MissingKey("owner".into()).into();
        assert_eq!(err.status(), 500);
    }
}
