//! Typed, constrained, change-observable component state.
//!
//! - [`StateContainer`] owns the cells of one component instance
//! - [`StateKind`] is the declared type used for read coercion
//! - [`StateCipher`] turns values into opaque tokens and back

mod cell;
mod cipher;
mod container;
mod kind;

pub use cell::{StateCell, StateMeta, StateSpec};
pub use cipher::{MIN_KEY_LEN, StateCipher, TOKEN_PREFIX, is_token};
pub use container::{Schema, StateContainer, Watcher};
pub use kind::StateKind;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    /// Value outside the declared allowed set.
    #[error("invalid value {value} for state `{name}`, allowed values: {allowed}")]
    Constraint {
        name: String,
        value: String,
        allowed: String,
    },

    #[error("state `{0}` is not declared")]
    Unknown(String),

    #[error("encryption key must be at least {MIN_KEY_LEN} characters (got {0})")]
    WeakKey(usize),

    #[error("state `{0}` is protected but no encryption key is configured")]
    MissingKey(String),

    #[error("failed to encode state value: {0}")]
    Encode(#[from] serde_json::Error),
}
