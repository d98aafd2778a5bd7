//! Surge - a reactive server component engine.
//!
//! Pages are composed from components written as custom HTML tags. Each
//! component instance owns typed state that travels to the client (encrypted
//! where protected) and comes back with action requests, so a single
//! component or a named fragment of it can be re-rendered on demand.
//!
//! ```text
//! page request ─► Engine::render_page ─► expand custom tags ─► HTML
//! action POST  ─► protocol::dispatch  ─► resolve ─► hydrate ─► execute
//!                                          ─► render / fragments ─► JSON
//! ```

pub mod builtin;
pub mod cache;
pub mod cli;
pub mod collect;
pub mod component;
pub mod config;
pub mod core;
pub mod event;
pub mod logger;
pub mod markup;
pub mod protocol;
pub mod render;
pub mod state;
pub mod store;
pub mod utils;

pub use crate::component::{
    Action, Component, ComponentError, ComponentType, PageMeta, Registry, Scope,
};
pub use crate::config::SurgeConfig;
pub use crate::core::{Engine, RequestContext};
