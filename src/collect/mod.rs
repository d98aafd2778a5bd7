//! Request-scoped asset collectors.
//!
//! Components register their CSS and JS while rendering; the page renderer
//! injects the collected assets and the action dispatcher returns new styles.

mod script;
mod style;

pub use script::ScriptCollector;
pub use style::{STYLE_ELEMENT_ID, StyleCollector, scope_css};
