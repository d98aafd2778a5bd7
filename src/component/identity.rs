//! Identity, index prefix and tag derivation.
//!
//! | Input                         | Output                                  |
//! |-------------------------------|-----------------------------------------|
//! | short name `UserCardComponent`| prefix `user-card-component`            |
//! | short name `UserCard`         | prefix `user-card-component`            |
//! | expansion #2 of that type     | `user-card-component_imbrication_2`     |
//! | factory #1 of that type       | `user-card-component_1`                 |
//! | identity `user-card-component_1` | prefix `user-card-component`         |

use crate::utils::case::{kebab, pascal};

const PREFIX_MARKER: &str = "-component";

/// Index prefix for a type short name.
pub fn index_prefix(short_name: &str) -> String {
    let base = short_name.strip_suffix("Component").unwrap_or(short_name);
    format!("{}{PREFIX_MARKER}", kebab(base))
}

/// Identity of the `n`th instance created by markup expansion.
pub fn imbrication_identity(prefix: &str, n: usize) -> String {
    format!("{prefix}_imbrication_{n}")
}

/// Identity of the `n`th instance created by the factory.
pub fn factory_identity(prefix: &str, n: usize) -> String {
    format!("{prefix}_{n}")
}

/// Longest leading run of lowercase alphanumerics and hyphens.
pub fn prefix_of(identity: &str) -> &str {
    let end = identity
        .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'))
        .unwrap_or(identity.len());
    &identity[..end]
}

/// Layouts are applied by page rendering, never resolved by identity.
pub fn is_layout_prefix(prefix: &str) -> bool {
    prefix == "layout" || prefix.starts_with("layout-")
}

/// Type short name the resolver expected for a prefix.
pub fn expected_type_name(prefix: &str) -> String {
    pascal(prefix)
}

/// Custom tags for a type without an explicit tag list.
///
/// Only hyphenated names qualify, so a type can never capture a native element.
pub fn derive_tags(short_name: &str) -> Vec<String> {
    let full = kebab(short_name);
    let mut tags = Vec::with_capacity(2);
    if let Some(bare) = full.strip_suffix(PREFIX_MARKER)
        && bare.contains('-')
    {
        tags.push(bare.to_owned());
    }
    if full.contains('-') {
        tags.push(full);
    }
    tags
}
