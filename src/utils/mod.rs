//! Utility modules shared across the engine.

pub mod case;
pub mod hash;
pub mod html;
pub mod json;
