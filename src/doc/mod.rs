//! Structured documentation comments
//!
//! Locating `///` and `/** */` blocks, reflowing them to a width, and
//! rendering their XML-style markup into display sections.

pub mod api;
pub mod block;
pub mod markdown;
pub(crate) mod markup;
pub mod reflow;
pub mod render;
pub mod repo;
pub mod style;
