//! commark - annotation tags, LINK references and structured doc comments
//!
//! commark provides:
//! - Anchor scanning (`TODO`, `HACK`, custom tags) with owner, issue and id metadata
//! - LINK reference parsing and path resolution
//! - Doc-comment block location, reflow and rendering
//! - Export of anchor lists as TSV/CSV/Markdown/JSON

pub mod anchors;
pub mod cli;
pub mod core;
pub mod doc;
pub mod error;

pub use error::{Error, Result};
