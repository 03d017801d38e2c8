//! Anchors - annotation tags and LINK references in comments
//!
//! An anchor is a comment-introduced tag such as `// TODO(alice): fix #12`.
//! A LINK reference (`// LINK: ./Other.cs:40-52#setup`) points at another
//! file, a line range, or a named anchor.

pub mod api;
pub mod link;
pub mod parse;
pub mod patterns;
