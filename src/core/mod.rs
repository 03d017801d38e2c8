//! Core - plumbing shared by the anchor and doc-comment commands
//!
//! This module provides:
//! - Export of anchor lists (TSV, CSV, Markdown, JSON, text)
//! - Path normalization and LINK path resolution
//! - Size-bounded file reading
//! - Configuration loading

pub mod config;
pub mod export;
pub mod file_reader;
pub mod paths;
