/*
 * error.rs
 * Copyright (c) 2026 The stela authors
 */

//! Error types for template tokenization, parsing and evaluation.

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while rendering a template.
///
/// Unknown function names and malformed parameter sets are deliberately
/// absent here: they are non-fatal and degrade to a literal-text node
/// during evaluation instead of aborting the render.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Unterminated string, paren or brace group.
    #[error("tokenize error at offset {offset}: {message}")]
    Tokenize { message: String, offset: usize },

    /// Malformed call syntax, including call/body nesting beyond the
    /// supported depth.
    #[error("parse error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },

    /// Nesting depth exceeded the configured bound.
    #[error("recursion limit exceeded (depth > {max_depth})")]
    RecursionLimit { max_depth: usize },

    /// A data-source lookup failed; surfaced to the caller, never
    /// rendered as empty data.
    #[error("data source error: {0}")]
    Storage(#[from] StorageError),

    /// Serializing the output tree failed.
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
