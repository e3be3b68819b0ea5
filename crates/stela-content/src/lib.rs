/*
 * lib.rs
 * Copyright (c) 2026 The stela authors
 */

//! Page and menu rendering on top of the template engine.
//!
//! A [`ContentService`] looks up named page and menu sources in a
//! [`PageStore`], renders them with the caller's backends and returns
//! the canonical JSON tree. Because the tree is deterministic, its
//! SHA-256 is a stable content hash usable for cache validation.

use serde::Serialize;
use sha2::{Digest, Sha256};
use stela_template::{EvalContext, Scope, Storage, SystemValues, TemplateError};
use thiserror::Error;
use tracing::{debug, warn};

/// Named template sources for pages and menus.
pub trait PageStore {
    fn page(&self, name: &str) -> Option<String>;
    fn menu(&self, name: &str) -> Option<String>;
}

/// In-memory [`PageStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryPageStore {
    pages: std::collections::HashMap<String, String>,
    menus: std::collections::HashMap<String, String>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, name: &str, source: &str) {
        self.pages.insert(name.to_string(), source.to_string());
    }

    pub fn add_menu(&mut self, name: &str, source: &str) {
        self.menus.insert(name.to_string(), source.to_string());
    }
}

impl PageStore for MemoryPageStore {
    fn page(&self, name: &str) -> Option<String> {
        self.pages.get(name).cloned()
    }

    fn menu(&self, name: &str) -> Option<String> {
        self.menus.get(name).cloned()
    }
}

/// Content-level failures, each with a wire error code.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{what} not found")]
    NotFound { what: &'static str },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ContentError {
    pub fn code(&self) -> &'static str {
        match self {
            ContentError::NotFound { .. } => "E_NOTFOUND",
            ContentError::Template(_) => "E_SERVER",
        }
    }

    /// The error's wire form.
    pub fn response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.code().to_string(),
            msg: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub msg: String,
}

/// Renders named pages and menus against pluggable backends.
pub struct ContentService<'a, S: PageStore> {
    store: S,
    storage: &'a dyn Storage,
    system: &'a dyn SystemValues,
}

impl<'a, S: PageStore> ContentService<'a, S> {
    pub fn new(store: S, storage: &'a dyn Storage, system: &'a dyn SystemValues) -> Self {
        Self {
            store,
            storage,
            system,
        }
    }

    /// Render an ad-hoc template source with request parameters seeded
    /// into the global scope.
    pub fn render_template(&self, source: &str, params: Scope) -> Result<String, ContentError> {
        let mut ecx = EvalContext::new(self.storage, self.system).with_global_scope(params);
        Ok(stela_template::render(source, &mut ecx)?)
    }

    pub fn render_page(&self, name: &str, params: Scope) -> Result<String, ContentError> {
        let Some(source) = self.store.page(name) else {
            warn!(page = name, "page not found");
            return Err(ContentError::NotFound { what: "Page" });
        };
        debug!(page = name, "rendering page");
        self.render_template(&source, params)
    }

    pub fn render_menu(&self, name: &str, params: Scope) -> Result<String, ContentError> {
        let Some(source) = self.store.menu(name) else {
            warn!(menu = name, "menu not found");
            return Err(ContentError::NotFound { what: "Menu" });
        };
        debug!(menu = name, "rendering menu");
        self.render_template(&source, params)
    }

    /// Hex SHA-256 of a page's rendered tree. Stable across renders of
    /// unchanged content thanks to deterministic serialization.
    pub fn page_hash(&self, name: &str, params: Scope) -> Result<String, ContentError> {
        let tree = self.render_page(name, params)?;
        Ok(hex::encode(Sha256::digest(tree.as_bytes())))
    }
}
