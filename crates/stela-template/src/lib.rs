/*
 * lib.rs
 * Copyright (c) 2026 The stela authors
 */

//! Content template engine: a small DSL of function calls
//! (`Div(...)`, `DBFind(...).Custom(col){...}`, `SetVar(...)`) rendered
//! into a deterministic JSON tree of output nodes.
//!
//! The pipeline is compile once, render per request:
//!
//! ```
//! use stela_template::{EvalContext, NullStorage, NullSystemValues, Template};
//!
//! let storage = NullStorage;
//! let system = NullSystemValues;
//! let mut ecx = EvalContext::new(&storage, &system);
//! let tree = Template::compile("Strong(bold text)")
//!     .unwrap()
//!     .render_to_string(&mut ecx)
//!     .unwrap();
//! assert_eq!(
//!     tree,
//!     r#"[{"tag":"strong","children":[{"tag":"text","text":"bold text"}]}]"#
//! );
//! ```
//!
//! Data-backed functions (`DBFind`, `EcosysParam`) go through the
//! [`Storage`] and [`SystemValues`] traits; callers plug in their own
//! backends or use the in-memory implementations.

pub mod ast;
pub mod context;
pub mod datasource;
pub mod datetime;
pub mod error;
pub mod eval_context;
mod evaluator;
mod lexer;
pub mod parser;
pub mod registry;
pub mod storage;
pub mod tree;

pub use context::{Scope, ScopeStack};
pub use datasource::DataSourceResult;
pub use error::{TemplateError, TemplateResult};
pub use eval_context::{EvalContext, MAX_DEPTH};
pub use parser::Template;
pub use storage::{
    MemoryStorage, MemorySystemValues, NullStorage, NullSystemValues, QueryResult, Storage,
    StorageError, SystemValues,
};
pub use tree::{serialize_nodes, AttrValue, OutputNode, TableColumn};

/// Compile and render a template in one step.
pub fn render(source: &str, ecx: &mut EvalContext) -> TemplateResult<String> {
    Template::compile(source)?.render_to_string(ecx)
}
