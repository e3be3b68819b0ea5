/*
 * eval_context.rs
 * Copyright (c) 2026 The stela authors
 */

//! Mutable state threaded through an evaluation pass.

use crate::context::{Scope, ScopeStack};
use crate::error::{TemplateError, TemplateResult};
use crate::storage::{Storage, SystemValues};

/// Default bound on call/body nesting depth.
pub const MAX_DEPTH: usize = 100;

/// Per-render evaluation state: the scope stack, the data-source and
/// system-value backends and the recursion guard.
pub struct EvalContext<'a> {
    pub scopes: ScopeStack,
    pub storage: &'a dyn Storage,
    pub system: &'a dyn SystemValues,
    depth: usize,
    max_depth: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(storage: &'a dyn Storage, system: &'a dyn SystemValues) -> Self {
        Self {
            scopes: ScopeStack::new(),
            storage,
            system,
            depth: 0,
            max_depth: MAX_DEPTH,
        }
    }

    /// Seed the root frame, e.g. with request parameters.
    pub fn with_global_scope(mut self, global: Scope) -> Self {
        self.scopes = ScopeStack::from_global(global);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enter one nesting level; fails once the bound is exceeded.
    pub fn descend(&mut self) -> TemplateResult<()> {
        if self.depth >= self.max_depth {
            return Err(TemplateError::RecursionLimit {
                max_depth: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NullStorage, NullSystemValues};

    #[test]
    fn descend_fails_past_the_bound() {
        let storage = NullStorage;
        let system = NullSystemValues;
        let mut ecx = EvalContext::new(&storage, &system).with_max_depth(2);
        assert!(ecx.descend().is_ok());
        assert!(ecx.descend().is_ok());
        assert!(matches!(
            ecx.descend(),
            Err(TemplateError::RecursionLimit { max_depth: 2 })
        ));
        ecx.ascend();
        assert!(ecx.descend().is_ok());
    }

    #[test]
    fn global_scope_seeds_the_root_frame() {
        let storage = NullStorage;
        let system = NullSystemValues;
        let mut global = Scope::new();
        global.set("lang", "en");
        let ecx = EvalContext::new(&storage, &system).with_global_scope(global);
        assert_eq!(ecx.scopes.get("lang"), Some("en"));
    }
}
