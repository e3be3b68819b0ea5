/*
 * context.rs
 * Copyright (c) 2026 The stela authors
 */

//! Variable scopes and `#name#` substitution.

/// One frame of template variables, in first-assignment order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    vars: Vec<(String, String)>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, overwriting in place so iteration order stays
    /// stable across reassignment.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// A non-empty stack of scopes. Lookups walk innermost to outermost;
/// writes always go to the innermost frame, so row-local bindings in a
/// `.Custom` block shadow without clobbering the page scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeStack {
    frames: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![Scope::new()],
        }
    }

    pub fn from_global(global: Scope) -> Self {
        Self {
            frames: vec![global],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Scope::new());
    }

    /// Pop the innermost frame; the root frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.set(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Replace each `#name#` in `text` with the variable's value. An
    /// unbound name is left literally, marker included; a `#` that does
    /// not open a well-formed marker is ordinary text.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find('#') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('#') {
                Some(close) if is_var_name(&after[..close]) => {
                    let name = &after[..close];
                    match self.get(name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('#');
                            out.push_str(name);
                            out.push('#');
                        }
                    }
                    rest = &after[close + 1..];
                }
                _ => {
                    out.push('#');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn is_var_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_overwrites_in_place() {
        let mut scope = Scope::new();
        scope.set("a", "1");
        scope.set("b", "2");
        scope.set("a", "3");
        let order: Vec<_> = scope.iter().collect();
        assert_eq!(order, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn lookup_walks_frames_innermost_first() {
        let mut stack = ScopeStack::new();
        stack.set("x", "outer");
        stack.set("y", "kept");
        stack.push();
        stack.set("x", "inner");
        assert_eq!(stack.get("x"), Some("inner"));
        assert_eq!(stack.get("y"), Some("kept"));
        stack.pop();
        assert_eq!(stack.get("x"), Some("outer"));
    }

    #[test]
    fn root_frame_survives_pop() {
        let mut stack = ScopeStack::new();
        stack.set("x", "1");
        stack.pop();
        stack.pop();
        assert_eq!(stack.get("x"), Some("1"));
    }

    #[test]
    fn substitute_replaces_bound_names() {
        let mut stack = ScopeStack::new();
        stack.set("name", "world");
        assert_eq!(stack.substitute("hello #name#!"), "hello world!");
    }

    #[test]
    fn unbound_marker_stays_literal() {
        let stack = ScopeStack::new();
        assert_eq!(stack.substitute("see #missing# here"), "see #missing# here");
    }

    #[test]
    fn stray_hash_is_plain_text() {
        let mut stack = ScopeStack::new();
        stack.set("a", "1");
        assert_eq!(stack.substitute("# one # #a#"), "# one # 1");
        assert_eq!(stack.substitute("100#"), "100#");
    }
}
