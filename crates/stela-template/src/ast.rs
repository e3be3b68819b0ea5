/*
 * ast.rs
 * Copyright (c) 2026 The stela authors
 */

//! Template AST types.
//!
//! A parsed template is an ordered list of [`TemplateNode`]s: literal text
//! interleaved with function-call expressions. Calls own their parameters,
//! an optional brace-delimited body and any chained modifier calls
//! (`.Custom(...)`, `.Alert(...)`), in declaration order.

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text to be output as-is (after variable substitution).
    Text(String),

    /// A function-call expression: `Name(params){ body }.Modifier(...)`.
    Call(Call),
}

/// A parsed function-call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Function name as written.
    pub name: String,

    /// Exact source span of the whole expression, used for the
    /// degrade-to-text fallback when the call cannot be evaluated.
    pub raw: String,

    /// Ordered parameter list; positional and named parameters mixed.
    pub params: Vec<Param>,

    /// Optional `{...}` body.
    pub body: Option<Vec<TemplateNode>>,

    /// Chained modifier calls, in attachment order. Modifiers never have
    /// modifiers of their own; a further `.Name(...)` chains onto the
    /// base call.
    pub modifiers: Vec<Call>,
}

/// A single parameter of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// `Some` for `Key: value`, `None` for a positional value.
    pub key: Option<String>,
    pub value: ParamValue,
}

/// A parameter value: an ordered sequence of literal text and nested
/// calls, e.g. `OK Now(YY)+Strong(Ooops)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamValue {
    pub segments: Vec<ParamSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamSegment {
    Literal(String),
    Call(Call),
}

impl ParamValue {
    /// A value holding a single literal segment.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::default()
        } else {
            Self {
                segments: vec![ParamSegment::Literal(text)],
            }
        }
    }

    /// The value's text when it is exactly one literal segment.
    pub fn as_single_literal(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [ParamSegment::Literal(text)] => Some(text),
            [] => Some(""),
            _ => None,
        }
    }
}

impl Call {
    /// Resolve this call's parameters against the declared positional
    /// order of its function, preserving appearance order.
    ///
    /// Named parameters keep their written key; positional parameters are
    /// assigned the declared names in sequence. A positional parameter
    /// beyond the declared list resolves to `None`.
    pub fn resolved_params<'a>(
        &'a self,
        declared: &[&'static str],
    ) -> Vec<(Option<&'a str>, &'a ParamValue)> {
        let mut out = Vec::with_capacity(self.params.len());
        let mut positional = 0usize;
        for param in &self.params {
            let name = match &param.key {
                Some(key) => Some(key.as_str()),
                None => {
                    let name = declared.get(positional).copied();
                    positional += 1;
                    name
                }
            };
            out.push((name, &param.value));
        }
        out
    }

    /// Look up a parameter by its declared name.
    pub fn param<'a>(&'a self, declared: &[&'static str], name: &str) -> Option<&'a ParamValue> {
        self.resolved_params(declared)
            .into_iter()
            .find(|(n, _)| *n == Some(name))
            .map(|(_, value)| value)
    }

    /// Iterate modifiers with the given name, in attachment order.
    pub fn modifiers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Call> {
        self.modifiers.iter().filter(move |m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(params: Vec<Param>) -> Call {
        Call {
            name: "Test".to_string(),
            raw: "Test(...)".to_string(),
            params,
            body: None,
            modifiers: Vec::new(),
        }
    }

    fn positional(text: &str) -> Param {
        Param {
            key: None,
            value: ParamValue::literal(text),
        }
    }

    fn named(key: &str, text: &str) -> Param {
        Param {
            key: Some(key.to_string()),
            value: ParamValue::literal(text),
        }
    }

    #[test]
    fn positional_params_take_declared_names_in_order() {
        let c = call(vec![positional("a"), positional("b")]);
        let resolved = c.resolved_params(&["Body", "Class"]);
        assert_eq!(resolved[0].0, Some("Body"));
        assert_eq!(resolved[1].0, Some("Class"));
    }

    #[test]
    fn named_params_keep_their_key() {
        let c = call(vec![named("Class", "btn"), positional("content")]);
        let resolved = c.resolved_params(&["Body", "Class"]);
        assert_eq!(resolved[0].0, Some("Class"));
        // positional numbering is independent of named params
        assert_eq!(resolved[1].0, Some("Body"));
    }

    #[test]
    fn excess_positional_param_has_no_name() {
        let c = call(vec![positional("a"), positional("b")]);
        let resolved = c.resolved_params(&["Only"]);
        assert_eq!(resolved[1].0, None);
    }

    #[test]
    fn param_lookup_by_name() {
        let c = call(vec![named("Value", "x"), positional("the name")]);
        assert_eq!(
            c.param(&["Name", "Value"], "Name")
                .and_then(ParamValue::as_single_literal),
            Some("the name")
        );
        assert_eq!(
            c.param(&["Name", "Value"], "Value")
                .and_then(ParamValue::as_single_literal),
            Some("x")
        );
        assert!(c.param(&["Name", "Value"], "Other").is_none());
    }

    #[test]
    fn single_literal_accessor() {
        assert_eq!(ParamValue::literal("x").as_single_literal(), Some("x"));
        assert_eq!(ParamValue::default().as_single_literal(), Some(""));
    }
}
