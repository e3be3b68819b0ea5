/*
 * parser.rs
 * Copyright (c) 2026 The stela authors
 */

//! Recursive-descent parser for the content template grammar.
//!
//! A template is literal text interleaved with call expressions of the
//! form `Name(params){ body }.Modifier(params)`. Parameters may be
//! positional or named (`Key: value`), values may be bare words, quoted
//! strings or nested calls, and bodies recurse into the full grammar.
//!
//! Parsing is strictly syntactic: unknown function names are kept in the
//! AST and only degrade to text at evaluation time. The registry is
//! consulted here solely for the two lexical irregularities some
//! functions carry (raw argument bodies and raw tail parameters).

use crate::ast::{Call, Param, ParamSegment, ParamValue, TemplateNode};
use crate::error::{TemplateError, TemplateResult};
use crate::eval_context::{EvalContext, MAX_DEPTH};
use crate::evaluator;
use crate::lexer::Scanner;
use crate::registry;
use crate::tree::{self, OutputNode};
use tracing::debug;

/// A compiled template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<TemplateNode>,
    source: String,
}

impl Template {
    /// Parse template source into an AST.
    pub fn compile(source: &str) -> TemplateResult<Self> {
        let mut scanner = Scanner::new(source);
        let nodes = parse_nodes(&mut scanner, 0)?;
        debug!(bytes = source.len(), nodes = nodes.len(), "compiled template");
        Ok(Self {
            nodes,
            source: source.to_string(),
        })
    }

    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the template into an output tree.
    pub fn render(&self, ecx: &mut EvalContext) -> TemplateResult<Vec<OutputNode>> {
        evaluator::evaluate_nodes(&self.nodes, ecx)
    }

    /// Evaluate and serialize to the canonical JSON form.
    pub fn render_to_string(&self, ecx: &mut EvalContext) -> TemplateResult<String> {
        tree::serialize_nodes(&self.render(ecx)?)
    }
}

/// Parse a run of the full grammar until the scanner is exhausted.
/// `depth` counts call/body nesting; parsing recurses per level, so it
/// is bounded the same way evaluation is.
pub(crate) fn parse_nodes(
    scanner: &mut Scanner,
    depth: usize,
) -> TemplateResult<Vec<TemplateNode>> {
    let mut nodes = Vec::new();
    let mut first = true;
    loop {
        let (text, name) = scanner.text_until_call();
        // Text keeps interior whitespace; the edges of the node list are
        // trimmed and whitespace-only runs between calls are formatting,
        // not content.
        let mut text = text;
        if first {
            text = text.trim_start();
        }
        if name.is_none() {
            text = text.trim_end();
        }
        if !text.trim().is_empty() {
            nodes.push(TemplateNode::Text(text.to_string()));
        }
        first = false;
        let Some(name) = name else {
            return Ok(nodes);
        };
        nodes.push(TemplateNode::Call(parse_call(scanner, name, true, depth)?));
    }
}

/// Parse one call expression. The cursor must be on the `(` that follows
/// `name`. Modifier chains attach to the outermost call only, so nested
/// modifier parses pass `allow_modifiers = false` and leave any further
/// `.Name(` for the caller.
fn parse_call(
    scanner: &mut Scanner,
    name: &str,
    allow_modifiers: bool,
    depth: usize,
) -> TemplateResult<Call> {
    if depth >= MAX_DEPTH {
        return Err(TemplateError::Parse {
            message: format!("call nesting deeper than {MAX_DEPTH}"),
            offset: scanner.offset(),
        });
    }
    let start = scanner.pos() - name.len();
    let args = scanner.group('(', ')')?;
    let args_base = scanner.offset() - args.len() - 1;

    let params = if registry::takes_raw_args(name) {
        vec![Param {
            key: None,
            value: ParamValue::literal(args),
        }]
    } else {
        parse_params(args, args_base, registry::raw_tail_param(name), depth + 1)?
    };

    // The body brace must be adjacent; `Div() {` is a call followed by
    // literal text.
    let body = if scanner.peek() == Some('{') {
        let raw = scanner.group('{', '}')?;
        let mut sub = Scanner::with_offset(raw, scanner.offset() - raw.len() - 1);
        Some(parse_nodes(&mut sub, depth + 1)?)
    } else {
        None
    };

    let mut modifiers = Vec::new();
    if allow_modifiers {
        loop {
            let save = scanner.pos();
            if !scanner.eat('.') {
                break;
            }
            let Some(mod_name) = scanner.ident() else {
                scanner.set_pos(save);
                break;
            };
            if scanner.peek() != Some('(') {
                scanner.set_pos(save);
                break;
            }
            modifiers.push(parse_call(scanner, mod_name, false, depth)?);
        }
    }

    Ok(Call {
        name: name.to_string(),
        raw: scanner.slice(start, scanner.pos()).to_string(),
        params,
        body,
        modifiers,
    })
}

/// Split a call's argument text into parameters.
///
/// `raw_tail` names a parameter whose value runs verbatim to the end of
/// the argument list (`Data: 1,first\n2,second`); commas inside it are
/// content, not separators.
fn parse_params(
    raw: &str,
    base: usize,
    raw_tail: Option<&'static str>,
    depth: usize,
) -> TemplateResult<Vec<Param>> {
    let mut head = raw;
    let mut tail = None;
    if let Some(tail_name) = raw_tail {
        if let Some((name_start, value_start)) = find_tail(raw, tail_name) {
            head = &raw[..name_start];
            tail = Some(Param {
                key: Some(tail_name.to_string()),
                value: ParamValue::literal(&raw[value_start..]),
            });
        }
    }

    let mut params = Vec::new();
    for (offset, piece) in split_top_level(head) {
        if piece.trim().is_empty() {
            continue;
        }
        let (key, value_raw, value_offset) = split_key(piece, offset);
        params.push(Param {
            key,
            value: parse_param_value(value_raw, base + value_offset, depth)?,
        });
    }
    params.extend(tail);
    Ok(params)
}

/// Locate a raw tail parameter `name:` at depth 0 of the argument text,
/// at the start of a parameter position. Returns the name's start and
/// the value's start (just past the colon).
fn find_tail(raw: &str, name: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut at_param_start = true;
    let mut chars = raw.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '`' => {
                let quote = c;
                while let Some((_, d)) = chars.next() {
                    if d == '\\' {
                        chars.next();
                    } else if d == quote {
                        break;
                    }
                }
                at_param_start = false;
            }
            '(' | '{' | '[' => {
                depth += 1;
                at_param_start = false;
            }
            ')' | '}' | ']' => {
                depth = depth.saturating_sub(1);
                at_param_start = false;
            }
            ',' if depth == 0 => at_param_start = true,
            c if c.is_whitespace() => {}
            _ => {
                if depth == 0 && at_param_start && raw[i..].starts_with(name) {
                    let rest = raw[i + name.len()..].trim_start();
                    if let Some(value) = rest.strip_prefix(':') {
                        return Some((i, raw.len() - value.len()));
                    }
                }
                at_param_start = false;
            }
        }
    }
    None
}

/// Split on depth-0 commas, skipping quoted strings. Yields each piece
/// with its byte offset into `raw`.
fn split_top_level(raw: &str) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut piece_start = 0usize;
    let mut chars = raw.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '`' => {
                let quote = c;
                while let Some((_, d)) = chars.next() {
                    if d == '\\' {
                        chars.next();
                    } else if d == quote {
                        break;
                    }
                }
            }
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                pieces.push((piece_start, &raw[piece_start..i]));
                piece_start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push((piece_start, &raw[piece_start..]));
    pieces
}

/// Split `Key: value` into its parts; anything else is positional.
/// Returns the key, the value text and the value's offset within the
/// original argument text.
fn split_key(piece: &str, offset: usize) -> (Option<String>, &str, usize) {
    let trimmed = piece.trim_start();
    let lead = piece.len() - trimmed.len();
    let mut scanner = Scanner::new(trimmed);
    if let Some(ident) = scanner.ident() {
        let after = &trimmed[scanner.pos()..];
        let ws = after.len() - after.trim_start().len();
        if after.trim_start().starts_with(':') {
            let value_start = scanner.pos() + ws + 1;
            let value = trimmed[value_start..].trim_start();
            let value_offset = offset + lead + value_start + (trimmed.len() - value_start)
                - value.len();
            return (Some(ident.to_string()), value.trim_end(), value_offset);
        }
    }
    let value = trimmed.trim_end();
    (None, value, offset + lead)
}

/// Parse a parameter value into literal and nested-call segments.
/// Quoted strings are unescaped into the surrounding literal run; an
/// identifier immediately followed by `(` starts a nested call.
fn parse_param_value(raw: &str, base: usize, depth: usize) -> TemplateResult<ParamValue> {
    let mut scanner = Scanner::with_offset(raw, base);
    let mut segments = Vec::new();
    let mut buffer = String::new();
    while let Some(c) = scanner.peek() {
        if c == '"' || c == '`' {
            buffer.push_str(&scanner.quoted()?);
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let save = scanner.pos();
            if let Some(ident) = scanner.ident() {
                if scanner.peek() == Some('(') {
                    if !buffer.is_empty() {
                        segments.push(ParamSegment::Literal(std::mem::take(&mut buffer)));
                    }
                    segments.push(ParamSegment::Call(parse_call(
                        &mut scanner,
                        ident,
                        true,
                        depth,
                    )?));
                } else {
                    buffer.push_str(scanner.slice(save, scanner.pos()));
                }
            }
            continue;
        }
        if let Some(c) = scanner.bump() {
            buffer.push(c);
        }
    }
    if !buffer.is_empty() {
        segments.push(ParamSegment::Literal(buffer));
    }
    Ok(ParamValue { segments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use pretty_assertions::assert_eq;

    fn single_call(source: &str) -> Call {
        let template = Template::compile(source).unwrap();
        match template.nodes() {
            [TemplateNode::Call(call)] => call.clone(),
            other => panic!("expected one call, got {other:?}"),
        }
    }

    #[test]
    fn text_and_call_interleave() {
        let template = Template::compile("Simple Strong(bold text)").unwrap();
        assert_eq!(template.nodes().len(), 2);
        assert_eq!(
            template.nodes()[0],
            TemplateNode::Text("Simple ".to_string())
        );
        match &template.nodes()[1] {
            TemplateNode::Call(call) => {
                assert_eq!(call.name, "Strong");
                assert_eq!(
                    call.params[0].value.as_single_literal(),
                    Some("bold text")
                );
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_between_calls_is_dropped() {
        let template = Template::compile("Span(a)\n  Span(b)").unwrap();
        assert_eq!(template.nodes().len(), 2);
        assert!(template
            .nodes()
            .iter()
            .all(|n| matches!(n, TemplateNode::Call(_))));
    }

    #[test]
    fn named_and_positional_params() {
        let call = single_call("Input(Class: form-control, myname)");
        assert_eq!(call.params[0].key.as_deref(), Some("Class"));
        assert_eq!(
            call.params[0].value.as_single_literal(),
            Some("form-control")
        );
        assert_eq!(call.params[1].key, None);
        assert_eq!(call.params[1].value.as_single_literal(), Some("myname"));
    }

    #[test]
    fn quoted_param_keeps_commas() {
        let call = single_call(r#"Div(Class: "one, two", body)"#);
        assert_eq!(call.params[0].value.as_single_literal(), Some("one, two"));
        assert_eq!(call.params[1].value.as_single_literal(), Some("body"));
    }

    #[test]
    fn nested_call_in_param_value() {
        let call = single_call("Input(Value: OK Now(YY)+Strong(Ooops))");
        let value = &call.params[0].value;
        assert_eq!(value.segments.len(), 4);
        assert_eq!(value.segments[0], ParamSegment::Literal("OK ".to_string()));
        match &value.segments[1] {
            ParamSegment::Call(inner) => assert_eq!(inner.name, "Now"),
            other => panic!("expected call segment, got {other:?}"),
        }
        assert_eq!(value.segments[2], ParamSegment::Literal("+".to_string()));
        match &value.segments[3] {
            ParamSegment::Call(inner) => assert_eq!(inner.name, "Strong"),
            other => panic!("expected call segment, got {other:?}"),
        }
    }

    #[test]
    fn body_parses_recursively() {
        let call = single_call("Div(wrap){Span(inner) tail}");
        let body = call.body.expect("body");
        assert_eq!(body.len(), 2);
        match &body[0] {
            TemplateNode::Call(inner) => assert_eq!(inner.name, "Span"),
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn detached_brace_is_text_not_body() {
        let template = Template::compile("Div(wrap) {plain}").unwrap();
        match template.nodes() {
            [TemplateNode::Call(call), TemplateNode::Text(text)] => {
                assert!(call.body.is_none());
                assert_eq!(text, " {plain}");
            }
            other => panic!("unexpected nodes {other:?}"),
        }
    }

    #[test]
    fn modifier_chain_attaches_to_base_call() {
        let call = single_call(
            "Button(Body: clicker).Alert(Text: warning, Icon: warn).Style(color: red;)",
        );
        assert_eq!(call.modifiers.len(), 2);
        assert_eq!(call.modifiers[0].name, "Alert");
        assert_eq!(call.modifiers[1].name, "Style");
    }

    #[test]
    fn modifier_on_nested_call_chains_to_outer() {
        // `.Custom` after the inner call's close paren belongs to DBFind.
        let call = single_call("DBFind(src).Custom(col){Span(#id#)}");
        assert_eq!(call.name, "DBFind");
        assert_eq!(call.modifiers.len(), 1);
        assert_eq!(call.modifiers[0].name, "Custom");
        assert!(call.modifiers[0].body.is_some());
    }

    #[test]
    fn dot_without_call_is_not_a_modifier() {
        let template = Template::compile("Span(a).b tail").unwrap();
        match &template.nodes()[0] {
            TemplateNode::Call(call) => assert!(call.modifiers.is_empty()),
            other => panic!("expected call, got {other:?}"),
        }
        assert_eq!(template.nodes()[1], TemplateNode::Text(".b tail".to_string()));
    }

    #[test]
    fn data_tail_param_keeps_commas_and_newlines() {
        let call =
            single_call("Data(Source: mysrc, Columns: \"id,name\", Data:\n\t1,first\n\t2,second\n)");
        let tail = call.params.last().expect("tail param");
        assert_eq!(tail.key.as_deref(), Some("Data"));
        let text = tail.value.as_single_literal().expect("literal");
        assert!(text.contains("1,first"));
        assert!(text.contains("2,second"));
        // head params are unaffected
        assert_eq!(call.params[0].value.as_single_literal(), Some("mysrc"));
        assert_eq!(call.params[1].value.as_single_literal(), Some("id,name"));
    }

    #[test]
    fn style_arguments_stay_raw() {
        let call = single_call("Span(x).Style(div { color: red; })");
        let style = &call.modifiers[0];
        assert_eq!(
            style.params[0].value.as_single_literal(),
            Some("div { color: red; }")
        );
    }

    #[test]
    fn deeply_nested_bodies_fail_to_compile() {
        // well-formed input deeper than the bound must error, not
        // exhaust the stack
        let mut source = String::new();
        for _ in 0..5_000 {
            source.push_str("Div(){");
        }
        source.push('x');
        for _ in 0..5_000 {
            source.push('}');
        }
        assert!(matches!(
            Template::compile(&source),
            Err(TemplateError::Parse { .. })
        ));
    }

    #[test]
    fn deeply_nested_params_fail_to_compile() {
        let source = format!("{}x{}", "Strong(".repeat(5_000), ")".repeat(5_000));
        assert!(matches!(
            Template::compile(&source),
            Err(TemplateError::Parse { .. })
        ));
    }

    #[test]
    fn nesting_within_the_bound_compiles() {
        let mut source = String::new();
        for _ in 0..50 {
            source.push_str("Div(){");
        }
        source.push('x');
        for _ in 0..50 {
            source.push('}');
        }
        assert!(Template::compile(&source).is_ok());
    }

    #[test]
    fn unterminated_group_is_error() {
        assert!(matches!(
            Template::compile("Div(open"),
            Err(TemplateError::Tokenize { .. })
        ));
    }

    #[test]
    fn raw_covers_whole_expression() {
        let call = single_call("Span(hi).Style(color: red;)");
        assert_eq!(call.raw, "Span(hi).Style(color: red;)");
    }
}
