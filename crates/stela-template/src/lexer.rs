/*
 * lexer.rs
 * Copyright (c) 2026 The stela authors
 */

//! Cursor-based tokenizer for the content template grammar.
//!
//! The grammar mixes free literal text with function-call expressions, so
//! the scanner exposes the primitives the parser drives directly: literal
//! text runs up to the next call start, identifiers, quoted strings with
//! escape handling, and depth-aware paren/brace groups. `#identifier#`
//! variable markers need no special handling here; they survive inside
//! literal text and are substituted at evaluation time.

use crate::error::{TemplateError, TemplateResult};

/// A cursor over template source text.
///
/// Sub-expressions (parameter values, bodies) are scanned with their own
/// `Scanner` over the raw slice; `base` keeps reported error offsets
/// absolute within the original template.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    cursor: usize,
    base: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_offset(input, 0)
    }

    /// Scanner over a slice of a larger template, reporting offsets
    /// relative to that template.
    pub fn with_offset(input: &'a str, base: usize) -> Self {
        Self {
            input,
            cursor: 0,
            base,
        }
    }

    /// Absolute offset for error reporting.
    pub fn offset(&self) -> usize {
        self.base + self.cursor
    }

    /// Cursor position within this scanner's input.
    pub fn pos(&self) -> usize {
        self.cursor
    }

    /// Rewind to a position previously returned by [`Scanner::pos`].
    pub fn set_pos(&mut self, pos: usize) {
        self.cursor = pos;
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    fn rest(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n;
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.advance(c.len_utf8());
        Some(c)
    }

    /// Consume `c` if it is next.
    pub fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.advance(c.len_utf8());
            true
        } else {
            false
        }
    }

    /// Read an identifier (`[A-Za-z_][A-Za-z0-9_]*`), or `None` if the
    /// next character cannot start one.
    pub fn ident(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let mut len = 0;
        for (i, c) in rest.char_indices() {
            let ok = if i == 0 {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_'
            };
            if !ok {
                break;
            }
            len = i + c.len_utf8();
        }
        if len == 0 {
            None
        } else {
            let ident = &rest[..len];
            self.advance(len);
            Some(ident)
        }
    }

    /// Read a quoted string. The cursor must be on the opening `"` or
    /// backquote. Returns the unescaped content.
    pub fn quoted(&mut self) -> TemplateResult<String> {
        let start = self.offset();
        let quote = self.bump().unwrap_or('"');
        let mut out = String::new();
        while let Some(c) = self.bump() {
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => break,
                }
            } else {
                out.push(c);
            }
        }
        Err(TemplateError::Tokenize {
            message: "unterminated string literal".to_string(),
            offset: start,
        })
    }

    /// Read a delimited group. The cursor must be on `open`; returns the
    /// raw content between the delimiters, leaving the cursor after the
    /// matching `close`. Nested groups are matched depth-aware and quoted
    /// strings are skipped, so a `)` inside `"..."` does not close the
    /// group.
    pub fn group(&mut self, open: char, close: char) -> TemplateResult<&'a str> {
        let start_offset = self.offset();
        self.bump();
        let content_start = self.cursor;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            if c == '"' || c == '`' {
                self.quoted()?;
                continue;
            }
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    let content = &self.input[content_start..self.cursor];
                    self.bump();
                    return Ok(content);
                }
            }
            self.bump();
        }
        Err(TemplateError::Tokenize {
            message: format!("unterminated '{open}' group"),
            offset: start_offset,
        })
    }

    /// Scan literal text until the next function-call start (an
    /// identifier immediately followed by `(`).
    ///
    /// Returns the text consumed and, when a call begins, the function
    /// name; the cursor is then left on the `(`.
    pub fn text_until_call(&mut self) -> (&'a str, Option<&'a str>) {
        let start = self.cursor;
        loop {
            let Some(c) = self.peek() else {
                return (&self.input[start..self.cursor], None);
            };
            if c.is_ascii_alphabetic() || c == '_' {
                let ident_start = self.cursor;
                if let Some(ident) = self.ident() {
                    if self.peek() == Some('(') {
                        return (&self.input[start..ident_start], Some(ident));
                    }
                }
                // ordinary word, keep scanning
                continue;
            }
            self.bump();
        }
    }
}
