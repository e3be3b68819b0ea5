/*
 * registry.rs
 * Copyright (c) 2026 The stela authors
 */

//! Static registry of template functions.
//!
//! Each entry maps a function name to its evaluation kind, its declared
//! positional parameter order and its lexical irregularities. The parser
//! asks only about the latter; everything else drives the evaluator.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// How a function is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncKind {
    /// Produces an output node with the given tag.
    Output { tag: &'static str },

    /// `Table`: columns spec plus a source reference, no children.
    Table,

    /// `SetVar`: binds a variable, produces no output.
    SetVar,

    /// Produces a plain string (usable inside parameter values).
    Value(ValueFunc),

    /// Produces a data node from a data source.
    DataSource(DataFunc),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFunc {
    Now,
    DateTime,
    CmpTime,
    LangRes,
    SysParam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFunc {
    Data,
    DbFind,
    EcosysParam,
}

/// A registered template function.
#[derive(Debug)]
pub struct FuncDescriptor {
    pub name: &'static str,
    pub kind: FuncKind,

    /// Declared names, in positional order.
    pub params: &'static [&'static str],

    /// Parameter rendered as children rather than an attribute.
    pub content_param: Option<&'static str>,

    /// Named parameter whose value runs verbatim to the end of the
    /// argument list.
    pub raw_tail_param: Option<&'static str>,
}

const fn output(
    name: &'static str,
    tag: &'static str,
    params: &'static [&'static str],
    content_param: Option<&'static str>,
) -> FuncDescriptor {
    FuncDescriptor {
        name,
        kind: FuncKind::Output { tag },
        params,
        content_param,
        raw_tail_param: None,
    }
}

const fn value(name: &'static str, func: ValueFunc, params: &'static [&'static str]) -> FuncDescriptor {
    FuncDescriptor {
        name,
        kind: FuncKind::Value(func),
        params,
        content_param: None,
        raw_tail_param: None,
    }
}

const DESCRIPTORS: &[FuncDescriptor] = &[
    output("Div", "div", &["Class", "Body"], Some("Body")),
    output("P", "p", &["Body", "Class"], Some("Body")),
    output("Span", "span", &["Body", "Class"], Some("Body")),
    output("Strong", "strong", &["Body", "Class"], Some("Body")),
    output("Form", "form", &["Class", "Body"], Some("Body")),
    output(
        "Input",
        "input",
        &["Name", "Class", "Placeholder", "Type", "Value"],
        None,
    ),
    output(
        "Button",
        "button",
        &["Body", "Class", "Contract", "Page", "PageParams"],
        Some("Body"),
    ),
    output("Image", "image", &["Src", "Alt", "Class"], None),
    output("ImageInput", "imageinput", &["Name", "Width", "Ratio"], None),
    FuncDescriptor {
        name: "Table",
        kind: FuncKind::Table,
        params: &["Source", "Columns"],
        content_param: None,
        raw_tail_param: None,
    },
    FuncDescriptor {
        name: "SetVar",
        kind: FuncKind::SetVar,
        params: &["Name", "Value"],
        content_param: None,
        raw_tail_param: None,
    },
    FuncDescriptor {
        name: "Data",
        kind: FuncKind::DataSource(DataFunc::Data),
        params: &["Source", "Columns", "Data"],
        content_param: None,
        raw_tail_param: Some("Data"),
    },
    FuncDescriptor {
        name: "DBFind",
        kind: FuncKind::DataSource(DataFunc::DbFind),
        params: &["Name", "Source"],
        content_param: None,
        raw_tail_param: None,
    },
    FuncDescriptor {
        name: "EcosysParam",
        kind: FuncKind::DataSource(DataFunc::EcosysParam),
        params: &["Name", "Source"],
        content_param: None,
        raw_tail_param: None,
    },
    value("Now", ValueFunc::Now, &["Format"]),
    value("DateTime", ValueFunc::DateTime, &["DateTime", "Format"]),
    value("CmpTime", ValueFunc::CmpTime, &["Time1", "Time2"]),
    value("LangRes", ValueFunc::LangRes, &["Name"]),
    value("SysParam", ValueFunc::SysParam, &["Name"]),
];

static REGISTRY: Lazy<HashMap<&'static str, &'static FuncDescriptor>> =
    Lazy::new(|| DESCRIPTORS.iter().map(|d| (d.name, d)).collect());

/// Look up a function by name. `None` means the call degrades to text.
pub fn descriptor(name: &str) -> Option<&'static FuncDescriptor> {
    REGISTRY.get(name).copied()
}

/// Name of the function's raw tail parameter, if it has one.
pub fn raw_tail_param(name: &str) -> Option<&'static str> {
    descriptor(name).and_then(|d| d.raw_tail_param)
}

/// Whether the function's argument list is a single raw blob (no
/// parameter splitting at all). Applies to the `.Style` modifier, whose
/// argument is CSS.
pub fn takes_raw_args(name: &str) -> bool {
    name == "Style"
}
