/*
 * evaluator.rs
 * Copyright (c) 2026 The stela authors
 */

//! Registry-driven evaluation of a parsed template into an output tree.
//!
//! Evaluation is total over well-formed input: an unknown function name
//! or an unevaluable call degrades to a literal-text node (with `"`
//! escaped as `&#34;`) instead of failing the render. Hard errors are
//! limited to the recursion bound, storage failures and serialization.

use crate::ast::{Call, ParamSegment, ParamValue, TemplateNode};
use crate::datasource::{split_csv, DataSourceResult, SourceAttrs};
use crate::datetime;
use crate::error::TemplateResult;
use crate::eval_context::EvalContext;
use crate::registry::{self, DataFunc, FuncDescriptor, FuncKind, ValueFunc};
use crate::tree::{self, AttrValue, OutputNode, TableColumn};
use tracing::warn;

/// Parameter order of the `.Alert` modifier.
const ALERT_PARAMS: &[&str] = &["Text", "ConfirmButton", "CancelButton", "Icon"];

/// Escape double quotes for text emitted into the output tree.
fn escape_quotes(s: &str) -> String {
    s.replace('"', "&#34;")
}

/// Evaluate a node list into output nodes.
pub(crate) fn evaluate_nodes(
    nodes: &[TemplateNode],
    ecx: &mut EvalContext,
) -> TemplateResult<Vec<OutputNode>> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            TemplateNode::Text(text) => out.push(OutputNode::text(ecx.scopes.substitute(text))),
            TemplateNode::Call(call) => out.extend(evaluate_call(call, ecx)?),
        }
    }
    Ok(out)
}

/// Evaluate one call in node position. `SetVar` and empty value results
/// produce no node.
fn evaluate_call(call: &Call, ecx: &mut EvalContext) -> TemplateResult<Option<OutputNode>> {
    let Some(desc) = registry::descriptor(&call.name) else {
        warn!(name = %call.name, "unknown function, degrading to text");
        return Ok(Some(OutputNode::text(escape_quotes(&call.raw))));
    };
    ecx.descend()?;
    let result = dispatch(desc, call, ecx);
    ecx.ascend();
    result
}

fn dispatch(
    desc: &FuncDescriptor,
    call: &Call,
    ecx: &mut EvalContext,
) -> TemplateResult<Option<OutputNode>> {
    match desc.kind {
        FuncKind::Output { tag } => Ok(Some(build_output_node(tag, desc, call, ecx)?)),
        FuncKind::Table => Ok(Some(build_table_node(desc, call, ecx)?)),
        FuncKind::SetVar => {
            let name = param_string(call, desc, "Name", ecx)?;
            let name = name.trim();
            if name.is_empty() {
                warn!("SetVar without a name, degrading to text");
                return Ok(Some(OutputNode::text(escape_quotes(&call.raw))));
            }
            let value = param_string(call, desc, "Value", ecx)?;
            ecx.scopes.set(name, value);
            Ok(None)
        }
        FuncKind::Value(func) => match evaluate_value(func, desc, call, ecx)? {
            Some(text) if text.is_empty() => Ok(None),
            Some(text) => Ok(Some(OutputNode::text(text))),
            None => Ok(Some(OutputNode::text(escape_quotes(&call.raw)))),
        },
        FuncKind::DataSource(func) => evaluate_data_source(func, desc, call, ecx),
    }
}

/// Resolve a parameter value in string position. Literal segments get
/// variable substitution; value functions contribute their string;
/// structural functions contribute nothing; an unknown call contributes
/// its raw source text.
fn resolve_string(value: &ParamValue, ecx: &mut EvalContext) -> TemplateResult<String> {
    let mut out = String::new();
    for segment in &value.segments {
        match segment {
            ParamSegment::Literal(text) => out.push_str(&ecx.scopes.substitute(text)),
            ParamSegment::Call(call) => match registry::descriptor(&call.name) {
                Some(desc) => {
                    if let FuncKind::Value(func) = desc.kind {
                        ecx.descend()?;
                        let result = evaluate_value(func, desc, call, ecx);
                        ecx.ascend();
                        match result? {
                            Some(text) => out.push_str(&text),
                            None => out.push_str(&escape_quotes(&call.raw)),
                        }
                    }
                }
                None => out.push_str(&escape_quotes(&call.raw)),
            },
        }
    }
    Ok(out)
}

fn param_string(
    call: &Call,
    desc: &FuncDescriptor,
    name: &str,
    ecx: &mut EvalContext,
) -> TemplateResult<String> {
    match call.param(desc.params, name) {
        Some(value) => resolve_string(value, ecx),
        None => Ok(String::new()),
    }
}

/// Resolve a `Body` parameter in content position: literal runs and
/// value-function strings merge into text nodes, structural calls render
/// their own nodes.
fn resolve_content(value: &ParamValue, ecx: &mut EvalContext) -> TemplateResult<Vec<OutputNode>> {
    let mut nodes = Vec::new();
    let mut pending = String::new();
    for segment in &value.segments {
        match segment {
            ParamSegment::Literal(text) => pending.push_str(&ecx.scopes.substitute(text)),
            ParamSegment::Call(call) => {
                let value_func = registry::descriptor(&call.name).and_then(|d| match d.kind {
                    FuncKind::Value(func) => Some((d, func)),
                    _ => None,
                });
                if let Some((desc, func)) = value_func {
                    ecx.descend()?;
                    let result = evaluate_value(func, desc, call, ecx);
                    ecx.ascend();
                    match result? {
                        Some(text) => pending.push_str(&text),
                        None => pending.push_str(&escape_quotes(&call.raw)),
                    }
                } else {
                    if !pending.is_empty() {
                        nodes.push(OutputNode::text(std::mem::take(&mut pending)));
                    }
                    nodes.extend(evaluate_call(call, ecx)?);
                }
            }
        }
    }
    if !pending.is_empty() {
        nodes.push(OutputNode::text(pending));
    }
    Ok(nodes)
}

fn build_output_node(
    tag: &str,
    desc: &FuncDescriptor,
    call: &Call,
    ecx: &mut EvalContext,
) -> TemplateResult<OutputNode> {
    let mut node = OutputNode::tag(tag);
    let mut content = None;
    for (name, value) in call.resolved_params(desc.params) {
        let Some(name) = name else {
            warn!(func = %call.name, "extra positional parameter ignored");
            continue;
        };
        if Some(name) == desc.content_param {
            content = Some(value);
            continue;
        }
        if !desc.params.iter().any(|p| *p == name) {
            warn!(func = %call.name, param = name, "unknown parameter ignored");
            continue;
        }
        let resolved = resolve_string(value, ecx)?;
        if !resolved.is_empty() {
            node.set_attr(name.to_ascii_lowercase(), AttrValue::Str(resolved));
        }
    }

    // An explicit brace body wins over a Body parameter, and gets its
    // own scope frame.
    if let Some(body) = &call.body {
        ecx.scopes.push();
        let children = evaluate_nodes(body, ecx);
        ecx.scopes.pop();
        node.children = children?;
    } else if let Some(content) = content {
        node.children = resolve_content(content, ecx)?;
    }

    apply_modifiers(&mut node, call, ecx)?;
    Ok(node)
}

fn apply_modifiers(
    node: &mut OutputNode,
    call: &Call,
    ecx: &mut EvalContext,
) -> TemplateResult<()> {
    for modifier in &call.modifiers {
        match modifier.name.as_str() {
            "Alert" => {
                let mut entries = Vec::new();
                for (name, value) in modifier.resolved_params(ALERT_PARAMS) {
                    let Some(name) = name else { continue };
                    let resolved = resolve_string(value, ecx)?;
                    if !resolved.is_empty() {
                        entries.push((name.to_ascii_lowercase(), resolved));
                    }
                }
                node.set_attr("alert", AttrValue::Map(entries));
            }
            "Style" => {
                if let Some(raw) = modifier
                    .params
                    .first()
                    .and_then(|p| p.value.as_single_literal())
                {
                    let style = raw.trim();
                    if !style.is_empty() {
                        node.set_attr("style", AttrValue::Str(style.to_string()));
                    }
                }
            }
            other => warn!(func = %call.name, modifier = other, "unsupported modifier ignored"),
        }
    }
    Ok(())
}

fn build_table_node(
    desc: &FuncDescriptor,
    call: &Call,
    ecx: &mut EvalContext,
) -> TemplateResult<OutputNode> {
    let mut node = OutputNode::tag("table");
    let columns_spec = param_string(call, desc, "Columns", ecx)?;
    if !columns_spec.is_empty() {
        let columns = columns_spec
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                // `Title=name`; a bare item names both. `#...#` markers
                // around the column name refer to a computed column.
                let (title, name) = match item.split_once('=') {
                    Some((title, name)) => (title.trim(), name.trim()),
                    None => (item, item),
                };
                TableColumn {
                    name: name.trim_matches('#').to_string(),
                    title: title.to_string(),
                }
            })
            .collect();
        node.set_attr("columns", AttrValue::TableColumns(columns));
    }
    let source = param_string(call, desc, "Source", ecx)?;
    if !source.is_empty() {
        node.set_attr("source", AttrValue::Str(source));
    }
    Ok(node)
}

fn evaluate_value(
    func: ValueFunc,
    desc: &FuncDescriptor,
    call: &Call,
    ecx: &mut EvalContext,
) -> TemplateResult<Option<String>> {
    match func {
        ValueFunc::Now => {
            let format = param_string(call, desc, "Format", ecx)?;
            let format = if format.is_empty() {
                datetime::DEFAULT_FORMAT
            } else {
                &format
            };
            Ok(Some(datetime::now(format)))
        }
        ValueFunc::DateTime => {
            let value = param_string(call, desc, "DateTime", ecx)?;
            if value.is_empty() {
                return Ok(None);
            }
            let format = param_string(call, desc, "Format", ecx)?;
            let format = if format.is_empty() {
                datetime::DEFAULT_FORMAT
            } else {
                &format
            };
            Ok(datetime::format_datetime(&value, format))
        }
        ValueFunc::CmpTime => {
            let time1 = param_string(call, desc, "Time1", ecx)?;
            let time2 = param_string(call, desc, "Time2", ecx)?;
            if time1.is_empty() || time2.is_empty() {
                return Ok(None);
            }
            Ok(Some(datetime::cmp_time(&time1, &time2).to_string()))
        }
        ValueFunc::LangRes => {
            let name = param_string(call, desc, "Name", ecx)?;
            Ok(Some(ecx.system.lang_res(&name).unwrap_or(name)))
        }
        ValueFunc::SysParam => {
            let name = param_string(call, desc, "Name", ecx)?;
            Ok(Some(ecx.system.sys_param(&name).unwrap_or_default()))
        }
    }
}

fn evaluate_data_source(
    func: DataFunc,
    desc: &FuncDescriptor,
    call: &Call,
    ecx: &mut EvalContext,
) -> TemplateResult<Option<OutputNode>> {
    match func {
        DataFunc::Data => {
            let source = param_string(call, desc, "Source", ecx)?;
            let columns = param_string(call, desc, "Columns", ecx)?;
            let raw_rows = call
                .param(desc.params, "Data")
                .and_then(ParamValue::as_single_literal)
                .unwrap_or("");
            let mut result = DataSourceResult::inline(&columns, raw_rows);
            render_custom_columns(call, &mut result, ecx)?;
            Ok(Some(result.into_node(
                "data",
                SourceAttrs {
                    source: some_nonempty(source),
                    ..SourceAttrs::default()
                },
            )))
        }
        DataFunc::DbFind => {
            let table = param_string(call, desc, "Name", ecx)?;
            let source = param_string(call, desc, "Source", ecx)?;
            let mut columns = Vec::new();
            let mut order = None;
            let mut where_id = None;
            let mut vars_prefix = None;
            for modifier in &call.modifiers {
                match modifier.name.as_str() {
                    "Columns" => columns = split_csv(&modifier_arg(modifier, ecx)?),
                    "Order" => order = some_nonempty(modifier_arg(modifier, ecx)?),
                    "WhereId" => where_id = some_nonempty(modifier_arg(modifier, ecx)?),
                    "Vars" => vars_prefix = some_nonempty(modifier_arg(modifier, ecx)?),
                    "Custom" => {}
                    other => {
                        warn!(modifier = other, "unsupported DBFind modifier ignored")
                    }
                }
            }
            let query = ecx
                .storage
                .query(&table, &columns, order.as_deref(), where_id.as_deref())?;
            let mut result = DataSourceResult::from_query(query);
            if let Some(prefix) = &vars_prefix {
                bind_row_vars(prefix, &result, ecx);
            }
            render_custom_columns(call, &mut result, ecx)?;
            Ok(Some(result.into_node(
                "dbfind",
                SourceAttrs {
                    name: some_nonempty(table),
                    order,
                    source: some_nonempty(source),
                    where_id,
                },
            )))
        }
        DataFunc::EcosysParam => {
            let name = param_string(call, desc, "Name", ecx)?;
            let source = param_string(call, desc, "Source", ecx)?;
            let Some(value) = ecx.storage.ecosys_param(&name)? else {
                warn!(param = %name, "unknown ecosystem parameter, degrading to text");
                return Ok(Some(OutputNode::text(escape_quotes(&call.raw))));
            };
            if source.is_empty() {
                return Ok(Some(OutputNode::text(escape_quotes(&value))));
            }
            let mut result = DataSourceResult::from_scalar_list(&value);
            render_custom_columns(call, &mut result, ecx)?;
            Ok(Some(result.into_node(
                "data",
                SourceAttrs {
                    source: Some(source),
                    ..SourceAttrs::default()
                },
            )))
        }
    }
}

fn some_nonempty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Resolve a modifier's single argument in string position.
fn modifier_arg(modifier: &Call, ecx: &mut EvalContext) -> TemplateResult<String> {
    match modifier.params.first() {
        Some(param) => Ok(resolve_string(&param.value, ecx)?.trim().to_string()),
        None => Ok(String::new()),
    }
}

/// Bind the first row's columns into the current scope as
/// `#prefix_column#`.
fn bind_row_vars(prefix: &str, result: &DataSourceResult, ecx: &mut EvalContext) {
    let Some(first_row) = result.rows.first() else {
        return;
    };
    let bindings: Vec<(String, String)> = result
        .columns
        .iter()
        .zip(first_row)
        .map(|(column, value)| (format!("{prefix}_{column}"), value.clone()))
        .collect();
    for (name, value) in bindings {
        ecx.scopes.set(name, value);
    }
}

/// Render each `.Custom(column){ body }` modifier into an appended
/// column of type `tags`: the body is evaluated once per row with the
/// row's source columns bound in a fresh scope frame, and the resulting
/// sub-tree is serialized into the cell.
fn render_custom_columns(
    call: &Call,
    result: &mut DataSourceResult,
    ecx: &mut EvalContext,
) -> TemplateResult<()> {
    let base_columns = result.columns.clone();
    for custom in call.modifiers_named("Custom") {
        let column = custom
            .params
            .first()
            .and_then(|p| p.value.as_single_literal())
            .map(str::trim)
            .unwrap_or("");
        let Some(body) = &custom.body else {
            warn!(column, "Custom without a body ignored");
            continue;
        };
        if column.is_empty() {
            warn!("Custom without a column name ignored");
            continue;
        }
        let mut cells = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            ecx.descend()?;
            ecx.scopes.push();
            for (column, value) in base_columns.iter().zip(row) {
                ecx.scopes.set(column.clone(), value.clone());
            }
            let rendered = evaluate_nodes(body, ecx);
            ecx.scopes.pop();
            ecx.ascend();
            cells.push(tree::serialize_nodes(&rendered?)?);
        }
        result.push_column(column, "tags", cells);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Template;
    use crate::storage::{MemoryStorage, MemorySystemValues, NullStorage, NullSystemValues};
    use pretty_assertions::assert_eq;

    fn render(source: &str) -> String {
        let storage = NullStorage;
        let system = NullSystemValues;
        let mut ecx = EvalContext::new(&storage, &system);
        Template::compile(source)
            .unwrap()
            .render_to_string(&mut ecx)
            .unwrap()
    }

    #[test]
    fn unknown_function_degrades_to_text() {
        assert_eq!(
            render(r#"TestFunc("quoted")"#),
            r#"[{"tag":"text","text":"TestFunc(&#34;quoted&#34;)"}]"#
        );
    }

    #[test]
    fn output_call_in_string_position_is_empty() {
        assert_eq!(
            render("Input(Type: text, Value: OK Strong(Ooops))"),
            r#"[{"tag":"input","attr":{"type":"text","value":"OK "}}]"#
        );
    }

    #[test]
    fn unknown_call_in_string_position_keeps_raw() {
        assert_eq!(
            render("Input(Value: TestFunc(my value))"),
            r#"[{"tag":"input","attr":{"value":"TestFunc(my value)"}}]"#
        );
    }

    #[test]
    fn setvar_produces_no_node_and_binds() {
        assert_eq!(
            render("SetVar(Name: x, Value: 7)Span(#x#)"),
            r#"[{"tag":"span","children":[{"tag":"text","text":"7"}]}]"#
        );
    }

    #[test]
    fn explicit_body_wins_over_body_param() {
        assert_eq!(
            render("Button(Body: Add, Contract: UploadImage){ Upload! }"),
            concat!(
                r#"[{"tag":"button","attr":{"contract":"UploadImage"},"#,
                r#""children":[{"tag":"text","text":"Upload!"}]}]"#
            )
        );
    }

    #[test]
    fn body_scope_is_dropped_on_exit() {
        assert_eq!(
            render("SetVar(Name: x, Value: out)Div(){SetVar(Name: x, Value: in)}Span(#x#)"),
            concat!(
                r#"[{"tag":"div"},"#,
                r#"{"tag":"span","children":[{"tag":"text","text":"out"}]}]"#
            )
        );
    }

    #[test]
    fn sys_param_resolves_through_backend() {
        let storage = NullStorage;
        let mut system = MemorySystemValues::new();
        system.set_param("commission_size", "3");
        let mut ecx = EvalContext::new(&storage, &system);
        let tree = Template::compile("Strong(SysParam(commission_size))")
            .unwrap()
            .render_to_string(&mut ecx)
            .unwrap();
        assert_eq!(
            tree,
            r#"[{"tag":"strong","children":[{"tag":"text","text":"3"}]}]"#
        );
    }

    #[test]
    fn lang_res_falls_back_to_the_key() {
        assert_eq!(
            render("Button(Body: LangRes(save))"),
            r#"[{"tag":"button","children":[{"tag":"text","text":"save"}]}]"#
        );
    }

    #[test]
    fn table_columns_split_title_and_name() {
        assert_eq!(
            render(r#"Table(mysrc, "Image=#leftImg#, name")"#),
            concat!(
                r#"[{"tag":"table","attr":{"columns":"#,
                r#"[{"Name":"leftImg","Title":"Image"},{"Name":"name","Title":"name"}],"#,
                r#""source":"mysrc"}}]"#
            )
        );
    }

    #[test]
    fn storage_error_aborts_the_render() {
        let storage = MemoryStorage::new();
        let system = NullSystemValues;
        let mut ecx = EvalContext::new(&storage, &system);
        let result = Template::compile("DBFind(missing, src)")
            .unwrap()
            .render(&mut ecx);
        assert!(matches!(
            result,
            Err(crate::error::TemplateError::Storage(_))
        ));
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let mut source = String::new();
        for _ in 0..30 {
            source.push_str("Div(){");
        }
        source.push('x');
        for _ in 0..30 {
            source.push('}');
        }
        let storage = NullStorage;
        let system = NullSystemValues;
        let mut ecx = EvalContext::new(&storage, &system).with_max_depth(10);
        let result = Template::compile(&source).unwrap().render(&mut ecx);
        assert!(matches!(
            result,
            Err(crate::error::TemplateError::RecursionLimit { max_depth: 10 })
        ));
    }
}
