/*
 * datasource.rs
 * Copyright (c) 2026 The stela authors
 */

//! Normalized data-source results and their output-node form.
//!
//! `Data`, `DBFind` and `EcosysParam` all funnel into a
//! [`DataSourceResult`]: parallel `columns` and `types` vectors plus
//! rectangular `rows`. `.Custom` rendering appends computed columns of
//! type `tags` before the node is built.

use crate::tree::{AttrValue, OutputNode};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSourceResult {
    pub columns: Vec<String>,
    pub types: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Non-schema attributes of the node a result is rendered into.
#[derive(Debug, Clone, Default)]
pub struct SourceAttrs {
    pub name: Option<String>,
    pub order: Option<String>,
    pub source: Option<String>,
    pub where_id: Option<String>,
}

/// Split a comma-separated spec into trimmed, non-empty items.
pub fn split_csv(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl DataSourceResult {
    /// Build from an inline `Data(...)` block: a column spec and raw
    /// newline-separated CSV rows. Blank lines are skipped and short
    /// rows are padded to the column count.
    pub fn inline(columns_spec: &str, raw_rows: &str) -> Self {
        let columns = split_csv(columns_spec);
        let width = columns.len();
        let rows = raw_rows
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let mut row: Vec<String> =
                    line.split(',').map(|cell| cell.trim().to_string()).collect();
                row.resize(width, String::new());
                row
            })
            .collect();
        let types = vec!["text".to_string(); width];
        Self {
            columns,
            types,
            rows,
        }
    }

    /// Build from a storage query; all columns are typed `text`.
    pub fn from_query(result: crate::storage::QueryResult) -> Self {
        let types = vec!["text".to_string(); result.columns.len()];
        Self {
            columns: result.columns,
            types,
            rows: result.rows,
        }
    }

    /// Build the `id`/`name` listing of a comma-separated scalar, as
    /// `EcosysParam` renders a list-valued parameter.
    pub fn from_scalar_list(value: &str) -> Self {
        let rows = value
            .split(',')
            .enumerate()
            .map(|(i, item)| vec![(i + 1).to_string(), item.trim().to_string()])
            .collect();
        Self {
            columns: vec!["id".to_string(), "name".to_string()],
            types: vec!["text".to_string(); 2],
            rows,
        }
    }

    /// Append a computed column; `cells` must align with `rows`.
    pub fn push_column(&mut self, name: &str, ty: &str, cells: Vec<String>) {
        self.columns.push(name.to_string());
        self.types.push(ty.to_string());
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
    }

    /// Render into an output node carrying the data schema attributes.
    pub fn into_node(self, tag: &str, attrs: SourceAttrs) -> OutputNode {
        let mut node = OutputNode::tag(tag);
        node.set_attr("columns", AttrValue::List(self.columns));
        node.set_attr("data", AttrValue::Matrix(self.rows));
        if let Some(name) = attrs.name {
            node.set_attr("name", AttrValue::Str(name));
        }
        if let Some(order) = attrs.order {
            node.set_attr("order", AttrValue::Str(order));
        }
        if let Some(source) = attrs.source {
            node.set_attr("source", AttrValue::Str(source));
        }
        node.set_attr("types", AttrValue::List(self.types));
        if let Some(where_id) = attrs.where_id {
            node.set_attr("whereid", AttrValue::Str(where_id));
        }
        node
    }
}
