/*
 * tree.rs
 * Copyright (c) 2026 The stela authors
 */

//! Output tree and its canonical JSON serialization.
//!
//! Rendering produces a tree of [`OutputNode`]s which serializes to a
//! deterministic JSON form: attributes keep their first-assignment
//! order, except on data nodes where a fixed schema order applies, so a
//! rendered page hashes identically across runs.

use crate::error::TemplateResult;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Attribute order on `data` and `dbfind` nodes.
const SOURCE_ATTR_ORDER: &[&str] = &[
    "columns", "data", "name", "order", "source", "types", "whereid",
];

/// An attribute value on an output node.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    /// Column names on a data node.
    List(Vec<String>),
    /// Row data on a data node.
    Matrix(Vec<Vec<String>>),
    /// Nested string map, e.g. a button's `alert` block.
    Map(Vec<(String, String)>),
    /// A table's column descriptors.
    TableColumns(Vec<TableColumn>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableColumn {
    pub name: String,
    pub title: String,
}

/// One node of the rendered output tree.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputNode {
    pub tag: String,
    pub attr: Vec<(String, AttrValue)>,
    pub children: Vec<OutputNode>,
    pub text: Option<String>,
}

impl OutputNode {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attr: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            tag: "text".to_string(),
            attr: Vec::new(),
            children: Vec::new(),
            text: Some(text.into()),
        }
    }

    /// Set an attribute, overwriting an existing key in place so the
    /// first assignment fixes its position.
    pub fn set_attr(&mut self, name: impl Into<String>, value: AttrValue) {
        let name = name.into();
        match self.attr.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.attr.push((name, value)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attr.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttrValue::Str(s) => s.serialize(serializer),
            AttrValue::List(items) => items.serialize(serializer),
            AttrValue::Matrix(rows) => rows.serialize(serializer),
            AttrValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            AttrValue::TableColumns(columns) => columns.serialize(serializer),
        }
    }
}

/// Attribute map with the node's tag, so data nodes can apply the fixed
/// schema order.
struct Attrs<'a> {
    tag: &'a str,
    entries: &'a [(String, AttrValue)],
}

impl Serialize for Attrs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        if self.tag == "data" || self.tag == "dbfind" {
            for key in SOURCE_ATTR_ORDER {
                if let Some((name, value)) = self.entries.iter().find(|(n, _)| n == key) {
                    map.serialize_entry(name, value)?;
                }
            }
            for (name, value) in self.entries {
                if !SOURCE_ATTR_ORDER.contains(&name.as_str()) {
                    map.serialize_entry(name, value)?;
                }
            }
        } else {
            for (name, value) in self.entries {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

impl Serialize for OutputNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut len = 1;
        if !self.attr.is_empty() {
            len += 1;
        }
        if !self.children.is_empty() {
            len += 1;
        }
        if self.text.is_some() {
            len += 1;
        }
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("tag", &self.tag)?;
        if !self.attr.is_empty() {
            map.serialize_entry(
                "attr",
                &Attrs {
                    tag: &self.tag,
                    entries: &self.attr,
                },
            )?;
        }
        if !self.children.is_empty() {
            map.serialize_entry("children", &self.children)?;
        }
        if let Some(text) = &self.text {
            map.serialize_entry("text", text)?;
        }
        map.end()
    }
}

/// Serialize a rendered tree to its canonical JSON string.
pub fn serialize_nodes(nodes: &[OutputNode]) -> TemplateResult<String> {
    Ok(serde_json::to_string(nodes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_fields_are_omitted() {
        let node = OutputNode::tag("div");
        assert_eq!(serialize_nodes(&[node]).unwrap(), r#"[{"tag":"div"}]"#);
    }

    #[test]
    fn text_node_serializes_tag_and_text() {
        let node = OutputNode::text("hello");
        assert_eq!(
            serialize_nodes(&[node]).unwrap(),
            r#"[{"tag":"text","text":"hello"}]"#
        );
    }

    #[test]
    fn attrs_keep_first_assignment_order() {
        let mut node = OutputNode::tag("button");
        node.set_attr("class", AttrValue::Str("btn".to_string()));
        node.set_attr("contract", AttrValue::Str("Send".to_string()));
        node.set_attr("class", AttrValue::Str("btn2".to_string()));
        assert_eq!(
            serialize_nodes(&[node]).unwrap(),
            r#"[{"tag":"button","attr":{"class":"btn2","contract":"Send"}}]"#
        );
    }

    #[test]
    fn data_node_attrs_follow_schema_order() {
        let mut node = OutputNode::tag("data");
        node.set_attr("source", AttrValue::Str("mysrc".to_string()));
        node.set_attr(
            "data",
            AttrValue::Matrix(vec![vec!["1".to_string(), "first".to_string()]]),
        );
        node.set_attr(
            "columns",
            AttrValue::List(vec!["id".to_string(), "name".to_string()]),
        );
        node.set_attr("types", AttrValue::List(vec!["text".to_string(); 2]));
        assert_eq!(
            serialize_nodes(&[node]).unwrap(),
            concat!(
                r#"[{"tag":"data","attr":{"columns":["id","name"],"#,
                r#""data":[["1","first"]],"source":"mysrc","types":["text","text"]}}]"#
            )
        );
    }

    #[test]
    fn nested_map_attr() {
        let mut node = OutputNode::tag("button");
        node.set_attr(
            "alert",
            AttrValue::Map(vec![
                ("text".to_string(), "Sure?".to_string()),
                ("icon".to_string(), "warning".to_string()),
            ]),
        );
        assert_eq!(
            serialize_nodes(&[node]).unwrap(),
            r#"[{"tag":"button","attr":{"alert":{"text":"Sure?","icon":"warning"}}}]"#
        );
    }

    #[test]
    fn table_columns_serialize_pascal_case() {
        let mut node = OutputNode::tag("table");
        node.set_attr(
            "columns",
            AttrValue::TableColumns(vec![TableColumn {
                name: "leftImg".to_string(),
                title: "Image".to_string(),
            }]),
        );
        assert_eq!(
            serialize_nodes(&[node]).unwrap(),
            r#"[{"tag":"table","attr":{"columns":[{"Name":"leftImg","Title":"Image"}]}}]"#
        );
    }
}
