/*
 * storage.rs
 * Copyright (c) 2026 The stela authors
 */

//! Backend traits for data sources and system values, plus in-memory
//! implementations used as defaults and in tests.

use std::collections::HashMap;
use thiserror::Error;

/// A failed data-source lookup. Storage errors abort the render rather
/// than degrading to an empty result.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StorageError {
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a table query: the projected column names and the rows in
/// matching order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Tabular data backend for `DBFind` and `EcosysParam`.
pub trait Storage {
    /// Query a table. `columns` empty means all columns; `order` sorts by
    /// the named column; `where_id` filters on the `id` column.
    fn query(
        &self,
        table: &str,
        columns: &[String],
        order: Option<&str>,
        where_id: Option<&str>,
    ) -> Result<QueryResult, StorageError>;

    /// An ecosystem parameter value, `None` when the parameter does not
    /// exist.
    fn ecosys_param(&self, name: &str) -> Result<Option<String>, StorageError>;
}

/// Read-only system values resolved during evaluation.
pub trait SystemValues {
    fn sys_param(&self, name: &str) -> Option<String>;

    /// A language resource; the caller falls back to the key itself.
    fn lang_res(&self, name: &str) -> Option<String>;
}

/// Backend with no data: queries come back empty, parameters are absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStorage;

impl Storage for NullStorage {
    fn query(
        &self,
        _table: &str,
        columns: &[String],
        _order: Option<&str>,
        _where_id: Option<&str>,
    ) -> Result<QueryResult, StorageError> {
        Ok(QueryResult {
            columns: columns.to_vec(),
            rows: Vec::new(),
        })
    }

    fn ecosys_param(&self, _name: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSystemValues;

impl SystemValues for NullSystemValues {
    fn sys_param(&self, _name: &str) -> Option<String> {
        None
    }

    fn lang_res(&self, _name: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// In-memory [`Storage`] backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: HashMap<String, MemoryTable>,
    params: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, name: &str, columns: &[&str], rows: &[&[&str]]) {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|c| c.to_string()).collect())
                    .collect(),
            },
        );
    }

    pub fn set_param(&mut self, name: &str, value: &str) {
        self.params.insert(name.to_string(), value.to_string());
    }
}

impl Storage for MemoryStorage {
    fn query(
        &self,
        table: &str,
        columns: &[String],
        order: Option<&str>,
        where_id: Option<&str>,
    ) -> Result<QueryResult, StorageError> {
        let table_data = self
            .tables
            .get(table)
            .ok_or_else(|| StorageError::new(format!("table {table} not found")))?;

        let mut rows = table_data.rows.clone();

        if let Some(id) = where_id {
            let id_pos = table_data
                .columns
                .iter()
                .position(|c| c == "id")
                .ok_or_else(|| StorageError::new(format!("table {table} has no id column")))?;
            rows.retain(|row| row.get(id_pos).map(String::as_str) == Some(id));
        }

        if let Some(order_col) = order {
            let pos = table_data
                .columns
                .iter()
                .position(|c| c == order_col)
                .ok_or_else(|| {
                    StorageError::new(format!("unknown order column {order_col} in {table}"))
                })?;
            rows.sort_by(|a, b| {
                let (a, b) = (a[pos].as_str(), b[pos].as_str());
                match (a.parse::<i64>(), b.parse::<i64>()) {
                    (Ok(a), Ok(b)) => a.cmp(&b),
                    _ => a.cmp(b),
                }
            });
        }

        let projection: Vec<String> = if columns.is_empty() {
            table_data.columns.clone()
        } else {
            columns.to_vec()
        };
        let positions = projection
            .iter()
            .map(|name| {
                table_data
                    .columns
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| {
                        StorageError::new(format!("unknown column {name} in {table}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = rows
            .into_iter()
            .map(|row| positions.iter().map(|&p| row[p].clone()).collect())
            .collect();
        Ok(QueryResult {
            columns: projection,
            rows,
        })
    }

    fn ecosys_param(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self.params.get(name).cloned())
    }
}

/// In-memory [`SystemValues`] backend.
#[derive(Debug, Clone, Default)]
pub struct MemorySystemValues {
    params: HashMap<String, String>,
    resources: HashMap<String, String>,
}

impl MemorySystemValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_param(&mut self, name: &str, value: &str) {
        self.params.insert(name.to_string(), value.to_string());
    }

    pub fn set_resource(&mut self, name: &str, value: &str) {
        self.resources.insert(name.to_string(), value.to_string());
    }
}

impl SystemValues for MemorySystemValues {
    fn sys_param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    fn lang_res(&self, name: &str) -> Option<String> {
        self.resources.get(name).cloned()
    }
}
