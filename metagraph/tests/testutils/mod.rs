// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared fixtures for integration tests
#![allow(dead_code)]

use metagraph::backend::{
    GraphBackend, GraphSchema, KuzuConnection, KuzuResult, QueryParams, RawEdge, RawPath,
    RawValue, RawVertex, Row, SqlSession, TextRows,
};
use metagraph::{GraphError, Result};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Canned outcome of a query whose text contains a marker
enum Reply {
    Rows(Vec<Row>),
    Error(String),
}

/// Backend answering queries from a script. The first rule whose marker
/// occurs in the query text wins; unmatched queries return no rows.
pub struct ScriptedBackend {
    namespace: String,
    rules: Vec<(String, Reply)>,
    issued: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            rules: Vec::new(),
            issued: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, marker: &str, rows: Vec<Row>) -> Self {
        self.rules.push((marker.to_string(), Reply::Rows(rows)));
        self
    }

    pub fn fail_on(mut self, marker: &str, detail: &str) -> Self {
        self.rules
            .push((marker.to_string(), Reply::Error(detail.to_string())));
        self
    }

    /// Every query issued so far, in order
    pub fn issued(&self) -> Vec<String> {
        self.issued.lock().clone()
    }

    pub fn count_issued(&self, marker: &str) -> usize {
        self.issued.lock().iter().filter(|q| q.contains(marker)).count()
    }
}

impl GraphBackend for ScriptedBackend {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn query(&self, query: &str, _params: Option<&QueryParams>) -> Result<Vec<Row>> {
        self.issued.lock().push(query.to_string());
        for (marker, reply) in &self.rules {
            if query.contains(marker.as_str()) {
                return match reply {
                    Reply::Rows(rows) => Ok(rows.clone()),
                    Reply::Error(detail) => Err(GraphError::query(query, detail.clone())),
                };
            }
        }
        Ok(Vec::new())
    }

    fn explain(&self, query: &str) -> Result<()> {
        for (marker, reply) in &self.rules {
            if let Reply::Error(detail) = reply {
                if query.contains(marker.as_str()) {
                    return Err(GraphError::query(query, detail.clone()));
                }
            }
        }
        Ok(())
    }

    fn graph_schema(&self) -> Result<GraphSchema> {
        Ok(GraphSchema {
            node_labels: vec!["DataEntity".to_string(), "PhysicalTable".to_string()],
            edge_labels: vec!["IMPLEMENTS".to_string()],
            ..Default::default()
        })
    }

    fn refresh_schema(&self) -> Result<()> {
        Ok(())
    }

    fn id_literal(&self, id: &str) -> Result<String> {
        Ok(id.to_string())
    }

    fn label<'a>(&self, label: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(label)
    }
}

pub fn text(value: &str) -> RawValue {
    RawValue::String(value.to_string())
}

pub fn row(cells: Vec<(&str, RawValue)>) -> Row {
    Row::new(
        cells
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

pub fn data_entity(id: &str, name: &str) -> RawVertex {
    RawVertex::new(id, "DataEntity").with_property("name", text(name))
}

pub fn physical_table(id: &str, full_table_name: &str) -> RawVertex {
    let (schema, table_name) = full_table_name
        .split_once('.')
        .unwrap_or(("public", full_table_name));
    RawVertex::new(id, "PhysicalTable")
        .with_property("name", text(table_name))
        .with_property("schema", text(schema))
        .with_property("table_name", text(table_name))
        .with_property("full_table_name", text(full_table_name))
}

pub fn column(id: &str, name: &str, dtype: &str) -> RawVertex {
    RawVertex::new(id, "Column")
        .with_property("name", text(name))
        .with_property("dtype", text(dtype))
}

pub fn application(id: &str, name: &str) -> RawVertex {
    RawVertex::new(id, "Application").with_property("name", text(name))
}

pub fn flows_to(id: &str, from: &str, to: &str) -> RawEdge {
    RawEdge::new(id, "FLOWS_TO", from, to)
}

pub fn related_to(id: &str, from: &str, to: &str, rel: &str) -> RawEdge {
    RawEdge::new(id, "RELATED_TO", from, to).with_property("rel", text(rel))
}

pub fn path(nodes: Vec<RawVertex>, rels: Vec<RawEdge>) -> RawValue {
    RawValue::Path(RawPath { nodes, rels })
}

/// Lookup marker of the tables query for one entity
pub fn tables_marker(entity_id: &str) -> String {
    format!("WHERE ID(e) = {} RETURN t", entity_id)
}

/// Lookup marker of the columns query for one table
pub fn columns_marker(full_table_name: &str) -> String {
    format!("{{full_table_name: '{}'}}", full_table_name)
}

/// SQL session answering statements from a script, shared log of every
/// statement it received
#[derive(Clone, Default)]
pub struct ScriptedSqlSession {
    rules: Vec<(String, std::result::Result<TextRows, String>)>,
    pub statements: Arc<Mutex<Vec<String>>>,
    pub resets: Arc<Mutex<usize>>,
}

impl ScriptedSqlSession {
    pub fn on(mut self, marker: &str, columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> Self {
        let rows = TextRows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|cells| cells.into_iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        };
        self.rules.push((marker.to_string(), Ok(rows)));
        self
    }

    pub fn fail_on(mut self, marker: &str, detail: &str) -> Self {
        self.rules.push((marker.to_string(), Err(detail.to_string())));
        self
    }
}

impl SqlSession for ScriptedSqlSession {
    fn query_text(&mut self, sql: &str) -> std::result::Result<TextRows, String> {
        self.statements.lock().push(sql.to_string());
        self.rules
            .iter()
            .find(|(marker, _)| sql.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Ok(TextRows::default()))
    }

    fn reset(&mut self) -> std::result::Result<(), String> {
        *self.resets.lock() += 1;
        Ok(())
    }
}

/// Kuzu connection answering queries from a script
#[derive(Default)]
pub struct ScriptedKuzuConnection {
    database: PathBuf,
    rules: Vec<(String, std::result::Result<KuzuResult, String>)>,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedKuzuConnection {
    pub fn new(database: &str) -> Self {
        Self {
            database: PathBuf::from(database),
            ..Default::default()
        }
    }

    pub fn on(mut self, marker: &str, columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> Self {
        let result = KuzuResult {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        };
        self.rules.push((marker.to_string(), Ok(result)));
        self
    }

    pub fn fail_on(mut self, marker: &str, detail: &str) -> Self {
        self.rules.push((marker.to_string(), Err(detail.to_string())));
        self
    }
}

impl KuzuConnection for ScriptedKuzuConnection {
    fn execute(
        &self,
        query: &str,
        _params: Option<&QueryParams>,
    ) -> std::result::Result<KuzuResult, String> {
        self.queries.lock().push(query.to_string());
        self.rules
            .iter()
            .find(|(marker, _)| query.contains(marker.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Ok(KuzuResult::default()))
    }

    fn database(&self) -> &Path {
        &self.database
    }
}
