// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Pluggable graph backends
//!
//! This module provides:
//! - The `GraphBackend` contract every graph engine adapter implements
//! - Backend-neutral raw values (vertices, edges, paths, scalars)
//! - Cypher literal rendering and parameter binding
//! - Schema descriptions for text-generation collaborators
//! - The SQL-embedded (Apache AGE) and embedded-native (Kuzu) adapters

pub mod age;
pub mod kuzu;
pub mod literal;
pub mod raw;
pub mod schema;

pub use age::{AgeGraph, PostgresSession, SqlSession, TextRows};
pub use self::kuzu::{KuzuConnection, KuzuGraph, KuzuResult, PythonKuzuConnection};
#[cfg(feature = "kuzu-native")]
pub use self::kuzu::NativeKuzuConnection;
pub use raw::{Properties, RawEdge, RawPath, RawRecord, RawValue, RawVertex};
pub use schema::{GraphSchema, LabelProperties, PropertyType, Triple};

use crate::config::{BackendKind, MetaGraphConfig};
use crate::error::{GraphError, Result};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named query parameters
pub type QueryParams = BTreeMap<String, JsonValue>;

/// One result row: declared output-column names with their raw cells, in
/// the order the query declared them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub values: Vec<(String, RawValue)>,
}

impl Row {
    pub fn new(values: Vec<(String, RawValue)>) -> Self {
        Self { values }
    }

    /// Look up a cell by its output-column name
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn cells(&self) -> impl Iterator<Item = &RawValue> {
        self.values.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Executes Cypher-style queries against one graph engine.
///
/// Implementations must leave their connection usable after a failed query.
/// A backend instance may be shared between threads; adapters that hold a
/// single connection serialize access to it.
pub trait GraphBackend: Send + Sync {
    /// Identifies the graph this backend talks to. Identity-cache entries are
    /// scoped by it so two graphs never share cached objects.
    fn namespace(&self) -> &str;

    /// Execute a query and return its rows in backend order
    fn query(&self, query: &str, params: Option<&QueryParams>) -> Result<Vec<Row>>;

    /// Validate that a query is executable without running it
    fn explain(&self, query: &str) -> Result<()>;

    /// Structured schema, discovered on first use
    fn graph_schema(&self) -> Result<GraphSchema>;

    /// Re-read labels, properties and relationship triples
    fn refresh_schema(&self) -> Result<()>;

    /// Textual schema description for text-generation collaborators
    fn schema(&self) -> Result<String> {
        Ok(self.graph_schema()?.to_string())
    }

    /// Render a record identity produced by this backend as an expression
    /// comparable with `ID(var)` in a query
    fn id_literal(&self, id: &str) -> Result<String>;

    /// Render a label for use in a pattern, quoting it when the engine needs it
    fn label<'a>(&self, label: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(label)
    }
}

/// Open the backend selected by a validated configuration
pub fn open_backend(
    config: &MetaGraphConfig,
    password: Option<&str>,
) -> Result<Arc<dyn GraphBackend>> {
    config.validate()?;
    match config.backend {
        BackendKind::Age => {
            let dsn = config.age.dsn.as_deref().unwrap_or_default();
            let graph_name = config.age.graph_name.as_deref().unwrap_or_default();
            Ok(Arc::new(AgeGraph::connect(dsn, graph_name, password)?))
        }
        BackendKind::Kuzu => {
            let database = config
                .kuzu
                .database
                .as_ref()
                .ok_or_else(|| GraphError::Config("Kuzu database path is not set".to_string()))?;
            if !database.exists() {
                return Err(GraphError::Connection(format!(
                    "Kuzu database {} does not exist",
                    database.display()
                )));
            }
            #[cfg(feature = "kuzu-native")]
            let connection = NativeKuzuConnection::open(database, config.kuzu.read_only)?;
            #[cfg(not(feature = "kuzu-native"))]
            let connection = PythonKuzuConnection::new(database).with_python(&config.kuzu.python);
            Ok(Arc::new(KuzuGraph::new(connection)))
        }
    }
}
