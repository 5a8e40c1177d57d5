// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result materialization
//!
//! Turns backend rows into rows of metamodel values:
//! - lists are flattened into the row, recursively
//! - paths contribute their elements in traversal order
//! - vertices and edges go through the identity cache and the type registry
//! - primitive scalars pass through unchanged
//! - anything else is kept as text with a warning
//!
//! Entities and tables are completed with secondary lookups before they are
//! cached.

pub mod lookup;

use crate::backend::raw::RawRecord;
use crate::backend::{GraphBackend, QueryParams, RawValue, Row};
use crate::cache::{IdentityCache, RecordKey};
use crate::error::{GraphError, Result};
use crate::ontology::{
    labels, Column, ColumnFactory, MetaObject, MetaValue, PhysicalTable, SecondaryLookup,
    TypeRegistry,
};
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Materialized result of one query
#[derive(Debug, Clone, Serialize)]
pub struct MetaResponse {
    /// Correlates log lines of one call
    pub query_id: String,
    /// One entry per backend row, in backend order
    pub contents: Vec<Vec<MetaValue>>,
    /// The caller's explanation of the query, passed through
    pub description: String,
}

impl MetaResponse {
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Executes queries and materializes their rows into metamodel values
#[derive(Clone)]
pub struct ResultMaterializer {
    backend: Arc<dyn GraphBackend>,
    registry: Arc<TypeRegistry>,
    cache: Arc<IdentityCache>,
}

impl ResultMaterializer {
    /// Materializer using the default registry and the process-wide cache
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self {
            backend,
            registry: Arc::new(TypeRegistry::new()),
            cache: IdentityCache::global(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<IdentityCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn backend(&self) -> &Arc<dyn GraphBackend> {
        &self.backend
    }

    pub fn cache(&self) -> &Arc<IdentityCache> {
        &self.cache
    }

    /// Execute `query` and materialize every row
    pub fn query(&self, query: &str, explanation: &str) -> Result<MetaResponse> {
        self.query_with_params(query, None, explanation)
    }

    pub fn query_with_params(
        &self,
        query: &str,
        params: Option<&QueryParams>,
        explanation: &str,
    ) -> Result<MetaResponse> {
        let query_id = Uuid::new_v4().to_string();
        debug!("[{}] Executing on {}: {}", query_id, self.backend.namespace(), query);

        let rows = self.backend.query(query, params)?;
        let contents = self.materialize_rows(&rows)?;

        debug!("[{}] Materialized {} rows", query_id, contents.len());
        Ok(MetaResponse {
            query_id,
            contents,
            description: explanation.to_string(),
        })
    }

    pub fn materialize_rows(&self, rows: &[Row]) -> Result<Vec<Vec<MetaValue>>> {
        rows.iter().map(|row| self.materialize_row(row)).collect()
    }

    /// Materialize one row, cells in declared column order
    pub fn materialize_row(&self, row: &Row) -> Result<Vec<MetaValue>> {
        let mut out = Vec::with_capacity(row.len());
        for cell in row.cells() {
            self.materialize_cell(cell, &mut out)?;
        }
        Ok(out)
    }

    fn materialize_cell(&self, cell: &RawValue, out: &mut Vec<MetaValue>) -> Result<()> {
        match cell {
            RawValue::List(items) => {
                for item in items {
                    self.materialize_cell(item, out)?;
                }
            }
            RawValue::Path(path) => {
                for record in path.traversal_order() {
                    out.push(self.convert_record(record)?);
                }
            }
            RawValue::Vertex(v) => out.push(self.convert_record(RawRecord::Vertex(v))?),
            RawValue::Edge(e) => out.push(self.convert_record(RawRecord::Edge(e))?),
            RawValue::Null
            | RawValue::Bool(_)
            | RawValue::Int(_)
            | RawValue::Float(_)
            | RawValue::String(_) => out.push(MetaValue::Scalar(cell.to_json())),
            RawValue::Map(_) => {
                warn!("Unrecognized cell kept as text: {}", cell);
                out.push(MetaValue::Text(cell.to_string()));
            }
        }
        Ok(())
    }

    /// Convert one record through the identity cache. A cache miss parses
    /// the record, completes it with secondary lookups and caches the result.
    pub fn convert_record(&self, record: RawRecord<'_>) -> Result<MetaValue> {
        let key = RecordKey::of_record(self.backend.namespace(), record);
        self.cache.get_or_try_insert(key, || {
            let factory = self.registry.dispatch(record);
            let parsed = factory.parse(record)?;
            factory.resolve(parsed, self)
        })
    }
}

fn first_cell<'a>(row: &'a Row, column: &str) -> Option<&'a RawValue> {
    row.get(column).or_else(|| row.cells().next())
}

fn unexpected(expected: &str, found: &RawValue) -> GraphError {
    GraphError::UnexpectedRecord {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

impl SecondaryLookup for ResultMaterializer {
    fn resolve_tables(&self, entity_id: &str) -> Result<Vec<Arc<PhysicalTable>>> {
        let query = lookup::tables_query(self.backend.as_ref(), entity_id)?;
        let rows = self.backend.query(&query, None)?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let cell = match first_cell(row, "t") {
                Some(cell) => cell,
                None => continue,
            };
            let record = match cell {
                RawValue::Vertex(v) => RawRecord::Vertex(v),
                other => return Err(unexpected(labels::PHYSICAL_TABLE, other)),
            };
            match self.convert_record(record)? {
                MetaValue::Object(MetaObject::PhysicalTable(table)) => tables.push(table),
                _ => return Err(unexpected(labels::PHYSICAL_TABLE, cell)),
            }
        }
        Ok(tables)
    }

    fn resolve_columns(&self, full_table_name: &str) -> Result<Vec<Column>> {
        let query = lookup::columns_query(self.backend.as_ref(), full_table_name);
        let rows = self.backend.query(&query, None)?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            match first_cell(row, "c") {
                Some(RawValue::Vertex(v)) => {
                    columns.push(ColumnFactory.parse_column(RawRecord::Vertex(v))?)
                }
                Some(other) => return Err(unexpected(labels::COLUMN, other)),
                None => continue,
            }
        }
        Ok(columns)
    }
}
