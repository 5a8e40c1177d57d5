// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Kuzu adapter
//!
//! Kuzu takes Cypher and parameters natively. Its rows arrive in the
//! driver's dict-style format and are normalized into raw values here.

pub mod connection;
#[cfg(feature = "kuzu-native")]
pub mod native;

pub use connection::{KuzuConnection, KuzuResult, PythonKuzuConnection};
#[cfg(feature = "kuzu-native")]
pub use native::NativeKuzuConnection;

use crate::backend::literal::string_literal;
use crate::backend::raw::{Properties, RawEdge, RawPath, RawValue, RawVertex};
use crate::backend::schema::{GraphSchema, LabelProperties, PropertyType, Triple};
use crate::backend::{GraphBackend, QueryParams, Row};
use crate::error::{GraphError, Result};
use log::{debug, info};
use parking_lot::RwLock;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::borrow::Cow;

/// Render a Kuzu internal id (`{offset, table}`) as `"<offset>:<table>"`
fn internal_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Object(obj) => {
            let offset = obj.get("offset")?;
            let table = obj.get("table")?;
            Some(format!("{}:{}", offset, table))
        }
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

fn properties_of(obj: &JsonMap<String, JsonValue>) -> Properties {
    obj.iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(key, value)| (key.clone(), normalize(value)))
        .collect()
}

fn record_of(obj: &JsonMap<String, JsonValue>) -> Option<RawValue> {
    let label = obj.get("_label")?.as_str()?.to_string();
    let src = obj.get("_src").and_then(internal_id);
    let dst = obj.get("_dst").and_then(internal_id);

    match (src, dst) {
        (Some(from_id), Some(to_id)) => {
            let id = obj
                .get("_id")
                .and_then(internal_id)
                .unwrap_or_else(|| format!("{}-{}->{}", from_id, label, to_id));
            Some(RawValue::Edge(RawEdge {
                id,
                label,
                from_id,
                to_id,
                properties: properties_of(obj),
            }))
        }
        _ => {
            let id = obj.get("_id").and_then(internal_id)?;
            Some(RawValue::Vertex(RawVertex {
                id,
                label,
                properties: properties_of(obj),
            }))
        }
    }
}

fn path_of(obj: &JsonMap<String, JsonValue>) -> RawPath {
    let mut path = RawPath::default();
    let members = ["_nodes", "_rels"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(JsonValue::as_array))
        .flatten();
    for member in members {
        match normalize(member) {
            RawValue::Vertex(v) => path.nodes.push(v),
            RawValue::Edge(e) => path.rels.push(e),
            _ => {}
        }
    }
    path
}

/// Normalize one dict-style cell into a raw value
pub fn normalize(value: &JsonValue) -> RawValue {
    match value {
        JsonValue::Object(obj) if obj.contains_key("_nodes") || obj.contains_key("_rels") => {
            RawValue::Path(path_of(obj))
        }
        JsonValue::Object(obj) => record_of(obj).unwrap_or_else(|| {
            RawValue::Map(
                obj.iter()
                    .map(|(key, value)| (key.clone(), normalize(value)))
                    .collect(),
            )
        }),
        JsonValue::Array(items) => RawValue::List(items.iter().map(normalize).collect()),
        scalar => RawValue::from_json(scalar),
    }
}

fn column_text<'a>(columns: &[String], row: &'a [JsonValue], name: &str) -> Option<&'a str> {
    let idx = columns.iter().position(|c| c == name)?;
    row.get(idx)?.as_str()
}

/// Graph backend over an embedded Kuzu database
pub struct KuzuGraph<C: KuzuConnection> {
    namespace: String,
    connection: C,
    schema: RwLock<Option<GraphSchema>>,
}

impl<C: KuzuConnection> KuzuGraph<C> {
    pub fn new(connection: C) -> Self {
        Self {
            namespace: format!("kuzu:{}", connection.database().display()),
            connection,
            schema: RwLock::new(None),
        }
    }

    fn execute(&self, query: &str, params: Option<&QueryParams>) -> Result<KuzuResult> {
        self.connection
            .execute(query, params)
            .map_err(|detail| GraphError::query(query, detail))
    }

    fn table_properties(&self, table: &str) -> Result<LabelProperties> {
        let query = format!("CALL table_info({}) RETURN *", string_literal(table));
        let result = self.execute(&query, None)?;
        let mut catalog = LabelProperties::new(table);
        for row in &result.rows {
            if let (Some(name), Some(kind)) = (
                column_text(&result.columns, row, "name"),
                column_text(&result.columns, row, "type"),
            ) {
                catalog
                    .properties
                    .insert((name.to_string(), PropertyType::from_type_name(kind)));
            }
        }
        Ok(catalog)
    }

    fn connections(&self, rel_table: &str) -> Result<Vec<Triple>> {
        let query = format!("CALL show_connection({}) RETURN *", string_literal(rel_table));
        let result = self.execute(&query, None)?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                let start = column_text(&result.columns, row, "source table name")?;
                let end = column_text(&result.columns, row, "destination table name")?;
                Some(Triple {
                    start: start.to_string(),
                    rel: rel_table.to_string(),
                    end: end.to_string(),
                })
            })
            .collect())
    }

    fn discover_schema(&self) -> Result<GraphSchema> {
        let tables = self.execute("CALL show_tables() RETURN *", None)?;
        let mut schema = GraphSchema::default();
        for row in &tables.rows {
            let name = match column_text(&tables.columns, row, "name") {
                Some(name) => name.to_string(),
                None => continue,
            };
            match column_text(&tables.columns, row, "type") {
                Some("NODE") => schema.node_labels.push(name),
                Some("REL") => schema.edge_labels.push(name),
                _ => {}
            }
        }
        schema.node_labels.sort();
        schema.edge_labels.sort();

        for label in &schema.node_labels {
            schema.node_properties.push(self.table_properties(label)?);
        }
        for label in &schema.edge_labels {
            schema.edge_properties.push(self.table_properties(label)?);
            schema.triples.extend(self.connections(label)?);
        }
        schema.triples.sort();
        schema.triples.dedup();

        info!(
            "Discovered Kuzu schema: {} node tables, {} rel tables",
            schema.node_labels.len(),
            schema.edge_labels.len()
        );
        Ok(schema)
    }
}

impl<C: KuzuConnection> GraphBackend for KuzuGraph<C> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn query(&self, query: &str, params: Option<&QueryParams>) -> Result<Vec<Row>> {
        debug!("Kuzu query: {}", query);
        let KuzuResult { columns, rows } = self.execute(query, params)?;
        Ok(rows
            .iter()
            .map(|cells| {
                Row::new(
                    columns
                        .iter()
                        .zip(cells)
                        .map(|(column, cell)| (column.clone(), normalize(cell)))
                        .collect(),
                )
            })
            .collect())
    }

    fn explain(&self, query: &str) -> Result<()> {
        self.execute(&format!("EXPLAIN {}", query), None)
            .map(|_| ())
            .map_err(|e| match e {
                GraphError::Query { detail, .. } => GraphError::query(query, detail),
                other => other,
            })
    }

    fn graph_schema(&self) -> Result<GraphSchema> {
        if let Some(schema) = self.schema.read().as_ref() {
            return Ok(schema.clone());
        }
        let schema = self.discover_schema()?;
        *self.schema.write() = Some(schema.clone());
        Ok(schema)
    }

    fn refresh_schema(&self) -> Result<()> {
        let schema = self.discover_schema()?;
        *self.schema.write() = Some(schema);
        Ok(())
    }

    fn id_literal(&self, id: &str) -> Result<String> {
        let invalid = || GraphError::InvalidQuery(format!("'{}' is not a Kuzu internal id", id));
        let (offset, table) = id.split_once(':').ok_or_else(invalid)?;
        let offset: u64 = offset.trim().parse().map_err(|_| invalid())?;
        let table: u64 = table.trim().parse().map_err(|_| invalid())?;
        Ok(format!("internal_id({}, {})", table, offset))
    }

    /// Labels are always backticked; `Column` is a reserved word in Kuzu
    fn label<'a>(&self, label: &'a str) -> Cow<'a, str> {
        Cow::Owned(format!("`{}`", label.replace('`', "``")))
    }
}
