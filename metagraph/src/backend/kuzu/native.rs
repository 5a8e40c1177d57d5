// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-process Kuzu connection through the `kuzu` crate
//!
//! Values are rendered into the same dict-style JSON the Python driver
//! produces, so both connections share one normalization path.

use super::connection::{KuzuConnection, KuzuResult};
use crate::backend::QueryParams;
use crate::error::{GraphError, Result};
use kuzu::{Connection, Database, InternalID, LogicalType, NodeVal, RelVal, SystemConfig, Value};
use log::{debug, info};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use std::path::{Path, PathBuf};

/// Owns the database; every statement runs on a connection of its own
pub struct NativeKuzuConnection {
    database: Database,
    path: PathBuf,
}

impl NativeKuzuConnection {
    pub fn open(path: impl Into<PathBuf>, read_only: bool) -> Result<Self> {
        let path = path.into();
        let database = Database::new(&path, SystemConfig::default().read_only(read_only))
            .map_err(|e| {
                GraphError::Connection(format!("failed to open {}: {}", path.display(), e))
            })?;
        info!("Opened Kuzu database {} (read_only={})", path.display(), read_only);
        Ok(Self { database, path })
    }
}

fn internal_id(id: &InternalID) -> JsonValue {
    let mut obj = JsonMap::new();
    obj.insert("offset".to_string(), JsonValue::from(id.offset));
    obj.insert("table".to_string(), JsonValue::from(id.table_id));
    JsonValue::Object(obj)
}

fn properties_into(obj: &mut JsonMap<String, JsonValue>, properties: &[(String, Value)]) {
    for (key, value) in properties {
        obj.insert(key.clone(), to_json(value));
    }
}

fn node_json(node: &NodeVal) -> JsonValue {
    let mut obj = JsonMap::new();
    obj.insert("_id".to_string(), internal_id(node.get_node_id()));
    obj.insert("_label".to_string(), JsonValue::String(node.get_label_name().clone()));
    properties_into(&mut obj, node.get_properties());
    JsonValue::Object(obj)
}

fn rel_json(rel: &RelVal) -> JsonValue {
    let mut obj = JsonMap::new();
    obj.insert("_src".to_string(), internal_id(rel.get_src_node()));
    obj.insert("_dst".to_string(), internal_id(rel.get_dst_node()));
    obj.insert("_label".to_string(), JsonValue::String(rel.get_label_name().clone()));
    properties_into(&mut obj, rel.get_properties());
    JsonValue::Object(obj)
}

/// Render one engine value in the driver's dict-style format
fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null(_) => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int64(n) => JsonValue::from(*n),
        Value::Int32(n) => JsonValue::from(*n),
        Value::Int16(n) => JsonValue::from(*n),
        Value::Int8(n) => JsonValue::from(*n),
        Value::UInt64(n) => JsonValue::from(*n),
        Value::UInt32(n) => JsonValue::from(*n),
        Value::UInt16(n) => JsonValue::from(*n),
        Value::UInt8(n) => JsonValue::from(*n),
        Value::Double(n) => Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number),
        Value::Float(n) => Number::from_f64(f64::from(*n)).map_or(JsonValue::Null, JsonValue::Number),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::InternalID(id) => internal_id(id),
        Value::Node(node) => node_json(node),
        Value::Rel(rel) => rel_json(rel),
        Value::RecursiveRel { nodes, rels } => {
            let mut obj = JsonMap::new();
            obj.insert("_nodes".to_string(), nodes.iter().map(node_json).collect());
            obj.insert("_rels".to_string(), rels.iter().map(rel_json).collect());
            JsonValue::Object(obj)
        }
        Value::List(_, items) | Value::Array(_, items) => items.iter().map(to_json).collect(),
        Value::Struct(fields) => {
            let mut obj = JsonMap::new();
            properties_into(&mut obj, fields);
            JsonValue::Object(obj)
        }
        other => JsonValue::String(other.to_string()),
    }
}

fn logical_type(value: &Value) -> Option<LogicalType> {
    match value {
        Value::Bool(_) => Some(LogicalType::Bool),
        Value::Int64(_) => Some(LogicalType::Int64),
        Value::Double(_) => Some(LogicalType::Double),
        Value::String(_) => Some(LogicalType::String),
        _ => None,
    }
}

/// Convert a JSON parameter into an engine value
fn param_value(name: &str, value: &JsonValue) -> std::result::Result<Value, String> {
    let unsupported = || format!("unsupported value for parameter ${}", name);
    match value {
        JsonValue::Null => Ok(Value::Null(LogicalType::String)),
        JsonValue::Bool(b) => Ok(Value::Bool(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int64(i)),
            None => n.as_f64().map(Value::Double).ok_or_else(unsupported),
        },
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        JsonValue::Array(items) => {
            let items = items
                .iter()
                .map(|item| param_value(name, item))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let element = match items.first() {
                Some(first) => logical_type(first).ok_or_else(unsupported)?,
                None => LogicalType::String,
            };
            Ok(Value::List(element, items))
        }
        JsonValue::Object(_) => Err(unsupported()),
    }
}

impl KuzuConnection for NativeKuzuConnection {
    fn execute(
        &self,
        query: &str,
        params: Option<&QueryParams>,
    ) -> std::result::Result<KuzuResult, String> {
        let connection = Connection::new(&self.database).map_err(|e| e.to_string())?;

        let result = match params.filter(|p| !p.is_empty()) {
            Some(params) => {
                let values = params
                    .iter()
                    .map(|(name, value)| Ok((name.as_str(), param_value(name, value)?)))
                    .collect::<std::result::Result<Vec<_>, String>>()?;
                let mut statement = connection.prepare(query).map_err(|e| e.to_string())?;
                connection
                    .execute(&mut statement, values)
                    .map_err(|e| e.to_string())?
            }
            None => connection.query(query).map_err(|e| e.to_string())?,
        };

        let columns = result.get_column_names();
        let rows: Vec<Vec<JsonValue>> = result
            .map(|row| row.iter().map(to_json).collect())
            .collect();
        debug!("Kuzu returned {} rows", rows.len());
        Ok(KuzuResult { columns, rows })
    }

    fn database(&self) -> &Path {
        &self.path
    }
}
