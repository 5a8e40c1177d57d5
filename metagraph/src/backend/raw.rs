// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Backend-neutral raw values
//!
//! Every backend adapter normalizes its wire format into these types before
//! a row reaches the materializer. Vertices and edges keep the backend's own
//! identity token as a string so that equal tokens mean the same record.

use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

/// Property bag of a vertex or edge, ordered by key for stable rendering
pub type Properties = BTreeMap<String, RawValue>;

/// A raw cell value as returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<RawValue>),
    /// Structured value that is neither a vertex, an edge nor a path
    Map(BTreeMap<String, RawValue>),
    Vertex(RawVertex),
    Edge(RawEdge),
    Path(RawPath),
}

/// A generic vertex record
#[derive(Debug, Clone, PartialEq)]
pub struct RawVertex {
    pub id: String,
    pub label: String,
    pub properties: Properties,
}

/// A generic edge record
#[derive(Debug, Clone, PartialEq)]
pub struct RawEdge {
    pub id: String,
    pub label: String,
    pub from_id: String,
    pub to_id: String,
    pub properties: Properties,
}

/// A multi-hop path, nodes and relationships kept in traversal order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawPath {
    pub nodes: Vec<RawVertex>,
    pub rels: Vec<RawEdge>,
}

/// Borrowed view over a vertex or an edge, the unit of type dispatch
#[derive(Debug, Clone, Copy)]
pub enum RawRecord<'a> {
    Vertex(&'a RawVertex),
    Edge(&'a RawEdge),
}

impl RawValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render a primitive as a plain string, `None` for null and structured values
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            RawValue::String(s) => Some(s.clone()),
            RawValue::Int(i) => Some(i.to_string()),
            RawValue::Float(f) => Some(f.to_string()),
            RawValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Convert into a JSON value. Vertices, edges and paths keep their
    /// identity and label so the rendering stays useful to a reader.
    pub fn to_json(&self) -> JsonValue {
        match self {
            RawValue::Null => JsonValue::Null,
            RawValue::Bool(b) => JsonValue::Bool(*b),
            RawValue::Int(i) => JsonValue::from(*i),
            RawValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(f.to_string())),
            RawValue::String(s) => JsonValue::String(s.clone()),
            RawValue::List(items) => JsonValue::Array(items.iter().map(RawValue::to_json).collect()),
            RawValue::Map(map) => properties_to_json(map),
            RawValue::Vertex(v) => v.to_json(),
            RawValue::Edge(e) => e.to_json(),
            RawValue::Path(p) => {
                let mut obj = JsonMap::new();
                obj.insert(
                    "nodes".to_string(),
                    JsonValue::Array(p.nodes.iter().map(RawVertex::to_json).collect()),
                );
                obj.insert(
                    "rels".to_string(),
                    JsonValue::Array(p.rels.iter().map(RawEdge::to_json).collect()),
                );
                JsonValue::Object(obj)
            }
        }
    }

    /// Build a raw value from plain JSON. Objects become maps; vertex and
    /// edge recognition is the adapters' job.
    pub fn from_json(value: &JsonValue) -> RawValue {
        match value {
            JsonValue::Null => RawValue::Null,
            JsonValue::Bool(b) => RawValue::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Int(i),
                None => RawValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => RawValue::String(s.clone()),
            JsonValue::Array(items) => RawValue::List(items.iter().map(RawValue::from_json).collect()),
            JsonValue::Object(obj) => RawValue::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), RawValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

fn properties_to_json(properties: &Properties) -> JsonValue {
    JsonValue::Object(
        properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

impl RawVertex {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: RawValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = JsonMap::new();
        obj.insert("id".to_string(), JsonValue::String(self.id.clone()));
        obj.insert("label".to_string(), JsonValue::String(self.label.clone()));
        obj.insert("properties".to_string(), properties_to_json(&self.properties));
        JsonValue::Object(obj)
    }
}

impl RawEdge {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            from_id: from_id.into(),
            to_id: to_id.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: RawValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = JsonMap::new();
        obj.insert("id".to_string(), JsonValue::String(self.id.clone()));
        obj.insert("label".to_string(), JsonValue::String(self.label.clone()));
        obj.insert("from_id".to_string(), JsonValue::String(self.from_id.clone()));
        obj.insert("to_id".to_string(), JsonValue::String(self.to_id.clone()));
        obj.insert("properties".to_string(), properties_to_json(&self.properties));
        JsonValue::Object(obj)
    }
}

impl RawPath {
    /// Path elements in traversal order: node, rel, node, rel, ..., node.
    ///
    /// A recursive relationship cell carries only the interior nodes, one
    /// fewer than its relationships, and starts and ends with a
    /// relationship instead: rel, node, rel, ..., rel. A path without nodes
    /// yields its relationships in order.
    pub fn traversal_order(&self) -> Vec<RawRecord<'_>> {
        let mut out = Vec::with_capacity(self.nodes.len() + self.rels.len());
        let rel_first = self.rels.len() > self.nodes.len();
        let mut rels = self.rels.iter();
        for (idx, node) in self.nodes.iter().enumerate() {
            if idx > 0 || rel_first {
                if let Some(rel) = rels.next() {
                    out.push(RawRecord::Edge(rel));
                }
            }
            out.push(RawRecord::Vertex(node));
        }
        out.extend(rels.map(RawRecord::Edge));
        out
    }
}
