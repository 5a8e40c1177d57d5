// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Schema description handed to text-generation collaborators
//!
//! The rendering is read by a language model, never parsed back.

use super::raw::RawValue;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Closed vocabulary of property types shown to a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PropertyType {
    String,
    Double,
    Integer,
    List,
    Map,
    Boolean,
}

impl PropertyType {
    /// Infer the type of a sampled property value; null has no type
    pub fn of_value(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Null => None,
            RawValue::Bool(_) => Some(PropertyType::Boolean),
            RawValue::Int(_) => Some(PropertyType::Integer),
            RawValue::Float(_) => Some(PropertyType::Double),
            RawValue::String(_) => Some(PropertyType::String),
            RawValue::List(_) | RawValue::Path(_) => Some(PropertyType::List),
            RawValue::Map(_) | RawValue::Vertex(_) | RawValue::Edge(_) => Some(PropertyType::Map),
        }
    }

    /// Map an engine type name (e.g. `INT64`, `STRING[]`, `STRUCT(...)`)
    pub fn from_type_name(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        if upper.ends_with(']') || upper.starts_with("LIST") {
            PropertyType::List
        } else if upper.starts_with("MAP") || upper.starts_with("STRUCT") || upper.starts_with("UNION") {
            PropertyType::Map
        } else if upper.starts_with("BOOL") {
            PropertyType::Boolean
        } else if upper.starts_with("INT")
            || upper.starts_with("UINT")
            || upper == "SERIAL"
            || upper == "SMALLINT"
            || upper == "BIGINT"
            || upper == "TINYINT"
        {
            PropertyType::Integer
        } else if upper.starts_with("DOUBLE")
            || upper.starts_with("FLOAT")
            || upper.starts_with("DECIMAL")
            || upper.starts_with("NUMERIC")
        {
            PropertyType::Double
        } else {
            PropertyType::String
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::String => "STRING",
            PropertyType::Double => "DOUBLE",
            PropertyType::Integer => "INTEGER",
            PropertyType::List => "LIST",
            PropertyType::Map => "MAP",
            PropertyType::Boolean => "BOOLEAN",
        };
        write!(f, "{}", name)
    }
}

/// Property catalog of a single vertex or edge label
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelProperties {
    pub label: String,
    pub properties: BTreeSet<(String, PropertyType)>,
}

impl LabelProperties {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            properties: BTreeSet::new(),
        }
    }

    /// Record every typed property of a sampled property bag
    pub fn observe<'a>(&mut self, sample: impl IntoIterator<Item = (&'a String, &'a RawValue)>) {
        for (key, value) in sample {
            if let Some(kind) = PropertyType::of_value(value) {
                self.properties.insert((key.clone(), kind));
            }
        }
    }
}

/// A `(:start)-[:type]->(:end)` relationship template
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Triple {
    pub start: String,
    pub rel: String,
    pub end: String,
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(:`{}`)-[:`{}`]->(:`{}`)", self.start, self.rel, self.end)
    }
}

/// Structured schema of a property graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSchema {
    pub node_labels: Vec<String>,
    pub edge_labels: Vec<String>,
    pub node_properties: Vec<LabelProperties>,
    pub edge_properties: Vec<LabelProperties>,
    pub triples: Vec<Triple>,
}

fn write_catalog(f: &mut fmt::Formatter<'_>, catalog: &[LabelProperties]) -> fmt::Result {
    for entry in catalog {
        let props: Vec<String> = entry
            .properties
            .iter()
            .map(|(name, kind)| format!("{}: {}", name, kind))
            .collect();
        writeln!(f, "- {} {{{}}}", entry.label, props.join(", "))?;
    }
    Ok(())
}

impl fmt::Display for GraphSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Graph schema")?;
        writeln!(f, "### Node labels")?;
        writeln!(f, "{}", self.node_labels.join(", "))?;
        write_catalog(f, &self.node_properties)?;
        writeln!(f, "### Edge labels")?;
        writeln!(f, "{}", self.edge_labels.join(", "))?;
        write_catalog(f, &self.edge_properties)?;
        writeln!(f, "## Relationships")?;
        for triple in &self.triples {
            writeln!(f, "{}", triple)?;
        }
        Ok(())
    }
}
