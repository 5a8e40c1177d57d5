// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Apache AGE adapter
//!
//! Cypher runs inside PostgreSQL through `ag_catalog.cypher()`. Queries are
//! rewritten into that SQL form (see [`rewrite`]), executed in text mode, and
//! the returned `agtype` cells parsed back into raw values (see [`agtype`]).

pub mod agtype;
pub mod rewrite;
pub mod session;

pub use session::{PostgresSession, SqlSession, TextRows};

use crate::backend::literal::{bind_parameters, string_literal};
use crate::backend::raw::RawValue;
use crate::backend::schema::{GraphSchema, LabelProperties, Triple};
use crate::backend::{GraphBackend, QueryParams, Row};
use crate::error::{GraphError, Result};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;

/// Relationships sampled per edge label when discovering triples
const TRIPLE_SAMPLE: usize = 3000;
/// Records sampled per label when discovering property types
const PROPERTY_SAMPLE: usize = 100;

fn quote_label(label: &str) -> String {
    format!("`{}`", label.replace('`', "``"))
}

/// Graph backend over a PostgreSQL session with the AGE extension
pub struct AgeGraph<S: SqlSession> {
    graph_name: String,
    namespace: String,
    session: Mutex<S>,
    schema: RwLock<Option<GraphSchema>>,
}

impl AgeGraph<PostgresSession> {
    /// Connect to PostgreSQL and bind to an existing AGE graph
    pub fn connect(dsn: &str, graph_name: &str, password: Option<&str>) -> Result<Self> {
        let graph = Self::new(PostgresSession::connect(dsn, password)?, graph_name)?;
        graph.verify_graph()?;
        info!("Using AGE graph '{}'", graph_name);
        Ok(graph)
    }
}

impl<S: SqlSession> AgeGraph<S> {
    pub fn new(session: S, graph_name: impl Into<String>) -> Result<Self> {
        let graph_name = graph_name.into();
        rewrite::validate_graph_name(&graph_name)?;
        Ok(Self {
            namespace: format!("age:{}", graph_name),
            graph_name,
            session: Mutex::new(session),
            schema: RwLock::new(None),
        })
    }

    /// Fail unless the bound graph exists in `ag_catalog.ag_graph`
    pub fn verify_graph(&self) -> Result<()> {
        let sql = format!(
            "SELECT graphid FROM ag_catalog.ag_graph WHERE name = {}",
            string_literal(&self.graph_name)
        );
        let rows = self.execute_sql(&sql, &sql)?;
        if rows.rows.is_empty() {
            return Err(GraphError::Connection(format!(
                "graph '{}' does not exist",
                self.graph_name
            )));
        }
        Ok(())
    }

    /// Run one SQL statement, resetting the session when it fails so the
    /// connection stays usable
    fn execute_sql(&self, sql: &str, query: &str) -> Result<TextRows> {
        let mut session = self.session.lock();
        match session.query_text(sql) {
            Ok(rows) => Ok(rows),
            Err(detail) => {
                if let Err(reset_error) = session.reset() {
                    warn!("Failed to reset AGE session: {}", reset_error);
                }
                Err(GraphError::query(query, detail))
            }
        }
    }

    fn decode(query: &str, rows: TextRows) -> Result<Vec<Row>> {
        let TextRows { columns, rows } = rows;
        rows.into_iter()
            .map(|cells| {
                let values = columns
                    .iter()
                    .zip(cells)
                    .map(|(column, cell)| {
                        let value = match cell {
                            None => RawValue::Null,
                            Some(text) => agtype::parse_agtype(&text)
                                .map_err(|e| {
                                    GraphError::query(query, format!("column '{}': {}", column, e))
                                })?
                                .into_raw(),
                        };
                        Ok((column.clone(), value))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Row::new(values))
            })
            .collect()
    }

    fn labels(&self) -> Result<(Vec<String>, Vec<String>)> {
        let sql = format!(
            "SELECT l.name, l.kind FROM ag_catalog.ag_label l \
             JOIN ag_catalog.ag_graph g ON l.graph = g.graphid \
             WHERE g.name = {} AND l.name NOT LIKE '\\_ag\\_%' ORDER BY l.name",
            string_literal(&self.graph_name)
        );
        let rows = self.execute_sql(&sql, &sql)?;

        let mut node_labels = Vec::new();
        let mut edge_labels = Vec::new();
        for row in rows.rows {
            let mut cells = row.into_iter();
            let (name, kind) = match (cells.next().flatten(), cells.next().flatten()) {
                (Some(name), Some(kind)) => (name, kind),
                _ => continue,
            };
            match kind.as_str() {
                "v" => node_labels.push(name),
                "e" => edge_labels.push(name),
                _ => {}
            }
        }
        Ok((node_labels, edge_labels))
    }

    fn triples(&self, edge_labels: &[String]) -> Result<Vec<Triple>> {
        let mut triples = BTreeSet::new();
        for label in edge_labels {
            let query = format!(
                "MATCH (a)-[e:{}]->(b) WITH a, e, b LIMIT {} \
                 RETURN DISTINCT label(a) AS from_label, label(e) AS edge_label, label(b) AS to_label",
                quote_label(label),
                TRIPLE_SAMPLE
            );
            for row in self.query(&query, None)? {
                let start = row.get("from_label").and_then(RawValue::as_str);
                let rel = row.get("edge_label").and_then(RawValue::as_str);
                let end = row.get("to_label").and_then(RawValue::as_str);
                if let (Some(start), Some(rel), Some(end)) = (start, rel, end) {
                    triples.insert(Triple {
                        start: start.to_string(),
                        rel: rel.to_string(),
                        end: end.to_string(),
                    });
                }
            }
        }
        Ok(triples.into_iter().collect())
    }

    fn label_properties(&self, label: &str, pattern: &str) -> Result<LabelProperties> {
        let query = format!(
            "MATCH {} RETURN properties(x) AS props LIMIT {}",
            pattern.replace("{label}", &quote_label(label)),
            PROPERTY_SAMPLE
        );
        let mut catalog = LabelProperties::new(label);
        for row in self.query(&query, None)? {
            if let Some(RawValue::Map(props)) = row.get("props") {
                catalog.observe(props);
            }
        }
        Ok(catalog)
    }

    fn discover_schema(&self) -> Result<GraphSchema> {
        let (node_labels, edge_labels) = self.labels()?;
        let node_properties = node_labels
            .iter()
            .map(|label| self.label_properties(label, "(x:{label})"))
            .collect::<Result<Vec<_>>>()?;
        let edge_properties = edge_labels
            .iter()
            .map(|label| self.label_properties(label, "()-[x:{label}]->()"))
            .collect::<Result<Vec<_>>>()?;
        let triples = self.triples(&edge_labels)?;

        info!(
            "Discovered AGE schema: {} node labels, {} edge labels, {} triples",
            node_labels.len(),
            edge_labels.len(),
            triples.len()
        );
        Ok(GraphSchema {
            node_labels,
            edge_labels,
            node_properties,
            edge_properties,
            triples,
        })
    }
}

impl<S: SqlSession> GraphBackend for AgeGraph<S> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn query(&self, query: &str, params: Option<&QueryParams>) -> Result<Vec<Row>> {
        let bound = match params {
            Some(params) if !params.is_empty() => bind_parameters(query, params)?,
            _ => query.to_string(),
        };
        let sql = rewrite::wrap_query(&bound, &self.graph_name)?;
        debug!("AGE SQL: {}", sql);

        let rows = self.execute_sql(&sql, query)?;
        Self::decode(query, rows)
    }

    fn explain(&self, query: &str) -> Result<()> {
        let sql = format!("EXPLAIN {}", rewrite::wrap_query(query, &self.graph_name)?);
        self.execute_sql(&sql, query).map(|_| ())
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
        id.trim()
            .parse::<i64>()
            .map(|n| n.to_string())
            .map_err(|_| GraphError::InvalidQuery(format!("'{}' is not an AGE graph id", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Session that records statements and replays canned results
    #[derive(Default)]
    struct RecordingSession {
        statements: Arc<Mutex<Vec<String>>>,
        responses: Vec<std::result::Result<TextRows, String>>,
        resets: Arc<Mutex<usize>>,
    }

    impl SqlSession for RecordingSession {
        fn query_text(&mut self, sql: &str) -> std::result::Result<TextRows, String> {
            self.statements.lock().push(sql.to_string());
            if self.responses.is_empty() {
                Ok(TextRows::default())
            } else {
                self.responses.remove(0)
            }
        }

        fn reset(&mut self) -> std::result::Result<(), String> {
            *self.resets.lock() += 1;
            Ok(())
        }
    }

    #[test]
    fn decodes_agtype_rows() {
        let session = RecordingSession {
            responses: vec![Ok(TextRows {
                columns: vec!["e".to_string(), "n".to_string()],
                rows: vec![vec![
                    Some(r#"{"id": 7, "label": "DataEntity", "properties": {"name": "x"}}::vertex"#.to_string()),
                    None,
                ]]
            })],
            ..Default::default()
        };
        let graph = AgeGraph::new(session, "g1").unwrap();
        let rows = graph.query("MATCH (e:DataEntity) RETURN e, e.missing AS n", None).unwrap();

        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0].get("e"), Some(RawValue::Vertex(v)) if v.id == "7"));
        assert_eq!(rows[0].get("n"), Some(&RawValue::Null));
    }

    #[test]
    fn failed_statement_resets_session() {
        let resets = Arc::new(Mutex::new(0));
        let session = RecordingSession {
            responses: vec![Err("syntax error at or near \"RETRUN\"".to_string())],
            resets: resets.clone(),
            ..Default::default()
        };
        let graph = AgeGraph::new(session, "g1").unwrap();
        let err = graph.query("MATCH (n) RETRUN n", None).unwrap_err();

        assert!(matches!(err, GraphError::Query { .. }));
        assert_eq!(*resets.lock(), 1);
        assert!(graph.query("MATCH (n) RETURN n", None).is_ok());
    }

    #[test]
    fn explain_prefixes_wrapped_query() {
        let statements = Arc::new(Mutex::new(Vec::new()));
        let session = RecordingSession {
            statements: statements.clone(),
            ..Default::default()
        };
        let graph = AgeGraph::new(session, "g1").unwrap();
        graph.explain("MATCH (n) RETURN n").unwrap();

        let recorded = statements.lock();
        assert!(recorded[0].starts_with("EXPLAIN SELECT n FROM ag_catalog.cypher('g1', $$"));
    }

    #[test]
    fn parameters_are_inlined() {
        let statements = Arc::new(Mutex::new(Vec::new()));
        let session = RecordingSession {
            statements: statements.clone(),
            ..Default::default()
        };
        let graph = AgeGraph::new(session, "g1").unwrap();
        let mut params = QueryParams::new();
        params.insert("name".to_string(), serde_json::json!("ods.t_bank"));
        graph
            .query("MATCH (t:PhysicalTable {full_table_name: $name}) RETURN t", Some(&params))
            .unwrap();

        assert!(statements.lock()[0].contains("{full_table_name: 'ods.t_bank'}"));
    }

    #[test]
    fn id_literal_requires_integer() {
        let graph = AgeGraph::new(RecordingSession::default(), "g1").unwrap();
        assert_eq!(graph.id_literal("844424930131969").unwrap(), "844424930131969");
        assert!(graph.id_literal("0:1").is_err());
    }

    #[test]
    fn namespace_includes_graph_name() {
        let graph = AgeGraph::new(RecordingSession::default(), "metadata").unwrap();
        assert_eq!(graph.namespace(), "age:metadata");
    }
}
