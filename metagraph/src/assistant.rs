// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Question answering over the metamodel graph
//!
//! An external generator turns a question into Cypher. Each candidate is
//! normalized, checked, pre-flighted with `explain` and materialized. Errors
//! a rewrite could fix go back to the generator as feedback until the
//! attempt budget runs out.

use crate::error::{GraphError, Result};
use crate::materializer::{MetaResponse, ResultMaterializer};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::process::Command;

/// Few-shot query examples over the metamodel, for generator prompts
pub const EXAMPLE_QUERIES: &str = r#"## Use the following examples when writing Cypher.

Task: physical tables implementing a data entity
Query:
MATCH (e:DataEntity {name: 'EntityName'})-[:IMPLEMENTS]->(t:PhysicalTable)
RETURN e, t

Task: full names of the physical tables implementing a data entity
Query:
MATCH (e:DataEntity {name: 'EntityName'})-[:IMPLEMENTS]->(t:PhysicalTable)
RETURN t.full_table_name AS full_table_name

Task: two related entities and their physical tables
Query:
MATCH (e1:DataEntity {name: 'EntityName'})-[r]->(e2:DataEntity),
    (e1)-[:IMPLEMENTS]->(t1:PhysicalTable),
    (e2)-[:IMPLEMENTS]->(t2:PhysicalTable)
RETURN e1, e2, r, t1, t2

Task: data entities used by an application
Query:
MATCH (app:Application {name: 'ApplicationName'})-[r]-(e:DataEntity)
RETURN app, e

Task: data entities used by an application and their physical tables
Query:
MATCH (app:Application {name: 'ApplicationName'})-[r]-(e:DataEntity)-[:IMPLEMENTS]->(t:PhysicalTable)
RETURN app, e, t

Task: all entities of a business domain
Query:
MATCH (d:BusinessDomain {name: 'DomainName'})-[:CONTAINS]-(a:Application)-[r]-(e:DataEntity)
RETURN e

Task: the first n data entities
Query:
MATCH (e:DataEntity)
RETURN e
LIMIT n

Task: number of applications in a business domain
Query:
MATCH (d:BusinessDomain {name: 'DomainName'})-[:CONTAINS]-(a:Application)
RETURN count(a) AS application_count

Task: how two data entities are connected
Query:
MATCH (e1:DataEntity {name: 'Entity1'})-[r:RELATED_TO*1..2]->(e2:DataEntity {name: 'Entity2'})
RETURN e1, r, e2

Task: copies of a data entity
Query:
MATCH (e1:DataEntity {name: 'EntityName'})-[:FLOWS_TO]-(e2:DataEntity)
RETURN e2
"#;

/// A generated query and the generator's explanation of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CypherQuery {
    pub cypher: String,
    #[serde(default)]
    pub explanation: String,
}

impl CypherQuery {
    pub fn new(cypher: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            explanation: explanation.into(),
        }
    }

    /// Turn escaped `\n` sequences into newlines, trim, drop one trailing `;`
    pub fn normalize(mut self) -> Self {
        let text = self.cypher.replace("\\n", "\n");
        let text = text.trim();
        let text = text.strip_suffix(';').unwrap_or(text).trim_end();
        self.cypher = text.to_string();
        self
    }

    /// Only read queries starting with MATCH are executed
    pub fn validate(&self) -> Result<()> {
        let starts_with_match = self
            .cypher
            .trim_start()
            .get(..5)
            .map_or(false, |head| head.eq_ignore_ascii_case("match"));
        if starts_with_match {
            Ok(())
        } else {
            Err(GraphError::InvalidQuery(format!(
                "query must start with MATCH: {}",
                self.cypher
            )))
        }
    }
}

/// Turns a question into Cypher
pub trait QueryGenerator: Send + Sync {
    /// `feedback` carries the error of the previous attempt, if any
    fn generate(&self, question: &str, schema: &str, feedback: Option<&str>) -> Result<CypherQuery>;
}

/// Generator backed by an external program.
///
/// The program is invoked as `<program> [args] --nl <question> --schema
/// <schema> [--feedback <error>]` and prints either a JSON object with
/// `cypher` and `explanation`, or the bare query.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Split a configured command line on whitespace
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| GraphError::Config("generator command is empty".to_string()))?;
        Ok(Self::new(program).with_args(parts))
    }
}

impl QueryGenerator for CommandGenerator {
    fn generate(&self, question: &str, schema: &str, feedback: Option<&str>) -> Result<CypherQuery> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--nl")
            .arg(question)
            .arg("--schema")
            .arg(schema);
        if let Some(feedback) = feedback {
            command.arg("--feedback").arg(feedback);
        }

        let output = command
            .output()
            .map_err(|e| GraphError::Generation(format!("failed to run {}: {}", self.program, e)))?;
        if !output.status.success() {
            return Err(GraphError::Generation(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Err(GraphError::Generation("generator produced no query".to_string()));
        }
        Ok(serde_json::from_str(stdout).unwrap_or_else(|_| CypherQuery::new(stdout, "")))
    }
}

/// Drives generation, validation and materialization with retries
pub struct Assistant<G: QueryGenerator> {
    materializer: ResultMaterializer,
    generator: G,
    max_attempts: usize,
}

impl<G: QueryGenerator> Assistant<G> {
    pub fn new(materializer: ResultMaterializer, generator: G) -> Self {
        Self {
            materializer,
            generator,
            max_attempts: 3,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn materializer(&self) -> &ResultMaterializer {
        &self.materializer
    }

    /// Answer a question. Retryable failures of one attempt become the
    /// feedback of the next; the last one is returned when attempts run out.
    pub fn ask(&self, question: &str) -> Result<MetaResponse> {
        let schema = format!(
            "{}\n{}",
            self.materializer.backend().schema()?,
            EXAMPLE_QUERIES
        );
        let mut feedback: Option<String> = None;
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            let candidate = self
                .generator
                .generate(question, &schema, feedback.as_deref())?
                .normalize();
            info!("Attempt {} generated: {}", attempt, candidate.cypher);

            match self.run(&candidate) {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() => {
                    warn!("Generated query rejected: {}", err);
                    feedback = Some(err.to_string());
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error
            .unwrap_or_else(|| GraphError::Generation("no query attempts were made".to_string())))
    }

    fn run(&self, candidate: &CypherQuery) -> Result<MetaResponse> {
        candidate.validate()?;
        self.materializer.backend().explain(&candidate.cypher)?;
        self.materializer.query(&candidate.cypher, &candidate.explanation)
    }
}
