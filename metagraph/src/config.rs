// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Configuration for backends, the identity cache and the assist pipeline
//!
//! Values come from an optional JSON file, then `METAGRAPH_*` environment
//! variables, then command-line flags (applied by the caller).

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_BACKEND: &str = "METAGRAPH_BACKEND";
pub const ENV_AGE_DSN: &str = "METAGRAPH_AGE_DSN";
pub const ENV_AGE_GRAPH: &str = "METAGRAPH_AGE_GRAPH";
pub const ENV_KUZU_DB: &str = "METAGRAPH_KUZU_DB";
pub const ENV_CACHE_TTL_SECS: &str = "METAGRAPH_CACHE_TTL_SECS";
pub const ENV_CACHE_MAX_ENTRIES: &str = "METAGRAPH_CACHE_MAX_ENTRIES";

/// Graph engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Apache AGE inside PostgreSQL
    #[default]
    Age,
    /// Embedded Kuzu database
    Kuzu,
}

impl FromStr for BackendKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "age" | "postgres" | "postgresql" => Ok(BackendKind::Age),
            "kuzu" => Ok(BackendKind::Kuzu),
            other => Err(GraphError::Config(format!(
                "unknown backend '{}', expected 'age' or 'kuzu'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Age => write!(f, "age"),
            BackendKind::Kuzu => write!(f, "kuzu"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 200,
            ttl_secs: 3000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeConfig {
    /// libpq-style connection string or `postgresql://` URL
    pub dsn: Option<String>,
    pub graph_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KuzuConfig {
    pub database: Option<PathBuf>,
    /// Interpreter with the `kuzu` package installed
    pub python: PathBuf,
    /// Only honoured by the in-process connection; the Python bridge
    /// always opens the database read-only
    pub read_only: bool,
}

impl Default for KuzuConfig {
    fn default() -> Self {
        Self {
            database: None,
            python: PathBuf::from("python3"),
            read_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub max_attempts: usize,
    /// External program turning questions into Cypher
    pub generator_command: Option<String>,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            generator_command: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaGraphConfig {
    pub backend: BackendKind,
    pub age: AgeConfig,
    pub kuzu: KuzuConfig,
    pub cache: CacheConfig,
    pub assist: AssistConfig,
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| GraphError::Config(format!("{} must be a number, got '{}'", name, value)))
}

impl MetaGraphConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Overlay `METAGRAPH_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Overlay variables read through `lookup`
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(ENV_BACKEND) {
            self.backend = backend.parse()?;
        }
        if let Some(dsn) = lookup(ENV_AGE_DSN) {
            self.age.dsn = Some(dsn);
        }
        if let Some(graph) = lookup(ENV_AGE_GRAPH) {
            self.age.graph_name = Some(graph);
        }
        if let Some(db) = lookup(ENV_KUZU_DB) {
            self.kuzu.database = Some(PathBuf::from(db));
        }
        if let Some(ttl) = lookup(ENV_CACHE_TTL_SECS) {
            self.cache.ttl_secs = parse_number(ENV_CACHE_TTL_SECS, &ttl)?;
        }
        if let Some(max) = lookup(ENV_CACHE_MAX_ENTRIES) {
            self.cache.max_entries = parse_number(ENV_CACHE_MAX_ENTRIES, &max)?;
        }
        Ok(())
    }

    /// Check that the selected backend has what it needs to connect
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            BackendKind::Age => {
                if self.age.dsn.as_deref().map_or(true, str::is_empty) {
                    return Err(GraphError::Config("AGE backend requires a DSN".to_string()));
                }
                if self.age.graph_name.as_deref().map_or(true, str::is_empty) {
                    return Err(GraphError::Config(
                        "AGE backend requires a graph name".to_string(),
                    ));
                }
            }
            BackendKind::Kuzu => {
                if self.kuzu.database.is_none() {
                    return Err(GraphError::Config(
                        "Kuzu backend requires a database path".to_string(),
                    ));
                }
            }
        }
        if self.cache.max_entries == 0 {
            return Err(GraphError::Config(
                "cache max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_cache_policy() {
        let config = MetaGraphConfig::default();
        assert_eq!(config.backend, BackendKind::Age);
        assert_eq!(config.cache.max_entries, 200);
        assert_eq!(config.cache.ttl(), Duration::from_secs(3000));
        assert_eq!(config.assist.max_attempts, 3);
    }

    #[test]
    fn loads_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"backend": "kuzu", "kuzu": {{"database": "/data/meta.kz"}}, "cache": {{"ttl_secs": 60}}}}"#
        )
        .unwrap();

        let config = MetaGraphConfig::from_file(file.path()).unwrap();
        assert_eq!(config.backend, BackendKind::Kuzu);
        assert_eq!(config.kuzu.database, Some(PathBuf::from("/data/meta.kz")));
        assert_eq!(config.kuzu.python, PathBuf::from("python3"));
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.max_entries, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_BACKEND, "age"),
            (ENV_AGE_DSN, "host=localhost user=postgres"),
            (ENV_AGE_GRAPH, "metadata"),
            (ENV_CACHE_MAX_ENTRIES, "500"),
        ]
        .into_iter()
        .collect();

        let mut config = MetaGraphConfig::default();
        config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.age.graph_name.as_deref(), Some("metadata"));
        assert_eq!(config.cache.max_entries, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let mut config = MetaGraphConfig::default();
        let err = config
            .apply_vars(|name| (name == ENV_CACHE_TTL_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn missing_connection_settings_fail_validation() {
        let config = MetaGraphConfig::default();
        assert!(matches!(config.validate(), Err(GraphError::Config(_))));

        let config = MetaGraphConfig {
            backend: BackendKind::Kuzu,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GraphError::Config(_))));
    }

    #[test]
    fn backend_kind_round_trips_through_text() {
        assert_eq!("KUZU".parse::<BackendKind>().unwrap(), BackendKind::Kuzu);
        assert_eq!(BackendKind::Age.to_string(), "age");
        assert!("neo4j".parse::<BackendKind>().is_err());
    }
}
