// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connections to an embedded Kuzu database

use crate::backend::QueryParams;
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Rows in the driver's dict-style format: nodes carry `_id`, `_label`,
/// relationships additionally `_src`/`_dst`, paths `_nodes`/`_rels`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KuzuResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

/// Executes Cypher with native parameters against an embedded database.
/// Errors are returned as the engine's message.
pub trait KuzuConnection: Send + Sync {
    fn execute(
        &self,
        query: &str,
        params: Option<&QueryParams>,
    ) -> std::result::Result<KuzuResult, String>;

    /// Location of the database, used to scope cached records
    fn database(&self) -> &Path;
}

/// Reads one JSON request from stdin, writes one JSON response to stdout
const BRIDGE_SCRIPT: &str = r#"
import json, sys
import kuzu

request = json.load(sys.stdin)
try:
    db = kuzu.Database(request["database"], read_only=request["read_only"])
    conn = kuzu.Connection(db)
    result = conn.execute(request["query"], request.get("params") or {})
    if isinstance(result, list):
        result = result[-1]
    rows = []
    while result.has_next():
        rows.append(result.get_next())
    json.dump({"columns": result.get_column_names(), "rows": rows}, sys.stdout, default=str, ensure_ascii=False)
except Exception as e:
    json.dump({"error": str(e)}, sys.stdout, ensure_ascii=False)
"#;

#[derive(Serialize)]
struct BridgeRequest<'a> {
    database: &'a Path,
    read_only: bool,
    query: &'a str,
    params: Option<&'a QueryParams>,
}

#[derive(Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<JsonValue>>,
    error: Option<String>,
}

/// Drives the engine's Python binding in a child process per statement.
///
/// The database is always opened read-only and statements run one at a
/// time, so two calls never compete for the database lock.
#[derive(Debug)]
pub struct PythonKuzuConnection {
    python: PathBuf,
    database: PathBuf,
    running: Mutex<()>,
}

impl PythonKuzuConnection {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            python: PathBuf::from("python3"),
            database: database.into(),
            running: Mutex::new(()),
        }
    }

    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }
}

impl KuzuConnection for PythonKuzuConnection {
    fn execute(
        &self,
        query: &str,
        params: Option<&QueryParams>,
    ) -> std::result::Result<KuzuResult, String> {
        let request = BridgeRequest {
            database: &self.database,
            read_only: true,
            query,
            params,
        };
        let payload = serde_json::to_vec(&request).map_err(|e| e.to_string())?;

        let _running = self.running.lock();

        let mut child = Command::new(&self.python)
            .arg("-c")
            .arg(BRIDGE_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to start {}: {}", self.python.display(), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).map_err(|e| e.to_string())?;
        }
        let output = child.wait_with_output().map_err(|e| e.to_string())?;

        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }

        let response: BridgeResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("unreadable response from Kuzu bridge: {}", e))?;
        if let Some(error) = response.error {
            return Err(error);
        }
        debug!("Kuzu returned {} rows", response.rows.len());
        Ok(KuzuResult {
            columns: response.columns,
            rows: response.rows,
        })
    }

    fn database(&self) -> &Path {
        &self.database
    }
}
