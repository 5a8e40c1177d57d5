// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SQL sessions carrying AGE queries

use crate::error::{GraphError, Result};
use log::{debug, info, warn};
use postgres::{Client, Config, NoTls, SimpleQueryMessage};

/// Statements run on every new connection so the `cypher()` function and
/// the `agtype` type resolve without schema qualification
const SESSION_SETUP: &str = "LOAD 'age'; SET search_path = ag_catalog, \"$user\", public;";

/// Text-format result of one SQL statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// A SQL connection able to run statements in text mode.
///
/// Errors are returned as the server's message. After any failure the caller
/// invokes `reset` so the next statement does not run inside an aborted
/// transaction.
pub trait SqlSession: Send {
    fn query_text(&mut self, sql: &str) -> std::result::Result<TextRows, String>;

    fn reset(&mut self) -> std::result::Result<(), String>;
}

fn describe(err: &postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => match db.detail() {
            Some(detail) => format!("{} ({})", db.message(), detail),
            None => db.message().to_string(),
        },
        None => err.to_string(),
    }
}

/// PostgreSQL session with the AGE extension loaded
pub struct PostgresSession {
    config: Config,
    client: Client,
}

impl PostgresSession {
    /// Connect using a libpq-style connection string or URL
    pub fn connect(dsn: &str, password: Option<&str>) -> Result<Self> {
        let mut config: Config = dsn
            .parse()
            .map_err(|e: postgres::Error| GraphError::Config(format!("invalid DSN: {}", e)))?;
        if let Some(password) = password {
            config.password(password);
        }
        let client = Self::open(&config)?;
        info!("Connected to PostgreSQL with AGE loaded");
        Ok(Self { config, client })
    }

    fn open(config: &Config) -> Result<Client> {
        let mut client = config
            .connect(NoTls)
            .map_err(|e| GraphError::Connection(describe(&e)))?;
        client
            .batch_execute(SESSION_SETUP)
            .map_err(|e| GraphError::Connection(format!("failed to load AGE: {}", describe(&e))))?;
        Ok(client)
    }
}

impl SqlSession for PostgresSession {
    fn query_text(&mut self, sql: &str) -> std::result::Result<TextRows, String> {
        let messages = self.client.simple_query(sql).map_err(|e| describe(&e))?;

        let mut result = TextRows::default();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if result.columns.is_empty() {
                    result.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                let cells = (0..row.len()).map(|i| row.get(i).map(str::to_string)).collect();
                result.rows.push(cells);
            }
        }
        debug!("SQL statement returned {} rows", result.rows.len());
        Ok(result)
    }

    fn reset(&mut self) -> std::result::Result<(), String> {
        if self.client.is_closed() {
            warn!("PostgreSQL connection closed, reconnecting");
            self.client = Self::open(&self.config).map_err(|e| e.to_string())?;
            return Ok(());
        }
        self.client.batch_execute("ROLLBACK").map_err(|e| describe(&e))
    }
}
