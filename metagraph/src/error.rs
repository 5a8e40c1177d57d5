// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for MetaGraph

use thiserror::Error;

/// Result type alias for MetaGraph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Main error type for graph query execution and result materialization
#[derive(Error, Debug)]
pub enum GraphError {
    /// The backend rejected or failed to execute a query
    #[error("Error executing graph query: {query}: {detail}")]
    Query {
        /// The query text as submitted by the caller
        query: String,
        /// The backend's native error message
        detail: String,
    },

    /// A record matched a type but lacks a property that type requires
    #[error("Malformed {label} record '{id}': missing property '{property}'")]
    MalformedRecord {
        label: String,
        id: String,
        property: String,
    },

    /// A fixed traversal returned a record of the wrong type
    #[error("Unexpected record: expected {expected}, found {found}")]
    UnexpectedRecord { expected: String, found: String },

    /// The query cannot be rewritten or bound for execution
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query-generation collaborator failed
    #[error("Query generation error: {0}")]
    Generation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    pub fn query(query: impl Into<String>, detail: impl Into<String>) -> Self {
        GraphError::Query {
            query: query.into(),
            detail: detail.into(),
        }
    }

    pub fn malformed(
        label: impl Into<String>,
        id: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        GraphError::MalformedRecord {
            label: label.into(),
            id: id.into(),
            property: property.into(),
        }
    }

    /// Whether a query author could fix this error by rewriting the query.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GraphError::Query { .. } | GraphError::InvalidQuery(_))
    }
}
