// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! MetaGraph - graph query execution and result materialization for a
//! data-governance metamodel
//!
//! Cypher queries run against a pluggable graph engine and their rows come
//! back as typed metamodel objects (business domains, applications, data
//! entities, physical tables, columns, business terms and their
//! relationships) instead of raw driver values.
//!
//! # Quick Start
//!
//! ```no_run
//! use metagraph::{AgeGraph, ResultMaterializer};
//! use std::sync::Arc;
//!
//! # fn main() -> metagraph::Result<()> {
//! let backend = AgeGraph::connect("host=localhost user=postgres", "metadata", None)?;
//! let materializer = ResultMaterializer::new(Arc::new(backend));
//!
//! let response = materializer.query(
//!     "MATCH (e:DataEntity {name: '银行'})-[:IMPLEMENTS]->(t:PhysicalTable) RETURN e, t",
//!     "tables implementing the bank entity",
//! )?;
//! for row in &response.contents {
//!     for value in row {
//!         println!("{}", value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Assistant (question -> Cypher, retries) │
//! └──────────────────────────────────────────┘
//!                  │
//!                  ▼
//! ┌──────────────────────────────────────────┐
//! │  ResultMaterializer                      │
//! │  - TypeRegistry (record -> type)         │
//! │  - IdentityCache (one instance per id)   │
//! │  - secondary lookups (tables, columns)   │
//! └──────────────────────────────────────────┘
//!                  │
//!                  ▼
//! ┌──────────────────────────────────────────┐
//! │  GraphBackend                            │
//! │  - AgeGraph (Cypher inside PostgreSQL)   │
//! │  - KuzuGraph (embedded database)         │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - [`backend`] - Backend contract, raw values and the two adapters
//! - [`ontology`] - Metamodel types and the type registry
//! - [`cache`] - Identity cache
//! - [`materializer`] - Row materialization and secondary lookups
//! - [`assistant`] - Generated-query pipeline with feedback retries
//! - [`config`] - File and environment configuration
//! - [`error`] - Error types

pub mod assistant;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod materializer;
pub mod ontology;

pub use assistant::{Assistant, CommandGenerator, CypherQuery, QueryGenerator, EXAMPLE_QUERIES};
pub use backend::{
    open_backend, AgeGraph, GraphBackend, GraphSchema, KuzuGraph, QueryParams, RawValue, Row,
};
pub use cache::{IdentityCache, RecordKey};
pub use config::{BackendKind, MetaGraphConfig};
pub use error::{GraphError, Result};
pub use materializer::{MetaResponse, ResultMaterializer};
pub use ontology::{MetaObject, MetaValue, Relationship, TypeRegistry};
