// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for MetaGraph
//!
//! Provides one-off query execution, schema and explain commands, an offline
//! AGE rewrite, and an interactive Cypher console (REPL).

pub mod commands;
pub mod metacli;
pub mod output;

pub use commands::{Cli, Commands};
pub use metacli::{
    handle_console, handle_explain, handle_query, handle_rewrite, handle_schema,
    ConnectionOptions,
};
