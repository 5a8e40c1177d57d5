// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command definitions for MetaGraph

use clap::{Parser, Subcommand, ValueEnum};
use metagraph::BackendKind;
use std::path::PathBuf;

/// Log level options
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors
    Info,
    /// Debug messages and above (verbose)
    Debug,
    /// All messages including trace (very verbose)
    Trace,
    /// Disable all logging
    Off,
}

impl LogLevel {
    /// Convert to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// MetaGraph CLI - Cypher over data-governance metadata graphs
#[derive(Parser)]
#[command(name = "metagraph")]
#[command(about = "MetaGraph - query and materialize metadata graphs on AGE or Kuzu")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Graph backend (age, kuzu)
    #[arg(short = 'b', long = "backend", global = true)]
    pub backend: Option<BackendKind>,

    /// PostgreSQL connection string for the AGE backend
    #[arg(long = "dsn", global = true)]
    pub dsn: Option<String>,

    /// AGE graph name
    #[arg(short = 'g', long = "graph", global = true)]
    pub graph: Option<String>,

    /// Kuzu database path
    #[arg(long = "kuzu-db", global = true)]
    pub kuzu_db: Option<PathBuf>,

    /// Prompt for the database password
    #[arg(short = 'p', long = "ask-password", global = true)]
    pub ask_password: bool,

    /// Set log level (error, warn, info, debug, trace, off)
    #[arg(short = 'l', long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Verbose mode (equivalent to --log-level debug)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective log filter, `--log-level` winning over `--verbose`
    pub fn level_filter(&self) -> log::LevelFilter {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level.to_level_filter(),
            (None, true) => log::LevelFilter::Debug,
            (None, false) => log::LevelFilter::Warn,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Execute a Cypher query and print the materialized result
    Query {
        /// The Cypher query to execute
        query: String,

        /// Description carried into the response
        #[arg(short, long, default_value = "")]
        explanation: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Print the graph schema used for query generation
    Schema {
        /// Discover the schema again instead of using the cached copy
        #[arg(short, long)]
        refresh: bool,
    },

    /// Check a query against the engine without running it
    Explain {
        /// The Cypher query to check
        query: String,
    },

    /// Print the SQL an AGE backend would run, without connecting
    Rewrite {
        /// The Cypher query to rewrite
        query: String,
    },

    /// Interactive Cypher console (REPL)
    Console,
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
