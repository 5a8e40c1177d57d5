// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! MetaGraph command-line entry point

mod cli;

use clap::Parser;
use colored::Colorize;
use cli::{Cli, Commands, ConnectionOptions};

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.level_filter())
        .format_timestamp(None)
        .init();

    let options = ConnectionOptions::from(&cli);
    let result = match cli.command {
        Commands::Query {
            query,
            explanation,
            format,
        } => cli::handle_query(&options, query, explanation, format),
        Commands::Schema { refresh } => cli::handle_schema(&options, refresh),
        Commands::Explain { query } => cli::handle_explain(&options, query),
        Commands::Rewrite { query } => cli::handle_rewrite(&options, query),
        Commands::Console => cli::handle_console(&options),
    };

    if let Err(e) = result {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}
