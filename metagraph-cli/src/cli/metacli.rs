// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for MetaGraph

use colored::Colorize;
use log::{debug, info};
use metagraph::backend::age::rewrite::wrap_query;
use metagraph::{
    open_backend, Assistant, BackendKind, CommandGenerator, GraphBackend, IdentityCache,
    MetaGraphConfig, ResultMaterializer,
};
use rustyline::{error::ReadlineError, CompletionType, Config, EditMode, Editor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::commands::{Cli, OutputFormat};
use super::output::{format_cache_stats, ResultFormatter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Connection settings taken from the global flags
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    pub config: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub dsn: Option<String>,
    pub graph: Option<String>,
    pub kuzu_db: Option<PathBuf>,
    pub ask_password: bool,
}

impl From<&Cli> for ConnectionOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            backend: cli.backend,
            dsn: cli.dsn.clone(),
            graph: cli.graph.clone(),
            kuzu_db: cli.kuzu_db.clone(),
            ask_password: cli.ask_password,
        }
    }
}

impl ConnectionOptions {
    /// Configuration file, then environment, then flags
    pub fn load_config(&self) -> CliResult<MetaGraphConfig> {
        let mut config = match &self.config {
            Some(path) => MetaGraphConfig::from_file(path)
                .map_err(|e| format!("Failed to load config {:?}: {}", path, e))?,
            None => MetaGraphConfig::default(),
        };
        config.apply_env()?;
        self.apply_flags(&mut config);
        Ok(config)
    }

    fn apply_flags(&self, config: &mut MetaGraphConfig) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(dsn) = &self.dsn {
            config.age.dsn = Some(dsn.clone());
        }
        if let Some(graph) = &self.graph {
            config.age.graph_name = Some(graph.clone());
        }
        if let Some(db) = &self.kuzu_db {
            config.kuzu.database = Some(db.clone());
        }
    }

    /// Open the configured backend, prompting for a password when asked to
    pub fn connect(&self, config: &MetaGraphConfig) -> CliResult<Arc<dyn GraphBackend>> {
        let password = match (&config.backend, &config.age.dsn) {
            (BackendKind::Age, Some(dsn)) if self.ask_password && !dsn_has_password(dsn) => {
                print!("Password: ");
                std::io::Write::flush(&mut std::io::stdout())?;
                Some(rpassword::read_password()?)
            }
            _ => None,
        };

        let backend = open_backend(config, password.as_deref())
            .map_err(|e| format!("Failed to open {} backend: {}", config.backend, e))?;
        info!("Connected to {}", backend.namespace());
        Ok(backend)
    }

    /// Materializer with a cache sized from the configuration
    pub fn materializer(&self) -> CliResult<(MetaGraphConfig, ResultMaterializer)> {
        let config = self.load_config()?;
        let backend = self.connect(&config)?;
        let cache = Arc::new(IdentityCache::from_config(&config.cache));
        Ok((config, ResultMaterializer::new(backend).with_cache(cache)))
    }
}

/// Whether a libpq keyword string or URL already carries a password
fn dsn_has_password(dsn: &str) -> bool {
    let dsn = dsn.trim();
    if let Some(rest) = dsn
        .strip_prefix("postgresql://")
        .or_else(|| dsn.strip_prefix("postgres://"))
    {
        return rest
            .split_once('@')
            .map_or(false, |(userinfo, _)| userinfo.contains(':'));
    }
    dsn.split_whitespace()
        .any(|pair| pair.trim_start().starts_with("password="))
}

/// Handle the query command (one-off query execution)
pub fn handle_query(
    options: &ConnectionOptions,
    query: String,
    explanation: String,
    format: OutputFormat,
) -> CliResult<()> {
    let (_, materializer) = options.materializer()?;
    let response = materializer.query(&query, &explanation)?;
    println!("{}", ResultFormatter::format(&response, format));
    Ok(())
}

/// Handle the schema command
pub fn handle_schema(options: &ConnectionOptions, refresh: bool) -> CliResult<()> {
    let config = options.load_config()?;
    let backend = options.connect(&config)?;
    if refresh {
        backend.refresh_schema()?;
    }
    println!("{}", backend.schema()?);
    Ok(())
}

/// Handle the explain command
pub fn handle_explain(options: &ConnectionOptions, query: String) -> CliResult<()> {
    let config = options.load_config()?;
    let backend = options.connect(&config)?;
    backend.explain(&query)?;
    println!("{}", "Query is valid".green());
    Ok(())
}

/// Handle the rewrite command. Nothing is connected; only the graph name is needed.
pub fn handle_rewrite(options: &ConnectionOptions, query: String) -> CliResult<()> {
    let config = options.load_config()?;
    let graph = config
        .age
        .graph_name
        .ok_or("A graph name is required (--graph or METAGRAPH_AGE_GRAPH)")?;
    println!("{}", wrap_query(&query, &graph)?);
    Ok(())
}

/// Handle the console (REPL) command
pub fn handle_console(options: &ConnectionOptions) -> CliResult<()> {
    let (config, materializer) = options.materializer()?;
    let namespace = materializer.backend().namespace().to_string();
    let generator = config
        .assist
        .generator_command
        .as_deref()
        .map(CommandGenerator::from_command_line)
        .transpose()?;
    let assistant = generator.map(|generator| {
        Assistant::new(materializer.clone(), generator)
            .with_max_attempts(config.assist.max_attempts)
    });

    println!("{}", "MetaGraph".bold().green());
    println!("Type 'help' for commands, 'exit' or 'quit' to exit");
    println!("Multi-line queries supported - use ';' to terminate");
    if assistant.is_some() {
        println!("Questions: prefix with 'nl:' (e.g., 'nl: which tables implement 银行')");
    }
    println!("{}", format!("Connected to: {}", namespace).cyan());

    let rl_config = Config::builder()
        .edit_mode(EditMode::Emacs)
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();

    let mut rl = Editor::<(), _>::with_config(rl_config)?;

    let history_path = ".metagraph/.cypher_history.txt";
    if let Some(parent) = Path::new(&history_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let _ = rl.load_history(&history_path);

    let mut query_buffer = String::new();

    loop {
        let prompt = if query_buffer.is_empty() {
            "cypher> ".to_string()
        } else {
            "   ...> ".to_string()
        };

        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                if !query_buffer.is_empty() {
                    query_buffer.clear();
                    println!("{}", "\nQuery buffer cleared".yellow());
                }
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        let trimmed = line.trim();

        if query_buffer.is_empty() {
            match trimmed.to_lowercase().as_str() {
                "exit" | "quit" => {
                    println!("{}", "Goodbye!".green());
                    break;
                }
                "help" => {
                    print_help();
                    continue;
                }
                "clear" => {
                    print!("\x1B[2J\x1B[1;1H");
                    std::io::Write::flush(&mut std::io::stdout())?;
                    continue;
                }
                "stats" => {
                    println!("{}", format_cache_stats(materializer.cache()));
                    continue;
                }
                "clear cache" => {
                    materializer.cache().clear();
                    println!("{}", "Identity cache cleared".yellow());
                    continue;
                }
                "schema" => {
                    match materializer.backend().schema() {
                        Ok(schema) => println!("{}", schema),
                        Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                    }
                    continue;
                }
                "" => continue,
                _ => {}
            }

            if trimmed.to_lowercase().starts_with("nl:") {
                let question = trimmed[3..].trim();
                if question.is_empty() {
                    println!("{}", "Usage: nl: <question>".yellow());
                    continue;
                }
                let Some(assistant) = &assistant else {
                    println!(
                        "{}",
                        "No generator command configured (assist.generator_command)".yellow()
                    );
                    continue;
                };

                rl.add_history_entry(trimmed)?;
                println!("{}", "Generating query...".cyan());
                match assistant.ask(question) {
                    Ok(response) => {
                        println!("{}", ResultFormatter::format(&response, OutputFormat::Table));
                    }
                    Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                }
                continue;
            }
        }

        query_buffer.push_str(&line);
        query_buffer.push('\n');

        if trimmed.ends_with(';') {
            let query = query_buffer.trim().to_string();
            rl.add_history_entry(&query)?;
            debug!("Console query: {}", query);

            match materializer.query(&query, "") {
                Ok(response) => {
                    println!("{}", ResultFormatter::format(&response, OutputFormat::Table));
                }
                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
            }

            query_buffer.clear();
        }
    }

    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Print help message
fn print_help() {
    println!("{}", "Available commands:".bold().green());
    println!("  {}  - Show this help message", "help".cyan());
    println!("  {}  - Print the graph schema", "schema".cyan());
    println!("  {}  - Exit the console", "exit/quit".cyan());
    println!("  {}  - Clear the screen", "clear".cyan());
    println!("  {}  - Show identity cache statistics", "stats".cyan());
    println!("  {}  - Drop every cached record", "clear cache".cyan());
    println!("\n{}", "Questions:".bold().green());
    println!(
        "  {}  - Generate a query, check it and run it",
        "nl: <question>".cyan()
    );
    println!("\n{}", "Query syntax:".bold().green());
    println!("  Multi-line queries are supported");
    println!("  Terminate queries with semicolon (;)");
    println!("\n{}", "Examples:".bold().green());
    println!("  {}", "MATCH (e:DataEntity {name: '银行'}) RETURN e;".yellow());
    println!(
        "  {}",
        "MATCH p = (a:DataEntity)-[:FLOWS_TO*1..3]->(b:DataEntity) RETURN p;".yellow()
    );
}
