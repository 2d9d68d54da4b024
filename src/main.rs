// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! flowdef - Workflow Definition Toolkit
//!
//! Declare, validate and export scheduled task graphs.

use clap::Parser;
use miette::Result;

use flowdef::cli::{Cli, Commands};
use flowdef::FlowdefConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let config = FlowdefConfig::load(cli.config.as_deref())?;

    // Held until exit so the log file is flushed
    let _log_guard = flowdef::logging::init(&config.logging, cli.verbose)?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { file, force } => {
            flowdef::cli::init::run(file, force, &config, cli.verbose).await
        }
        Commands::Validate {
            file,
            check_commands,
        } => flowdef::cli::validate::run(file, check_commands, &config, cli.verbose).await,
        Commands::List { dir } => flowdef::cli::list::run(dir, &config, cli.verbose).await,
        Commands::Tasks { file, tree } => {
            flowdef::cli::tasks::run(file, tree, &config, cli.verbose).await
        }
        Commands::Graph { file, format } => {
            flowdef::cli::graph::run(file, format, &config).await
        }
        Commands::Render {
            file,
            task,
            date,
            vars,
        } => flowdef::cli::render::run(file, task, date, vars, &config).await,
        Commands::Export {
            file,
            date,
            vars,
            format,
            output,
        } => flowdef::cli::export::run(file, date, vars, format, output, &config).await,
        Commands::Watch { dir, debounce } => {
            flowdef::cli::watch::run(dir, debounce, &config, cli.verbose).await
        }
    }
}
