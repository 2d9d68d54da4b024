// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for flowdef.

pub mod export;
pub mod graph;
pub mod init;
pub mod list;
pub mod output;
pub mod render;
pub mod tasks;
pub mod validate;
pub mod watch;

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::config::FlowdefConfig;
use crate::pipeline::{PipelineDefinition, TemplateContext};
use crate::timefmt::parse_date_time;

/// Definition file used when none is given
pub const DEFAULT_FILE: &str = "flowdef.yaml";

/// Workflow definition toolkit
///
/// Declare, validate and export scheduled task graphs.
#[derive(Parser, Debug)]
#[clap(
    name = "flowdef",
    version,
    about = "Declare, validate and export scheduled workflow definitions",
    long_about = None,
    after_help = "Examples:\n\
        flowdef init                                  Write an example definition\n\
        flowdef validate flowdef.yaml                 Check a definition\n\
        flowdef render flowdef.yaml templated -d 2021-01-01\n\
        flowdef export flowdef.yaml -f json           Print the executor hand-off\n\n\
        See 'flowdef <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file (default: ./flowdef.toml, then the user config dir)
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example definition
    Init {
        /// File to create
        #[clap(default_value = DEFAULT_FILE)]
        file: PathBuf,

        /// Overwrite an existing file
        #[clap(short, long)]
        force: bool,
    },

    /// Load and validate a definition
    Validate {
        /// Definition file
        #[clap(default_value = DEFAULT_FILE)]
        file: PathBuf,

        /// Warn when a task's program is not on PATH
        #[clap(long)]
        check_commands: bool,
    },

    /// List the definitions in a directory
    List {
        /// Directory to scan
        #[clap(default_value = ".")]
        dir: PathBuf,
    },

    /// List a definition's tasks
    Tasks {
        /// Definition file
        #[clap(default_value = DEFAULT_FILE)]
        file: PathBuf,

        /// Show the dependency tree
        #[clap(long)]
        tree: bool,
    },

    /// Show a definition as a graph
    Graph {
        /// Definition file
        #[clap(default_value = DEFAULT_FILE)]
        file: PathBuf,

        /// Output format (text, dot, mermaid)
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },

    /// Render task commands for one run
    Render {
        /// Definition file
        file: PathBuf,

        /// Task to render (default: all tasks)
        task: Option<String>,

        /// Logical run date, YYYY-MM-DD or RFC 3339 (default: start_date)
        #[clap(short, long)]
        date: Option<String>,

        /// Extra template variable
        #[clap(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Print the executor hand-off
    Export {
        /// Definition file
        #[clap(default_value = DEFAULT_FILE)]
        file: PathBuf,

        /// Render commands for this logical run date
        #[clap(short, long)]
        date: Option<String>,

        /// Extra template variable, used with --date
        #[clap(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Output format (json, yaml)
        #[clap(short, long, default_value = "json")]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Watch mode - re-validate definitions on file changes
    Watch {
        /// Directory to watch
        #[clap(default_value = ".")]
        dir: PathBuf,

        /// Debounce delay in milliseconds
        #[clap(long, default_value = "500")]
        debounce: u64,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// Export output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Yaml,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// Parse a `KEY=VALUE` template variable
pub fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Load a definition file, pointing at `flowdef init` when it is missing
pub fn load_definition(path: &Path, config: &FlowdefConfig) -> Result<PipelineDefinition> {
    if !path.exists() {
        return Err(miette::miette!(
            "Definition file not found: {}\n\n\
             Run 'flowdef init' to create an example.",
            path.display()
        ));
    }

    Ok(PipelineDefinition::from_file(path, config.definitions)?)
}

/// Template variables for one run: the standard run variables for `date`
/// (or the pipeline's start date), then any `--var` overrides
pub fn run_context(
    definition: &PipelineDefinition,
    date: Option<&str>,
    vars: &[(String, String)],
) -> Result<TemplateContext> {
    let logical_date = match date {
        Some(text) => parse_date_time(text).ok_or_else(|| {
            miette::miette!(
                "Invalid date '{}': expected YYYY-MM-DD or an RFC 3339 timestamp",
                text
            )
        })?,
        None => definition.start_date(),
    };

    let mut ctx = TemplateContext::for_run(definition.name(), logical_date);
    for (key, value) in vars {
        ctx.insert(key.as_str(), value.as_str());
    }
    Ok(ctx)
}
