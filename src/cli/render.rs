// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Render command - print task commands for one run

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{load_definition, run_context};
use crate::config::FlowdefConfig;

/// Run the render command
pub async fn run(
    file: PathBuf,
    task: Option<String>,
    date: Option<String>,
    vars: Vec<(String, String)>,
    config: &FlowdefConfig,
) -> Result<()> {
    let definition = load_definition(&file, config)?;
    let ctx = run_context(&definition, date.as_deref(), &vars)?;

    match task {
        Some(id) => {
            println!("{}", definition.render_command(&id, &ctx)?);
        }
        None => {
            for (id, command) in definition.render_all(&ctx)? {
                println!("{}", format!("# {}", id).dimmed());
                println!("{}", command);
            }
        }
    }

    Ok(())
}
