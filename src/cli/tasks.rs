// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Tasks command - list a definition's tasks

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::load_definition;
use super::output::params_summary;
use crate::config::FlowdefConfig;
use crate::pipeline::TaskGraph;

/// Run the tasks command
pub async fn run(file: PathBuf, tree: bool, config: &FlowdefConfig, verbose: bool) -> Result<()> {
    let definition = load_definition(&file, config)?;
    let graph = TaskGraph::build(&definition);

    if tree {
        print!("{}", graph.to_tree()?);
        return Ok(());
    }

    if !verbose {
        for id in definition.node_ids() {
            println!("{}", id);
        }
        return Ok(());
    }

    for id in graph.topological_order()? {
        let Some(node) = definition.node(&id) else {
            continue;
        };
        let params = definition.effective_params(&id)?;

        println!("{}", id.bold());
        println!("    command: {}", node.command_template().lines().next().unwrap_or(""));
        if !params.is_empty() {
            println!("    params:  {}", params_summary(&params).dimmed());
        }
        let upstream = definition.upstream_of(&id);
        if !upstream.is_empty() {
            println!("    after:   {}", upstream.join(", "));
        }
    }

    Ok(())
}
