// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Graph command - visualize a definition as a graph

use miette::Result;
use std::path::PathBuf;

use super::{load_definition, GraphFormat};
use crate::config::FlowdefConfig;
use crate::pipeline::TaskGraph;

/// Run the graph command
pub async fn run(file: PathBuf, format: GraphFormat, config: &FlowdefConfig) -> Result<()> {
    let definition = load_definition(&file, config)?;
    let graph = TaskGraph::build(&definition);

    let output = match format {
        GraphFormat::Text => graph.to_text()?,
        GraphFormat::Dot => graph.to_dot(definition.name()),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    print!("{}", output);

    Ok(())
}
