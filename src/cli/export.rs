// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Export command - print the executor hand-off

use miette::Result;
use std::path::PathBuf;
use tracing::info;

use super::{load_definition, run_context, ExportFormat};
use crate::config::FlowdefConfig;
use crate::errors::FlowError;

/// Run the export command
pub async fn run(
    file: PathBuf,
    date: Option<String>,
    vars: Vec<(String, String)>,
    format: ExportFormat,
    output: Option<PathBuf>,
    config: &FlowdefConfig,
) -> Result<()> {
    let definition = load_definition(&file, config)?;

    let ctx = match date.as_deref() {
        Some(d) => Some(run_context(&definition, Some(d), &vars)?),
        None if !vars.is_empty() => {
            return Err(miette::miette!("--var needs --date: commands are only rendered for a run"));
        }
        None => None,
    };

    let handoff = definition.export(ctx.as_ref())?;
    let text = match format {
        ExportFormat::Json => handoff.to_json()?,
        ExportFormat::Yaml => handoff.to_yaml()?,
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &text).map_err(|e| FlowError::FileWrite {
                path: path.clone(),
                error: e.to_string(),
            })?;
            info!(pipeline = definition.name(), file = %path.display(), "hand-off written");
        }
        None => println!("{}", text.trim_end()),
    }

    Ok(())
}
