// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Validate command - load a definition and check its graph

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::output::{line, params_summary, spinner, Status};
use crate::config::FlowdefConfig;
use crate::pipeline::{check_commands, PipelineDefinition};
use crate::timefmt::{epoch_now, format_duration, format_timestamp};

/// Run the validate command
pub async fn run(
    file: PathBuf,
    check_programs: bool,
    config: &FlowdefConfig,
    verbose: bool,
) -> Result<()> {
    println!("{}", "Validating definition...".bold());
    println!();

    if !file.exists() {
        return Err(miette::miette!(
            "Definition file not found: {}\n\n\
             Run 'flowdef init' to create an example.",
            file.display()
        ));
    }

    let start = epoch_now();
    let definition = match PipelineDefinition::from_file(&file, config.definitions) {
        Ok(d) => d,
        Err(e) => {
            line(Status::Failed, "Failed to load definition");
            println!();
            return Err(e.into());
        }
    };
    let took = format_duration(start, epoch_now());

    line(
        Status::Ok,
        format!(
            "Loaded '{}' ({} tasks) in {}",
            definition.name(),
            definition.len(),
            took
        ),
    );

    let report = match definition.validate() {
        Ok(r) => r,
        Err(e) => {
            line(Status::Failed, &e);
            println!();
            return Err(e.into());
        }
    };

    line(Status::Ok, "No circular dependencies");

    let missing = if check_programs {
        let pb = spinner("Checking task programs...");
        let missing = check_commands(&definition);
        pb.finish_and_clear();
        missing
    } else {
        Vec::new()
    };

    if !missing.is_empty() {
        println!();
        println!("{}:", "Missing programs".yellow().bold());
        for m in &missing {
            line(Status::Warning, m);
        }
    }

    if report.has_warnings() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &report.warnings {
            line(Status::Warning, warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Definition summary".bold());
        println!("  Name: {}", definition.name());
        println!("  Schedule: {}", definition.schedule());
        println!("  Start date: {}", definition.start_date().to_rfc3339());
        println!("  Checked at: {} UTC", format_timestamp(start));
        println!("  Tasks:");
        for id in &report.order {
            let deps = definition.upstream_of(id);
            let deps = if deps.is_empty() {
                String::new()
            } else {
                format!(" [depends: {}]", deps.join(", "))
            };
            let params = definition
                .effective_params(id)
                .map(|p| params_summary(&p))
                .unwrap_or_default();
            println!("    - {} ({}){}", id, params, deps.dimmed());
        }
    }

    println!();

    if report.has_warnings() || !missing.is_empty() {
        println!("{}", "Definition is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Definition is valid!".green().bold());
    }

    Ok(())
}
