// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! List command - show the definitions in a directory

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::output::{line, Status};
use crate::config::FlowdefConfig;
use crate::registry::DefinitionRegistry;

/// Run the list command
pub async fn run(dir: PathBuf, config: &FlowdefConfig, verbose: bool) -> Result<()> {
    let registry = DefinitionRegistry::load_dir(&dir, config.definitions)?;

    if registry.is_empty() && registry.failures().is_empty() {
        println!("No definitions found in {}", dir.display());
        return Ok(());
    }

    println!("{}", format!("Definitions in {}", dir.display()).bold());
    println!();

    for entry in registry.iter() {
        let def = &entry.definition;
        let tasks = if def.len() == 1 { "task" } else { "tasks" };
        println!(
            "  {} {} ({} {}, every {})",
            Status::Info.symbol(),
            def.name().bold(),
            def.len(),
            tasks,
            def.schedule()
        );

        if verbose {
            println!("      {}", entry.path.display().to_string().dimmed());
            if let Some(description) = def.description() {
                println!("      {}", description.dimmed());
            }
        }
    }

    if !registry.failures().is_empty() {
        println!();
        println!("{}:", "Failed to load".red().bold());
        for failure in registry.failures() {
            line(
                Status::Failed,
                format!("{}: {}", failure.path.display(), failure.error),
            );
        }
    }

    if verbose {
        println!();
        println!(
            "Parsed {} definition(s) in {}",
            registry.len(),
            humantime::format_duration(registry.total_parse_time())
        );
    }

    if registry.failures().is_empty() {
        Ok(())
    } else {
        Err(miette::miette!(
            "{} definition file(s) failed to load",
            registry.failures().len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "name: a\nschedule: 1d\nstart_date: 2021-01-01\n",
        )
        .unwrap();

        let result = tokio_test::block_on(run(dir.path().to_path_buf(), &FlowdefConfig::default(), true));
        assert!(result.is_ok());
    }

    #[test]
    fn test_broken_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "tasks: 3").unwrap();

        let result = tokio_test::block_on(run(dir.path().to_path_buf(), &FlowdefConfig::default(), false));
        assert!(result.is_err());
    }
}
