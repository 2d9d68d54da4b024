// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Watch command - re-validate definitions on file changes

use colored::Colorize;
use miette::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use super::output::{line, Status};
use crate::config::FlowdefConfig;
use crate::registry::{DefinitionRegistry, DEFINITION_EXTENSIONS};

/// Run the watch command
pub async fn run(dir: PathBuf, debounce_ms: u64, config: &FlowdefConfig, verbose: bool) -> Result<()> {
    if !dir.is_dir() {
        return Err(miette::miette!("Not a directory: {}", dir.display()));
    }

    println!("{}", "Starting watch mode...".bold());
    println!(
        "Watching {} for definition changes (debounce: {}ms)",
        dir.display(),
        debounce_ms
    );
    println!("Press {} to exit.", "Ctrl+C".cyan());
    println!();

    let (tx, rx) = channel();

    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)
        .map_err(|e| miette::miette!("Failed to create file watcher: {}", e))?;

    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| miette::miette!("Failed to start watching: {}", e))?;

    check_all(&dir, config, verbose);

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| is_definition_file(&e.path))
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .collect();

                if !relevant.is_empty() {
                    println!();
                    println!("{}", "─".repeat(50).dimmed());
                    println!(
                        "{}: {} file(s) changed",
                        "Change detected".yellow(),
                        relevant.len()
                    );

                    if verbose {
                        for event in &relevant {
                            println!("  {}", event.path.display());
                        }
                    }

                    println!();
                    check_all(&dir, config, verbose);
                }
            }
            Ok(Err(e)) => {
                eprintln!("{}: {:?}", "Watch error".red(), e);
            }
            Err(e) => {
                eprintln!("{}: {}", "Channel error".red(), e);
                break;
            }
        }
    }

    Ok(())
}

fn is_definition_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DEFINITION_EXTENSIONS.contains(&ext))
}

/// Load and validate every definition in `dir`; returns the number of failures
fn check_all(dir: &Path, config: &FlowdefConfig, verbose: bool) -> usize {
    let registry = match DefinitionRegistry::load_dir(dir, config.definitions) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}: {}", "Failed to scan directory".red(), e);
            return 1;
        }
    };

    let mut failed = registry.failures().len();

    for failure in registry.failures() {
        line(
            Status::Failed,
            format!("{}: {}", failure.path.display(), failure.error),
        );
    }

    for entry in registry.iter() {
        let name = entry.definition.name();
        match entry.definition.validate() {
            Ok(report) if report.has_warnings() => {
                line(Status::Warning, format!("{} ({} warning(s))", name, report.warnings.len()));
                if verbose {
                    for warning in &report.warnings {
                        println!("      {}", warning.to_string().dimmed());
                    }
                }
            }
            Ok(_) => line(Status::Ok, name),
            Err(e) => {
                failed += 1;
                line(Status::Failed, format!("{}: {}", name, e));
            }
        }
    }

    if failed == 0 {
        println!("{}", format!("{} definition(s) valid", registry.len()).green());
    } else {
        println!("{}", format!("{} definition(s) with errors", failed).red());
    }

    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_definition_file() {
        assert!(is_definition_file(Path::new("defs/a.yaml")));
        assert!(is_definition_file(Path::new("b.yml")));
        assert!(!is_definition_file(Path::new("flowdef.toml")));
        assert!(!is_definition_file(Path::new("README")));
    }

    #[test]
    fn test_check_all_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ok.yaml"),
            "name: ok\nschedule: 1d\nstart_date: 2021-01-01\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("cycle.yaml"),
            "name: cycle\nschedule: 1d\nstart_date: 2021-01-01\ntasks:\n  \
             - id: a\n    command: date\n    depends_on: [b]\n  \
             - id: b\n    command: date\n    depends_on: [a]\n",
        )
        .unwrap();

        assert_eq!(check_all(dir.path(), &FlowdefConfig::default(), true), 1);
    }
}
