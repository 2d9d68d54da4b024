// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Definition registry
//!
//! Loads every definition file in a directory and keeps pipeline names
//! unique across them. A file that fails to load is recorded and skipped so
//! one bad definition does not hide the others.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DefinitionOptions;
use crate::errors::{FlowError, FlowResult};
use crate::pipeline::PipelineDefinition;
use crate::timefmt::{epoch_now, format_duration};

/// File extensions picked up by [`DefinitionRegistry::load_dir`]
pub const DEFINITION_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// A definition and where it came from
#[derive(Debug, Clone)]
pub struct RegisteredDefinition {
    pub path: PathBuf,
    pub definition: PipelineDefinition,
    /// Wall-clock seconds spent parsing the file
    pub parse_seconds: f64,
}

/// A file that could not be loaded
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: FlowError,
}

/// Definitions keyed by pipeline name
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    entries: BTreeMap<String, RegisteredDefinition>,
    failures: Vec<LoadFailure>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition; a second pipeline with the same name is rejected
    pub fn register(&mut self, entry: RegisteredDefinition) -> FlowResult<()> {
        let name = entry.definition.name().to_string();
        if let Some(existing) = self.entries.get(&name) {
            return Err(FlowError::DuplicatePipeline {
                name,
                first: existing.path.clone(),
                second: entry.path,
            });
        }

        self.entries.insert(name, entry);
        Ok(())
    }

    /// Load all definition files directly inside `dir`
    pub fn load_dir(dir: &Path, options: DefinitionOptions) -> FlowResult<Self> {
        let mut registry = Self::new();

        for path in Self::definition_files(dir)? {
            let start = epoch_now();
            let loaded = PipelineDefinition::from_file(&path, options);
            let end = epoch_now();
            let took = format_duration(start, end);

            let parse_seconds = end - start;
            if parse_seconds > options.parse_budget.as_secs_f64() {
                warn!(
                    file = %path.display(),
                    took = %took,
                    budget = %humantime::format_duration(options.parse_budget),
                    "definition parsing exceeded budget"
                );
            }

            let result = loaded.and_then(|definition| {
                debug!(file = %path.display(), pipeline = definition.name(), took = %took, "definition loaded");
                registry.register(RegisteredDefinition {
                    path: path.clone(),
                    definition,
                    parse_seconds,
                })
            });

            if let Err(error) = result {
                warn!(file = %path.display(), error = %error, "definition skipped");
                registry.failures.push(LoadFailure { path, error });
            }
        }

        Ok(registry)
    }

    /// Definition files in `dir`, sorted by path
    pub fn definition_files(dir: &Path) -> FlowResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(FlowError::FileNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        for ext in DEFINITION_EXTENSIONS {
            let pattern = dir.join(format!("*.{}", ext));
            for entry in glob::glob(&pattern.to_string_lossy())? {
                match entry {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "unreadable directory entry"),
                }
            }
        }

        files.sort();
        Ok(files)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredDefinition> {
        self.entries.get(name)
    }

    /// Pipeline names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredDefinition> {
        self.entries.values()
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total time spent parsing, for reporting
    pub fn total_parse_time(&self) -> Duration {
        Duration::from_secs_f64(self.iter().map(|e| e.parse_seconds.max(0.0)).sum())
    }
}
