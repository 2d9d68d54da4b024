// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Definition validation
//!
//! A cycle is a hard error. Tasks that cannot be reached from a root, and
//! tasks with no dependencies in a multi-task pipeline, are reported as
//! warnings: isolated tasks are legal but usually a wiring mistake.

use serde::Serialize;
use std::fmt;
use tracing::{error, warn};

use crate::errors::FlowResult;
use crate::pipeline::graph::TaskGraph;
use crate::pipeline::PipelineDefinition;

/// A non-fatal finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "task", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Not reachable from any task without upstreams
    Unreachable(String),
    /// Declared but not connected to any other task
    Isolated(String),
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(task) => write!(f, "Task '{}' is not reachable from any root task", task),
            Self::Isolated(task) => write!(f, "Task '{}' has no upstream or downstream dependencies", task),
        }
    }
}

/// Result of a successful validation
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Task ids, every task after its upstreams
    pub order: Vec<String>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Validate a definition's graph
pub fn validate(definition: &PipelineDefinition) -> FlowResult<ValidationReport> {
    let graph = TaskGraph::build(definition);

    if let Err(e) = graph.ensure_acyclic() {
        error!(
            pipeline = definition.name(),
            tasks = ?e.nodes(),
            error = %e,
            "pipeline validation failed"
        );
        return Err(e);
    }

    let mut report = ValidationReport {
        order: graph.topological_order()?,
        warnings: Vec::new(),
    };

    report
        .warnings
        .extend(graph.unreachable().into_iter().map(ValidationWarning::Unreachable));
    report
        .warnings
        .extend(graph.isolated().into_iter().map(ValidationWarning::Isolated));

    for warning in &report.warnings {
        warn!(pipeline = definition.name(), "{}", warning);
    }

    Ok(report)
}

/// Tasks whose command program cannot be found on `PATH`.
///
/// Only the first word of the template is checked, and templates that start
/// with a placeholder or block are skipped.
pub fn check_commands(definition: &PipelineDefinition) -> Vec<String> {
    let mut missing = Vec::new();

    for node in definition.nodes() {
        let Some(program) = node.command_template().split_whitespace().next() else {
            missing.push(format!("Task '{}': command is empty", node.id()));
            continue;
        };

        if program.starts_with("{{") || program.starts_with("{%") {
            continue;
        }

        if which::which(program).is_err() {
            missing.push(format!(
                "Task '{}': program '{}' not found on PATH",
                node.id(),
                program
            ));
        }
    }

    missing
}
