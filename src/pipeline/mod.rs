// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Pipeline definitions
//!
//! The definition-time model: task nodes with inherited parameters,
//! dependency edges, validation and command templates.

mod definition;
mod export;
mod file;
mod graph;
mod params;
mod template;
mod validation;

pub use definition::{PipelineDefinition, Schedule, TaskNode};
pub use export::{EdgeSpec, ExecutorHandoff, TaskSpec};
pub use file::{DefinitionFile, TaskEntry};
pub use graph::TaskGraph;
pub use params::{raw_params, ParamKey, ParamValue, RawParams, TaskParams};
pub use template::{
    ds_add, placeholders, render, TemplateContext, TemplateRenderer, DEFAULT_MAX_REPEAT,
};
pub use validation::{check_commands, ValidationReport, ValidationWarning};
