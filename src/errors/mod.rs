// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Error types
//!
//! Every definition error is raised synchronously by the operation that
//! detects it. Nothing is retried or recovered internally: an invalid
//! definition has to be fixed and rebuilt.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for flowdef operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Main error type for flowdef
#[derive(Error, Debug, Diagnostic)]
pub enum FlowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Definition Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid pipeline definition: {reason}")]
    #[diagnostic(code(flowdef::invalid_definition))]
    InvalidDefinition { reason: String },

    #[error("Task '{node}' is already defined")]
    #[diagnostic(
        code(flowdef::duplicate_node),
        help("Task ids must be unique within a pipeline")
    )]
    DuplicateNode { node: String },

    #[error("Unknown parameter '{key}' on {owner}")]
    #[diagnostic(
        code(flowdef::unknown_parameter),
        help("Recognized parameters: depends_on_past, retries, retry_delay, notify_on_failure, notify_on_retry")
    )]
    UnknownParameter { owner: String, key: String },

    #[error("Parameter '{key}' expects {expected}, got {found}")]
    #[diagnostic(code(flowdef::invalid_parameter))]
    InvalidParameter {
        key: String,
        expected: String,
        found: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Graph Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Task '{node}' is not defined")]
    #[diagnostic(
        code(flowdef::unknown_node),
        help("Declare '{node}' with add_node before wiring dependencies to it")
    )]
    UnknownNode { node: String },

    #[error("Task '{node}' cannot depend on itself")]
    #[diagnostic(code(flowdef::self_dependency))]
    SelfDependency { node: String },

    #[error("Dependency '{upstream}' -> '{downstream}' is already declared")]
    #[diagnostic(
        code(flowdef::duplicate_edge),
        help("Set `duplicate_edges = \"ignore\"` in flowdef.toml to treat repeats as no-ops")
    )]
    DuplicateEdge { upstream: String, downstream: String },

    #[error("Circular dependency: {}", .path.join(" -> "))]
    #[diagnostic(
        code(flowdef::cycle),
        help("Review your task dependencies to remove the cycle")
    )]
    Cycle { path: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // Template Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Template error: {message}")]
    #[diagnostic(code(flowdef::template))]
    Template {
        message: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Registry Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline '{name}' is defined in both {first} and {second}")]
    #[diagnostic(
        code(flowdef::duplicate_pipeline),
        help("Pipeline names must be unique across a definitions directory")
    )]
    DuplicatePipeline {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Definition file not found: {path}")]
    #[diagnostic(
        code(flowdef::file_not_found),
        help("Create one with 'flowdef init'")
    )]
    FileNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(flowdef::file_read_error))]
    FileRead { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(flowdef::file_write_error))]
    FileWrite { path: PathBuf, error: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(flowdef::config))]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(flowdef::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(flowdef::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(flowdef::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(flowdef::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(flowdef::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for FlowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for FlowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for FlowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl FlowError {
    /// Create a template error without help text
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
            help: None,
        }
    }

    /// Create a template error for a placeholder absent from the context
    pub fn missing_placeholder(name: &str) -> Self {
        Self::Template {
            message: format!("placeholder '{}' is not defined in the render context", name),
            help: Some(format!("Pass a value for '{}' (e.g. --var {}=...)", name, name)),
        }
    }

    /// Task ids involved in this error, for structured logging
    pub fn nodes(&self) -> Vec<&str> {
        match self {
            Self::DuplicateNode { node }
            | Self::UnknownNode { node }
            | Self::SelfDependency { node } => vec![node.as_str()],
            Self::DuplicateEdge {
                upstream,
                downstream,
            } => vec![upstream.as_str(), downstream.as_str()],
            Self::Cycle { path } => path.iter().map(String::as_str).collect(),
            _ => vec![],
        }
    }
}
