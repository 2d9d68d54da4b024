// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! # flowdef - Workflow Definition Toolkit
//!
//! `flowdef` declares scheduled workflows as graphs of tasks: each task has a
//! command template and inherits pipeline defaults, dependencies form a DAG,
//! and a validated definition is handed to an executor.
//!
//! ## Features
//!
//! - **Parameter inheritance** - Pipeline defaults merged with per-task overrides
//! - **Dependency graphs** - Fan-out, fan-in and chains, with cycle detection
//! - **Command templates** - `{{ ds }}` placeholders and bounded `range` loops
//! - **Executor hand-off** - JSON or YAML export with a content fingerprint
//!
//! ## Quick Start
//!
//! ```bash
//! # Write an example definition
//! flowdef init
//!
//! # Check it
//! flowdef validate flowdef.yaml
//!
//! # Render one task's command for a run date
//! flowdef render flowdef.yaml templated --date 2021-01-01
//! ```
//!
//! ## Library use
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use flowdef::pipeline::{raw_params, PipelineDefinition, RawParams, Schedule};
//!
//! let mut def = PipelineDefinition::create(
//!     "example",
//!     &raw_params([("retries", 1i64)]),
//!     Schedule::parse("1d"),
//!     Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
//!     None,
//! )?;
//! def.add_node("t1", "date", &RawParams::new(), None)?;
//! def.add_node("t2", "sleep 5", &raw_params([("retries", 3i64)]), None)?;
//! def.add_dependency("t1", "t2")?;
//!
//! assert_eq!(def.effective_params("t2")?.retries(), Some(3));
//! assert_eq!(def.validate()?.order, vec!["t1", "t2"]);
//! # Ok::<(), flowdef::FlowError>(())
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod timefmt;

// Re-export commonly used types
pub use config::FlowdefConfig;
pub use errors::{FlowError, FlowResult};
pub use pipeline::{PipelineDefinition, TaskNode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
