// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Executor hand-off
//!
//! The document an executor receives: the validated graph, each task's
//! effective parameters and, when a run context is supplied, the rendered
//! commands. The fingerprint is a BLAKE3 hash of the definition's canonical
//! JSON form, so an executor can tell when a definition changed.

use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::FlowResult;
use crate::pipeline::template::TemplateContext;
use crate::pipeline::PipelineDefinition;

/// One dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeSpec {
    pub upstream: String,
    pub downstream: String,
}

/// One task as the executor sees it
#[derive(Debug, Clone, Serialize)]
pub struct TaskSpec {
    pub id: String,
    pub upstream: Vec<String>,
    /// Defaults merged with overrides. Durations are in seconds.
    pub params: BTreeMap<String, serde_json::Value>,
    pub command_template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// Everything an executor needs to schedule a pipeline
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorHandoff {
    pub pipeline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schedule: String,
    pub start_date: DateTime<Utc>,
    pub catchup: bool,
    pub tags: Vec<String>,
    pub order: Vec<String>,
    pub edges: Vec<EdgeSpec>,
    pub tasks: Vec<TaskSpec>,
    pub warnings: Vec<String>,
    pub fingerprint: String,
}

impl ExecutorHandoff {
    pub fn to_json(&self) -> FlowResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    pub fn to_yaml(&self) -> FlowResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    pub fn task(&self, id: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

impl PipelineDefinition {
    /// Validate and produce the executor hand-off.
    ///
    /// Commands are rendered only when `context` is given; otherwise the
    /// executor renders them per run.
    pub fn export(&self, context: Option<&TemplateContext>) -> FlowResult<ExecutorHandoff> {
        let report = self.validate()?;

        let tasks = self
            .nodes()
            .iter()
            .map(|node| {
                let params = self
                    .effective_params(node.id())?
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), v.to_json()))
                    .collect();
                let command = context
                    .map(|ctx| self.render_command(node.id(), ctx))
                    .transpose()?;

                Ok(TaskSpec {
                    id: node.id().to_string(),
                    upstream: self
                        .upstream_of(node.id())
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    params,
                    command_template: node.command_template().to_string(),
                    command,
                    documentation: node.documentation().map(str::to_string),
                })
            })
            .collect::<FlowResult<Vec<_>>>()?;

        Ok(ExecutorHandoff {
            pipeline: self.name().to_string(),
            description: self.description().map(str::to_string),
            schedule: self.schedule().to_string(),
            start_date: self.start_date(),
            catchup: self.catchup(),
            tags: self.tags().to_vec(),
            order: report.order,
            edges: self
                .edges()
                .iter()
                .map(|(up, down)| EdgeSpec {
                    upstream: up.clone(),
                    downstream: down.clone(),
                })
                .collect(),
            tasks,
            warnings: report.warnings.iter().map(ToString::to_string).collect(),
            fingerprint: self.fingerprint()?,
        })
    }

    /// BLAKE3 hex digest of the definition's canonical JSON form
    pub fn fingerprint(&self) -> FlowResult<String> {
        let canonical = serde_json::to_string(&self.to_file())?;
        let mut hasher = Hasher::new();
        hasher.update(canonical.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionOptions;
    use crate::errors::FlowError;

    const YAML: &str = r#"
name: example
schedule: 1d
start_date: 2021-01-01
default_args:
  retries: 1
  retry_delay: 5m
tasks:
  - id: t1
    command: date
  - id: t2
    command: sleep 5
    params:
      retries: 3
    depends_on: [t1]
  - id: t3
    command: echo "{{ ds }}"
    depends_on: [t1]
"#;

    fn example() -> PipelineDefinition {
        PipelineDefinition::from_yaml(YAML, DefinitionOptions::default()).unwrap()
    }

    #[test]
    fn test_export_without_context() {
        let handoff = example().export(None).unwrap();

        assert_eq!(handoff.pipeline, "example");
        assert_eq!(handoff.order[0], "t1");
        assert_eq!(handoff.edges.len(), 2);
        assert_eq!(handoff.task("t2").unwrap().params["retries"], serde_json::json!(3));
        assert_eq!(handoff.task("t3").unwrap().params["retries"], serde_json::json!(1));
        assert_eq!(handoff.task("t1").unwrap().params["retry_delay"], serde_json::json!(300.0));
        assert!(handoff.task("t3").unwrap().command.is_none());
    }

    #[test]
    fn test_export_renders_commands() {
        let ctx = TemplateContext::new().with("ds", "2021-01-01");
        let handoff = example().export(Some(&ctx)).unwrap();

        assert_eq!(
            handoff.task("t3").unwrap().command.as_deref(),
            Some("echo \"2021-01-01\"")
        );
        assert_eq!(handoff.task("t3").unwrap().upstream, vec!["t1"]);
    }

    #[test]
    fn test_export_fails_on_missing_placeholder() {
        let result = example().export(Some(&TemplateContext::new()));
        assert!(matches!(result, Err(FlowError::Template { .. })));
    }

    #[test]
    fn test_fingerprint_tracks_changes() {
        let a = example();
        let b = example();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);

        let mut c = example();
        c.add_node("t4", "true", &Default::default(), None).unwrap();
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn test_handoff_serializes() {
        let handoff = example().export(None).unwrap();
        let json = handoff.to_json().unwrap();

        assert!(json.contains("\"fingerprint\""));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tasks"].as_array().unwrap().len(), 3);
        assert!(handoff.to_yaml().unwrap().contains("pipeline: example"));
    }
}
