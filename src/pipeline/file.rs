// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Definition file format
//!
//! ```yaml
//! name: example_pipeline
//! description: Prints the date, then sleeps and echoes in parallel
//! schedule: 1d
//! start_date: 2021-01-01
//! catchup: false
//! tags: [example]
//! default_args:
//!   retries: 1
//!   retry_delay: 5m
//! tasks:
//!   - id: print_date
//!     command: date
//!   - id: sleep
//!     command: sleep 5
//!     params:
//!       retries: 3
//!     depends_on: [print_date]
//! ```
//!
//! Loading goes through [`PipelineDefinition::add_node`] and
//! [`PipelineDefinition::add_dependency`], so a file is held to exactly the
//! same rules as a definition built in code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::DefinitionOptions;
use crate::errors::{FlowError, FlowResult};
use crate::pipeline::params::{ParamKey, ParamValue, RawParams, TaskParams};
use crate::pipeline::{PipelineDefinition, Schedule};
use crate::timefmt::parse_date_time;

/// On-disk form of a pipeline definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefinitionFile {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub schedule: String,

    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub start_date: String,

    #[serde(default)]
    pub catchup: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default_args: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

/// One task in a definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    pub id: String,

    pub command: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Upstream task ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl DefinitionFile {
    pub fn from_yaml(yaml: &str) -> FlowResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    pub fn to_yaml(&self) -> FlowResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Build and populate a definition from this file
    pub fn into_definition(self, options: DefinitionOptions) -> FlowResult<PipelineDefinition> {
        let start_date =
            parse_date_time(&self.start_date).ok_or_else(|| FlowError::InvalidDefinition {
                reason: format!(
                    "start_date '{}' is not an RFC 3339 timestamp or YYYY-MM-DD date",
                    self.start_date
                ),
            })?;

        let defaults = raw_from_yaml(&format!("pipeline '{}'", self.name), &self.default_args)?;

        let mut definition = PipelineDefinition::create(
            self.name,
            &defaults,
            Schedule::parse(&self.schedule),
            start_date,
            self.description,
        )?
        .with_options(options)
        .with_catchup(self.catchup)
        .with_tags(self.tags);

        if let Some(doc) = self.documentation {
            definition = definition.with_documentation(doc);
        }

        for task in &self.tasks {
            let params = raw_from_yaml(&format!("task '{}'", task.id), &task.params)?;
            definition.add_node(task.id.as_str(), task.command.as_str(), &params, task.doc.clone())?;
        }

        for task in &self.tasks {
            for upstream in &task.depends_on {
                definition.add_dependency(upstream, &task.id)?;
            }
        }

        Ok(definition)
    }
}

/// Convert YAML parameter values, rejecting unrecognized keys up front
fn raw_from_yaml(owner: &str, values: &BTreeMap<String, serde_yaml::Value>) -> FlowResult<RawParams> {
    values
        .iter()
        .map(|(key, value)| {
            key.parse::<ParamKey>()
                .map_err(|_| FlowError::UnknownParameter {
                    owner: owner.to_string(),
                    key: key.clone(),
                })?;
            Ok((key.clone(), ParamValue::from_yaml(key, value)?))
        })
        .collect()
}

fn yaml_params(params: &TaskParams) -> BTreeMap<String, serde_yaml::Value> {
    params
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_yaml()))
        .collect()
}

impl PipelineDefinition {
    /// Load a definition file
    pub fn from_file(path: &Path, options: DefinitionOptions) -> FlowResult<Self> {
        if !path.exists() {
            return Err(FlowError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FlowError::FileRead {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_yaml(&content, options)
    }

    /// Parse a definition from YAML text
    pub fn from_yaml(yaml: &str, options: DefinitionOptions) -> FlowResult<Self> {
        DefinitionFile::from_yaml(yaml)?.into_definition(options)
    }

    /// On-disk form of this definition
    pub fn to_file(&self) -> DefinitionFile {
        let tasks = self
            .nodes()
            .iter()
            .map(|node| TaskEntry {
                id: node.id().to_string(),
                command: node.command_template().to_string(),
                params: yaml_params(node.params()),
                doc: node.documentation().map(str::to_string),
                depends_on: self
                    .upstream_of(node.id())
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
            .collect();

        DefinitionFile {
            name: self.name().to_string(),
            description: self.description().map(str::to_string),
            schedule: self.schedule().to_string(),
            start_date: self.start_date().to_rfc3339(),
            catchup: self.catchup(),
            tags: self.tags().to_vec(),
            documentation: self.documentation().map(str::to_string),
            default_args: yaml_params(self.defaults()),
            tasks,
        }
    }

    pub fn to_yaml(&self) -> FlowResult<String> {
        self.to_file().to_yaml()
    }

    /// Write this definition as YAML
    pub fn save(&self, path: &Path) -> FlowResult<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml).map_err(|e| FlowError::FileWrite {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const EXAMPLE: &str = r#"
name: example
schedule: 1d
start_date: 2021-01-01
tags: [example]
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

    #[test]
    fn test_load_example() {
        let def = PipelineDefinition::from_yaml(EXAMPLE, DefinitionOptions::default()).unwrap();

        assert_eq!(def.name(), "example");
        assert_eq!(def.node_ids(), vec!["t1", "t2", "t3"]);
        assert_eq!(def.schedule(), &Schedule::Interval(Duration::from_secs(86_400)));
        assert!(def.has_edge("t1", "t2"));
        assert!(def.has_edge("t1", "t3"));
        assert!(def.validate().is_ok());

        assert_eq!(def.effective_params("t2").unwrap().retries(), Some(3));
        assert_eq!(def.effective_params("t1").unwrap().retries(), Some(1));
        assert_eq!(def.effective_params("t3").unwrap().retries(), Some(1));
    }

    #[test]
    fn test_dependency_declared_before_task() {
        let yaml = r#"
name: forward
schedule: "@daily"
start_date: 2021-01-01T00:00:00Z
tasks:
  - id: b
    command: "true"
    depends_on: [a]
  - id: a
    command: "true"
"#;
        let def = PipelineDefinition::from_yaml(yaml, DefinitionOptions::default()).unwrap();
        assert!(def.has_edge("a", "b"));
        assert_eq!(def.schedule(), &Schedule::Expression("@daily".into()));
    }

    #[test]
    fn test_unknown_default_arg() {
        let yaml = r#"
name: bad
schedule: 1d
start_date: 2021-01-01
default_args:
  email: ["ops@example.com"]
tasks: []
"#;
        let err = PipelineDefinition::from_yaml(yaml, DefinitionOptions::default()).unwrap_err();
        assert!(matches!(err, FlowError::UnknownParameter { ref key, .. } if key == "email"));
    }

    #[test]
    fn test_unknown_dependency() {
        let yaml = r#"
name: bad
schedule: 1d
start_date: 2021-01-01
tasks:
  - id: a
    command: "true"
    depends_on: [ghost]
"#;
        let err = PipelineDefinition::from_yaml(yaml, DefinitionOptions::default()).unwrap_err();
        assert!(matches!(err, FlowError::UnknownNode { ref node } if node == "ghost"));
    }

    #[test]
    fn test_bad_start_date() {
        let yaml = "name: bad\nschedule: 1d\nstart_date: someday\n";
        let err = PipelineDefinition::from_yaml(yaml, DefinitionOptions::default()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_unknown_field_is_yaml_error() {
        let yaml = "name: bad\nschedule: 1d\nstart_date: 2021-01-01\ncatch_up: true\n";
        let err = PipelineDefinition::from_yaml(yaml, DefinitionOptions::default()).unwrap_err();
        assert!(matches!(err, FlowError::Yaml { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let def = PipelineDefinition::from_yaml(EXAMPLE, DefinitionOptions::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.yaml");

        def.save(&path).unwrap();
        let reloaded = PipelineDefinition::from_file(&path, DefinitionOptions::default()).unwrap();

        assert_eq!(reloaded.node_ids(), def.node_ids());
        assert_eq!(reloaded.edges(), def.edges());
        assert_eq!(reloaded.defaults(), def.defaults());
        assert_eq!(reloaded.start_date(), def.start_date());
        assert_eq!(reloaded.tags(), def.tags());
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineDefinition::from_file(Path::new("/nonexistent/p.yaml"), DefinitionOptions::default())
            .unwrap_err();
        assert!(matches!(err, FlowError::FileNotFound { .. }));
    }
}
