// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Pipeline definition
//!
//! A [`PipelineDefinition`] is built once (programmatically or from a
//! definition file), populated with task nodes and dependency edges, validated,
//! and then handed read-only to an executor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::config::{DefinitionOptions, DuplicateEdgePolicy};
use crate::errors::{FlowError, FlowResult};
use crate::pipeline::params::{RawParams, TaskParams};
use crate::pipeline::template::{TemplateContext, TemplateRenderer};
use crate::pipeline::validation::{self, ValidationReport};

/// When the executor should run the pipeline. Opaque to flowdef.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Schedule {
    /// Fixed interval between runs (`1d`, `6h`)
    Interval(Duration),
    /// Anything else: cron expressions, presets such as `@daily`
    Expression(String),
}

impl Schedule {
    /// Interpret `text` as a humantime interval, falling back to an expression
    pub fn parse(text: &str) -> Self {
        match humantime::parse_duration(text.trim()) {
            Ok(d) => Self::Interval(d),
            Err(_) => Self::Expression(text.trim().to_string()),
        }
    }
}

impl From<String> for Schedule {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<Schedule> for String {
    fn from(schedule: Schedule) -> Self {
        schedule.to_string()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval(d) => write!(f, "{}", humantime::format_duration(*d)),
            Self::Expression(e) => f.write_str(e),
        }
    }
}

/// A declared unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    id: String,
    command_template: String,
    params: TaskParams,
    documentation: Option<String>,
}

impl TaskNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn command_template(&self) -> &str {
        &self.command_template
    }

    /// Overrides declared on this task (not merged with defaults)
    pub fn params(&self) -> &TaskParams {
        &self.params
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }
}

/// A pipeline: defaults, schedule metadata, task nodes and dependency edges
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    name: String,
    description: Option<String>,
    defaults: TaskParams,
    schedule: Schedule,
    start_date: DateTime<Utc>,
    catchup: bool,
    tags: Vec<String>,
    documentation: Option<String>,
    nodes: Vec<TaskNode>,
    index: HashMap<String, usize>,
    edges: Vec<(String, String)>,
    edge_set: HashSet<(String, String)>,
    options: DefinitionOptions,
}

impl PipelineDefinition {
    /// Create an empty definition
    pub fn create(
        name: impl Into<String>,
        defaults: &RawParams,
        schedule: Schedule,
        start_date: DateTime<Utc>,
        description: Option<String>,
    ) -> FlowResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FlowError::InvalidDefinition {
                reason: "pipeline name must not be empty".into(),
            });
        }

        let defaults = TaskParams::from_raw(&format!("pipeline '{}'", name), defaults)?;

        Ok(Self {
            name,
            description,
            defaults,
            schedule,
            start_date,
            catchup: false,
            tags: Vec::new(),
            documentation: None,
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            edge_set: HashSet::new(),
            options: DefinitionOptions::default(),
        })
    }

    pub fn with_options(mut self, options: DefinitionOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether the executor should backfill runs missed since `start_date`
    pub fn with_catchup(mut self, catchup: bool) -> Self {
        self.catchup = catchup;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn defaults(&self) -> &TaskParams {
        &self.defaults
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn catchup(&self) -> bool {
        self.catchup
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    pub fn options(&self) -> &DefinitionOptions {
        &self.options
    }

    /// Declare a task.
    ///
    /// Nothing is modified unless every check passes.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        command_template: impl Into<String>,
        params: &RawParams,
        documentation: Option<String>,
    ) -> FlowResult<&TaskNode> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FlowError::InvalidDefinition {
                reason: "task id must not be empty".into(),
            });
        }
        if self.index.contains_key(&id) {
            return Err(FlowError::DuplicateNode { node: id });
        }

        let params = TaskParams::from_raw(&format!("task '{}'", id), params)?;

        debug!(pipeline = %self.name, task = %id, overrides = params.len(), "task declared");

        let position = self.nodes.len();
        self.index.insert(id.clone(), position);
        self.nodes.push(TaskNode {
            id,
            command_template: command_template.into(),
            params,
            documentation,
        });

        Ok(&self.nodes[position])
    }

    pub fn node(&self, id: &str) -> Option<&TaskNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Tasks in declaration order
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Defaults merged with the task's overrides
    pub fn effective_params(&self, id: &str) -> FlowResult<TaskParams> {
        let node = self.require(id)?;
        Ok(self.defaults.merged_with(&node.params))
    }

    /// Declare that `downstream` runs after `upstream`
    pub fn add_dependency(&mut self, upstream: &str, downstream: &str) -> FlowResult<()> {
        if self.check_edge(upstream, downstream)? {
            self.insert_edge(upstream, downstream);
        }
        Ok(())
    }

    /// `upstream` before each of `downstreams`. All edges are checked first.
    pub fn add_fan_out(&mut self, upstream: &str, downstreams: &[&str]) -> FlowResult<()> {
        let pairs: Vec<(&str, &str)> = downstreams.iter().map(|d| (upstream, *d)).collect();
        self.add_edges(&pairs)
    }

    /// Each of `upstreams` before `downstream`. All edges are checked first.
    pub fn add_fan_in(&mut self, upstreams: &[&str], downstream: &str) -> FlowResult<()> {
        let pairs: Vec<(&str, &str)> = upstreams.iter().map(|u| (*u, downstream)).collect();
        self.add_edges(&pairs)
    }

    /// `ids[0]` before `ids[1]` before `ids[2]` ...
    pub fn add_chain(&mut self, ids: &[&str]) -> FlowResult<()> {
        let pairs: Vec<(&str, &str)> = ids.windows(2).map(|w| (w[0], w[1])).collect();
        self.add_edges(&pairs)
    }

    fn add_edges(&mut self, pairs: &[(&str, &str)]) -> FlowResult<()> {
        let mut pending: Vec<(&str, &str)> = Vec::with_capacity(pairs.len());
        for &(up, down) in pairs {
            let is_new = self.check_edge(up, down)?;
            if pending.contains(&(up, down)) {
                if self.options.duplicate_edges == DuplicateEdgePolicy::Reject {
                    return Err(FlowError::DuplicateEdge {
                        upstream: up.to_string(),
                        downstream: down.to_string(),
                    });
                }
                continue;
            }
            if is_new {
                pending.push((up, down));
            }
        }

        for (up, down) in pending {
            self.insert_edge(up, down);
        }
        Ok(())
    }

    /// Returns whether the edge is new. Errors leave the graph untouched.
    fn check_edge(&self, upstream: &str, downstream: &str) -> FlowResult<bool> {
        self.require(upstream)?;
        self.require(downstream)?;

        if upstream == downstream {
            return Err(FlowError::SelfDependency {
                node: upstream.to_string(),
            });
        }

        let key = (upstream.to_string(), downstream.to_string());
        if self.edge_set.contains(&key) {
            return match self.options.duplicate_edges {
                DuplicateEdgePolicy::Reject => Err(FlowError::DuplicateEdge {
                    upstream: key.0,
                    downstream: key.1,
                }),
                DuplicateEdgePolicy::Ignore => {
                    debug!(upstream, downstream, "ignoring repeated dependency");
                    Ok(false)
                }
            };
        }

        Ok(true)
    }

    fn insert_edge(&mut self, upstream: &str, downstream: &str) {
        debug!(pipeline = %self.name, upstream, downstream, "dependency declared");
        let key = (upstream.to_string(), downstream.to_string());
        self.edge_set.insert(key.clone());
        self.edges.push(key);
    }

    /// Edges in declaration order
    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    pub fn has_edge(&self, upstream: &str, downstream: &str) -> bool {
        self.edge_set
            .contains(&(upstream.to_string(), downstream.to_string()))
    }

    /// Direct upstream tasks of `id`
    pub fn upstream_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, down)| down == id)
            .map(|(up, _)| up.as_str())
            .collect()
    }

    /// Direct downstream tasks of `id`
    pub fn downstream_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(up, _)| up == id)
            .map(|(_, down)| down.as_str())
            .collect()
    }

    /// Check the graph: cycles are errors, unreachable or isolated tasks are warnings
    pub fn validate(&self) -> FlowResult<ValidationReport> {
        validation::validate(self)
    }

    /// Render the command of task `id` against `context`
    pub fn render_command(&self, id: &str, context: &TemplateContext) -> FlowResult<String> {
        let node = self.require(id)?;
        TemplateRenderer::new(self.options.max_repeat).render(&node.command_template, context)
    }

    /// Render every task's command
    pub fn render_all(&self, context: &TemplateContext) -> FlowResult<BTreeMap<String, String>> {
        self.nodes
            .iter()
            .map(|n| Ok((n.id.clone(), self.render_command(&n.id, context)?)))
            .collect()
    }

    fn require(&self, id: &str) -> FlowResult<&TaskNode> {
        self.node(id).ok_or_else(|| FlowError::UnknownNode {
            node: id.to_string(),
        })
    }
}
