// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Task dependency graph
//!
//! Builds a petgraph view of a pipeline definition for cycle detection,
//! ordering queries and diagram output.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use crate::errors::{FlowError, FlowResult};
use crate::pipeline::PipelineDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Dependency graph over the tasks of one definition
pub struct TaskGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    /// Build the graph. Node indices follow declaration order.
    pub fn build(definition: &PipelineDefinition) -> Self {
        let mut graph = DiGraph::with_capacity(definition.len(), definition.edges().len());
        let mut index = HashMap::with_capacity(definition.len());

        for node in definition.nodes() {
            let idx = graph.add_node(node.id().to_string());
            index.insert(node.id().to_string(), idx);
        }

        for (up, down) in definition.edges() {
            graph.add_edge(index[up], index[down], ());
        }

        Self { graph, index }
    }

    fn name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// Neighbours in declaration order
    fn sorted_neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        next.sort();
        next
    }

    /// Find a cycle with a white/gray/black depth-first search.
    ///
    /// The returned path starts and ends with the same task, and every
    /// consecutive pair is a declared edge.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::White; self.graph.node_count()];

        self.graph
            .node_indices()
            .find_map(|start| match marks[start.index()] {
                Mark::White => self.visit(start, &mut marks),
                _ => None,
            })
    }

    /// Iterative search from `start`; each frame holds a gray node, its
    /// successors and the position of the next successor to look at.
    fn visit(&self, start: NodeIndex, marks: &mut [Mark]) -> Option<Vec<String>> {
        let mut frames: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();

        marks[start.index()] = Mark::Gray;
        frames.push((start, self.sorted_neighbors(start, Direction::Outgoing), 0));

        while let Some((node, successors, cursor)) = frames.last_mut() {
            let Some(&next) = successors.get(*cursor) else {
                marks[node.index()] = Mark::Black;
                frames.pop();
                continue;
            };
            *cursor += 1;

            match marks[next.index()] {
                Mark::Gray => {
                    let pos = frames.iter().position(|(n, _, _)| *n == next)?;
                    let mut path: Vec<String> = frames[pos..]
                        .iter()
                        .map(|(n, _, _)| self.name(*n).to_string())
                        .collect();
                    path.push(self.name(next).to_string());
                    return Some(path);
                }
                Mark::White => {
                    marks[next.index()] = Mark::Gray;
                    frames.push((next, self.sorted_neighbors(next, Direction::Outgoing), 0));
                }
                Mark::Black => {}
            }
        }

        None
    }

    /// Fail with the offending path if the graph has a cycle
    pub fn ensure_acyclic(&self) -> FlowResult<()> {
        match self.find_cycle() {
            Some(path) => Err(FlowError::Cycle { path }),
            None => Ok(()),
        }
    }

    /// Task ids in an order where every task follows its upstreams
    pub fn topological_order(&self) -> FlowResult<Vec<String>> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.name(n).to_string()).collect())
            .map_err(|cycle| FlowError::Cycle {
                path: self
                    .find_cycle()
                    .unwrap_or_else(|| vec![self.name(cycle.node_id()).to_string()]),
            })
    }

    /// Tasks with no upstream dependencies
    pub fn roots(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|n| {
                self.graph
                    .neighbors_directed(*n, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|n| self.name(n).to_string())
            .collect()
    }

    /// Tasks that cannot be reached from any root
    pub fn unreachable(&self) -> Vec<String> {
        let mut seen: HashSet<NodeIndex> = HashSet::new();

        for root in self.roots() {
            let mut dfs = Dfs::new(&self.graph, self.index[&root]);
            while let Some(n) = dfs.next(&self.graph) {
                seen.insert(n);
            }
        }

        self.graph
            .node_indices()
            .filter(|n| !seen.contains(n))
            .map(|n| self.name(n).to_string())
            .collect()
    }

    /// Tasks with no edges at all, when the pipeline has more than one task
    pub fn isolated(&self) -> Vec<String> {
        if self.graph.node_count() < 2 {
            return Vec::new();
        }

        self.graph
            .node_indices()
            .filter(|n| self.graph.neighbors_undirected(*n).next().is_none())
            .map(|n| self.name(n).to_string())
            .collect()
    }

    /// Direct upstream tasks
    pub fn upstream(&self, id: &str) -> Option<Vec<String>> {
        let node = self.index.get(id)?;
        Some(
            self.sorted_neighbors(*node, Direction::Incoming)
                .into_iter()
                .map(|n| self.name(n).to_string())
                .collect(),
        )
    }

    /// Direct downstream tasks
    pub fn downstream(&self, id: &str) -> Option<Vec<String>> {
        let node = self.index.get(id)?;
        Some(
            self.sorted_neighbors(*node, Direction::Outgoing)
                .into_iter()
                .map(|n| self.name(n).to_string())
                .collect(),
        )
    }

    /// Check if task `a` depends (directly or transitively) on task `b`
    pub fn depends_on(&self, a: &str, b: &str) -> bool {
        let (Some(node_a), Some(node_b)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        node_a != node_b && has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Numbered execution order with direct dependencies
    pub fn to_text(&self) -> FlowResult<String> {
        let mut out = String::new();

        for (i, id) in self.topological_order()?.iter().enumerate() {
            out.push_str(&format!("{}. {}", i + 1, id));

            let deps = self.upstream(id).unwrap_or_default();
            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }

    /// Indented hierarchy starting at the roots. A task reached again
    /// through another upstream is printed as `id (see above)` and not
    /// expanded a second time.
    pub fn to_tree(&self) -> FlowResult<String> {
        self.ensure_acyclic()?;

        let mut out = String::new();
        let mut printed: HashSet<NodeIndex> = HashSet::new();
        let mut pending: Vec<(NodeIndex, usize)> = self
            .roots()
            .iter()
            .rev()
            .map(|root| (self.index[root], 0))
            .collect();

        while let Some((node, depth)) = pending.pop() {
            out.push_str(&"    ".repeat(depth));
            out.push_str(self.name(node));

            if !printed.insert(node) {
                out.push_str(" (see above)\n");
                continue;
            }
            out.push('\n');

            let children = self.sorted_neighbors(node, Direction::Outgoing);
            pending.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }

        Ok(out)
    }

    /// Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for n in self.graph.node_indices() {
            out.push_str(&format!("    {}[{}]\n", self.name(n), self.name(n)));
        }

        for edge in self.graph.edge_references() {
            out.push_str(&format!(
                "    {} --> {}\n",
                self.name(edge.source()),
                self.name(edge.target())
            ));
        }

        out
    }

    /// Graphviz DOT
    pub fn to_dot(&self, name: &str) -> String {
        let mut out = format!("digraph \"{}\" {{\n", name);
        out.push_str("    rankdir=LR;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for edge in self.graph.edge_references() {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                self.name(edge.source()),
                self.name(edge.target())
            ));
        }

        for n in self.graph.node_indices() {
            if self.graph.neighbors_undirected(n).next().is_none() {
                out.push_str(&format!("    \"{}\";\n", self.name(n)));
            }
        }

        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RawParams, Schedule};
    use chrono::{TimeZone, Utc};

    fn make_definition(tasks: &[&str], edges: &[(&str, &str)]) -> PipelineDefinition {
        let mut def = PipelineDefinition::create(
            "test",
            &RawParams::new(),
            Schedule::parse("1d"),
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            None,
        )
        .unwrap();

        for id in tasks {
            def.add_node(*id, "true", &RawParams::new(), None).unwrap();
        }
        for (up, down) in edges {
            def.add_dependency(up, down).unwrap();
        }
        def
    }

    fn assert_is_cycle(def: &PipelineDefinition, path: &[String]) {
        assert!(path.len() >= 3);
        assert_eq!(path.first(), path.last());
        for pair in path.windows(2) {
            assert!(def.has_edge(&pair[0], &pair[1]), "{} -> {} is not an edge", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_linear_order() {
        let def = make_definition(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let graph = TaskGraph::build(&def);

        assert_eq!(graph.topological_order().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_order() {
        let def = make_definition(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let order = TaskGraph::build(&def).topological_order().unwrap();

        assert_eq!(order[0], "a");
        assert_eq!(order[3], "d");
    }

    #[test]
    fn test_two_node_cycle() {
        let def = make_definition(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let path = TaskGraph::build(&def).find_cycle().unwrap();

        assert_is_cycle(&def, &path);
        assert_eq!(path, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_cycle_behind_acyclic_prefix() {
        let def = make_definition(
            &["start", "x", "y", "z"],
            &[("start", "x"), ("x", "y"), ("y", "z"), ("z", "x")],
        );
        let graph = TaskGraph::build(&def);
        let path = graph.find_cycle().unwrap();

        assert_is_cycle(&def, &path);
        assert!(!path.contains(&"start".to_string()));
        assert!(matches!(graph.topological_order(), Err(FlowError::Cycle { .. })));
    }

    #[test]
    fn test_acyclic_has_no_cycle() {
        let def = make_definition(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        assert!(TaskGraph::build(&def).find_cycle().is_none());
    }

    #[test]
    fn test_roots_and_isolated() {
        let def = make_definition(&["a", "b", "lonely"], &[("a", "b")]);
        let graph = TaskGraph::build(&def);

        assert_eq!(graph.roots(), vec!["a", "lonely"]);
        assert_eq!(graph.isolated(), vec!["lonely"]);
        assert!(graph.unreachable().is_empty());
    }

    #[test]
    fn test_unreachable_cycle_members() {
        let def = make_definition(&["a", "b", "c"], &[("b", "c"), ("c", "b")]);
        let graph = TaskGraph::build(&def);

        assert_eq!(graph.unreachable(), vec!["b", "c"]);
    }

    #[test]
    fn test_depends_on() {
        let def = make_definition(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let graph = TaskGraph::build(&def);

        assert!(graph.depends_on("c", "a"));
        assert!(graph.depends_on("b", "a"));
        assert!(!graph.depends_on("a", "c"));
        assert!(!graph.depends_on("a", "a"));
        assert!(!graph.depends_on("a", "missing"));
    }

    #[test]
    fn test_text_output() {
        let def = make_definition(&["t1", "t2", "t3"], &[("t1", "t2"), ("t1", "t3")]);
        let text = TaskGraph::build(&def).to_text().unwrap();

        assert!(text.starts_with("1. t1\n"));
        assert!(text.contains("t2 [depends: t1]"));
        assert!(text.contains("t3 [depends: t1]"));
    }

    #[test]
    fn test_tree_output() {
        let def = make_definition(&["t1", "t2", "t3"], &[("t1", "t2"), ("t1", "t3")]);
        let tree = TaskGraph::build(&def).to_tree().unwrap();

        insta::assert_snapshot!(tree, @r"
        t1
            t2
            t3
        ");
    }

    #[test]
    fn test_tree_marks_shared_subtrees() {
        let def = make_definition(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let tree = TaskGraph::build(&def).to_tree().unwrap();

        insta::assert_snapshot!(tree, @r"
        a
            b
                d
            c
                d (see above)
        ");
    }

    #[test]
    fn test_tree_of_ladder_stays_linear() {
        let layers = 30;
        let ids: Vec<String> = (0..layers * 2).map(|i| format!("t{}", i)).collect();
        let names: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut edges = Vec::new();
        for layer in 0..layers - 1 {
            for from in 0..2 {
                for to in 0..2 {
                    edges.push((names[layer * 2 + from], names[(layer + 1) * 2 + to]));
                }
            }
        }
        let def = make_definition(&names, &edges);
        let tree = TaskGraph::build(&def).to_tree().unwrap();

        assert_eq!(tree.lines().count(), 2 + (layers - 1) * 2 * 2);
        assert!(tree.contains("t3 (see above)"));
    }

    fn chain(len: usize) -> (PipelineDefinition, Vec<String>) {
        let ids: Vec<String> = (0..len).map(|i| format!("t{}", i)).collect();
        let mut def = make_definition(&[], &[]);
        for id in &ids {
            def.add_node(id.as_str(), "true", &RawParams::new(), None).unwrap();
        }
        for pair in ids.windows(2) {
            def.add_dependency(&pair[0], &pair[1]).unwrap();
        }
        (def, ids)
    }

    #[test]
    fn test_long_chain_validates() {
        let (def, _) = chain(100_000);
        let report = def.validate().unwrap();

        assert_eq!(report.order.len(), 100_000);
        assert_eq!(report.order[0], "t0");
        assert_eq!(report.order[99_999], "t99999");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_long_ring_reports_cycle() {
        let (mut def, ids) = chain(100_000);
        def.add_dependency(&ids[99_999], &ids[0]).unwrap();

        let path = TaskGraph::build(&def).find_cycle().unwrap();
        assert_eq!(path.len(), 100_001);
        assert_is_cycle(&def, &path);
    }

    #[test]
    fn test_mermaid_output() {
        let def = make_definition(&["a", "b"], &[("a", "b")]);
        let mermaid = TaskGraph::build(&def).to_mermaid();

        assert!(mermaid.starts_with("graph TD\n"));
        assert!(mermaid.contains("a --> b"));
    }

    #[test]
    fn test_dot_output_includes_isolated() {
        let def = make_definition(&["a", "b", "c"], &[("a", "b")]);
        let dot = TaskGraph::build(&def).to_dot("test");

        assert!(dot.starts_with("digraph \"test\" {"));
        assert!(dot.contains("\"a\" -> \"b\";"));
        assert!(dot.contains("    \"c\";"));
    }
}
