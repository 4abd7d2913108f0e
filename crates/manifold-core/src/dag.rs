//! Task dependency graphs.
//!
//! Handlers add one `TaskNode` per task, step or process and declare the
//! dependencies between them. `GraphBuilder::finish` adds the synthetic
//! begin and end nodes:
//! - every task without dependencies depends on the begin node
//! - the end node depends on the declared workflow outputs, or on every leaf
//!
//! The result renders to the cytoscape shape consumed by front ends and to a
//! flat tools table. Dependency cycles are kept as-is.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use itertools::Itertools;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::defaults::{BEGIN_NODE, END_NODE, NODE_PREFIX};
use crate::docker::ImageRef;

pub const TOOL: &str = "tool";
pub const WORKFLOW: &str = "workflow";
pub const EXPRESSION_TOOL: &str = "expressionTool";
pub const OPERATION: &str = "operation";
pub const UNKNOWN: &str = "n/a";
const START: &str = "start";
const END: &str = "end";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskNode {
    /// Node id, always carrying the node prefix.
    pub id: String,
    /// Display name (the id without prefix).
    pub name: String,
    pub node_type: String,
    pub image: ImageRef,
    /// File the task is defined in.
    pub run: Option<String>,
    /// Names (not ids) this task depends on.
    pub depends_on: Vec<String>,
    /// Channels read, for channel-based inference.
    pub inputs: Vec<String>,
    /// Channels written.
    pub outputs: Vec<String>,
}

impl TaskNode {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        let name: String = name.into();
        let name = name.strip_prefix(NODE_PREFIX).map(str::to_string).unwrap_or(name);
        Self {
            id: format!("{NODE_PREFIX}{name}"),
            name,
            node_type: node_type.into(),
            image: ImageRef::Absent,
            run: None,
            depends_on: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = image;
        self
    }

    pub fn with_run(mut self, run: impl Into<String>) -> Self {
        self.run = Some(run.into());
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    fn synthetic(id: &str, node_type: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            node_type: node_type.to_string(),
            image: ImageRef::Absent,
            run: None,
            depends_on: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn is_synthetic(&self) -> bool {
        self.id == BEGIN_NODE || self.id == END_NODE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
}

/// Which tasks feed the end node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndPolicy {
    /// The named tasks (workflow outputs).
    Explicit(Vec<String>),
    /// Every task no other task depends on.
    Leaves,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowGraph {
    pub nodes: Vec<TaskNode>,
    pub edges: Vec<DependencyEdge>,
}

/// One row of the tools table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRow {
    pub id: String,
    pub file: String,
    pub docker: String,
    pub link: String,
    pub specifier: String,
}

#[derive(Debug, Default)]
pub struct GraphBuilder {
    tasks: Vec<TaskNode>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task; a later task with the same name replaces the earlier one
    /// in place.
    pub fn add_task(&mut self, node: TaskNode) -> &mut Self {
        match self.tasks.iter_mut().find(|t| t.name == node.name) {
            Some(existing) => *existing = node,
            None => self.tasks.push(node),
        }
        self
    }

    pub fn add_dependency(&mut self, task: &str, depends_on: &str) -> &mut Self {
        let task = strip_prefix(task);
        if let Some(t) = self.tasks.iter_mut().find(|t| t.name == task) {
            t.depends_on.push(strip_prefix(depends_on).to_string());
        }
        self
    }

    pub fn tasks(&self) -> &[TaskNode] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [TaskNode] {
        &mut self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn finish(self, end: EndPolicy) -> WorkflowGraph {
        let known: HashSet<String> = self.tasks.iter().map(|t| t.name.clone()).collect();
        let mut nodes = self.tasks;

        for t in nodes.iter_mut() {
            let before = t.depends_on.len();
            let own = t.name.clone();
            t.depends_on = std::mem::take(&mut t.depends_on)
                .into_iter()
                .map(|d| strip_prefix(&d).to_string())
                .filter(|d| known.contains(d) && *d != own)
                .unique()
                .collect();
            if t.depends_on.len() != before {
                debug!(task = %t.name, "dropped duplicate or dangling dependencies");
            }
        }

        let depended_on: BTreeSet<&str> = nodes
            .iter()
            .flat_map(|t| t.depends_on.iter().map(String::as_str))
            .collect();
        let end_deps: Vec<String> = match end {
            EndPolicy::Explicit(names) => names
                .iter()
                .map(|n| strip_prefix(n).to_string())
                .filter(|n| known.contains(n))
                .unique()
                .collect(),
            EndPolicy::Leaves => nodes
                .iter()
                .filter(|t| !depended_on.contains(t.name.as_str()))
                .map(|t| t.name.clone())
                .collect(),
        };

        let mut edges = Vec::new();
        for t in &nodes {
            if t.depends_on.is_empty() {
                edges.push(DependencyEdge {
                    source: BEGIN_NODE.to_string(),
                    target: t.id.clone(),
                });
            }
            for d in &t.depends_on {
                edges.push(DependencyEdge {
                    source: format!("{NODE_PREFIX}{d}"),
                    target: t.id.clone(),
                });
            }
        }
        for d in &end_deps {
            edges.push(DependencyEdge {
                source: format!("{NODE_PREFIX}{d}"),
                target: END_NODE.to_string(),
            });
        }

        nodes.push(TaskNode::synthetic(BEGIN_NODE, START));
        let mut end_node = TaskNode::synthetic(END_NODE, END);
        end_node.depends_on = end_deps;
        nodes.push(end_node);

        WorkflowGraph { nodes, edges }
    }
}

fn strip_prefix(s: &str) -> &str {
    s.strip_prefix(NODE_PREFIX).unwrap_or(s)
}

impl WorkflowGraph {
    pub fn task(&self, name: &str) -> Option<&TaskNode> {
        let name = strip_prefix(name);
        self.nodes.iter().find(|n| !n.is_synthetic() && n.name == name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter().filter(|n| !n.is_synthetic())
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges.iter().any(|e| e.source == source && e.target == target)
    }

    /// Task name to image, for tasks that declare one.
    pub fn image_map(&self) -> BTreeMap<String, ImageRef> {
        self.tasks()
            .filter(|t| !t.image.is_absent())
            .map(|t| (t.name.clone(), t.image.clone()))
            .collect()
    }

    /// Cytoscape elements: `{"nodes": [{"data": ...}], "edges": [{"data": ...}]}`.
    pub fn to_cytoscape_json(&self) -> Value {
        let nodes: Vec<Value> = self
            .nodes
            .iter()
            .map(|n| {
                json!({"data": {
                    "id": n.id,
                    "tool": n.image.registry_url().unwrap_or_default(),
                    "name": n.name,
                    "type": n.node_type,
                    "docker": n.image.display().unwrap_or_default(),
                    "run": n.run.clone().unwrap_or_default(),
                }})
            })
            .collect();
        let edges: Vec<Value> = self
            .edges
            .iter()
            .map(|e| json!({"data": {"source": e.source, "target": e.target}}))
            .collect();
        json!({"nodes": nodes, "edges": edges})
    }

    /// Rows for every tool task with a registry link.
    pub fn tools_table(&self) -> Vec<ToolRow> {
        self.tasks()
            .filter(|t| t.node_type == TOOL)
            .filter_map(|t| {
                let docker = t.image.display()?;
                let link = t.image.registry_url()?;
                Some(ToolRow {
                    id: t.name.clone(),
                    file: t.run.clone().unwrap_or_default(),
                    docker: docker.to_string(),
                    link,
                    specifier: t.image.specifier()?.as_str().to_string(),
                })
            })
            .collect()
    }
}

/// Add a dependency from every reader of a channel to every writer of it.
///
/// A task never depends on itself; repeated channels are harmless.
pub fn infer_channel_dependencies(tasks: &mut [TaskNode]) {
    let writers: Vec<(String, Vec<String>)> = tasks
        .iter()
        .map(|t| (t.name.clone(), t.outputs.clone()))
        .collect();

    for t in tasks.iter_mut() {
        let found: Vec<String> = writers
            .iter()
            .filter(|(name, _)| *name != t.name)
            .filter(|(_, outs)| outs.iter().any(|o| t.inputs.contains(o)))
            .map(|(name, _)| name.clone())
            .collect();
        for name in found {
            if !t.depends_on.contains(&name) {
                t.depends_on.push(name);
            }
        }
    }
}
