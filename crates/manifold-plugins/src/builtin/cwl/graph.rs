//! CWL step graph.
//!
//! The root descriptor is expanded against the resolved file set, then the
//! main process is walked step by step:
//! - dependencies come from `in[].source` of top-level steps
//! - the end node depends on the steps named by `outputs[].outputSource`
//! - `dockerPull` of `DockerRequirement` is inherited from the workflow to the
//!   step to the run process; any requirement beats any hint
//! - subworkflows are walked with ids `parent.child`; their steps only show up
//!   in the tools table
//!
//! A descriptor that is not a workflow is wrapped as a one-step workflow.

use serde_json::{json, Map, Value};

use manifold_core::config::ResolverConfig;
use manifold_core::dag::{
    EndPolicy, GraphBuilder, TaskNode, WorkflowGraph, EXPRESSION_TOOL, OPERATION, TOOL, UNKNOWN,
    WORKFLOW,
};
use manifold_core::docker::ImageRef;
use manifold_core::document::{get_str, kind_name, list_or_idmap};
use manifold_core::fileset::ResolvedFileSet;
use manifold_core::preprocess::Preprocessor;
use manifold_core::{ManifoldError, ManifoldResult};

pub const VERSION_PREFIX: &str = "v1";
const NO_VERSION: &str = "CWL descriptor should contain a cwlVersion";
const BAD_RUN: &str = "Syntax incorrect. Run command should specify a file name or process: ";

/// Graph of the top-level steps plus every step at any depth.
pub(crate) struct CwlSteps {
    top: GraphBuilder,
    all: GraphBuilder,
    end: Vec<String>,
}

impl CwlSteps {
    pub fn graph(self) -> WorkflowGraph {
        self.top.finish(EndPolicy::Explicit(self.end))
    }

    pub fn all_steps(self) -> WorkflowGraph {
        self.all.finish(EndPolicy::Leaves)
    }
}

pub(crate) fn walk(files: &ResolvedFileSet, root: &str, config: &ResolverConfig) -> ManifoldResult<CwlSteps> {
    let mut pp = Preprocessor::new(files, config);
    let doc = match pp.expand(root)? {
        Value::Object(map) => map,
        _ => return Err(ManifoldError::malformed(root, "CWL file is malformed")),
    };

    match doc.get("cwlVersion") {
        None => return Err(ManifoldError::malformed(root, NO_VERSION)),
        Some(v) => {
            let v = scalar_text(v);
            if !v.starts_with(VERSION_PREFIX) {
                return Err(ManifoldError::malformed(
                    root,
                    format!("{NO_VERSION} starting with {VERSION_PREFIX}, detected version {v}"),
                ));
            }
        }
    }

    let packed: Vec<Value> = match doc.get("$graph") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let main = main_process(&doc);
    let workflow = if get_str(&main, "class") == Some("Workflow") {
        main
    } else {
        wrap_as_workflow(main)
    };

    let mut w = Walker {
        path: root,
        hint_class: &config.preprocess.metadata_hint_class,
        packed: &packed,
        top: GraphBuilder::new(),
        all: GraphBuilder::new(),
    };
    w.workflow(&workflow, None, &DockerState::default(), 0)?;

    let end = lenient_entries(workflow.get("outputs"))
        .into_iter()
        .flat_map(|o| o.get("outputSource").map(strings).unwrap_or_default())
        .filter_map(|s| step_of_source(&s))
        .collect();

    Ok(CwlSteps {
        top: w.top,
        all: w.all,
        end,
    })
}

/// Process named `#main` (or `main`) of a packed document, else its first
/// process, else the document itself.
pub(crate) fn main_process(doc: &Map<String, Value>) -> Map<String, Value> {
    let Some(Value::Array(processes)) = doc.get("$graph") else {
        return doc.clone();
    };
    let is_main = |p: &&Value| matches!(p.get("id").and_then(Value::as_str), Some("#main" | "main"));
    processes
        .iter()
        .find(is_main)
        .or_else(|| processes.first())
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(|| doc.clone())
}

fn wrap_as_workflow(tool: Map<String, Value>) -> Map<String, Value> {
    let mut step = Map::new();
    step.insert("run".to_string(), Value::Object(tool));
    step.insert("in".to_string(), json!([]));
    step.insert("out".to_string(), json!([]));
    let mut steps = Map::new();
    steps.insert("tool".to_string(), Value::Object(step));

    let mut wrapped = Map::new();
    wrapped.insert("cwlVersion".to_string(), json!("v1.2"));
    wrapped.insert("id".to_string(), json!("_dockstore_wrapper"));
    wrapped.insert("class".to_string(), json!("Workflow"));
    wrapped.insert("inputs".to_string(), json!({}));
    wrapped.insert("outputs".to_string(), json!({}));
    wrapped.insert("steps".to_string(), Value::Object(steps));
    wrapped
}

/// Inherited `dockerPull` values, kept apart for requirements and hints.
#[derive(Debug, Clone, Default)]
struct DockerState {
    requirement: Option<String>,
    hint: Option<String>,
}

impl DockerState {
    fn with(&self, path: &str, process: &Map<String, Value>) -> ManifoldResult<Self> {
        Ok(Self {
            requirement: docker_pull(path, process.get("requirements"))?.or_else(|| self.requirement.clone()),
            hint: docker_pull(path, process.get("hints"))?.or_else(|| self.hint.clone()),
        })
    }

    fn pull(&self) -> Option<&str> {
        self.requirement.as_deref().or(self.hint.as_deref())
    }
}

fn docker_pull(path: &str, entries: Option<&Value>) -> ManifoldResult<Option<String>> {
    Ok(list_or_idmap(path, entries, "class")?
        .iter()
        .filter(|e| e.get("class").and_then(Value::as_str) == Some("DockerRequirement"))
        .filter_map(|e| e.get("dockerPull").and_then(Value::as_str))
        .last()
        .map(str::to_string))
}

struct Walker<'a> {
    path: &'a str,
    hint_class: &'a str,
    packed: &'a [Value],
    top: GraphBuilder,
    all: GraphBuilder,
}

impl Walker<'_> {
    fn workflow(
        &mut self,
        wf: &Map<String, Value>,
        parent: Option<&str>,
        inherited: &DockerState,
        depth: usize,
    ) -> ManifoldResult<()> {
        let state = inherited.with(self.path, wf)?;

        for step in list_or_idmap(self.path, wf.get("steps"), "id")? {
            let step = match step {
                Value::Object(m) => m,
                other => {
                    return Err(ManifoldError::malformed(
                        self.path,
                        format!("workflow step must be a mapping, found {}", kind_name(&other)),
                    ))
                }
            };
            let id = step
                .get("id")
                .map(scalar_text)
                .map(|s| short_id(&s))
                .ok_or_else(|| ManifoldError::malformed(self.path, "workflow step without an id"))?;
            let full = match parent {
                Some(p) => format!("{p}.{id}"),
                None => id,
            };
            let step_state = state.with(self.path, &step)?;

            let (node_type, docker, run_path) = match self.run_of(&step) {
                Some(Value::Object(process)) => {
                    let class = get_str(&process, "class");
                    let run_state = step_state.with(self.path, &process)?;
                    let run_path = self.hint_path(&process)?;
                    if class == Some("Workflow") {
                        self.workflow(&process, Some(full.as_str()), &step_state, depth + 1)?;
                    }
                    (process_type(class), run_state.pull().map(str::to_string), run_path)
                }
                Some(Value::String(s)) => (UNKNOWN, step_state.pull().map(str::to_string), Some(s)),
                _ => {
                    return Err(ManifoldError::malformed(
                        self.path,
                        format!("{BAD_RUN}in workflow step {full}"),
                    ))
                }
            };

            let image = match docker {
                Some(d) if (node_type == WORKFLOW || node_type == TOOL) && !d.trim().is_empty() => {
                    ImageRef::classify(&d)
                }
                _ => ImageRef::Absent,
            };
            let mut node = TaskNode::new(full, node_type).with_image(image);
            if let Some(r) = run_path {
                node = node.with_run(r);
            }

            if depth == 0 {
                let mut top = node.clone();
                top.depends_on = in_sources(&step).iter().filter_map(|s| step_of_source(s)).collect();
                self.top.add_task(top);
            }
            self.all.add_task(node);
        }
        Ok(())
    }

    /// The step's run target, with `#id` references into a packed document
    /// replaced by the process they name.
    fn run_of(&self, step: &Map<String, Value>) -> Option<Value> {
        match step.get("run")? {
            Value::String(s) if s.starts_with('#') => {
                let bare = s.trim_start_matches('#');
                self.packed
                    .iter()
                    .find(|p| {
                        p.get("id")
                            .and_then(Value::as_str)
                            .is_some_and(|id| id.trim_start_matches('#') == bare)
                    })
                    .cloned()
                    .or_else(|| Some(Value::String(s.clone())))
            }
            other => Some(other.clone()),
        }
    }

    /// File the process was loaded from, as recorded by the preprocessor.
    fn hint_path(&self, process: &Map<String, Value>) -> ManifoldResult<Option<String>> {
        Ok(list_or_idmap(self.path, process.get("hints"), "class")?
            .iter()
            .find(|h| h.get("class").and_then(Value::as_str) == Some(self.hint_class))
            .and_then(|h| h.get("path").and_then(Value::as_str))
            .map(|p| format!("/{p}")))
    }
}

fn process_type(class: Option<&str>) -> &'static str {
    match class {
        Some("Workflow") => WORKFLOW,
        Some("CommandLineTool") => TOOL,
        Some("ExpressionTool") => EXPRESSION_TOOL,
        Some("Operation") => OPERATION,
        _ => UNKNOWN,
    }
}

/// Last `/` segment of a step id, without the leading `#`.
fn short_id(id: &str) -> String {
    id.rsplit('/').next().unwrap_or(id).trim_start_matches('#').to_string()
}

/// Step named by a `source` / `outputSource` reference.
///
/// `step/out` and `#main/step/out` name `step`; a bare input name names none.
fn step_of_source(source: &str) -> Option<String> {
    let parts: Vec<&str> = source.split('/').collect();
    if parts.len() < 2 {
        return None;
    }
    Some(parts[parts.len() - 2].replacen('#', "", 1))
}

fn in_sources(step: &Map<String, Value>) -> Vec<String> {
    match step.get("in") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.get("source"))
            .flat_map(strings)
            .collect(),
        Some(Value::Object(by_id)) => by_id
            .values()
            .flat_map(|v| match v {
                Value::Object(m) => m.get("source").map(strings).unwrap_or_default(),
                other => strings(other),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Maps of a list-or-idmap field, skipping shorthand scalar entries.
fn lenient_entries(v: Option<&Value>) -> Vec<&Map<String, Value>> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(Value::Object(by_id)) => by_id.values().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

fn strings(v: &Value) -> Vec<String> {
    match v {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
