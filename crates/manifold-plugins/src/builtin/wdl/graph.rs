//! WDL call graph.
//!
//! One node per `call` of the primary workflow. The called task is looked up
//! by the last segment of the call target, first in the primary document and
//! then in every other descriptor of the set; its file becomes the node's
//! `run` and its runtime image the node's image. A call that reads
//! `other.output` depends on the call named `other`.
//!
//! Documents without a workflow block (single tools) get one node per task.

use manifold_core::dag::{EndPolicy, GraphBuilder, TaskNode, WorkflowGraph, TOOL};
use manifold_core::docker::ImageRef;
use manifold_core::fileset::{FileType, ResolvedFileSet};
use manifold_core::{ManifoldError, ManifoldResult};

use super::scan::{classify_runtime_image, scan, WdlDocument, WdlTask};

pub(crate) fn build(files: &ResolvedFileSet, root: &str) -> ManifoldResult<WorkflowGraph> {
    let content = files.content(root).ok_or_else(|| ManifoldError::not_found(root))?;
    let primary = scan(content);

    let others: Vec<(String, WdlDocument)> = files
        .iter()
        .filter(|f| f.path != root)
        .filter(|f| matches!(f.file_type, FileType::PrimaryDescriptor | FileType::SecondaryDescriptor))
        .map(|f| (f.path.clone(), scan(&f.content)))
        .collect();

    let mut builder = GraphBuilder::new();
    match &primary.workflow {
        Some(wf) => {
            let names: Vec<&str> = wf.calls.iter().map(|c| c.name.as_str()).collect();
            for call in &wf.calls {
                let task_name = call.target.rsplit('.').next().unwrap_or(&call.target);
                let found = primary
                    .task(task_name)
                    .map(|t| (root, t))
                    .or_else(|| {
                        others
                            .iter()
                            .find_map(|(p, d)| d.task(task_name).map(|t| (p.as_str(), t)))
                    });

                let mut node = TaskNode::new(&call.name, TOOL);
                match found {
                    Some((path, task)) => node = node.with_image(image_of(task)).with_run(path),
                    None => node = node.with_run(root),
                }
                for dep in &call.reads {
                    if dep != &call.name && names.contains(&dep.as_str()) {
                        node = node.depends_on(dep);
                    }
                }
                builder.add_task(node);
            }
        }
        None => {
            for task in &primary.tasks {
                builder.add_task(TaskNode::new(&task.name, TOOL).with_image(image_of(task)).with_run(root));
            }
        }
    }
    Ok(builder.finish(EndPolicy::Leaves))
}

fn image_of(task: &WdlTask) -> ImageRef {
    task.docker.as_deref().map(classify_runtime_image).unwrap_or(ImageRef::Absent)
}
