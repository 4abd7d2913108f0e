//! CWL descriptor metadata.

use serde_json::{Map, Value};

use manifold_core::document::{get_str, parse_mapping};
use manifold_core::metadata::{Author, DescriptorMetadata};
use manifold_core::ManifoldResult;

use super::graph::main_process;

pub(crate) fn extract(content: &str) -> ManifoldResult<DescriptorMetadata> {
    let doc = parse_mapping("<primary>", content)?;
    let process = main_process(&doc);

    let mut meta = DescriptorMetadata {
        description: description(&process),
        language_version: get_str(&doc, "cwlVersion").map(str::to_string),
        ..Default::default()
    };

    if let Some(a) = first_entry(process.get("s:author").or_else(|| doc.get("s:author"))) {
        meta.push_author(Author::new(text(a, "s:name"), text(a, "s:email")));
    } else if let Some(c) = first_entry(process.get("dct:creator").or_else(|| doc.get("dct:creator"))) {
        meta.push_author(Author::new(text(c, "foaf:name"), text(c, "foaf:mbox")));
    }
    Ok(meta)
}

/// First non-empty of `doc`, `description` and `label`.
fn description(process: &Map<String, Value>) -> Option<String> {
    let doc = match process.get("doc") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(lines)) => Some(
            lines
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    };
    doc.into_iter()
        .chain(get_str(process, "description").map(str::to_string))
        .chain(get_str(process, "label").map(str::to_string))
        .find(|s| !s.trim().is_empty())
}

fn first_entry(v: Option<&Value>) -> Option<&Map<String, Value>> {
    match v? {
        Value::Array(items) => items.first().and_then(Value::as_object),
        Value::Object(m) => Some(m),
        _ => None,
    }
}

fn text(m: &Map<String, Value>, key: &str) -> Option<String> {
    get_str(m, key).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_org_author_and_doc() {
        let meta = extract(
            r#"
cwlVersion: v1.0
class: CommandLineTool
doc:
  - first line
  - second line
label: ignored
s:author:
  - class: s:Person
    s:name: Ada Lovelace
    s:email: mailto:ada@example.org
  - class: s:Person
    s:name: Second
"#,
        )
        .unwrap();
        assert_eq!(meta.description.as_deref(), Some("first line\nsecond line"));
        assert_eq!(meta.language_version.as_deref(), Some("v1.0"));
        assert_eq!(meta.authors.len(), 1);
        assert_eq!(meta.authors[0].email.as_deref(), Some("ada@example.org"));
    }

    #[test]
    fn dublin_core_creator_and_label_fallback() {
        let meta = extract(
            "cwlVersion: v1.2\nclass: Workflow\ndoc: ''\nlabel: Short label\ndct:creator:\n  foaf:name: Grace\n  foaf:mbox: mailto:grace@example.org\n",
        )
        .unwrap();
        assert_eq!(meta.description.as_deref(), Some("Short label"));
        assert_eq!(meta.authors[0].name.as_deref(), Some("Grace"));
        assert_eq!(meta.authors[0].email.as_deref(), Some("grace@example.org"));
    }
}
