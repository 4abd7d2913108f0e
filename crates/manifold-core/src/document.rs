//! Descriptor documents.
//!
//! Descriptor text (YAML or JSON) is parsed into a `serde_json::Value`, which
//! is the tagged tree every resolver walks: `Object` for maps, `Array` for
//! sequences and the remaining variants as scalars. Key order is preserved so
//! expanded documents keep the author's layout.
//!
//! Rules:
//! - text whose first non-blank character is `{` is parsed as JSON
//! - everything else is parsed as YAML and converted node by node
//! - non-string YAML keys are rendered to their YAML scalar text

use serde_json::{Map, Value};

use crate::errors::{ManifoldError, ManifoldResult};

/// True when the text looks like a JSON object.
pub fn is_json_object(text: &str) -> bool {
    text.trim_start().starts_with('{')
}

/// Parse descriptor text into a document tree.
pub fn parse_document(path: &str, text: &str) -> ManifoldResult<Value> {
    if is_json_object(text) {
        return serde_json::from_str(text)
            .map_err(|e| ManifoldError::malformed(path, format!("invalid json: {e}")));
    }

    let y: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| ManifoldError::malformed(path, format!("invalid yaml: {e}")))?;
    yaml_to_json(&y).map_err(|message| ManifoldError::malformed(path, message))
}

/// Parse descriptor text that must be a mapping at the root.
pub fn parse_mapping(path: &str, text: &str) -> ManifoldResult<Map<String, Value>> {
    match parse_document(path, text)? {
        Value::Object(map) => Ok(map),
        other => Err(ManifoldError::malformed(
            path,
            format!("expected a mapping at the document root, found {}", kind_name(&other)),
        )),
    }
}

/// Render a document back to YAML.
pub fn to_yaml_string(v: &Value) -> ManifoldResult<String> {
    serde_yaml::to_string(v).map_err(|e| ManifoldError::malformed("<document>", e.to_string()))
}

/// Convert a YAML value into the document tree.
pub fn yaml_to_json(v: &serde_yaml::Value) -> Result<Value, String> {
    match v {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("unrepresentable float in yaml: {f}"))
            } else {
                Err("unknown numeric type in yaml".to_string())
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(map) => {
            let mut obj = Map::with_capacity(map.len());
            for (k, v2) in map {
                obj.insert(yaml_key(k)?, yaml_to_json(v2)?);
            }
            Ok(Value::Object(obj))
        }
        // Local tags such as `!Ref` carry no meaning for reference expansion.
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn yaml_key(k: &serde_yaml::Value) -> Result<String, String> {
    match k {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .map_err(|e| format!("unsupported yaml key: {e}")),
    }
}

/// Short name of a node kind, for messages.
pub fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Object(_) => "a mapping",
        Value::Array(_) => "a sequence",
        Value::String(_) => "a string",
        Value::Number(_) => "a number",
        Value::Bool(_) => "a boolean",
        Value::Null => "nothing",
    }
}

/// Find the first key of `map` whose lowercase form is one of `keys`.
pub fn find_key_ci<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    map.keys()
        .find(|k| keys.contains(&k.to_lowercase().as_str()))
        .map(|k| k.as_str())
}

/// String value under the first matching directive key.
pub fn find_string_ci<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    find_key_ci(map, keys).and_then(|k| map.get(k)).and_then(|v| v.as_str())
}

/// String field accessor.
pub fn get_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(|v| v.as_str())
}

/// Normalize a list-or-idmap field into a list of maps.
///
/// CWL allows `steps`, `inputs`, `hints`, ... to be either a list of maps or a
/// map keyed by an identifying field. In the map form each value must itself be
/// a map and receives `id_key: <key>`.
pub fn list_or_idmap(path: &str, v: Option<&Value>, id_key: &str) -> ManifoldResult<Vec<Value>> {
    match v {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(Value::Object(map)) => {
            let mut out = Vec::with_capacity(map.len());
            for (k, item) in map {
                match item {
                    Value::Object(inner) => {
                        let mut m = inner.clone();
                        m.insert(id_key.to_string(), Value::String(k.clone()));
                        out.push(Value::Object(m));
                    }
                    // `hints: {SomeHint: null}` style shortcut
                    Value::Null => {
                        let mut m = Map::new();
                        m.insert(id_key.to_string(), Value::String(k.clone()));
                        out.push(Value::Object(m));
                    }
                    other => {
                        return Err(ManifoldError::malformed(
                            path,
                            format!("entry '{k}' must be a mapping, found {}", kind_name(other)),
                        ))
                    }
                }
            }
            Ok(out)
        }
        Some(other) => Err(ManifoldError::malformed(
            path,
            format!("expected a list or map, found {}", kind_name(other)),
        )),
    }
}
