//! Reading context files and `--set` assignments.

use std::path::Path;

use tether_core::Value;
use tether_eval::Context;

/// A `--set id:path=json` write.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Assignment {
    pub context_id: String,
    pub path: String,
    pub value: Value,
}

/// Load a JSON object and turn each top-level key into a context.
pub(crate) fn load_contexts(path: &Path) -> Result<Vec<Context>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("error parsing JSON in '{}': {}", path.display(), e))?;
    match json {
        serde_json::Value::Object(fields) => Ok(fields
            .into_iter()
            .map(|(id, value)| Context::new(id, Value::from(value)))
            .collect()),
        other => Err(format!(
            "context file '{}' must hold a JSON object, found {}",
            path.display(),
            json_kind(&other)
        )),
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Parse `id:path=value`. The value is read as JSON; text that is not valid
/// JSON is taken as a plain string.
pub(crate) fn parse_assignment(text: &str) -> Result<Assignment, String> {
    let (context_id, rest) = text
        .split_once(':')
        .ok_or_else(|| format!("invalid --set '{}': expected id:path=value", text))?;
    let (path, raw) = rest
        .split_once('=')
        .ok_or_else(|| format!("invalid --set '{}': missing '='", text))?;
    if context_id.is_empty() {
        return Err(format!("invalid --set '{}': empty context id", text));
    }
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from(json),
        Err(_) => Value::string(raw),
    };
    Ok(Assignment {
        context_id: context_id.to_string(),
        path: path.to_string(),
        value,
    })
}
