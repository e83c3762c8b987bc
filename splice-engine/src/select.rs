//! JSONPath selection shared by the call and extract executors

use serde_json::Value;
use serde_json_path::JsonPath;

use crate::error::{EngineError, Result};
use crate::schema::Violation;

/// Applies `selector` to `document`
///
/// A single matching node is returned as-is and several as an array, unless
/// `as_array` forces an array. No match is a validation failure located at
/// the selector.
pub fn select(selector: &str, document: &Value, as_array: bool) -> Result<Value> {
    let path = JsonPath::parse(selector).map_err(|e| {
        EngineError::MalformedOutput(format!("invalid JSONPath '{}': {}", selector, e))
    })?;

    let mut nodes: Vec<Value> = path.query(document).all().into_iter().cloned().collect();

    if as_array {
        return Ok(Value::Array(nodes));
    }

    match nodes.len() {
        0 => Err(EngineError::ValidationFailure(vec![Violation {
            path: selector.to_string(),
            schema_path: "#".to_string(),
            message: format!("selector '{}' matched nothing", selector),
        }])),
        1 => Ok(nodes.remove(0)),
        _ => Ok(Value::Array(nodes)),
    }
}
