//! System prompts for the generation tasks

use serde_json::Value;

pub const CALL_REPAIR: &str = "You fix HTTP API call configurations. \
You receive the current request configuration, the instruction it should satisfy, \
and the error the API returned. Answer with a single JSON object containing only the \
request fields to change: any of \"url_host\", \"url_path\", \"method\", \"headers\", \
\"query_params\", \"body\" and \"data_path\". Keep {placeholder} variables where the \
request needs caller-supplied values.";

pub const EXTRACT: &str = "You write JSONPath selectors (RFC 9535). \
You receive a JSON document and a target JSON Schema. Answer with a single JSON object \
{\"selector\": \"<jsonpath>\"} whose selection from the document matches the schema. \
Selections that yield one node return that node; several nodes are returned as an array.";

pub const TRANSFORM: &str = "You write Lua 5.4 mapping expressions. \
The source data is bound to the global `input`. The expression is either a single Lua \
expression or a chunk ending in `return`, and must evaluate to a value matching the \
target JSON Schema. Only the `table`, `string` and `math` libraries are available, \
together with these helpers:\n{modules}\n\
Answer with a single JSON object {\"expression\": \"<lua>\"}.";

pub const SCHEMA: &str = "You generate JSON Schemas (draft 2020-12: type, properties, \
required, items, enum, pattern, oneOf, $ref). You receive an instruction describing the desired output and \
optionally sample data. Answer with a single JSON object {\"jsonSchema\": <schema>} \
describing the output the instruction asks for.";

/// Transform prompt with the helper module descriptions inlined
pub fn transform(modules: &str) -> String {
    TRANSFORM.replace("{modules}", modules)
}

/// Cuts arrays down to `max_items` entries, recursively
///
/// Keeps prompts small for large API responses while preserving shape.
pub fn sample(value: &Value, max_items: usize) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .take(max_items)
                .map(|item| sample(item, max_items))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), sample(v, max_items)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sample_truncates_nested_arrays() {
        let value = json!({"items": [1, 2, 3, 4], "nested": {"rows": [[1, 2, 3]]}});
        assert_eq!(
            sample(&value, 2),
            json!({"items": [1, 2], "nested": {"rows": [[1, 2]]}})
        );
    }

    #[test]
    fn test_transform_prompt_lists_modules() {
        let prompt = transform("util.round(x, digits)");
        assert!(prompt.contains("util.round(x, digits)"));
        assert!(!prompt.contains("{modules}"));
    }
}
