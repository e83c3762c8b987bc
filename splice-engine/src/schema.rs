//! Schema validation
//!
//! Validates JSON values against JSON Schema (draft 2020-12 unless the schema
//! names another `$schema`) with the `jsonschema` crate, and maps its errors
//! into [`Violation`]s whose pointers address both the value and the schema.
//! Validation never fails; a schema that does not compile is reported as a
//! single violation at the root.

use jsonschema::error::ValidationErrorKind;
use jsonschema::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One schema violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer into the validated value
    pub path: String,
    /// JSON pointer into the schema, ending at the failing keyword
    pub schema_path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }
}

pub fn validate(value: &Value, schema: &Value) -> ValidationResult {
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(e) => {
            let mut violations = Vec::new();
            push(&mut violations, "", "#", format!("invalid schema: {}", e));
            return ValidationResult::from_violations(violations);
        }
    };

    let mut violations = Vec::new();
    for error in validator.iter_errors(value) {
        collect(&error, &mut violations);
    }
    ValidationResult::from_violations(violations)
}

// ============================================================================
// Error mapping
// ============================================================================

/// `required` and `additionalProperties` report the enclosing object; point at
/// the offending property instead so repairs can target it directly.
fn collect(error: &ValidationError<'_>, out: &mut Vec<Violation>) {
    let path = error.instance_path.to_string();
    let schema_path = format!("#{}", error.schema_path);

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            push(
                out,
                &child(&path, &name),
                &schema_path,
                format!("missing required property '{}'", name),
            );
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            for name in unexpected {
                push(
                    out,
                    &child(&path, name),
                    &schema_path,
                    format!("unexpected property '{}'", name),
                );
            }
        }
        _ => push(out, &path, &schema_path, error.to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Schema shape
// ============================================================================

const KNOWN_TYPES: &[&str] = &["object", "array", "string", "number", "integer", "boolean", "null"];

/// Structural check for generated schemas: every (sub)schema is an object,
/// `type` names known types, and nested keywords hold schemas of the right kind.
/// A structurally sound schema must also compile.
pub fn check_schema_shape(schema: &Value) -> ValidationResult {
    let mut violations = Vec::new();
    shape(schema, "#", &mut violations);
    if violations.is_empty() {
        if let Err(e) = jsonschema::validator_for(schema) {
            push(&mut violations, "", "#", format!("invalid schema: {}", e));
        }
    }
    ValidationResult::from_violations(violations)
}

fn shape(schema: &Value, at: &str, out: &mut Vec<Violation>) {
    let rules = match schema {
        Value::Object(rules) => rules,
        Value::Bool(_) => return,
        other => {
            push(out, at, at, format!("schema must be an object, found {}", type_name(other)));
            return;
        }
    };

    match rules.get("type") {
        None => {}
        Some(Value::String(name)) if KNOWN_TYPES.contains(&name.as_str()) => {}
        Some(Value::Array(names))
            if !names.is_empty()
                && names
                    .iter()
                    .all(|n| n.as_str().is_some_and(|n| KNOWN_TYPES.contains(&n))) => {}
        Some(other) => push(
            out,
            &format!("{}/type", at),
            &format!("{}/type", at),
            format!("unknown type {}", other),
        ),
    }

    match rules.get("properties") {
        None => {}
        Some(Value::Object(properties)) => {
            for (name, sub) in properties {
                shape(sub, &format!("{}/properties/{}", at, escape(name)), out);
            }
        }
        Some(_) => push(
            out,
            &format!("{}/properties", at),
            &format!("{}/properties", at),
            "properties must be an object",
        ),
    }

    match rules.get("required") {
        None => {}
        Some(Value::Array(names)) if names.iter().all(Value::is_string) => {}
        Some(_) => push(
            out,
            &format!("{}/required", at),
            &format!("{}/required", at),
            "required must be a list of property names",
        ),
    }

    if let Some(items) = rules.get("items") {
        shape(items, &format!("{}/items", at), out);
    }
    if let Some(additional @ Value::Object(_)) = rules.get("additionalProperties") {
        shape(additional, &format!("{}/additionalProperties", at), out);
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn push(out: &mut Vec<Violation>, path: &str, schema_path: &str, message: impl Into<String>) {
    out.push(Violation {
        path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        schema_path: schema_path.to_string(),
        message: message.into(),
    });
}

fn child(path: &str, segment: &str) -> String {
    format!("{}/{}", path, escape(segment))
}

/// JSON pointer escaping
fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "tempC": { "type": "number" },
                "city": { "type": "string" },
                "readings": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "at": { "type": "integer" } },
                        "required": ["at"]
                    }
                }
            },
            "required": ["tempC"]
        })
    }

    /// Resolves a `#/...` schema pointer against `schema`
    fn resolve<'a>(schema: &'a Value, schema_path: &str) -> Option<&'a Value> {
        schema.pointer(schema_path.trim_start_matches('#'))
    }

    #[test]
    fn test_valid_value() {
        let value = json!({"tempC": 22.2, "city": "Paris", "readings": [{"at": 1}]});
        let result = validate(&value, &weather_schema());
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_missing_required() {
        let result = validate(&json!({"city": "Paris"}), &weather_schema());
        assert!(!result.valid);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].path, "/tempC");
        assert_eq!(result.violations[0].schema_path, "#/required");
        assert!(resolve(&weather_schema(), &result.violations[0].schema_path).is_some());
    }

    #[test]
    fn test_nested_missing_required_points_at_property() {
        let value = json!({"tempC": 1, "readings": [{"at": 1}, {}]});
        let result = validate(&value, &weather_schema());
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].path, "/readings/1/at");
        assert_eq!(result.violations[0].schema_path, "#/properties/readings/items/required");
    }

    #[test]
    fn test_nested_type_mismatch() {
        let value = json!({"tempC": 1, "readings": [{"at": 1}, {"at": "noon"}]});
        let result = validate(&value, &weather_schema());
        assert!(!result.valid);
        assert_eq!(result.violations[0].path, "/readings/1/at");
        assert!(result.violations[0].message.contains("integer"));
    }

    #[test]
    fn test_violations_reference_schema_locations() {
        let schema = weather_schema();
        let value = json!({"tempC": "hot", "readings": [{}], "city": 3});
        let result = validate(&value, &schema);

        assert_eq!(result.violations.len(), 3);
        for violation in &result.violations {
            assert!(
                resolve(&schema, &violation.schema_path).is_some(),
                "dangling schema path {}",
                violation.schema_path
            );
        }
    }

    #[test]
    fn test_root_type_mismatch() {
        let result = validate(&json!([1, 2]), &weather_schema());
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].path, "/");
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        assert!(validate(&json!(3.0), &json!({"type": "integer"})).valid);
        assert!(!validate(&json!(3.5), &json!({"type": "integer"})).valid);
        assert!(validate(&json!(3), &json!({"type": "number"})).valid);
    }

    #[test]
    fn test_type_list_and_null() {
        let schema = json!({"type": ["string", "null"]});
        assert!(validate(&Value::Null, &schema).valid);
        assert!(validate(&json!("x"), &schema).valid);
        assert!(!validate(&json!(1), &schema).valid);
    }

    #[test]
    fn test_additional_properties_false() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "number"}},
            "additionalProperties": false
        });
        let result = validate(&json!({"a": 1, "b": 2}), &schema);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].path, "/b");
        assert_eq!(result.violations[0].schema_path, "#/additionalProperties");

        let result = validate(&json!({"a": 1, "b": 2, "c": 3}), &schema);
        let mut paths: Vec<&str> = result.violations.iter().map(|v| v.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["/b", "/c"]);
    }

    #[test]
    fn test_enum_and_bounds() {
        let schema = json!({
            "type": "object",
            "properties": {
                "unit": {"enum": ["C", "F"]},
                "temp": {"type": "number", "minimum": -90, "maximum": 60},
                "tags": {"type": "array", "minItems": 1}
            }
        });
        let result = validate(&json!({"unit": "K", "temp": 99, "tags": []}), &schema);
        let mut paths: Vec<&str> = result.violations.iter().map(|v| v.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["/tags", "/temp", "/unit"]);
    }

    #[test]
    fn test_any_of() {
        let schema = json!({"anyOf": [{"type": "string"}, {"type": "number"}]});
        assert!(validate(&json!(1), &schema).valid);
        assert!(!validate(&json!(true), &schema).valid);
    }

    #[test]
    fn test_pattern() {
        let schema = json!({"type": "string", "pattern": "^[A-Z]{3}$"});
        assert!(validate(&json!("EUR"), &schema).valid);

        let result = validate(&json!("euro"), &schema);
        assert!(!result.valid);
        assert_eq!(result.violations[0].schema_path, "#/pattern");
    }

    #[test]
    fn test_one_of_rejects_ambiguous_match() {
        let schema = json!({"oneOf": [{"type": "integer"}, {"type": "number", "minimum": 0}]});
        assert!(validate(&json!(-1), &schema).valid);
        assert!(validate(&json!(0.5), &schema).valid);
        // Matches both branches
        assert!(!validate(&json!(3), &schema).valid);
        assert!(!validate(&json!("3"), &schema).valid);
    }

    #[test]
    fn test_all_of() {
        let schema = json!({
            "allOf": [
                {"type": "object", "required": ["id"]},
                {"properties": {"id": {"type": "string"}}}
            ]
        });
        assert!(validate(&json!({"id": "a1"}), &schema).valid);

        let result = validate(&json!({}), &schema);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].path, "/id");

        let result = validate(&json!({"id": 7}), &schema);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].path, "/id");
    }

    #[test]
    fn test_local_ref() {
        let schema = json!({
            "$defs": {
                "reading": {
                    "type": "object",
                    "properties": {"at": {"type": "integer"}},
                    "required": ["at"]
                }
            },
            "type": "array",
            "items": {"$ref": "#/$defs/reading"}
        });
        assert!(validate(&json!([{"at": 1}, {"at": 2}]), &schema).valid);

        let result = validate(&json!([{"at": 1}, {"at": "noon"}]), &schema);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].path, "/1/at");
    }

    #[test]
    fn test_uncompilable_schema_is_reported() {
        let result = validate(&json!(1), &json!({"type": 12}));
        assert!(!result.valid);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].path, "/");
        assert_eq!(result.violations[0].schema_path, "#");
        assert!(result.violations[0].message.starts_with("invalid schema"));
    }

    #[test]
    fn test_empty_schema_accepts_anything() {
        assert!(validate(&json!({"x": [1, null]}), &json!({})).valid);
        assert!(!validate(&json!(1), &json!(false)).valid);
    }

    #[test]
    fn test_pointer_escaping() {
        let schema = json!({"type": "object", "properties": {"a/b": {"type": "string"}}});
        let result = validate(&json!({"a/b": 1}), &schema);
        assert_eq!(result.violations[0].path, "/a~1b");
        assert!(resolve(&schema, &result.violations[0].schema_path).is_some());
    }

    #[test]
    fn test_schema_shape() {
        assert!(check_schema_shape(&weather_schema()).valid);

        let broken = json!({
            "type": "obj",
            "properties": {"a": "number"},
            "required": "a"
        });
        let result = check_schema_shape(&broken);
        assert_eq!(result.violations.len(), 3);

        assert!(!check_schema_shape(&json!("object")).valid);

        // Structurally fine but does not compile
        let bad_pattern = json!({"type": "string", "pattern": "(unclosed"});
        let result = check_schema_shape(&bad_pattern);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].schema_path, "#");
    }
}
