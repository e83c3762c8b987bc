//! `{name}` placeholder rendering for call templates

use std::collections::BTreeMap;

use serde_json::Value;

/// Variables visible to a call template
///
/// Lookup order: pagination variables, credentials, then the payload
/// (dotted names walk into nested payload objects).
#[derive(Debug, Clone, Default)]
pub struct Bindings<'a> {
    vars: BTreeMap<String, String>,
    credentials: Option<&'a BTreeMap<String, String>>,
    payload: Option<&'a Value>,
}

impl<'a> Bindings<'a> {
    pub fn new(credentials: &'a BTreeMap<String, String>, payload: &'a Value) -> Self {
        Self {
            vars: BTreeMap::new(),
            credentials: Some(credentials),
            payload: Some(payload),
        }
    }

    pub fn with_var(mut self, name: &str, value: impl ToString) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_var(&mut self, name: &str, value: impl ToString) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn lookup(&self, name: &str) -> Option<String> {
        if let Some(value) = self.vars.get(name) {
            return Some(value.clone());
        }
        if let Some(value) = self.credentials.and_then(|c| c.get(name)) {
            return Some(value.clone());
        }

        let mut current = self.payload?;
        for segment in name.split('.') {
            current = current.get(segment)?;
        }
        match current {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Renders every placeholder in `template`
///
/// Braces that do not enclose an identifier (JSON bodies, for instance) are
/// copied through untouched. Returns the first unresolved name on failure.
pub fn render(template: &str, bindings: &Bindings<'_>) -> Result<String, String> {
    render_with(template, bindings, str::to_string)
}

/// Renders a JSON body template
///
/// Substituted values are escaped as JSON string content, so a value holding
/// quotes, backslashes or control characters cannot break out of the string
/// literal it is placed in.
pub fn render_json(template: &str, bindings: &Bindings<'_>) -> Result<String, String> {
    render_with(template, bindings, json_escape)
}

fn render_with(
    template: &str,
    bindings: &Bindings<'_>,
    escape: impl Fn(&str) -> String,
) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}').map(|close| &after[..close]) {
            Some(name) if is_placeholder(name) => {
                let value = bindings.lookup(name).ok_or_else(|| name.to_string())?;
                out.push_str(&escape(&value));
                rest = &after[name.len() + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn json_escape(value: &str) -> String {
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

fn is_placeholder(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}
