//! Template filters
//!
//! Helm-flavoured helpers that chart templates lean on when composing
//! container image fields and the manifests around them.

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value};
use sha2::{Digest, Sha256};

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.into())
}

fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    serde_json::to_value(value).map_err(|e| invalid(e.to_string()))
}

fn as_text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Serialize a value as YAML without the document marker or trailing newline
///
/// Usage: {{ values.resources | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let yaml = serde_yaml::to_string(&to_json(&value)?).map_err(|e| invalid(e.to_string()))?;
    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Serialize a value as compact JSON
///
/// Usage: {{ values.annotations | tojson }}
pub fn tojson(value: Value) -> Result<String, Error> {
    serde_json::to_string(&to_json(&value)?).map_err(|e| invalid(e.to_string()))
}

/// Usage: {{ values.password | b64encode }}
#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Usage: {{ encoded | b64decode }}
pub fn b64decode(value: String) -> Result<String, Error> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| invalid(format!("base64 decode error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| invalid(format!("UTF-8 decode error: {}", e)))
}

/// Wrap in double quotes, escaping backslashes and quotes
///
/// Usage: {{ values.image.tag | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    let text = as_text(&value);
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Usage: {{ values.image.tag | squote }}
#[must_use]
pub fn squote(value: Value) -> String {
    format!("'{}'", as_text(&value).replace('\'', "''"))
}

fn indent_lines(value: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indent every non-empty line
///
/// Usage: {{ values.podLabels | toyaml | indent(4) }}
#[must_use]
pub fn indent(value: String, spaces: usize) -> String {
    indent_lines(&value, spaces)
}

/// Like `indent`, preceded by a newline
///
/// Usage: {{ values.podLabels | toyaml | nindent(4) }}
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent_lines(&value, spaces))
}

/// Fail rendering when the value is missing or an empty string
///
/// Usage: {{ values.image.repository | required("image.repository is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    let missing = value.is_undefined()
        || value.is_none()
        || value.as_str().map(str::is_empty).unwrap_or(false);

    if missing {
        Err(invalid(
            message.unwrap_or_else(|| "required value is missing".to_string()),
        ))
    } else {
        Ok(value)
    }
}

/// Usage: {% if values.imagePullSecrets | empty %}
pub fn empty(value: Value) -> bool {
    if value.is_undefined() || value.is_none() {
        return true;
    }
    match value.len() {
        Some(len) => len == 0,
        None => value.as_str().map(str::is_empty).unwrap_or(false),
    }
}

/// Usage: {% if values.image | haskey("digest") %}
pub fn haskey(value: Value, key: String) -> bool {
    value
        .get_attr(&key)
        .map(|v| !v.is_undefined())
        .unwrap_or(false)
}

/// Usage: {{ values.config | sha256 }}
#[must_use]
pub fn sha256sum(value: String) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Keep at most `length` characters
///
/// Usage: {{ release.name | trunc(63) }}
#[must_use]
pub fn trunc(value: String, length: usize) -> String {
    value.chars().take(length).collect()
}

/// Usage: {{ values.image.tag | trimprefix("v") }}
#[must_use]
pub fn trimprefix(value: String, prefix: String) -> String {
    match value.strip_prefix(prefix.as_str()) {
        Some(rest) => rest.to_string(),
        None => value,
    }
}

/// Usage: {{ values.registry | trimsuffix("/") }}
#[must_use]
pub fn trimsuffix(value: String, suffix: String) -> String {
    match value.strip_suffix(suffix.as_str()) {
        Some(rest) => rest.to_string(),
        None => value,
    }
}
