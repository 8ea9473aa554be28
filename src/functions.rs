//! Functions and filters available inside templates.
//!
//! The `required_*` validators and `sh()` mirror what shell-oriented template
//! tools offer; the rest are small string and data helpers in the spirit of
//! Helm's sprig library. Functions that read the environment take the
//! [`Snapshot`] explicitly and are bound to it by the renderer.

use base64::Engine as _;
use cruet::Inflector;
use indexmap::IndexMap;
use log::debug;
use minijinja::value::{Rest, ValueKind};
use minijinja::{Error, ErrorKind, Value};
use regex::Regex;
use std::path::Path;
use std::process::Command;

use crate::context::Snapshot;

fn invalid(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, msg.into())
}

/// The shape of a template value, as far as emptiness is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Undefined or none
    Absent,
    Boolean(bool),
    Number { zero: bool },
    Text { len: usize },
    Sequence { len: usize },
    Record { len: usize },
    /// Anything else (objects, callables); never empty
    Opaque,
}

impl ValueShape {
    pub fn of(value: &Value) -> Self {
        match value.kind() {
            ValueKind::Undefined | ValueKind::None => Self::Absent,
            ValueKind::Bool => Self::Boolean(value.is_true()),
            ValueKind::Number => Self::Number {
                zero: !value.is_true(),
            },
            ValueKind::String => Self::Text {
                len: value.len().unwrap_or(0),
            },
            ValueKind::Bytes => Self::Text {
                len: value.as_bytes().map_or(0, <[u8]>::len),
            },
            ValueKind::Seq => Self::Sequence {
                len: value.len().unwrap_or(0),
            },
            ValueKind::Map => Self::Record {
                len: value.len().unwrap_or(0),
            },
            _ => Self::Opaque,
        }
    }

    pub fn is_empty(&self) -> bool {
        match *self {
            Self::Absent => true,
            Self::Boolean(b) => !b,
            Self::Number { zero } => zero,
            Self::Text { len } | Self::Sequence { len } | Self::Record { len } => len == 0,
            Self::Opaque => false,
        }
    }
}

/// Runs `command` with `sh -c` and returns what it wrote to stdout.
///
/// Stderr is captured and discarded. A non-zero exit is an error.
///
/// Usage: {{ sh("git rev-parse --short HEAD") }}
pub fn sh(command: String) -> Result<String, Error> {
    debug!("Running sh -c {command:?}");
    let output = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .output()
        .map_err(|e| invalid(format!("cannot run sh: {e}")))?;

    if !output.status.success() {
        return Err(invalid(match output.status.code() {
            Some(code) => format!("exit status {code}"),
            None => output.status.to_string(),
        }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Fails unless every name is a defined environment variable. Empty values pass.
///
/// Usage: {{ required_envs("DATABASE_URL", "APP_NAME") }}
pub fn required_envs(snapshot: &Snapshot, names: &[String]) -> Result<String, Error> {
    match names.iter().find(|name| snapshot.lookup_env(name).is_none()) {
        Some(name) => Err(invalid(format!(
            "required environmental variable missing: ${{{name}}}"
        ))),
        None => Ok(String::new()),
    }
}

/// Fails if any value is empty (see [`ValueShape::is_empty`]).
///
/// Usage: {{ required_vals(env.APP_NAME, replicas) }}
pub fn required_vals(values: Rest<Value>) -> Result<String, Error> {
    match values.iter().find(|value| ValueShape::of(value).is_empty()) {
        Some(value) => Err(invalid(format!("required value is empty: {value}"))),
        None => Ok(String::new()),
    }
}

/// Fails unless every path names an existing file that is not a directory.
///
/// Usage: {{ required_files("/etc/app/app.conf") }}
pub fn required_files(paths: Rest<String>) -> Result<String, Error> {
    for path in paths.iter() {
        let metadata = std::fs::metadata(Path::new(path))
            .map_err(|_| invalid(format!("required file missing: {path}")))?;
        if metadata.is_dir() {
            return Err(invalid(format!(
                "required file missing: {path:?} is a directory"
            )));
        }
    }
    Ok(String::new())
}

/// Reads an environment variable from the snapshot, with an optional default
/// for unset variables.
///
/// Usage: {{ getenv("HOME") }}, {{ getenv("PORT", "8080") }}
pub fn getenv(snapshot: &Snapshot, name: &str, default: Option<String>) -> String {
    match snapshot.lookup_env(name) {
        Some(value) => value.to_string(),
        None => default.unwrap_or_default(),
    }
}

/// Fail with a custom error message
///
/// Usage: {{ fail("Something went wrong") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(invalid(message))
}

/// Create a dict from key-value pairs, keeping their order
///
/// Usage: {{ dict("key1", value1, "key2", value2) }}
pub fn dict(args: Rest<Value>) -> Result<Value, Error> {
    if args.len() % 2 != 0 {
        return Err(invalid(
            "dict requires an even number of arguments (key-value pairs)",
        ));
    }

    let mut map = IndexMap::new();
    for pair in args.chunks(2) {
        let key = pair[0]
            .as_str()
            .ok_or_else(|| invalid("dict keys must be strings"))?;
        map.insert(key.to_string(), pair[1].clone());
    }
    Ok(Value::from_iter(map))
}

/// Usage: {{ list("a", "b", "c") }}
pub fn list(args: Rest<Value>) -> Value {
    Value::from(args.0)
}

/// Return the first non-empty value
///
/// Usage: {{ coalesce(env.PORT, "8080") }}
pub fn coalesce(args: Rest<Value>) -> Value {
    args.iter()
        .find(|arg| !ValueShape::of(arg).is_empty())
        .cloned()
        .unwrap_or(Value::UNDEFINED)
}

/// Usage: {{ ternary("yes", "no", debug) }}
pub fn ternary(true_val: Value, false_val: Value, condition: Value) -> Value {
    if condition.is_true() {
        true_val
    } else {
        false_val
    }
}

/// Usage: {% if values | empty %}
pub fn empty(value: Value) -> bool {
    ValueShape::of(&value).is_empty()
}

/// Usage: {{ secret | b64encode }}
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Usage: {{ encoded | b64decode }}
pub fn b64decode(value: String) -> Result<String, Error> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| invalid(format!("base64 decode error: {e}")))?;

    String::from_utf8(decoded).map_err(|e| invalid(format!("UTF-8 decode error: {e}")))
}

fn display(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Quote a string with double quotes
///
/// Usage: {{ name | quote }}
pub fn quote(value: Value) -> String {
    let s = display(&value);
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote a string with single quotes
///
/// Usage: {{ name | squote }}
pub fn squote(value: Value) -> String {
    format!("'{}'", display(&value).replace('\'', "''"))
}

/// Indent every non-empty line and prefix the result with a newline
///
/// Usage: {{ content | nindent(4) }}
pub fn nindent(value: String, spaces: usize) -> String {
    let indent = " ".repeat(spaces);
    let mut result = String::with_capacity(1 + value.len() + spaces * value.lines().count());
    result.push('\n');

    for (i, line) in value.lines().enumerate() {
        if i > 0 {
            result.push('\n');
        }
        if !line.is_empty() {
            result.push_str(&indent);
            result.push_str(line);
        }
    }
    if value.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Truncate a string to at most `length` characters
///
/// Usage: {{ name | trunc(63) }}
pub fn trunc(value: String, length: usize) -> String {
    value.chars().take(length).collect()
}

/// Usage: {{ version | trimprefix("v") }}
pub fn trimprefix(value: String, prefix: String) -> String {
    match value.strip_prefix(prefix.as_str()) {
        Some(rest) => rest.to_string(),
        None => value,
    }
}

/// Usage: {{ file | trimsuffix(".yaml") }}
pub fn trimsuffix(value: String, suffix: String) -> String {
    match value.strip_suffix(suffix.as_str()) {
        Some(rest) => rest.to_string(),
        None => value,
    }
}

/// Usage: {{ name | snakecase }}
pub fn snakecase(value: String) -> String {
    value.to_snake_case()
}

/// Usage: {{ name | kebabcase }}
pub fn kebabcase(value: String) -> String {
    value.to_kebab_case()
}

/// Usage: {{ name | camelcase }}
pub fn camelcase(value: String) -> String {
    value.to_camel_case()
}

/// SHA256 hash of a string, hex encoded
///
/// Usage: {{ value | sha256 }}
pub fn sha256sum(value: String) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Convert a value to YAML, without the document marker or trailing newline
///
/// Usage: {{ env | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let json: serde_json::Value =
        serde_json::to_value(&value).map_err(|e| invalid(e.to_string()))?;
    let yaml = serde_yaml::to_string(&json).map_err(|e| invalid(e.to_string()))?;

    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

fn compile(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|e| invalid(format!("invalid regex {pattern:?}: {e}")))
}

/// Usage: {% if env.TAG | regex_match("^v[0-9]+") %}
pub fn regex_match(value: String, pattern: String) -> Result<bool, Error> {
    Ok(compile(&pattern)?.is_match(&value))
}

/// Usage: {{ env.BRANCH | regex_replace("[^a-z0-9]+", "-") }}
pub fn regex_replace(value: String, pattern: String, replacement: String) -> Result<String, Error> {
    Ok(compile(&pattern)?
        .replace_all(&value, replacement.as_str())
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_shapes() {
        assert_eq!(ValueShape::of(&Value::UNDEFINED), ValueShape::Absent);
        assert_eq!(ValueShape::of(&Value::from(())), ValueShape::Absent);
        assert_eq!(ValueShape::of(&Value::from(false)), ValueShape::Boolean(false));
        assert_eq!(
            ValueShape::of(&Value::from(0.0)),
            ValueShape::Number { zero: true }
        );
        assert_eq!(ValueShape::of(&Value::from("hi")), ValueShape::Text { len: 2 });
        assert_eq!(
            ValueShape::of(&Value::from(vec![1, 2, 3])),
            ValueShape::Sequence { len: 3 }
        );
    }

    #[test]
    fn test_empty() {
        assert!(empty(Value::UNDEFINED));
        assert!(empty(Value::from("")));
        assert!(empty(Value::from(0)));
        assert!(empty(Value::from(false)));
        assert!(empty(Value::from_serialize(Vec::<i32>::new())));
        assert!(empty(Value::from_serialize(serde_json::json!({}))));
        assert!(!empty(Value::from("test")));
        assert!(!empty(Value::from(-1)));
        assert!(!empty(Value::from(true)));
        assert!(!empty(Value::from_serialize(serde_json::json!({"Thing": 1}))));
    }

    #[test]
    fn test_b64_roundtrip() {
        let encoded = b64encode("hello world".to_string());
        assert_eq!(encoded, "aGVsbG8gd29ybGQ=");
        assert_eq!(b64decode(encoded).unwrap(), "hello world");
        assert!(b64decode("not base64!".to_string()).is_err());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(Value::from("a \"b\"")), "\"a \\\"b\\\"\"");
        assert_eq!(squote(Value::from("it's")), "'it''s'");
        assert_eq!(quote(Value::from(42)), "\"42\"");
    }

    #[test]
    fn test_nindent() {
        assert_eq!(nindent("line1\n\nline2".to_string(), 2), "\n  line1\n\n  line2");
        assert_eq!(nindent(String::new(), 2), "\n");
        assert_eq!(nindent("a\n".to_string(), 2), "\n  a\n");
        assert_eq!(nindent("a\nb\n".to_string(), 1), "\n a\n b\n");
    }

    #[test]
    fn test_string_helpers() {
        assert_eq!(trunc("hello".to_string(), 3), "hel");
        assert_eq!(trunc("hi".to_string(), 10), "hi");
        assert_eq!(trimprefix("v1.2.3".to_string(), "v".to_string()), "1.2.3");
        assert_eq!(trimsuffix("a.yaml".to_string(), ".yaml".to_string()), "a");
        assert_eq!(trimsuffix("a.yaml".to_string(), ".json".to_string()), "a.yaml");
        assert_eq!(snakecase("camelCase".to_string()), "camel_case");
        assert_eq!(kebabcase("camelCase".to_string()), "camel-case");
        assert_eq!(camelcase("snake_case".to_string()), "snakeCase");
    }

    #[test]
    fn test_sha256sum() {
        assert_eq!(
            sha256sum("abc".to_string()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_regex_helpers() {
        assert!(regex_match("v12".to_string(), "^v[0-9]+$".to_string()).unwrap());
        assert_eq!(
            regex_replace("Feature/ABC_1".to_string(), "[^A-Za-z0-9]+".to_string(), "-".to_string())
                .unwrap(),
            "Feature-ABC-1"
        );
        assert!(regex_match("x".to_string(), "(".to_string()).is_err());
    }

    #[test]
    fn test_coalesce_and_ternary() {
        let picked = coalesce(Rest(vec![Value::UNDEFINED, Value::from(""), Value::from("x")]));
        assert_eq!(picked.as_str(), Some("x"));
        assert!(coalesce(Rest(vec![])).is_undefined());
        assert_eq!(
            ternary(Value::from("a"), Value::from("b"), Value::from(false)).as_str(),
            Some("b")
        );
    }

    #[test]
    fn test_dict_keeps_order() {
        let value = dict(Rest(vec![
            Value::from("b"),
            Value::from(1),
            Value::from("a"),
            Value::from(2),
        ]))
        .unwrap();
        let keys: Vec<String> = value
            .try_iter()
            .unwrap()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, ["b", "a"]);
        assert!(dict(Rest(vec![Value::from("odd")])).is_err());
    }
}
