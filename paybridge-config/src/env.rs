// Environment variable loading

use serde_json::{Map, Value};
use std::env;

/// Separator between nested keys in a variable name.
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader.
///
/// `PAYBRIDGE_GATEWAY__OPTIONS__API_KEY=sk_x` becomes
/// `{"gateway": {"options": {"api_key": "sk_x"}}}`.
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Load from the process environment
    pub fn load(&self) -> Value {
        self.load_from(env::vars())
    }

    /// Load from an explicit set of variables
    pub fn load_from<I, K, V>(&self, vars: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut root = Map::new();
        let prefix = format!("{}_", self.prefix);

        for (key, value) in vars {
            let Some(rest) = key.as_ref().strip_prefix(&prefix) else {
                continue;
            };
            let path: Vec<String> = rest
                .split(NESTING_SEPARATOR)
                .map(|segment| segment.to_lowercase())
                .collect();
            if path.iter().any(|segment| segment.is_empty()) {
                continue;
            }
            insert_path(&mut root, &path, coerce(value.as_ref()));
        }

        Value::Object(root)
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new("PAYBRIDGE")
    }
}

fn insert_path(map: &mut Map<String, Value>, path: &[String], value: Value) {
    let (head, tail) = match path.split_first() {
        Some(split) => split,
        None => return,
    };

    if tail.is_empty() {
        map.insert(head.clone(), value);
        return;
    }

    let child = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(child_map) = child {
        insert_path(child_map, tail, value);
    }
}

/// Environment values are strings; numbers and booleans are recovered so
/// they deserialize into typed fields.
fn coerce(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Value::from(n);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    Value::String(raw.to_string())
}
