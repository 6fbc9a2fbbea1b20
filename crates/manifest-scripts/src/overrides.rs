//! Helm value overrides: a typed view of a `valuesInline` tree and its
//! flattening into `--set key=value` flags.

use std::fmt;

use serde_yaml::{Mapping, Number, Value};

/// One node of an override tree.
///
/// Only maps nest. Sequences and nulls are folded into `String` leaves: a
/// sequence renders in helm's `--set` list syntax (`[a, b]` becomes `{a,b}`)
/// so helm parses it back as a list, and null renders as the literal `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideValue {
    Map(Vec<(String, OverrideValue)>),
    Bool(bool),
    Number(Number),
    String(String),
}

impl OverrideValue {
    pub fn from_mapping(mapping: &Mapping) -> Self {
        OverrideValue::Map(
            mapping
                .iter()
                .map(|(key, value)| (key_text(key), OverrideValue::from(value)))
                .collect(),
        )
    }

    fn render(&self) -> String {
        match self {
            OverrideValue::Bool(true) => "true".to_string(),
            OverrideValue::Bool(false) => "false".to_string(),
            OverrideValue::Number(number) => number.to_string(),
            OverrideValue::String(text) => text.clone(),
            OverrideValue::Map(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.render()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
    }
}

impl From<&Value> for OverrideValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => OverrideValue::String("null".to_string()),
            Value::Bool(flag) => OverrideValue::Bool(*flag),
            Value::Number(number) => OverrideValue::Number(number.clone()),
            Value::String(text) => OverrideValue::String(text.clone()),
            Value::Sequence(items) => {
                let items: Vec<String> = items
                    .iter()
                    .map(|item| OverrideValue::from(item).render())
                    .collect();
                OverrideValue::String(format!("{{{}}}", items.join(",")))
            }
            Value::Mapping(mapping) => OverrideValue::from_mapping(mapping),
            Value::Tagged(tagged) => OverrideValue::from(&tagged.value),
        }
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => "null".to_string(),
        other => OverrideValue::from(other).render(),
    }
}

/// A single `--set key=value` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetFlag {
    pub key: String,
    pub value: String,
}

impl SetFlag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The `key=value` token that follows `--set`.
    pub fn assignment(&self) -> String {
        format!("{}={}", self.key, self.value)
    }
}

impl fmt::Display for SetFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--set {}={}", self.key, self.value)
    }
}

/// Flatten an override tree into dotted key paths, keeping input order.
pub fn flatten(root: &OverrideValue) -> Vec<SetFlag> {
    let mut flags = Vec::new();
    let mut path = Vec::new();
    visit(root, &mut path, &mut flags);
    flags
}

fn visit<'a>(node: &'a OverrideValue, path: &mut Vec<&'a str>, flags: &mut Vec<SetFlag>) {
    match node {
        OverrideValue::Map(entries) => {
            for (key, value) in entries {
                path.push(key.as_str());
                visit(value, path, flags);
                path.pop();
            }
        }
        // A bare leaf at the root has no key to set.
        _ if path.is_empty() => {}
        leaf => flags.push(SetFlag::new(path.join("."), leaf.render())),
    }
}

/// Flatten a YAML mapping straight to `--set` flag strings.
pub fn set_args(values: &Mapping) -> Vec<String> {
    flatten(&OverrideValue::from_mapping(values))
        .iter()
        .map(ToString::to_string)
        .collect()
}
