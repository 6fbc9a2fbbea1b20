use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

/// A submitted document that failed to parse as YAML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    message: String,
}

impl SyntaxError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A syntactically valid document: the raw text plus its parsed value.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    raw: String,
    value: Value,
}

impl ParsedDocument {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Syntax-only check of a submitted document.
///
/// An empty (or comment-only) document is valid and parses to null. A stream
/// holding more than one document is rejected.
pub fn validate(text: &str) -> Result<ParsedDocument, SyntaxError> {
    let mut parsed = None;
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document).map_err(|err| SyntaxError::new(err.to_string()))?;
        if parsed.is_some() {
            return Err(SyntaxError::new(
                "expected a single document in the stream, but found another document",
            ));
        }
        parsed = Some(value);
    }

    Ok(ParsedDocument {
        raw: text.to_string(),
        value: parsed.unwrap_or(Value::Null),
    })
}
