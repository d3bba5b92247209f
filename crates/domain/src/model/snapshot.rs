use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// A single persisted scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl ScalarValue {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Integer(_) => ScalarKind::Integer,
            Self::Float(_) => ScalarKind::Float,
            Self::Text(_) => ScalarKind::Text,
            Self::Bool(_) => ScalarKind::Bool,
        }
    }

    /// Converts a JSON value; arrays, objects, null and numbers that fit
    /// neither `i64` nor `f64` yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Integer)
                .or_else(|| number.as_f64().map(Self::Float)),
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Shape of a scalar as declared by an RPC method's field contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Integer,
    Float,
    /// Integer or float.
    Number,
    Text,
    Bool,
}

impl ScalarKind {
    pub fn accepts(self, value: &ScalarValue) -> bool {
        match (self, value) {
            (Self::Number, ScalarValue::Integer(_) | ScalarValue::Float(_)) => true,
            (Self::Float, ScalarValue::Integer(_)) => true,
            (kind, value) => kind == value.kind(),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Number => "number",
            Self::Text => "string",
            Self::Bool => "boolean",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("field `{field}` should be {expected}")]
    WrongKind { field: String, expected: ScalarKind },
}

/// Scalar fields of one RPC result, in the order they were received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    fields: Vec<(String, ScalarValue)>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from an RPC `result` object, dropping every field
    /// that is not a scalar.
    pub fn from_json(value: &Value) -> Result<Self, SnapshotError> {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Err(SnapshotError::NotAnObject("null")),
            Value::Bool(_) => return Err(SnapshotError::NotAnObject("boolean")),
            Value::Number(_) => return Err(SnapshotError::NotAnObject("number")),
            Value::String(_) => return Err(SnapshotError::NotAnObject("string")),
            Value::Array(_) => return Err(SnapshotError::NotAnObject("array")),
        };

        let fields = object
            .iter()
            .filter_map(|(key, value)| {
                ScalarValue::from_json(value).map(|scalar| (key.clone(), scalar))
            })
            .collect();
        Ok(Self { fields })
    }

    pub fn get(&self, field: &str) -> Option<&ScalarValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Sets a field, replacing it in place when already present.
    pub fn insert(&mut self, field: impl Into<String>, value: ScalarValue) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<ScalarValue> {
        let index = self.fields.iter().position(|(name, _)| name == field)?;
        Some(self.fields.remove(index).1)
    }

    /// Copies `field` from `other` when it exists there.
    pub fn copy_field(&mut self, other: &Snapshot, field: &str) {
        if let Some(value) = other.get(field) {
            self.insert(field, value.clone());
        }
    }

    /// Checks that each `(field, kind)` pair is present with a matching kind.
    pub fn require(&self, contract: &[(&str, ScalarKind)]) -> Result<(), SnapshotError> {
        for (field, expected) in contract {
            let value = self
                .get(field)
                .ok_or_else(|| SnapshotError::MissingField((*field).to_string()))?;
            if !expected.accepts(value) {
                return Err(SnapshotError::WrongKind {
                    field: (*field).to_string(),
                    expected: *expected,
                });
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ScalarValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, ScalarValue)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (field, value) in iter {
            snapshot.insert(field, value);
        }
        snapshot
    }
}
