//! Script variables.
//!
//! Each script instance owns one [`Variables`] table that value blocks read
//! and write through the execution context.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::VariableError;

/// A dynamically typed script value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    #[default]
    Nil,
    /// A boolean.
    Bool(bool),
    /// A number. All script numbers are `f64`.
    Number(f64),
    /// A string.
    Text(String),
}

impl Value {
    /// Name of the value's kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Named variables of one script instance, in assignment order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variables {
    values: IndexMap<String, Value>,
}

impl Variables {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a value, replacing any previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a value.
    ///
    /// # Errors
    ///
    /// Returns [`VariableError::Undefined`] if `name` was never assigned.
    pub fn get(&self, name: &str) -> Result<&Value, VariableError> {
        self.values.get(name).ok_or_else(|| VariableError::Undefined {
            name: name.to_string(),
        })
    }

    /// Returns `true` if `name` has been assigned.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Read a number.
    ///
    /// # Errors
    ///
    /// Fails if the variable is undefined or not a number.
    pub fn get_number(&self, name: &str) -> Result<f64, VariableError> {
        match self.get(name)? {
            Value::Number(n) => Ok(*n),
            other => Err(mismatch(name, "number", other)),
        }
    }

    /// Read a boolean.
    ///
    /// # Errors
    ///
    /// Fails if the variable is undefined or not a boolean.
    pub fn get_bool(&self, name: &str) -> Result<bool, VariableError> {
        match self.get(name)? {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch(name, "bool", other)),
        }
    }

    /// Read a string.
    ///
    /// # Errors
    ///
    /// Fails if the variable is undefined or not text.
    pub fn get_text(&self, name: &str) -> Result<&str, VariableError> {
        match self.get(name)? {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(name, "text", other)),
        }
    }

    /// Add `by` to a number variable, treating an undefined one as `0`.
    ///
    /// # Errors
    ///
    /// Fails if the variable holds something other than a number.
    pub fn increment(&mut self, name: &str, by: f64) -> Result<f64, VariableError> {
        let current = match self.values.get(name) {
            None => 0.0,
            Some(Value::Number(n)) => *n,
            Some(other) => return Err(mismatch(name, "number", other)),
        };
        let next = current + by;
        self.values.insert(name.to_string(), Value::Number(next));
        Ok(next)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no variable was ever assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn mismatch(name: &str, expected: &'static str, found: &Value) -> VariableError {
    VariableError::TypeMismatch {
        name: name.to_string(),
        expected,
        found: found.kind(),
    }
}
