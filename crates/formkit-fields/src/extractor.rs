//! Materialize a record from named field values
//!
//! Field names match record parameters case-insensitively. Each record
//! type lists its parameters in [`FormRecord::PARAMETERS`]; serde then
//! builds the value, so `#[serde(default)]` on a parameter makes it
//! optional.

use formkit_common::{FormkitError, FormkitResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// A record that can be built from form values
pub trait FormRecord: DeserializeOwned {
    /// Parameter names, as serde expects them
    const PARAMETERS: &'static [&'static str];
}

/// Field values keyed by lowercased name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    values: HashMap<String, Value>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the lowercased name. A later value for the same
    /// lowercased name replaces the earlier one.
    pub fn insert(&mut self, name: &str, value: Value) {
        let key = name.to_lowercase();
        if self.values.insert(key, value).is_some() {
            warn!(field = name, "field name collides case-insensitively; keeping the later value");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, Value)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.insert(name.as_ref(), value);
        }
        values
    }
}

/// Maps field values onto [`FormRecord`]s
#[derive(Debug, Clone, Default)]
pub struct FormExtractor {
    aliases: HashMap<String, String>,
}

impl FormExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `parameter` from the field named `field` instead of its own name
    pub fn alias(mut self, parameter: impl Into<String>, field: impl Into<String>) -> Self {
        self.aliases.insert(parameter.into(), field.into());
        self
    }

    /// Build `R` from `values`
    ///
    /// Absent and `null` values are left out so the record's defaults
    /// apply. A parameter with neither a value nor a default fails.
    pub fn extract<R: FormRecord>(&self, values: &FieldValues) -> FormkitResult<R> {
        let mut object = Map::new();
        for &parameter in R::PARAMETERS {
            let source = self.aliases.get(parameter).map_or(parameter, String::as_str);
            match values.get(source) {
                Some(Value::Null) | None => {}
                Some(value) => {
                    object.insert(parameter.to_string(), value.clone());
                }
            }
        }

        serde_json::from_value(Value::Object(object)).map_err(|e| FormkitError::Extraction {
            target: std::any::type_name::<R>(),
            reason: e.to_string(),
        })
    }
}
