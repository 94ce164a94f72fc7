//! Validated form fields
//!
//! A field holds one logical input. Every validation run publishes the
//! committed value once on the field's live stream, and updates the
//! error text unless the run was silent.

use formkit_common::FormkitResult;
use formkit_validators::{collect_invalid, SharedValidator, ValidationResult, Validator};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::live::LiveValue;

/// Object-safe view of any field, used by [`crate::Form`]
pub trait Field: Send + Sync {
    fn name(&self) -> &str;

    /// Validate the current value, see [`FormField::do_validation`]
    fn do_validation(&self, silent: bool) -> bool;

    /// Validity found by the last run
    fn is_valid(&self) -> bool;

    /// Error text currently shown, if any
    fn error_message(&self) -> Option<String>;

    /// Current value as JSON, `Null` when absent
    fn json_value(&self) -> serde_json::Value;
}

/// Typed value access
pub trait ValueField {
    type Value;

    fn value(&self) -> Option<Self::Value>;

    /// Commit a new value and revalidate
    fn set_value(&self, value: Option<Self::Value>) -> FormkitResult<()>;
}

/// Error text, validity and the failures of the last run
#[derive(Debug)]
pub(crate) struct ValidationState {
    error: LiveValue<Option<String>>,
    valid: LiveValue<bool>,
    failures: Mutex<Vec<ValidationResult>>,
}

impl ValidationState {
    pub(crate) fn new() -> Self {
        Self {
            error: LiveValue::new(None),
            valid: LiveValue::new(true),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Record a run. Returns overall validity.
    pub(crate) fn record(&self, field: &str, failures: Vec<ValidationResult>, silent: bool) -> bool {
        let valid = failures.is_empty();
        let message = if silent {
            None
        } else {
            failures.first().and_then(|r| r.message()).map(str::to_string)
        };
        debug!(field, valid, silent, failures = failures.len(), "validated");

        *self.failures.lock() = failures;
        if self.valid.get() != valid {
            self.valid.publish(valid);
        }
        if self.error.get() != message {
            self.error.publish(message);
        }
        valid
    }

    pub(crate) fn error_message(&self) -> Option<String> {
        self.error.get()
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid.get()
    }

    pub(crate) fn failures(&self) -> Vec<ValidationResult> {
        self.failures.lock().clone()
    }

    pub(crate) fn clear_error(&self) {
        if self.error.get().is_some() {
            self.error.publish(None);
        }
    }

    pub(crate) fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }

    pub(crate) fn subscribe_validity(&self) -> watch::Receiver<bool> {
        self.valid.subscribe()
    }
}

/// A single validated input
pub struct FormField<V> {
    name: String,
    current: RwLock<Option<V>>,
    live: LiveValue<Option<V>>,
    validation: ValidationState,
    validators: Vec<SharedValidator<V>>,
}

impl<V> FormField<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: RwLock::new(None),
            live: LiveValue::new(None),
            validation: ValidationState::new(),
            validators: Vec::new(),
        }
    }

    /// Starting value. Not validated until the first run.
    pub fn with_initial(self, value: V) -> Self {
        *self.current.write() = Some(value.clone());
        self.live.publish(Some(value));
        self
    }

    pub fn with_validator(mut self, validator: impl Validator<V> + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn with_validators(mut self, validators: impl IntoIterator<Item = SharedValidator<V>>) -> Self {
        self.validators.extend(validators);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<V> {
        self.current.read().clone()
    }

    /// Commit `value`, then revalidate
    ///
    /// Errors are surfaced only when the field is already showing one, so
    /// typing into a pristine field does not raise an error banner.
    pub fn set_value(&self, value: Option<V>) {
        *self.current.write() = value;
        let silent = self.validation.error_message().is_none();
        self.do_validation(silent);
    }

    /// Run every validator against the current value
    ///
    /// Publishes the first failure as the error message unless `silent`
    /// (a silent run leaves no message). Emits the committed value once on
    /// the live stream. Returns true iff nothing failed.
    pub fn do_validation(&self, silent: bool) -> bool {
        let value = self.current.read().clone();
        let failures = collect_invalid(&self.validators, value.as_ref());
        let valid = self.validation.record(&self.name, failures, silent);
        self.live.publish(value);
        valid
    }

    /// Validate and surface any error
    pub fn show_errors(&self) -> bool {
        self.do_validation(false)
    }

    /// Hide the error text without revalidating
    pub fn clear_error(&self) {
        self.validation.clear_error();
    }

    /// Drop the value and any error, then validate silently
    pub fn reset(&self) {
        *self.current.write() = None;
        self.do_validation(true);
    }

    pub fn error_message(&self) -> Option<String> {
        self.validation.error_message()
    }

    pub fn is_valid(&self) -> bool {
        self.validation.is_valid()
    }

    /// Failures found by the last run
    pub fn validation_results(&self) -> Vec<ValidationResult> {
        self.validation.failures()
    }

    pub fn subscribe_value(&self) -> watch::Receiver<Option<V>> {
        self.live.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.validation.subscribe_error()
    }

    pub fn subscribe_validity(&self) -> watch::Receiver<bool> {
        self.validation.subscribe_validity()
    }

    /// Publishes on the value stream so far
    pub fn emissions(&self) -> u64 {
        self.live.emissions()
    }
}

impl<V> ValueField for FormField<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Value = V;

    fn value(&self) -> Option<V> {
        FormField::value(self)
    }

    fn set_value(&self, value: Option<V>) -> FormkitResult<()> {
        FormField::set_value(self, value);
        Ok(())
    }
}

impl<V> Field for FormField<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn do_validation(&self, silent: bool) -> bool {
        FormField::do_validation(self, silent)
    }

    fn is_valid(&self) -> bool {
        self.validation.is_valid()
    }

    fn error_message(&self) -> Option<String> {
        self.validation.error_message()
    }

    fn json_value(&self) -> serde_json::Value {
        match self.current.read().as_ref() {
            Some(value) => serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
            None => serde_json::Value::Null,
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for FormField<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormField")
            .field("name", &self.name)
            .field("value", &*self.current.read())
            .field("validators", &self.validators.len())
            .finish()
    }
}
