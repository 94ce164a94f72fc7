//! Validation results and the validator contract

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Outcome of a single validator run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationResult {
    /// Value satisfies the validator
    Valid,
    /// Value violates the validator
    Invalid(String),
}

impl ValidationResult {
    /// Build an `Invalid` result
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Error text, if invalid
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid(message) => Some(message),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Invalid(message) => write!(f, "invalid: {}", message),
        }
    }
}

/// A pure check over an optional value
///
/// Implementations must be deterministic and return `Valid` for `None`.
pub trait Validator<V: ?Sized>: Send + Sync {
    fn validate(&self, value: Option<&V>) -> ValidationResult;
}

/// Validator shared between fields
pub type SharedValidator<V> = Arc<dyn Validator<V>>;

impl<V: ?Sized, F: Validator<V> + ?Sized> Validator<V> for Arc<F> {
    fn validate(&self, value: Option<&V>) -> ValidationResult {
        (**self).validate(value)
    }
}

/// Closure adapter, see [`validator_fn`]
pub struct FnValidator<F>(F);

impl<V: ?Sized, F> Validator<V> for FnValidator<F>
where
    F: Fn(&V) -> ValidationResult + Send + Sync,
{
    fn validate(&self, value: Option<&V>) -> ValidationResult {
        value.map_or(ValidationResult::Valid, &self.0)
    }
}

/// Wrap a closure as a validator. The closure only sees present values.
pub fn validator_fn<V: ?Sized, F>(f: F) -> FnValidator<F>
where
    F: Fn(&V) -> ValidationResult + Send + Sync,
{
    FnValidator(f)
}

/// Optional lower and upper bounds, as configured on a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds<N> {
    pub min: Option<N>,
    pub max: Option<N>,
}

impl<N: Copy> Bounds<N> {
    /// Bounds with at least one side set, or `None`
    pub fn new(min: Option<N>, max: Option<N>) -> Option<Self> {
        (min.is_some() || max.is_some()).then_some(Self { min, max })
    }
}

/// Run every validator and keep only the `Invalid` results, in order
pub fn collect_invalid<'a, V, I>(validators: I, value: Option<&V>) -> Vec<ValidationResult>
where
    V: ?Sized + 'a,
    I: IntoIterator<Item = &'a SharedValidator<V>>,
{
    validators
        .into_iter()
        .map(|v| v.validate(value))
        .filter(|r| !r.is_valid())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_validator_skips_absent() {
        let v = validator_fn(|n: &i32| {
            if *n % 2 == 0 {
                ValidationResult::Valid
            } else {
                ValidationResult::invalid("odd")
            }
        });

        assert_eq!(v.validate(None), ValidationResult::Valid);
        assert_eq!(v.validate(Some(&4)), ValidationResult::Valid);
        assert_eq!(v.validate(Some(&3)).message(), Some("odd"));
    }

    #[test]
    fn test_collect_invalid_keeps_order() {
        let validators: Vec<SharedValidator<i32>> = vec![
            Arc::new(validator_fn(|_: &i32| ValidationResult::invalid("first"))),
            Arc::new(validator_fn(|_: &i32| ValidationResult::Valid)),
            Arc::new(validator_fn(|_: &i32| ValidationResult::invalid("second"))),
        ];

        let invalid = collect_invalid(&validators, Some(&1));
        assert_eq!(
            invalid,
            vec![ValidationResult::invalid("first"), ValidationResult::invalid("second")]
        );
    }

    #[test]
    fn test_bounds_require_one_side() {
        assert!(Bounds::<u32>::new(None, None).is_none());
        assert_eq!(Bounds::new(Some(1), None), Some(Bounds { min: Some(1), max: None }));
    }

    #[test]
    fn test_bounds_json() {
        let bounds = Bounds { min: Some(2u64), max: None };
        let json = serde_json::to_string(&bounds).unwrap();
        assert_eq!(json, r#"{"min":2,"max":null}"#);
        assert_eq!(serde_json::from_str::<Bounds<u64>>(&json).unwrap(), bounds);
    }
}
