//! Number range validation

use formkit_common::{render, FormkitError, FormkitResult, ValidationMessages};
use std::cmp::Ordering;
use std::fmt::Display;

use crate::validation::{Bounds, ValidationResult, Validator};

/// Half-open number range check
///
/// # Invariants
/// - At least one bound is configured
/// - `min` is inclusive, `max` is exclusive
#[derive(Debug, Clone)]
pub struct NumberRangeValidator<N> {
    bounds: Bounds<N>,
    below_min: String,
    not_below_max: String,
}

impl<N: Copy + PartialOrd + Display> NumberRangeValidator<N> {
    /// Create with optional bounds. Fails when both are `None`.
    pub fn new(min: Option<N>, max: Option<N>) -> FormkitResult<Self> {
        let bounds = Bounds::new(min, max).ok_or_else(|| {
            FormkitError::misconfigured("NumberRangeValidator", "min or max must be set")
        })?;
        Ok(Self::from_bounds(bounds))
    }

    /// `value >= min`
    pub fn at_least(min: N) -> Self {
        Self::from_bounds(Bounds { min: Some(min), max: None })
    }

    /// `value < max`
    pub fn below(max: N) -> Self {
        Self::from_bounds(Bounds { min: None, max: Some(max) })
    }

    /// `min <= value < max`
    pub fn between(min: N, max: N) -> Self {
        Self::from_bounds(Bounds { min: Some(min), max: Some(max) })
    }

    fn from_bounds(bounds: Bounds<N>) -> Self {
        let messages = ValidationMessages::default();
        Self {
            bounds,
            below_min: messages.number_below_min,
            not_below_max: messages.number_not_below_max,
        }
    }

    /// Use one message for both failure kinds
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.below_min = message.clone();
        self.not_below_max = message;
        self
    }

    /// Take templates from a message set
    pub fn with_messages(mut self, messages: &ValidationMessages) -> Self {
        self.below_min = messages.number_below_min.clone();
        self.not_below_max = messages.number_not_below_max.clone();
        self
    }

    pub fn bounds(&self) -> Bounds<N> {
        self.bounds
    }
}

impl<N> Validator<N> for NumberRangeValidator<N>
where
    N: Copy + PartialOrd + Display + Send + Sync,
{
    fn validate(&self, value: Option<&N>) -> ValidationResult {
        let Some(value) = value else {
            return ValidationResult::Valid;
        };

        if let Some(min) = self.bounds.min {
            if matches!(value.partial_cmp(&min), Some(Ordering::Less) | None) {
                return ValidationResult::Invalid(render(
                    &self.below_min,
                    &[("min", min.to_string().as_str()), ("value", value.to_string().as_str())],
                ));
            }
        }
        if let Some(max) = self.bounds.max {
            if value.partial_cmp(&max) != Some(Ordering::Less) {
                return ValidationResult::Invalid(render(
                    &self.not_below_max,
                    &[("max", max.to_string().as_str()), ("value", value.to_string().as_str())],
                ));
            }
        }
        ValidationResult::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_requires_a_bound() {
        let err = NumberRangeValidator::<i64>::new(None, None).unwrap_err();
        assert!(matches!(err, FormkitError::Misconfigured { .. }));
    }

    #[test]
    fn test_min_inclusive_max_exclusive() {
        let v = NumberRangeValidator::new(Some(10), Some(20)).unwrap();

        assert_eq!(v.validate(Some(&10)), ValidationResult::Valid);
        assert_eq!(v.validate(Some(&19)), ValidationResult::Valid);
        assert_eq!(v.validate(Some(&20)).message(), Some("Must be less than 20"));
        assert_eq!(v.validate(Some(&9)).message(), Some("Must be at least 10"));
        assert_eq!(v.validate(None), ValidationResult::Valid);
    }

    #[test]
    fn test_single_bound() {
        assert!(NumberRangeValidator::at_least(0.5).validate(Some(&1e9)).is_valid());
        assert!(!NumberRangeValidator::below(0.5).validate(Some(&0.5)).is_valid());
    }

    #[test]
    fn test_nan_is_rejected() {
        let v = NumberRangeValidator::between(0.0, 1.0);
        assert!(!v.validate(Some(&f64::NAN)).is_valid());
    }

    #[test]
    fn test_message_override() {
        let v = NumberRangeValidator::between(1, 5).with_message("Pick 1 to 4");
        assert_eq!(v.validate(Some(&5)).message(), Some("Pick 1 to 4"));
    }

    proptest! {
        #[test]
        fn prop_range_edges(min in -1.0e6f64..1.0e6, width in 1.0f64..1.0e6) {
            let max = min + width;
            let v = NumberRangeValidator::new(Some(min), Some(max)).unwrap();

            prop_assert!(v.validate(Some(&min)).is_valid());
            prop_assert!(!v.validate(Some(&max)).is_valid());
            let just_below = max - max.abs().max(1.0) * 1e-9;
            prop_assert!(v.validate(Some(&just_below)).is_valid());
        }

        #[test]
        fn prop_integer_range(min in -1000i64..1000, width in 1i64..1000, probe in -3000i64..3000) {
            let max = min + width;
            let v = NumberRangeValidator::between(min, max);
            prop_assert_eq!(v.validate(Some(&probe)).is_valid(), probe >= min && probe < max);
        }
    }
}
