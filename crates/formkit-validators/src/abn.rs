//! Australian Business Number checksum

use formkit_common::ValidationMessages;

use crate::validation::{ValidationResult, Validator};

const ABN_WEIGHTS: [i32; 11] = [10, 1, 3, 5, 7, 9, 11, 13, 15, 17, 19];
const ABN_MODULUS: i32 = 89;

/// ABN check digit validator
///
/// Whitespace is ignored. Blank input is valid; pair with a required
/// validator for mandatory ABNs.
#[derive(Debug, Clone)]
pub struct AbnValidator {
    message: String,
}

impl AbnValidator {
    pub fn new() -> Self {
        Self {
            message: ValidationMessages::default().invalid_abn,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_messages(mut self, messages: &ValidationMessages) -> Self {
        self.message = messages.invalid_abn.clone();
        self
    }

    /// Checksum test on a raw ABN string
    pub fn is_valid_abn(input: &str) -> bool {
        let digits: Vec<i32> = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_digit(10).map(|d| d as i32))
            .collect::<Option<_>>()
            .unwrap_or_default();

        if digits.len() != ABN_WEIGHTS.len() {
            return false;
        }

        let sum: i32 = digits
            .iter()
            .zip(ABN_WEIGHTS)
            .enumerate()
            .map(|(i, (&d, w))| if i == 0 { (d - 1) * w } else { d * w })
            .sum();

        sum.rem_euclid(ABN_MODULUS) == 0
    }
}

impl Default for AbnValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AsRef<str> + ?Sized> Validator<S> for AbnValidator {
    fn validate(&self, value: Option<&S>) -> ValidationResult {
        match value.map(|s| AsRef::<str>::as_ref(s)) {
            None => ValidationResult::Valid,
            Some(s) if s.trim().is_empty() => ValidationResult::Valid,
            Some(s) if Self::is_valid_abn(s) => ValidationResult::Valid,
            Some(_) => ValidationResult::Invalid(self.message.clone()),
        }
    }
}
