//! File constraints: count, size, total size, mime type, upload state

use formkit_common::{render, FormkitError, FormkitResult, ValidationMessages};
use std::collections::BTreeSet;

use super::{FileMeta, FileState};
use crate::validation::{Bounds, ValidationResult, Validator};

/// Number of files within inclusive bounds
#[derive(Debug, Clone)]
pub struct FileCountValidator {
    bounds: Bounds<usize>,
    between: String,
    at_least: String,
    at_most: String,
}

impl FileCountValidator {
    pub fn new(minimum: Option<usize>, maximum: Option<usize>) -> FormkitResult<Self> {
        let bounds = Bounds::new(minimum, maximum).ok_or_else(|| {
            FormkitError::misconfigured("FileCountValidator", "minimum or maximum must be set")
        })?;
        if let (Some(min), Some(max)) = (minimum, maximum) {
            if min > max {
                return Err(FormkitError::misconfigured(
                    "FileCountValidator",
                    format!("minimum {} exceeds maximum {}", min, max),
                ));
            }
        }
        let messages = ValidationMessages::default();
        Ok(Self {
            bounds,
            between: messages.file_count,
            at_least: messages.file_count_min,
            at_most: messages.file_count_max,
        })
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.between = message.clone();
        self.at_least = message.clone();
        self.at_most = message;
        self
    }

    pub fn with_messages(mut self, messages: &ValidationMessages) -> Self {
        self.between = messages.file_count.clone();
        self.at_least = messages.file_count_min.clone();
        self.at_most = messages.file_count_max.clone();
        self
    }

    pub fn bounds(&self) -> Bounds<usize> {
        self.bounds
    }

    fn message(&self) -> String {
        let min = self.bounds.min.map(|m| m.to_string());
        let max = self.bounds.max.map(|m| m.to_string());
        match (&min, &max) {
            (Some(min), Some(max)) => render(&self.between, &[("min", min.as_str()), ("max", max.as_str())]),
            (Some(min), None) => render(&self.at_least, &[("min", min.as_str())]),
            (None, Some(max)) => render(&self.at_most, &[("max", max.as_str())]),
            (None, None) => self.between.clone(),
        }
    }
}

impl<T> Validator<[T]> for FileCountValidator
where
    T: Send + Sync,
{
    fn validate(&self, value: Option<&[T]>) -> ValidationResult {
        let Some(files) = value else {
            return ValidationResult::Valid;
        };
        let count = files.len();
        let too_few = self.bounds.min.is_some_and(|min| count < min);
        let too_many = self.bounds.max.is_some_and(|max| count > max);
        if too_few || too_many {
            ValidationResult::Invalid(self.message())
        } else {
            ValidationResult::Valid
        }
    }
}

/// Per-file byte size within inclusive bounds
#[derive(Debug, Clone)]
pub struct FileSizeValidator {
    bounds: Bounds<u64>,
    too_small: String,
    too_large: String,
}

impl FileSizeValidator {
    pub fn new(minimum: Option<u64>, maximum: Option<u64>) -> FormkitResult<Self> {
        let bounds = Bounds::new(minimum, maximum).ok_or_else(|| {
            FormkitError::misconfigured("FileSizeValidator", "minimum or maximum must be set")
        })?;
        if let (Some(min), Some(max)) = (minimum, maximum) {
            if min > max {
                return Err(FormkitError::misconfigured(
                    "FileSizeValidator",
                    format!("minimum {} exceeds maximum {}", min, max),
                ));
            }
        }
        let messages = ValidationMessages::default();
        Ok(Self {
            bounds,
            too_small: messages.file_too_small,
            too_large: messages.file_too_large,
        })
    }

    /// Only an upper limit
    pub fn max(maximum: u64) -> Self {
        let messages = ValidationMessages::default();
        Self {
            bounds: Bounds {
                min: None,
                max: Some(maximum),
            },
            too_small: messages.file_too_small,
            too_large: messages.file_too_large,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.too_small = message.clone();
        self.too_large = message;
        self
    }

    pub fn with_messages(mut self, messages: &ValidationMessages) -> Self {
        self.too_small = messages.file_too_small.clone();
        self.too_large = messages.file_too_large.clone();
        self
    }

    pub fn bounds(&self) -> Bounds<u64> {
        self.bounds
    }
}

impl<T: FileMeta + Send + Sync> Validator<T> for FileSizeValidator {
    fn validate(&self, value: Option<&T>) -> ValidationResult {
        let Some(file) = value else {
            return ValidationResult::Valid;
        };
        let size = file.size();
        if let Some(min) = self.bounds.min.filter(|&min| size < min) {
            return ValidationResult::Invalid(render(
                &self.too_small,
                &[("value", file.name()), ("min", min.to_string().as_str())],
            ));
        }
        if let Some(max) = self.bounds.max.filter(|&max| size > max) {
            return ValidationResult::Invalid(render(
                &self.too_large,
                &[("value", file.name()), ("max", max.to_string().as_str())],
            ));
        }
        ValidationResult::Valid
    }
}

/// Sum of all file sizes at most `maximum`
#[derive(Debug, Clone)]
pub struct TotalFileSizeValidator {
    maximum: u64,
    message: String,
}

impl TotalFileSizeValidator {
    pub fn new(maximum: u64) -> Self {
        Self {
            maximum,
            message: ValidationMessages::default().total_size,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_messages(mut self, messages: &ValidationMessages) -> Self {
        self.message = messages.total_size.clone();
        self
    }

    pub fn maximum(&self) -> u64 {
        self.maximum
    }
}

impl<T: FileMeta + Send + Sync> Validator<[T]> for TotalFileSizeValidator {
    fn validate(&self, value: Option<&[T]>) -> ValidationResult {
        let total: u64 = value
            .unwrap_or_default()
            .iter()
            .map(|f| f.size())
            .fold(0, u64::saturating_add);
        if total > self.maximum {
            ValidationResult::Invalid(render(&self.message, &[("max", self.maximum.to_string().as_str())]))
        } else {
            ValidationResult::Valid
        }
    }
}

/// Mime type must be in the allow-set
///
/// Comparison is case-insensitive; an entry like `image/*` admits any
/// subtype. A file without a mime type is rejected.
#[derive(Debug, Clone)]
pub struct FileMimeTypeValidator {
    allowed: BTreeSet<String>,
    message: String,
}

impl FileMimeTypeValidator {
    pub fn new<I, S>(allowed: I) -> FormkitResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed: BTreeSet<String> = allowed
            .into_iter()
            .map(|m| m.as_ref().trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        if allowed.is_empty() {
            return Err(FormkitError::misconfigured(
                "FileMimeTypeValidator",
                "at least one mime type must be allowed",
            ));
        }
        Ok(Self {
            allowed,
            message: ValidationMessages::default().mime_type,
        })
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_messages(mut self, messages: &ValidationMessages) -> Self {
        self.message = messages.mime_type.clone();
        self
    }

    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    pub fn accepts(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if self.allowed.contains(&mime_type) {
            return true;
        }
        let Some((kind, _)) = mime_type.split_once('/') else {
            return false;
        };
        self.allowed.contains(&format!("{}/*", kind))
    }
}

impl<T: FileMeta + Send + Sync> Validator<T> for FileMimeTypeValidator {
    fn validate(&self, value: Option<&T>) -> ValidationResult {
        let Some(file) = value else {
            return ValidationResult::Valid;
        };
        match file.mime_type() {
            Some(mime) if self.accepts(mime) => ValidationResult::Valid,
            _ => ValidationResult::Invalid(render(&self.message, &[("value", file.name())])),
        }
    }
}

/// No file may be in `Failure`
#[derive(Debug, Clone)]
pub struct FileStateValidator {
    message: String,
}

impl FileStateValidator {
    pub fn new() -> Self {
        Self {
            message: ValidationMessages::default().file_failed,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_messages(mut self, messages: &ValidationMessages) -> Self {
        self.message = messages.file_failed.clone();
        self
    }
}

impl Default for FileStateValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FileMeta + Send + Sync> Validator<[FileState<T>]> for FileStateValidator {
    fn validate(&self, value: Option<&[FileState<T>]>) -> ValidationResult {
        let failed = value.unwrap_or_default().iter().find_map(|state| match &state.status {
            super::FileStatus::Failure(reason) => Some((state.file.name(), reason.as_str())),
            _ => None,
        });
        match failed {
            Some((name, reason)) => {
                ValidationResult::Invalid(render(&self.message, &[("value", name), ("reason", reason)]))
            }
            None => ValidationResult::Valid,
        }
    }
}
