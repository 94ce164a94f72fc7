//! formkit Validators
//!
//! Pure validators binding a value to `Valid` / `Invalid(message)`:
//! - Text: required, length, regex, email, URL
//! - Numbers: half-open range
//! - Australian Business Number checksum
//! - Files: count, size, total size, mime type, upload state
//!
//! Absent input is always `Valid`. Required-ness is a validator of its own.

#![warn(clippy::all)]

pub mod abn;
pub mod file;
pub mod number;
pub mod text;
pub mod validation;

pub use abn::AbnValidator;
pub use file::*;
pub use number::NumberRangeValidator;
pub use text::*;
pub use validation::*;
