//! formkit Fields - Reactive validated form fields
//!
//! ## Features
//! - `FormField<V>`: value + validators + hot value/error/validity streams
//! - `FileFormField<T>`: per-file upload state machine with serialized,
//!   copy-on-write mutation (inline or on a background task)
//! - `Form` and `FormExtractor`: validate a set of fields and build a typed
//!   record from their values
//!
//! Control flow: a mutation is serialized, applied to the current state,
//! revalidated and republished, and subscribers re-render from the stream.

#![warn(clippy::all)]

pub mod extractor;
pub mod field;
pub mod file_field;
pub mod form;
pub mod live;

pub use extractor::{FieldValues, FormExtractor, FormRecord};
pub use field::{Field, FormField, ValueField};
pub use file_field::{FileFormField, FileFormFieldBuilder, FileSnapshot, FileValidators};
pub use form::Form;
pub use live::LiveValue;

pub use formkit_common::{FormkitConfig, FormkitError, FormkitResult, MutationMode};
pub use formkit_validators as validators;
