//! File payloads, per-file upload state and file validators

mod validators;

pub use validators::*;

use formkit_common::{FormkitError, FormkitResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the file validators and fields need to know about a file
pub trait FileMeta {
    /// Stable identity within one field
    fn id(&self) -> &str;

    /// Location the file can be read from, once known
    fn uri(&self) -> Option<&str>;

    /// Size in bytes
    fn size(&self) -> u64;

    fn mime_type(&self) -> Option<&str>;

    /// Display name
    fn name(&self) -> &str;
}

/// Default file payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
}

impl FileInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size,
            uri: None,
            mime_type: None,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

impl FileMeta for FileInfo {
    fn id(&self) -> &str {
        &self.id
    }

    fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Processing status of one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    #[default]
    Pending,
    InProgress,
    Success,
    Failure(String),
}

impl FileStatus {
    /// Allowed moves:
    /// - `Pending -> InProgress | Failure` (a file can fail before it starts)
    /// - `InProgress -> Success | Failure`
    /// - `Failure -> Pending` (retry)
    pub fn can_transition_to(&self, next: &FileStatus) -> bool {
        use FileStatus::{Failure, InProgress, Pending, Success};
        matches!(
            (self, next),
            (Pending, InProgress | Failure(_))
                | (InProgress, Success | Failure(_))
                | (Failure(_), Pending)
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure(_))
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in progress"),
            Self::Success => write!(f, "success"),
            Self::Failure(reason) => write!(f, "failure ({})", reason),
        }
    }
}

/// A file and where it is in its processing
///
/// Never mutated in place; transitions return a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState<T> {
    pub file: T,
    pub status: FileStatus,
}

impl<T> FileState<T> {
    pub fn pending(file: T) -> Self {
        Self {
            file,
            status: FileStatus::Pending,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

impl<T: FileMeta + Clone> FileState<T> {
    /// New state with `status`, if the move is allowed
    pub fn transition(&self, status: FileStatus) -> FormkitResult<Self> {
        if !self.status.can_transition_to(&status) {
            return Err(FormkitError::InvalidTransition {
                file: self.file.id().to_string(),
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        Ok(Self {
            file: self.file.clone(),
            status,
        })
    }
}
