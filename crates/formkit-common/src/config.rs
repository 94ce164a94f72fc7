//! Configuration for fields and validators

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::FormkitResult;

/// Environment variable naming a JSON config file
pub const CONFIG_ENV: &str = "FORMKIT_CONFIG";

/// How a file field serializes its state mutations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationMode {
    /// Mutations run synchronously on the caller, which guarantees there are
    /// no concurrent callers
    SingleThreaded,
    /// Mutations are queued to a background task and applied one at a time
    #[default]
    Concurrent,
}

/// Top-level formkit configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormkitConfig {
    /// Default mutation mode for file fields
    pub mutation_mode: MutationMode,
    /// Default validator messages
    pub messages: ValidationMessages,
}

impl FormkitConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> FormkitResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> FormkitResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the file named by `FORMKIT_CONFIG`, or fall back to defaults
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(%path, error = %e, "formkit config unreadable, using defaults");
            Self::default()
        })
    }
}

/// Default error messages, one per validator kind
///
/// Templates may reference `{min}`, `{max}`, `{value}` and `{reason}`; see [`render`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationMessages {
    /// Value absent or blank
    pub required: String,
    /// Text shorter than `{min}` characters
    pub too_short: String,
    /// Text longer than `{max}` characters
    pub too_long: String,
    /// Number below `{min}`
    pub number_below_min: String,
    /// Number at or above `{max}`
    pub number_not_below_max: String,
    /// ABN checksum failed
    pub invalid_abn: String,
    /// Not a URL
    pub invalid_url: String,
    /// Not an email address
    pub invalid_email: String,
    /// Regex did not match
    pub pattern_mismatch: String,
    /// File count outside `{min}..={max}`
    pub file_count: String,
    /// Fewer than `{min}` files
    pub file_count_min: String,
    /// More than `{max}` files
    pub file_count_max: String,
    /// File `{value}` under `{min}` bytes
    pub file_too_small: String,
    /// File `{value}` over `{max}` bytes
    pub file_too_large: String,
    /// All files together over `{max}` bytes
    pub total_size: String,
    /// File `{value}` has a mime type outside the allow-set
    pub mime_type: String,
    /// File `{value}` failed with `{reason}`
    pub file_failed: String,
}

impl Default for ValidationMessages {
    fn default() -> Self {
        Self {
            required: "This field is required".into(),
            too_short: "Must be at least {min} characters".into(),
            too_long: "Must be at most {max} characters".into(),
            number_below_min: "Must be at least {min}".into(),
            number_not_below_max: "Must be less than {max}".into(),
            invalid_abn: "Invalid ABN".into(),
            invalid_url: "Invalid URL".into(),
            invalid_email: "Invalid email address".into(),
            pattern_mismatch: "Invalid format".into(),
            file_count: "Select between {min} and {max} files".into(),
            file_count_min: "Select at least {min} files".into(),
            file_count_max: "Select at most {max} files".into(),
            file_too_small: "{value} is smaller than {min} bytes".into(),
            file_too_large: "{value} is larger than {max} bytes".into(),
            total_size: "Files exceed {max} bytes in total".into(),
            mime_type: "{value} has an unsupported file type".into(),
            file_failed: "{value} failed to upload: {reason}".into(),
        }
    }
}

/// Substitute `{key}` placeholders in a message template
pub fn render(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_placeholders() {
        let msg = render("Select between {min} and {max} files", &[("min", "2"), ("max", "5")]);
        assert_eq!(msg, "Select between 2 and 5 files");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{value} failed", &[]), "{value} failed");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: FormkitConfig = serde_json::from_str(
            r#"{"mutation_mode": "single_threaded", "messages": {"invalid_abn": "Bad ABN"}}"#,
        )
        .unwrap();

        assert_eq!(config.mutation_mode, MutationMode::SingleThreaded);
        assert_eq!(config.messages.invalid_abn, "Bad ABN");
        assert_eq!(config.messages.required, ValidationMessages::default().required);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formkit.json");

        let mut config = FormkitConfig::default();
        config.messages.invalid_url = "Not a link".into();
        config.save(&path).unwrap();

        let loaded = FormkitConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_env_reads_file_or_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        std::fs::write(&good, r#"{"mutation_mode": "single_threaded"}"#).unwrap();
        std::fs::write(&bad, "not json").unwrap();

        std::env::set_var(CONFIG_ENV, &good);
        assert_eq!(FormkitConfig::from_env().mutation_mode, MutationMode::SingleThreaded);

        std::env::set_var(CONFIG_ENV, &bad);
        assert_eq!(FormkitConfig::from_env(), FormkitConfig::default());

        std::env::set_var(CONFIG_ENV, dir.path().join("missing.json"));
        assert_eq!(FormkitConfig::from_env(), FormkitConfig::default());

        std::env::remove_var(CONFIG_ENV);
        assert_eq!(FormkitConfig::from_env(), FormkitConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = FormkitConfig::load("/nonexistent/formkit.json").unwrap_err();
        assert!(matches!(err, crate::FormkitError::Io(_)));
    }
}
