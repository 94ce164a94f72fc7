//! A named set of fields

use formkit_common::FormkitResult;
use std::sync::Arc;
use tracing::debug;

use crate::extractor::{FieldValues, FormExtractor, FormRecord};
use crate::field::Field;

/// Fields in insertion order, validated and extracted together
#[derive(Default)]
pub struct Form {
    fields: Vec<Arc<dyn Field>>,
    extractor: FormExtractor,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: Arc<dyn Field>) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_extractor(mut self, extractor: FormExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn add(&mut self, field: Arc<dyn Field>) {
        self.fields.push(field);
    }

    /// Field named `name`, compared case-insensitively. When several
    /// match, the last added wins, as in [`Form::values`].
    pub fn field(&self, name: &str) -> Option<&Arc<dyn Field>> {
        let key = name.to_lowercase();
        self.fields.iter().rev().find(|f| f.name().to_lowercase() == key)
    }

    pub fn fields(&self) -> &[Arc<dyn Field>] {
        &self.fields
    }

    /// Validate every field, without stopping at the first failure
    pub fn validate_all(&self, silent: bool) -> bool {
        let invalid = self
            .fields
            .iter()
            .filter(|f| !f.do_validation(silent))
            .count();
        debug!(fields = self.fields.len(), invalid, silent, "form validated");
        invalid == 0
    }

    /// Validity from each field's last run
    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|f| f.is_valid())
    }

    /// Current values, keyed by field name
    pub fn values(&self) -> FieldValues {
        self.fields.iter().map(|f| (f.name(), f.json_value())).collect()
    }

    /// Build `R` from the current values
    pub fn extract<R: FormRecord>(&self) -> FormkitResult<R> {
        self.extractor.extract(&self.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FormField;
    use crate::file_field::FileFormField;
    use formkit_common::MutationMode;
    use formkit_validators::{
        FileCountValidator, FileInfo, NumberRangeValidator, RequiredValidator, UrlValidator,
    };
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Application {
        name: String,
        #[serde(default)]
        age: i64,
        website: Option<String>,
        documents: Vec<String>,
    }

    impl FormRecord for Application {
        const PARAMETERS: &'static [&'static str] = &["name", "age", "website", "documents"];
    }

    struct Fixture {
        form: Form,
        name: Arc<FormField<String>>,
        age: Arc<FormField<i64>>,
        documents: Arc<FileFormField<FileInfo>>,
    }

    fn fixture() -> Fixture {
        let name: Arc<FormField<String>> = Arc::new(FormField::new("Name").with_validator(RequiredValidator::new()));
        let age: Arc<FormField<i64>> =
            Arc::new(FormField::new("Age").with_validator(NumberRangeValidator::between(18, 120)));
        let website = Arc::new(FormField::<String>::new("Website").with_validator(UrlValidator::new()));
        let documents: Arc<FileFormField<FileInfo>> = Arc::new(
            FileFormField::builder("Documents")
                .mode(MutationMode::SingleThreaded)
                .count(FileCountValidator::new(Some(1), Some(3)).unwrap())
                .build()
                .unwrap(),
        );

        let form = Form::new()
            .with_field(name.clone())
            .with_field(age.clone())
            .with_field(website)
            .with_field(documents.clone());

        Fixture { form, name, age, documents }
    }

    #[test]
    fn test_validate_all_reports_every_field() {
        let f = fixture();
        assert!(!f.form.validate_all(false));

        assert_eq!(f.name.error_message().as_deref(), Some("This field is required"));
        assert_eq!(
            f.form.field("documents").unwrap().error_message().as_deref(),
            Some("Select between 1 and 3 files")
        );
        assert!(f.form.field("website").unwrap().is_valid());
    }

    #[test]
    fn test_extract_from_fields() {
        let f = fixture();
        f.name.set_value(Some("Alice".into()));
        f.age.set_value(Some(30));
        f.documents
            .add_file(FileInfo::new("cv", "cv.pdf", 10).with_uri("file:///cv.pdf"))
            .unwrap();

        assert!(f.form.validate_all(true));
        let application: Application = f.form.extract().unwrap();
        assert_eq!(
            application,
            Application {
                name: "Alice".into(),
                age: 30,
                website: None,
                documents: vec!["file:///cv.pdf".into()],
            }
        );
    }

    #[test]
    fn test_name_collision_resolves_to_last_field() {
        let first: Arc<FormField<String>> = Arc::new(FormField::new("Email").with_initial("a@x.io".into()));
        let second: Arc<FormField<String>> = Arc::new(FormField::new("EMAIL").with_initial("b@x.io".into()));
        let form = Form::new().with_field(first).with_field(second);

        let found = form.field("email").unwrap();
        assert_eq!(found.name(), "EMAIL");
        assert_eq!(form.values().get("email"), Some(&found.json_value()));
        assert_eq!(found.json_value(), serde_json::json!("b@x.io"));
    }

    #[test]
    fn test_extract_fails_without_required_value() {
        let f = fixture();
        assert!(f.form.extract::<Application>().is_err());
    }
}
