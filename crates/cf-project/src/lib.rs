//! cf-project: calculation request document, form mapping and validation.

pub mod builder;
pub mod digest;
pub mod exchange;
pub mod form;
pub mod schema;
pub mod validate;

pub use builder::{build, build_parameters};
pub use digest::request_digest;
pub use exchange::{export_configuration, import_configuration};
pub use form::{FormValues, source_form_values};
pub use schema::*;
pub use validate::{SourceRole, ValidationError, validate_request};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Malformed configuration file, missing: {}", missing.join(", "))]
    MalformedConfigurationFile { missing: Vec<String> },

    #[error("Strategy error: {0}")]
    Strategy(#[from] cf_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<CalculationRequest> {
    let content = std::fs::read_to_string(path)?;
    import_configuration(&content)
}

/// Write a request file. Drafts are written as-is; validation gates
/// submission, not saving.
pub fn save_json(path: &std::path::Path, request: &CalculationRequest) -> ProjectResult<()> {
    let content = export_configuration(request)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_form_yaml(path: &std::path::Path) -> ProjectResult<FormValues> {
    let content = std::fs::read_to_string(path)?;
    let form: FormValues = serde_yaml::from_str(&content)?;
    Ok(form)
}

pub fn save_form_yaml(path: &std::path::Path, form: &FormValues) -> ProjectResult<()> {
    let content = serde_yaml::to_string(form)?;
    std::fs::write(path, content)?;
    Ok(())
}
