//! Standalone request files for offline editing and re-submission.

use cf_core::StrategyId;
use serde_json::Value;

use crate::schema::{CalculationRequest, SCHEMA_VERSION};
use crate::{ProjectError, ProjectResult};

/// Nested keys an imported request must carry, as JSON pointers.
const REQUIRED_POINTERS: &[&str] = &[
    "/_meta/target_project_path",
    "/geometry_source/source_info/project_path",
    "/geometry_source/source_info/commit_hash",
    "/parameters_source/source_info/project_path",
    "/parameters_source/source_info/commit_hash",
    "/calculation_strategy",
    "/parameters",
];

/// Pretty JSON with two-space indentation.
pub fn export_configuration(request: &CalculationRequest) -> ProjectResult<String> {
    Ok(serde_json::to_string_pretty(request)?)
}

/// Parse a request file. `schema_version` is kept verbatim, or set to
/// [`SCHEMA_VERSION`] when the file has none.
pub fn import_configuration(text: &str) -> ProjectResult<CalculationRequest> {
    let raw: Value = serde_json::from_str(text)?;

    let missing: Vec<String> = REQUIRED_POINTERS
        .iter()
        .filter(|pointer| raw.pointer(pointer).is_none_or(Value::is_null))
        .map(|pointer| pointer.trim_start_matches('/').replace('/', "."))
        .collect();
    if !missing.is_empty() {
        return Err(ProjectError::MalformedConfigurationFile { missing });
    }

    // Checked separately so an unknown name reports as such rather than as
    // a generic serde error.
    if let Some(name) = raw.pointer("/calculation_strategy").and_then(Value::as_str) {
        name.parse::<StrategyId>()?;
    }

    Ok(serde_json::from_value(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
  "schema_version": "1.2",
  "_meta": {
    "target_project_path": "turbines/k-300"
  },
  "geometry_source": {
    "type": "reference",
    "source_info": {
      "project_path": "geometry/k-300",
      "commit_hash": "a1b2c3"
    },
    "path": "condenser_geometry.json"
  },
  "parameters_source": {
    "type": "reference",
    "source_info": {
      "project_path": "params/k-300",
      "commit_hash": "d4e5f6"
    },
    "path": null
  },
  "calculation_strategy": "berman",
  "parameters": {
    "mass_flow_steam_list": [
      100,
      120.5
    ],
    "enthalpy_flow_path_1": 2450,
    "BAP": 1
  }
}"#;

    #[test]
    fn import_then_export_is_byte_identical() {
        let request = import_configuration(DOCUMENT).unwrap();
        assert_eq!(export_configuration(&request).unwrap(), DOCUMENT);
    }

    #[test]
    fn missing_nested_keys_are_listed() {
        let mut raw: Value = serde_json::from_str(DOCUMENT).unwrap();
        raw["geometry_source"]["source_info"]
            .as_object_mut()
            .unwrap()
            .remove("commit_hash");
        raw.as_object_mut().unwrap().remove("_meta");

        let err = import_configuration(&raw.to_string()).unwrap_err();
        match err {
            ProjectError::MalformedConfigurationFile { missing } => {
                assert_eq!(
                    missing,
                    vec![
                        "_meta.target_project_path".to_string(),
                        "geometry_source.source_info.commit_hash".to_string(),
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_strategy_is_reported() {
        let text = DOCUMENT.replace("\"berman\"", "\"table_pressure\"");
        let err = import_configuration(&text).unwrap_err();
        assert!(matches!(err, ProjectError::Strategy(_)), "{err}");
    }

    #[test]
    fn schema_version_round_trips_unchanged() {
        let text = DOCUMENT.replace("\"1.2\"", "\"1.1\"");
        let request = import_configuration(&text).unwrap();
        assert_eq!(request.schema_version, "1.1");
        assert_eq!(export_configuration(&request).unwrap(), text);
    }

    #[test]
    fn missing_schema_version_takes_current() {
        let mut raw: Value = serde_json::from_str(DOCUMENT).unwrap();
        raw.as_object_mut().unwrap().remove("schema_version");

        let request = import_configuration(&raw.to_string()).unwrap();
        assert_eq!(request.schema_version, SCHEMA_VERSION);
        assert_eq!(request, import_configuration(DOCUMENT).unwrap());
    }

    #[test]
    fn not_json_is_a_json_error() {
        assert!(matches!(
            import_configuration("{ nope"),
            Err(ProjectError::Json(_))
        ));
    }
}
