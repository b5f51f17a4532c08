//! Flat key/value snapshot of the calculation form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::CalculationRequest;

pub const TARGET_PROJECT: &str = "target_project";
pub const GEOMETRY_PROJECT_PATH: &str = "geometry.project_path";
pub const GEOMETRY_COMMIT_HASH: &str = "geometry.commit_hash";
pub const GEOMETRY_PATH: &str = "geometry.path";
pub const PARAMETERS_PROJECT_PATH: &str = "parameters.project_path";
pub const PARAMETERS_COMMIT_HASH: &str = "parameters.commit_hash";
pub const PARAMETERS_PATH: &str = "parameters.path";

/// User-entered form fields as strings. Parameter fields are keyed by their
/// registry name; source fields use the constants above.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Field text, empty when unset.
    pub fn text(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn extend(&mut self, other: FormValues) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Source and target fields of a request projected back into the form.
/// The parameters path is only set when the request carries one.
pub fn source_form_values(request: &CalculationRequest) -> FormValues {
    let mut form = FormValues::new();
    form.set(TARGET_PROJECT, request.target_project_path());

    let geometry = &request.geometry_source;
    form.set(GEOMETRY_PROJECT_PATH, geometry.project_path());
    form.set(GEOMETRY_COMMIT_HASH, geometry.commit_hash());
    form.set(GEOMETRY_PATH, geometry.path.clone().unwrap_or_default());

    let parameters = &request.parameters_source;
    form.set(PARAMETERS_PROJECT_PATH, parameters.project_path());
    form.set(PARAMETERS_COMMIT_HASH, parameters.commit_hash());
    if let Some(path) = &parameters.path {
        form.set(PARAMETERS_PATH, path.clone());
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_empty_for_missing_keys() {
        let form: FormValues = [("a", "1")].into_iter().collect();
        assert_eq!(form.text("a"), "1");
        assert_eq!(form.text("b"), "");
        assert!(!form.contains("b"));
    }

    #[test]
    fn yaml_is_a_plain_mapping() {
        let form: FormValues =
            serde_yaml::from_str("target_project: k-300\nmass_flow_air: '0.5'\n").unwrap();
        assert_eq!(form.text(TARGET_PROJECT), "k-300");
        assert_eq!(form.text("mass_flow_air"), "0.5");
    }
}
