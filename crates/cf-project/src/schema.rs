//! Calculation request document (`condenser_input.json`).

use std::fmt;

use cf_core::StrategyId;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

/// Document generation written by [`crate::build`].
pub const SCHEMA_VERSION: &str = "1.2";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationRequest {
    #[serde(default = "current_schema_version")]
    pub schema_version: String,
    #[serde(rename = "_meta")]
    pub meta: RequestMeta,
    pub geometry_source: SourceReference,
    #[serde(deserialize_with = "optional_path_source")]
    pub parameters_source: SourceReference,
    pub calculation_strategy: StrategyId,
    pub parameters: ParameterBlock,
}

fn current_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl CalculationRequest {
    pub fn target_project_path(&self) -> &str {
        &self.meta.target_project_path
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestMeta {
    pub target_project_path: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Reference,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceInfo {
    pub project_path: String,
    pub commit_hash: String,
}

/// A versioned artifact inside a version-controlled project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceReference {
    #[serde(rename = "type", default)]
    pub kind: SourceKind,
    pub source_info: SourceInfo,
    pub path: Option<String>,
    /// Not on the wire: set by role (geometry requires a path, parameters do not).
    #[serde(skip)]
    pub path_optional: bool,
}

impl SourceReference {
    pub fn geometry(
        project_path: impl Into<String>,
        commit_hash: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            kind: SourceKind::Reference,
            source_info: SourceInfo {
                project_path: project_path.into(),
                commit_hash: commit_hash.into(),
            },
            path: Some(path.into()),
            path_optional: false,
        }
    }

    pub fn parameters(
        project_path: impl Into<String>,
        commit_hash: impl Into<String>,
        path: Option<String>,
    ) -> Self {
        Self {
            kind: SourceKind::Reference,
            source_info: SourceInfo {
                project_path: project_path.into(),
                commit_hash: commit_hash.into(),
            },
            path,
            path_optional: true,
        }
    }

    pub fn project_path(&self) -> &str {
        &self.source_info.project_path
    }

    pub fn commit_hash(&self) -> &str {
        &self.source_info.commit_hash
    }
}

fn optional_path_source<'de, D>(deserializer: D) -> Result<SourceReference, D::Error>
where
    D: Deserializer<'de>,
{
    let mut source = SourceReference::deserialize(deserializer)?;
    source.path_optional = true;
    Ok(source)
}

/// One entry of a parameter or result block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParameterValue {
    /// A number, or `null` when a scalar had neither input nor default.
    Scalar(Option<Number>),
    List(Vec<Number>),
    /// Anything else the backend put in the block (nested rows, strings).
    Other(serde_json::Value),
}

impl ParameterValue {
    pub fn scalar(value: Option<f64>) -> Self {
        ParameterValue::Scalar(value.and_then(wire_number))
    }

    pub fn list(values: &[f64]) -> Self {
        ParameterValue::List(values.iter().filter_map(|v| wire_number(*v)).collect())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Scalar(Some(n)) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<Vec<f64>> {
        match self {
            ParameterValue::List(items) => Some(items.iter().filter_map(Number::as_f64).collect()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParameterValue::Scalar(None))
    }
}

/// JSON number for a finite value. Integral values become integers so
/// documents read `1` and `20` rather than `1.0` and `20.0`.
pub fn wire_number(value: f64) -> Option<Number> {
    const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < EXACT_INT_LIMIT {
        // -0.0 collapses to 0 here, which is what the browser client wrote too.
        Some(Number::from(value as i64))
    } else {
        Number::from_f64(value)
    }
}

/// Insertion-ordered parameter map. Serializes as a JSON object and keeps
/// the document's key order on the way back in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBlock {
    entries: Vec<(String, ParameterValue)>,
}

impl ParameterBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: ParameterValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ParameterValue)> for ParameterBlock {
    fn from_iter<I: IntoIterator<Item = (K, ParameterValue)>>(iter: I) -> Self {
        let mut block = ParameterBlock::new();
        for (k, v) in iter {
            block.insert(k, v);
        }
        block
    }
}

impl Serialize for ParameterBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BlockVisitor;

        impl<'de> Visitor<'de> for BlockVisitor {
            type Value = ParameterBlock;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of parameter names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut block = ParameterBlock::new();
                while let Some((k, v)) = access.next_entry::<String, ParameterValue>()? {
                    block.insert(k, v);
                }
                Ok(block)
            }
        }

        deserializer.deserialize_map(BlockVisitor)
    }
}
