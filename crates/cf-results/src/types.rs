//! Result document (`condenser_results.json`) and store manifest types.

use cf_core::StrategyId;
use cf_project::{CalculationRequest, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type TaskId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultDocument {
    pub schema_version: String,
    pub input_commit_hash: String,
    pub calculation_strategy: StrategyId,
    #[serde(rename = "_meta")]
    pub meta: ResultMeta,
    /// Exactly one strategy result block is expected, keyed by the
    /// registry's result key.
    pub results: Map<String, Value>,
}

impl ResultDocument {
    /// Envelope for results computed from `request`. The input commit is
    /// the parameters source commit.
    pub fn for_request(request: &CalculationRequest, results: Map<String, Value>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            input_commit_hash: request.parameters_source.commit_hash().to_string(),
            calculation_strategy: request.calculation_strategy,
            meta: ResultMeta {
                target_project: TargetProjectMeta {
                    path: request.target_project_path().to_string(),
                    attributes: Map::new(),
                },
                sources: SourcesMeta {
                    geometry: SourceDetails::from_reference(&request.geometry_source),
                    parameters: SourceDetails::from_reference(&request.parameters_source),
                },
            },
            results,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultMeta {
    pub target_project: TargetProjectMeta,
    pub sources: SourcesMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetProjectMeta {
    pub path: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcesMeta {
    pub geometry: SourceDetails,
    pub parameters: SourceDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDetails {
    pub project_path: String,
    pub commit_hash: String,
    #[serde(default)]
    pub path: Option<String>,
}

impl SourceDetails {
    pub fn from_reference(source: &cf_project::SourceReference) -> Self {
        Self {
            project_path: source.project_path().to_string(),
            commit_hash: source.commit_hash().to_string(),
            path: source.path.clone(),
        }
    }
}

/// Bookkeeping stored next to each saved result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultManifest {
    pub task_id: TaskId,
    pub strategy: StrategyId,
    pub request_digest: String,
    pub timestamp: String,
}

impl ResultManifest {
    pub fn new(task_id: impl Into<TaskId>, strategy: StrategyId, request_digest: String) -> Self {
        Self {
            task_id: task_id.into(),
            strategy,
            request_digest,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
