//! Task queue collaborator.
//!
//! Everything the controller needs from the outside world goes through
//! [`TaskBackend`]. Implementations: [`crate::http::HttpBackend`] and
//! [`crate::simulated::SimulatedBackend`].

use async_trait::async_trait;
use cf_project::CalculationRequest;
use cf_results::ResultDocument;
use serde::{Deserialize, Serialize};

use crate::task::TaskState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    pub state: TaskState,
    #[serde(default)]
    pub progress: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    /// A 2xx reply without the field counts as acknowledged.
    #[serde(default = "acknowledged_by_default")]
    pub acknowledged: bool,
}

fn acknowledged_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(alias = "gitlab_repo_path")]
    pub path: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDescriptor {
    #[serde(alias = "id")]
    pub commit_hash: String,
    #[serde(alias = "title")]
    pub message: String,
    #[serde(default, alias = "author_name")]
    pub author: Option<String>,
    #[serde(default, alias = "committed_date")]
    pub committed_at: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Submission failed (HTTP {status}): {message}")]
    Submission { status: u16, message: String },

    #[error("Status poll failed: {message}")]
    Poll { message: String },

    #[error("Result fetch failed: {message}")]
    ResultFetch { message: String },

    #[error("Cancel request failed: {message}")]
    Cancel { message: String },

    #[error("Project catalog request failed: {message}")]
    Catalog { message: String },
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn submit_task(&self, request: &CalculationRequest) -> BackendResult<SubmitResponse>;

    async fn poll_task(&self, task_id: &str) -> BackendResult<PollResponse>;

    async fn fetch_result(&self, task_id: &str) -> BackendResult<ResultDocument>;

    async fn cancel_task(&self, task_id: &str) -> BackendResult<CancelResponse>;

    async fn list_projects(&self) -> BackendResult<Vec<ProjectDescriptor>>;

    async fn file_history(
        &self,
        project_path: &str,
        file_path: &str,
    ) -> BackendResult<Vec<CommitDescriptor>>;

    async fn file_content(
        &self,
        project_path: &str,
        commit_hash: &str,
        file_path: &str,
    ) -> BackendResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_response_progress_defaults_to_zero() {
        let r: PollResponse = serde_json::from_str(r#"{"state": "PENDING"}"#).unwrap();
        assert_eq!(r.progress, 0);
        assert_eq!(r.state, TaskState::Pending);
    }

    #[test]
    fn bare_cancel_reply_is_an_acknowledgement() {
        let r: CancelResponse = serde_json::from_str(r#"{"status": "revoked"}"#).unwrap();
        assert!(r.acknowledged);
        let r: CancelResponse = serde_json::from_str(r#"{"acknowledged": false}"#).unwrap();
        assert!(!r.acknowledged);
    }

    #[test]
    fn descriptors_accept_repository_field_names() {
        let p: ProjectDescriptor =
            serde_json::from_str(r#"{"name": "K-300", "gitlab_repo_path": "turbines/k-300"}"#)
                .unwrap();
        assert_eq!(p.path, "turbines/k-300");

        let c: CommitDescriptor = serde_json::from_str(
            r#"{"id": "a1b2", "title": "Update geometry", "author_name": "ops"}"#,
        )
        .unwrap();
        assert_eq!(c.commit_hash, "a1b2");
        assert_eq!(c.author.as_deref(), Some("ops"));
    }
}
