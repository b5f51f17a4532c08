//! HTTP client for the condenser calculation service.

use std::time::Duration;

use async_trait::async_trait;
use cf_project::CalculationRequest;
use cf_results::ResultDocument;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::backend::{
    BackendError, BackendResult, CancelResponse, CommitDescriptor, PollResponse,
    ProjectDescriptor, SubmitResponse, TaskBackend,
};
use crate::error::{AppError, AppResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Why a call failed, before it is mapped onto the operation's error.
#[derive(Debug)]
enum CallFailure {
    Status { status: u16, body: String },
    Transport(String),
    Decode(String),
}

impl CallFailure {
    fn status(&self) -> u16 {
        match self {
            CallFailure::Status { status, .. } => *status,
            CallFailure::Transport(_) | CallFailure::Decode(_) => 0,
        }
    }

    fn message(&self) -> String {
        match self {
            CallFailure::Status { status, body } if body.is_empty() => format!("HTTP {status}"),
            CallFailure::Status { status, body } => format!("HTTP {status}: {body}"),
            CallFailure::Transport(message) => message.clone(),
            CallFailure::Decode(message) => format!("unexpected response body: {message}"),
        }
    }
}

impl From<reqwest::Error> for CallFailure {
    fn from(err: reqwest::Error) -> Self {
        CallFailure::Transport(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AppError::Config(format!("invalid base url {base_url:?}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "base url cannot carry a path: {base_url}"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` + `/api/v1/` + segments. Each segment is percent-encoded,
    /// so a `/` inside one stays part of that segment.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    async fn call<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, CallFailure> {
        let response = request.send().await?;
        let body = Self::checked_body(response).await?;
        serde_json::from_str(&body).map_err(|err| CallFailure::Decode(err.to_string()))
    }

    async fn call_text(request: RequestBuilder) -> Result<String, CallFailure> {
        let response = request.send().await?;
        Self::checked_body(response).await
    }

    async fn checked_body(response: Response) -> Result<String, CallFailure> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CallFailure::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(body)
    }
}

fn catalog_error(failure: CallFailure) -> BackendError {
    BackendError::Catalog {
        message: failure.message(),
    }
}

#[async_trait]
impl TaskBackend for HttpBackend {
    #[instrument(level = "debug", skip_all, fields(strategy = %request.calculation_strategy))]
    async fn submit_task(&self, request: &CalculationRequest) -> BackendResult<SubmitResponse> {
        let url = self.endpoint(["tasks", "condenser"]);
        debug!(%url, "POST");
        Self::call(self.client.post(url).json(request))
            .await
            .map_err(|failure| BackendError::Submission {
                status: failure.status(),
                message: failure.message(),
            })
    }

    #[instrument(level = "debug", skip(self))]
    async fn poll_task(&self, task_id: &str) -> BackendResult<PollResponse> {
        let url = self.endpoint(["tasks", task_id, "status"]);
        Self::call(self.client.get(url))
            .await
            .map_err(|failure| BackendError::Poll {
                message: failure.message(),
            })
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_result(&self, task_id: &str) -> BackendResult<ResultDocument> {
        let url = self.endpoint(["tasks", task_id, "results"]);
        Self::call(self.client.get(url))
            .await
            .map_err(|failure| BackendError::ResultFetch {
                message: failure.message(),
            })
    }

    #[instrument(level = "debug", skip(self))]
    async fn cancel_task(&self, task_id: &str) -> BackendResult<CancelResponse> {
        let url = self.endpoint(["tasks", task_id, "cancel"]);
        Self::call(self.client.post(url))
            .await
            .map_err(|failure| BackendError::Cancel {
                message: failure.message(),
            })
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_projects(&self) -> BackendResult<Vec<ProjectDescriptor>> {
        let url = self.endpoint(["projects"]);
        Self::call(self.client.get(url)).await.map_err(catalog_error)
    }

    #[instrument(level = "debug", skip(self))]
    async fn file_history(
        &self,
        project_path: &str,
        file_path: &str,
    ) -> BackendResult<Vec<CommitDescriptor>> {
        // The project path keeps its slashes; the file path is one segment.
        let segments = std::iter::once("projects")
            .chain(project_path.split('/').filter(|s| !s.is_empty()))
            .chain(["files", file_path, "history"]);
        let url = self.endpoint(segments);
        Self::call(self.client.get(url)).await.map_err(catalog_error)
    }

    #[instrument(level = "debug", skip(self))]
    async fn file_content(
        &self,
        project_path: &str,
        commit_hash: &str,
        file_path: &str,
    ) -> BackendResult<String> {
        let mut url = self.endpoint(["files", "content"]);
        url.query_pairs_mut()
            .append_pair("project_path", project_path)
            .append_pair("commit_hash", commit_hash)
            .append_pair("file_path", file_path);
        Self::call_text(self.client.get(url)).await.map_err(catalog_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoints_are_rooted_at_api_v1() {
        let b = backend("http://localhost:8000");
        assert_eq!(
            b.endpoint(["tasks", "condenser"]).as_str(),
            "http://localhost:8000/api/v1/tasks/condenser"
        );
        let b = backend("https://calc.example.org/condenser/");
        assert_eq!(
            b.endpoint(["tasks", "task-abc", "status"]).as_str(),
            "https://calc.example.org/condenser/api/v1/tasks/task-abc/status"
        );
    }

    #[test]
    fn file_segment_is_encoded_whole() {
        let b = backend("http://localhost:8000");
        let url = b.endpoint([
            "projects",
            "turbines",
            "k-300",
            "files",
            "data/geom.json",
            "history",
        ]);
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/v1/projects/turbines/k-300/files/data%2Fgeom.json/history"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            HttpBackend::new("not a url", Duration::from_secs(1)),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            HttpBackend::new("mailto:ops@example.org", Duration::from_secs(1)),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn failure_messages_carry_status() {
        let f = CallFailure::Status {
            status: 422,
            body: "bad strategy".into(),
        };
        assert_eq!(f.status(), 422);
        assert_eq!(f.message(), "HTTP 422: bad strategy");
        assert_eq!(CallFailure::Transport("refused".into()).status(), 0);
    }
}
