//! Local simulation of the task queue.
//!
//! Progress advances by a fixed step on every poll; at 100 the task succeeds
//! and a canned result document for its strategy becomes available.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use cf_core::{StrategyId, result_key_for};
use cf_project::CalculationRequest;
use cf_results::ResultDocument;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::backend::{
    BackendError, BackendResult, CancelResponse, CommitDescriptor, PollResponse,
    ProjectDescriptor, SubmitResponse, TaskBackend,
};
use crate::task::{COMPLETE_PROGRESS, TaskState};

pub const DEFAULT_STEP: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationOptions {
    pub step: u8,
    /// Turn the task into FAILURE once progress reaches this value.
    pub fail_at_progress: Option<u8>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            fail_at_progress: None,
        }
    }
}

#[derive(Debug)]
struct SimulatedTask {
    request: CalculationRequest,
    state: TaskState,
    progress: u8,
    polls: u32,
}

#[derive(Debug, Default)]
pub struct SimulatedBackend {
    options: SimulationOptions,
    tasks: Mutex<HashMap<String, SimulatedTask>>,
}

impl SimulatedBackend {
    pub fn new(options: SimulationOptions) -> Self {
        Self {
            options,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, SimulatedTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of status polls received for `task_id`.
    pub fn poll_count(&self, task_id: &str) -> Option<u32> {
        self.tasks().get(task_id).map(|task| task.polls)
    }

    pub fn task_state(&self, task_id: &str) -> Option<TaskState> {
        self.tasks().get(task_id).map(|task| task.state)
    }
}

fn new_task_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("task-{}", &id[..9])
}

/// Canned result block for a strategy.
pub fn mock_results(strategy: StrategyId) -> Map<String, Value> {
    let block = match strategy {
        StrategyId::Berman => json!({
            "main_results": [
                {
                    "condenser_pressure_Pa": 4521.3,
                    "saturation_temperature_C": 30.8,
                    "undercooling_main_bundle_C": 2.1,
                    "undercooling_built_in_bundle_C": 0.0
                },
                {
                    "condenser_pressure_Pa": 4832.7,
                    "saturation_temperature_C": 31.5,
                    "undercooling_main_bundle_C": 2.3,
                    "undercooling_built_in_bundle_C": 0.0
                }
            ],
            "ejector_results": []
        }),
        StrategyId::MetroVickers => json!({
            "pressure_flow_path_1": 0.0461,
            "temperature_saturation_steam": 30.85,
            "speed_cooling_water": 1.87,
            "coefficient_K": 3842.5,
            "coefficient_R": 0.00012,
            "temperature_cooling_water_2": 23.8
        }),
        StrategyId::Vku => json!({
            "pressure_flow_path_1": 0.0875,
            "mass_flow_reduced_steam_condencer": 89.47
        }),
    };

    let mut results = Map::new();
    results.insert(result_key_for(strategy).to_string(), block);
    results
}

#[async_trait]
impl TaskBackend for SimulatedBackend {
    async fn submit_task(&self, request: &CalculationRequest) -> BackendResult<SubmitResponse> {
        let task_id = new_task_id();
        debug!(task_id = %task_id, "simulated submit");
        self.tasks().insert(
            task_id.clone(),
            SimulatedTask {
                request: request.clone(),
                state: TaskState::Pending,
                progress: 0,
                polls: 0,
            },
        );
        Ok(SubmitResponse {
            task_id,
            status: Some(TaskState::Pending.to_string()),
        })
    }

    async fn poll_task(&self, task_id: &str) -> BackendResult<PollResponse> {
        let mut tasks = self.tasks();
        let task = tasks.get_mut(task_id).ok_or_else(|| BackendError::Poll {
            message: format!("unknown task {task_id}"),
        })?;
        task.polls += 1;

        if !task.state.is_terminal() {
            task.progress = task
                .progress
                .saturating_add(self.options.step)
                .min(COMPLETE_PROGRESS);
            task.state = match self.options.fail_at_progress {
                Some(limit) if task.progress >= limit => TaskState::Failure,
                _ => TaskState::for_progress(task.progress),
            };
        }

        Ok(PollResponse {
            state: task.state,
            progress: task.progress,
        })
    }

    async fn fetch_result(&self, task_id: &str) -> BackendResult<ResultDocument> {
        let tasks = self.tasks();
        let task = tasks.get(task_id).ok_or_else(|| BackendError::ResultFetch {
            message: format!("unknown task {task_id}"),
        })?;
        if task.state != TaskState::Success {
            return Err(BackendError::ResultFetch {
                message: format!("task {task_id} is {}", task.state),
            });
        }
        let strategy = task.request.calculation_strategy;
        Ok(ResultDocument::for_request(&task.request, mock_results(strategy)))
    }

    async fn cancel_task(&self, task_id: &str) -> BackendResult<CancelResponse> {
        let mut tasks = self.tasks();
        let task = tasks.get_mut(task_id).ok_or_else(|| BackendError::Cancel {
            message: format!("unknown task {task_id}"),
        })?;
        if task.state.is_terminal() {
            return Ok(CancelResponse {
                acknowledged: false,
            });
        }
        task.state = TaskState::Cancelled;
        Ok(CancelResponse { acknowledged: true })
    }

    async fn list_projects(&self) -> BackendResult<Vec<ProjectDescriptor>> {
        Ok(vec![
            ProjectDescriptor {
                id: Some("1".to_string()),
                name: "K-300 condenser geometry".to_string(),
                path: "turbines/k-300-geometry".to_string(),
                description: Some("Tube bundle layout".to_string()),
            },
            ProjectDescriptor {
                id: Some("2".to_string()),
                name: "K-300 operating parameters".to_string(),
                path: "turbines/k-300-parameters".to_string(),
                description: None,
            },
        ])
    }

    async fn file_history(
        &self,
        project_path: &str,
        file_path: &str,
    ) -> BackendResult<Vec<CommitDescriptor>> {
        if !self.list_projects().await?.iter().any(|p| p.path == project_path) {
            return Err(BackendError::Catalog {
                message: format!("project not found: {project_path}"),
            });
        }
        Ok(vec![
            CommitDescriptor {
                commit_hash: "9f2c41d7e0".to_string(),
                message: format!("Update {file_path}"),
                author: Some("simulator".to_string()),
                committed_at: Some("2024-03-02T10:15:00Z".to_string()),
            },
            CommitDescriptor {
                commit_hash: "3a7be0c512".to_string(),
                message: format!("Add {file_path}"),
                author: Some("simulator".to_string()),
                committed_at: Some("2024-02-11T08:40:00Z".to_string()),
            },
        ])
    }

    async fn file_content(
        &self,
        project_path: &str,
        commit_hash: &str,
        file_path: &str,
    ) -> BackendResult<String> {
        let history = self.file_history(project_path, file_path).await?;
        if !history.iter().any(|c| c.commit_hash == commit_hash) {
            return Err(BackendError::Catalog {
                message: format!("{file_path} has no revision {commit_hash}"),
            });
        }
        let body = json!({
            "project_path": project_path,
            "commit_hash": commit_hash,
            "path": file_path,
        });
        serde_json::to_string_pretty(&body).map_err(|err| BackendError::Catalog {
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_project::{FormValues, build, form};

    fn request(strategy: StrategyId) -> CalculationRequest {
        let form: FormValues = [
            (form::TARGET_PROJECT, "turbines/k-300"),
            (form::GEOMETRY_PROJECT_PATH, "turbines/k-300-geometry"),
            (form::GEOMETRY_COMMIT_HASH, "9f2c41d7e0"),
            (form::GEOMETRY_PATH, "geometry.json"),
            (form::PARAMETERS_PROJECT_PATH, "turbines/k-300-parameters"),
            (form::PARAMETERS_COMMIT_HASH, "3a7be0c512"),
            ("mass_flow_flow_path_1", "120"),
        ]
        .into_iter()
        .collect();
        build(&form, strategy)
    }

    #[tokio::test]
    async fn task_ids_have_fixed_shape() {
        let backend = SimulatedBackend::default();
        let id = backend.submit_task(&request(StrategyId::Vku)).await.unwrap().task_id;
        assert_eq!(id.len(), 14);
        assert!(id.starts_with("task-"));
        assert!(id[5..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn progresses_to_success_with_results() {
        let backend = SimulatedBackend::new(SimulationOptions::default());
        let id = backend.submit_task(&request(StrategyId::Vku)).await.unwrap().task_id;

        let mut last = PollResponse {
            state: TaskState::Pending,
            progress: 0,
        };
        for _ in 0..10 {
            last = backend.poll_task(&id).await.unwrap();
        }
        assert_eq!(last.state, TaskState::Success);
        assert_eq!(last.progress, 100);

        let doc = backend.fetch_result(&id).await.unwrap();
        assert_eq!(doc.calculation_strategy, StrategyId::Vku);
        assert_eq!(doc.results["vku_results"]["pressure_flow_path_1"], json!(0.0875));
    }

    #[tokio::test]
    async fn result_unavailable_before_success() {
        let backend = SimulatedBackend::default();
        let id = backend.submit_task(&request(StrategyId::Berman)).await.unwrap().task_id;
        backend.poll_task(&id).await.unwrap();
        assert!(matches!(
            backend.fetch_result(&id).await,
            Err(BackendError::ResultFetch { .. })
        ));
    }

    #[tokio::test]
    async fn failure_injection() {
        let backend = SimulatedBackend::new(SimulationOptions {
            step: 25,
            fail_at_progress: Some(50),
        });
        let id = backend.submit_task(&request(StrategyId::Vku)).await.unwrap().task_id;
        assert_eq!(backend.poll_task(&id).await.unwrap().state, TaskState::Pending);
        let r = backend.poll_task(&id).await.unwrap();
        assert_eq!((r.state, r.progress), (TaskState::Failure, 50));
        // Terminal tasks stop advancing.
        assert_eq!(backend.poll_task(&id).await.unwrap().progress, 50);
    }

    #[tokio::test]
    async fn cancel_only_acknowledged_while_running() {
        let backend = SimulatedBackend::default();
        let id = backend.submit_task(&request(StrategyId::Vku)).await.unwrap().task_id;
        assert!(backend.cancel_task(&id).await.unwrap().acknowledged);
        assert_eq!(backend.task_state(&id), Some(TaskState::Cancelled));
        assert!(!backend.cancel_task(&id).await.unwrap().acknowledged);
        assert!(backend.cancel_task("task-missing").await.is_err());
    }

    #[tokio::test]
    async fn catalog_lookups() {
        let backend = SimulatedBackend::default();
        let projects = backend.list_projects().await.unwrap();
        assert_eq!(projects.len(), 2);

        let history = backend
            .file_history("turbines/k-300-geometry", "geometry.json")
            .await
            .unwrap();
        let content = backend
            .file_content("turbines/k-300-geometry", &history[0].commit_hash, "geometry.json")
            .await
            .unwrap();
        assert!(content.contains("geometry.json"));

        assert!(matches!(
            backend.file_history("nope", "geometry.json").await,
            Err(BackendError::Catalog { .. })
        ));
    }
}
