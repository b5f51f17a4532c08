//! Service layer for condenserflow.
//!
//! Owns the task lifecycle (submit, poll, cancel, fetch), the task backend
//! seam with its HTTP and simulated implementations, client configuration,
//! and the request/result services the CLI is built on.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod progress;
pub mod request_service;
pub mod result_service;
pub mod schedule;
pub mod simulated;
pub mod task;

pub use backend::{
    BackendError, BackendResult, CancelResponse, CommitDescriptor, PollResponse,
    ProjectDescriptor, SubmitResponse, TaskBackend,
};
pub use config::{BackendConfig, ClientConfig};
pub use controller::{PollOptions, TaskController};
pub use error::{AppError, AppResult};
pub use http::HttpBackend;
pub use lifecycle::{TaskLifecycle, TaskPhase, TickDecision, TickOutcome};
pub use progress::TaskEvent;
pub use request_service::{
    FieldSummary, ImportedConfiguration, StrategySummary, build_request_from_form,
    list_strategies, parse_configuration, prepare_request, read_configuration, read_request,
    write_request,
};
pub use result_service::{
    CachedResult, ResultSummary, cached_result, download_result, lookup_result, open_store,
    store_result, summarize,
};
pub use schedule::{PollExit, PollHandle, PollOutcome};
pub use simulated::{SimulatedBackend, SimulationOptions};
pub use task::{TaskRecord, TaskState};
