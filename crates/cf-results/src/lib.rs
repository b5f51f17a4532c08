//! cf-results: result documents, decoding back into the form, and local storage.

pub mod decode;
pub mod store;
pub mod types;

pub use decode::{display_value, repopulate, unpack_result};
pub use store::ResultStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Result shape mismatch for {strategy}: {reason}")]
    ResultShapeMismatch { strategy: String, reason: String },

    #[error("Result not found: {task_id}")]
    ResultNotFound { task_id: String },

    #[error("Invalid task id for the result store: {task_id:?}")]
    InvalidTaskId { task_id: String },
}
