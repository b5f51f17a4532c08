//! Fetching, storing and summarising calculation results.

use std::path::PathBuf;

use cf_core::StrategyId;
use cf_project::{CalculationRequest, request_digest};
use cf_results::{ResultDocument, ResultManifest, ResultStore, display_value, unpack_result};
use tracing::{debug, info};

use crate::backend::TaskBackend;
use crate::config::ClientConfig;
use crate::controller::TaskController;
use crate::error::{AppError, AppResult};

/// Decoded result block, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub strategy: StrategyId,
    pub target_project: String,
    pub input_commit_hash: String,
    /// Result entries in document order, as display strings.
    pub values: Vec<(String, String)>,
}

/// A stored result that matches a request.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub manifest: ResultManifest,
    pub document: ResultDocument,
}

pub fn open_store(config: &ClientConfig) -> AppResult<ResultStore> {
    Ok(ResultStore::new(config.results_dir.clone())?)
}

/// Decode `document` as a result of `strategy`.
pub fn summarize(strategy: StrategyId, document: &ResultDocument) -> AppResult<ResultSummary> {
    let block = unpack_result(strategy, document)?;
    Ok(ResultSummary {
        strategy,
        target_project: document.meta.target_project.path.clone(),
        input_commit_hash: document.input_commit_hash.clone(),
        values: block
            .iter()
            .map(|(name, value)| (name.to_string(), display_value(value)))
            .collect(),
    })
}

pub fn store_result(
    store: &ResultStore,
    task_id: &str,
    request: &CalculationRequest,
    document: &ResultDocument,
) -> AppResult<PathBuf> {
    let manifest = ResultManifest::new(
        task_id,
        request.calculation_strategy,
        request_digest(request),
    );
    let path = store.save_result(&manifest, document)?;
    info!(task_id, path = %path.display(), "result stored");
    Ok(path)
}

/// Most recent stored result computed from an identical request.
pub fn cached_result(
    store: &ResultStore,
    request: &CalculationRequest,
) -> AppResult<Option<CachedResult>> {
    let digest = request_digest(request);
    let Some(manifest) = store.find_by_digest(&digest)? else {
        debug!(%digest, "no cached result");
        return Ok(None);
    };
    let document = store.load_result(&manifest.task_id)?;
    Ok(Some(CachedResult { manifest, document }))
}

/// Fetch the finished task's result and, when the controller submitted the
/// request itself, store it.
pub async fn download_result<B: TaskBackend + ?Sized>(
    controller: &TaskController<B>,
    store: &ResultStore,
) -> AppResult<(ResultDocument, Option<PathBuf>)> {
    let document = controller.fetch_result().await?;
    let task_id = controller
        .record()
        .map(|record| record.task_id.clone())
        .ok_or(AppError::NoActiveTask)?;

    let saved = match controller.request() {
        Some(request) => Some(store_result(store, &task_id, request, &document)?),
        None => None,
    };
    Ok((document, saved))
}

/// Result of `task_id`: from the store if present, else from the backend.
pub async fn lookup_result<B: TaskBackend + ?Sized>(
    backend: &B,
    store: &ResultStore,
    task_id: &str,
) -> AppResult<ResultDocument> {
    if store.has_result(task_id) {
        debug!(task_id, "result served from store");
        return Ok(store.load_result(task_id)?);
    }
    Ok(backend.fetch_result(task_id).await?)
}
