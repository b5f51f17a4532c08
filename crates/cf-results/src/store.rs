//! Local result storage.
//!
//! Layout: `<root>/<task_id>/manifest.json` and
//! `<root>/<task_id>/condenser_results_<task_id>.json`.

use crate::types::{ResultDocument, ResultManifest};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct ResultStore {
    root_dir: PathBuf,
}

impl ResultStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Task ids come from the service and name a directory under the root,
    /// so anything that could leave it is refused.
    fn task_dir(&self, task_id: &str) -> ResultsResult<PathBuf> {
        if task_id.is_empty() || task_id.contains(['/', '\\']) || task_id.contains("..") {
            return Err(ResultsError::InvalidTaskId {
                task_id: task_id.to_string(),
            });
        }
        Ok(self.root_dir.join(task_id))
    }

    /// Path of the saved result document for `task_id`.
    pub fn result_path(&self, task_id: &str) -> ResultsResult<PathBuf> {
        Ok(self.task_dir(task_id)?.join(format!("condenser_results_{task_id}.json")))
    }

    pub fn has_result(&self, task_id: &str) -> bool {
        self.task_dir(task_id).is_ok_and(|dir| dir.join("manifest.json").exists())
    }

    pub fn save_result(
        &self,
        manifest: &ResultManifest,
        document: &ResultDocument,
    ) -> ResultsResult<PathBuf> {
        let task_dir = self.task_dir(&manifest.task_id)?;
        fs::create_dir_all(&task_dir)?;

        let document_path = self.result_path(&manifest.task_id)?;
        fs::write(&document_path, serde_json::to_string_pretty(document)?)?;

        // Manifest last: its presence marks the entry complete.
        let manifest_path = task_dir.join("manifest.json");
        fs::write(manifest_path, serde_json::to_string_pretty(manifest)?)?;

        Ok(document_path)
    }

    pub fn load_manifest(&self, task_id: &str) -> ResultsResult<ResultManifest> {
        let manifest_path = self.task_dir(task_id)?.join("manifest.json");

        if !manifest_path.exists() {
            return Err(ResultsError::ResultNotFound {
                task_id: task_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_result(&self, task_id: &str) -> ResultsResult<ResultDocument> {
        let document_path = self.result_path(task_id)?;

        if !document_path.exists() {
            return Err(ResultsError::ResultNotFound {
                task_id: task_id.to_string(),
            });
        }

        let content = fs::read_to_string(document_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// All complete entries, oldest first.
    pub fn list_results(&self) -> ResultsResult<Vec<ResultManifest>> {
        let mut manifests = Vec::new();

        if !self.root_dir.exists() {
            return Ok(manifests);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let task_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&task_id) {
                    manifests.push(manifest);
                }
            }
        }

        manifests.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(manifests)
    }

    /// Most recent entry produced by a request with this digest.
    pub fn find_by_digest(&self, request_digest: &str) -> ResultsResult<Option<ResultManifest>> {
        Ok(self
            .list_results()?
            .into_iter()
            .rev()
            .find(|m| m.request_digest == request_digest))
    }

    pub fn delete_result(&self, task_id: &str) -> ResultsResult<()> {
        let task_dir = self.task_dir(task_id)?;
        if task_dir.exists() {
            fs::remove_dir_all(task_dir)?;
        }
        Ok(())
    }
}
