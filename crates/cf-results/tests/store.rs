use cf_core::StrategyId;
use cf_results::{ResultDocument, ResultManifest, ResultStore, ResultsError};
use serde_json::json;

fn document() -> ResultDocument {
    serde_json::from_value(json!({
        "schema_version": "1.2",
        "input_commit_hash": "d4e5f6",
        "calculation_strategy": "vku",
        "_meta": {
            "target_project": {"path": "turbines/t-100", "attributes": {}},
            "sources": {
                "geometry": {"project_path": "g", "commit_hash": "a1", "path": "geom.json"},
                "parameters": {"project_path": "p", "commit_hash": "d4e5f6", "path": null}
            }
        },
        "results": {"vku_results": {"pressure_flow_path_1": 0.0875}}
    }))
    .unwrap()
}

fn manifest(task_id: &str, digest: &str, timestamp: &str) -> ResultManifest {
    ResultManifest {
        task_id: task_id.to_string(),
        strategy: StrategyId::Vku,
        request_digest: digest.to_string(),
        timestamp: timestamp.to_string(),
    }
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path().join("results")).unwrap();

    let m = ResultManifest::new("task-abc123xyz", StrategyId::Vku, "digest-1".to_string());
    let path = store.save_result(&m, &document()).unwrap();

    assert!(path.ends_with("condenser_results_task-abc123xyz.json"));
    assert!(store.has_result("task-abc123xyz"));
    assert_eq!(store.load_result("task-abc123xyz").unwrap(), document());
    assert_eq!(store.load_manifest("task-abc123xyz").unwrap(), m);
}

#[test]
fn missing_entry_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path().to_path_buf()).unwrap();

    assert!(!store.has_result("task-nope"));
    assert!(matches!(
        store.load_result("task-nope"),
        Err(ResultsError::ResultNotFound { .. })
    ));
}

#[test]
fn find_by_digest_returns_latest() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path().to_path_buf()).unwrap();

    store
        .save_result(&manifest("task-1", "same", "2026-01-01T00:00:00+00:00"), &document())
        .unwrap();
    store
        .save_result(&manifest("task-2", "same", "2026-01-02T00:00:00+00:00"), &document())
        .unwrap();
    store
        .save_result(&manifest("task-3", "other", "2026-01-03T00:00:00+00:00"), &document())
        .unwrap();

    let hit = store.find_by_digest("same").unwrap().unwrap();
    assert_eq!(hit.task_id, "task-2");
    assert!(store.find_by_digest("absent").unwrap().is_none());

    let ids: Vec<_> = store
        .list_results()
        .unwrap()
        .into_iter()
        .map(|m| m.task_id)
        .collect();
    assert_eq!(ids, vec!["task-1", "task-2", "task-3"]);
}

#[test]
fn delete_removes_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path().to_path_buf()).unwrap();

    store
        .save_result(&manifest("task-1", "d", "2026-01-01T00:00:00+00:00"), &document())
        .unwrap();
    store.delete_result("task-1").unwrap();
    assert!(!store.has_result("task-1"));
    // Deleting twice is fine.
    store.delete_result("task-1").unwrap();
}

#[test]
fn task_ids_cannot_leave_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("results");
    let store = ResultStore::new(root.clone()).unwrap();

    for task_id in ["../x", "..", "a/b", "a\\b", ""] {
        let err = store
            .save_result(&manifest(task_id, "d", "2026-01-01T00:00:00+00:00"), &document())
            .unwrap_err();
        assert!(matches!(err, ResultsError::InvalidTaskId { .. }), "{task_id:?}: {err}");
        assert!(matches!(
            store.delete_result(task_id),
            Err(ResultsError::InvalidTaskId { .. })
        ));
        assert!(store.result_path(task_id).is_err());
        assert!(!store.has_result(task_id));
    }

    assert!(!dir.path().join("x").exists());
    assert!(store.list_results().unwrap().is_empty());
}
