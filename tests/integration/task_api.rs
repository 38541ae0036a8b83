//! Integration tests for the task HTTP API.
//!
//! Runs a real server on `127.0.0.1:0` over an in-memory or on-disk store
//! and drives it through `HttpTaskApi`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use taskboard::api::{ApiError, TaskApi};
use taskboard::http::HttpTaskApi;
use taskboard_proto::api::{
    CreateTaskRequest, ERR_ID_REQUIRED, ERR_NOT_FOUND, ERR_UPDATE_PRIORITIES, ReorderItem,
    UpdateTaskRequest,
};
use taskboard_proto::task::{PreviousPriority, Task, TaskId};
use taskboard_server::http::start_server;
use taskboard_server::service::TaskService;
use taskboard_server::store::{self, SqliteStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn serve(store: SqliteStore) -> SocketAddr {
    let (addr, _handle) = start_server("127.0.0.1:0", TaskService::new(Arc::new(store)))
        .await
        .expect("failed to start server");
    addr
}

async fn start() -> HttpTaskApi {
    let addr = serve(SqliteStore::open_in_memory().unwrap()).await;
    HttpTaskApi::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap()
}

async fn create_all(api: &HttpTaskApi, titles: &[&str]) -> Vec<Task> {
    let mut tasks = Vec::new();
    for title in titles {
        tasks.push(api.create_task(&CreateTaskRequest::new(*title, None)).await.unwrap());
    }
    tasks
}

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.title.as_str()).collect()
}

fn status_and_message(err: ApiError) -> (u16, String) {
    match err {
        ApiError::Status { status, message } => (status, message),
        other => panic!("expected a status error, got {other:?}"),
    }
}

// ===========================================================================
// Create, list, update
// ===========================================================================

#[tokio::test]
async fn creates_are_numbered_in_order() {
    let api = start().await;
    let created = create_all(&api, &["one", "two", "three", "four"]).await;
    let priorities: Vec<u32> = created.iter().map(|t| t.priority).collect();
    assert_eq!(priorities, vec![0, 1, 2, 3]);
    assert_eq!(api.list_tasks().await.unwrap(), created);
}

#[tokio::test]
async fn api_prefix_serves_same_routes() {
    let addr = serve(SqliteStore::open_in_memory().unwrap()).await;
    let root = HttpTaskApi::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    let prefixed = HttpTaskApi::new(&format!("http://{addr}/api"), Duration::from_secs(5)).unwrap();

    root.create_task(&CreateTaskRequest::new("shared", None))
        .await
        .unwrap();
    assert_eq!(titles(&prefixed.list_tasks().await.unwrap()), vec!["shared"]);
}

#[tokio::test]
async fn seeded_categories_are_listed_by_name() {
    let store = SqliteStore::open_in_memory().unwrap();
    store::seed_default_categories(&store).await.unwrap();
    let addr = serve(store).await;
    let api = HttpTaskApi::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();

    let names: Vec<String> = api
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Health", "Home", "Study", "Work"]);
}

#[tokio::test]
async fn create_with_category_joins_it() {
    let store = SqliteStore::open_in_memory().unwrap();
    store::seed_default_categories(&store).await.unwrap();
    let addr = serve(store).await;
    let api = HttpTaskApi::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();

    let study = api
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.name == "Study")
        .unwrap();
    let task = api
        .create_task(&CreateTaskRequest::new("read chapter 3", Some(study.id)))
        .await
        .unwrap();
    assert_eq!(task.category, Some(study));
}

#[tokio::test]
async fn update_applies_only_present_fields() {
    let api = start().await;
    let task = create_all(&api, &["draft"]).await.remove(0);

    let updated = api
        .update_task(&UpdateTaskRequest::for_task(task.id).title("final"))
        .await
        .unwrap();
    assert_eq!(updated.title, "final");
    assert_eq!(updated.completed, task.completed);
    assert_eq!(updated.priority, task.priority);

    let updated = api
        .update_task(&UpdateTaskRequest::for_task(task.id).completed(true))
        .await
        .unwrap();
    assert_eq!(updated.title, "final");
    assert!(updated.completed);
}

#[tokio::test]
async fn update_errors() {
    let api = start().await;

    let err = api
        .update_task(&UpdateTaskRequest::default().completed(true))
        .await
        .unwrap_err();
    assert_eq!(status_and_message(err), (400, ERR_ID_REQUIRED.to_string()));

    let err = api
        .update_task(&UpdateTaskRequest::for_task(TaskId::new(31)).completed(true))
        .await
        .unwrap_err();
    assert_eq!(status_and_message(err), (404, ERR_NOT_FOUND.to_string()));

    let err = api
        .create_task(&CreateTaskRequest::new("   ", None))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}

// ===========================================================================
// Delete and restore
// ===========================================================================

#[tokio::test]
async fn delete_then_restore_keeps_fields_with_new_id() {
    let api = start().await;
    let created = create_all(&api, &["A", "B", "C"]).await;
    let b = &created[1];
    api.update_task(&UpdateTaskRequest::for_task(b.id).completed(true))
        .await
        .unwrap();

    let snapshot = api.delete_task(b.id).await.unwrap();
    assert_eq!(snapshot.original_priority, Some(1));
    assert!(snapshot.task.completed);
    assert_eq!(titles(&api.list_tasks().await.unwrap()), vec!["A", "C"]);

    let restored = api.restore_task(&snapshot).await.unwrap();
    assert_ne!(restored.id, b.id);
    assert_eq!(restored.title, "B");
    assert!(restored.completed);
    assert_eq!(restored.category_id, b.category_id);
    assert_eq!(restored.priority, 1);
    assert_eq!(titles(&api.list_tasks().await.unwrap()), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn delete_unknown_is_not_found() {
    let api = start().await;
    let err = api.delete_task(TaskId::new(8)).await.unwrap_err();
    assert_eq!(status_and_message(err), (404, ERR_NOT_FOUND.to_string()));
}

#[tokio::test]
async fn deleted_ids_are_not_reused() {
    let api = start().await;
    let first = create_all(&api, &["gone"]).await.remove(0);
    api.delete_task(first.id).await.unwrap();
    let second = create_all(&api, &["new"]).await.remove(0);
    assert!(second.id > first.id);
}

// ===========================================================================
// Reorder and undo
// ===========================================================================

#[tokio::test]
async fn reorder_scenario_and_undo() {
    let api = start().await;
    let created = create_all(&api, &["A", "B", "C"]).await;
    let (a, b, c) = (created[0].id, created[1].id, created[2].id);

    let response = api
        .reorder(&[
            ReorderItem::with_previous(c, 2),
            ReorderItem::with_previous(a, 0),
            ReorderItem::with_previous(b, 1),
        ])
        .await
        .unwrap();
    assert_eq!(titles(&response.tasks), vec!["C", "A", "B"]);
    let priorities: Vec<u32> = response.tasks.iter().map(|t| t.priority).collect();
    assert_eq!(priorities, vec![0, 1, 2]);
    assert_eq!(
        response.previous_order,
        vec![
            PreviousPriority { id: c, previous_priority: 2 },
            PreviousPriority { id: a, previous_priority: 0 },
            PreviousPriority { id: b, previous_priority: 1 },
        ]
    );

    let restored = api.undo_reorder(&response.previous_order).await.unwrap();
    assert_eq!(titles(&restored), vec!["A", "B", "C"]);
    let priorities: Vec<u32> = restored.iter().map(|t| t.priority).collect();
    assert_eq!(priorities, vec![0, 1, 2]);
}

#[tokio::test]
async fn reorder_without_previous_priorities_records_stored_values() {
    let api = start().await;
    let created = create_all(&api, &["A", "B"]).await;
    let response = api
        .reorder(&[ReorderItem::from(created[1].id), ReorderItem::from(created[0].id)])
        .await
        .unwrap();
    let recorded: Vec<u32> = response
        .previous_order
        .iter()
        .map(|p| p.previous_priority)
        .collect();
    assert_eq!(recorded, vec![1, 0]);
}

#[tokio::test]
async fn failed_reorder_changes_nothing() {
    let api = start().await;
    let created = create_all(&api, &["A", "B"]).await;
    let err = api
        .reorder(&[
            ReorderItem::from(created[1].id),
            ReorderItem::from(TaskId::new(404)),
            ReorderItem::from(created[0].id),
        ])
        .await
        .unwrap_err();
    assert_eq!(
        status_and_message(err),
        (500, ERR_UPDATE_PRIORITIES.to_string())
    );
    assert_eq!(api.list_tasks().await.unwrap(), created);
}

#[tokio::test]
async fn duplicate_ids_in_reorder_are_rejected() {
    let api = start().await;
    let created = create_all(&api, &["A"]).await;
    let err = api
        .reorder(&[ReorderItem::from(created[0].id), ReorderItem::from(created[0].id)])
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn undo_reorder_skips_deleted_tasks() {
    let api = start().await;
    let created = create_all(&api, &["A", "B", "C"]).await;
    let response = api
        .reorder(&[
            ReorderItem::from(created[2].id),
            ReorderItem::from(created[1].id),
            ReorderItem::from(created[0].id),
        ])
        .await
        .unwrap();
    api.delete_task(created[1].id).await.unwrap();

    let restored = api.undo_reorder(&response.previous_order).await.unwrap();
    assert_eq!(titles(&restored), vec!["A", "C"]);
    let priorities: Vec<u32> = restored.iter().map(|t| t.priority).collect();
    assert_eq!(priorities, vec![0, 2]);
}

// ===========================================================================
// Persistence
// ===========================================================================

#[tokio::test]
async fn tasks_survive_server_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("taskboard.db");

    let addr = serve(SqliteStore::open(&path).unwrap()).await;
    let api = HttpTaskApi::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    create_all(&api, &["persisted"]).await;

    let addr = serve(SqliteStore::open(&path).unwrap()).await;
    let api = HttpTaskApi::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    assert_eq!(titles(&api.list_tasks().await.unwrap()), vec!["persisted"]);
}
