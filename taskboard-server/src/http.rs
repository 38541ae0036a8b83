//! HTTP interface for tasks and categories.
//!
//! One `/tasks` resource serves every task operation; `POST` and `PUT`
//! bodies are inspected for an `action` discriminator before being decoded
//! into their request type (see [`taskboard_proto::api`]). The same routes
//! are served at the root and under `/api`.
//!
//! Error responses are always `{"error": "..."}`. Storage failures are
//! logged and answered with a generic per-operation message.

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use taskboard_proto::api::{
    CreateTaskRequest, DeleteTaskResponse, ERR_CREATE_TASK, ERR_DELETE_TASK, ERR_FETCH_CATEGORIES,
    ERR_FETCH_TASKS, ERR_ID_REQUIRED, ERR_NOT_FOUND, ERR_TASKS_ARRAY_REQUIRED, ERR_UNDO_PRIORITIES,
    ERR_UPDATE_PRIORITIES, ERR_UPDATE_TASK, ErrorResponse, ReorderRequest, ReorderResponse,
    RestoreTaskRequest, TaskAction, UndoPrioritiesRequest, UpdateTaskRequest,
};
use taskboard_proto::task::{Category, Task, TaskId};

use crate::service::{ServiceError, TaskService};
use crate::store::Storage;

/// An error answered to the caller as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 with a caller-facing message.
    #[error("{0}")]
    BadRequest(String),

    /// 404.
    #[error("{}", ERR_NOT_FOUND)]
    NotFound,

    /// 500 with a generic message; `source` is logged, never returned.
    #[error("{message}")]
    Internal {
        /// Generic message for the failed operation.
        message: &'static str,
        /// What actually went wrong.
        #[source]
        source: ServiceError,
    },
}

impl ApiError {
    /// Maps a service error, using `message` for storage failures.
    fn service(message: &'static str) -> impl FnOnce(ServiceError) -> Self {
        move |err| match err {
            ServiceError::BadRequest(msg) => Self::BadRequest(msg),
            ServiceError::NotFound(_) => Self::NotFound,
            source @ ServiceError::TransactionFailure(_) => Self::Internal { message, source },
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal { message, source } => {
                tracing::error!(error = %source, "{message}");
            }
            Self::BadRequest(msg) => tracing::debug!(error = %msg, "rejected request"),
            Self::NotFound => tracing::debug!("task not found"),
        }
        (self.status(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Builds the router over `service`.
pub fn router<S: Storage>(service: TaskService<S>) -> Router {
    let routes = Router::new()
        .route(
            "/tasks",
            get(list_tasks::<S>)
                .post(create_task::<S>)
                .put(update_task::<S>)
                .delete(delete_task::<S>)
                .patch(reorder_tasks::<S>),
        )
        .route("/categories", get(list_categories::<S>));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .with_state(service)
}

/// Starts the task server on `addr` and returns the bound address and a
/// join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server<S: Storage>(
    addr: &str,
    service: TaskService<S>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "task server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Starts a server on `127.0.0.1:0` backed by a fresh in-memory store.
#[cfg(test)]
pub async fn start_test_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    use std::sync::Arc;

    let store = crate::store::SqliteStore::open_in_memory().expect("in-memory store");
    start_server("127.0.0.1:0", TaskService::new(Arc::new(store)))
        .await
        .expect("failed to start test server")
}

async fn list_tasks<S: Storage>(
    State(service): State<TaskService<S>>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = service
        .list_tasks()
        .await
        .map_err(ApiError::service(ERR_FETCH_TASKS))?;
    tracing::debug!(count = tasks.len(), "listed tasks");
    Ok(Json(tasks))
}

async fn list_categories<S: Storage>(
    State(service): State<TaskService<S>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = service
        .list_categories()
        .await
        .map_err(ApiError::service(ERR_FETCH_CATEGORIES))?;
    tracing::debug!(count = categories.len(), "listed categories");
    Ok(Json(categories))
}

/// `POST /tasks`: restore when the body is `{action: "restore", deletedTask}`,
/// create otherwise.
async fn create_task<S: Storage>(
    State(service): State<TaskService<S>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let value = parse_body(&body)?;
    let result = if has_action(&value, TaskAction::Restore, "deletedTask") {
        let request: RestoreTaskRequest = decode(value)?;
        service.restore_task(request.deleted_task).await
    } else {
        let request: CreateTaskRequest = decode(value)?;
        service.create_task(request).await
    };
    let task = result.map_err(ApiError::service(ERR_CREATE_TASK))?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /tasks`: undo a reorder when the body is
/// `{action: "undoPriorities", previousOrder}`, partial update otherwise.
async fn update_task<S: Storage>(
    State(service): State<TaskService<S>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let value = parse_body(&body)?;
    if has_action(&value, TaskAction::UndoPriorities, "previousOrder") {
        let request: UndoPrioritiesRequest = decode(value)?;
        let tasks = service
            .undo_reorder(&request.previous_order)
            .await
            .map_err(ApiError::service(ERR_UNDO_PRIORITIES))?;
        return Ok(Json(tasks).into_response());
    }

    let request: UpdateTaskRequest = decode(value)?;
    let task = service
        .update_task(request)
        .await
        .map_err(ApiError::service(ERR_UPDATE_TASK))?;
    Ok(Json(task).into_response())
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    id: Option<String>,
}

async fn delete_task<S: Storage>(
    State(service): State<TaskService<S>>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> Result<Json<DeleteTaskResponse>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let raw = params
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(ERR_ID_REQUIRED.to_string()))?;
    let id: TaskId = raw
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid task id: {raw}")))?;

    let deleted_task = service
        .delete_task(id)
        .await
        .map_err(ApiError::service(ERR_DELETE_TASK))?;
    Ok(Json(DeleteTaskResponse {
        success: true,
        deleted_task,
    }))
}

async fn reorder_tasks<S: Storage>(
    State(service): State<TaskService<S>>,
    body: Bytes,
) -> Result<Json<ReorderResponse>, ApiError> {
    let value = parse_body(&body)?;
    if !value.get("tasks").is_some_and(Value::is_array) {
        return Err(ApiError::BadRequest(ERR_TASKS_ARRAY_REQUIRED.to_string()));
    }
    let request: ReorderRequest = decode(value)?;
    let outcome = service
        .reorder(&request.tasks)
        .await
        .map_err(ApiError::service(ERR_UPDATE_PRIORITIES))?;
    Ok(Json(ReorderResponse {
        tasks: outcome.tasks,
        previous_order: outcome.previous_order,
    }))
}

fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::BadRequest(format!("invalid body: {e}")))
}

/// True when `body.action` names `action` and `body[payload]` is present.
fn has_action(body: &Value, action: TaskAction, payload: &str) -> bool {
    body.get("action").and_then(Value::as_str) == Some(action.as_str())
        && body.get(payload).is_some_and(|v| !v.is_null())
}
