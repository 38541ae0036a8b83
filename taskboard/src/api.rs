//! Client-side view of the task server API.
//!
//! Defines the [`TaskApi`] trait the rest of the client is written against.
//! Concrete implementations include:
//! - [`crate::http::HttpTaskApi`]: JSON over HTTP to a running server

use std::future::Future;

use taskboard_proto::api::{CreateTaskRequest, ReorderItem, ReorderResponse, UpdateTaskRequest};
use taskboard_proto::task::{Category, DeletedTask, PreviousPriority, Task, TaskId};

/// Errors that can occur when calling the task server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The `error` field of the response body.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured server URL is not a valid base URL.
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status of a server-side rejection, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(_) | Self::InvalidUrl(_) => None,
        }
    }
}

/// Async operations offered by the task server.
///
/// Every method is one request; dropping the returned future before it
/// resolves abandons the request.
pub trait TaskApi: Send + Sync {
    /// All tasks in canonical order.
    fn list_tasks(&self) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// All categories ordered by name.
    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, ApiError>> + Send;

    /// Creates a task at the end of the list.
    fn create_task(
        &self,
        request: &CreateTaskRequest,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Recreates a deleted task from its snapshot.
    fn restore_task(
        &self,
        deleted_task: &DeletedTask,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Applies a partial update.
    fn update_task(
        &self,
        request: &UpdateTaskRequest,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Deletes a task and returns the snapshot needed to restore it.
    fn delete_task(&self, id: TaskId) -> impl Future<Output = Result<DeletedTask, ApiError>> + Send;

    /// Applies a new display order.
    fn reorder(
        &self,
        tasks: &[ReorderItem],
    ) -> impl Future<Output = Result<ReorderResponse, ApiError>> + Send;

    /// Restores priorities recorded by a previous reorder.
    fn undo_reorder(
        &self,
        previous_order: &[PreviousPriority],
    ) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;
}
