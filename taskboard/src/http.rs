//! [`TaskApi`] over HTTP using `reqwest`.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use taskboard_proto::api::{
    CreateTaskRequest, DeleteTaskResponse, ErrorResponse, ReorderItem, ReorderRequest,
    ReorderResponse, RestoreTaskRequest, UndoPrioritiesRequest, UpdateTaskRequest,
};
use taskboard_proto::task::{Category, DeletedTask, PreviousPriority, Task, TaskId};
use url::Url;

use crate::api::{ApiError, TaskApi};

/// HTTP client for a task server rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base: Url,
}

impl HttpTaskApi {
    /// Creates a client for the server at `base_url`. Every request is
    /// abandoned after `timeout`.
    ///
    /// The base may carry a path prefix (`http://host/api`); endpoint paths
    /// are resolved beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` does not parse, or
    /// [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    /// The base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn tasks_url(&self) -> Result<Url, ApiError> {
        Ok(self.base.join("tasks")?)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        tracing::debug!(status = status.as_u16(), %message, "server rejected request");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        Self::send(self.client.get(self.tasks_url()?)).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        Self::send(self.client.get(self.base.join("categories")?)).await
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, ApiError> {
        Self::send(self.client.post(self.tasks_url()?).json(request)).await
    }

    async fn restore_task(&self, deleted_task: &DeletedTask) -> Result<Task, ApiError> {
        let body = RestoreTaskRequest::new(deleted_task);
        Self::send(self.client.post(self.tasks_url()?).json(&body)).await
    }

    async fn update_task(&self, request: &UpdateTaskRequest) -> Result<Task, ApiError> {
        Self::send(self.client.put(self.tasks_url()?).json(request)).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<DeletedTask, ApiError> {
        let request = self
            .client
            .delete(self.tasks_url()?)
            .query(&[("id", id.as_i64())]);
        let response: DeleteTaskResponse = Self::send(request).await?;
        Ok(response.deleted_task)
    }

    async fn reorder(&self, tasks: &[ReorderItem]) -> Result<ReorderResponse, ApiError> {
        let body = ReorderRequest {
            tasks: tasks.to_vec(),
        };
        Self::send(self.client.patch(self.tasks_url()?).json(&body)).await
    }

    async fn undo_reorder(
        &self,
        previous_order: &[PreviousPriority],
    ) -> Result<Vec<Task>, ApiError> {
        let body = UndoPrioritiesRequest::new(previous_order.to_vec());
        Self::send(self.client.put(self.tasks_url()?).json(&body)).await
    }
}
