//! Task mutation operations behind the HTTP handlers.
//!
//! [`TaskService`] is built once at startup around an explicit storage
//! handle and cloned into every request. Each operation is one storage
//! transaction; priority-changing operations delegate to [`crate::engine`].

use std::sync::Arc;

use chrono::Utc;
use taskboard_proto::api::{CreateTaskRequest, ERR_ID_REQUIRED, ReorderItem, UpdateTaskRequest};
use taskboard_proto::task::{
    Category, CategoryId, DeletedTask, PreviousPriority, RestoreSnapshot, Task, TaskId,
    ValidationError, validate_title,
};

use crate::engine::{self, EngineError, ReorderOutcome};
use crate::store::{NewTask, Storage, StoreError, TaskPatch, TaskTx};

/// Errors returned by [`TaskService`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request is missing a required field or carries an invalid one.
    #[error("{0}")]
    BadRequest(String),

    /// The referenced task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Storage failed; the transaction was rolled back.
    #[error("transaction failed: {0}")]
    TransactionFailure(#[from] StoreError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::DuplicateTask(_) | EngineError::TooManyTasks(_) => {
                Self::BadRequest(err.to_string())
            }
            EngineError::TransactionFailure(source) => Self::TransactionFailure(source),
        }
    }
}

/// Create, read, update, delete, restore and reorder over a [`Storage`].
pub struct TaskService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for TaskService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> TaskService<S> {
    /// Wraps the storage handle shared by all requests.
    #[must_use]
    pub const fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// The underlying storage handle.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// All tasks in canonical order, joined with their categories.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TransactionFailure`] if the query fails.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        Ok(self.storage.transaction(|tx| tx.list_tasks()).await?)
    }

    /// All categories ordered by name. An empty list is a valid answer; the
    /// client treats it as "categories unavailable".
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TransactionFailure`] if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(self.storage.transaction(|tx| tx.list_categories()).await?)
    }

    /// Creates a task at the end of the list (max priority + 1, or 0).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for an invalid title or an unknown
    /// category, [`ServiceError::TransactionFailure`] if storage fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> Result<Task, ServiceError> {
        let title = validate_title(&request.title)?;
        let task = self
            .storage
            .transaction(move |tx| {
                ensure_category(tx, request.category_id)?;
                let priority = tx.max_priority()?.map_or(0, |max| max.saturating_add(1));
                let id = tx.insert_task(&NewTask {
                    title,
                    completed: request.completed,
                    priority,
                    category_id: request.category_id,
                })?;
                load(tx, id)
            })
            .await?;

        tracing::info!(task_id = %task.id, priority = task.priority, "task created");
        Ok(task)
    }

    /// Recreates a deleted task from its snapshot as a new row with a new id.
    ///
    /// Priority is the snapshot's `original_priority`, or 0 when absent. A
    /// category deleted since the snapshot was taken is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for an invalid title,
    /// [`ServiceError::TransactionFailure`] if storage fails.
    pub async fn restore_task(
        &self,
        snapshot: impl Into<RestoreSnapshot>,
    ) -> Result<Task, ServiceError> {
        let snapshot = snapshot.into();
        let title = validate_title(&snapshot.title)?;
        let original_id = snapshot.id;
        let task = self
            .storage
            .transaction(move |tx| {
                let category_id = match snapshot.category_id {
                    Some(id) if tx.find_category(id)?.is_some() => Some(id),
                    _ => None,
                };
                let id = tx.insert_task(&NewTask {
                    title,
                    completed: snapshot.completed,
                    priority: snapshot.original_priority.unwrap_or(0),
                    category_id,
                })?;
                load(tx, id)
            })
            .await?;

        tracing::info!(
            task_id = %task.id,
            original_id = ?original_id,
            priority = task.priority,
            "task restored"
        );
        Ok(task)
    }

    /// Applies the fields present in `request` to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] if the id is missing or a field is
    /// invalid, [`ServiceError::NotFound`] if the task does not exist,
    /// [`ServiceError::TransactionFailure`] if storage fails.
    pub async fn update_task(&self, request: UpdateTaskRequest) -> Result<Task, ServiceError> {
        let Some(id) = request.id else {
            return Err(ServiceError::BadRequest(ERR_ID_REQUIRED.to_string()));
        };
        let patch = TaskPatch {
            title: request.title.as_deref().map(validate_title).transpose()?,
            completed: request.completed,
            category_id: request.category_id,
            priority: request.priority,
        };
        let task = self
            .storage
            .transaction(move |tx| {
                if let Some(category_id) = patch.category_id {
                    ensure_category(tx, category_id)?;
                }
                if !tx.update_task(id, &patch)? {
                    return Err(ServiceError::NotFound(id));
                }
                load(tx, id)
            })
            .await?;

        tracing::info!(task_id = %id, "task updated");
        Ok(task)
    }

    /// Permanently deletes a task and returns its snapshot for undo.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the task does not exist,
    /// [`ServiceError::TransactionFailure`] if storage fails.
    pub async fn delete_task(&self, id: TaskId) -> Result<DeletedTask, ServiceError> {
        let snapshot = self
            .storage
            .transaction(move |tx| {
                let task = tx.find_task(id)?.ok_or(ServiceError::NotFound(id))?;
                if !tx.delete_task(id)? {
                    return Err(ServiceError::NotFound(id));
                }
                Ok(DeletedTask::capture(task, Utc::now()))
            })
            .await?;

        tracing::info!(task_id = %id, priority = snapshot.task.priority, "task deleted");
        Ok(snapshot)
    }

    /// Applies a new display order. See [`engine::apply_reorder`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] for duplicate ids and
    /// [`ServiceError::TransactionFailure`] if the batch rolled back.
    pub async fn reorder(&self, items: &[ReorderItem]) -> Result<ReorderOutcome, ServiceError> {
        Ok(engine::apply_reorder(self.storage.as_ref(), items).await?)
    }

    /// Restores priorities recorded by a reorder. See [`engine::undo_reorder`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TransactionFailure`] if the transaction fails.
    pub async fn undo_reorder(
        &self,
        previous_order: &[PreviousPriority],
    ) -> Result<Vec<Task>, ServiceError> {
        Ok(engine::undo_reorder(self.storage.as_ref(), previous_order).await?)
    }
}

fn ensure_category(tx: &dyn TaskTx, category_id: Option<CategoryId>) -> Result<(), ServiceError> {
    match category_id {
        Some(id) if tx.find_category(id)?.is_none() => {
            Err(ServiceError::BadRequest(format!("unknown category: {id}")))
        }
        _ => Ok(()),
    }
}

fn load(tx: &dyn TaskTx, id: TaskId) -> Result<Task, ServiceError> {
    tx.find_task(id)?
        .ok_or(ServiceError::TransactionFailure(StoreError::UnknownTask(id)))
}
