//! JSON request and response bodies for the task endpoints.
//!
//! A single `/tasks` resource carries several operations, told apart by an
//! `action` discriminator in the body:
//!
//! | Method | Body | Operation |
//! |---|---|---|
//! | `POST` | [`CreateTaskRequest`] | create |
//! | `POST` | [`RestoreTaskRequest`] (`action: "restore"`) | restore a deleted task |
//! | `PUT` | [`UpdateTaskRequest`] | partial update |
//! | `PUT` | [`UndoPrioritiesRequest`] (`action: "undoPriorities"`) | undo a reorder |
//! | `PATCH` | [`ReorderRequest`] | batch reorder |
//! | `DELETE` | `?id=ID` | delete, returns [`DeleteTaskResponse`] |

use serde::{Deserialize, Deserializer, Serialize};

use crate::task::{CategoryId, DeletedTask, PreviousPriority, RestoreSnapshot, Task, TaskId};

/// Error message for a request missing its task id.
pub const ERR_ID_REQUIRED: &str = "id is required";
/// Error message for a reorder request without a `tasks` array.
pub const ERR_TASKS_ARRAY_REQUIRED: &str = "tasks array is required";
/// Error message for an unknown task.
pub const ERR_NOT_FOUND: &str = "Not found";
/// Generic failure message for listing tasks.
pub const ERR_FETCH_TASKS: &str = "Failed to fetch tasks";
/// Generic failure message for listing categories.
pub const ERR_FETCH_CATEGORIES: &str = "Failed to fetch categories";
/// Generic failure message for create and restore.
pub const ERR_CREATE_TASK: &str = "Failed to create task";
/// Generic failure message for updates.
pub const ERR_UPDATE_TASK: &str = "Failed to update task";
/// Generic failure message for deletes.
pub const ERR_DELETE_TASK: &str = "Failed to delete task";
/// Generic failure message for reorders.
pub const ERR_UPDATE_PRIORITIES: &str = "Failed to update priorities";
/// Generic failure message for undoing a reorder.
pub const ERR_UNDO_PRIORITIES: &str = "Failed to undo priorities";

/// Action discriminator carried by restore and undo-reorder bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskAction {
    /// Recreate a deleted task from its snapshot (`POST`).
    Restore,
    /// Restore priorities from a previous-order record (`PUT`).
    UndoPriorities,
}

impl TaskAction {
    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Restore => "restore",
            Self::UndoPriorities => "undoPriorities",
        }
    }
}

/// `POST /tasks` body for a new task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title; trimmed by the server and required to be non-empty.
    pub title: String,
    /// Optional category for the new task.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Initial completion flag.
    #[serde(default)]
    pub completed: bool,
}

impl CreateTaskRequest {
    /// Builds a request for an uncompleted task.
    pub fn new(title: impl Into<String>, category_id: Option<CategoryId>) -> Self {
        Self {
            title: title.into(),
            category_id,
            completed: false,
        }
    }
}

/// `POST /tasks` body recreating a deleted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreTaskRequest {
    /// Always [`TaskAction::Restore`].
    pub action: TaskAction,
    /// Snapshot returned by the delete that is being undone.
    pub deleted_task: RestoreSnapshot,
}

impl RestoreTaskRequest {
    /// Wraps a snapshot in a restore request.
    #[must_use]
    pub fn new(deleted_task: impl Into<RestoreSnapshot>) -> Self {
        Self {
            action: TaskAction::Restore,
            deleted_task: deleted_task.into(),
        }
    }
}

/// `PUT /tasks` body. Only fields present in the JSON are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    /// Task to update. Required; a missing id is a bad request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    /// New completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `None`: leave unchanged. `Some(None)`: clear. `Some(Some(id))`: reassign.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<CategoryId>>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl UpdateTaskRequest {
    /// Starts an empty update for `id`.
    #[must_use]
    pub fn for_task(id: TaskId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Sets the completion flag.
    #[must_use]
    pub const fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Reassigns or clears the category.
    #[must_use]
    pub const fn category(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// `PUT /tasks` body undoing a reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoPrioritiesRequest {
    /// Always [`TaskAction::UndoPriorities`].
    pub action: TaskAction,
    /// Record returned by the reorder being undone.
    pub previous_order: Vec<PreviousPriority>,
}

impl UndoPrioritiesRequest {
    /// Wraps a previous-order record in an undo request.
    #[must_use]
    pub const fn new(previous_order: Vec<PreviousPriority>) -> Self {
        Self {
            action: TaskAction::UndoPriorities,
            previous_order,
        }
    }
}

/// One element of a reorder request. Unknown fields are ignored, so clients
/// may send whole task objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderItem {
    /// Task being placed at this position.
    pub id: TaskId,
    /// The client's cached priority for the task, recorded for undo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_priority: Option<u32>,
}

impl ReorderItem {
    /// Item carrying the client's cached priority.
    #[must_use]
    pub const fn with_previous(id: TaskId, previous_priority: u32) -> Self {
        Self {
            id,
            previous_priority: Some(previous_priority),
        }
    }
}

impl From<TaskId> for ReorderItem {
    fn from(id: TaskId) -> Self {
        Self {
            id,
            previous_priority: None,
        }
    }
}

/// `PATCH /tasks` body: the desired display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    /// Tasks in their new order; index `i` receives priority `i`.
    pub tasks: Vec<ReorderItem>,
}

/// `PATCH /tasks` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderResponse {
    /// Canonical task list after the reorder.
    pub tasks: Vec<Task>,
    /// Priorities before the reorder, in request order.
    pub previous_order: Vec<PreviousPriority>,
}

/// `DELETE /tasks?id=ID` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskResponse {
    /// Always `true` on a 200 response.
    pub success: bool,
    /// Snapshot the client keeps to undo the delete.
    pub deleted_task: DeletedTask,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message. Never contains internal error detail.
    pub error: String,
}

impl ErrorResponse {
    /// Wraps a message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Deserializes a field that is present in the input, even when `null`,
/// as `Some(value)`. Combined with `#[serde(default)]` an absent field
/// stays `None`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
