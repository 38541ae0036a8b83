//! Task and category data model shared by server and client.
//!
//! Display order is defined by [`Task::priority`] ascending with ties broken
//! by [`TaskId`] ascending (the *canonical* order). Priorities are not
//! required to be dense, but every reorder writes a dense `0..N-1` run.

use std::cmp::Ordering;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 255;

/// Maximum allowed category name length in characters.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;

/// Number of reversible actions a client keeps in its undo history.
pub const UNDO_HISTORY_LIMIT: usize = 5;

/// Server-assigned task identifier. Never reused after a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Wraps a raw row identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row identifier.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Server-assigned category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

impl CategoryId {
    /// Wraps a raw row identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row identifier.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named category. Names are unique across all categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique category identifier.
    pub id: CategoryId,
    /// Display name, 1 to [`MAX_CATEGORY_NAME_LENGTH`] characters.
    pub name: String,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
}

/// A task row joined with its category, as returned by every task endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Title, 1 to [`MAX_TASK_TITLE_LENGTH`] characters.
    pub title: String,
    /// Completion flag.
    pub completed: bool,
    /// Display position; lower sorts first.
    pub priority: u32,
    /// Optional category reference. Cleared when the category is deleted.
    pub category_id: Option<CategoryId>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub updated_at: DateTime<Utc>,
    /// The referenced category, if any.
    #[serde(default)]
    pub category: Option<Category>,
}

impl Task {
    /// Compares two tasks in canonical display order.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sorts tasks into canonical order: priority ascending, then id ascending.
pub fn sort_canonical(tasks: &mut [Task]) {
    tasks.sort_by(Task::canonical_cmp);
}

/// Snapshot of a task captured at deletion time.
///
/// The server keeps no copy once the delete returns; a client that wants to
/// undo the delete resubmits this snapshot as a restore request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTask {
    /// All fields of the task as they were just before deletion.
    #[serde(flatten)]
    pub task: Task,
    /// When the task was deleted.
    pub deleted_at: DateTime<Utc>,
    /// Priority at deletion time. Restores at 0 when absent.
    #[serde(default)]
    pub original_priority: Option<u32>,
}

impl DeletedTask {
    /// Captures a snapshot of `task` at time `deleted_at`.
    #[must_use]
    pub fn capture(task: Task, deleted_at: DateTime<Utc>) -> Self {
        let original_priority = Some(task.priority);
        Self {
            task,
            deleted_at,
            original_priority,
        }
    }
}

/// The fields a restore reads from a deletion snapshot.
///
/// Accepts a full [`DeletedTask`] as well as a body carrying only these
/// fields; anything else in the body is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSnapshot {
    /// Id of the deleted task, if the caller sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    /// Title to restore; validated like a new task's.
    pub title: String,
    /// Completion flag. False when absent.
    #[serde(default)]
    pub completed: bool,
    /// Category to restore into, dropped if it no longer exists.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Priority to restore at. Restores at 0 when absent.
    #[serde(default)]
    pub original_priority: Option<u32>,
}

impl From<DeletedTask> for RestoreSnapshot {
    fn from(snapshot: DeletedTask) -> Self {
        Self {
            id: Some(snapshot.task.id),
            title: snapshot.task.title,
            completed: snapshot.task.completed,
            category_id: snapshot.task.category_id,
            original_priority: snapshot.original_priority,
        }
    }
}

impl From<&DeletedTask> for RestoreSnapshot {
    fn from(snapshot: &DeletedTask) -> Self {
        snapshot.clone().into()
    }
}

/// One entry of a previous-order record: a task's priority before a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousPriority {
    /// The reordered task.
    pub id: TaskId,
    /// Its priority before the reorder was applied.
    pub previous_priority: u32,
}

/// Errors produced when validating user-supplied fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Task title is empty after trimming.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max {} characters)", MAX_TASK_TITLE_LENGTH)]
    TitleTooLong,
    /// Category name is empty after trimming.
    #[error("category name cannot be empty")]
    CategoryNameEmpty,
    /// Category name exceeds the maximum length.
    #[error("category name too long (max {} characters)", MAX_CATEGORY_NAME_LENGTH)]
    CategoryNameTooLong,
}

/// Trims and validates a task title, returning the trimmed value.
///
/// # Errors
///
/// Returns [`ValidationError::TitleEmpty`] or [`ValidationError::TitleTooLong`].
pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if trimmed.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(trimmed.to_string())
}

/// Trims and validates a category name, returning the trimmed value.
///
/// # Errors
///
/// Returns [`ValidationError::CategoryNameEmpty`] or
/// [`ValidationError::CategoryNameTooLong`].
pub fn validate_category_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::CategoryNameEmpty);
    }
    if trimmed.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        return Err(ValidationError::CategoryNameTooLong);
    }
    Ok(trimmed.to_string())
}
