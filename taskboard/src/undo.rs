//! Bounded history of reversible actions.
//!
//! [`UndoStack`] keeps the last [`UNDO_HISTORY_LIMIT`] deletes and reorders,
//! most recent first. Only the top entry can be inverted; inverting it
//! removes it and records nothing new, so there is no redo.

use std::collections::VecDeque;

use taskboard_proto::task::{DeletedTask, PreviousPriority, Task, TaskId, UNDO_HISTORY_LIMIT};

use crate::api::{ApiError, TaskApi};

/// An action that can be inverted through the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    /// A delete; inverted by restoring the snapshot.
    Delete {
        /// Snapshot returned by the delete.
        deleted_task: DeletedTask,
    },
    /// A reorder; inverted by writing the previous priorities back.
    Reorder {
        /// Previous-order record returned by the reorder.
        previous_order: Vec<PreviousPriority>,
    },
}

impl UndoAction {
    /// Short human-readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Delete { deleted_task } => format!("delete \"{}\"", deleted_task.task.title),
            Self::Reorder { previous_order } => {
                format!("reorder of {} tasks", previous_order.len())
            }
        }
    }

    const fn deleted_id(&self) -> Option<TaskId> {
        match self {
            Self::Delete { deleted_task } => Some(deleted_task.task.id),
            Self::Reorder { .. } => None,
        }
    }
}

/// What a successful undo produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// A deleted task was recreated (with a new id).
    Restored(Task),
    /// Priorities were restored; the canonical list after the restore.
    Reordered(Vec<Task>),
}

/// Most-recent-first history of reversible actions.
#[derive(Debug, Clone)]
pub struct UndoStack {
    entries: VecDeque<UndoAction>,
    limit: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    /// Empty stack holding at most [`UNDO_HISTORY_LIMIT`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(UNDO_HISTORY_LIMIT)
    }

    /// Empty stack holding at most `limit` entries.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Records `action` as the most recent entry, discarding the oldest
    /// entries beyond the limit.
    pub fn push(&mut self, action: UndoAction) {
        self.entries.push_front(action);
        self.entries.truncate(self.limit);
    }

    /// The entry [`Self::undo_last`] would invert.
    #[must_use]
    pub fn peek(&self) -> Option<&UndoAction> {
        self.entries.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from most to least recent.
    pub fn iter(&self) -> impl Iterator<Item = &UndoAction> {
        self.entries.iter()
    }

    /// Inverts the most recent entry through `api`.
    ///
    /// On success the entry is removed; for a delete, every delete entry for
    /// the same task goes with it. On failure the stack is left unchanged.
    /// Returns `Ok(None)` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of the failed restore or undo-reorder call.
    pub async fn undo_last<A: TaskApi>(
        &mut self,
        api: &A,
    ) -> Result<Option<UndoOutcome>, ApiError> {
        let Some(action) = self.entries.front().cloned() else {
            return Ok(None);
        };
        let description = action.describe();

        let result = match &action {
            UndoAction::Delete { deleted_task } => {
                api.restore_task(deleted_task).await.map(UndoOutcome::Restored)
            }
            UndoAction::Reorder { previous_order } => api
                .undo_reorder(previous_order)
                .await
                .map(UndoOutcome::Reordered),
        };

        match result {
            Ok(outcome) => {
                match action.deleted_id() {
                    Some(id) => self.entries.retain(|e| e.deleted_id() != Some(id)),
                    None => {
                        self.entries.pop_front();
                    }
                }
                tracing::info!(
                    action = %description,
                    remaining = self.entries.len(),
                    "undid action"
                );
                Ok(Some(outcome))
            }
            Err(e) => {
                tracing::warn!(action = %description, error = %e, "undo failed");
                Err(e)
            }
        }
    }
}
