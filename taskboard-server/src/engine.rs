//! Priority reordering and its inversion.
//!
//! [`apply_reorder`] rewrites each listed task's priority to its index in the
//! request, all or nothing, and reports what the priorities were so the
//! caller can invert the change. [`undo_reorder`] writes those recorded
//! priorities back verbatim, skipping tasks deleted in the meantime.

use std::collections::HashSet;

use taskboard_proto::api::ReorderItem;
use taskboard_proto::task::{PreviousPriority, Task, TaskId};

use crate::store::{Storage, StoreError};

/// Errors produced by the reorder engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested order lists the same task more than once.
    #[error("task {0} appears more than once in the requested order")]
    DuplicateTask(TaskId),

    /// The requested order is longer than the priority range.
    #[error("cannot order {0} tasks")]
    TooManyTasks(usize),

    /// The transaction could not commit; nothing was written.
    #[error("priority transaction failed: {0}")]
    TransactionFailure(#[from] StoreError),
}

/// Result of a successful reorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderOutcome {
    /// Canonical list of all tasks after the reorder.
    pub tasks: Vec<Task>,
    /// Priority of each reordered task before the writes, in request order.
    pub previous_order: Vec<PreviousPriority>,
}

/// Sets `priority = i` for the task at `items[i]`, atomically.
///
/// The previous priority recorded for an item is the caller-supplied
/// `previous_priority` when present, otherwise the stored value read before
/// any write. Tasks not listed keep their priority.
///
/// # Errors
///
/// Returns [`EngineError::DuplicateTask`] or [`EngineError::TooManyTasks`]
/// before touching storage, and [`EngineError::TransactionFailure`] if any
/// listed task is missing or the commit fails. In every error case no
/// priority has changed.
pub async fn apply_reorder<S: Storage>(
    storage: &S,
    items: &[ReorderItem],
) -> Result<ReorderOutcome, EngineError> {
    if let Some(id) = first_duplicate(items) {
        return Err(EngineError::DuplicateTask(id));
    }
    if u32::try_from(items.len()).is_err() {
        return Err(EngineError::TooManyTasks(items.len()));
    }

    let items = items.to_vec();
    let count = items.len();
    let outcome = storage
        .transaction(move |tx| -> Result<ReorderOutcome, EngineError> {
            let mut previous_order = Vec::with_capacity(items.len());
            for item in &items {
                let current = tx
                    .find_task(item.id)?
                    .ok_or(StoreError::UnknownTask(item.id))?;
                previous_order.push(PreviousPriority {
                    id: item.id,
                    previous_priority: item.previous_priority.unwrap_or(current.priority),
                });
            }

            for (priority, item) in (0u32..).zip(&items) {
                if !tx.set_priority(item.id, priority)? {
                    return Err(StoreError::UnknownTask(item.id).into());
                }
            }

            Ok(ReorderOutcome {
                tasks: tx.list_tasks()?,
                previous_order,
            })
        })
        .await?;

    tracing::info!(count, "applied reorder");
    Ok(outcome)
}

/// Restores each task in `previous_order` to its recorded priority,
/// atomically, and returns the canonical list.
///
/// This is a direct restore, not a permutation: entries whose task has been
/// deleted since the reorder are skipped so the rest still restore.
///
/// # Errors
///
/// Returns [`EngineError::TransactionFailure`] if a statement or the commit
/// fails, in which case no priority has changed.
pub async fn undo_reorder<S: Storage>(
    storage: &S,
    previous_order: &[PreviousPriority],
) -> Result<Vec<Task>, EngineError> {
    let previous_order = previous_order.to_vec();
    let (tasks, skipped) = storage
        .transaction(move |tx| -> Result<(Vec<Task>, usize), EngineError> {
            let mut skipped = 0usize;
            for entry in &previous_order {
                if !tx.set_priority(entry.id, entry.previous_priority)? {
                    tracing::debug!(task_id = %entry.id, "task gone, skipping priority restore");
                    skipped += 1;
                }
            }
            Ok((tx.list_tasks()?, skipped))
        })
        .await?;

    tracing::info!(skipped, "restored previous priorities");
    Ok(tasks)
}

fn first_duplicate(items: &[ReorderItem]) -> Option<TaskId> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().map(|i| i.id).find(|id| !seen.insert(*id))
}
