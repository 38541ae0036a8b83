//! Client-side task board state.
//!
//! [`Board`] owns the API handle, the last known canonical task list, the
//! categories and the undo history. Every request moves [`RequestState`]
//! from `Loading` to `Ready` or `Failed`; there are no callbacks.
//!
//! Cancellation is by dropping: a board future dropped mid-request leaves
//! the state at `Loading` and the local list untouched.

use taskboard_proto::api::{CreateTaskRequest, ReorderItem, UpdateTaskRequest};
use taskboard_proto::task::{
    Category, CategoryId, Task, TaskId, ValidationError, sort_canonical, validate_title,
};

use crate::api::{ApiError, TaskApi};
use crate::undo::{UndoAction, UndoOutcome, UndoStack};

/// Errors returned by [`Board`] operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Input was rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The task is not on the board.
    #[error("no task with id {0}")]
    UnknownTask(TaskId),

    /// The server call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Progress of the most recent request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState {
    /// No request has been made yet.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request succeeded.
    Ready,
    /// The last request failed with this message.
    Failed(String),
}

/// Whether tasks can currently be assigned a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryAvailability {
    /// At least one category exists.
    Available,
    /// The category list is empty or could not be loaded.
    Unavailable,
}

/// Task counts for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardStats {
    pub total: usize,
    pub completed: usize,
}

impl BoardStats {
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total - self.completed
    }
}

/// Task list, categories and undo history over a [`TaskApi`].
#[derive(Debug)]
pub struct Board<A: TaskApi> {
    api: A,
    tasks: Vec<Task>,
    categories: Vec<Category>,
    undo: UndoStack,
    filter: Option<CategoryId>,
    state: RequestState,
}

impl<A: TaskApi> Board<A> {
    /// Empty board; call [`Self::refresh`] to load tasks.
    pub fn new(api: A) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            categories: Vec::new(),
            undo: UndoStack::new(),
            filter: None,
            state: RequestState::Idle,
        }
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// All tasks in canonical order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub const fn state(&self) -> &RequestState {
        &self.state
    }

    #[must_use]
    pub const fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    #[must_use]
    pub const fn filter(&self) -> Option<CategoryId> {
        self.filter
    }

    /// Restricts [`Self::visible_tasks`] to one category, or clears the filter.
    pub const fn set_filter(&mut self, category: Option<CategoryId>) {
        self.filter = category;
    }

    /// Looks up a category by name, ignoring case.
    #[must_use]
    pub fn category_named(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Whether new tasks can be given a category.
    #[must_use]
    pub fn category_availability(&self) -> CategoryAvailability {
        if self.categories.is_empty() {
            CategoryAvailability::Unavailable
        } else {
            CategoryAvailability::Available
        }
    }

    /// Tasks passing the category filter, in canonical order.
    #[must_use]
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| self.filter.is_none_or(|f| t.category_id == Some(f)))
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> BoardStats {
        BoardStats {
            total: self.tasks.len(),
            completed: self.tasks.iter().filter(|t| t.completed).count(),
        }
    }

    /// Reloads the task list.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Api`] if the request fails; the local list is
    /// kept.
    pub async fn refresh(&mut self) -> Result<(), BoardError> {
        self.state = RequestState::Loading;
        let result = self.api.list_tasks().await;
        let mut tasks = self.finish(result)?;
        sort_canonical(&mut tasks);
        self.tasks = tasks;
        Ok(())
    }

    /// Reloads the categories. A failed load leaves categories unavailable
    /// rather than failing the board.
    pub async fn load_categories(&mut self) -> CategoryAvailability {
        self.state = RequestState::Loading;
        let result = self.api.list_categories().await;
        match self.finish(result) {
            Ok(categories) => self.categories = categories,
            Err(e) => {
                tracing::warn!(error = %e, "categories unavailable");
                self.categories.clear();
            }
        }
        self.category_availability()
    }

    /// Creates a task at the end of the list.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Validation`] for an invalid title without
    /// contacting the server, or [`BoardError::Api`] if the request fails.
    pub async fn add_task(
        &mut self,
        title: &str,
        category: Option<CategoryId>,
    ) -> Result<Task, BoardError> {
        let title = validate_title(title)?;
        self.state = RequestState::Loading;
        let result = self
            .api
            .create_task(&CreateTaskRequest::new(title, category))
            .await;
        let task = self.finish(result)?;
        self.upsert(task.clone());
        Ok(task)
    }

    /// Flips a task's completion flag.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownTask`] if the task is not on the board,
    /// or [`BoardError::Api`] if the request fails.
    pub async fn toggle_completed(&mut self, id: TaskId) -> Result<Task, BoardError> {
        let completed = self.task(id).ok_or(BoardError::UnknownTask(id))?.completed;
        self.state = RequestState::Loading;
        let result = self
            .api
            .update_task(&UpdateTaskRequest::for_task(id).completed(!completed))
            .await;
        let task = self.finish(result)?;
        self.upsert(task.clone());
        Ok(task)
    }

    /// Deletes a task and records the delete for undo.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownTask`] if the task is not on the board,
    /// or [`BoardError::Api`] if the request fails.
    pub async fn remove(&mut self, id: TaskId) -> Result<(), BoardError> {
        if self.task(id).is_none() {
            return Err(BoardError::UnknownTask(id));
        }
        self.state = RequestState::Loading;
        let result = self.api.delete_task(id).await;
        let deleted_task = self.finish(result)?;
        self.tasks.retain(|t| t.id != id);
        self.undo.push(UndoAction::Delete { deleted_task });
        Ok(())
    }

    /// Moves `dragged` to the position currently held by `target` and
    /// records the reorder for undo.
    ///
    /// The whole list is sent in its new order, each task carrying its
    /// cached priority as the previous priority. Moving a task onto itself
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownTask`] if either task is not on the
    /// board, or [`BoardError::Api`] if the request fails.
    pub async fn move_task(&mut self, dragged: TaskId, target: TaskId) -> Result<(), BoardError> {
        let from = self.position(dragged)?;
        let to = self.position(target)?;
        if from == to {
            return Ok(());
        }

        let mut order: Vec<&Task> = self.tasks.iter().collect();
        let moved = order.remove(from);
        order.insert(to, moved);
        let items: Vec<ReorderItem> = order
            .iter()
            .map(|t| ReorderItem::with_previous(t.id, t.priority))
            .collect();

        self.state = RequestState::Loading;
        let result = self.api.reorder(&items).await;
        let response = self.finish(result)?;
        self.tasks = response.tasks;
        sort_canonical(&mut self.tasks);
        self.undo.push(UndoAction::Reorder {
            previous_order: response.previous_order,
        });
        Ok(())
    }

    /// Inverts the most recent delete or reorder. Returns `None` when the
    /// history is empty.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Api`] if the request fails; the history entry is
    /// kept so the undo can be retried.
    pub async fn undo(&mut self) -> Result<Option<UndoOutcome>, BoardError> {
        if self.undo.is_empty() {
            return Ok(None);
        }
        self.state = RequestState::Loading;
        let result = self.undo.undo_last(&self.api).await;
        let outcome = self.finish(result)?;
        match &outcome {
            Some(UndoOutcome::Restored(task)) => self.upsert(task.clone()),
            Some(UndoOutcome::Reordered(tasks)) => {
                self.tasks.clone_from(tasks);
                sort_canonical(&mut self.tasks);
            }
            None => {}
        }
        Ok(outcome)
    }

    fn finish<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        match &result {
            Ok(_) => self.state = RequestState::Ready,
            Err(e) => self.state = RequestState::Failed(e.to_string()),
        }
        result
    }

    fn position(&self, id: TaskId) -> Result<usize, BoardError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(BoardError::UnknownTask(id))
    }

    fn upsert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
        sort_canonical(&mut self.tasks);
    }
}
