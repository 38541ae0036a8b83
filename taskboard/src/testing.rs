//! In-memory [`TaskApi`] for unit tests.

use chrono::Utc;
use parking_lot::Mutex;
use taskboard_proto::api::{CreateTaskRequest, ReorderItem, ReorderResponse, UpdateTaskRequest};
use taskboard_proto::task::{
    Category, CategoryId, DeletedTask, PreviousPriority, Task, TaskId, sort_canonical,
};

use crate::api::{ApiError, TaskApi};

#[derive(Debug, Default)]
struct State {
    tasks: Vec<Task>,
    categories: Vec<Category>,
    next_id: i64,
    fail_next: Option<u16>,
    calls: Vec<&'static str>,
}

/// A server stand-in that keeps tasks in a vector.
#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn with_categories(names: &[&str]) -> Self {
        let api = Self::default();
        {
            let mut state = api.state.lock();
            let now = Utc::now();
            state.categories = (1..)
                .zip(names)
                .map(|(id, name)| Category {
                    id: CategoryId::new(id),
                    name: (*name).to_string(),
                    created_at: now,
                    updated_at: now,
                })
                .collect();
        }
        api
    }

    /// Makes the next call fail with `status`.
    pub fn fail_next(&self, status: u16) {
        self.state.lock().fail_next = Some(status);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    fn enter(&self, call: &'static str) -> Result<parking_lot::MutexGuard<'_, State>, ApiError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if let Some(status) = state.fail_next.take() {
            return Err(ApiError::Status {
                status,
                message: format!("{call} failed"),
            });
        }
        Ok(state)
    }
}

impl State {
    fn insert(
        &mut self,
        title: &str,
        completed: bool,
        priority: u32,
        category_id: Option<CategoryId>,
    ) -> Task {
        self.next_id += 1;
        let now = Utc::now();
        let task = Task {
            id: TaskId::new(self.next_id),
            title: title.to_string(),
            completed,
            priority,
            category_id,
            created_at: now,
            updated_at: now,
            category: category_id
                .and_then(|id| self.categories.iter().find(|c| c.id == id).cloned()),
        };
        self.tasks.push(task.clone());
        sort_canonical(&mut self.tasks);
        task
    }

    fn sorted(&mut self) -> Vec<Task> {
        sort_canonical(&mut self.tasks);
        self.tasks.clone()
    }

    fn get_mut(&mut self, id: TaskId) -> Result<&mut Task, ApiError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: "Not found".to_string(),
            })
    }
}

impl TaskApi for FakeApi {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        Ok(self.enter("list_tasks")?.sorted())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        Ok(self.enter("list_categories")?.categories.clone())
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, ApiError> {
        let mut state = self.enter("create_task")?;
        let priority = state
            .tasks
            .iter()
            .map(|t| t.priority)
            .max()
            .map_or(0, |p| p + 1);
        Ok(state.insert(request.title.trim(), request.completed, priority, request.category_id))
    }

    async fn restore_task(&self, deleted_task: &DeletedTask) -> Result<Task, ApiError> {
        let mut state = self.enter("restore_task")?;
        let task = &deleted_task.task;
        Ok(state.insert(
            &task.title,
            task.completed,
            deleted_task.original_priority.unwrap_or(0),
            task.category_id,
        ))
    }

    async fn update_task(&self, request: &UpdateTaskRequest) -> Result<Task, ApiError> {
        let mut state = self.enter("update_task")?;
        let id = request.id.ok_or_else(|| ApiError::Status {
            status: 400,
            message: "id is required".to_string(),
        })?;
        let task = state.get_mut(id)?;
        if let Some(completed) = request.completed {
            task.completed = completed;
        }
        if let Some(title) = &request.title {
            task.title.clone_from(title);
        }
        if let Some(priority) = request.priority {
            task.priority = priority;
        }
        if let Some(category_id) = request.category_id {
            task.category_id = category_id;
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<DeletedTask, ApiError> {
        let mut state = self.enter("delete_task")?;
        let task = state.get_mut(id)?.clone();
        state.tasks.retain(|t| t.id != id);
        Ok(DeletedTask::capture(task, Utc::now()))
    }

    async fn reorder(&self, tasks: &[ReorderItem]) -> Result<ReorderResponse, ApiError> {
        let mut state = self.enter("reorder")?;
        let mut previous_order = Vec::with_capacity(tasks.len());
        for (priority, item) in (0u32..).zip(tasks) {
            let task = state.get_mut(item.id)?;
            previous_order.push(PreviousPriority {
                id: item.id,
                previous_priority: item.previous_priority.unwrap_or(task.priority),
            });
            task.priority = priority;
        }
        Ok(ReorderResponse {
            tasks: state.sorted(),
            previous_order,
        })
    }

    async fn undo_reorder(
        &self,
        previous_order: &[PreviousPriority],
    ) -> Result<Vec<Task>, ApiError> {
        let mut state = self.enter("undo_reorder")?;
        for entry in previous_order {
            if let Ok(task) = state.get_mut(entry.id) {
                task.priority = entry.previous_priority;
            }
        }
        Ok(state.sorted())
    }
}
