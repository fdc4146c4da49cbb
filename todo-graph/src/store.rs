use async_trait::async_trait;
use mockall::automock;
use tokio::sync::RwLock;

use crate::error::TaskError;
use crate::task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStats};

/// Sole authority over task records.
///
/// Every backend upholds the same contract: reads never observe a partially
/// applied write, writes to one task serialize, and a failed operation leaves
/// the collection untouched. Listing operations return the most recently
/// created tasks first.
#[automock]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Returns all tasks, or only those whose completion flag equals `completed`.
    async fn list_tasks(&self, completed: Option<bool>) -> Result<Vec<Task>, TaskError>;

    /// Looks up a single task.
    ///
    /// # Errors
    ///
    /// `TaskError::NotFound` if no live task has this id.
    async fn get_task(&self, id: TaskId) -> Result<Task, TaskError>;

    /// Stores a new pending task and returns it with its id and timestamps.
    async fn create_task(&self, new_task: NewTask) -> Result<Task, TaskError>;

    /// Applies a partial update and bumps `updated_at`.
    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError>;

    /// Permanently removes a task. Returns `true` on success and fails with
    /// `TaskError::NotFound` when the id is unknown.
    async fn delete_task(&self, id: TaskId) -> Result<bool, TaskError>;

    /// Flips the completion flag as a single atomic read-modify-write.
    async fn toggle_complete(&self, id: TaskId) -> Result<Task, TaskError>;

    /// Case-insensitive substring search over title and description.
    /// A blank query matches nothing.
    async fn search_tasks(&self, query: &str) -> Result<Vec<Task>, TaskError>;

    async fn tasks_by_priority(&self, priority: Priority) -> Result<Vec<Task>, TaskError>;

    /// Computes all counts from one snapshot of the collection.
    async fn compute_stats(&self) -> Result<TaskStats, TaskError>;
}

/// Task store kept entirely in process memory.
///
/// Tasks live in insertion order behind a single `RwLock`: reads share it,
/// each write holds it exclusively for the whole read-modify-write.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select(&self, predicate: impl Fn(&Task) -> bool) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        tasks
            .iter()
            .rev()
            .filter(|task| predicate(task))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self, completed: Option<bool>) -> Result<Vec<Task>, TaskError> {
        Ok(self
            .select(|task| completed.is_none_or(|wanted| task.completed() == wanted))
            .await)
    }

    #[tracing::instrument(skip(self))]
    async fn get_task(&self, id: TaskId) -> Result<Task, TaskError> {
        let tasks = self.tasks.read().await;
        tasks
            .iter()
            .find(|task| task.id() == id)
            .cloned()
            .ok_or(TaskError::NotFound(id))
    }

    #[tracing::instrument(skip(self))]
    async fn create_task(&self, new_task: NewTask) -> Result<Task, TaskError> {
        let task = Task::create(new_task);
        self.tasks.write().await.push(task.clone());
        tracing::debug!("Created task {}", task.id());
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|task| task.id() == id)
            .ok_or(TaskError::NotFound(id))?;
        task.apply(patch);
        Ok(task.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, id: TaskId) -> Result<bool, TaskError> {
        let mut tasks = self.tasks.write().await;
        let position = tasks
            .iter()
            .position(|task| task.id() == id)
            .ok_or(TaskError::NotFound(id))?;
        tasks.remove(position);
        tracing::debug!("Deleted task {}", id);
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    async fn toggle_complete(&self, id: TaskId) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|task| task.id() == id)
            .ok_or(TaskError::NotFound(id))?;
        task.toggle();
        Ok(task.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn search_tasks(&self, query: &str) -> Result<Vec<Task>, TaskError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.select(|task| task.matches(&needle)).await)
    }

    #[tracing::instrument(skip(self))]
    async fn tasks_by_priority(&self, priority: Priority) -> Result<Vec<Task>, TaskError> {
        Ok(self.select(|task| task.priority() == priority).await)
    }

    #[tracing::instrument(skip(self))]
    async fn compute_stats(&self) -> Result<TaskStats, TaskError> {
        let tasks = self.tasks.read().await;
        Ok(TaskStats::from_tasks(tasks.iter()))
    }
}
