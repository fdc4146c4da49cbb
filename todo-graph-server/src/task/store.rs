use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::*;
use std::sync::Arc;
use todo_graph::{
    NewTask, Priority, Task, TaskError, TaskId, TaskPatch, TaskStats, TaskStore, Title,
};

use crate::entities::task;

impl TryFrom<task::Model> for Task {
    type Error = TaskError;

    fn try_from(model: task::Model) -> Result<Self, Self::Error> {
        let id = model
            .id
            .parse::<TaskId>()
            .map_err(|err| corrupt_row(&model.id, err))?;
        let title = Title::parse(&model.title).map_err(|err| corrupt_row(&model.id, err))?;
        let priority = model
            .priority
            .parse::<Priority>()
            .map_err(|err| corrupt_row(&model.id, err))?;
        Ok(Task::restore(
            id,
            title,
            model.description,
            model.completed,
            priority,
            model.created_at,
            model.updated_at,
        ))
    }
}

/// Task store persisted through sea-orm (Postgres or SQLite).
#[derive(Clone)]
pub struct SeaOrmTaskStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmTaskStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_where(&self, condition: Condition) -> Result<Vec<Task>, TaskError> {
        task::Entity::find()
            .filter(condition)
            .order_by_desc(task::Column::CreatedAt)
            .order_by_desc(task::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(Task::try_from)
            .collect()
    }
}

#[async_trait]
impl TaskStore for SeaOrmTaskStore {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self, completed: Option<bool>) -> Result<Vec<Task>, TaskError> {
        let condition = Condition::all()
            .add_option(completed.map(|completed| task::Column::Completed.eq(completed)));
        self.find_where(condition).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_task(&self, id: TaskId) -> Result<Task, TaskError> {
        task::Entity::find_by_id(id.to_string())
            .one(self.db.as_ref())
            .await
            .map_err(storage_error)?
            .ok_or(TaskError::NotFound(id))
            .and_then(Task::try_from)
    }

    #[tracing::instrument(skip(self))]
    async fn create_task(&self, new_task: NewTask) -> Result<Task, TaskError> {
        let task = Task::create(new_task);
        let created_model = active_model(&task)
            .insert(self.db.as_ref())
            .await
            .map_err(storage_error)?;
        Task::try_from(created_model)
    }

    #[tracing::instrument(skip(self))]
    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        let txn = self.db.begin().await.map_err(storage_error)?;
        let mut task = Task::try_from(find_for_update(&txn, id).await?)?;
        task.apply(patch);
        let updated_model = active_model(&task)
            .update(&txn)
            .await
            .map_err(storage_error)?;
        txn.commit().await.map_err(storage_error)?;
        Task::try_from(updated_model)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, id: TaskId) -> Result<bool, TaskError> {
        let result = task::Entity::delete_by_id(id.to_string())
            .exec(self.db.as_ref())
            .await
            .map_err(storage_error)?;
        if result.rows_affected == 0 {
            return Err(TaskError::NotFound(id));
        }
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    async fn toggle_complete(&self, id: TaskId) -> Result<Task, TaskError> {
        let txn = self.db.begin().await.map_err(storage_error)?;
        let mut task = Task::try_from(find_for_update(&txn, id).await?)?;
        task.toggle();

        // Flip in SQL so the new value never depends on a stale read.
        task::Entity::update_many()
            .col_expr(
                task::Column::Completed,
                SimpleExpr::from(Expr::col(task::Column::Completed)).not(),
            )
            .col_expr(
                task::Column::UpdatedAt,
                SimpleExpr::from(Expr::value(task.updated_at())),
            )
            .filter(task::Column::Id.eq(id.to_string()))
            .exec(&txn)
            .await
            .map_err(storage_error)?;

        let toggled_model = find_for_update(&txn, id).await?;
        txn.commit().await.map_err(storage_error)?;
        Task::try_from(toggled_model)
    }

    #[tracing::instrument(skip(self))]
    async fn search_tasks(&self, query: &str) -> Result<Vec<Task>, TaskError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        if self.db.get_database_backend() != DbBackend::Postgres {
            // SQLite's lower() only folds ASCII, so match in Rust instead.
            let tasks = self.find_where(Condition::all()).await?;
            return Ok(tasks
                .into_iter()
                .filter(|task| task.matches(&needle))
                .collect());
        }
        let pattern = format!("%{}%", escape_like(&needle));
        let contains = |column: task::Column| {
            Expr::expr(Func::lower(Expr::col(column)))
                .like(LikeExpr::new(pattern.clone()).escape('\\'))
        };
        let condition = Condition::any()
            .add(contains(task::Column::Title))
            .add(contains(task::Column::Description));
        self.find_where(condition).await
    }

    #[tracing::instrument(skip(self))]
    async fn tasks_by_priority(&self, priority: Priority) -> Result<Vec<Task>, TaskError> {
        self.find_where(Condition::all().add(task::Column::Priority.eq(priority.as_str())))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn compute_stats(&self) -> Result<TaskStats, TaskError> {
        // One statement, so every count comes from the same snapshot.
        let rows: Vec<(bool, String)> = task::Entity::find()
            .select_only()
            .column(task::Column::Completed)
            .column(task::Column::Priority)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(storage_error)?;

        let entries = rows
            .into_iter()
            .map(|(completed, priority)| {
                priority
                    .parse::<Priority>()
                    .map(|priority| (completed, priority))
                    .map_err(|err| TaskError::Storage(err.to_string()))
            })
            .collect::<Result<Vec<_>, TaskError>>()?;
        Ok(TaskStats::tally(entries))
    }
}

/// Loads a row inside `conn`, taking a row lock where the backend supports it.
async fn find_for_update<C: ConnectionTrait>(
    conn: &C,
    id: TaskId,
) -> Result<task::Model, TaskError> {
    let mut query = task::Entity::find_by_id(id.to_string());
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await
        .map_err(storage_error)?
        .ok_or(TaskError::NotFound(id))
}

fn active_model(task: &Task) -> task::ActiveModel {
    task::ActiveModel {
        id: ActiveValue::Set(task.id().to_string()),
        title: ActiveValue::Set(task.title().to_string()),
        description: ActiveValue::Set(task.description().map(str::to_string)),
        completed: ActiveValue::Set(task.completed()),
        priority: ActiveValue::Set(task.priority().as_str().to_string()),
        created_at: ActiveValue::Set(task.created_at()),
        updated_at: ActiveValue::Set(task.updated_at()),
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn storage_error(err: DbErr) -> TaskError {
    tracing::error!("Database error: {}", err);
    TaskError::Storage(err.to_string())
}

fn corrupt_row(id: &str, err: TaskError) -> TaskError {
    tracing::error!("Corrupt task row {}: {}", id, err);
    TaskError::Storage(format!("corrupt task row {}: {}", id, err))
}
