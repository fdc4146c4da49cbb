use crate::task::TaskState;
use crate::web::api::ErrorResponse;
use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todo_graph::{NewTask, Priority, Task, TaskError, TaskId, TaskPatch, TaskStats};
use utoipa::{IntoParams, ToSchema};

/// Priority as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityJson {
    Low,
    Medium,
    High,
}

impl From<Priority> for PriorityJson {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => PriorityJson::Low,
            Priority::Medium => PriorityJson::Medium,
            Priority::High => PriorityJson::High,
        }
    }
}

/// JSON representation of a Task for API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Unique identifier for the task
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: PriorityJson,
    /// ISO-8601 creation timestamp
    pub created_at: DateTime<Utc>,
    /// ISO-8601 timestamp of the last mutation
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id().to_string(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            completed: task.completed(),
            priority: task.priority().into(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// API response for any operation returning several tasks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TasksResponse {
    pub tasks: Vec<TaskJson>,
    pub count: usize,
}

impl From<Vec<Task>> for TasksResponse {
    fn from(tasks: Vec<Task>) -> Self {
        let tasks: Vec<TaskJson> = tasks.into_iter().map(TaskJson::from).collect();
        let count = tasks.len();
        Self { tasks, count }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatsJson {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high_priority: usize,
}

impl From<TaskStats> for TaskStatsJson {
    fn from(stats: TaskStats) -> Self {
        Self {
            total: stats.total,
            completed: stats.completed,
            pending: stats.pending,
            high_priority: stats.high_priority,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteTaskResponse {
    pub deleted: bool,
}

/// Request payload for creating a task.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// Required, must not be blank
    #[serde(default)]
    pub title: Option<String>,
    pub description: Option<String>,
    /// One of LOW, MEDIUM, HIGH. Defaults to MEDIUM.
    pub priority: Option<String>,
}

impl CreateTaskRequest {
    /// Validates the raw payload into a [`NewTask`].
    pub fn into_new_task(self) -> Result<NewTask, TaskError> {
        let title = self
            .title
            .ok_or_else(|| TaskError::validation("title is required"))?;
        let priority: Option<Priority> = self
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?;
        NewTask::new(&title, self.description, priority)
    }
}

/// Request payload for a partial task update. Absent fields stay unchanged.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    /// An empty string clears the description
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<String>,
}

impl UpdateTaskRequest {
    /// Validates the raw payload into a [`TaskPatch`].
    pub fn into_patch(self) -> Result<TaskPatch, TaskError> {
        let priority: Option<Priority> = self
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()?;
        TaskPatch::new(
            self.title.as_deref(),
            self.description,
            self.completed,
            priority,
        )
    }
}

/// Query parameters for listing tasks.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTasksQuery {
    /// Only return tasks whose completion flag matches
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Query parameters for searching tasks.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchTasksQuery {
    /// Case-insensitive text matched against title and description
    #[serde(default)]
    pub query: String,
}

/// Error type for task API handlers.
#[derive(Debug, thiserror::Error)]
pub enum TaskApiError {
    /// The store rejected or failed the operation.
    #[error(transparent)]
    Task(#[from] TaskError),
    /// The request body was not valid JSON for the operation.
    #[error("Invalid request body")]
    InvalidBody(#[from] JsonRejection),
    #[error("Invalid query string")]
    InvalidQuery(#[from] QueryRejection),
    #[error("Invalid path parameter")]
    InvalidPath(#[from] PathRejection),
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        let (status_code, error, message) = match &self {
            TaskApiError::InvalidBody(rejection) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                rejection.body_text(),
            ),
            TaskApiError::InvalidQuery(rejection) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                rejection.body_text(),
            ),
            TaskApiError::InvalidPath(rejection) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                rejection.body_text(),
            ),
            TaskApiError::Task(TaskError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
            }
            TaskApiError::Task(not_found @ TaskError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", not_found.to_string())
            }
            TaskApiError::Task(TaskError::Storage(_)) => {
                tracing::error!("Task store failure: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred while processing your request. Please try again later."
                        .to_string(),
                )
            }
        };

        (status_code, Json(ErrorResponse::new(error, message))).into_response()
    }
}

/// Handler for GET /api/v1/tasks - Lists tasks, optionally filtered by completion.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = TasksResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<TaskState>,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> Result<Json<TasksResponse>, TaskApiError> {
    let Query(query) = query?;
    let tasks = state.store.list_tasks(query.completed).await?;
    Ok(Json(TasksResponse::from(tasks)))
}

/// Handler for GET /api/v1/tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task found", body = TaskJson),
        (status = 400, description = "Malformed task id", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<TaskState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let Path(id) = id?;
    let id: TaskId = id.parse()?;
    let task = state.store.get_task(id).await?;
    Ok(Json(task.into()))
}

/// Handler for GET /api/v1/tasks/priority/{priority} - Tasks with exactly this priority.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/priority/{priority}",
    params(("priority" = String, Path, description = "LOW, MEDIUM or HIGH")),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = TasksResponse),
        (status = 400, description = "Unknown priority", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn tasks_by_priority_handler(
    State(state): State<TaskState>,
    priority: Result<Path<String>, PathRejection>,
) -> Result<Json<TasksResponse>, TaskApiError> {
    let Path(priority) = priority?;
    let priority: Priority = priority.parse()?;
    let tasks = state.store.tasks_by_priority(priority).await?;
    Ok(Json(TasksResponse::from(tasks)))
}

/// Handler for GET /api/v1/tasks/search - Case-insensitive text search.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/search",
    params(SearchTasksQuery),
    responses(
        (status = 200, description = "Matching tasks; empty for a blank query", body = TasksResponse)
    ),
    tag = "Tasks"
)]
pub async fn search_tasks_handler(
    State(state): State<TaskState>,
    query: Result<Query<SearchTasksQuery>, QueryRejection>,
) -> Result<Json<TasksResponse>, TaskApiError> {
    let Query(query) = query?;
    let tasks = state.store.search_tasks(&query.query).await?;
    Ok(Json(TasksResponse::from(tasks)))
}

/// Handler for GET /api/v1/tasks/stats - Aggregate counts.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/stats",
    responses(
        (status = 200, description = "Current task statistics", body = TaskStatsJson),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn task_stats_handler(
    State(state): State<TaskState>,
) -> Result<Json<TaskStatsJson>, TaskApiError> {
    let stats = state.store.compute_stats().await?;
    Ok(Json(stats.into()))
}

/// Handler for POST /api/v1/tasks - Creates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<TaskState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskJson>), TaskApiError> {
    let Json(request) = payload?;
    let task = state.store.create_task(request.into_new_task()?).await?;
    tracing::info!("Created task {}", task.id());
    Ok((StatusCode::CREATED, Json(task.into())))
}

/// Handler for PATCH /api/v1/tasks/{id} - Partially updates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<TaskState>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let Path(id) = id?;
    let id: TaskId = id.parse()?;
    let Json(request) = payload?;
    let patch = request.into_patch()?;
    if patch.is_empty() {
        tracing::debug!("Empty update for task {}, only the timestamp changes", id);
    }
    let task = state.store.update_task(id, patch).await?;
    Ok(Json(task.into()))
}

/// Handler for DELETE /api/v1/tasks/{id} - Permanently removes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task deleted", body = DeleteTaskResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<TaskState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<DeleteTaskResponse>, TaskApiError> {
    let Path(id) = id?;
    let id: TaskId = id.parse()?;
    let deleted = state.store.delete_task(id).await?;
    tracing::info!("Deleted task {}", id);
    Ok(Json(DeleteTaskResponse { deleted }))
}

/// Handler for POST /api/v1/tasks/{id}/toggle - Flips the completion flag.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/toggle",
    params(("id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task toggled", body = TaskJson),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn toggle_task_complete_handler(
    State(state): State<TaskState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let Path(id) = id?;
    let id: TaskId = id.parse()?;
    let task = state.store.toggle_complete(id).await?;
    Ok(Json(task.into()))
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: TaskState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/stats", get(task_stats_handler))
        .route("/tasks/search", get(search_tasks_handler))
        .route("/tasks/priority/{priority}", get(tasks_by_priority_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .patch(update_task_handler)
                .delete(delete_task_handler),
        )
        .route("/tasks/{id}/toggle", post(toggle_task_complete_handler))
        .with_state(state)
}
