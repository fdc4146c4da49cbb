use crate::task::TaskState;
use crate::task::api::v1;
use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

/// JSON response for API errors
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine readable category: VALIDATION_ERROR, NOT_FOUND or INTERNAL_ERROR
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: String) -> Self {
        Self {
            error: error.to_string(),
            message,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        v1::list_tasks_handler,
        v1::get_task_handler,
        v1::tasks_by_priority_handler,
        v1::search_tasks_handler,
        v1::task_stats_handler,
        v1::create_task_handler,
        v1::update_task_handler,
        v1::delete_task_handler,
        v1::toggle_task_complete_handler,
    ),
    components(schemas(
        v1::TaskJson,
        v1::PriorityJson,
        v1::TasksResponse,
        v1::TaskStatsJson,
        v1::DeleteTaskResponse,
        v1::CreateTaskRequest,
        v1::UpdateTaskRequest,
        ErrorResponse,
    )),
    tags((name = "Tasks", description = "Task store queries and mutations"))
)]
pub struct ApiDoc;

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(task_state: TaskState) -> Router {
    Router::new().nest("/api/v1", v1::create_api_router(task_state))
}
