use axum::Router;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::Database;
use std::any::Any;
use std::sync::Arc;
use todo_graph::{InMemoryTaskStore, TaskStore};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::task::{SeaOrmTaskStore, TaskState};

pub mod api;

use api::{ApiDoc, ErrorResponse, create_api_router};

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let store = connect_store(&config).await?;
    let app = create_app(TaskState::new(store));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Web server stopped");
    Ok(())
}

/// Builds the task store selected by the configuration.
///
/// With a `db_url` the store is backed by that database and pending migrations
/// are applied first; otherwise tasks live in memory for the life of the process.
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn TaskStore>> {
    match &config.db_url {
        Some(db_url) => {
            let db = Database::connect(db_url).await?;
            migration::Migrator::up(&db, None).await?;
            tracing::info!("Database migrations applied successfully");
            Ok(Arc::new(SeaOrmTaskStore::new(Arc::new(db))))
        }
        None => {
            tracing::info!("No DB_URL configured, tasks are kept in memory");
            Ok(Arc::new(InMemoryTaskStore::new()))
        }
    }
}

/// Assembles the full application router: health check, task API and API docs.
pub fn create_app(task_state: TaskState) -> Router {
    Router::new()
        .route("/health", get(health_check_handler))
        .merge(create_api_router(task_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .layer(CatchPanicLayer::custom(panic_response)),
        )
}

/// Turns a handler panic into the same 500 body as any other internal error.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Request handler panicked: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(
            "INTERNAL_ERROR",
            "An unexpected error occurred while processing your request. Please try again later."
                .to_string(),
        )),
    )
        .into_response()
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutdown signal received");
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
