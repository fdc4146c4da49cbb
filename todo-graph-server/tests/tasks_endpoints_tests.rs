use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use insta::assert_debug_snapshot;
use serde_json::{Value, json};
use std::sync::Arc;
use todo_graph::InMemoryTaskStore;
use todo_graph_server::task::TaskState;
use todo_graph_server::task::api::v1::{TaskJson, TaskStatsJson, TasksResponse};
use todo_graph_server::web::api::ErrorResponse;
use todo_graph_server::web::create_app;
use tower::ServiceExt;

/// Test context for endpoint tests.
///
/// The router is cloned per request so every request sees the same store.
struct TestContext {
    app: Router,
}

impl TestContext {
    fn new() -> Self {
        // Allow multiple calls to init for tests.
        let _ = tracing_subscriber::fmt().try_init();
        let state = TaskState::new(Arc::new(InMemoryTaskStore::new()));
        Self {
            app: create_app(state),
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn create(&self, body: Value) -> TaskJson {
        let (status, bytes) = self.send(Method::POST, "/api/v1/tasks", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn list(&self, uri: &str) -> TasksResponse {
        let (status, bytes) = self.send(Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&bytes).unwrap()
    }
}

fn error_code(bytes: &[u8]) -> String {
    serde_json::from_slice::<ErrorResponse>(bytes).unwrap().error
}

#[tokio::test]
async fn can_create_task_with_default_priority() {
    let ctx = TestContext::new();

    let task = ctx.create(json!({ "title": "  Buy milk  " })).await;

    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.description, None);
    assert!(!task.completed);
    assert_eq!(
        serde_json::to_value(task.priority).unwrap(),
        json!("MEDIUM")
    );
    assert_eq!(task.created_at, task.updated_at);
}

#[tokio::test]
async fn can_serialize_task_fields_in_camel_case() {
    let ctx = TestContext::new();
    ctx.create(json!({ "title": "Shape check", "priority": "high" }))
        .await;

    let (_, bytes) = ctx.send(Method::GET, "/api/v1/tasks", None).await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["count"], json!(1));
    let task = &body["tasks"][0];
    assert_eq!(task["priority"], json!("HIGH"));
    assert!(task["createdAt"].is_string());
    assert!(task["updatedAt"].is_string());
    assert!(task["description"].is_null());
}

#[tokio::test]
async fn can_reject_invalid_create_requests() {
    let ctx = TestContext::new();

    let cases = [
        json!({ "title": "" }),
        json!({ "title": "   " }),
        json!({ "description": "no title" }),
        json!({ "title": "Bad priority", "priority": "URGENT" }),
        json!({ "title": 42 }),
    ];
    for body in cases {
        let (status, bytes) = ctx
            .send(Method::POST, "/api/v1/tasks", Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(error_code(&bytes), "VALIDATION_ERROR");
    }

    assert_eq!(ctx.list("/api/v1/tasks").await.count, 0);
}

#[tokio::test]
async fn can_report_malformed_query_and_path_as_validation_errors() {
    let ctx = TestContext::new();

    for uri in [
        "/api/v1/tasks?completed=maybe",
        "/api/v1/tasks/%FF",
        "/api/v1/tasks/priority/%FF",
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(error_code(&bytes), "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn can_filter_list_by_completion() {
    let ctx = TestContext::new();
    let done = ctx.create(json!({ "title": "Done" })).await;
    ctx.create(json!({ "title": "Pending" })).await;
    let (status, _) = ctx
        .send(
            Method::POST,
            &format!("/api/v1/tasks/{}/toggle", done.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let completed = ctx.list("/api/v1/tasks?completed=true").await;
    let pending = ctx.list("/api/v1/tasks?completed=false").await;
    let all = ctx.list("/api/v1/tasks").await;

    assert_eq!(completed.count, 1);
    assert_eq!(completed.tasks[0].id, done.id);
    assert_eq!(pending.count, 1);
    assert_eq!(all.count, 2);
}

#[tokio::test]
async fn can_update_task_partially() {
    let ctx = TestContext::new();
    let task = ctx
        .create(json!({ "title": "Draft", "description": "v1", "priority": "LOW" }))
        .await;

    let (status, bytes) = ctx
        .send(
            Method::PATCH,
            &format!("/api/v1/tasks/{}", task.id),
            Some(json!({ "completed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let updated: TaskJson = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(updated.title, "Draft");
    assert_eq!(updated.description.as_deref(), Some("v1"));
    assert!(updated.completed);
    assert_eq!(updated.priority, task.priority);
    assert!(updated.updated_at > task.updated_at);
    assert_eq!(updated.created_at, task.created_at);
}

#[tokio::test]
async fn can_clear_description_with_empty_string() {
    let ctx = TestContext::new();
    let task = ctx
        .create(json!({ "title": "Notes", "description": "remove me" }))
        .await;

    let (status, bytes) = ctx
        .send(
            Method::PATCH,
            &format!("/api/v1/tasks/{}", task.id),
            Some(json!({ "description": "" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let updated: TaskJson = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(updated.description, None);
}

#[tokio::test]
async fn can_reject_empty_title_on_update_and_keep_task() {
    let ctx = TestContext::new();
    let task = ctx.create(json!({ "title": "Original" })).await;

    let (status, bytes) = ctx
        .send(
            Method::PATCH,
            &format!("/api/v1/tasks/{}", task.id),
            Some(json!({ "title": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&bytes), "VALIDATION_ERROR");

    let (_, bytes) = ctx
        .send(Method::GET, &format!("/api/v1/tasks/{}", task.id), None)
        .await;
    let unchanged: TaskJson = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(unchanged, task);
}

#[tokio::test]
async fn can_delete_task_then_report_not_found() {
    let ctx = TestContext::new();
    let task = ctx.create(json!({ "title": "Short lived" })).await;
    let uri = format!("/api/v1/tasks/{}", task.id);

    let (status, bytes) = ctx.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "deleted": true }));

    let (status, bytes) = ctx.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&bytes), "NOT_FOUND");

    let (status, _) = ctx.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn can_report_not_found_for_unknown_ids() {
    let ctx = TestContext::new();
    let unknown = "6f1c1f5e-3b1a-4c5e-9a55-0d1b2c3d4e5f";

    for (method, uri, body) in [
        (Method::GET, format!("/api/v1/tasks/{unknown}"), None),
        (
            Method::PATCH,
            format!("/api/v1/tasks/{unknown}"),
            Some(json!({ "title": "New" })),
        ),
        (Method::POST, format!("/api/v1/tasks/{unknown}/toggle"), None),
    ] {
        let (status, bytes) = ctx.send(method, &uri, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "uri: {uri}");
        assert_eq!(error_code(&bytes), "NOT_FOUND");
    }
}

#[tokio::test]
async fn can_search_and_filter_by_priority() {
    let ctx = TestContext::new();
    ctx.create(json!({ "title": "Write report", "priority": "HIGH" }))
        .await;
    ctx.create(json!({ "title": "Write tests" })).await;
    ctx.create(json!({ "title": "Call mom", "priority": "HIGH" }))
        .await;

    let found = ctx.list("/api/v1/tasks/search?query=WRITE").await;
    let mut titles: Vec<String> = found.tasks.into_iter().map(|task| task.title).collect();
    titles.sort();
    assert_eq!(titles, vec!["Write report", "Write tests"]);

    let blank = ctx.list("/api/v1/tasks/search?query=").await;
    assert_eq!(blank.count, 0);

    let high = ctx.list("/api/v1/tasks/priority/HIGH").await;
    assert_eq!(high.count, 2);

    let (status, bytes) = ctx
        .send(Method::GET, "/api/v1/tasks/priority/SOMEDAY", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&bytes), "VALIDATION_ERROR");
}

#[tokio::test]
async fn can_report_stats() {
    let ctx = TestContext::new();
    let urgent = ctx
        .create(json!({ "title": "Urgent", "priority": "HIGH" }))
        .await;
    ctx.create(json!({ "title": "Someday", "priority": "LOW" }))
        .await;
    ctx.create(json!({ "title": "Whenever" })).await;
    ctx.send(
        Method::POST,
        &format!("/api/v1/tasks/{}/toggle", urgent.id),
        None,
    )
    .await;

    let (status, bytes) = ctx.send(Method::GET, "/api/v1/tasks/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    let stats: TaskStatsJson = serde_json::from_slice(&bytes).unwrap();

    assert_debug_snapshot!(stats, @r"
    TaskStatsJson {
        total: 3,
        completed: 1,
        pending: 2,
        high_priority: 1,
    }
    ");
}
