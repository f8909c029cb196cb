//! Integration tests for task collection reconciliation against a live
//! HTTP service.
//!
//! Each test spins up an in-process axum server on an ephemeral port and
//! drives a `TaskStore` through fetch, create, toggle, and delete,
//! asserting the local cache tracks the server's answers and never
//! mutates on failure.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};

use taskdeck::client::{ApiClient, ApiError};
use taskdeck::tasks::{TaskError, TaskStore};
use taskdeck_proto::task::{NewTask, TaskId};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Serves the router on an ephemeral port and returns its base URL.
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// An authenticated store pointed at the server.
fn make_store(base_url: &str) -> TaskStore {
    let client = Arc::new(ApiClient::new(base_url, Duration::from_secs(5)));
    client.set_token("t1");
    TaskStore::new(client)
}

fn task_json(id: &str, title: &str, is_completed: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "is_completed": is_completed,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

/// A `GET /tasks` route serving whatever the shared list holds.
fn list_route(tasks: &Arc<Mutex<Vec<Value>>>) -> axum::routing::MethodRouter {
    let tasks = Arc::clone(tasks);
    get(move || {
        let tasks = Arc::clone(&tasks);
        async move { Json(json!({"tasks": tasks.lock().clone()})) }
    })
}

fn local_ids(store: &TaskStore) -> Vec<String> {
    store.tasks().iter().map(|t| t.id.to_string()).collect()
}

// ===========================================================================
// Fetch
// ===========================================================================

#[tokio::test]
async fn fetch_replaces_the_collection_wholesale() {
    let tasks = Arc::new(Mutex::new(vec![
        task_json("a", "Alpha", false),
        task_json("b", "Beta", false),
    ]));
    let app = Router::new().route("/tasks", list_route(&tasks));
    let base_url = spawn_server(app).await;

    let mut store = make_store(&base_url);
    store.fetch_all().await.unwrap();
    assert_eq!(local_ids(&store), vec!["a", "b"]);

    // The server's view moves on; a refetch must not merge.
    *tasks.lock() = vec![task_json("b", "Beta", true), task_json("c", "Gamma", false)];
    store.fetch_all().await.unwrap();

    assert_eq!(local_ids(&store), vec!["b", "c"]);
    assert!(store.tasks()[0].is_completed);
    assert!(store.error().is_none());
    assert!(!store.is_loading());
}

#[tokio::test]
async fn fetch_failure_keeps_the_previous_collection() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let app = Router::new().route(
        "/tasks",
        get(move || {
            let calls = Arc::clone(&counter);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::OK, Json(json!({"tasks": [task_json("a", "Alpha", false)]})))
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "boom"})))
                }
            }
        }),
    );
    let base_url = spawn_server(app).await;

    let mut store = make_store(&base_url);
    store.fetch_all().await.unwrap();
    assert_eq!(local_ids(&store), vec!["a"]);

    let err = store.fetch_all().await.unwrap_err();
    assert!(matches!(
        err,
        TaskError::Api(ApiError::RequestFailed { status: 500, ref message }) if message == "boom"
    ));
    assert_eq!(local_ids(&store), vec!["a"]);
    assert!(store.error().is_some());
    assert!(!store.is_loading());
}

// ===========================================================================
// Create
// ===========================================================================

#[tokio::test]
async fn create_appends_the_server_version() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let app = Router::new().route(
        "/tasks",
        post(move |Json(body): Json<Value>| {
            let seen = Arc::clone(&recorder);
            async move {
                seen.lock().push(body);
                // The server assigns the id and timestamps.
                (StatusCode::CREATED, Json(task_json("srv-1", "Buy milk", false)))
            }
        }),
    );
    let base_url = spawn_server(app).await;

    let mut store = make_store(&base_url);
    store
        .create(NewTask::new("Buy milk").with_description("Two liters"))
        .await
        .unwrap();

    assert_eq!(local_ids(&store), vec!["srv-1"]);
    assert_eq!(store.tasks()[0].title, "Buy milk");

    let bodies = seen.lock();
    assert_eq!(bodies[0]["title"], "Buy milk");
    assert_eq!(bodies[0]["description"], "Two liters");
}

#[tokio::test]
async fn create_failure_leaves_the_collection_unchanged() {
    let tasks = Arc::new(Mutex::new(vec![task_json("a", "Alpha", false)]));
    let app = Router::new().route(
        "/tasks",
        list_route(&tasks).post(|| async {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "boom"})))
        }),
    );
    let base_url = spawn_server(app).await;

    let mut store = make_store(&base_url);
    store.fetch_all().await.unwrap();
    let snapshot = store.tasks().to_vec();

    let err = store.create(NewTask::new("Doomed")).await.unwrap_err();
    assert!(matches!(
        err,
        TaskError::Api(ApiError::RequestFailed { status: 500, .. })
    ));
    assert_eq!(store.tasks(), snapshot.as_slice());
    assert_eq!(store.error(), Some("request failed (500): boom"));
}

// ===========================================================================
// Toggle
// ===========================================================================

#[tokio::test]
async fn toggle_adopts_the_server_answer_not_the_request() {
    let tasks = Arc::new(Mutex::new(vec![task_json("a", "Alpha", false)]));
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let app = Router::new()
        .route("/tasks", list_route(&tasks))
        .route(
            "/tasks/{id}",
            put(move |Path(id): Path<String>, Json(patch): Json<Value>| {
                let seen = Arc::clone(&recorder);
                async move {
                    seen.lock().push(patch);
                    // The server declines the change and answers with the
                    // state it kept.
                    Json(task_json(&id, "Alpha", false))
                }
            }),
        );
    let base_url = spawn_server(app).await;

    let mut store = make_store(&base_url);
    store.fetch_all().await.unwrap();

    store.toggle_complete(&TaskId::new("a"), true).await.unwrap();

    // The request carried the desired state; the cache holds the server's.
    assert_eq!(seen.lock()[0]["is_completed"], true);
    assert!(!store.tasks()[0].is_completed);
}

#[tokio::test]
async fn toggle_unknown_id_is_a_silent_no_op_locally() {
    let tasks = Arc::new(Mutex::new(vec![task_json("a", "Alpha", false)]));
    let app = Router::new()
        .route("/tasks", list_route(&tasks))
        .route(
            "/tasks/{id}",
            put(|Path(id): Path<String>| async move { Json(task_json(&id, "Ghost", true)) }),
        );
    let base_url = spawn_server(app).await;

    let mut store = make_store(&base_url);
    store.fetch_all().await.unwrap();
    let snapshot = store.tasks().to_vec();

    store
        .toggle_complete(&TaskId::new("missing"), true)
        .await
        .unwrap();

    assert_eq!(store.tasks(), snapshot.as_slice());
    assert!(store.error().is_none());
}

// ===========================================================================
// Delete
// ===========================================================================

#[tokio::test]
async fn delete_removes_the_task_by_identity() {
    let tasks = Arc::new(Mutex::new(vec![
        task_json("a", "Alpha", false),
        task_json("b", "Beta", false),
    ]));
    let app = Router::new()
        .route("/tasks", list_route(&tasks))
        .route(
            "/tasks/{id}",
            delete(|Path(_id): Path<String>| async { StatusCode::NO_CONTENT }),
        );
    let base_url = spawn_server(app).await;

    let mut store = make_store(&base_url);
    store.fetch_all().await.unwrap();

    store.delete(&TaskId::new("a")).await.unwrap();

    assert_eq!(local_ids(&store), vec!["b"]);
}

#[tokio::test]
async fn delete_failure_leaves_the_collection_unchanged() {
    let tasks = Arc::new(Mutex::new(vec![task_json("a", "Alpha", false)]));
    let app = Router::new()
        .route("/tasks", list_route(&tasks))
        .route(
            "/tasks/{id}",
            delete(|| async {
                (StatusCode::NOT_FOUND, Json(json!({"detail": "no such task"})))
            }),
        );
    let base_url = spawn_server(app).await;

    let mut store = make_store(&base_url);
    store.fetch_all().await.unwrap();

    let err = store.delete(&TaskId::new("a")).await.unwrap_err();
    assert!(matches!(
        err,
        TaskError::Api(ApiError::RequestFailed { status: 404, .. })
    ));
    assert_eq!(local_ids(&store), vec!["a"]);
}

// ===========================================================================
// Credential gating
// ===========================================================================

#[tokio::test]
async fn missing_credential_never_reaches_the_server() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new().route(
        "/tasks",
        get(move || {
            let hits = Arc::clone(&counter);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({"tasks": []}))
            }
        }),
    );
    let base_url = spawn_server(app).await;

    // No token set on this client.
    let client = Arc::new(ApiClient::new(&base_url, Duration::from_secs(5)));
    let mut store = TaskStore::new(client);

    let err = store.fetch_all().await.unwrap_err();
    assert!(matches!(err, TaskError::Api(ApiError::Unauthenticated)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
