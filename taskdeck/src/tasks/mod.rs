//! Task collection ownership and reconciliation against the service.
//!
//! The local collection is a cache of server state, not the source of
//! truth: every successful response reconciles it (replace, append,
//! field-adopt, or remove), and a failed call leaves it untouched. There
//! are no optimistic task mutations.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use taskdeck_proto::task::{
    MAX_TASK_TITLE_LENGTH, NewTask, Task, TaskId, TaskListResponse, TaskPatch,
};

use crate::client::{ApiClient, ApiError};

/// Errors from task operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,

    /// Task title exceeds the maximum length.
    #[error("task title too long (max {MAX_TASK_TITLE_LENGTH} characters)")]
    TitleTooLong,

    /// The remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Local cache of the signed-in user's tasks.
///
/// All operations share one `is_loading`/`error` pair: each call resets
/// the error and holds the loading flag for its own duration. The store
/// does not serialize overlapping calls — later completions overwrite
/// earlier flags (accepted for single-user usage; the view disables
/// concurrent submission while `is_loading` is true).
pub struct TaskStore {
    client: Arc<ApiClient>,
    tasks: Vec<Task>,
    is_loading: bool,
    error: Option<String>,
}

impl TaskStore {
    /// Creates an empty store over the given transport.
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            tasks: Vec::new(),
            is_loading: false,
            error: None,
        }
    }

    /// Read-only snapshot of the cached collection.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Whether an operation is currently in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The most recent operation failure, for passive display.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replaces the entire local collection with the server's list.
    ///
    /// Full reconciliation, never a merge, so the local cache cannot
    /// drift from the server's ordering or filtering.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Api`]; the failure message is also recorded
    /// locally. A failed fetch leaves the previous collection in place.
    pub async fn fetch_all(&mut self) -> Result<(), TaskError> {
        self.begin();
        let result = self
            .client
            .request::<()>(Method::GET, "/tasks", None, true)
            .await
            .map_err(TaskError::Api)
            .and_then(|value| {
                serde_json::from_value::<TaskListResponse>(value)
                    .map_err(|e| TaskError::Api(ApiError::MalformedResponse(e.to_string())))
            });
        let list = self.finish(result)?;
        self.tasks = list.tasks;
        Ok(())
    }

    /// Creates a task and appends the server's version of it.
    ///
    /// The server assigns the id and timestamps; there is no optimistic
    /// insert, so a failed create leaves the collection untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TitleEmpty`]/[`TaskError::TitleTooLong`] for
    /// local validation failures (no network call is made), or
    /// [`TaskError::Api`] for remote failures.
    pub async fn create(&mut self, new_task: NewTask) -> Result<(), TaskError> {
        self.begin();
        let result = match validate_title(&new_task.title) {
            Ok(()) => {
                self.client
                    .request(Method::POST, "/tasks", Some(&new_task), true)
                    .await
                    .map_err(TaskError::Api)
                    .and_then(decode_task)
            }
            Err(err) => Err(err),
        };
        let task = self.finish(result)?;
        self.tasks.push(task);
        Ok(())
    }

    /// Sends the desired completion state and adopts the server's answer.
    ///
    /// The server is authoritative: only the `is_completed` field of the
    /// matching local task is updated, and it takes the returned value
    /// even when that differs from the requested one. An id with no
    /// matching local task is a silent no-op on the collection.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Api`]; the failure message is also recorded
    /// locally.
    pub async fn toggle_complete(&mut self, id: &TaskId, completed: bool) -> Result<(), TaskError> {
        self.begin();
        let patch = TaskPatch {
            is_completed: completed,
        };
        let result = self
            .client
            .request(Method::PUT, &format!("/tasks/{id}"), Some(&patch), true)
            .await
            .map_err(TaskError::Api)
            .and_then(decode_task);
        let updated = self.finish(result)?;
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == *id) {
            task.is_completed = updated.is_completed;
        }
        Ok(())
    }

    /// Deletes a task and removes it from the local collection by identity.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Api`]; a failed delete leaves the collection
    /// untouched.
    pub async fn delete(&mut self, id: &TaskId) -> Result<(), TaskError> {
        self.begin();
        let result = self
            .client
            .request::<()>(Method::DELETE, &format!("/tasks/{id}"), None, true)
            .await
            .map_err(TaskError::Api);
        self.finish(result)?;
        self.tasks.retain(|t| t.id != *id);
        Ok(())
    }

    fn begin(&mut self) {
        self.error = None;
        self.is_loading = true;
    }

    /// Clears the loading flag on every path and records failures locally
    /// before propagating them, so callers can react via the store state
    /// or the returned error.
    fn finish<T>(&mut self, result: Result<T, TaskError>) -> Result<T, TaskError> {
        self.is_loading = false;
        result.inspect_err(|err| {
            self.error = Some(err.to_string());
        })
    }
}

fn decode_task(value: Value) -> Result<Task, TaskError> {
    serde_json::from_value(value)
        .map_err(|e| TaskError::Api(ApiError::MalformedResponse(e.to_string())))
}

fn validate_title(title: &str) -> Result<(), TaskError> {
    if title.is_empty() {
        return Err(TaskError::TitleEmpty);
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(TaskError::TitleTooLong);
    }
    Ok(())
}
