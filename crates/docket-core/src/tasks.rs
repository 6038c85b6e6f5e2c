use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Wire format for due dates.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors produced by task repository implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskStoreError {
    /// Input failed validation.
    #[error("{message}")]
    Validation { message: String },
    /// No task exists with the requested id.
    #[error("Task not found.")]
    NotFound { id: u64 },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

impl TaskStoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        TaskStoreError::Validation {
            message: message.into(),
        }
    }
}

/// Task entity, as served over the API and laid out in the durable file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub completed: bool,
    /// `YYYY-MM-DD`, or `None` when the task has no due date. Serialized as
    /// an explicit `null` so the durable file always carries the field.
    pub due_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a task. Both fields tolerate being absent so the
/// repository can report the required-title error itself instead of failing
/// at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            due_date: None,
        }
    }

    pub fn due(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }
}

/// Three-state field for partial updates. A field that was not sent must be
/// distinguishable from one sent as JSON `null` and from one sent with a
/// value: clearing a due date is expressed by sending `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Missing,
    Null,
    Value(T),
}

fn patch_field<'de, T, D>(deserializer: D) -> Result<Patch<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(match Option::<T>::deserialize(deserializer)? {
        Some(value) => Patch::Value(value),
        None => Patch::Null,
    })
}

/// Partial-update payload. Fields absent from the request body stay
/// `Missing` and leave the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default, deserialize_with = "patch_field")]
    pub title: Patch<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub due_date: Patch<String>,
    #[serde(default, deserialize_with = "patch_field")]
    pub completed: Patch<bool>,
}

/// Validate and normalize a raw due-date value. Absent input, the empty
/// string, and the literal string `"null"` (sent by form-backed clients) all
/// mean "no due date". Anything else must parse as `YYYY-MM-DD` and is
/// re-emitted zero-padded.
pub fn normalize_due_date(raw: Option<&str>) -> Result<Option<String>, TaskStoreError> {
    let raw = match raw {
        Some(value) if !value.is_empty() && value != "null" => value,
        _ => return Ok(None),
    };
    let date = NaiveDate::parse_from_str(raw, DUE_DATE_FORMAT)
        .map_err(|_| TaskStoreError::validation("Invalid date format. Use YYYY-MM-DD."))?;
    Ok(Some(date.format(DUE_DATE_FORMAT).to_string()))
}

/// Trim a title, rejecting whitespace-only input with the caller's message.
pub fn trimmed_title(raw: &str, message: &str) -> Result<String, TaskStoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskStoreError::validation(message));
    }
    Ok(trimmed.to_string())
}

/// Repository contract for task persistence.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Full collection in insertion order; never paginated or filtered.
    async fn list(&self) -> Result<Vec<Task>, TaskStoreError>;

    /// Validate the draft, assign the next id, and persist the new task.
    async fn create(&self, draft: NewTask) -> Result<Task, TaskStoreError>;

    /// Fetch a single task by id.
    async fn get(&self, id: u64) -> Result<Task, TaskStoreError>;

    /// Apply the present fields of `patch`, refresh `updated_at`, persist.
    async fn update(&self, id: u64, patch: TaskPatch) -> Result<Task, TaskStoreError>;

    /// Remove a task. Its id is never reused.
    async fn delete(&self, id: u64) -> Result<(), TaskStoreError>;
}
