use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use docket_core::tasks::{
    normalize_due_date, trimmed_title, NewTask, Patch, Task, TaskPatch, TaskRepository,
    TaskStoreError,
};
use tempfile::NamedTempFile;
use tracing::{instrument, warn};

/// File-backed task repository implementing the shared `TaskRepository`
/// contract. The in-memory list is authoritative for the process lifetime;
/// the durable file is rewritten wholesale after every successful mutation.
///
/// The mutex spans each operation's whole validate/mutate/persist sequence,
/// so concurrent handlers cannot interleave a lost update between the list
/// and the file.
pub struct JsonFileRepo {
    path: PathBuf,
    state: Mutex<RepoState>,
}

#[derive(Debug)]
struct RepoState {
    tasks: Vec<Task>,
    next_id: u64,
}

impl JsonFileRepo {
    /// Open a repository rooted at `path`, loading any previously persisted
    /// collection. A missing, unreadable, or non-list file starts empty; the
    /// id counter resumes at one past the highest id seen.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tasks = load_tasks(&path);
        let next_id = tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1;
        Self {
            path,
            state: Mutex::new(RepoState { tasks, next_id }),
        }
    }

    /// Path of the durable file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, RepoState>, TaskStoreError> {
        self.state.lock().map_err(|err| TaskStoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }

    /// Serialize the full collection and replace the durable file in one
    /// rename, so a failed write never leaves a truncated file behind.
    fn persist(&self, tasks: &[Task]) -> Result<(), TaskStoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(storage_err)?;

        let json = serde_json::to_vec_pretty(tasks).map_err(storage_err)?;
        let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
        tmp.write_all(&json).map_err(storage_err)?;
        tmp.flush().map_err(storage_err)?;
        tmp.persist(&self.path).map_err(|e| storage_err(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for JsonFileRepo {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Task>, TaskStoreError> {
        Ok(self.lock()?.tasks.clone())
    }

    #[instrument(skip(self, draft))]
    async fn create(&self, draft: NewTask) -> Result<Task, TaskStoreError> {
        // Validate before touching state: a rejected draft consumes no id.
        let title = trimmed_title(
            draft.title.as_deref().unwrap_or(""),
            "Field 'title' is required and cannot be empty.",
        )?;
        let due_date = normalize_due_date(draft.due_date.as_deref())?;

        let mut state = self.lock()?;
        let now = Utc::now();
        let task = Task {
            id: state.next_id,
            title,
            completed: false,
            due_date,
            created_at: now,
            updated_at: now,
        };

        // Persist-then-commit: a failed write leaves both the collection and
        // the id counter untouched.
        let mut tasks = state.tasks.clone();
        tasks.push(task.clone());
        self.persist(&tasks)?;
        state.tasks = tasks;
        state.next_id += 1;
        Ok(task)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: u64) -> Result<Task, TaskStoreError> {
        let state = self.lock()?;
        state
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or(TaskStoreError::NotFound { id })
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: u64, patch: TaskPatch) -> Result<Task, TaskStoreError> {
        let mut state = self.lock()?;
        let index = state
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(TaskStoreError::NotFound { id })?;

        let mut tasks = state.tasks.clone();
        apply_patch(&mut tasks[index], patch)?;
        self.persist(&tasks)?;
        state.tasks = tasks;
        Ok(state.tasks[index].clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: u64) -> Result<(), TaskStoreError> {
        let mut state = self.lock()?;
        let index = state
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(TaskStoreError::NotFound { id })?;

        // Deleted ids are never renumbered or reused.
        let mut tasks = state.tasks.clone();
        tasks.remove(index);
        self.persist(&tasks)?;
        state.tasks = tasks;
        Ok(())
    }
}

/// Apply the present fields of `patch`. `updated_at` advances whenever the
/// task was found, even if no field changed.
fn apply_patch(task: &mut Task, patch: TaskPatch) -> Result<(), TaskStoreError> {
    match patch.title {
        Patch::Missing => {}
        Patch::Null => {
            return Err(TaskStoreError::validation("Field 'title' cannot be empty."));
        }
        Patch::Value(raw) => {
            task.title = trimmed_title(&raw, "Field 'title' cannot be empty.")?;
        }
    }

    match patch.due_date {
        Patch::Missing => {}
        Patch::Null => task.due_date = None,
        Patch::Value(raw) => task.due_date = normalize_due_date(Some(&raw))?,
    }

    match patch.completed {
        Patch::Missing => {}
        Patch::Null => {
            return Err(TaskStoreError::validation(
                "Field 'completed' must be a boolean.",
            ));
        }
        Patch::Value(value) => task.completed = value,
    }

    task.updated_at = Utc::now();
    Ok(())
}

fn load_tasks(path: &Path) -> Vec<Task> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!("could not read task file {}: {err}", path.display());
            return Vec::new();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(tasks) => tasks,
        Err(err) => {
            warn!(
                "task file {} does not hold a task list, starting empty: {err}",
                path.display()
            );
            Vec::new()
        }
    }
}

fn storage_err<E: ToString>(err: E) -> TaskStoreError {
    TaskStoreError::Storage {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_in(dir: &Path) -> JsonFileRepo {
        JsonFileRepo::open(dir.join("tasks.json"))
    }

    #[tokio::test]
    async fn create_trims_title_and_sets_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());

        let task = repo
            .create(NewTask::titled("  Buy milk  ").due("2025-09-01"))
            .await
            .expect("create");

        assert_eq!(task.id, 1);
        assert_eq!(task.title, "Buy milk");
        assert!(!task.completed);
        assert_eq!(task.due_date.as_deref(), Some("2025-09-01"));
        assert_eq!(task.created_at, task.updated_at);

        let on_disk = fs::read_to_string(repo.path()).expect("durable file");
        assert!(on_disk.contains("Buy milk"));
    }

    #[tokio::test]
    async fn persisted_file_is_a_json_array_with_explicit_nulls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());
        repo.create(NewTask::titled("No due date"))
            .await
            .expect("create");

        let raw = fs::read_to_string(repo.path()).expect("durable file");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        let entries = value.as_array().expect("array layout");
        assert_eq!(entries.len(), 1);
        assert!(entries[0].get("due_date").expect("field").is_null());
    }

    #[tokio::test]
    async fn blank_title_is_rejected_and_consumes_no_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());

        let err = repo
            .create(NewTask::titled("   "))
            .await
            .expect_err("blank title");
        assert!(matches!(err, TaskStoreError::Validation { .. }));
        assert!(repo.list().await.expect("list").is_empty());

        let task = repo
            .create(NewTask::titled("Real"))
            .await
            .expect("create after rejection");
        assert_eq!(task.id, 1);
    }

    #[tokio::test]
    async fn malformed_due_date_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());

        let err = repo
            .create(NewTask::titled("Ship").due("next week"))
            .await
            .expect_err("bad date");
        assert_eq!(
            err,
            TaskStoreError::validation("Invalid date format. Use YYYY-MM-DD.")
        );
    }

    #[tokio::test]
    async fn due_date_is_normalized_zero_padded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());

        let task = repo
            .create(NewTask::titled("Pad me").due("2025-9-1"))
            .await
            .expect("create");
        assert_eq!(task.due_date.as_deref(), Some("2025-09-01"));
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());

        let err = repo.get(42).await.expect_err("missing task");
        assert_eq!(err, TaskStoreError::NotFound { id: 42 });
    }

    #[tokio::test]
    async fn update_with_only_completed_leaves_other_fields_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());
        let created = repo
            .create(NewTask::titled("Buy milk").due("2025-09-01"))
            .await
            .expect("create");

        let patch = TaskPatch {
            completed: Patch::Value(true),
            ..TaskPatch::default()
        };
        let updated = repo.update(created.id, patch).await.expect("update");

        assert!(updated.completed);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.due_date, created.due_date);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn update_with_null_due_date_clears_it_idempotently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());
        let created = repo
            .create(NewTask::titled("Buy milk").due("2025-09-01"))
            .await
            .expect("create");

        let cleared = repo
            .update(
                created.id,
                TaskPatch {
                    due_date: Patch::Null,
                    ..TaskPatch::default()
                },
            )
            .await
            .expect("clear");
        assert_eq!(cleared.due_date, None);

        // Clearing an already-clear due date still succeeds.
        let cleared_again = repo
            .update(
                created.id,
                TaskPatch {
                    due_date: Patch::Null,
                    ..TaskPatch::default()
                },
            )
            .await
            .expect("clear again");
        assert_eq!(cleared_again.due_date, None);
    }

    #[tokio::test]
    async fn update_rejects_null_title_and_null_completed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());
        let created = repo
            .create(NewTask::titled("Keep me"))
            .await
            .expect("create");

        let err = repo
            .update(
                created.id,
                TaskPatch {
                    title: Patch::Null,
                    ..TaskPatch::default()
                },
            )
            .await
            .expect_err("null title");
        assert_eq!(err, TaskStoreError::validation("Field 'title' cannot be empty."));

        let err = repo
            .update(
                created.id,
                TaskPatch {
                    completed: Patch::Null,
                    ..TaskPatch::default()
                },
            )
            .await
            .expect_err("null completed");
        assert_eq!(
            err,
            TaskStoreError::validation("Field 'completed' must be a boolean.")
        );

        // Rejected updates change nothing, including `updated_at`.
        let current = repo.get(created.id).await.expect("get");
        assert_eq!(current, created);
    }

    #[tokio::test]
    async fn update_and_delete_on_unknown_ids_change_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());
        repo.create(NewTask::titled("Only one"))
            .await
            .expect("create");

        let err = repo
            .update(99, TaskPatch::default())
            .await
            .expect_err("unknown update");
        assert_eq!(err, TaskStoreError::NotFound { id: 99 });

        let err = repo.delete(99).await.expect_err("unknown delete");
        assert_eq!(err, TaskStoreError::NotFound { id: 99 });

        assert_eq!(repo.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn deleted_ids_are_never_reused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());

        for title in ["one", "two", "three"] {
            repo.create(NewTask::titled(title)).await.expect("create");
        }
        repo.delete(2).await.expect("delete");

        let fourth = repo
            .create(NewTask::titled("four"))
            .await
            .expect("create after delete");
        assert_eq!(fourth.id, 4);

        let ids: Vec<u64> = repo
            .list()
            .await
            .expect("list")
            .iter()
            .map(|task| task.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn reopening_restores_the_collection_and_the_counter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repo_in(dir.path());
        repo.create(NewTask::titled("Buy milk").due("2025-09-01"))
            .await
            .expect("create");
        repo.create(NewTask::titled("Walk dog"))
            .await
            .expect("create");
        let before = repo.list().await.expect("list");

        let reopened = repo_in(dir.path());
        let after = reopened.list().await.expect("list");
        assert_eq!(after, before);

        let next = reopened
            .create(NewTask::titled("After restart"))
            .await
            .expect("create");
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn unreadable_or_non_list_files_start_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");

        fs::write(&path, "not json at all").expect("write garbage");
        let repo = JsonFileRepo::open(&path);
        assert!(repo.list().await.expect("list").is_empty());

        fs::write(&path, r#"{"id": 1}"#).expect("write non-list");
        let repo = JsonFileRepo::open(&path);
        assert!(repo.list().await.expect("list").is_empty());

        let task = repo.create(NewTask::titled("Fresh")).await.expect("create");
        assert_eq!(task.id, 1);
    }

    #[tokio::test]
    async fn failed_persist_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        // The durable file's parent is a regular file, so every persist fails.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").expect("blocker file");
        let repo = JsonFileRepo::open(blocker.join("tasks.json"));

        let err = repo
            .create(NewTask::titled("Doomed"))
            .await
            .expect_err("persist should fail");
        assert!(matches!(err, TaskStoreError::Storage { .. }));
        assert!(repo.list().await.expect("list").is_empty());
    }
}
