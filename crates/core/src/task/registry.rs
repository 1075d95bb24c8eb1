//! In-memory registry of active tasks.
//!
//! Registry membership is the single source of truth for "is this task
//! still running": a task is active exactly while it has an entry here.
//! Each entry carries a cancellation token that the drivers observe.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::types::{Task, TaskError, TaskId, TaskState};

struct Entry {
    task: Task,
    cancel: CancellationToken,
}

/// Shared map of active tasks keyed by id.
///
/// Cloning is cheap; all clones see the same entries.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<HashMap<TaskId, Entry>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TaskId, Entry>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TaskId, Entry>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a task and returns the context its drivers will run with.
    pub fn register(&self, task: Task) -> Result<TaskContext, TaskError> {
        let mut entries = self.write();
        if entries.contains_key(&task.id) {
            return Err(TaskError::AlreadyRegistered(task.id));
        }

        let id = task.id;
        let cancel = CancellationToken::new();
        entries.insert(
            id,
            Entry {
                task,
                cancel: cancel.clone(),
            },
        );
        debug!(task_id = %id, "Task registered");

        Ok(TaskContext {
            task_id: id,
            token: cancel,
            registry: self.clone(),
        })
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.read().contains_key(id)
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.read().get(id).map(|e| e.task.clone())
    }

    /// Snapshot of all active tasks, oldest first.
    pub fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.read().values().map(|e| e.task.clone()).collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Updates the state of an active task. Returns false if it is gone.
    pub fn set_state(&self, id: &TaskId, state: TaskState) -> bool {
        match self.write().get_mut(id) {
            Some(entry) => {
                entry.task.state = state;
                true
            }
            None => false,
        }
    }

    pub fn attach_process(&self, id: &TaskId, pid: u32) -> bool {
        match self.write().get_mut(id) {
            Some(entry) => {
                entry.task.process_id = Some(pid);
                true
            }
            None => false,
        }
    }

    pub fn detach_process(&self, id: &TaskId) {
        if let Some(entry) = self.write().get_mut(id) {
            entry.task.process_id = None;
        }
    }

    /// Removes a task and fires its cancellation token.
    ///
    /// Returns the removed task, or `None` if it was not registered.
    pub fn cancel(&self, id: &TaskId) -> Option<Task> {
        let entry = self.write().remove(id)?;
        entry.cancel.cancel();
        Some(entry.task)
    }

    /// Removes a task without cancelling it. Idempotent.
    pub fn finalize(&self, id: &TaskId) -> Option<Task> {
        self.write().remove(id).map(|e| e.task)
    }

    /// Fires every cancellation token and clears the registry.
    pub fn cancel_all(&self) -> Vec<Task> {
        let drained: Vec<Entry> = self.write().drain().map(|(_, e)| e).collect();
        drained
            .into_iter()
            .map(|e| {
                e.cancel.cancel();
                e.task
            })
            .collect()
    }
}

/// Handle given to the drivers of one task.
///
/// Carries the task id and its cancellation signal, plus access to the
/// registry for recording the external process id.
#[derive(Clone)]
pub struct TaskContext {
    task_id: TaskId,
    token: CancellationToken,
    registry: TaskRegistry,
}

impl TaskContext {
    /// A context not backed by any registry entry.
    ///
    /// Useful for driving a downloader or uploader on its own.
    pub fn detached(task_id: TaskId) -> Self {
        Self {
            task_id,
            token: CancellationToken::new(),
            registry: TaskRegistry::new(),
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once the task was cancelled or removed from the registry.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the task is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn attach_process(&self, pid: u32) {
        self.registry.attach_process(&self.task_id, pid);
    }

    pub fn detach_process(&self) {
        self.registry.detach_process(&self.task_id);
    }
}
