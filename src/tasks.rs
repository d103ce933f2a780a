//! The task list itself: an insertion-ordered collection of tasks.
//!
//! Tasks only ever enter the list through [`TaskList::append`], which the API
//! layer calls after the decision engine accepts a task. Each task gets a
//! generated uuid at creation; all lookups are by id, so a removal never
//! invalidates handles to the remaining tasks.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskListError {
    #[error("task text is empty")]
    EmptyText,

    #[error("no task with id {0}")]
    UnknownTask(Uuid),
}

/// A single entry in the task list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskItem {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
}

/// Insertion-ordered task list. Order is load-bearing: rendering shows tasks
/// in the order they were accepted.
#[derive(Debug, Default)]
pub struct TaskList {
    items: Vec<TaskItem>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task at the end of the list. Duplicate texts are never merged;
    /// appending the same text twice yields two entries with distinct ids.
    pub fn append(&mut self, text: &str) -> Result<&TaskItem, TaskListError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskListError::EmptyText);
        }
        self.items.push(TaskItem {
            id: Uuid::new_v4(),
            text: text.to_string(),
            completed: false,
        });
        Ok(self.items.last().unwrap())
    }

    /// Flip the completion state of a task. Returns the new state.
    pub fn toggle(&mut self, id: Uuid) -> Result<bool, TaskListError> {
        let item = self
            .items
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskListError::UnknownTask(id))?;
        item.completed = !item.completed;
        Ok(item.completed)
    }

    /// Remove a task. The relative order of the remaining tasks is preserved.
    pub fn remove(&mut self, id: Uuid) -> Result<TaskItem, TaskListError> {
        let pos = self
            .items
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskListError::UnknownTask(id))?;
        Ok(self.items.remove(pos))
    }

    /// Snapshot of the list in insertion order.
    pub fn items(&self) -> &[TaskItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
