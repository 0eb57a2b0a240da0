//! In-memory todo store.
//!
//! The store owns an ordered collection of [`Todo`] records and the
//! identifier counter. It lives for the whole process and is shared between
//! request tasks, so every operation takes the lock exactly once and runs
//! to completion before releasing it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::TodoError;

/// A single todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier, never reused.
    pub id: String,
    /// Non-empty title.
    pub title: String,
    /// Whether the todo has been completed.
    pub completed: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts over the current list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodoStats {
    /// Number of todos.
    pub total: usize,
    /// Number of completed todos.
    pub completed: usize,
    /// Number of todos still open.
    pub pending: usize,
}

impl TodoStats {
    /// Computes stats for a slice of todos.
    #[must_use]
    pub fn of(todos: &[Todo]) -> Self {
        let total = todos.len();
        let completed = todos.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
        }
    }
}

/// The todo list as seen while the store lock is held.
#[derive(Debug)]
pub struct TodoList {
    todos: Vec<Todo>,
    next_id: u64,
}

impl TodoList {
    /// Appends a new open todo and returns it.
    ///
    /// The title is expected to be validated by the caller.
    pub fn add(&mut self, title: impl Into<String>) -> Todo {
        let id = self.next_id;
        self.next_id += 1;

        let todo = Todo {
            id: id.to_string(),
            title: title.into(),
            completed: false,
            created_at: Utc::now(),
        };
        self.todos.push(todo.clone());
        todo
    }

    /// Flips the `completed` flag of the todo with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::NotFound`] if no such todo exists.
    pub fn toggle(&mut self, id: &str) -> Result<Todo, TodoError> {
        let todo = self
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(id))?;
        todo.completed = !todo.completed;
        Ok(todo.clone())
    }

    /// Removes the todo with the given id, keeping the order of the rest.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::NotFound`] if no such todo exists.
    pub fn delete(&mut self, id: &str) -> Result<Todo, TodoError> {
        let index = self
            .todos
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(self.todos.remove(index))
    }

    /// Removes every completed todo and returns how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.todos.len();
        self.todos.retain(|t| !t.completed);
        before - self.todos.len()
    }
}

/// The outcome of a [`TodoStore::update`] and the list right after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    /// What the update returned.
    pub outcome: T,
    /// The list as the update left it.
    pub todos: Vec<Todo>,
}

/// Process-wide todo collection.
#[derive(Debug)]
pub struct TodoStore {
    inner: Mutex<TodoList>,
}

impl TodoStore {
    /// Creates an empty store whose first identifier is "1".
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(TodoList {
                todos: Vec::new(),
                next_id: 1,
            }),
        }
    }

    // Every mutation leaves `todos` structurally valid, so a poisoned lock
    // is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, TodoList> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `op` and copies out the resulting list under one lock.
    pub fn update<T>(&self, op: impl FnOnce(&mut TodoList) -> T) -> Snapshot<T> {
        let mut list = self.lock();
        let outcome = op(&mut list);
        Snapshot {
            outcome,
            todos: list.todos.clone(),
        }
    }

    /// Returns all todos in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Todo> {
        self.lock().todos.clone()
    }

    /// Returns current totals.
    #[must_use]
    pub fn stats(&self) -> TodoStats {
        TodoStats::of(&self.lock().todos)
    }

    /// See [`TodoList::add`].
    pub fn add(&self, title: impl Into<String>) -> Todo {
        self.lock().add(title)
    }

    /// See [`TodoList::toggle`].
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::NotFound`] if no such todo exists.
    pub fn toggle(&self, id: &str) -> Result<Todo, TodoError> {
        self.lock().toggle(id)
    }

    /// See [`TodoList::delete`].
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::NotFound`] if no such todo exists.
    pub fn delete(&self, id: &str) -> Result<Todo, TodoError> {
        self.lock().delete(id)
    }

    /// See [`TodoList::clear_completed`].
    pub fn clear_completed(&self) -> usize {
        self.lock().clear_completed()
    }
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: &str) -> TodoError {
    TodoError::NotFound { id: id.to_string() }
}
