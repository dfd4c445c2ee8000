use chrono::NaiveDate;
use thiserror::Error;

use crate::task::Task;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("task not found: #{0}")]
    NotFound(u32),
}

/// In-memory collection owning all tasks for one session.
///
/// Ids are assigned monotonically starting at 1 and never reused,
/// even after removals. Insertion order is preserved for listing.
#[derive(Debug)]
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: u32,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    /// Appends a new task and returns its assigned id.
    pub fn create(&mut self, description: String, due_date: Option<NaiveDate>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            description,
            completed: false,
            due_date,
        });
        id
    }

    pub fn mark_completed(&mut self, id: u32) -> Result<(), StoreError> {
        self.find_mut(id)?.completed = true;
        Ok(())
    }

    pub fn toggle_completed(&mut self, id: u32) -> Result<(), StoreError> {
        let task = self.find_mut(id)?;
        task.completed = !task.completed;
        Ok(())
    }

    pub fn remove(&mut self, id: u32) -> Result<(), StoreError> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        self.tasks.remove(index);
        Ok(())
    }

    /// All tasks in insertion order, as an independent snapshot.
    pub fn list(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// The subsequence matching the flag, relative order preserved.
    pub fn filter_by_completion(&self, completed: bool) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.completed == completed)
            .cloned()
            .collect()
    }

    /// Replaces the description. Emptiness is the caller's concern.
    pub fn update_description(&mut self, id: u32, new_description: String) -> Result<(), StoreError> {
        self.find_mut(id)?.description = new_description;
        Ok(())
    }

    /// Replaces the due date; `None` clears it.
    pub fn update_due_date(
        &mut self,
        id: u32,
        new_due_date: Option<NaiveDate>,
    ) -> Result<(), StoreError> {
        self.find_mut(id)?.due_date = new_due_date;
        Ok(())
    }

    /// Removes every completed task; survivors keep their relative order.
    pub fn clear_completed(&mut self) {
        self.tasks.retain(|t| !t.completed);
    }

    fn find_mut(&mut self, id: u32) -> Result<&mut Task, StoreError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}
