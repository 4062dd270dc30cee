//! Task bindings and the active-task registry.
//!
//! K_i: Tasks stay in ascending task-index order for the whole pass.
//! K_i: The registry only changes between rounds, never during one.

use crate::reader::SamplingReader;
use rand::rngs::StdRng;

/// A task corpus bound to the reader of its current split file.
#[derive(Debug)]
pub struct TaskSet {
    pub task_index: usize,
    pub reader: SamplingReader<StdRng>,
}

impl TaskSet {
    pub fn new(task_index: usize, reader: SamplingReader<StdRng>) -> Self {
        Self { task_index, reader }
    }

    pub fn is_active(&self) -> bool {
        self.reader.is_active()
    }
}

/// Ordered set of tasks still in the round-robin rotation.
#[derive(Debug, Default)]
pub struct ActiveTasks {
    tasks: Vec<TaskSet>,
}

impl ActiveTasks {
    /// Build a registry; tasks are sorted by task index.
    pub fn new(mut tasks: Vec<TaskSet>) -> Self {
        tasks.sort_by_key(|t| t.task_index);
        Self { tasks }
    }

    /// Keep only the task with `task_index`.
    pub fn restrict_to(&mut self, task_index: usize) {
        self.tasks.retain(|t| t.task_index == task_index);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut TaskSet> {
        self.tasks.get_mut(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskSet> {
        self.tasks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TaskSet> {
        self.tasks.iter_mut()
    }

    /// Remove the first task whose reader is exhausted, if any.
    ///
    /// Called once per completed round, so at most one task leaves per
    /// round. The removed task's file is closed when it is dropped.
    pub fn retire_first_inactive(&mut self) -> Option<TaskSet> {
        let position = self.tasks.iter().position(|t| !t.is_active())?;
        Some(self.tasks.remove(position))
    }
}
