//! Deferred task queue
//!
//! Work that must not run in the middle of a frame (picking callbacks, for
//! example) is posted here with the frame it becomes due on. The owner drains
//! due tasks once per frame, before the scene updates.
//!
//! Key properties:
//! - FIFO: due tasks run in the order they were posted
//! - Each task runs exactly once
//! - Tasks never run synchronously from `post`

use std::collections::VecDeque;

use crate::scene::Scene;

/// A unit of deferred work
pub type Task = Box<dyn FnOnce(&mut Scene)>;

/// FIFO queue of frame-delayed tasks
pub struct TaskQueue {
    pending: VecDeque<(u64, Task)>,
}

impl TaskQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Post a task that becomes due on `due_frame`
    pub fn post(&mut self, due_frame: u64, task: Task) {
        self.pending.push_back((due_frame, task));
    }

    /// Number of tasks not yet run
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no tasks are waiting
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run every task due on or before `frame`, in post order
    ///
    /// Tasks not yet due keep their relative order. Returns how many ran.
    pub fn drain_due_tasks(&mut self, frame: u64, scene: &mut Scene) -> usize {
        let mut remaining = VecDeque::with_capacity(self.pending.len());
        let mut ran = 0;
        while let Some((due, task)) = self.pending.pop_front() {
            if due <= frame {
                task(scene);
                ran += 1;
            } else {
                remaining.push_back((due, task));
            }
        }
        self.pending = remaining;
        if ran > 0 {
            log::trace!("Drained {} deferred tasks on frame {}", ran, frame);
        }
        ran
    }

    /// Drop all queued tasks (useful when switching scenes)
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue").field("pending", &self.pending.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_tasks_run_in_fifo_order_when_due() {
        let mut scene = Scene::new(EngineConfig::default());
        let mut queue = TaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (due, label) in [(2, "a"), (1, "b"), (2, "c"), (3, "d")] {
            let log = Rc::clone(&log);
            queue.post(due, Box::new(move |_| log.borrow_mut().push(label)));
        }

        assert_eq!(queue.drain_due_tasks(0, &mut scene), 0);
        assert_eq!(queue.drain_due_tasks(2, &mut scene), 3);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(queue.len(), 1);

        queue.drain_due_tasks(3, &mut scene);
        assert_eq!(*log.borrow(), vec!["a", "b", "c", "d"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_task_runs_once() {
        let mut scene = Scene::new(EngineConfig::default());
        let mut queue = TaskQueue::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        queue.post(1, Box::new(move |_| *counter.borrow_mut() += 1));

        queue.drain_due_tasks(1, &mut scene);
        queue.drain_due_tasks(2, &mut scene);
        assert_eq!(*count.borrow(), 1);
    }
}
