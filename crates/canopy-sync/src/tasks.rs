//! Deferred task queue drained once per loop iteration

use std::sync::Mutex;

type Task = Box<dyn FnOnce() + Send>;

/// FIFO queue of deferred closures.
///
/// `add_task` is safe from any thread and never runs the closure inline.
/// `run_tasks` snapshots the queue under the lock and executes outside
/// it, so a task may itself call `add_task`; the new task runs on the
/// next drain.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<Vec<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.lock().unwrap().push(Box::new(task));
    }

    /// Run every queued task in arrival order. Returns how many ran.
    pub fn run_tasks(&self) -> usize {
        let pending = {
            let mut tasks = self.tasks.lock().unwrap();
            std::mem::take(&mut *tasks)
        };
        let count = pending.len();
        for task in pending {
            task();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().unwrap().is_empty()
    }
}
