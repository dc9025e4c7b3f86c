use std::collections::HashMap;
use std::time::{Duration, Instant};

use mr_common::{Task, TaskId, TaskKind, TaskStatus};

/// A task plus the coordinator-private time it was last handed out.
#[derive(Debug, Clone)]
pub struct TaskSlot {
    pub task: Task,
    pub started_at: Option<Instant>,
}

impl TaskSlot {
    fn new(task: Task) -> Self {
        Self {
            task,
            started_at: None,
        }
    }

    fn is_stale(&self, now: Instant, stale_after: Duration) -> bool {
        match (self.task.status, self.started_at) {
            (TaskStatus::Running, Some(started)) => {
                now.saturating_duration_since(started) > stale_after
            }
            _ => false,
        }
    }
}

/// Result of handing a task out.
#[derive(Debug, Clone)]
pub struct Claim {
    pub task: Task,
    /// Worker the task was taken from, when it was reclaimed as stale.
    pub previous_worker: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Accepted,
    /// Reported by a worker or attempt that no longer owns the task.
    Superseded,
    AlreadyFinished,
    UnknownTask,
}

/// Tasks grouped by kind, in creation order. Tasks are never removed.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskKind, Vec<TaskSlot>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: TaskKind) -> bool {
        self.tasks.contains_key(&kind)
    }

    /// Registers the full task set of `kind`. Each kind is registered once.
    pub fn insert(&mut self, kind: TaskKind, tasks: Vec<Task>) {
        debug_assert!(!self.contains(kind), "{kind:?} tasks registered twice");
        self.tasks
            .insert(kind, tasks.into_iter().map(TaskSlot::new).collect());
    }

    pub fn slots(&self, kind: TaskKind) -> &[TaskSlot] {
        self.tasks.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self, kind: TaskKind) -> usize {
        self.slots(kind).len()
    }

    pub fn count(&self, kind: TaskKind, status: TaskStatus) -> usize {
        self.slots(kind)
            .iter()
            .filter(|s| s.task.status == status)
            .count()
    }

    /// True when every task of `kind` is Finished (vacuously true for none).
    pub fn all_finished(&self, kind: TaskKind) -> bool {
        self.slots(kind)
            .iter()
            .all(|s| s.task.status == TaskStatus::Finished)
    }

    /// Hands out the first task of `kind` that is Idle, or Running for longer
    /// than `stale_after`. The task becomes Running under `worker_id` with a
    /// fresh timestamp and a new attempt number.
    pub fn claim(
        &mut self,
        kind: TaskKind,
        worker_id: &str,
        now: Instant,
        stale_after: Duration,
    ) -> Option<Claim> {
        let slots = self.tasks.get_mut(&kind)?;
        let slot = slots
            .iter_mut()
            .find(|s| s.task.status == TaskStatus::Idle || s.is_stale(now, stale_after))?;

        let previous_worker = if slot.task.status == TaskStatus::Running {
            slot.task.worker_id.clone()
        } else {
            None
        };

        slot.task.status = TaskStatus::Running;
        slot.task.worker_id = Some(worker_id.to_string());
        slot.task.attempt += 1;
        slot.started_at = Some(now);

        Some(Claim {
            task: slot.task.clone(),
            previous_worker,
        })
    }

    /// Marks a task Finished if the report matches its current owner and
    /// attempt. Finished tasks never change again.
    pub fn finish(
        &mut self,
        kind: TaskKind,
        task_id: TaskId,
        worker_id: &str,
        attempt: u32,
    ) -> Completion {
        let slot = match self
            .tasks
            .get_mut(&kind)
            .and_then(|slots| slots.iter_mut().find(|s| s.task.id == task_id))
        {
            Some(slot) => slot,
            None => return Completion::UnknownTask,
        };

        match slot.task.status {
            TaskStatus::Finished => Completion::AlreadyFinished,
            TaskStatus::Idle => Completion::Superseded,
            TaskStatus::Running => {
                let owner_matches = slot.task.worker_id.as_deref() == Some(worker_id);
                if owner_matches && slot.task.attempt == attempt {
                    slot.task.status = TaskStatus::Finished;
                    Completion::Accepted
                } else {
                    Completion::Superseded
                }
            }
        }
    }
}
