use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId, TaskKind, WorkerId};

/// HTTP routes served by the coordinator.
pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const EXAMPLE: &str = "/api/v1/example";
    pub const NEXT_TASK: &str = "/api/v1/tasks/next";
    pub const MAP_DONE: &str = "/api/v1/tasks/map-done";
    pub const REDUCE_DONE: &str = "/api/v1/tasks/reduce-done";
    pub const JOB: &str = "/api/v1/job";
    pub const JOB_DONE: &str = "/api/v1/job/done";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignmentRequest {
    pub worker_id: WorkerId,
    /// Only accept this kind of task; `None` takes whatever the phase offers.
    #[serde(default)]
    pub wanted: Option<TaskKind>,
}

/// `task: None` means "nothing assignable right now, poll again".
/// Once the job is finished the task is the `Done` sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignmentResponse {
    pub task: Option<Task>,
    pub is_job_done: bool,
    pub kind: TaskKind,
}

impl TaskAssignmentResponse {
    pub fn assigned(task: Task) -> Self {
        let kind = task.kind;
        Self {
            task: Some(task),
            is_job_done: false,
            kind,
        }
    }

    pub fn wait(kind: TaskKind) -> Self {
        Self {
            task: None,
            is_job_done: false,
            kind,
        }
    }

    pub fn done() -> Self {
        Self {
            task: Some(Task::done()),
            is_job_done: true,
            kind: TaskKind::Done,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDoneRequest {
    pub worker_id: WorkerId,
    pub task_id: TaskId,
    pub attempt: u32,
    /// Intermediate files written by this attempt. Informational only.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceDoneRequest {
    pub worker_id: WorkerId,
    pub task_id: TaskId,
    pub attempt: u32,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompleteResponse {
    /// False when the report came from a superseded attempt and was ignored.
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExampleRequest {
    pub x: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExampleResponse {
    pub y: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobDoneResponse {
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_wanted_kind_decodes() {
        let req: TaskAssignmentRequest =
            serde_json::from_str(r#"{"worker_id":"w1"}"#).unwrap();
        assert_eq!(req.worker_id, "w1");
        assert!(req.wanted.is_none());
    }

    #[test]
    fn done_response_carries_sentinel() {
        let resp = TaskAssignmentResponse::done();
        assert!(resp.is_job_done);
        assert_eq!(resp.kind, TaskKind::Done);
        assert!(resp.task.unwrap().is_done());
    }
}
