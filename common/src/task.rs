use serde::{Deserialize, Serialize};

pub type TaskId = u32;
pub type WorkerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Map,
    Reduce,
    /// Sentinel kind: there is no more work for this job.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Idle,
    Running,
    Finished,
}

/// Job-wide stage. Only ever moves forward: Map -> Reduce -> Finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Map,
    Reduce,
    Finish,
}

impl Phase {
    /// Task kind handed out while the job is in this phase.
    pub fn dispenses(self) -> TaskKind {
        match self {
            Phase::Map => TaskKind::Map,
            Phase::Reduce => TaskKind::Reduce,
            Phase::Finish => TaskKind::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub status: TaskStatus,

    /// Worker currently holding the task, if any.
    pub worker_id: Option<WorkerId>,

    /// Assignment generation. Bumped every time the task is handed out, so a
    /// completion report can be matched against the attempt it belongs to.
    pub attempt: u32,

    /// Map: path of the input file. Reduce: glob selecting the bucket's
    /// intermediate files across every map worker.
    pub input: String,

    pub n_reduce: u32,
}

impl Task {
    pub fn map(id: TaskId, input_path: impl Into<String>, n_reduce: u32) -> Self {
        Self {
            id,
            kind: TaskKind::Map,
            status: TaskStatus::Idle,
            worker_id: None,
            attempt: 0,
            input: input_path.into(),
            n_reduce,
        }
    }

    pub fn reduce(bucket: u32, n_reduce: u32) -> Self {
        Self {
            id: bucket,
            kind: TaskKind::Reduce,
            status: TaskStatus::Idle,
            worker_id: None,
            attempt: 0,
            input: crate::store::bucket_selector(bucket),
            n_reduce,
        }
    }

    pub fn done() -> Self {
        Self {
            id: 0,
            kind: TaskKind::Done,
            status: TaskStatus::Finished,
            worker_id: None,
            attempt: 0,
            input: String::new(),
            n_reduce: 0,
        }
    }

    pub fn is_map(&self) -> bool {
        self.kind == TaskKind::Map
    }

    pub fn is_reduce(&self) -> bool {
        self.kind == TaskKind::Reduce
    }

    pub fn is_done(&self) -> bool {
        self.kind == TaskKind::Done
    }
}
