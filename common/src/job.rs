use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Phase;

/// Snapshot of the coordinator's view of the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub phase: Phase,

    pub n_map: u32,
    pub n_reduce: u32,

    /// -------- task progress --------
    pub map_finished: u32,
    pub reduce_finished: u32,
    pub running: u32,

    /// Stale tasks handed to a new worker.
    pub reassignments: u32,
    /// Completion reports dropped because they came from a superseded attempt.
    pub rejected_reports: u32,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobInfo {
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Finish
    }

    /// Finished tasks over all tasks the job will ever have.
    pub fn progress(&self) -> f64 {
        let total = self.n_map + self.n_reduce;
        if total == 0 {
            return 1.0;
        }
        (self.map_finished + self.reduce_finished) as f64 / total as f64
    }
}
