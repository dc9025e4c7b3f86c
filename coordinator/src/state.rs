use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use mr_common::{
    JobInfo, MapDoneRequest, ReduceDoneRequest, TaskAssignmentResponse, TaskKind,
};

use crate::scheduler::Scheduler;

/// Shared handle on one job's scheduler. Cloning shares the same job.
///
/// Every operation holds the single lock for its whole read-modify-write,
/// so no caller ever sees a half-updated registry or phase.
#[derive(Clone)]
pub struct Coordinator {
    scheduler: Arc<Mutex<Scheduler>>,
}

impl Coordinator {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Scheduler> {
        // scheduler methods never panic between two writes, so a poisoned
        // lock still guards a consistent state
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn request_task(&self, worker_id: &str, wanted: Option<TaskKind>) -> TaskAssignmentResponse {
        self.lock().request_task(worker_id, wanted, Instant::now())
    }

    pub fn report_map_done(&self, req: &MapDoneRequest) -> bool {
        self.lock().report_map_done(req)
    }

    pub fn report_reduce_done(&self, req: &ReduceDoneRequest) -> bool {
        self.lock().report_reduce_done(req)
    }

    pub fn is_job_done(&self) -> bool {
        self.lock().is_job_done()
    }

    pub fn job_info(&self) -> JobInfo {
        self.lock().job_info()
    }

    /// Liveness echo.
    pub fn example(&self, x: i64) -> i64 {
        x.wrapping_add(1)
    }
}
