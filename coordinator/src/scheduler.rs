use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use mr_common::{
    JobInfo, MapDoneRequest, Phase, ReduceDoneRequest, Task, TaskAssignmentResponse, TaskKind,
    TaskStatus,
};

use crate::registry::{Completion, TaskRegistry};

/// The job's scheduling state machine.
///
/// Map tasks exist from the start, one per input file. Reduce tasks are
/// created the first time every map task is seen Finished. Staleness is
/// checked lazily when a worker asks for work; nothing runs on a timer.
#[derive(Debug)]
pub struct Scheduler {
    registry: TaskRegistry,
    phase: Phase,
    n_map: u32,
    n_reduce: u32,
    stale_after: Duration,

    reassignments: u32,
    rejected_reports: u32,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Scheduler {
    pub fn new(inputs: Vec<String>, n_reduce: u32, stale_after: Duration) -> Result<Self> {
        if n_reduce == 0 {
            bail!("n_reduce must be at least 1");
        }

        let maps: Vec<Task> = inputs
            .into_iter()
            .enumerate()
            .map(|(id, path)| Task::map(id as u32, path, n_reduce))
            .collect();
        let n_map = maps.len() as u32;

        let mut registry = TaskRegistry::new();
        registry.insert(TaskKind::Map, maps);

        info!(
            "job created: {} map tasks, {} reduce buckets, task timeout {:?}",
            n_map, n_reduce, stale_after
        );

        Ok(Self {
            registry,
            phase: Phase::Map,
            n_map,
            n_reduce,
            stale_after,
            reassignments: 0,
            rejected_reports: 0,
            started_at: Utc::now(),
            finished_at: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn is_job_done(&self) -> bool {
        self.phase == Phase::Finish
    }

    /// Picks work for `worker_id` according to the current phase.
    pub fn request_task(
        &mut self,
        worker_id: &str,
        wanted: Option<TaskKind>,
        now: Instant,
    ) -> TaskAssignmentResponse {
        self.advance();

        let kind = match self.phase {
            Phase::Finish => return TaskAssignmentResponse::done(),
            phase => phase.dispenses(),
        };

        if let Some(wanted) = wanted {
            if wanted != kind {
                debug!(
                    "worker {} wants {:?} but phase is {:?}",
                    worker_id, wanted, self.phase
                );
                return TaskAssignmentResponse::wait(kind);
            }
        }

        match self.registry.claim(kind, worker_id, now, self.stale_after) {
            Some(claim) => {
                if let Some(previous) = claim.previous_worker {
                    self.reassignments += 1;
                    warn!(
                        "{:?} task {} timed out on worker {}, reassigning to {} (attempt={})",
                        kind, claim.task.id, previous, worker_id, claim.task.attempt
                    );
                } else {
                    info!(
                        "assigning {:?} task {} (input={}) to worker {}",
                        kind, claim.task.id, claim.task.input, worker_id
                    );
                }
                TaskAssignmentResponse::assigned(claim.task)
            }
            None => {
                debug!("worker {} asked for a task but none is assignable", worker_id);
                TaskAssignmentResponse::wait(kind)
            }
        }
    }

    pub fn report_map_done(&mut self, req: &MapDoneRequest) -> bool {
        debug!(
            "worker {} produced {} intermediate files for map task {}",
            req.worker_id,
            req.files.len(),
            req.task_id
        );
        self.complete(TaskKind::Map, req.task_id, &req.worker_id, req.attempt)
    }

    pub fn report_reduce_done(&mut self, req: &ReduceDoneRequest) -> bool {
        debug!(
            "worker {} committed {} for reduce task {}",
            req.worker_id, req.file, req.task_id
        );
        self.complete(TaskKind::Reduce, req.task_id, &req.worker_id, req.attempt)
    }

    fn complete(&mut self, kind: TaskKind, task_id: u32, worker_id: &str, attempt: u32) -> bool {
        let outcome = self.registry.finish(kind, task_id, worker_id, attempt);
        match outcome {
            Completion::Accepted => {
                info!("{:?} task {} finished by worker {}", kind, task_id, worker_id);
            }
            Completion::Superseded => {
                self.rejected_reports += 1;
                warn!(
                    "ignoring stale report for {:?} task {} from worker {} (attempt={})",
                    kind, task_id, worker_id, attempt
                );
            }
            Completion::AlreadyFinished => {
                debug!(
                    "{:?} task {} already finished, ignoring report from worker {}",
                    kind, task_id, worker_id
                );
            }
            Completion::UnknownTask => {
                warn!(
                    "worker {} reported unknown {:?} task {}",
                    worker_id, kind, task_id
                );
            }
        }

        self.advance();
        outcome == Completion::Accepted
    }

    /// Moves the phase forward as far as the registry allows.
    fn advance(&mut self) {
        if self.phase == Phase::Map && self.registry.all_finished(TaskKind::Map) {
            self.enter_reduce_phase();
        }

        if self.phase == Phase::Reduce && self.registry.all_finished(TaskKind::Reduce) {
            self.phase = Phase::Finish;
            self.finished_at = Some(Utc::now());
            info!("all reduce tasks finished, job done");
        }
    }

    fn enter_reduce_phase(&mut self) {
        let reduces: Vec<Task> = (0..self.n_reduce)
            .map(|bucket| Task::reduce(bucket, self.n_reduce))
            .collect();
        self.registry.insert(TaskKind::Reduce, reduces);
        self.phase = Phase::Reduce;
        info!(
            "all {} map tasks finished, created {} reduce tasks",
            self.n_map, self.n_reduce
        );
    }

    pub fn job_info(&self) -> JobInfo {
        let running = self.registry.count(TaskKind::Map, TaskStatus::Running)
            + self.registry.count(TaskKind::Reduce, TaskStatus::Running);

        JobInfo {
            phase: self.phase,
            n_map: self.n_map,
            n_reduce: self.n_reduce,
            map_finished: self.registry.count(TaskKind::Map, TaskStatus::Finished) as u32,
            reduce_finished: self.registry.count(TaskKind::Reduce, TaskStatus::Finished) as u32,
            running: running as u32,
            reassignments: self.reassignments,
            rejected_reports: self.rejected_reports,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STALE: Duration = Duration::from_secs(10);

    fn scheduler(files: &[&str], n_reduce: u32) -> Scheduler {
        let inputs = files.iter().map(|f| f.to_string()).collect();
        Scheduler::new(inputs, n_reduce, STALE).unwrap()
    }

    fn map_done(task: &Task, worker: &str) -> MapDoneRequest {
        MapDoneRequest {
            worker_id: worker.to_string(),
            task_id: task.id,
            attempt: task.attempt,
            files: vec![],
        }
    }

    fn reduce_done(task: &Task, worker: &str) -> ReduceDoneRequest {
        ReduceDoneRequest {
            worker_id: worker.to_string(),
            task_id: task.id,
            attempt: task.attempt,
            file: format!("mr-out-{}", task.id),
        }
    }

    /// Drives every task to completion with a single worker.
    fn run_to_finish(s: &mut Scheduler, now: Instant) {
        loop {
            let resp = s.request_task("w", None, now);
            let task = resp.task.expect("single worker never waits");
            match task.kind {
                TaskKind::Map => assert!(s.report_map_done(&map_done(&task, "w"))),
                TaskKind::Reduce => assert!(s.report_reduce_done(&reduce_done(&task, "w"))),
                TaskKind::Done => break,
            }
        }
    }

    #[test]
    fn zero_reducers_is_rejected() {
        assert!(Scheduler::new(vec!["a".into()], 0, STALE).is_err());
    }

    #[test]
    fn creates_one_map_task_per_input() {
        let s = scheduler(&["a", "b", "c"], 4);
        assert_eq!(s.phase(), Phase::Map);
        assert_eq!(s.registry().len(TaskKind::Map), 3);
        assert_eq!(s.registry().len(TaskKind::Reduce), 0);
    }

    #[test]
    fn reduce_tasks_appear_only_after_all_maps_finish() {
        let mut s = scheduler(&["a", "b"], 3);
        let now = Instant::now();

        let t0 = s.request_task("w1", None, now).task.unwrap();
        let t1 = s.request_task("w2", None, now).task.unwrap();
        assert!(t0.is_map() && t1.is_map());

        // both maps running: nothing to hand out, still no reduce tasks
        let idle = s.request_task("w3", None, now);
        assert!(idle.task.is_none());
        assert_eq!(idle.kind, TaskKind::Map);
        assert_eq!(s.registry().len(TaskKind::Reduce), 0);

        assert!(s.report_map_done(&map_done(&t0, "w1")));
        assert_eq!(s.phase(), Phase::Map);
        assert_eq!(s.registry().len(TaskKind::Reduce), 0);

        assert!(s.report_map_done(&map_done(&t1, "w2")));
        assert_eq!(s.phase(), Phase::Reduce);
        assert_eq!(s.registry().len(TaskKind::Reduce), 3);

        let r = s.request_task("w3", None, now).task.unwrap();
        assert!(r.is_reduce());
        assert_eq!(r.input, "mr-*-0");
    }

    #[test]
    fn full_job_creates_exactly_m_maps_and_n_reduces() {
        let mut s = scheduler(&["a", "b", "c"], 2);
        run_to_finish(&mut s, Instant::now());

        assert!(s.is_job_done());
        assert_eq!(s.registry().len(TaskKind::Map), 3);
        assert_eq!(s.registry().len(TaskKind::Reduce), 2);

        let info = s.job_info();
        assert_eq!(info.map_finished, 3);
        assert_eq!(info.reduce_finished, 2);
        assert!(info.finished_at.is_some());
    }

    #[test]
    fn finish_phase_always_returns_done_sentinel() {
        let mut s = scheduler(&["a"], 1);
        let now = Instant::now();
        run_to_finish(&mut s, now);

        for worker in ["w", "other", "late"] {
            let resp = s.request_task(worker, None, now + Duration::from_secs(3600));
            assert!(resp.is_job_done);
            assert_eq!(resp.kind, TaskKind::Done);
            assert!(resp.task.unwrap().is_done());
        }
        let resp = s.request_task("w", Some(TaskKind::Map), now);
        assert!(resp.is_job_done);
    }

    #[test]
    fn no_map_task_is_assigned_once_reducing() {
        let mut s = scheduler(&["a"], 2);
        let now = Instant::now();
        let m = s.request_task("w1", None, now).task.unwrap();
        s.report_map_done(&map_done(&m, "w1"));

        // long after the map would have gone stale
        let later = now + Duration::from_secs(600);
        for i in 0..4 {
            let resp = s.request_task(&format!("w{i}"), None, later);
            if let Some(t) = resp.task {
                assert!(!t.is_map());
            }
        }
    }

    #[test]
    fn stale_map_task_goes_to_a_different_worker() {
        let mut s = scheduler(&["a"], 1);
        let now = Instant::now();
        let first = s.request_task("slow", None, now).task.unwrap();

        assert!(s
            .request_task("fast", None, now + Duration::from_secs(5))
            .task
            .is_none());

        let second = s
            .request_task("fast", None, now + Duration::from_secs(11))
            .task
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.worker_id.as_deref(), Some("fast"));
        assert!(second.attempt > first.attempt);
        assert_eq!(s.job_info().reassignments, 1);

        // the slow worker wakes up and reports: ignored
        assert!(!s.report_map_done(&map_done(&first, "slow")));
        assert_eq!(s.phase(), Phase::Map);
        assert_eq!(s.job_info().rejected_reports, 1);

        assert!(s.report_map_done(&map_done(&second, "fast")));
        assert_eq!(s.phase(), Phase::Reduce);
    }

    #[test]
    fn stale_reduce_task_is_reassigned() {
        let mut s = scheduler(&["a"], 1);
        let now = Instant::now();
        let m = s.request_task("w1", None, now).task.unwrap();
        s.report_map_done(&map_done(&m, "w1"));

        let r1 = s.request_task("w1", None, now).task.unwrap();
        let r2 = s
            .request_task("w2", None, now + Duration::from_secs(11))
            .task
            .unwrap();
        assert!(r2.is_reduce());
        assert_eq!(r2.id, r1.id);

        assert!(s.report_reduce_done(&reduce_done(&r2, "w2")));
        assert!(s.is_job_done());
    }

    #[test]
    fn reduce_report_matches_task_not_just_worker() {
        let mut s = scheduler(&["a"], 2);
        let now = Instant::now();
        let m = s.request_task("w1", None, now).task.unwrap();
        s.report_map_done(&map_done(&m, "w1"));

        let r0 = s.request_task("w1", None, now).task.unwrap();
        let r1 = s.request_task("w2", None, now).task.unwrap();

        // w1 claims to have finished w2's bucket
        let bogus = ReduceDoneRequest {
            worker_id: "w1".into(),
            task_id: r1.id,
            attempt: r1.attempt,
            file: "mr-out-1".into(),
        };
        assert!(!s.report_reduce_done(&bogus));
        assert_eq!(s.registry().count(TaskKind::Reduce, TaskStatus::Finished), 0);

        assert!(s.report_reduce_done(&reduce_done(&r0, "w1")));
        assert_eq!(s.registry().count(TaskKind::Reduce, TaskStatus::Finished), 1);
    }

    #[test]
    fn wanted_kind_outside_phase_waits() {
        let mut s = scheduler(&["a"], 1);
        let resp = s.request_task("w", Some(TaskKind::Reduce), Instant::now());
        assert!(resp.task.is_none());
        assert!(!resp.is_job_done);
        assert_eq!(s.registry().count(TaskKind::Map, TaskStatus::Running), 0);

        let resp = s.request_task("w", Some(TaskKind::Map), Instant::now());
        assert!(resp.task.unwrap().is_map());
    }

    #[test]
    fn job_without_inputs_goes_straight_to_reduce() {
        let mut s = scheduler(&[], 2);
        let t = s.request_task("w", None, Instant::now()).task.unwrap();
        assert!(t.is_reduce());
        assert_eq!(s.phase(), Phase::Reduce);
    }
}
