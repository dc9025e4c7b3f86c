use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use mr_common::{
    config::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_REPORT_RETRIES},
    Application, IntermediateStore, MapDoneRequest, ReduceDoneRequest, Task, TaskKind, WorkerId,
};

use crate::pipeline;
use crate::rpc_client::RpcClient;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between polls when there is no work or the coordinator is unreachable.
    pub poll_interval: Duration,
    /// Attempts at delivering a completion report before giving up on it.
    pub report_retries: u32,
    /// Consecutive failed task requests after which the worker exits.
    /// `None` retries forever.
    pub give_up_after: Option<u32>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            report_retries: DEFAULT_REPORT_RETRIES,
            give_up_after: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Received the Done sentinel.
    JobDone,
    /// Hit `give_up_after` consecutive transport failures.
    CoordinatorUnreachable,
}

#[derive(Debug, Clone)]
pub struct WorkerSummary {
    pub worker_id: WorkerId,
    pub maps_done: u32,
    pub reduces_done: u32,
    /// Tasks whose execution failed; left for the coordinator to reclaim.
    pub tasks_abandoned: u32,
    pub exit: ExitReason,
}

/// One worker process: polls for tasks and runs them one at a time.
pub struct Worker {
    id: WorkerId,
    client: RpcClient,
    app: Arc<dyn Application>,
    store: IntermediateStore,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        client: RpcClient,
        app: Arc<dyn Application>,
        store: IntermediateStore,
        config: WorkerConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            client,
            app,
            store,
            config,
        }
    }

    /// Overrides the generated identity.
    pub fn with_id(mut self, id: impl Into<WorkerId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Main loop: request, execute, report, until the job is done.
    ///
    /// Transport errors are never fatal; a failed task is abandoned without
    /// a report and the coordinator hands it out again once it goes stale.
    pub async fn run(&self) -> WorkerSummary {
        let mut summary = WorkerSummary {
            worker_id: self.id.clone(),
            maps_done: 0,
            reduces_done: 0,
            tasks_abandoned: 0,
            exit: ExitReason::JobDone,
        };
        let mut failures: u32 = 0;

        loop {
            let reply = match self.client.request_task(&self.id, None).await {
                Ok(reply) => {
                    failures = 0;
                    reply
                }
                Err(e) => {
                    failures += 1;
                    if let Some(limit) = self.config.give_up_after {
                        if failures >= limit {
                            warn!(
                                "worker {}: coordinator unreachable {} times in a row, exiting",
                                self.id, failures
                            );
                            summary.exit = ExitReason::CoordinatorUnreachable;
                            return summary;
                        }
                    }
                    warn!(
                        "worker {}: task request failed ({:#}), retrying in {:?}",
                        self.id, e, self.config.poll_interval
                    );
                    sleep(self.config.poll_interval).await;
                    continue;
                }
            };

            let task = match reply.task {
                Some(task) => task,
                None => {
                    debug!("worker {}: no {:?} task available yet", self.id, reply.kind);
                    sleep(self.config.poll_interval).await;
                    continue;
                }
            };

            match task.kind {
                TaskKind::Map => {
                    if self.handle_map(task).await {
                        summary.maps_done += 1;
                    } else {
                        summary.tasks_abandoned += 1;
                    }
                }
                TaskKind::Reduce => {
                    if self.handle_reduce(task).await {
                        summary.reduces_done += 1;
                    } else {
                        summary.tasks_abandoned += 1;
                    }
                }
                TaskKind::Done => {
                    info!(
                        "worker {}: job done ({} maps, {} reduces)",
                        self.id, summary.maps_done, summary.reduces_done
                    );
                    return summary;
                }
            }
        }
    }

    /// Returns whether the task executed; the report itself may still be lost.
    async fn handle_map(&self, task: Task) -> bool {
        info!(
            "worker {}: map task {} (attempt={}) on {}",
            self.id, task.id, task.attempt, task.input
        );

        let app = self.app.clone();
        let store = self.store.clone();
        let worker_id = self.id.clone();
        let job = task.clone();
        let result = tokio::task::spawn_blocking(move || {
            pipeline::run_map(app.as_ref(), &store, &worker_id, &job)
        })
        .await;

        let files = match result {
            Ok(Ok(files)) => files,
            Ok(Err(e)) => {
                error!("worker {}: map task {} failed: {}", self.id, task.id, e);
                return false;
            }
            Err(e) => {
                error!("worker {}: map task {} panicked: {}", self.id, task.id, e);
                return false;
            }
        };

        let req = MapDoneRequest {
            worker_id: self.id.clone(),
            task_id: task.id,
            attempt: task.attempt,
            files: files
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
        };

        for attempt in 1..=self.config.report_retries.max(1) {
            match self.client.report_map_done(&req).await {
                Ok(accepted) => {
                    if !accepted {
                        warn!(
                            "worker {}: coordinator ignored report for map task {}",
                            self.id, task.id
                        );
                    }
                    return true;
                }
                Err(e) => {
                    warn!(
                        "worker {}: map report {} failed (try {}): {:#}",
                        self.id, task.id, attempt, e
                    );
                    sleep(self.config.poll_interval).await;
                }
            }
        }

        warn!("worker {}: giving up on reporting map task {}", self.id, task.id);
        true
    }

    async fn handle_reduce(&self, task: Task) -> bool {
        info!(
            "worker {}: reduce task {} (attempt={}) on {}",
            self.id, task.id, task.attempt, task.input
        );

        let app = self.app.clone();
        let store = self.store.clone();
        let job = task.clone();
        let result =
            tokio::task::spawn_blocking(move || pipeline::run_reduce(app.as_ref(), &store, &job))
                .await;

        let output = match result {
            Ok(Ok(path)) => path,
            Ok(Err(e)) => {
                error!("worker {}: reduce task {} failed: {}", self.id, task.id, e);
                return false;
            }
            Err(e) => {
                error!("worker {}: reduce task {} panicked: {}", self.id, task.id, e);
                return false;
            }
        };

        let req = ReduceDoneRequest {
            worker_id: self.id.clone(),
            task_id: task.id,
            attempt: task.attempt,
            file: output.to_string_lossy().to_string(),
        };

        for attempt in 1..=self.config.report_retries.max(1) {
            match self.client.report_reduce_done(&req).await {
                Ok(accepted) => {
                    if !accepted {
                        warn!(
                            "worker {}: coordinator ignored report for reduce task {}",
                            self.id, task.id
                        );
                    }
                    return true;
                }
                Err(e) => {
                    warn!(
                        "worker {}: reduce report {} failed (try {}): {:#}",
                        self.id, task.id, attempt, e
                    );
                    sleep(self.config.poll_interval).await;
                }
            }
        }

        warn!("worker {}: giving up on reporting reduce task {}", self.id, task.id);
        true
    }
}
