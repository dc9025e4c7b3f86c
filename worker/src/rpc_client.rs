use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use mr_common::{
    config::base_url, routes, ExampleRequest, ExampleResponse, JobDoneResponse, JobInfo,
    MapDoneRequest, ReduceDoneRequest, TaskAssignmentRequest, TaskAssignmentResponse,
    TaskCompleteResponse, TaskKind,
};

const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking-style RPC calls to the coordinator.
///
/// Idle connections are not kept, so every call is its own
/// connect/call/disconnect. An `Err` means the call did not complete and
/// nothing should be assumed about its effect; retrying is up to the caller.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: Client,
    base_url: String,
}

impl RpcClient {
    pub fn new(addr: &str) -> Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(CALL_TIMEOUT)
            .build()
            .context("cannot build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url(addr),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T, R>(&self, route: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, route);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn get<R: DeserializeOwned>(&self, route: &str) -> Result<R> {
        let url = format!("{}{}", self.base_url, route);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn request_task(
        &self,
        worker_id: &str,
        wanted: Option<TaskKind>,
    ) -> Result<TaskAssignmentResponse> {
        let req = TaskAssignmentRequest {
            worker_id: worker_id.to_string(),
            wanted,
        };
        self.post(routes::NEXT_TASK, &req).await
    }

    /// Returns whether the coordinator accepted the report.
    pub async fn report_map_done(&self, req: &MapDoneRequest) -> Result<bool> {
        let resp: TaskCompleteResponse = self.post(routes::MAP_DONE, req).await?;
        Ok(resp.accepted)
    }

    pub async fn report_reduce_done(&self, req: &ReduceDoneRequest) -> Result<bool> {
        let resp: TaskCompleteResponse = self.post(routes::REDUCE_DONE, req).await?;
        Ok(resp.accepted)
    }

    pub async fn example(&self, x: i64) -> Result<i64> {
        let resp: ExampleResponse = self.post(routes::EXAMPLE, &ExampleRequest { x }).await?;
        Ok(resp.y)
    }

    pub async fn is_job_done(&self) -> Result<bool> {
        let resp: JobDoneResponse = self.get(routes::JOB_DONE).await?;
        Ok(resp.done)
    }

    pub async fn job_info(&self) -> Result<JobInfo> {
        self.get(routes::JOB).await
    }
}
