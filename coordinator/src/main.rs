use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mr_common::config::{
    self, default_coordinator_addr, DEFAULT_LINGER_MS, DEFAULT_N_REDUCE, DEFAULT_TASK_TIMEOUT_MS,
};
use mr_coordinator::{expand_inputs, serve, wait_for_job_done, Coordinator, Scheduler};

#[derive(Parser)]
#[command(name = "mrcoordinator")]
#[command(about = "Schedules map and reduce tasks for a pool of mrworker processes")]
struct Args {
    /// Address to listen on (loopback, derived from the user name by default)
    #[arg(long, env = config::env::COORDINATOR_ADDR, default_value_t = default_coordinator_addr())]
    addr: SocketAddr,

    /// Number of reduce buckets
    #[arg(
        long,
        env = config::env::N_REDUCE,
        default_value_t = DEFAULT_N_REDUCE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    n_reduce: u32,

    /// Milliseconds a task may run before it is handed to another worker
    #[arg(long, env = config::env::TASK_TIMEOUT_MS, default_value_t = DEFAULT_TASK_TIMEOUT_MS)]
    task_timeout_ms: u64,

    /// Milliseconds to keep serving after the job finishes
    #[arg(long, env = config::env::LINGER_MS, default_value_t = DEFAULT_LINGER_MS)]
    linger_ms: u64,

    /// Input files or glob patterns, one map task per file
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("mrcoordinator=debug,mr_coordinator=debug,tower_http=info,axum=info")
            }),
        )
        .init();

    let args = Args::parse();

    let inputs = expand_inputs(&args.inputs)?;
    let scheduler = Scheduler::new(
        inputs,
        args.n_reduce,
        Duration::from_millis(args.task_timeout_ms),
    )?;
    let coordinator = Coordinator::new(scheduler);

    let endpoint = config::describe_endpoint(args.addr);
    let listener = TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("cannot listen on {endpoint}"))?;
    info!("coordinator listening on {}", endpoint);

    let done = wait_for_job_done(
        coordinator.clone(),
        Duration::from_secs(1),
        Duration::from_millis(args.linger_ms),
    );
    let shutdown = async move {
        tokio::select! {
            _ = done => {}
            _ = tokio::signal::ctrl_c() => warn!("interrupted, job progress is lost"),
        }
    };

    serve(listener, coordinator.clone(), shutdown).await?;

    let info = coordinator.job_info();
    info!(
        "coordinator exiting: phase={:?} maps={}/{} reduces={}/{} reassignments={}",
        info.phase,
        info.map_finished,
        info.n_map,
        info.reduce_finished,
        info.n_reduce,
        info.reassignments
    );
    Ok(())
}
