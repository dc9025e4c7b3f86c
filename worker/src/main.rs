use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mr_common::{
    app,
    config::{
        self, default_coordinator_addr, DEFAULT_APP, DEFAULT_POLL_INTERVAL_MS,
        DEFAULT_REPORT_RETRIES, DEFAULT_WORK_DIR,
    },
    IntermediateStore,
};
use mr_worker::{RpcClient, Worker, WorkerConfig};

#[derive(Parser)]
#[command(name = "mrworker")]
#[command(about = "Runs map and reduce tasks handed out by mrcoordinator")]
struct Args {
    /// Coordinator address (host:port or URL)
    #[arg(long, env = config::env::COORDINATOR_ADDR, default_value_t = default_coordinator_addr().to_string())]
    addr: String,

    /// Map/reduce application: wc or indexer
    #[arg(long, env = config::env::APP, default_value = DEFAULT_APP)]
    app: String,

    /// Directory holding intermediate (mr-X-Y) and output (mr-out-Y) files
    #[arg(long, env = config::env::WORK_DIR, default_value = DEFAULT_WORK_DIR)]
    work_dir: PathBuf,

    #[arg(long, env = config::env::POLL_INTERVAL_MS, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    #[arg(long, env = config::env::REPORT_RETRIES, default_value_t = DEFAULT_REPORT_RETRIES)]
    report_retries: u32,

    /// Exit after this many consecutive failed task requests (default: never)
    #[arg(long, env = config::env::GIVE_UP_AFTER)]
    give_up_after: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mrworker=debug,mr_worker=info,reqwest=info")),
        )
        .init();

    let args = Args::parse();

    let application = app::by_name(&args.app)?;
    let store = IntermediateStore::open(&args.work_dir)
        .with_context(|| format!("cannot use work dir {}", args.work_dir.display()))?;
    let client = RpcClient::new(&args.addr)?;

    let config = WorkerConfig {
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        report_retries: args.report_retries,
        give_up_after: args.give_up_after,
    };

    let worker = Worker::new(client, application, store, config);

    // only used in the startup log line
    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    info!(
        "worker {} on {} running {} against {}",
        worker.id(),
        hostname,
        args.app,
        args.addr
    );

    let summary = worker.run().await;
    info!(
        "worker {} exiting ({:?}): maps={} reduces={} abandoned={}",
        summary.worker_id,
        summary.exit,
        summary.maps_done,
        summary.reduces_done,
        summary.tasks_abandoned
    );
    Ok(())
}
