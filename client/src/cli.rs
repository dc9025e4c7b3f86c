use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;

use mr_common::{
    config::{self, base_url, default_coordinator_addr},
    routes, ExampleRequest, ExampleResponse, JobDoneResponse, JobInfo,
};

#[derive(Parser)]
#[command(name = "mrctl")]
#[command(about = "Small CLI to talk to a running mrcoordinator")]
struct Cli {
    /// Coordinator address (host:port or URL)
    #[arg(long, global = true, env = config::env::COORDINATOR_ADDR, default_value_t = default_coordinator_addr().to_string())]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sends the example RPC (x -> x+1) to check the coordinator is up
    Ping {
        #[arg(default_value_t = 99)]
        x: i64,
    },
    /// Shows phase and task progress
    Status,
    /// Exits 0 if the job is finished, 1 otherwise
    Done,
    /// Polls until the job is finished
    Wait {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = base_url(&cli.addr);

    match cli.command {
        Commands::Ping { x } => {
            let url = format!("{}{}", base_url, routes::EXAMPLE);
            let resp = client
                .post(&url)
                .json(&ExampleRequest { x })
                .send()
                .await
                .with_context(|| format!("coordinator not reachable at {}", base_url))?;
            let reply: ExampleResponse = resp.error_for_status()?.json().await?;
            println!("reply.y = {}", reply.y);
            if reply.y != x.wrapping_add(1) {
                bail!("unexpected echo: sent {x}, got {}", reply.y);
            }
        }

        Commands::Status => {
            let url = format!("{}{}", base_url, routes::JOB);
            let resp = client.get(&url).send().await?;
            if resp.status().is_success() {
                let job: JobInfo = resp.json().await?;
                print_job(&job);
            } else {
                bail!("error querying {} (status {})", routes::JOB, resp.status());
            }
        }

        Commands::Done => {
            if !job_done(&client, &base_url).await? {
                println!("job still running");
                std::process::exit(1);
            }
            println!("job done");
        }

        Commands::Wait { interval_ms } => {
            while !job_done(&client, &base_url).await? {
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            }
            println!("job done");
        }
    }

    Ok(())
}

async fn job_done(client: &Client, base_url: &str) -> Result<bool> {
    let url = format!("{}{}", base_url, routes::JOB_DONE);
    let resp = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("coordinator not reachable at {}", base_url))?;
    let reply: JobDoneResponse = resp.error_for_status()?.json().await?;
    Ok(reply.done)
}

fn print_job(job: &JobInfo) {
    println!("Job:");
    println!("  phase: {:?}", job.phase);
    println!(
        "  map: {}/{} finished, reduce: {}/{} finished, running: {}",
        job.map_finished, job.n_map, job.reduce_finished, job.n_reduce, job.running
    );
    println!("  progress: {:.1}%", job.progress() * 100.0);
    println!(
        "  reassignments: {}, stale reports ignored: {}",
        job.reassignments, job.rejected_reports
    );
    println!("  started_at: {}", job.started_at);
    if let Some(ref done) = job.finished_at {
        println!("  finished_at: {}", done);
    }
}
