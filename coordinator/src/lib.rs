pub mod handlers;
pub mod registry;
pub mod scheduler;
pub mod state;

use std::{future::Future, io, time::Duration};

use anyhow::{Context, Result};
use glob::glob;
use tokio::{net::TcpListener, time::sleep};
use tracing::{info, warn};

pub use scheduler::Scheduler;
pub use state::Coordinator;

/// Serves the RPC API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, coordinator: Coordinator, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = handlers::build_router(coordinator);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves once the job has reached Finish, then keeps the server up for
/// `linger` so polling workers can still pick up the Done sentinel.
pub async fn wait_for_job_done(coordinator: Coordinator, poll: Duration, linger: Duration) {
    while !coordinator.is_job_done() {
        sleep(poll).await;
    }
    info!("job finished, shutting down in {:?}", linger);
    sleep(linger).await;
}

/// Expands input patterns into the list of files to map, in argument order.
/// A pattern that matches nothing is taken literally, so a missing file
/// still becomes a task (and fails loudly on the worker).
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let mut matched = false;
        let entries = glob(pattern).with_context(|| format!("invalid input pattern {pattern:?}"))?;

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    matched = true;
                    // workers may run from another directory
                    let path = path.canonicalize().unwrap_or(path);
                    files.push(path.to_string_lossy().to_string());
                }
                Ok(_) => {}
                Err(e) => warn!("skipping unreadable input {}: {}", e.path().display(), e),
            }
        }

        if !matched {
            warn!("input pattern {} matched no files, using it as a path", pattern);
            files.push(pattern.clone());
        }
    }

    Ok(files)
}
