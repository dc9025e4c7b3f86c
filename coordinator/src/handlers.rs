use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use mr_common::{
    routes, ExampleRequest, ExampleResponse, JobDoneResponse, JobInfo, MapDoneRequest,
    ReduceDoneRequest, TaskAssignmentRequest, TaskAssignmentResponse, TaskCompleteResponse,
};

use crate::state::Coordinator;

pub fn build_router(state: Coordinator) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health))
        .route(routes::EXAMPLE, post(example))
        .route(routes::NEXT_TASK, post(assign_task))
        .route(routes::MAP_DONE, post(map_done))
        .route(routes::REDUCE_DONE, post(reduce_done))
        .route(routes::JOB, get(get_job))
        .route(routes::JOB_DONE, get(job_done))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- HTTP handlers ---------------- */

async fn health() -> &'static str {
    "ok"
}

async fn example(
    State(state): State<Coordinator>,
    Json(req): Json<ExampleRequest>,
) -> Json<ExampleResponse> {
    Json(ExampleResponse {
        y: state.example(req.x),
    })
}

// Next task for a worker, "wait", or the Done sentinel
async fn assign_task(
    State(state): State<Coordinator>,
    Json(req): Json<TaskAssignmentRequest>,
) -> Json<TaskAssignmentResponse> {
    Json(state.request_task(&req.worker_id, req.wanted))
}

async fn map_done(
    State(state): State<Coordinator>,
    Json(req): Json<MapDoneRequest>,
) -> Json<TaskCompleteResponse> {
    let accepted = state.report_map_done(&req);
    Json(TaskCompleteResponse { accepted })
}

async fn reduce_done(
    State(state): State<Coordinator>,
    Json(req): Json<ReduceDoneRequest>,
) -> Json<TaskCompleteResponse> {
    let accepted = state.report_reduce_done(&req);
    Json(TaskCompleteResponse { accepted })
}

async fn get_job(State(state): State<Coordinator>) -> Json<JobInfo> {
    Json(state.job_info())
}

async fn job_done(State(state): State<Coordinator>) -> Json<JobDoneResponse> {
    let done = state.is_job_done();
    debug!("job done polled: {}", done);
    Json(JobDoneResponse { done })
}
