pub mod app;
pub mod config;
pub mod indexer;
pub mod job;
pub mod kv;
pub mod partition;
pub mod rpc;
pub mod store;
pub mod task;
pub mod wordcount;

pub use app::Application;
pub use job::JobInfo;
pub use kv::KeyValue;
pub use partition::bucket;
pub use rpc::{
    routes, ExampleRequest, ExampleResponse, JobDoneResponse, MapDoneRequest,
    ReduceDoneRequest, TaskAssignmentRequest, TaskAssignmentResponse, TaskCompleteResponse,
};
pub use store::IntermediateStore;
pub use task::{Phase, Task, TaskId, TaskKind, TaskStatus, WorkerId};
