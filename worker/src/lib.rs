pub mod pipeline;
pub mod rpc_client;
pub mod worker;

pub use rpc_client::RpcClient;
pub use worker::{ExitReason, Worker, WorkerConfig, WorkerSummary};
