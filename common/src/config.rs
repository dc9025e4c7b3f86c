use std::net::SocketAddr;

use crate::partition::ihash;

pub const DEFAULT_N_REDUCE: u32 = 10;
/// How long a task may stay Running before another worker may take it.
pub const DEFAULT_TASK_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_REPORT_RETRIES: u32 = 3;
pub const DEFAULT_LINGER_MS: u64 = 2_000;
pub const DEFAULT_APP: &str = "wc";
pub const DEFAULT_WORK_DIR: &str = ".";

/// Environment variables read by the binaries.
pub mod env {
    pub const COORDINATOR_ADDR: &str = "MR_COORDINATOR_ADDR";
    pub const N_REDUCE: &str = "MR_N_REDUCE";
    pub const TASK_TIMEOUT_MS: &str = "MR_TASK_TIMEOUT_MS";
    pub const WORK_DIR: &str = "MR_WORK_DIR";
    pub const POLL_INTERVAL_MS: &str = "MR_POLL_INTERVAL_MS";
    pub const REPORT_RETRIES: &str = "MR_REPORT_RETRIES";
    pub const GIVE_UP_AFTER: &str = "MR_GIVE_UP_AFTER";
    pub const APP: &str = "MR_APP";
    pub const LINGER_MS: &str = "MR_LINGER_MS";
}

const PORT_BASE: u16 = 20_000;
const PORT_SPAN: u32 = 10_000;

/// Loopback port derived from a user name. Distinct users usually get
/// distinct ports, but two names can hash to the same one.
pub fn port_for_user(user: &str) -> u16 {
    PORT_BASE + (ihash(user) % PORT_SPAN) as u16
}

pub fn current_user() -> String {
    whoami::username()
}

/// Loopback address for the invoking user's coordinator.
pub fn default_coordinator_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port_for_user(&current_user())))
}

/// Startup description of where `addr` came from, naming the user when it
/// is the derived per-user default.
pub fn describe_endpoint(addr: SocketAddr) -> String {
    let user = current_user();
    if addr == SocketAddr::from(([127, 0, 0, 1], port_for_user(&user))) {
        format!("{addr} (per-user default port for {user:?})")
    } else {
        format!("{addr} (configured)")
    }
}

/// Turns `host:port` (or an already complete URL) into an HTTP base URL.
pub fn base_url(addr: &str) -> String {
    let addr = addr.trim_end_matches('/');
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}
