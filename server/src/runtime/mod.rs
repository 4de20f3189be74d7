//! Abstraction over the container runtime. The scheduler and health monitor
//! only ever see this trait — never `bollard` directly — so the runtime can
//! be swapped for a fake in tests (see `fake`).

mod docker;
pub mod fake;

pub use docker::DockerRuntime;
pub use fake::FakeRuntime;

use async_trait::async_trait;
use std::fmt;

/// A single TCP port mapping from container port to host port.
pub type PortMap = Vec<(u16, u16)>;

#[async_trait]
pub trait Runtime: Send + Sync {
    /// Starts a long-lived idle container standing in for a node.
    async fn launch_node(&self, name: &str) -> Result<String, RuntimeError>;

    /// Starts a container exposing `ports` (container_port -> host_port).
    async fn launch_pod(
        &self,
        image: &str,
        name: &str,
        env: &[(String, String)],
        ports: &PortMap,
    ) -> Result<String, RuntimeError>;

    /// Idempotent: `NotFound` is not an error here.
    async fn stop(&self, handle: &str) -> Result<(), RuntimeError>;

    /// Idempotent: `NotFound` is not an error here.
    async fn remove(&self, handle: &str) -> Result<(), RuntimeError>;

    async fn inspect(&self, handle: &str) -> Result<ContainerMetrics, RuntimeError>;

    /// Used at startup to reconcile orphans/ghosts.
    async fn list_all(&self) -> Result<Vec<String>, RuntimeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Stopped,
    Unknown,
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerStatus::Running => write!(f, "running"),
            ContainerStatus::Stopped => write!(f, "stopped"),
            ContainerStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContainerMetrics {
    pub status: ContainerStatus,
    pub cpu_usage_total: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
}

impl ContainerMetrics {
    pub fn memory_percent(&self) -> f64 {
        if self.memory_limit == 0 {
            return 0.0;
        }
        (self.memory_usage as f64 / self.memory_limit as f64) * 100.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("image pull error: {0}")]
    ImagePull(String),
    #[error("api error: {0}")]
    Api(String),
}
