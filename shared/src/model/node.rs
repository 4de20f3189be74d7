use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::health::{HealthStatus, NodeHealthMetrics};

/// A worker node in the cluster, realized as a single long-lived container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Node {
    pub id: String,
    pub cpu_capacity: u32,
    pub cpu_available: u32,
    pub pods: Vec<String>,
    pub status: NodeStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub runtime_handle: String,
    pub health_metrics: Option<NodeHealthMetrics>,
    pub health_status: Option<HealthStatus>,
}

impl Node {
    pub fn new(id: String, cpu_capacity: u32, runtime_handle: String) -> Self {
        Self {
            id,
            cpu_capacity,
            cpu_available: cpu_capacity,
            pods: Vec::new(),
            status: NodeStatus::Healthy,
            last_heartbeat: Utc::now(),
            runtime_handle,
            health_metrics: None,
            health_status: None,
        }
    }
}

/// Health status of a node as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Healthy => write!(f, "Healthy"),
            NodeStatus::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}
