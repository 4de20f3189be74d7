use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot collected by a node's heartbeat task on each tick.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeHealthMetrics {
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub memory_usage_mb: f64,
    pub memory_limit_mb: f64,
    pub running_pods: usize,
    pub container_status: String,
    pub last_error: Option<String>,
    pub pod_metrics: HashMap<String, PodMetrics>,
}

/// Per-pod metrics gathered alongside a node's heartbeat.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PodMetrics {
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub container_status: String,
}

/// Result of the sweeper's most recent health evaluation for a node.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthStatus {
    pub conditions: HealthConditions,
    pub last_check: DateTime<Utc>,
}

/// The four conditions the global sweeper checks per node.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct HealthConditions {
    pub heartbeat: bool,
    pub memory: bool,
    pub container: bool,
    pub density: bool,
}

impl HealthConditions {
    pub fn all_pass(&self) -> bool {
        self.heartbeat && self.memory && self.container && self.density
    }

    /// Names of conditions that failed, for logging.
    pub fn failing(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.heartbeat {
            failed.push("heartbeat");
        }
        if !self.memory {
            failed.push("memory");
        }
        if !self.container {
            failed.push("container");
        }
        if !self.density {
            failed.push("density");
        }
        failed
    }
}
