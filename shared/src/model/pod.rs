use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A schedulable workload, realized as a single container bound to at most
/// one node at a time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pod {
    pub id: String,
    /// `None` once the pod has failed to find a home.
    pub node_id: Option<String>,
    pub cpu_required: u32,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub status: PodStatus,
    pub runtime_handle: Option<String>,
    pub host_port: u16,
}

impl Pod {
    pub fn new(id: String, cpu_required: u32, image: String) -> Self {
        Self {
            id,
            node_id: None,
            cpu_required,
            image,
            created_at: Utc::now(),
            status: PodStatus::Unknown,
            runtime_handle: None,
            host_port: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PodStatus {
    Running,
    Failed,
    Unknown,
}

impl std::fmt::Display for PodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodStatus::Running => write!(f, "Running"),
            PodStatus::Failed => write!(f, "Failed"),
            PodStatus::Unknown => write!(f, "Unknown"),
        }
    }
}
