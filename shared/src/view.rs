//! Table-display glue for `clusterctl get` output.

use tabled::Tabled;

use crate::api::{NodeView, PodView};

/// Row shape for `clusterctl get nodes`.
#[derive(Tabled)]
pub struct NodeRow {
    #[tabled(rename = "NODE ID")]
    pub id: String,
    #[tabled(rename = "STATUS")]
    pub status: String,
    #[tabled(rename = "CPU CAP")]
    pub cpu_capacity: u32,
    #[tabled(rename = "CPU FREE")]
    pub cpu_available: u32,
    #[tabled(rename = "PODS")]
    pub pod_count: usize,
    #[tabled(rename = "LAST HEARTBEAT")]
    pub last_heartbeat: String,
}

impl NodeRow {
    pub fn from_view(id: &str, view: &NodeView) -> Self {
        Self {
            id: id.to_string(),
            status: view.status.to_string(),
            cpu_capacity: view.cpu_capacity,
            cpu_available: view.cpu_available,
            pod_count: view.pods.len(),
            last_heartbeat: view.last_heartbeat.to_rfc3339(),
        }
    }
}

/// Row shape for `clusterctl get pods`.
#[derive(Tabled)]
pub struct PodRow {
    #[tabled(rename = "POD ID")]
    pub id: String,
    #[tabled(rename = "NODE ID")]
    pub node_id: String,
    #[tabled(rename = "CPU")]
    pub cpu_required: u32,
    #[tabled(rename = "STATUS")]
    pub status: String,
}

impl PodRow {
    pub fn from_view(node_id: &str, view: &PodView) -> Self {
        Self {
            id: view.id.clone(),
            node_id: node_id.to_string(),
            cpu_required: view.cpu_required,
            status: view.status.to_string(),
        }
    }
}
