//! Request/response payloads exchanged between `clusterctl` and the
//! control-plane's HTTP API. The API itself — routing, extraction — is
//! ordinary `actix-web` plumbing; these are just the wire shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{NodeStatus, PodStatus, health::HealthStatus, node::Node, pod::Pod};

// --- POST /nodes ---

#[derive(Debug, Deserialize, Serialize)]
pub struct AddNodeRequest {
    pub cpu_capacity: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AddNodeResponse {
    pub node_id: String,
    pub message: String,
}

// --- DELETE /nodes/{node_id} ---

#[derive(Debug, Deserialize, Serialize)]
pub struct RemoveNodeResponse {
    pub message: String,
    pub rescheduled_pods: usize,
    pub failed_pods: usize,
}

// --- POST /pods ---

#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePodRequest {
    pub cpu_required: u32,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePodResponse {
    pub pod_id: String,
    pub node_id: String,
    pub image: String,
    pub access_url: String,
}

// --- GET /cluster/status ---

#[derive(Debug, Deserialize, Serialize)]
pub struct ClusterStatusResponse {
    pub nodes: HashMap<String, NodeView>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NodeView {
    pub cpu_capacity: u32,
    pub cpu_available: u32,
    pub status: NodeStatus,
    pub health_metrics: Option<crate::model::health::NodeHealthMetrics>,
    pub health_status: Option<HealthStatus>,
    pub pods: Vec<PodView>,
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PodView {
    pub id: String,
    pub cpu_required: u32,
    pub status: PodStatus,
    pub metrics: Option<crate::model::health::PodMetrics>,
}

impl NodeView {
    pub fn from_node(node: &Node, pods: Vec<PodView>) -> Self {
        Self {
            cpu_capacity: node.cpu_capacity,
            cpu_available: node.cpu_available,
            status: node.status,
            health_metrics: node.health_metrics.clone(),
            health_status: node.health_status.clone(),
            pods,
            last_heartbeat: node.last_heartbeat,
        }
    }
}

impl PodView {
    pub fn from_pod(pod: &Pod, metrics: Option<crate::model::health::PodMetrics>) -> Self {
        Self {
            id: pod.id.clone(),
            cpu_required: pod.cpu_required,
            status: pod.status,
            metrics,
        }
    }
}

// --- shared error shape ---

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
