use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use shared::constants::HEARTBEAT_INTERVAL_SECS;
use shared::model::{NodeHealthMetrics, PodMetrics};

use crate::runtime::Runtime;
use crate::store::ClusterStore;

/// Spawns the per-node collector task. Ticks every
/// [`HEARTBEAT_INTERVAL_SECS`], pulling stats for the node's own container
/// and every pod bound to it, and writes the result into the store. Exits
/// quietly once the node is no longer in the store (removed, or never
/// existed).
pub fn spawn_heartbeat_collector(
    node_id: String,
    store: Arc<ClusterStore>,
    runtime: Arc<dyn Runtime>,
) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        loop {
            tick.tick().await;
            if !collect_once(&node_id, &store, runtime.as_ref()).await {
                return;
            }
        }
    });
}

/// Runs a single collection tick. Returns `false` once the node has
/// disappeared from the store, which is the collector's cue to terminate.
async fn collect_once(node_id: &str, store: &ClusterStore, runtime: &dyn Runtime) -> bool {
    let Some(node) = store.get_node(node_id).await else {
        tracing::debug!(node_id, "node gone, stopping heartbeat collector");
        return false;
    };

    let mut inspect_failed = false;
    let metrics = match runtime.inspect(&node.runtime_handle).await {
        Ok(node_metrics) => {
            let mut pod_metrics = HashMap::new();
            for pod_id in &node.pods {
                let Some(pod) = store.get_pod(pod_id).await else {
                    continue;
                };
                let Some(handle) = &pod.runtime_handle else {
                    continue;
                };
                match runtime.inspect(handle).await {
                    Ok(stats) => {
                        pod_metrics.insert(
                            pod_id.clone(),
                            PodMetrics {
                                cpu_usage_percent: stats.cpu_usage_total,
                                memory_usage_percent: stats.memory_percent(),
                                container_status: stats.status.to_string(),
                            },
                        );
                    }
                    Err(err) => {
                        tracing::warn!(pod_id, %err, "could not collect pod stats");
                    }
                }
            }

            NodeHealthMetrics {
                cpu_usage_percent: node_metrics.cpu_usage_total,
                memory_usage_percent: node_metrics.memory_percent(),
                memory_usage_mb: node_metrics.memory_usage as f64 / (1024.0 * 1024.0),
                memory_limit_mb: node_metrics.memory_limit as f64 / (1024.0 * 1024.0),
                running_pods: node.pods.len(),
                container_status: node_metrics.status.to_string(),
                last_error: None,
                pod_metrics,
            }
        }
        Err(err) => {
            inspect_failed = true;
            NodeHealthMetrics {
                cpu_usage_percent: 0.0,
                memory_usage_percent: 0.0,
                memory_usage_mb: 0.0,
                memory_limit_mb: 0.0,
                running_pods: node.pods.len(),
                container_status: "unknown".to_string(),
                last_error: Some(err.to_string()),
                pod_metrics: HashMap::new(),
            }
        }
    };

    if let Err(err) = store.record_heartbeat(node_id, metrics, Utc::now()).await {
        tracing::debug!(node_id, %err, "node disappeared mid-heartbeat");
        return false;
    }

    // §4.4: an inspect failure commits the node unhealthy directly, rather
    // than waiting for the sweeper's next pass to notice.
    if inspect_failed {
        let _ = store.mark_unhealthy(node_id).await;
    }
    true
}
