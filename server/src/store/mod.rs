//! In-memory cluster state behind a single exclusive lock.
//!
//! The teacher keeps nodes and pods in separate `DashMap`s so independent
//! keys can be mutated without contending on a shared lock. That shape does
//! not fit here: the scheduler's placement decision reads every node's
//! available capacity *and* commits a pod in the same step, and two
//! concurrent placements racing the same capacity must not both win. A
//! `RwLock` over the whole cluster makes that atomic by construction instead
//! of by careful per-key lock ordering.

mod reservation;

pub use reservation::Reservation;

use std::collections::HashSet;

use tokio::sync::RwLock;

use shared::constants::HOST_PORT_RANGE;
use shared::model::{HealthStatus, Node, NodeHealthMetrics, NodeStatus, Pod, PodStatus};

use crate::errors::Error;

/// A point-in-time copy of the whole cluster, for read-only endpoints.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub pods: Vec<Pod>,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: std::collections::HashMap<String, Node>,
    pods: std::collections::HashMap<String, Pod>,
    used_ports: HashSet<u16>,
}

impl Inner {
    /// Invariant 1 (§5): a node's `cpu_available` always equals its capacity
    /// minus the sum of its bound pods' requirements, *including* pods whose
    /// placement is reserved but not yet committed (tracked via
    /// `reserved_cpu`, folded into `cpu_available` directly by `reserve`).
    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        for node in self.nodes.values() {
            let bound: u32 = node
                .pods
                .iter()
                .filter_map(|id| self.pods.get(id))
                .map(|p| p.cpu_required)
                .sum();
            debug_assert!(
                node.cpu_available <= node.cpu_capacity,
                "node {} over capacity",
                node.id
            );
            debug_assert!(
                bound <= node.cpu_capacity,
                "node {} bound pods exceed capacity",
                node.id
            );
        }
    }

    #[cfg(not(debug_assertions))]
    fn check_invariants(&self) {}
}

fn stable_hash(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// The cluster's one source of truth. Every method either takes a brief read
/// lock to clone a snapshot, or a brief write lock to apply one mutation;
/// nothing here calls out to the container runtime; that I/O happens in
/// `scheduler`, outside any lock.
#[derive(Debug, Default)]
pub struct ClusterStore {
    inner: RwLock<Inner>,
}

impl ClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read().await;
        Snapshot {
            nodes: inner.nodes.values().cloned().collect(),
            pods: inner.pods.values().cloned().collect(),
        }
    }

    pub async fn get_node(&self, id: &str) -> Option<Node> {
        self.inner.read().await.nodes.get(id).cloned()
    }

    pub async fn get_pod(&self, id: &str) -> Option<Pod> {
        self.inner.read().await.pods.get(id).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.nodes.is_empty()
    }

    /// Handles for every live node, for the heartbeat collectors and the
    /// startup reconciliation pass.
    pub async fn node_handles(&self) -> Vec<(String, String)> {
        self.inner
            .read()
            .await
            .nodes
            .values()
            .map(|n| (n.id.clone(), n.runtime_handle.clone()))
            .collect()
    }

    /// Commits a freshly launched node, re-checking invariant 4 (aggregate
    /// capacity ceiling) atomically against the live total: a concurrent
    /// `AddNode` may have consumed the headroom between the caller's
    /// pre-launch check and this commit.
    pub async fn insert_node(&self, node: Node, system_cpu_count: u32) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        if inner.nodes.contains_key(&node.id) {
            return Err(Error::Conflict(format!("node {} already exists", node.id)));
        }
        let total: u32 = inner.nodes.values().map(|n| n.cpu_capacity).sum();
        if total + node.cpu_capacity > system_cpu_count {
            return Err(Error::CapacityExceeded(format!(
                "adding {} cores would exceed system capacity of {system_cpu_count}",
                node.cpu_capacity
            )));
        }
        inner.nodes.insert(node.id.clone(), node);
        inner.check_invariants();
        Ok(())
    }

    /// Sum of declared capacity across all live nodes, for the scheduler's
    /// pre-launch capacity check (§4.3 step 2).
    pub async fn total_cpu_capacity(&self) -> u32 {
        self.inner.read().await.nodes.values().map(|n| n.cpu_capacity).sum()
    }

    /// Removes the node and returns it (including its still-populated pod
    /// list, for the caller to migrate). Does not touch the pod table.
    pub async fn delete_node(&self, id: &str) -> Result<Node, Error> {
        let mut inner = self.inner.write().await;
        inner
            .nodes
            .remove(id)
            .ok_or_else(|| Error::NotFound(format!("node {id} not found")))
    }

    /// Flips a node to unhealthy. Returns whether this was a transition (the
    /// caller uses this to decide whether to trigger a reschedule).
    pub async fn mark_unhealthy(&self, id: &str) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("node {id} not found")))?;
        let transitioned = node.status == NodeStatus::Healthy;
        node.status = NodeStatus::Unhealthy;
        Ok(transitioned)
    }

    pub async fn mark_healthy(&self, id: &str) -> Result<bool, Error> {
        let mut inner = self.inner.write().await;
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("node {id} not found")))?;
        let transitioned = node.status == NodeStatus::Unhealthy;
        node.status = NodeStatus::Healthy;
        Ok(transitioned)
    }

    pub async fn record_heartbeat(
        &self,
        id: &str,
        metrics: NodeHealthMetrics,
        last_heartbeat: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("node {id} not found")))?;
        node.health_metrics = Some(metrics);
        node.last_heartbeat = last_heartbeat;
        Ok(())
    }

    pub async fn record_health_status(&self, id: &str, status: HealthStatus) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("node {id} not found")))?;
        node.health_status = Some(status);
        Ok(())
    }

    /// Selects the best-fit healthy node for `cpu_required`, allocates a host
    /// port, and atomically reserves both against this request before
    /// returning. The reservation must be followed by either [`Self::place_pod`]
    /// (success) or [`Self::release_reservation`] (rollback) — the capacity and
    /// port it holds are otherwise leaked.
    pub async fn reserve_best_fit(&self, pod_id: &str, cpu_required: u32) -> Result<Reservation, Error> {
        let mut inner = self.inner.write().await;

        let node_id = inner
            .nodes
            .values()
            .filter(|n| n.status == NodeStatus::Healthy && n.cpu_available >= cpu_required)
            .max_by(|a, b| {
                a.cpu_available
                    .cmp(&b.cpu_available)
                    .then_with(|| b.id.cmp(&a.id))
            })
            .map(|n| n.id.clone())
            .ok_or_else(|| {
                Error::NoCapacity(format!("no healthy node has {cpu_required} cpu free"))
            })?;

        let host_port = {
            let base = HOST_PORT_RANGE.start + (stable_hash(pod_id) % 10_000) as u16;
            let mut candidate = base;
            loop {
                if !inner.used_ports.contains(&candidate) {
                    break candidate;
                }
                candidate = if candidate + 1 < HOST_PORT_RANGE.end {
                    candidate + 1
                } else {
                    HOST_PORT_RANGE.start
                };
                if candidate == base {
                    return Err(Error::NoCapacity("host port range exhausted".to_string()));
                }
            }
        };

        let node = inner.nodes.get_mut(&node_id).expect("just selected");
        node.cpu_available -= cpu_required;
        inner.used_ports.insert(host_port);
        inner.check_invariants();

        Ok(Reservation {
            node_id,
            host_port,
            cpu_required,
        })
    }

    /// Rolls back a reservation that was never committed (runtime launch
    /// failed, or the target node disappeared before `place_pod`).
    pub async fn release_reservation(&self, reservation: &Reservation) {
        let mut inner = self.inner.write().await;
        inner.used_ports.remove(&reservation.host_port);
        if let Some(node) = inner.nodes.get_mut(&reservation.node_id) {
            node.cpu_available += reservation.cpu_required;
        }
    }

    /// Commits a reserved placement: inserts or replaces the pod record and
    /// attaches it to its node's pod list. Fails with `Conflict` if the
    /// reserved node vanished in the meantime (e.g. a concurrent
    /// `remove_node`); the caller must then roll back via
    /// [`Self::release_reservation`] and retry against a fresh reservation.
    pub async fn place_pod(&self, pod: Pod, reservation: &Reservation) -> Result<(), Error> {
        let mut inner = self.inner.write().await;
        if !inner.nodes.contains_key(&reservation.node_id) {
            return Err(Error::Conflict(format!(
                "node {} no longer exists",
                reservation.node_id
            )));
        }

        let pod_id = pod.id.clone();

        // A reschedule reuses the pod's id: its previous record (if any)
        // still holds capacity and a host port on its old node, neither of
        // which `reserve_best_fit` knew to account for. Release both before
        // the new reservation's are committed in their place, or the old
        // node leaks capacity and the old port leaks forever.
        let prior = inner
            .pods
            .get(&pod_id)
            .map(|p| (p.node_id.clone(), p.host_port, p.cpu_required));
        if let Some((old_node_id, old_port, old_cpu_required)) = prior {
            if let Some(old_node_id) = old_node_id {
                if let Some(old_node) = inner.nodes.get_mut(&old_node_id) {
                    old_node.cpu_available += old_cpu_required;
                }
            }
            if old_port != reservation.host_port {
                inner.used_ports.remove(&old_port);
            }
        }

        // Drop it from whichever node it used to be attached to before
        // re-attaching it below.
        for node in inner.nodes.values_mut() {
            node.pods.retain(|id| id != &pod_id);
        }

        inner.pods.insert(pod_id.clone(), pod);
        inner
            .nodes
            .get_mut(&reservation.node_id)
            .expect("checked above")
            .pods
            .push(pod_id);

        inner.check_invariants();
        Ok(())
    }

    /// Marks a pod as permanently unplaced after every reschedule attempt
    /// failed. Frees its host port; leaves `node_id` cleared per the pod's
    /// own invariant.
    pub async fn mark_pod_unplaced(&self, pod_id: &str) -> Result<(), Error> {
        let mut inner = self.inner.write().await;

        let (old_node_id, port, cpu_required) = inner
            .pods
            .get(pod_id)
            .map(|p| (p.node_id.clone(), p.host_port, p.cpu_required))
            .ok_or_else(|| Error::NotFound(format!("pod {pod_id} not found")))?;

        for node in inner.nodes.values_mut() {
            node.pods.retain(|id| id != pod_id);
        }
        // The pod's prior node (if it still exists) was still counting this
        // pod against its capacity; restore it now that the pod is unplaced.
        if let Some(old_node_id) = old_node_id {
            if let Some(old_node) = inner.nodes.get_mut(&old_node_id) {
                old_node.cpu_available += cpu_required;
            }
        }

        let pod = inner.pods.get_mut(pod_id).expect("checked above");
        pod.node_id = None;
        pod.runtime_handle = None;
        pod.status = PodStatus::Failed;
        inner.used_ports.remove(&port);

        inner.check_invariants();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::model::Node;

    fn node(id: &str, cpu: u32) -> Node {
        Node::new(id.to_string(), cpu, format!("handle-{id}"))
    }

    #[tokio::test]
    async fn reserve_best_fit_picks_largest_free_capacity() {
        let store = ClusterStore::new();
        store.insert_node(node("a", 4), 64).await.unwrap();
        store.insert_node(node("b", 8), 64).await.unwrap();

        let reservation = store.reserve_best_fit("pod-1", 2).await.unwrap();
        assert_eq!(reservation.node_id, "b");

        let b = store.get_node("b").await.unwrap();
        assert_eq!(b.cpu_available, 6);
    }

    #[tokio::test]
    async fn reserve_best_fit_ties_break_lexicographically() {
        let store = ClusterStore::new();
        store.insert_node(node("zeta", 4), 64).await.unwrap();
        store.insert_node(node("alpha", 4), 64).await.unwrap();

        let reservation = store.reserve_best_fit("pod-1", 2).await.unwrap();
        assert_eq!(reservation.node_id, "alpha");
    }

    #[tokio::test]
    async fn reserve_best_fit_rejects_when_no_node_has_capacity() {
        let store = ClusterStore::new();
        store.insert_node(node("a", 2), 64).await.unwrap();

        let err = store.reserve_best_fit("pod-1", 4).await.unwrap_err();
        assert!(matches!(err, Error::NoCapacity(_)));
    }

    #[tokio::test]
    async fn release_reservation_restores_capacity_and_port() {
        let store = ClusterStore::new();
        store.insert_node(node("a", 4), 64).await.unwrap();
        let reservation = store.reserve_best_fit("pod-1", 3).await.unwrap();

        store.release_reservation(&reservation).await;

        let a = store.get_node("a").await.unwrap();
        assert_eq!(a.cpu_available, 4);
    }

    #[tokio::test]
    async fn place_pod_fails_if_node_vanished_since_reservation() {
        let store = ClusterStore::new();
        store.insert_node(node("a", 4), 64).await.unwrap();
        let reservation = store.reserve_best_fit("pod-1", 2).await.unwrap();
        store.delete_node("a").await.unwrap();

        let pod = Pod::new("pod-1".to_string(), 2, "nginx".to_string());
        let err = store.place_pod(pod, &reservation).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn place_pod_reattaches_rescheduled_pod_to_new_node() {
        let store = ClusterStore::new();
        store.insert_node(node("old", 4), 64).await.unwrap();
        store.insert_node(node("new", 4), 64).await.unwrap();

        let first = store.reserve_best_fit("pod-1", 2).await.unwrap();
        let mut pod = Pod::new("pod-1".to_string(), 2, "nginx".to_string());
        pod.node_id = Some(first.node_id.clone());
        pod.host_port = first.host_port;
        store.place_pod(pod.clone(), &first).await.unwrap();

        store.mark_unhealthy("old").await.unwrap();
        let second = store.reserve_best_fit("pod-1", 2).await.unwrap();
        assert_eq!(second.node_id, "new");

        pod.node_id = Some(second.node_id.clone());
        pod.host_port = second.host_port;
        store.place_pod(pod, &second).await.unwrap();

        let old = store.get_node("old").await.unwrap();
        let new = store.get_node("new").await.unwrap();
        assert!(!old.pods.contains(&"pod-1".to_string()));
        assert!(new.pods.contains(&"pod-1".to_string()));
    }

    /// Regression test: `RescheduleFrom` (§4.4) marks the source node
    /// unhealthy but never deletes it, unlike `RemoveNode`. A migration must
    /// give the source node its capacity back, or it leaks forever and the
    /// node can't accept its full capacity again once it recovers.
    #[tokio::test]
    async fn place_pod_restores_source_nodes_capacity_on_reschedule() {
        let store = ClusterStore::new();
        store.insert_node(node("old", 4), 64).await.unwrap();
        store.insert_node(node("new", 4), 64).await.unwrap();

        let first = store.reserve_best_fit("pod-1", 2).await.unwrap();
        let mut pod = Pod::new("pod-1".to_string(), 2, "nginx".to_string());
        pod.node_id = Some(first.node_id.clone());
        pod.host_port = first.host_port;
        store.place_pod(pod.clone(), &first).await.unwrap();

        store.mark_unhealthy(&first.node_id).await.unwrap();
        let second = store.reserve_best_fit("pod-1", 2).await.unwrap();
        pod.node_id = Some(second.node_id.clone());
        pod.host_port = second.host_port;
        store.place_pod(pod, &second).await.unwrap();

        // Node recovers; it should be able to host a pod needing its full
        // declared capacity again, with no pods bound to it.
        store.mark_healthy(&first.node_id).await.unwrap();
        let recovered = store.get_node(&first.node_id).await.unwrap();
        assert!(recovered.pods.is_empty());
        assert_eq!(recovered.cpu_available, recovered.cpu_capacity);
    }

    /// Regression test: the old record's host port must be released on
    /// reschedule, or repeated reschedules of the same pod exhaust the host
    /// port range even though only one port is ever actually in use.
    #[tokio::test]
    async fn place_pod_frees_source_nodes_host_port_on_reschedule() {
        let store = ClusterStore::new();
        store.insert_node(node("old", 4), 64).await.unwrap();
        store.insert_node(node("new", 4), 64).await.unwrap();

        let first = store.reserve_best_fit("pod-1", 2).await.unwrap();
        let mut pod = Pod::new("pod-1".to_string(), 2, "nginx".to_string());
        pod.node_id = Some(first.node_id.clone());
        pod.host_port = first.host_port;
        store.place_pod(pod.clone(), &first).await.unwrap();

        store.mark_unhealthy(&first.node_id).await.unwrap();
        let second = store.reserve_best_fit("pod-1", 2).await.unwrap();
        assert_ne!(second.host_port, first.host_port, "reschedule should pick up a new port");
        pod.node_id = Some(second.node_id.clone());
        pod.host_port = second.host_port;
        store.place_pod(pod, &second).await.unwrap();

        assert!(!store.inner.read().await.used_ports.contains(&first.host_port));
    }

    #[tokio::test]
    async fn mark_pod_unplaced_clears_node_and_frees_port() {
        let store = ClusterStore::new();
        store.insert_node(node("a", 4), 64).await.unwrap();
        let reservation = store.reserve_best_fit("pod-1", 2).await.unwrap();
        let mut pod = Pod::new("pod-1".to_string(), 2, "nginx".to_string());
        pod.node_id = Some(reservation.node_id.clone());
        pod.host_port = reservation.host_port;
        store.place_pod(pod, &reservation).await.unwrap();

        store.mark_pod_unplaced("pod-1").await.unwrap();

        let pod = store.get_pod("pod-1").await.unwrap();
        assert_eq!(pod.node_id, None);
        assert_eq!(pod.status, PodStatus::Failed);

        let node = store.get_node("a").await.unwrap();
        assert_eq!(node.cpu_available, node.cpu_capacity);
        assert!(!store.inner.read().await.used_ports.contains(&reservation.host_port));
    }
}
