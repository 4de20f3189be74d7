//! Cluster-wide read endpoint.
//!
//! ## Routes
//! - `GET /cluster/status` — every node, its health, and the pods bound to it

use std::collections::HashMap;

use actix_web::{HttpResponse, Responder, web};

use shared::api::{ClusterStatusResponse, NodeView, PodView};

use super::State;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(status));
}

async fn status(state: State) -> impl Responder {
    let snapshot = state.scheduler.store().snapshot().await;
    let pods_by_id: HashMap<_, _> = snapshot.pods.iter().map(|p| (p.id.clone(), p)).collect();

    let mut nodes = HashMap::new();
    for node in &snapshot.nodes {
        let pod_views = node
            .pods
            .iter()
            .filter_map(|id| pods_by_id.get(id))
            .map(|pod| {
                let metrics = node
                    .health_metrics
                    .as_ref()
                    .and_then(|m| m.pod_metrics.get(&pod.id))
                    .cloned();
                PodView::from_pod(pod, metrics)
            })
            .collect();
        nodes.insert(node.id.clone(), NodeView::from_node(node, pod_views));
    }

    HttpResponse::Ok().json(ClusterStatusResponse { nodes })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test, web};

    use crate::endpoints::AppState;
    use crate::runtime::FakeRuntime;
    use crate::scheduler::Scheduler;
    use crate::store::ClusterStore;

    #[actix_web::test]
    async fn status_lists_nodes_and_their_pods() {
        let scheduler = Scheduler::new(
            Arc::new(ClusterStore::new()),
            Arc::new(FakeRuntime::new()),
            8,
            6,
        );
        let node = scheduler.add_node(4).await.unwrap();
        scheduler.create_pod(2, None).await.unwrap();

        let state = web::Data::new(AppState {
            scheduler: Arc::new(scheduler),
        });
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["nodes"][node.id.as_str()]["pods"].as_array().unwrap().len(), 1);
    }
}
