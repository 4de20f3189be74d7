//! Node lifecycle endpoints.
//!
//! ## Routes
//! - `POST   /nodes`           — register a new node (launches its container)
//! - `DELETE /nodes/{node_id}` — remove a node, migrating its pods elsewhere

use actix_web::{HttpResponse, Responder, web};

use shared::api::{AddNodeRequest, AddNodeResponse, RemoveNodeResponse};

use super::State;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(add_node))
        .route("/{node_id}", web::delete().to(remove_node));
}

async fn add_node(state: State, payload: web::Json<AddNodeRequest>) -> impl Responder {
    match state.scheduler.add_node(payload.cpu_capacity).await {
        Ok(node) => {
            tracing::info!(node_id = %node.id, cpu_capacity = node.cpu_capacity, "node added");
            HttpResponse::Created().json(AddNodeResponse {
                node_id: node.id,
                message: "node added".to_string(),
            })
        }
        Err(err) => {
            tracing::warn!(%err, "add_node failed");
            err.to_http_response()
        }
    }
}

async fn remove_node(state: State, path: web::Path<String>) -> impl Responder {
    let node_id = path.into_inner();
    match state.scheduler.remove_node(&node_id).await {
        Ok(outcome) => {
            tracing::info!(
                node_id,
                migrated = outcome.migrated,
                failed = outcome.failed,
                "node removed"
            );
            HttpResponse::Ok().json(RemoveNodeResponse {
                message: "node removed".to_string(),
                rescheduled_pods: outcome.migrated,
                failed_pods: outcome.failed,
            })
        }
        Err(err) => {
            tracing::warn!(node_id, %err, "remove_node failed");
            err.to_http_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test, web};

    use crate::endpoints::AppState;
    use crate::runtime::FakeRuntime;
    use crate::scheduler::Scheduler;
    use crate::store::ClusterStore;

    fn test_state() -> web::Data<AppState> {
        let scheduler = Scheduler::new(
            Arc::new(ClusterStore::new()),
            Arc::new(FakeRuntime::new()),
            8,
            6,
        );
        web::Data::new(AppState {
            scheduler: Arc::new(scheduler),
        })
    }

    #[actix_web::test]
    async fn add_node_returns_201_with_node_id() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/")
            .set_json(serde_json::json!({ "cpu_capacity": 4 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
    }

    #[actix_web::test]
    async fn add_node_rejects_excessive_cpu_capacity() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/")
            .set_json(serde_json::json!({ "cpu_capacity": 99 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn remove_node_returns_404_for_unknown_node() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(super::config),
        )
        .await;

        let req = test::TestRequest::delete().uri("/does-not-exist").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
