//! Pod scheduling endpoint.
//!
//! ## Routes
//! - `POST /pods` — create a pod and place it on a node

use actix_web::{HttpResponse, Responder, web};

use shared::api::{CreatePodRequest, CreatePodResponse};

use super::State;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create_pod));
}

async fn create_pod(state: State, payload: web::Json<CreatePodRequest>) -> impl Responder {
    let payload = payload.into_inner();
    match state
        .scheduler
        .create_pod(payload.cpu_required, payload.image)
        .await
    {
        Ok(pod) => {
            tracing::info!(
                pod_id = %pod.id,
                node_id = ?pod.node_id,
                host_port = pod.host_port,
                "pod created"
            );
            HttpResponse::Created().json(CreatePodResponse {
                pod_id: pod.id,
                node_id: pod.node_id.unwrap_or_default(),
                image: pod.image,
                access_url: format!("http://localhost:{}", pod.host_port),
            })
        }
        Err(err) => {
            tracing::warn!(%err, "create_pod failed");
            err.to_http_response()
        }
    }
}
