//! HTTP surface (§6): `/nodes`, `/pods`, `/cluster/status`.

pub mod cluster;
pub mod log;
pub mod nodes;
pub mod pods;

use std::sync::Arc;

use actix_web::web::{self, scope};

use crate::scheduler::Scheduler;

pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

pub type State = web::Data<AppState>;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(scope("/nodes").configure(nodes::config))
        .service(scope("/pods").configure(pods::config))
        .service(scope("/cluster").configure(cluster::config));
}
