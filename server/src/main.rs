//! `clusterd` entrypoint.
//!
//! Boots the container runtime adapter, the in-memory cluster store, the
//! scheduler, and the health monitor (one heartbeat collector per node,
//! spawned lazily by `Scheduler::add_node`, plus the single global sweeper),
//! then serves the HTTP API.

use std::process::ExitCode;
use std::sync::Arc;

use actix_web::{App, HttpServer};
use tracing_subscriber::EnvFilter;

use server::config::Config;
use server::endpoints::{self, AppState};
use server::endpoints::log::Logging;
use server::health::spawn_sweeper;
use server::runtime::{DockerRuntime, Runtime};
use server::scheduler::Scheduler;
use server::store::ClusterStore;

#[actix_web::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,actix_server=warn,actix_web=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env();

    let runtime: Arc<dyn Runtime> = match DockerRuntime::connect() {
        Ok(runtime) => Arc::new(runtime),
        Err(err) => {
            tracing::error!(%err, "container runtime unreachable at startup");
            return ExitCode::FAILURE;
        }
    };

    // Startup reconciliation (§4.2): the store starts empty every boot since
    // state is process-lifetime only, so there is nothing to repair here —
    // just log whatever containers are already running, in case an operator
    // needs to clean them up by hand.
    match runtime.list_all().await {
        Ok(handles) if !handles.is_empty() => {
            tracing::warn!(count = handles.len(), ?handles, "found orphaned containers at startup");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(%err, "could not list containers for startup reconciliation"),
    }

    let store = Arc::new(ClusterStore::new());
    let scheduler = Arc::new(Scheduler::with_system_cpu_count(
        store,
        runtime,
        config.system_cpu_count,
        config.max_node_cpu,
        config.max_pod_cpu,
    ));

    spawn_sweeper(scheduler.clone());

    let state = actix_web::web::Data::new(AppState { scheduler });
    let port = config.port;

    tracing::info!(port, system_cpu_count = config.system_cpu_count, "clusterd starting");

    let server = match HttpServer::new(move || {
        App::new()
            .wrap(Logging)
            .app_data(state.clone())
            .configure(endpoints::config)
    })
    .bind(("0.0.0.0", port))
    {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(%err, port, "failed to bind http server");
            return ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "server terminated with an error");
            ExitCode::FAILURE
        }
    }
}
