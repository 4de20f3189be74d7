//! CLI `create-pod` command: schedules a pod onto the cluster.

use clap::Parser;
use shared::api::{CreatePodRequest, CreatePodResponse};

use super::add_node::print_error;
use crate::config::Config;

/// CLI arguments for the `create-pod` command.
#[derive(Parser, Debug)]
pub struct CreatePodArgs {
    /// CPU cores the pod requires
    pub cpu_required: u32,
    /// Container image to run (defaults to nginx:latest server-side)
    #[arg(long)]
    pub image: Option<String>,
}

#[tokio::main]
pub async fn handle(config: &Config, args: &CreatePodArgs) {
    let url = format!("{}/pods", config.url);
    let body = CreatePodRequest {
        cpu_required: args.cpu_required,
        image: args.image.clone(),
    };

    let response = match reqwest::Client::new().post(&url).json(&body).send().await {
        Ok(resp) => resp,
        Err(err) => {
            eprintln!("Failed to reach {}: {}", url, err);
            return;
        }
    };

    if response.status().is_success() {
        match response.json::<CreatePodResponse>().await {
            Ok(pod) => println!(
                "pod {} placed on node {} ({}) -> {}",
                pod.pod_id, pod.node_id, pod.image, pod.access_url
            ),
            Err(err) => eprintln!("Failed to parse response: {}", err),
        }
    } else {
        print_error(response).await;
    }
}
