//! CLI `rm-node` command: removes a node, migrating its pods elsewhere.

use clap::Parser;
use shared::api::RemoveNodeResponse;

use super::add_node::print_error;
use crate::config::Config;

/// CLI arguments for the `rm-node` command.
#[derive(Parser, Debug)]
pub struct RmNodeArgs {
    /// Id of the node to remove
    pub node_id: String,
}

#[tokio::main]
pub async fn handle(config: &Config, args: &RmNodeArgs) {
    let url = format!("{}/nodes/{}", config.url, args.node_id);

    let response = match reqwest::Client::new().delete(&url).send().await {
        Ok(resp) => resp,
        Err(err) => {
            eprintln!("Failed to reach {}: {}", url, err);
            return;
        }
    };

    if response.status().is_success() {
        match response.json::<RemoveNodeResponse>().await {
            Ok(removed) => println!(
                "{} (rescheduled: {}, failed: {})",
                removed.message, removed.rescheduled_pods, removed.failed_pods
            ),
            Err(err) => eprintln!("Failed to parse response: {}", err),
        }
    } else {
        print_error(response).await;
    }
}
