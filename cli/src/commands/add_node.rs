//! CLI `add-node` command: registers a new node with the control plane.

use clap::Parser;
use shared::api::{AddNodeRequest, AddNodeResponse, ErrorResponse};

use crate::config::Config;

/// CLI arguments for the `add-node` command.
#[derive(Parser, Debug)]
pub struct AddNodeArgs {
    /// CPU cores to declare for the new node
    pub cpu_capacity: u32,
}

#[tokio::main]
pub async fn handle(config: &Config, args: &AddNodeArgs) {
    let url = format!("{}/nodes", config.url);
    let body = AddNodeRequest {
        cpu_capacity: args.cpu_capacity,
    };

    let response = match reqwest::Client::new().post(&url).json(&body).send().await {
        Ok(resp) => resp,
        Err(err) => {
            eprintln!("Failed to reach {}: {}", url, err);
            return;
        }
    };

    if response.status().is_success() {
        match response.json::<AddNodeResponse>().await {
            Ok(added) => println!("node {} added ({})", added.node_id, added.message),
            Err(err) => eprintln!("Failed to parse response: {}", err),
        }
    } else {
        print_error(response).await;
    }
}

pub(crate) async fn print_error(response: reqwest::Response) {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => eprintln!("Error ({}): {}", status, body.error),
        Err(_) => eprintln!("Error ({})", status),
    }
}
