//! CLI `status` command: prints the cluster's nodes and pods as tables.

use clap::Parser;
use shared::api::ClusterStatusResponse;
use shared::view::{NodeRow, PodRow};
use tabled::{Table, settings::Style};

use super::add_node::print_error;
use crate::config::Config;

/// CLI arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {}

#[tokio::main]
pub async fn handle(config: &Config, _args: &StatusArgs) {
    let url = format!("{}/cluster/status", config.url);

    let response = match reqwest::get(&url).await {
        Ok(resp) => resp,
        Err(err) => {
            eprintln!("Failed to reach {}: {}", url, err);
            return;
        }
    };

    if !response.status().is_success() {
        print_error(response).await;
        return;
    }

    let body = match response.json::<ClusterStatusResponse>().await {
        Ok(body) => body,
        Err(err) => {
            eprintln!("Failed to parse response: {}", err);
            return;
        }
    };

    if body.nodes.is_empty() {
        println!("no nodes registered");
        return;
    }

    let mut node_ids: Vec<&String> = body.nodes.keys().collect();
    node_ids.sort();

    let node_rows: Vec<NodeRow> = node_ids
        .iter()
        .map(|id| NodeRow::from_view(id, &body.nodes[*id]))
        .collect();
    let mut node_table = Table::new(node_rows);
    node_table.with(Style::blank());
    println!("{}", node_table);

    let pod_rows: Vec<PodRow> = node_ids
        .iter()
        .flat_map(|id| body.nodes[*id].pods.iter().map(|pod| PodRow::from_view(id, pod)))
        .collect();
    if !pod_rows.is_empty() {
        println!();
        let mut pod_table = Table::new(pod_rows);
        pod_table.with(Style::blank());
        println!("{}", pod_table);
    }
}
