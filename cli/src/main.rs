use clap::{Parser, Subcommand};

mod commands;
mod config;

/// CLI tool to interact with the cluster control plane: register nodes,
/// schedule pods, and inspect cluster status.
#[derive(Parser, Debug)]
#[command(name = "clusterctl", version, about, long_about = None)]
struct ClusterCtl {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new node
    AddNode(commands::add_node::AddNodeArgs),
    /// Remove a node, migrating its pods elsewhere
    RmNode(commands::rm_node::RmNodeArgs),
    /// Schedule a pod onto the cluster
    CreatePod(commands::create_pod::CreatePodArgs),
    /// Show every node and the pods bound to it
    Status(commands::status::StatusArgs),
}

fn main() {
    let cli = ClusterCtl::parse();
    let config = config::Config::from_env();

    match cli.command {
        Commands::AddNode(args) => commands::add_node::handle(&config, &args),
        Commands::RmNode(args) => commands::rm_node::handle(&config, &args),
        Commands::CreatePod(args) => commands::create_pod::handle(&config, &args),
        Commands::Status(args) => commands::status::handle(&config, &args),
    }
}
