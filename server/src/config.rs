//! Process configuration loaded from environment variables, in the shape of
//! the teacher's node/cli config loaders: everything optional has a default,
//! nothing panics except on a genuinely malformed override.

use std::env;

use shared::constants::{NODE_CPU_CEILING, POD_CPU_CEILING};

const DEFAULT_PORT: u16 = 7620;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Total CPU cores the cluster may allocate across all nodes.
    pub system_cpu_count: u32,
    pub max_node_cpu: u32,
    pub max_pod_cpu: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("CLUSTER_SERVER_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let system_cpu_count = env::var("CLUSTER_SYSTEM_CPU")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or_else(|| num_cpus::get() as u32);

        Self {
            port,
            system_cpu_count,
            max_node_cpu: NODE_CPU_CEILING.min(system_cpu_count),
            max_pod_cpu: POD_CPU_CEILING.min(system_cpu_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_follow_system_cpu_count_when_small() {
        let cfg = Config {
            port: DEFAULT_PORT,
            system_cpu_count: 2,
            max_node_cpu: NODE_CPU_CEILING.min(2),
            max_pod_cpu: POD_CPU_CEILING.min(2),
        };
        assert_eq!(cfg.max_node_cpu, 2);
        assert_eq!(cfg.max_pod_cpu, 2);
    }
}
