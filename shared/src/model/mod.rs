pub mod health;
pub mod node;
pub mod pod;

pub use health::{HealthConditions, HealthStatus, NodeHealthMetrics, PodMetrics};
pub use node::{Node, NodeStatus};
pub use pod::{Pod, PodStatus};
