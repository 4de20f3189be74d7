//! Health monitoring: one heartbeat collector task per node, plus a single
//! global sweeper task, mirroring the original's per-node heartbeat thread
//! and global `check_health` loop.

mod heartbeat;
mod sweeper;

pub use heartbeat::spawn_heartbeat_collector;
pub use sweeper::spawn_sweeper;
