//! Cluster-wide constants that do not depend on the host's CPU count.
//!
//! `MAX_NODE_CPU` and `MAX_POD_CPU` are *not* here: they are derived from
//! `SYSTEM_CPU_COUNT` at startup (see `server::config::Config`), since they
//! cap at a fixed ceiling but fall below it on small hosts.

use std::ops::Range;

/// Interval between per-node heartbeat collector ticks and sweeper ticks.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// A node with no heartbeat for longer than this is considered unreachable.
pub const UNHEALTHY_THRESHOLD_SECS: i64 = 15;

/// Image used for a pod when the caller does not specify one.
pub const DEFAULT_POD_IMAGE: &str = "nginx:latest";

/// Range of host ports available for pod port mappings, [10000, 20000).
pub const HOST_PORT_RANGE: Range<u16> = 10000..20000;

/// Ceiling applied to a node's declared CPU capacity, before capping to
/// `SYSTEM_CPU_COUNT`.
pub const NODE_CPU_CEILING: u32 = 8;

/// Ceiling applied to a pod's CPU requirement, before capping to
/// `SYSTEM_CPU_COUNT`.
pub const POD_CPU_CEILING: u32 = 6;

/// A node is considered over-subscribed once it carries more running pods
/// than this multiple of its declared CPU capacity.
pub const POD_DENSITY_FACTOR: u32 = 2;

/// A node is considered low on memory once usage crosses this percentage.
pub const MEMORY_PRESSURE_PERCENT: f64 = 90.0;
