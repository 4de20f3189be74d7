//! In-memory `Runtime` double used by scheduler and health-monitor tests, in
//! the same spirit as the teacher's `TestStore`: no Docker daemon required.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{ContainerMetrics, ContainerStatus, PortMap, Runtime, RuntimeError};

#[derive(Debug, Clone)]
struct FakeContainer {
    status: ContainerStatus,
    cpu_usage_total: f64,
    memory_usage: u64,
    memory_limit: u64,
}

impl Default for FakeContainer {
    fn default() -> Self {
        Self {
            status: ContainerStatus::Running,
            cpu_usage_total: 0.0,
            memory_usage: 0,
            memory_limit: 1,
        }
    }
}

/// An in-memory fleet of "containers" keyed by handle.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    containers: Mutex<HashMap<String, FakeContainer>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: force a container's reported status, simulating e.g. a
    /// crashed node container.
    pub fn set_status(&self, handle: &str, status: ContainerStatus) {
        if let Some(c) = self.containers.lock().expect("poisoned").get_mut(handle) {
            c.status = status;
        }
    }

    /// Test hook: force reported memory usage, simulating memory pressure.
    pub fn set_memory(&self, handle: &str, usage: u64, limit: u64) {
        if let Some(c) = self.containers.lock().expect("poisoned").get_mut(handle) {
            c.memory_usage = usage;
            c.memory_limit = limit;
        }
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    async fn launch_node(&self, _name: &str) -> Result<String, RuntimeError> {
        let handle = Uuid::new_v4().to_string();
        self.containers
            .lock()
            .expect("poisoned")
            .insert(handle.clone(), FakeContainer::default());
        Ok(handle)
    }

    async fn launch_pod(
        &self,
        _image: &str,
        _name: &str,
        _env: &[(String, String)],
        _ports: &PortMap,
    ) -> Result<String, RuntimeError> {
        let handle = Uuid::new_v4().to_string();
        self.containers
            .lock()
            .expect("poisoned")
            .insert(handle.clone(), FakeContainer::default());
        Ok(handle)
    }

    async fn stop(&self, handle: &str) -> Result<(), RuntimeError> {
        if let Some(c) = self.containers.lock().expect("poisoned").get_mut(handle) {
            c.status = ContainerStatus::Stopped;
        }
        Ok(())
    }

    async fn remove(&self, handle: &str) -> Result<(), RuntimeError> {
        self.containers.lock().expect("poisoned").remove(handle);
        Ok(())
    }

    async fn inspect(&self, handle: &str) -> Result<ContainerMetrics, RuntimeError> {
        let containers = self.containers.lock().expect("poisoned");
        let c = containers
            .get(handle)
            .ok_or_else(|| RuntimeError::NotFound(handle.to_string()))?;
        Ok(ContainerMetrics {
            status: c.status,
            cpu_usage_total: c.cpu_usage_total,
            memory_usage: c.memory_usage,
            memory_limit: c.memory_limit,
        })
    }

    async fn list_all(&self) -> Result<Vec<String>, RuntimeError> {
        Ok(self
            .containers
            .lock()
            .expect("poisoned")
            .keys()
            .cloned()
            .collect())
    }
}
