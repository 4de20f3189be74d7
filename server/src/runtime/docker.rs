//! Bollard-backed `Runtime` implementation, talking to the local Docker
//! daemon. Modeled on the teacher's `DockerManager`.

use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions, StatsOptions, StopContainerOptions,
};
use bollard::secret::{ContainerCreateBody, ContainerStateStatusEnum, PortBinding};
use dashmap_free::ImagesSeen;
use futures::TryStreamExt;
use std::collections::HashMap;

use super::{ContainerMetrics, ContainerStatus, PortMap, Runtime, RuntimeError};

/// Tiny stand-in for a concurrent set, so we don't pull in a crate just to
/// remember which images have already been pulled.
mod dashmap_free {
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct ImagesSeen(Mutex<HashSet<String>>);

    impl ImagesSeen {
        pub fn contains(&self, image: &str) -> bool {
            self.0.lock().expect("images lock poisoned").contains(image)
        }

        pub fn mark(&self, image: String) {
            self.0.lock().expect("images lock poisoned").insert(image);
        }
    }
}

#[derive(Debug)]
pub struct DockerRuntime {
    client: Docker,
    images_pulled: ImagesSeen,
}

const IDLE_IMAGE: &str = "alpine:latest";

impl DockerRuntime {
    pub fn connect() -> Result<Self, RuntimeError> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            images_pulled: ImagesSeen::default(),
        })
    }

    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        if self.images_pulled.contains(image) {
            return Ok(());
        }

        let options = Some(CreateImageOptions {
            from_image: Some(image.to_string()),
            ..Default::default()
        });

        let mut stream = self.client.create_image(options, None, None);
        tracing::debug!(%image, "pulling image");
        while stream
            .try_next()
            .await
            .map_err(|e| RuntimeError::ImagePull(e.to_string()))?
            .is_some()
        {}

        self.images_pulled.mark(image.to_string());
        Ok(())
    }

    fn map_status(status: Option<ContainerStateStatusEnum>) -> ContainerStatus {
        match status {
            Some(ContainerStateStatusEnum::RUNNING) => ContainerStatus::Running,
            Some(ContainerStateStatusEnum::EXITED)
            | Some(ContainerStateStatusEnum::DEAD)
            | Some(ContainerStateStatusEnum::REMOVING) => ContainerStatus::Stopped,
            _ => ContainerStatus::Unknown,
        }
    }

    fn map_not_found(err: bollard::errors::Error, handle: &str) -> RuntimeError {
        match &err {
            bollard::errors::Error::DockerResponseServerError { status_code, .. }
                if *status_code == 404 =>
            {
                RuntimeError::NotFound(handle.to_string())
            }
            _ => RuntimeError::Api(err.to_string()),
        }
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    async fn launch_node(&self, name: &str) -> Result<String, RuntimeError> {
        self.ensure_image(IDLE_IMAGE).await?;

        let config = ContainerCreateBody {
            image: Some(IDLE_IMAGE.to_string()),
            cmd: Some(vec![
                "tail".to_string(),
                "-f".to_string(),
                "/dev/null".to_string(),
            ]),
            ..Default::default()
        };

        let options = Some(CreateContainerOptions {
            name: Some(name.to_string()),
            platform: None,
        });

        let container = self
            .client
            .create_container(options, config)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;

        self.client
            .start_container(&container.id, None::<StartContainerOptions>)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;

        tracing::info!(%name, id=%container.id, "launched node container");
        Ok(container.id)
    }

    async fn launch_pod(
        &self,
        image: &str,
        name: &str,
        env: &[(String, String)],
        ports: &PortMap,
    ) -> Result<String, RuntimeError> {
        self.ensure_image(image).await?;

        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();
        for (container_port, host_port) in ports {
            let key = format!("{}/tcp", container_port);
            exposed_ports.insert(key.clone(), HashMap::new());
            port_bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(host_port.to_string()),
                }]),
            );
        }

        let config = ContainerCreateBody {
            image: Some(image.to_string()),
            env: Some(
                env.iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect(),
            ),
            exposed_ports: Some(exposed_ports),
            host_config: Some(bollard::models::HostConfig {
                port_bindings: Some(port_bindings),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = Some(CreateContainerOptions {
            name: Some(name.to_string()),
            platform: None,
        });

        let container = self
            .client
            .create_container(options, config)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;

        self.client
            .start_container(&container.id, None::<StartContainerOptions>)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;

        tracing::info!(%name, id=%container.id, "launched pod container");
        Ok(container.id)
    }

    async fn stop(&self, handle: &str) -> Result<(), RuntimeError> {
        match self
            .client
            .stop_container(handle, None::<StopContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => match Self::map_not_found(e, handle) {
                RuntimeError::NotFound(_) => Ok(()),
                other => Err(other),
            },
        }
    }

    async fn remove(&self, handle: &str) -> Result<(), RuntimeError> {
        match self
            .client
            .remove_container(handle, None::<RemoveContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => match Self::map_not_found(e, handle) {
                RuntimeError::NotFound(_) => Ok(()),
                other => Err(other),
            },
        }
    }

    async fn inspect(&self, handle: &str) -> Result<ContainerMetrics, RuntimeError> {
        let inspection = self
            .client
            .inspect_container(handle, None::<InspectContainerOptions>)
            .await
            .map_err(|e| Self::map_not_found(e, handle))?;

        let status = Self::map_status(inspection.state.as_ref().and_then(|s| s.status.clone()));

        let mut stats_stream = self.client.stats(
            handle,
            Some(StatsOptions {
                stream: false,
                ..Default::default()
            }),
        );

        let (cpu_usage_total, memory_usage, memory_limit) =
            match stats_stream.try_next().await {
                Ok(Some(stats)) => (
                    stats
                        .cpu_stats
                        .as_ref()
                        .and_then(|c| c.cpu_usage.as_ref())
                        .and_then(|u| u.total_usage)
                        .unwrap_or(0) as f64,
                    stats
                        .memory_stats
                        .as_ref()
                        .and_then(|m| m.usage)
                        .unwrap_or(0),
                    stats
                        .memory_stats
                        .as_ref()
                        .and_then(|m| m.limit)
                        .unwrap_or(1),
                ),
                _ => (0.0, 0, 1),
            };

        Ok(ContainerMetrics {
            status,
            cpu_usage_total,
            memory_usage,
            memory_limit,
        })
    }

    async fn list_all(&self) -> Result<Vec<String>, RuntimeError> {
        let containers = self
            .client
            .list_containers(Some(ListContainersOptions {
                all: true,
                ..Default::default()
            }))
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;

        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }
}
