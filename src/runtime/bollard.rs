// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Talks to Docker or Podman through the Docker-compatible API.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    BuildSpec, CommitOptions, ContainerConfig, ContainerError, ContainerFilters, ContainerInfo,
    ContainerOps, ContainerState, ContainerSummary, ExecConfig, ExecError, ExecOps, ExecResult,
    ImageError, ImageOps, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::{RuntimeEndpoint, RuntimeType};
use crate::types::{ContainerId, ImageRef, SnapshotId};
use async_trait::async_trait;
use bollard::Docker;
use bollard::exec::StartExecOptions;
use bollard::models::{ContainerCreateBody, ContainerStateStatusEnum, HostConfig, Mount, MountTypeEnum};
use bollard::query_parameters::{
    BuildImageOptions, CommitContainerOptions, CreateContainerOptions, CreateImageOptions,
    InspectContainerOptions, ListContainersOptions, RemoveContainerOptions, StopContainerOptions,
};
use bytes::Bytes;
use futures::StreamExt;
use http_body_util::{Either, Full};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

fn map_image_pull_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(image_name.to_string())
        }
        _ => ImageError::PullFailed(format!("{}: {}", image_name, e)),
    }
}

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::ImageNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::AlreadyExists(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::AlreadyRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::NotRunning(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_exec_create_error(e: bollard::errors::Error) -> ExecError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ExecError::ContainerNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ExecError::ContainerNotRunning(message.clone()),
        _ => ExecError::Runtime(e.to_string()),
    }
}

fn map_exec_not_found_error(e: bollard::errors::Error) -> ExecError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ExecError::ExecNotFound(message.clone()),
        _ => ExecError::Runtime(e.to_string()),
    }
}

fn map_state(status: ContainerStateStatusEnum) -> ContainerState {
    match status {
        ContainerStateStatusEnum::CREATED => ContainerState::Created,
        ContainerStateStatusEnum::RUNNING => ContainerState::Running,
        ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
        ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
        ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
        ContainerStateStatusEnum::EXITED => ContainerState::Exited,
        ContainerStateStatusEnum::DEAD => ContainerState::Dead,
        _ => ContainerState::Exited,
    }
}

/// Exit code of a finished exec. A missing code counts as a failure.
fn reported_exit_code(code: Option<i64>) -> i64 {
    code.unwrap_or(-1)
}

/// Tar a directory so it can be sent as a build context.
fn archive_context(dir: &Path) -> std::io::Result<Vec<u8>> {
    let mut ar = tar::Builder::new(Vec::new());
    ar.follow_symlinks(false);
    ar.append_dir_all(".", dir)?;
    ar.into_inner()
}

/// Container runtime implementation using bollard.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
    socket_path: Option<String>,
}

impl BollardRuntime {
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
            socket_path: None,
        }
    }

    /// Open a client on the endpoint's unix socket.
    ///
    /// No request is made; call [`RuntimeInfo::ping`] to check reachability.
    pub fn connect(endpoint: &RuntimeEndpoint) -> Result<Self, RuntimeInfoError> {
        let client =
            Docker::connect_with_unix(&endpoint.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeInfoError::Unreachable(e.to_string()))?;
        Ok(Self {
            socket_path: Some(endpoint.socket_path.clone()),
            ..Self::new(client, endpoint.runtime_type)
        })
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    /// Socket the client was opened on, if it came from [`BollardRuntime::connect`].
    pub fn socket_path(&self) -> Option<&str> {
        self.socket_path.as_deref()
    }

    /// Execute in detached mode and poll for completion.
    ///
    /// Podman's attached exec streams do not always close, so output is not captured.
    async fn exec_start_detached(&self, exec_id: &str) -> Result<ExecResult, ExecError> {
        let opts = StartExecOptions {
            detach: true,
            ..Default::default()
        };

        self.client
            .start_exec(exec_id, Some(opts))
            .await
            .map_err(map_exec_not_found_error)?;

        let poll_interval = Duration::from_millis(100);
        let max_wait = Duration::from_secs(60);
        let start = std::time::Instant::now();

        loop {
            let (running, exit_code) = self.exec_status(exec_id).await?;
            if !running {
                return Ok(ExecResult {
                    exit_code: reported_exit_code(exit_code),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                });
            }

            if start.elapsed() > max_wait {
                return Err(ExecError::Failed("exec timed out".to_string()));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn exec_status(&self, exec_id: &str) -> Result<(bool, Option<i64>), ExecError> {
        let details = self
            .client
            .inspect_exec(exec_id)
            .await
            .map_err(map_exec_not_found_error)?;
        Ok((details.running.unwrap_or(false), details.exit_code))
    }
}

/// Detect the local runtime, connect, and check it answers.
pub async fn connect_local(
    config: Option<&super::RuntimeConfig>,
) -> Result<BollardRuntime, super::RuntimeError> {
    let endpoint = super::detect_local(config)?;
    tracing::debug!(
        runtime = %endpoint.runtime_type,
        socket = %endpoint.socket_path,
        "connecting to container runtime"
    );
    let runtime = BollardRuntime::connect(&endpoint)?;
    runtime.ping().await?;
    Ok(runtime)
}

impl Sealed for BollardRuntime {}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::Api(e.to_string()))?;

        Ok(RuntimeMetadata {
            name: self.runtime_type.to_string(),
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::Unreachable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image_name = reference.to_string();

        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        // Progress stream; an error anywhere fails the pull.
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| map_image_pull_error(e, &image_name))?;
        }

        Ok(())
    }

    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        let image_name = reference.to_string();

        match self.client.inspect_image(&image_name).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(ImageError::Runtime(format!(
                "failed to inspect {}: {}",
                image_name, e
            ))),
        }
    }

    async fn build_image(&self, spec: &BuildSpec) -> Result<String, ImageError> {
        let context = spec.context.clone();
        let tar_data = tokio::task::spawn_blocking(move || archive_context(&context))
            .await
            .map_err(|e| ImageError::BuildFailed(e.to_string()))?
            .map_err(|e| {
                ImageError::BuildFailed(format!(
                    "cannot archive {}: {}",
                    spec.context.display(),
                    e
                ))
            })?;

        let options = BuildImageOptions {
            dockerfile: spec.dockerfile.clone(),
            t: Some(spec.tag.clone()),
            rm: true,
            ..Default::default()
        };

        let body = Either::Left(Full::new(Bytes::from(tar_data)));
        let mut build_stream = self.client.build_image(options, None, Some(body));

        while let Some(result) = build_stream.next().await {
            match result {
                Ok(output) => {
                    if let Some(error_detail) = output.error_detail {
                        let message = error_detail
                            .message
                            .unwrap_or_else(|| "unknown build error".to_string());
                        return Err(ImageError::BuildFailed(message));
                    }
                    if let Some(line) = output.stream {
                        let line = line.trim_end();
                        if !line.is_empty() {
                            tracing::debug!(target: "hangar::build", "{}", line);
                        }
                    }
                }
                Err(e) => return Err(ImageError::BuildFailed(e.to_string())),
            }
        }

        Ok(spec.tag.clone())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let mounts: Vec<Mount> = config
            .volumes
            .iter()
            .map(|m| Mount {
                source: Some(m.source.clone()),
                target: Some(m.target.clone()),
                typ: Some(MountTypeEnum::BIND),
                read_only: Some(m.read_only),
                ..Default::default()
            })
            .collect();

        let host_config = HostConfig {
            mounts: if mounts.is_empty() { None } else { Some(mounts) },
            ..Default::default()
        };

        let container_config = ContainerCreateBody {
            image: Some(config.image.clone()),
            tty: Some(config.tty),
            open_stdin: Some(config.open_stdin),
            labels: if config.labels.is_empty() {
                None
            } else {
                Some(config.labels.clone())
            },
            cmd: config.command.clone(),
            working_dir: config.working_dir.clone(),
            host_config: Some(host_config),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: Some(config.name.clone()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), container_config)
            .await
            .map_err(map_container_create_error)?;

        for warning in &response.warnings {
            tracing::warn!(container = %config.name, "{}", warning);
        }

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(
                id.as_str(),
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .map_err(map_container_start_error)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(map_state)
            .unwrap_or(ContainerState::Exited);

        Ok(ContainerInfo {
            id: ContainerId::new(details.id.clone().unwrap_or_else(|| id.to_string())),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: details
                .config
                .as_ref()
                .and_then(|c| c.image.clone())
                .unwrap_or_default(),
            state,
            created: details.created.map(|dt| dt.to_string()).unwrap_or_default(),
            labels: details.config.and_then(|c| c.labels).unwrap_or_default(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();

        if let Some(ref name) = filters.name {
            filter_map.insert("name".to_string(), vec![name.clone()]);
        }

        for (key, value) in &filters.labels {
            filter_map
                .entry("label".to_string())
                .or_default()
                .push(format!("{}={}", key, value));
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: if filter_map.is_empty() {
                None
            } else {
                Some(filter_map)
            },
            ..Default::default()
        };

        // Podman can report "stopping", which bollard fails to deserialize.
        // The state is transient, so retry a couple of times.
        let mut last_error = None;
        for attempt in 0..3 {
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => {
                    return Ok(containers
                        .into_iter()
                        .map(|c| {
                            let name = c
                                .names
                                .unwrap_or_default()
                                .first()
                                .map(|n| n.trim_start_matches('/').to_string())
                                .unwrap_or_default();

                            let state = c
                                .state
                                .map(|s| format!("{:?}", s))
                                .and_then(|s| s.parse().ok())
                                .unwrap_or(ContainerState::Exited);

                            ContainerSummary {
                                id: ContainerId::new(c.id.unwrap_or_default()),
                                name,
                                image: c.image.unwrap_or_default(),
                                state,
                                status: c.status.unwrap_or_default(),
                                labels: c.labels.unwrap_or_default(),
                            }
                        })
                        .collect());
                }
                Err(e) => {
                    let err_str = e.to_string();
                    if (err_str.contains("unknown variant `stopping`")
                        || err_str.contains("unknown variant `stopped`"))
                        && attempt < 2
                    {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        last_error = Some(err_str);
                        continue;
                    }
                    return Err(ContainerError::Runtime(err_str));
                }
            }
        }

        Err(ContainerError::Runtime(
            last_error.unwrap_or_else(|| "list_containers failed".to_string()),
        ))
    }

    async fn commit_container(
        &self,
        id: &ContainerId,
        options: &CommitOptions,
    ) -> Result<SnapshotId, ContainerError> {
        let opts = CommitContainerOptions {
            container: Some(id.to_string()),
            repo: Some(options.repository.clone()),
            tag: options.tag.clone(),
            comment: options.comment.clone(),
            pause: options.pause,
            ..Default::default()
        };

        let response = self
            .client
            .commit_container(opts, bollard::models::ContainerConfig::default())
            .await
            .map_err(map_container_not_found_error)?;

        Ok(SnapshotId::new(response.id))
    }
}

#[async_trait]
impl ExecOps for BollardRuntime {
    async fn exec(
        &self,
        container: &ContainerId,
        config: &ExecConfig,
    ) -> Result<ExecResult, ExecError> {
        let opts = bollard::models::ExecConfig {
            cmd: Some(config.cmd.clone()),
            env: if config.env.is_empty() {
                None
            } else {
                Some(config.env.clone())
            },
            working_dir: config.working_dir.clone(),
            user: config.user.clone(),
            attach_stdout: Some(config.attach_stdout),
            attach_stderr: Some(config.attach_stderr),
            tty: Some(config.tty),
            ..Default::default()
        };

        let exec_id = self
            .client
            .create_exec(container.as_str(), opts)
            .await
            .map_err(map_exec_create_error)?
            .id;

        if self.runtime_type == RuntimeType::Podman {
            return self.exec_start_detached(&exec_id).await;
        }

        let opts = StartExecOptions {
            detach: false,
            ..Default::default()
        };

        let result = self
            .client
            .start_exec(&exec_id, Some(opts))
            .await
            .map_err(map_exec_not_found_error)?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        if let bollard::exec::StartExecResults::Attached { mut output, .. } = result {
            while let Some(item) = output.next().await {
                match item {
                    Ok(bollard::container::LogOutput::StdOut { message }) => {
                        stdout.extend(message);
                    }
                    Ok(bollard::container::LogOutput::StdErr { message }) => {
                        stderr.extend(message);
                    }
                    Ok(_) => {}
                    Err(e) => return Err(ExecError::Failed(e.to_string())),
                }
            }
        }

        let (_, exit_code) = self.exec_status(&exec_id).await?;

        Ok(ExecResult {
            exit_code: reported_exit_code(exit_code),
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(status_code: u16) -> bollard::errors::Error {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn create_conflict_maps_to_already_exists() {
        let err = map_container_create_error(server_error(409));
        assert!(matches!(err, ContainerError::AlreadyExists(_)));
    }

    #[test]
    fn create_missing_image_maps_to_image_not_found() {
        let err = map_container_create_error(server_error(404));
        assert!(matches!(err, ContainerError::ImageNotFound(_)));
    }

    #[test]
    fn stop_not_modified_maps_to_not_running() {
        let err = map_container_stop_error(server_error(304));
        assert!(matches!(err, ContainerError::NotRunning(_)));
    }

    #[test]
    fn start_not_modified_maps_to_already_running() {
        let err = map_container_start_error(server_error(304));
        assert!(matches!(err, ContainerError::AlreadyRunning(_)));
    }

    #[test]
    fn other_status_maps_to_runtime() {
        let err = map_container_not_found_error(server_error(500));
        assert!(matches!(err, ContainerError::Runtime(_)));
    }

    #[test]
    fn missing_exit_code_is_not_success() {
        assert_eq!(reported_exit_code(Some(0)), 0);
        assert_eq!(reported_exit_code(Some(127)), 127);
        assert_ne!(reported_exit_code(None), 0);
    }

    #[test]
    fn archive_context_includes_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/app.sh"), "echo hi\n").unwrap();

        let data = archive_context(dir.path()).unwrap();
        let mut archive = tar::Archive::new(data.as_slice());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();

        assert!(names.iter().any(|n| n.ends_with("Dockerfile")));
        assert!(names.iter().any(|n| n.ends_with("src/app.sh")));
    }
}
