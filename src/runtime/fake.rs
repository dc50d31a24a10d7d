// ABOUTME: In-memory runtime used by unit tests.
// ABOUTME: Records every gateway call and supports failure injection and held operations.

use super::traits::sealed::Sealed;
use super::traits::{
    BuildSpec, CommitOptions, ContainerConfig, ContainerError, ContainerFilters, ContainerInfo,
    ContainerOps, ContainerState, ContainerSummary, ExecConfig, ExecError, ExecOps, ExecResult,
    ImageError, ImageOps, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::types::{ContainerId, ImageRef, SnapshotId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// A gateway call as seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Pull(String),
    Build { tag: String, dockerfile: String },
    Create(String),
    Start(String),
    Stop(String),
    Remove(String),
    Inspect(String),
    List,
    Commit { container: String, repository: String },
    Exec(String, Vec<String>),
}

#[derive(Debug, Clone)]
pub(crate) struct FakeContainer {
    pub name: String,
    pub image: String,
    pub state: ContainerState,
}

#[derive(Default)]
struct Inner {
    containers: Vec<(ContainerId, FakeContainer)>,
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    shells: HashSet<String>,
    local_images: HashSet<String>,
    last_create: Option<ContainerConfig>,
    last_build_dockerfile: Option<String>,
    // Inspects a started container must see before it reports Running.
    start_delay_polls: Option<u32>,
    pending_polls: HashMap<ContainerId, u32>,
    next_id: u32,
}

#[derive(Default)]
pub(crate) struct FakeRuntime {
    inner: Mutex<Inner>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, id: &str, name: &str, image: &str, state: ContainerState) -> Self {
        self.inner.lock().containers.push((
            ContainerId::new(id),
            FakeContainer {
                name: name.to_string(),
                image: image.to_string(),
                state,
            },
        ));
        self
    }

    /// Make the named operation ("pull", "build", "create", "start", "stop",
    /// "remove", "inspect", "list", "commit", "exec") fail.
    pub fn fail(&self, operation: &'static str) {
        self.inner.lock().failing.insert(operation);
    }

    /// Shell paths the `test -f` probe will find.
    pub fn with_shells(self, shells: &[&str]) -> Self {
        self.inner
            .lock()
            .shells
            .extend(shells.iter().map(|s| s.to_string()));
        self
    }

    /// Images `image_exists` reports as present.
    pub fn with_local_image(self, reference: &str) -> Self {
        self.inner.lock().local_images.insert(reference.to_string());
        self
    }

    /// Started containers stay `Created` for `polls` inspections. `u32::MAX` never runs.
    pub fn start_delay(&self, polls: u32) {
        self.inner.lock().start_delay_polls = Some(polls);
    }

    /// Block start and stop until the returned handle is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock() = Some(notify.clone());
        notify
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn last_create(&self) -> Option<ContainerConfig> {
        self.inner.lock().last_create.clone()
    }

    pub fn last_build_dockerfile(&self) -> Option<String> {
        self.inner.lock().last_build_dockerfile.clone()
    }

    pub fn state_of(&self, id: &str) -> Option<ContainerState> {
        self.inner
            .lock()
            .containers
            .iter()
            .find(|(cid, _)| cid.as_str() == id)
            .map(|(_, c)| c.state)
    }

    pub fn set_state(&self, id: &str, state: ContainerState) {
        if let Some((_, c)) = self
            .inner
            .lock()
            .containers
            .iter_mut()
            .find(|(cid, _)| cid.as_str() == id)
        {
            c.state = state;
        }
    }

    fn record(&self, call: Call, operation: &'static str) -> Result<(), String> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        if inner.failing.contains(operation) {
            Err(format!("injected {} failure", operation))
        } else {
            Ok(())
        }
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

impl Sealed for FakeRuntime {}

#[async_trait]
impl RuntimeInfo for FakeRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        Ok(RuntimeMetadata {
            name: "fake".to_string(),
            version: "0".to_string(),
            api_version: "0".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        Ok(())
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        self.record(Call::Pull(reference.to_string()), "pull")
            .map_err(ImageError::PullFailed)
    }

    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        Ok(self.inner.lock().local_images.contains(&reference.to_string()))
    }

    async fn build_image(&self, spec: &BuildSpec) -> Result<String, ImageError> {
        self.record(
            Call::Build {
                tag: spec.tag.clone(),
                dockerfile: spec.dockerfile.clone(),
            },
            "build",
        )
        .map_err(ImageError::BuildFailed)?;
        let contents = std::fs::read_to_string(spec.context.join(&spec.dockerfile))
            .map_err(|e| ImageError::BuildFailed(e.to_string()))?;
        self.inner.lock().last_build_dockerfile = Some(contents);
        Ok(spec.tag.clone())
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        self.record(Call::Create(config.name.clone()), "create")
            .map_err(ContainerError::Runtime)?;
        let mut inner = self.inner.lock();
        if inner.containers.iter().any(|(_, c)| c.name == config.name) {
            return Err(ContainerError::AlreadyExists(config.name.clone()));
        }
        inner.next_id += 1;
        let id = ContainerId::new(format!("fake{:04}", inner.next_id));
        inner.containers.push((
            id.clone(),
            FakeContainer {
                name: config.name.clone(),
                image: config.image.clone(),
                state: ContainerState::Created,
            },
        ));
        inner.last_create = Some(config.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.wait_gate().await;
        self.record(Call::Start(id.to_string()), "start")
            .map_err(ContainerError::Runtime)?;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let delay = inner.start_delay_polls;
        let container = inner
            .containers
            .iter_mut()
            .find(|(cid, _)| cid == id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        match delay {
            Some(polls) => {
                container.1.state = ContainerState::Created;
                inner.pending_polls.insert(id.clone(), polls);
            }
            None => container.1.state = ContainerState::Running,
        }
        Ok(())
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        self.wait_gate().await;
        self.record(Call::Stop(id.to_string()), "stop")
            .map_err(ContainerError::Runtime)?;
        let mut inner = self.inner.lock();
        let container = inner
            .containers
            .iter_mut()
            .find(|(cid, _)| cid == id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        container.1.state = ContainerState::Exited;
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        self.record(Call::Remove(id.to_string()), "remove")
            .map_err(ContainerError::Runtime)?;
        let mut inner = self.inner.lock();
        let before = inner.containers.len();
        inner.containers.retain(|(cid, _)| cid != id);
        if inner.containers.len() == before {
            return Err(ContainerError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        self.record(Call::Inspect(id.to_string()), "inspect")
            .map_err(ContainerError::Runtime)?;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let Some(remaining) = inner.pending_polls.get_mut(id) {
            if *remaining == 0 {
                inner.pending_polls.remove(id);
                if let Some((_, c)) = inner.containers.iter_mut().find(|(cid, _)| cid == id) {
                    c.state = ContainerState::Running;
                }
            } else {
                *remaining -= 1;
            }
        }
        let (cid, c) = inner
            .containers
            .iter()
            .find(|(cid, _)| cid == id || cid.short() == id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        Ok(ContainerInfo {
            id: cid.clone(),
            name: c.name.clone(),
            image: c.image.clone(),
            state: c.state,
            created: String::new(),
            labels: HashMap::new(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        self.record(Call::List, "list")
            .map_err(ContainerError::Runtime)?;
        Ok(self
            .inner
            .lock()
            .containers
            .iter()
            .filter(|(_, c)| filters.all || c.state.is_running())
            .map(|(id, c)| ContainerSummary {
                id: id.clone(),
                name: c.name.clone(),
                image: c.image.clone(),
                state: c.state,
                status: c.state.to_string(),
                labels: HashMap::new(),
            })
            .collect())
    }

    async fn commit_container(
        &self,
        id: &ContainerId,
        options: &CommitOptions,
    ) -> Result<SnapshotId, ContainerError> {
        self.record(
            Call::Commit {
                container: id.to_string(),
                repository: options.repository.clone(),
            },
            "commit",
        )
        .map_err(ContainerError::Runtime)?;
        let n = self.count(|c| matches!(c, Call::Commit { .. }));
        Ok(SnapshotId::new(format!("sha256:{:064x}", n)))
    }
}

#[async_trait]
impl ExecOps for FakeRuntime {
    async fn exec(
        &self,
        container: &ContainerId,
        config: &ExecConfig,
    ) -> Result<ExecResult, ExecError> {
        self.record(Call::Exec(container.to_string(), config.cmd.clone()), "exec")
            .map_err(ExecError::Failed)?;
        let found = match config.cmd.as_slice() {
            [test, flag, path] if test == "test" && flag == "-f" => {
                self.inner.lock().shells.contains(path)
            }
            _ => true,
        };
        Ok(ExecResult {
            exit_code: if found { 0 } else { 1 },
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}
