// ABOUTME: Lifecycle orchestrator: create, toggle, delete, snapshot, refresh, open terminal.
// ABOUTME: Every entry point is a failure boundary that reports through the presentation sink.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::Catalog;
use crate::directory::ContainerDirectory;
use crate::events::{LogEvent, PresentationSink};
use crate::runtime::{CommitOptions, ContainerConfig, ContainerFilters, ContainerState, FullRuntime};
use crate::snapshot::{Snapshot, SnapshotRegistry};
use crate::terminal::{TerminalLauncher, detect_shell};
use crate::types::{ContainerId, SnapshotId};

use super::error::{GatewayResultExt, LifecycleError};
use super::naming::resolve_name;
use super::request::{CreationDraft, CreationRequest, CreationSource};
use super::resolver;
use super::start::{StartPolicy, wait_until_running};
use super::toggle::{InFlight, TOGGLE_TITLE, ToggleHandle, ToggleState, run_toggle};
use super::workspace::Workspace;

/// Label put on every container this crate creates.
pub const MANAGED_LABEL: &str = "hangar.managed";

const CREATE_TITLE: &str = "Container Creation";
const DELETE_TITLE: &str = "Container Deletion";
const SNAPSHOT_TITLE: &str = "Snapshot";
const TERMINAL_TITLE: &str = "Terminal";
const START_TITLE: &str = "Container Start";
const REFRESH_TITLE: &str = "Refresh";

/// Tunables for lifecycle operations.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleSettings {
    pub start: StartPolicy,
    pub stop_timeout: Duration,
    /// Start and confirm new containers right after creating them.
    pub auto_start: bool,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            start: StartPolicy::default(),
            stop_timeout: Duration::from_secs(10),
            auto_start: false,
        }
    }
}

/// Drives containers through their lifecycle and keeps the directory current.
///
/// Methods taking `&mut self` (create, delete, refresh, settle) are meant for
/// the single control task; the directory is only written there. Toggles run
/// on spawned workers and report back through their [`ToggleHandle`].
pub struct Orchestrator<R> {
    runtime: Arc<R>,
    snapshots: Arc<SnapshotRegistry>,
    sink: Arc<dyn PresentationSink>,
    workspace: Workspace,
    settings: LifecycleSettings,
    directory: ContainerDirectory,
    in_flight: InFlight,
}

impl<R: FullRuntime + 'static> Orchestrator<R> {
    pub fn new(
        runtime: Arc<R>,
        sink: Arc<dyn PresentationSink>,
        workspace: Workspace,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            runtime,
            snapshots: Arc::new(SnapshotRegistry::new()),
            sink,
            workspace,
            settings,
            directory: ContainerDirectory::new(),
            in_flight: InFlight::default(),
        }
    }

    /// Share an existing snapshot registry instead of starting an empty one.
    pub fn with_snapshots(mut self, snapshots: Arc<SnapshotRegistry>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    pub fn directory(&self) -> &ContainerDirectory {
        &self.directory
    }

    pub fn snapshots(&self) -> &Arc<SnapshotRegistry> {
        &self.snapshots
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Whether a toggle for `id` is outstanding; its affordance should be disabled.
    pub fn is_toggling(&self, id: &ContainerId) -> bool {
        self.in_flight.contains(id)
    }

    fn display_name(&self, id: &ContainerId) -> String {
        self.directory
            .get(id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| id.short().to_string())
    }

    /// Create a container from `request`. Returns its id on success.
    pub async fn create(&mut self, request: CreationRequest) -> Option<ContainerId> {
        self.sink.emit_log(LogEvent::in_progress(
            CREATE_TITLE,
            progress_message(&request.source),
        ));

        let (id, name) = match self.try_create(request).await {
            Ok(created) => created,
            Err(e) => {
                tracing::debug!(error = %e, "create failed");
                self.sink.emit_log(LogEvent::error(
                    CREATE_TITLE,
                    format!("Error creating container: {}", e),
                ));
                return None;
            }
        };

        tracing::info!(container = %name, id = %id.short(), "created container");
        self.sink.emit_log(LogEvent::success(
            CREATE_TITLE,
            format!("Created container: {}", name),
        ));

        if self.settings.auto_start {
            match self.start_and_confirm(&id).await {
                Ok(()) => self.sink.emit_log(LogEvent::success(
                    START_TITLE,
                    format!("Started container: {}", name),
                )),
                Err(e) => self.sink.emit_log(LogEvent::error(
                    START_TITLE,
                    format!("Error starting container: {}", e),
                )),
            }
        }

        self.refresh().await;
        Some(id)
    }

    /// Validate a draft and create from it. An invalid draft is reported like
    /// any other creation failure.
    pub async fn create_from_draft(
        &mut self,
        draft: CreationDraft,
        catalog: &Catalog,
    ) -> Option<ContainerId> {
        match draft.into_request(catalog) {
            Ok(request) => self.create(request).await,
            Err(e) => {
                self.sink.emit_log(LogEvent::error(
                    CREATE_TITLE,
                    format!("Error creating container: {}", e),
                ));
                None
            }
        }
    }

    async fn try_create(
        &self,
        request: CreationRequest,
    ) -> Result<(ContainerId, String), LifecycleError> {
        let resolved = resolver::resolve(
            &request.source,
            &self.snapshots,
            self.runtime.as_ref(),
            &self.workspace,
        )
        .await?;

        let base = request
            .requested_name
            .map(|n| n.into_inner())
            .unwrap_or(resolved.base_name);
        let name = resolve_name(&base, &self.directory.names());

        self.workspace.ensure_container_dir(&name)?;

        let config = ContainerConfig {
            name: name.clone(),
            image: resolved.reference,
            tty: true,
            open_stdin: true,
            labels: HashMap::from([(MANAGED_LABEL.to_string(), "true".to_string())]),
            volumes: vec![self.workspace.mount_for(&name)],
            ..Default::default()
        };

        let id = self
            .runtime
            .create_container(&config)
            .await
            .during("create")?;
        Ok((id, name))
    }

    async fn start_and_confirm(&self, id: &ContainerId) -> Result<(), LifecycleError> {
        self.runtime.start_container(id).await.during("start")?;
        wait_until_running(self.runtime.as_ref(), id, &self.settings.start).await?;
        self.sink.update_status(id, ContainerState::Running);
        Ok(())
    }

    /// Start a stopped container or stop a running one, on a worker task.
    ///
    /// Returns `None` without touching the runtime when a toggle for `id` is
    /// still outstanding.
    pub fn toggle_run_state(&self, id: &ContainerId) -> Option<ToggleHandle> {
        let Some(guard) = self.in_flight.try_claim(id) else {
            tracing::warn!(container = %id.short(), "toggle already in progress; ignoring");
            return None;
        };

        let last_known = self.directory.get(id).map(|r| r.state);
        self.sink.emit_log(LogEvent::in_progress(
            TOGGLE_TITLE,
            format!("Toggling container state: {}", self.display_name(id)),
        ));

        let (tx, rx) = watch::channel(ToggleState::Pending);
        let runtime = Arc::clone(&self.runtime);
        let sink = Arc::clone(&self.sink);
        let stop_timeout = self.settings.stop_timeout;
        let worker_id = id.clone();

        tokio::spawn(async move {
            let outcome = run_toggle(
                runtime.as_ref(),
                sink.as_ref(),
                &worker_id,
                stop_timeout,
                last_known,
            )
            .await;
            // Re-enable before publishing so a waiter can toggle again at once.
            drop(guard);
            tx.send_replace(outcome);
        });

        Some(ToggleHandle::new(id.clone(), rx))
    }

    /// Wait for a toggle to finish, then refresh the directory.
    pub async fn settle(&mut self, handle: ToggleHandle) -> ToggleState {
        let state = handle.wait().await;
        self.refresh().await;
        state
    }

    /// Force-remove a container, running or not.
    pub async fn delete(&mut self, id: &ContainerId) -> bool {
        let name = self.display_name(id);
        match self.runtime.remove_container(id, true).await.during("remove") {
            Ok(()) => {
                tracing::info!(container = %name, "deleted container");
                self.sink.emit_log(LogEvent::success(
                    DELETE_TITLE,
                    format!("Deleted container: {}", name),
                ));
                self.refresh().await;
                true
            }
            Err(e) => {
                self.sink.emit_log(LogEvent::error(
                    DELETE_TITLE,
                    format!("Error deleting container: {}", e),
                ));
                false
            }
        }
    }

    /// Commit the container's filesystem as `repository` and record the snapshot.
    ///
    /// A blank repository is ignored: no runtime call, no log event.
    pub async fn snapshot(&self, id: &ContainerId, repository: &str) -> Option<SnapshotId> {
        let repository = repository.trim();
        if repository.is_empty() {
            tracing::debug!(container = %id.short(), "blank snapshot name; skipping");
            return None;
        }

        let name = self.display_name(id);
        let options = commit_options(repository);
        match self
            .runtime
            .commit_container(id, &options)
            .await
            .during("commit")
        {
            Ok(snapshot_id) => {
                self.snapshots
                    .put(Snapshot::new(snapshot_id.clone(), id.clone(), repository));
                tracing::info!(container = %name, snapshot = %snapshot_id.short(), "snapshot recorded");
                self.sink.emit_log(LogEvent::success(
                    SNAPSHOT_TITLE,
                    format!(
                        "Created snapshot for container: {} as image: {}",
                        name, repository
                    ),
                ));
                Some(snapshot_id)
            }
            Err(e) => {
                self.sink.emit_log(LogEvent::error(
                    SNAPSHOT_TITLE,
                    format!("Error creating snapshot: {}", e),
                ));
                None
            }
        }
    }

    /// Re-list every container and replace the directory.
    ///
    /// On failure the previous directory is kept.
    pub async fn refresh(&mut self) -> bool {
        match self
            .runtime
            .list_containers(&ContainerFilters::all())
            .await
            .during("list")
        {
            Ok(summaries) => {
                self.directory
                    .replace(summaries.into_iter().map(Into::into).collect());
                self.sink.replace_directory(self.directory.records());
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed; keeping previous directory");
                self.sink.emit_log(LogEvent::error(
                    REFRESH_TITLE,
                    format!("Error refreshing containers: {}", e),
                ));
                false
            }
        }
    }

    /// Make sure the container runs, then open a shell in it.
    ///
    /// The launcher is only called once the start has been confirmed.
    pub async fn open_terminal<L: TerminalLauncher + ?Sized>(
        &self,
        id: &ContainerId,
        launcher: &L,
    ) -> bool {
        match self.try_open_terminal(id, launcher).await {
            Ok(name) => {
                self.sink.emit_log(LogEvent::success(
                    TERMINAL_TITLE,
                    format!("Opened terminal for container: {}", name),
                ));
                true
            }
            Err(e) => {
                self.sink.emit_log(LogEvent::error(
                    TERMINAL_TITLE,
                    format!("Failed to open terminal: {}", e),
                ));
                false
            }
        }
    }

    async fn try_open_terminal<L: TerminalLauncher + ?Sized>(
        &self,
        id: &ContainerId,
        launcher: &L,
    ) -> Result<String, LifecycleError> {
        let _claim = self.in_flight.try_claim(id).ok_or_else(|| {
            LifecycleError::InvalidRequest("a start or stop is already in progress".to_string())
        })?;

        let info = self
            .runtime
            .inspect_container(id)
            .await
            .during("inspect")?;

        if !info.state.is_running() {
            self.start_and_confirm(id).await?;
            self.sink.emit_log(LogEvent::success(
                START_TITLE,
                format!("Started container: {}", info.name),
            ));
        }

        let shell = detect_shell(self.runtime.as_ref(), id).await;
        launcher.launch(id, &shell).await?;
        Ok(info.name)
    }
}

fn progress_message(source: &CreationSource) -> String {
    match source {
        CreationSource::Catalog { family, version } => {
            format!(
                "Pulling image: {}",
                resolver::catalog_reference(family, version)
            )
        }
        CreationSource::Custom { image_ref } => format!("Pulling image: {}", image_ref),
        CreationSource::Snapshot { snapshot_id } => {
            format!("Using snapshot: {}", snapshot_id.short())
        }
        CreationSource::Dockerfile { .. } => "Building image from Dockerfile".to_string(),
    }
}

/// Split `repo[:tag]`; a colon before the last `/` belongs to a registry port.
fn commit_options(repository: &str) -> CommitOptions {
    let mut options = CommitOptions::new(repository);
    if let Some((repo, tag)) = repository.rsplit_once(':')
        && !tag.contains('/')
        && !tag.is_empty()
    {
        options.repository = repo.to_string();
        options.tag = Some(tag.to_string());
    }
    options
}
