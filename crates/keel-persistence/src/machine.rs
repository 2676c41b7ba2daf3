//! The persistence machine: the single owner of session state.
//!
//! A [`PersistenceMachine`] is a cheap, cloneable handle to an actor task.
//! Every operation becomes a [`Command`] on one queue, so operations run
//! strictly in the order they were issued and never interleave. The actor
//! waits on that queue and on the throttle deadline at the same time:
//!
//! ```text
//! handle.save(.., Throttle) --+
//! handle.load(id) ------------+--> mpsc queue --> actor loop --> LocalBackend
//! handle.fork() --------------+                     |        --> RemoteBackend
//!                                  throttle deadline+
//! ```
//!
//! Writes go to the local backend while logged out and to the remote
//! backend while logged in. Asset downloads for forks always read from the
//! remote backend, where payload-less assets live.

use std::sync::Arc;
use std::time::Duration;

use keel_store::{FileLocalStore, HttpRemoteStore};
use keel_types::{
    BackendKind, LocalProjectSummary, PersistenceAction, PersistentModel, ProjectId, SaveMode,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{LoadedProject, LocalBackend, PersistenceBackend, RemoteBackend};
use crate::config::KeelConfig;
use crate::error::PersistenceError;
use crate::events::PersistenceEvents;
use crate::fork::sync_fork_assets;
use crate::throttle::{PendingSave, ThrottleScheduler};

/// Commands buffered before callers start waiting for queue space.
const COMMAND_BUFFER: usize = 64;

/// Start-up settings for a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineSettings {
    /// Throttle window for non-forced saves.
    pub save_throttle: Duration,
    /// Whether the session starts logged in.
    pub authenticated: bool,
}

impl MachineSettings {
    /// Settings from configuration. Sessions with a user token start
    /// logged in.
    pub const fn from_config(config: &KeelConfig) -> Self {
        Self {
            save_throttle: config.persistence.save_throttle(),
            authenticated: config.remote.user_token.is_some(),
        }
    }
}

/// Result of [`PersistenceMachine::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The project was found and is now current.
    Loaded {
        /// Which store the project was read from.
        source: BackendKind,
    },
    /// Neither store holds the project. The current project is unchanged.
    NotFound,
}

/// A read-only view of the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Whether the session is logged in.
    pub authenticated: bool,
    /// The project saves currently target.
    pub current_project_id: Option<ProjectId>,
    /// Whether a throttled save is pending.
    pub throttle_armed: bool,
}

type Reply<T> = oneshot::Sender<Result<T, PersistenceError>>;

enum Command {
    CreateNew {
        name: String,
        model: PersistentModel,
        reply: Reply<ProjectId>,
    },
    Save {
        name: String,
        model: PersistentModel,
        mode: SaveMode,
        reply: Reply<()>,
    },
    Load {
        id: ProjectId,
        reply: Reply<LoadOutcome>,
    },
    Fork {
        reply: Reply<ProjectId>,
    },
    Login {
        reply: Reply<()>,
    },
    Logout {
        reply: Reply<()>,
    },
    SendThrottledSave {
        reply: Reply<()>,
    },
    LocalProjects {
        reply: Reply<Vec<LocalProjectSummary>>,
    },
    Session {
        reply: Reply<SessionSnapshot>,
    },
    Stop {
        reply: Reply<()>,
    },
}

/// Handle to a running persistence machine.
///
/// Clones talk to the same machine. Once [`stop`](Self::stop) has run,
/// every call fails with [`PersistenceError::Stopped`].
#[derive(Debug, Clone)]
pub struct PersistenceMachine {
    commands: mpsc::Sender<Command>,
}

impl PersistenceMachine {
    /// Start a machine on the current Tokio runtime.
    pub fn spawn(
        local: LocalBackend,
        remote: RemoteBackend,
        events: Arc<dyn PersistenceEvents>,
        settings: MachineSettings,
    ) -> Self {
        let (commands, queue) = mpsc::channel(COMMAND_BUFFER);
        let actor = MachineActor::new(local, remote, events, settings);
        tokio::spawn(actor.run(queue));
        Self { commands }
    }

    /// Start a machine backed by the file store and HTTP client named in
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Store`] if the local directory cannot be
    /// created or the HTTP client cannot be built.
    pub async fn from_config(
        config: &KeelConfig,
        events: Arc<dyn PersistenceEvents>,
    ) -> Result<Self, PersistenceError> {
        let local = FileLocalStore::open(&config.local.directory).await?;
        let remote = HttpRemoteStore::new(
            &config.remote.base_url,
            config.remote.user_token.clone(),
            config.remote.request_timeout(),
        )?;
        Ok(Self::spawn(
            LocalBackend::new(Arc::new(local)),
            RemoteBackend::new(Arc::new(remote)),
            events,
            MachineSettings::from_config(config),
        ))
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, PersistenceError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_closed| PersistenceError::Stopped)?;
        response.await.map_err(|_dropped| PersistenceError::Stopped)?
    }

    /// Create a project, store its first revision and make it current.
    ///
    /// The id comes from the remote store when logged in and from the
    /// local id generator otherwise.
    pub async fn create_new(
        &self,
        name: impl Into<String>,
        model: PersistentModel,
    ) -> Result<ProjectId, PersistenceError> {
        let name = name.into();
        self.request(|reply| Command::CreateNew { name, model, reply })
            .await
    }

    /// Save a revision of the current project.
    ///
    /// [`SaveMode::Force`] writes immediately and discards any pending
    /// throttled save. [`SaveMode::Throttle`] returns once the save is
    /// queued; the write happens when the throttle window closes.
    pub async fn save(
        &self,
        name: impl Into<String>,
        model: PersistentModel,
        mode: SaveMode,
    ) -> Result<(), PersistenceError> {
        let name = name.into();
        self.request(|reply| Command::Save {
            name,
            model,
            mode,
            reply,
        })
        .await
    }

    /// Load a project, preferring a local record over the remote copy.
    pub async fn load(&self, id: ProjectId) -> Result<LoadOutcome, PersistenceError> {
        self.request(|reply| Command::Load { id, reply }).await
    }

    /// Copy the current project under a new id and make the copy current.
    pub async fn fork(&self) -> Result<ProjectId, PersistenceError> {
        self.request(|reply| Command::Fork { reply }).await
    }

    /// Switch to remote storage, moving a locally stored current project
    /// to the remote store.
    pub async fn login(&self) -> Result<(), PersistenceError> {
        self.request(|reply| Command::Login { reply }).await
    }

    /// Switch to local storage.
    pub async fn logout(&self) -> Result<(), PersistenceError> {
        self.request(|reply| Command::Logout { reply }).await
    }

    /// Write the pending throttled save now, if there is one.
    pub async fn send_throttled_save(&self) -> Result<(), PersistenceError> {
        self.request(|reply| Command::SendThrottledSave { reply })
            .await
    }

    /// Summaries of the projects held in the local store.
    pub async fn local_projects(&self) -> Result<Vec<LocalProjectSummary>, PersistenceError> {
        self.request(|reply| Command::LocalProjects { reply }).await
    }

    /// The current session state.
    pub async fn session(&self) -> Result<SessionSnapshot, PersistenceError> {
        self.request(|reply| Command::Session { reply }).await
    }

    /// Discard any pending throttled save and shut the machine down.
    ///
    /// Stopping an already stopped machine does nothing.
    pub async fn stop(&self) {
        if self.request(|reply| Command::Stop { reply }).await.is_err() {
            debug!("Persistence machine already stopped");
        }
    }
}

struct CurrentProject {
    id: ProjectId,
    name: String,
    /// Latest revision handed to the machine, saved or not.
    model: PersistentModel,
    /// A local record is still on disk after a failed move to remote
    /// storage and goes once a remote write succeeds.
    local_pending: bool,
}

struct SessionState {
    authenticated: bool,
    current: Option<CurrentProject>,
    throttle: ThrottleScheduler,
}

struct MachineActor {
    local: LocalBackend,
    remote: RemoteBackend,
    events: Arc<dyn PersistenceEvents>,
    state: SessionState,
}

fn saved(id: &ProjectId, target: BackendKind) -> PersistenceAction {
    PersistenceAction::SaveCompleted {
        id: id.clone(),
        target,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn ensure_owner(
    backend: &dyn PersistenceBackend,
    id: &ProjectId,
) -> Result<(), PersistenceError> {
    if backend.check_ownership(id).await? {
        return Ok(());
    }
    warn!(
        project_id = %id,
        backend = %backend.kind(),
        "Refusing write to project owned by another user"
    );
    Err(PersistenceError::NotOwner {
        project_id: id.clone(),
    })
}

impl MachineActor {
    fn new(
        local: LocalBackend,
        remote: RemoteBackend,
        events: Arc<dyn PersistenceEvents>,
        settings: MachineSettings,
    ) -> Self {
        Self {
            local,
            remote,
            events,
            state: SessionState {
                authenticated: settings.authenticated,
                current: None,
                throttle: ThrottleScheduler::new(settings.save_throttle),
            },
        }
    }

    async fn run(mut self, mut queue: mpsc::Receiver<Command>) {
        debug!(authenticated = self.state.authenticated, "Persistence machine started");
        loop {
            let deadline = self.state.throttle.deadline();
            // A busy queue must not hold back a due write.
            if deadline.is_some_and(|d| d <= Instant::now()) {
                self.flush_detached().await;
                continue;
            }
            tokio::select! {
                biased;
                command = queue.recv() => {
                    let Some(command) = command else {
                        // Every handle is gone.
                        self.stop();
                        break;
                    };
                    if !self.handle(command).await {
                        break;
                    }
                }
                () = wait_until(deadline) => self.flush_detached().await,
            }
        }
        debug!("Persistence machine stopped");
    }

    /// Run one command. Returns `false` once the machine should exit.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::CreateNew { name, model, reply } => {
                let _ = reply.send(self.create_new(name, model).await);
            }
            Command::Save {
                name,
                model,
                mode,
                reply,
            } => {
                let _ = reply.send(self.save(name, model, mode).await);
            }
            Command::Load { id, reply } => {
                let _ = reply.send(self.load(id).await);
            }
            Command::Fork { reply } => {
                let _ = reply.send(self.fork().await);
            }
            Command::Login { reply } => {
                let _ = reply.send(self.login().await);
            }
            Command::Logout { reply } => {
                self.logout();
                let _ = reply.send(Ok(()));
            }
            Command::SendThrottledSave { reply } => {
                let _ = reply.send(self.send_throttled_save().await);
            }
            Command::LocalProjects { reply } => {
                let _ = reply.send(self.local.list_projects().await);
            }
            Command::Session { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            Command::Stop { reply } => {
                self.stop();
                let _ = reply.send(Ok(()));
                return false;
            }
        }
        true
    }

    fn active(&self) -> &dyn PersistenceBackend {
        match BackendKind::for_session(self.state.authenticated) {
            BackendKind::Local => &self.local,
            BackendKind::Remote => &self.remote,
        }
    }

    /// Write through the active backend after the ownership check.
    async fn write(
        &mut self,
        id: &ProjectId,
        model: &PersistentModel,
        name: &str,
    ) -> Result<BackendKind, PersistenceError> {
        let backend = self.active();
        ensure_owner(backend, id).await?;
        backend.save_project(id, model, name).await?;
        let target = backend.kind();
        if target == BackendKind::Remote {
            self.discard_pending_local(id).await;
        }
        Ok(target)
    }

    /// Drop a local record left behind by a failed move to remote storage
    /// now that the remote copy is newer.
    async fn discard_pending_local(&mut self, id: &ProjectId) {
        let Some(current) = self
            .state
            .current
            .as_mut()
            .filter(|c| c.local_pending && c.id == *id)
        else {
            return;
        };
        match self.local.delete_project(id).await {
            Ok(()) => {
                current.local_pending = false;
                info!(project_id = %id, "Dropped local copy superseded by remote save");
            }
            Err(e) => warn!(project_id = %id, "Could not drop superseded local copy: {e}"),
        }
    }

    /// Write the pending throttled save with no caller waiting on it.
    async fn flush_detached(&mut self) {
        let Some(pending) = self.state.throttle.flush_now() else {
            return;
        };
        match self
            .write(&pending.project_id, &pending.model, &pending.name)
            .await
        {
            Ok(target) => self.events.dispatch(vec![saved(&pending.project_id, target)]),
            Err(e) => {
                warn!(project_id = %pending.project_id, "Throttled save failed: {e}");
                self.events.dispatch(vec![PersistenceAction::SaveFailed {
                    id: pending.project_id,
                    reason: e.to_string(),
                }]);
            }
        }
    }

    async fn create_new(
        &mut self,
        name: String,
        model: PersistentModel,
    ) -> Result<ProjectId, PersistenceError> {
        self.flush_detached().await;

        let id = self.active().create_project_id().await?;
        let target = self.write(&id, &model, &name).await?;
        info!(project_id = %id, backend = %target, "Created project");

        self.events.dispatch(vec![
            PersistenceAction::SetProjectId { id: id.clone() },
            saved(&id, target),
        ]);
        self.events.on_created_or_loaded_project(&id, &name, &model);
        self.state.current = Some(CurrentProject {
            id: id.clone(),
            name,
            model,
            local_pending: false,
        });
        Ok(id)
    }

    async fn save(
        &mut self,
        name: String,
        model: PersistentModel,
        mode: SaveMode,
    ) -> Result<(), PersistenceError> {
        let current = self
            .state
            .current
            .as_mut()
            .ok_or(PersistenceError::NoProjectLoaded)?;
        current.name.clone_from(&name);
        current.model.clone_from(&model);
        let id = current.id.clone();

        match mode {
            SaveMode::Force => {
                if self.state.throttle.cancel() {
                    debug!(project_id = %id, "Forced save superseded pending throttled save");
                }
                let target = self.write(&id, &model, &name).await?;
                self.events.dispatch(vec![saved(&id, target)]);
            }
            SaveMode::Throttle => {
                let started = self.state.throttle.arm(PendingSave {
                    project_id: id,
                    model,
                    name,
                });
                if started {
                    debug!("Save throttle armed");
                }
            }
        }
        Ok(())
    }

    async fn load(&mut self, id: ProjectId) -> Result<LoadOutcome, PersistenceError> {
        self.flush_detached().await;

        let (local, remote) = tokio::join!(
            self.local.load_project(&id),
            self.remote.load_project(&id)
        );
        let (project, source) = if let Some(project) = local? {
            if let Err(e) = remote {
                debug!(project_id = %id, "Ignoring remote load failure, local record wins: {e}");
            }
            (project, BackendKind::Local)
        } else if let Some(project) = remote? {
            (project, BackendKind::Remote)
        } else {
            info!(project_id = %id, "Project not found");
            self.events.on_project_not_found();
            return Ok(LoadOutcome::NotFound);
        };

        let migrated = if source == BackendKind::Local && self.state.authenticated {
            self.migrate_to_remote(&id, &project).await
        } else {
            Ok(())
        };
        let local_pending = match migrated {
            Ok(()) => false,
            Err(e) => {
                warn!(
                    project_id = %id,
                    "Keeping local project, move to remote storage failed: {e}"
                );
                self.events.dispatch(vec![PersistenceAction::SaveFailed {
                    id: id.clone(),
                    reason: e.to_string(),
                }]);
                true
            }
        };

        info!(project_id = %id, backend = %source, "Loaded project");
        self.events
            .dispatch(vec![PersistenceAction::SetProjectId { id: id.clone() }]);
        self.events
            .on_created_or_loaded_project(&id, &project.name, &project.model);
        self.state.current = Some(CurrentProject {
            id,
            name: project.name,
            model: project.model,
            local_pending,
        });
        Ok(LoadOutcome::Loaded { source })
    }

    async fn fork(&mut self) -> Result<ProjectId, PersistenceError> {
        let (source, name, model) = {
            let current = self
                .state
                .current
                .as_ref()
                .ok_or(PersistenceError::NoProjectLoaded)?;
            (current.id.clone(), current.name.clone(), current.model.clone())
        };
        self.flush_detached().await;

        let backend = self.active();
        let new_id = backend.create_project_id().await?;
        let forked = sync_fork_assets(&source, &model, &self.remote).await?;

        ensure_owner(backend, &new_id).await?;
        backend.save_project(&new_id, &forked.model, &name).await?;
        backend.upload_assets(&new_id, &forked.downloaded).await?;
        let target = backend.kind();

        let mut actions: Vec<PersistenceAction> = forked
            .downloaded
            .iter()
            .map(|asset| PersistenceAction::UpdateFile {
                file_path: asset.file_name.clone(),
                file: asset.file.clone(),
            })
            .collect();
        actions.push(PersistenceAction::SetForkedFromProjectId { id: source.clone() });
        actions.push(PersistenceAction::SetProjectId { id: new_id.clone() });
        actions.push(saved(&new_id, target));
        self.events.dispatch(actions);

        info!(
            source = %source,
            project_id = %new_id,
            backend = %target,
            assets = forked.downloaded.len(),
            "Forked project"
        );
        self.state.current = Some(CurrentProject {
            id: new_id.clone(),
            name,
            model: forked.model,
            local_pending: false,
        });
        Ok(new_id)
    }

    async fn login(&mut self) -> Result<(), PersistenceError> {
        if self.state.authenticated {
            return Ok(());
        }
        self.state.authenticated = true;
        if let Err(e) = self.migrate_current().await {
            warn!("Login aborted, current project could not be moved to remote storage: {e}");
            self.state.authenticated = false;
            return Err(e);
        }
        if let Some(current) = self.state.current.as_mut() {
            current.local_pending = false;
        }
        info!("Logged in");
        Ok(())
    }

    fn logout(&mut self) {
        if self.state.authenticated {
            self.state.authenticated = false;
            info!("Logged out");
        }
    }

    async fn migrate_current(&self) -> Result<(), PersistenceError> {
        let Some(current) = &self.state.current else {
            return Ok(());
        };
        let Some(project) = self.local.load_project(&current.id).await? else {
            return Ok(());
        };
        self.migrate_to_remote(&current.id, &project).await
    }

    /// Store a local record remotely under the same id, then drop the
    /// local copy.
    async fn migrate_to_remote(
        &self,
        id: &ProjectId,
        project: &LoadedProject,
    ) -> Result<(), PersistenceError> {
        ensure_owner(&self.remote, id).await?;
        self.remote
            .save_project(id, &project.model, &project.name)
            .await?;
        self.local.delete_project(id).await?;
        info!(project_id = %id, "Moved local project to remote storage");
        self.events.dispatch(vec![saved(id, BackendKind::Remote)]);
        Ok(())
    }

    async fn send_throttled_save(&mut self) -> Result<(), PersistenceError> {
        let Some(pending) = self.state.throttle.flush_now() else {
            return Ok(());
        };
        let target = self
            .write(&pending.project_id, &pending.model, &pending.name)
            .await?;
        self.events
            .dispatch(vec![saved(&pending.project_id, target)]);
        Ok(())
    }

    fn stop(&mut self) {
        if self.state.throttle.cancel() {
            debug!("Discarded pending throttled save on stop");
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            authenticated: self.state.authenticated,
            current_project_id: self.state.current.as_ref().map(|c| c.id.clone()),
            throttle_armed: self.state.throttle.is_armed(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keel_store::{MemoryLocalStore, MemoryRemoteStore};

    use super::*;
    use crate::events::NoOpEvents;

    fn machine(authenticated: bool) -> PersistenceMachine {
        PersistenceMachine::spawn(
            LocalBackend::new(Arc::new(MemoryLocalStore::new())),
            RemoteBackend::new(Arc::new(MemoryRemoteStore::new("alice"))),
            Arc::new(NoOpEvents),
            MachineSettings {
                save_throttle: Duration::from_secs(1),
                authenticated,
            },
        )
    }

    #[tokio::test]
    async fn save_needs_a_current_project() {
        let machine = machine(false);
        let result = machine
            .save("Name", PersistentModel::new(1), SaveMode::Force)
            .await;
        assert!(matches!(result, Err(PersistenceError::NoProjectLoaded)));
        assert!(matches!(
            machine.fork().await,
            Err(PersistenceError::NoProjectLoaded)
        ));
    }

    #[tokio::test]
    async fn session_tracks_login_and_current_project() {
        let machine = machine(false);
        let initial = machine.session().await.unwrap();
        assert!(!initial.authenticated);
        assert!(initial.current_project_id.is_none());

        let id = machine
            .create_new("Name", PersistentModel::new(1))
            .await
            .unwrap();
        machine.login().await.unwrap();
        machine
            .save("Name", PersistentModel::new(2), SaveMode::Throttle)
            .await
            .unwrap();

        let session = machine.session().await.unwrap();
        assert!(session.authenticated);
        assert_eq!(session.current_project_id, Some(id));
        assert!(session.throttle_armed);
    }

    #[tokio::test]
    async fn stopped_machine_rejects_commands() {
        let machine = machine(true);
        let clone = machine.clone();
        machine.stop().await;
        machine.stop().await;

        assert!(matches!(clone.logout().await, Err(PersistenceError::Stopped)));
        assert!(matches!(
            clone.create_new("Name", PersistentModel::new(1)).await,
            Err(PersistenceError::Stopped)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn due_throttled_save_runs_before_queued_commands() {
        let remote = MemoryRemoteStore::new("alice");
        let mut actor = MachineActor::new(
            LocalBackend::new(Arc::new(MemoryLocalStore::new())),
            RemoteBackend::new(Arc::new(remote.clone())),
            Arc::new(NoOpEvents),
            MachineSettings {
                save_throttle: Duration::ZERO,
                authenticated: true,
            },
        );
        let id = actor
            .create_new("Name".to_owned(), PersistentModel::new(1))
            .await
            .unwrap();
        actor
            .save("Name".to_owned(), PersistentModel::new(2), SaveMode::Throttle)
            .await
            .unwrap();

        // The command is already waiting when the loop starts.
        let (commands, queue) = mpsc::channel(1);
        let (reply, response) = oneshot::channel();
        commands.send(Command::Session { reply }).await.unwrap();
        drop(commands);
        actor.run(queue).await;

        let session = response.await.unwrap().unwrap();
        assert!(!session.throttle_armed);
        assert_eq!(
            remote.saved_models(&id).await,
            vec![PersistentModel::new(1), PersistentModel::new(2)]
        );
    }

    #[test]
    fn settings_follow_config() {
        let mut config = KeelConfig::default();
        assert!(!MachineSettings::from_config(&config).authenticated);
        config.remote.user_token = Some("alice".to_owned());
        let settings = MachineSettings::from_config(&config);
        assert!(settings.authenticated);
        assert_eq!(settings.save_throttle, Duration::from_secs(30));
    }
}
