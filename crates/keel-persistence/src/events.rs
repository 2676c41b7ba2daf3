//! Outbound notifications from the persistence machine.
//!
//! The editor front end implements [`PersistenceEvents`] to learn about
//! loaded projects and to receive [`PersistenceAction`] batches to apply to
//! its own state. Callbacks are invoked from the machine's task in the
//! order the underlying operations complete.

use std::sync::Mutex;

use keel_types::{PersistenceAction, PersistentModel, ProjectId};

/// Receiver of persistence machine notifications.
pub trait PersistenceEvents: Send + Sync {
    /// A requested project exists in neither store.
    fn on_project_not_found(&self);

    /// A project was created or loaded and is now current.
    fn on_created_or_loaded_project(&self, id: &ProjectId, name: &str, model: &PersistentModel);

    /// Apply a batch of result actions.
    fn dispatch(&self, actions: Vec<PersistenceAction>);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEvents;

impl PersistenceEvents for NoOpEvents {
    fn on_project_not_found(&self) {}

    fn on_created_or_loaded_project(&self, _: &ProjectId, _: &str, _: &PersistentModel) {}

    fn dispatch(&self, _: Vec<PersistenceAction>) {}
}

/// A notification captured by [`RecordingEvents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    /// [`PersistenceEvents::on_project_not_found`] was called.
    ProjectNotFound,
    /// [`PersistenceEvents::on_created_or_loaded_project`] was called.
    CreatedOrLoaded {
        /// The current project's id.
        id: ProjectId,
        /// The project's name.
        name: String,
        /// The revision that was created or loaded.
        model: PersistentModel,
    },
    /// [`PersistenceEvents::dispatch`] was called.
    Dispatched(Vec<PersistenceAction>),
}

/// Keeps every notification in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    log: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: RecordedEvent) {
        if let Ok(mut log) = self.log.lock() {
            log.push(event);
        }
    }

    /// Every notification so far, in order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Every dispatched action so far, flattened in order.
    pub fn actions(&self) -> Vec<PersistenceAction> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RecordedEvent::Dispatched(actions) => Some(actions),
                RecordedEvent::ProjectNotFound | RecordedEvent::CreatedOrLoaded { .. } => None,
            })
            .flatten()
            .collect()
    }

    /// The id from the most recent [`PersistenceAction::SetProjectId`].
    pub fn last_project_id(&self) -> Option<ProjectId> {
        self.actions().into_iter().rev().find_map(|action| match action {
            PersistenceAction::SetProjectId { id } => Some(id),
            _ => None,
        })
    }

    /// Whether the not-found callback has fired.
    pub fn project_not_found(&self) -> bool {
        self.events().contains(&RecordedEvent::ProjectNotFound)
    }

    /// The model from the most recent created-or-loaded callback.
    pub fn last_created_or_loaded(&self) -> Option<PersistentModel> {
        self.events().into_iter().rev().find_map(|event| match event {
            RecordedEvent::CreatedOrLoaded { model, .. } => Some(model),
            _ => None,
        })
    }
}

impl PersistenceEvents for RecordingEvents {
    fn on_project_not_found(&self) {
        self.record(RecordedEvent::ProjectNotFound);
    }

    fn on_created_or_loaded_project(&self, id: &ProjectId, name: &str, model: &PersistentModel) {
        self.record(RecordedEvent::CreatedOrLoaded {
            id: id.clone(),
            name: name.to_owned(),
            model: model.clone(),
        });
    }

    fn dispatch(&self, actions: Vec<PersistenceAction>) {
        self.record(RecordedEvent::Dispatched(actions));
    }
}
