//! Single-timer save debouncer.
//!
//! The scheduler does not own a task. It holds at most one pending save and
//! the instant it becomes due; the persistence machine sleeps until that
//! deadline alongside its command queue and asks for the pending save when
//! it fires.
//!
//! Re-arming while armed replaces the payload but keeps the original
//! deadline, so a steady stream of edits still produces one write per
//! window.

use std::time::Duration;

use keel_types::{PersistentModel, ProjectId};
use tokio::time::Instant;

/// A save waiting for its throttle window to close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    /// Project the save targets, fixed when the save was requested.
    pub project_id: ProjectId,
    /// Revision to write.
    pub model: PersistentModel,
    /// Project name to write.
    pub name: String,
}

#[derive(Debug)]
struct Armed {
    deadline: Instant,
    save: PendingSave,
}

/// Coalesces throttled saves into at most one write per window.
#[derive(Debug)]
pub struct ThrottleScheduler {
    window: Duration,
    armed: Option<Armed>,
}

impl ThrottleScheduler {
    /// Create an idle scheduler with the given window.
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            armed: None,
        }
    }

    /// Queue `save`, starting the window if the scheduler is idle.
    ///
    /// Returns `true` when this call started a new window.
    pub fn arm(&mut self, save: PendingSave) -> bool {
        if let Some(armed) = &mut self.armed {
            armed.save = save;
            return false;
        }
        let now = Instant::now();
        let deadline = now.checked_add(self.window).unwrap_or(now);
        self.armed = Some(Armed { deadline, save });
        true
    }

    /// Disarm and hand back the pending save for immediate writing.
    pub fn flush_now(&mut self) -> Option<PendingSave> {
        self.armed.take().map(|armed| armed.save)
    }

    /// Disarm and discard the pending save.
    ///
    /// Returns `true` if a save was discarded.
    pub fn cancel(&mut self) -> bool {
        self.armed.take().is_some()
    }

    /// When the pending save becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|armed| armed.deadline)
    }

    /// Whether a save is pending.
    pub const fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// The pending save, if any.
    pub fn pending(&self) -> Option<&PendingSave> {
        self.armed.as_ref().map(|armed| &armed.save)
    }
}
