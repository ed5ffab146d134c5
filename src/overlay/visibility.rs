use std::collections::HashSet;

use super::context::ContextTracker;

/// App instances the user dismissed the overlay for. Membership lasts
/// until the process exits; a relaunch produces a new instance id and
/// shows the overlay again.
#[derive(Debug, Clone, Default)]
pub struct HiddenInstanceSet {
    instances: HashSet<String>,
}

impl HiddenInstanceSet {
    /// Returns false for blank ids, which never enter the set.
    pub fn insert(&mut self, instance_id: &str) -> bool {
        let id = instance_id.trim();
        if id.is_empty() {
            return false;
        }
        self.instances.insert(id.to_ascii_lowercase())
    }

    pub fn contains(&self, instance_id: &str) -> bool {
        let id = instance_id.trim();
        !id.is_empty() && self.instances.contains(&id.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// The one rule deciding whether the overlay (and its close button) hides.
///
/// Preview mode wins over everything so settings changes stay visible.
/// Otherwise the overlay hides over suppressed capture tools, over
/// ordinary windows that are neither fullscreen nor the desktop, and over
/// fullscreen instances the user dismissed.
pub fn should_hide(previewing: bool, context: &ContextTracker, hidden: &HiddenInstanceSet) -> bool {
    !previewing
        && (context.is_suppressed()
            || (!context.is_foreground_fullscreen() && !context.is_desktop_foreground())
            || (context.is_active()
                && !context.instance_id().trim().is_empty()
                && hidden.contains(context.instance_id())))
}
