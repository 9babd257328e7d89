//! Bulk-mode selection
//!
//! Shared between the render loop (reads badges and checkboxes) and the
//! keystroke path (mutations), so the set carries its own lock.

use std::collections::BTreeSet;

use parking_lot::RwLock;

use crate::model::UnitId;

#[derive(Debug, Default)]
struct Inner {
    enabled: bool,
    ids: BTreeSet<UnitId>,
}

/// Bulk mode flag plus the chosen unit ids.
///
/// Leaving bulk mode always forgets the selection; entering it again starts
/// from an empty set.
#[derive(Debug, Default)]
pub struct SelectionSet {
    inner: RwLock<Inner>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip bulk mode. Returns the new `enabled` value.
    pub fn toggle(&self) -> bool {
        let mut inner = self.inner.write();
        inner.enabled = !inner.enabled;
        if !inner.enabled {
            inner.ids.clear();
        }
        inner.enabled
    }

    /// Force bulk mode on or off. Turning it off clears the selection;
    /// disabling an already disabled set is a no-op.
    pub fn set_enabled(&self, enabled: bool) {
        let mut inner = self.inner.write();
        if inner.enabled == enabled {
            return;
        }
        inner.enabled = enabled;
        if !enabled {
            inner.ids.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.read().enabled
    }

    /// Add or remove `id`. Ignored outside bulk mode.
    /// Returns whether `id` is selected afterwards.
    pub fn toggle_member(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        if !inner.enabled {
            return false;
        }
        if inner.ids.remove(id) {
            false
        } else {
            inner.ids.insert(id.to_string());
            true
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.inner.read().ids.contains(id)
    }

    /// Selected ids in sorted order (not unit-list order)
    pub fn members(&self) -> Vec<UnitId> {
        self.inner.read().ids.iter().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.inner.read().ids.len()
    }

    /// Drop all selected ids but stay in the current mode
    pub fn clear(&self) {
        self.inner.write().ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_returns_to_empty_disabled() {
        let sel = SelectionSet::new();
        assert!(sel.toggle());
        sel.toggle_member("a");
        sel.toggle_member("b");
        sel.toggle_member("a");
        assert!(!sel.toggle());

        assert!(!sel.is_enabled());
        assert_eq!(sel.count(), 0);
        assert!(sel.members().is_empty());
    }

    #[test]
    fn test_members_only_change_in_bulk_mode() {
        let sel = SelectionSet::new();
        assert!(!sel.toggle_member("a"));
        assert_eq!(sel.count(), 0);

        sel.toggle();
        assert!(sel.toggle_member("a"));
        assert!(sel.is_selected("a"));
        assert!(!sel.toggle_member("a"));
        assert!(!sel.is_selected("a"));
    }

    #[test]
    fn test_reentering_bulk_mode_starts_empty() {
        let sel = SelectionSet::new();
        sel.toggle();
        for id in ["w", "x", "y", "z"] {
            sel.toggle_member(id);
        }
        assert_eq!(sel.count(), 4);

        sel.toggle();
        sel.toggle();
        assert!(sel.is_enabled());
        assert!(sel.members().is_empty());
    }

    #[test]
    fn test_set_enabled_false_on_disabled_is_noop() {
        let sel = SelectionSet::new();
        sel.set_enabled(false);
        assert!(!sel.is_enabled());

        sel.set_enabled(true);
        sel.toggle_member("a");
        sel.set_enabled(true);
        assert_eq!(sel.count(), 1);
        sel.set_enabled(false);
        assert_eq!(sel.count(), 0);
    }

    #[test]
    fn test_members_sorted() {
        let sel = SelectionSet::new();
        sel.toggle();
        sel.toggle_member("c");
        sel.toggle_member("a");
        sel.toggle_member("b");
        assert_eq!(sel.members(), vec!["a", "b", "c"]);
    }
}
