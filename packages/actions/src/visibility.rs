//! Visibility flags for elements shown or hidden by workflows.
//!
//! Flags are keyed by element id and shared by clones of the handle, so the
//! interpreter and whoever renders the app see the same answers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Named visibility flags toggled by `visibility.*` actions.
///
/// An element with no flag is visible unless the caller asks for another
/// default.
#[derive(Debug, Clone, Default)]
pub struct VisibilityControl {
    flags: Arc<RwLock<HashMap<String, bool>>>,
}

impl VisibilityControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, id: &str, f: impl FnOnce(Option<bool>) -> bool) {
        let mut flags = self.flags.write().unwrap_or_else(|p| p.into_inner());
        let next = f(flags.get(id).copied());
        flags.insert(id.to_string(), next);
    }

    pub fn show(&self, id: &str) {
        self.update(id, |_| true);
    }

    pub fn hide(&self, id: &str) {
        self.update(id, |_| false);
    }

    /// Flip the flag; an unset flag counts as hidden, so the first toggle shows
    pub fn toggle(&self, id: &str) {
        self.update(id, |current| !current.unwrap_or(false));
    }

    pub fn is_visible(&self, id: &str, default_value: bool) -> bool {
        let flags = self.flags.read().unwrap_or_else(|p| p.into_inner());
        flags.get(id).copied().unwrap_or(default_value)
    }

    pub fn reset(&self) {
        self.flags.write().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn snapshot(&self) -> HashMap<String, bool> {
        self.flags.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_hide_toggle() {
        let visibility = VisibilityControl::new();
        assert!(visibility.is_visible("modal", true));

        visibility.hide("modal");
        assert!(!visibility.is_visible("modal", true));

        visibility.toggle("modal");
        assert!(visibility.is_visible("modal", false));

        visibility.show("modal");
        visibility.toggle("modal");
        assert!(!visibility.is_visible("modal", true));
    }

    #[test]
    fn test_first_toggle_shows() {
        let visibility = VisibilityControl::new();
        visibility.toggle("drawer");
        assert!(visibility.is_visible("drawer", false));
    }

    #[test]
    fn test_reset_clears_flags() {
        let visibility = VisibilityControl::new();
        visibility.hide("a");
        visibility.reset();
        assert!(visibility.snapshot().is_empty());
        assert!(visibility.is_visible("a", true));
    }
}
