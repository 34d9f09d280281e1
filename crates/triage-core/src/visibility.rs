//! Overlay visibility as an observable value.
//!
//! The hosting shell owns a [`Visibility`] and hands clones to whatever needs
//! to toggle it (the review session). Observers take a [`VisibilityWatch`]
//! and are woken on every change, replacing a process-wide flag with an
//! explicit subscribe/unsubscribe lifecycle: dropping the watch unsubscribes.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Shared handle that can show or hide the overlay.
#[derive(Debug, Clone)]
pub struct Visibility {
    tx: Arc<watch::Sender<bool>>,
}

impl Visibility {
    /// Create a new visibility value.
    pub fn new(visible: bool) -> Self {
        let (tx, _rx) = watch::channel(visible);
        Self { tx: Arc::new(tx) }
    }

    /// Current visibility.
    pub fn is_visible(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn show(&self) {
        self.set(true);
    }

    pub fn hide(&self) {
        self.set(false);
    }

    /// Set visibility, notifying observers only when the value changes.
    pub fn set(&self, visible: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == visible {
                false
            } else {
                *current = visible;
                true
            }
        });
        if changed {
            debug!(subsystem = "shell", visible, "Visibility changed");
        }
    }

    /// Subscribe to visibility changes.
    pub fn subscribe(&self) -> VisibilityWatch {
        VisibilityWatch {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Observer side of [`Visibility`].
#[derive(Debug, Clone)]
pub struct VisibilityWatch {
    rx: watch::Receiver<bool>,
}

impl VisibilityWatch {
    /// Current visibility.
    pub fn is_visible(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the next change and return the new value.
    ///
    /// Returns `None` once every [`Visibility`] handle has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_hidden() {
        assert!(!Visibility::default().is_visible());
    }

    #[test]
    fn test_show_and_hide() {
        let visibility = Visibility::new(false);
        visibility.show();
        assert!(visibility.is_visible());
        visibility.hide();
        assert!(!visibility.is_visible());
    }

    #[test]
    fn test_clones_share_state() {
        let a = Visibility::new(false);
        let b = a.clone();
        b.show();
        assert!(a.is_visible());
    }

    #[tokio::test]
    async fn test_watch_observes_changes() {
        let visibility = Visibility::new(false);
        let mut watch = visibility.subscribe();
        assert!(!watch.is_visible());

        visibility.show();
        assert_eq!(watch.changed().await, Some(true));

        visibility.hide();
        assert_eq!(watch.changed().await, Some(false));
    }

    #[tokio::test]
    async fn test_redundant_set_does_not_notify() {
        let visibility = Visibility::new(true);
        let mut watch = visibility.subscribe();

        visibility.show();
        visibility.hide();
        assert_eq!(watch.changed().await, Some(false));
    }

    #[tokio::test]
    async fn test_watch_ends_when_handles_dropped() {
        let visibility = Visibility::new(false);
        let mut watch = visibility.subscribe();
        drop(visibility);
        assert_eq!(watch.changed().await, None);
    }
}
