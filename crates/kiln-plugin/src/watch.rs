//! Watch set — membership filter for watch-change notifications.

use std::collections::HashSet;

use tokio::sync::RwLock;
use tracing::trace;

/// Set of external file paths registered as interesting by plugins.
///
/// Purely a membership filter: once any module registers a path, a
/// change to it notifies every plugin with a `watch_change` hook. There
/// is no per-module targeting.
#[derive(Debug, Default)]
pub struct WatchSet {
    /// Registered raw path/id strings.
    paths: RwLock<HashSet<String>>,
}

impl WatchSet {
    /// Creates a new empty watch set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a path.
    pub async fn add(&self, path: &str) {
        let mut paths = self.paths.write().await;
        if paths.insert(path.to_string()) {
            trace!(path = %path, "Watch path registered");
        }
    }

    /// Returns whether a path has been registered.
    pub async fn contains(&self, path: &str) -> bool {
        self.paths.read().await.contains(path)
    }

    /// Returns the number of registered paths.
    pub async fn len(&self) -> usize {
        self.paths.read().await.len()
    }

    /// Returns whether no paths are registered.
    pub async fn is_empty(&self) -> bool {
        self.paths.read().await.is_empty()
    }

    /// Removes all registered paths.
    pub async fn clear(&self) {
        self.paths.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_membership() {
        let watch = WatchSet::new();
        assert!(!watch.contains("src/theme.css").await);

        watch.add("src/theme.css").await;
        assert!(watch.contains("src/theme.css").await);
        assert_eq!(watch.len().await, 1);

        // Re-adding is a no-op.
        watch.add("src/theme.css").await;
        assert_eq!(watch.len().await, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let watch = WatchSet::new();
        watch.add("a").await;
        watch.add("b").await;
        watch.clear().await;
        assert!(watch.is_empty().await);
    }
}
