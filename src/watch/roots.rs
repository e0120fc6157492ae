use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use crate::error::WatchError;

/// Watch-root consistency manager.
///
/// Responsibility:
/// - Register/unregister roots on caller demand
/// - Re-attach roots that were removed and recreated
///
/// Roots are watched recursively. A root that disappears keeps its slot in
/// the desired set so [`WatchRoots::maintain`] can re-attach it once it
/// reappears.
pub(super) struct WatchRoots {
    desired: FxHashSet<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new() -> Self {
        Self {
            desired: FxHashSet::default(),
            attached: FxHashSet::default(),
        }
    }

    /// Register a path. Nonexistent paths are rejected without touching the
    /// active set; re-adding a registered path is a no-op.
    pub(super) fn add(
        &mut self,
        watcher: &mut RecommendedWatcher,
        path: &Path,
    ) -> Result<(), WatchError> {
        if !path.exists() {
            return Err(WatchError::NotFound(path.to_path_buf()));
        }

        if self.desired.contains(path) {
            return Ok(());
        }

        watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(|source| match source.kind {
                notify::ErrorKind::PathNotFound => WatchError::NotFound(path.to_path_buf()),
                _ => WatchError::Notify {
                    path: path.to_path_buf(),
                    source,
                },
            })?;

        self.desired.insert(path.to_path_buf());
        self.attached.insert(path.to_path_buf());
        Ok(())
    }

    /// Unregister a path. Unknown paths are a no-op; other roots are
    /// unaffected either way.
    pub(super) fn remove(
        &mut self,
        watcher: &mut RecommendedWatcher,
        path: &Path,
    ) -> Result<(), WatchError> {
        if !self.desired.remove(path) {
            return Ok(());
        }

        self.attached.remove(path);

        match watcher.unwatch(path) {
            Ok(()) => Ok(()),
            // The OS already dropped the watch (root deleted, handle reaped)
            Err(e)
                if matches!(
                    e.kind,
                    notify::ErrorKind::WatchNotFound | notify::ErrorKind::PathNotFound
                ) =>
            {
                Ok(())
            }
            Err(source) => Err(WatchError::Notify {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Re-attach desired roots that vanished and came back.
    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) -> usize {
        // Drop stale handles for roots that no longer exist.
        self.attached.retain(|path| path.exists());

        let mut reattached = 0;
        for path in &self.desired {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }

            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                reattached += 1;
            }
        }

        reattached
    }

    pub(super) fn desired_len(&self) -> usize {
        self.desired.len()
    }
}
