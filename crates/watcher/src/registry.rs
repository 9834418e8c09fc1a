//! Handle-based lifecycle API
//!
//! A [`Registry`] owns targets and hands out [`TargetId`]s. Ids come from one
//! process-wide monotonic counter and are never reused, so an id that was
//! closed or belongs to another registry simply misses the map: every entry
//! point reports that with `false`, [`ErrorKind::InvalidTarget`] or `None` and
//! touches nothing.

use crate::config::WatchConfig;
use crate::error::Result;
use crate::target::Target;
use dashmap::DashMap;
use dirwatch_core::{ErrorKind, Event};
use std::fmt;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Shared by every registry so ids never collide across them
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque target handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(NonZeroU64);

impl TargetId {
    /// Raw id value
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Owner of open targets
pub struct Registry {
    targets: DashMap<TargetId, Target>,
    config: WatchConfig,
}

impl Registry {
    /// Registry whose targets use the default configuration
    pub fn new() -> Self {
        Self {
            targets: DashMap::new(),
            config: WatchConfig::default(),
        }
    }

    /// Registry whose targets use `config`
    pub fn with_config(config: WatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    fn next_id() -> TargetId {
        let raw = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        // Starts at 1; wrapping would take 2^64 opens
        TargetId(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Open a directory; the new target starts paused
    pub fn open_target(&self, path: impl AsRef<Path>) -> Result<TargetId> {
        let target = Target::open_with_config(path, &self.config)?;
        Ok(self.insert(target))
    }

    /// Take ownership of an already opened target
    pub fn insert(&self, target: Target) -> TargetId {
        let id = Self::next_id();
        debug!(%id, path = %target.path().display(), "target registered");
        self.targets.insert(id, target);
        id
    }

    /// Open, install `callback` and start watching
    pub fn watch<F>(&self, path: impl AsRef<Path>, callback: F) -> Result<TargetId>
    where
        F: Fn(Option<&Event>) + Send + Sync + 'static,
    {
        let target = Target::open_with_config(path, &self.config)?;
        target.set_callback(callback);
        target.start();
        Ok(self.insert(target))
    }

    /// Shut a target down and forget its id
    ///
    /// Blocks until the worker has returned. The target is removed from the
    /// map before it is closed, so other ids stay usable meanwhile.
    pub fn close_target(&self, id: TargetId) -> bool {
        match self.targets.remove(&id) {
            Some((_, target)) => {
                target.close();
                debug!(%id, "target closed");
                true
            }
            None => false,
        }
    }

    pub fn set_target_callback<F>(&self, id: TargetId, callback: F) -> bool
    where
        F: Fn(Option<&Event>) + Send + Sync + 'static,
    {
        self.with_target(id, |target| target.set_callback(callback))
            .is_some()
    }

    pub fn clear_target_callback(&self, id: TargetId) -> bool {
        self.with_target(id, Target::clear_callback).is_some()
    }

    pub fn start_watch_target(&self, id: TargetId) -> bool {
        self.with_target(id, Target::start).is_some()
    }

    pub fn stop_watch_target(&self, id: TargetId) -> bool {
        self.with_target(id, Target::stop).is_some()
    }

    /// Join `name` onto the target's directory
    pub fn get_full_path_from_target(&self, name: impl AsRef<Path>, id: TargetId) -> Option<PathBuf> {
        self.with_target(id, |target| target.full_path(name))
    }

    pub fn get_target_error(&self, id: TargetId) -> ErrorKind {
        self.with_target(id, Target::error)
            .unwrap_or(ErrorKind::InvalidTarget)
    }

    /// Raw OS error code; `None` for an unknown id
    pub fn get_target_os_error(&self, id: TargetId) -> Option<i32> {
        self.with_target(id, Target::os_error)
    }

    pub fn contains(&self, id: TargetId) -> bool {
        self.targets.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Ids of every open target
    pub fn ids(&self) -> Vec<TargetId> {
        let mut ids: Vec<_> = self.targets.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    /// Close every target
    pub fn close_all(&self) {
        for id in self.ids() {
            self.close_target(id);
        }
    }

    fn with_target<R>(&self, id: TargetId, f: impl FnOnce(&Target) -> R) -> Option<R> {
        self.targets.get(&id).map(|target| f(target.value()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("targets", &self.targets.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::tests::{inotify_buffer, ScriptedSource, Step};
    use crossbeam_channel::unbounded;
    use dirwatch_core::EventKind;
    use std::time::Duration;
    use tempfile::TempDir;

    fn scripted(registry: &Registry) -> (TargetId, crossbeam_channel::Sender<Step>) {
        let (source, steps) = ScriptedSource::new();
        let target =
            Target::from_source("/registry", Box::new(source), registry.config()).unwrap();
        (registry.insert(target), steps)
    }

    #[test]
    fn test_ids_are_never_reused() {
        let registry = Registry::new();
        let (first, _a) = scripted(&registry);
        assert!(registry.close_target(first));

        let (second, _b) = scripted(&registry);
        assert_ne!(first, second);
        assert!(second.get() > first.get());
        assert!(!registry.contains(first));
    }

    #[test]
    fn test_stale_id_is_rejected_without_side_effects() {
        let registry = Registry::new();
        let (id, _steps) = scripted(&registry);
        assert!(registry.close_target(id));

        assert!(!registry.close_target(id));
        assert!(!registry.start_watch_target(id));
        assert!(!registry.stop_watch_target(id));
        assert!(!registry.set_target_callback(id, |_| {}));
        assert!(!registry.clear_target_callback(id));
        assert_eq!(registry.get_target_error(id), ErrorKind::InvalidTarget);
        assert_eq!(registry.get_target_os_error(id), None);
        assert_eq!(registry.get_full_path_from_target("a", id), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lifecycle_through_ids() {
        let registry = Registry::new();
        let (id, steps) = scripted(&registry);
        let (tx, rx) = unbounded();

        assert!(registry.set_target_callback(id, move |event: Option<&Event>| {
            let _ = tx.send(event.cloned());
        }));
        assert!(registry.start_watch_target(id));
        assert!(registry.start_watch_target(id));

        steps.send(Step::Data(inotify_buffer(&[(0x100, "a.txt")]))).unwrap();
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(event.kind(), EventKind::Added);
        assert_eq!(
            registry.get_full_path_from_target(event.name(), id),
            Some(PathBuf::from("/registry/a.txt"))
        );

        assert!(registry.stop_watch_target(id));
        assert!(registry.stop_watch_target(id));
        assert_eq!(registry.get_target_error(id), ErrorKind::Success);
        assert_eq!(registry.get_target_os_error(id), Some(0));
        assert!(registry.close_target(id));
    }

    #[test]
    fn test_open_target_rejects_invalid_paths() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();

        let registry = Registry::new();
        assert!(registry.open_target(temp_dir.path().join("missing")).is_err());
        assert!(registry.open_target(&file).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_with_config_validates() {
        let config = WatchConfig {
            buffer_size: 16,
            ..WatchConfig::default()
        };
        assert!(Registry::with_config(config).is_err());
    }

    #[test]
    fn test_close_all() {
        let registry = Registry::new();
        let (_a, _sa) = scripted(&registry);
        let (_b, _sb) = scripted(&registry);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids().len(), 2);

        registry.close_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_id_from_another_registry_is_rejected() {
        let first = Registry::new();
        let second = Registry::new();
        let (foreign, _a) = scripted(&first);
        let (own, _b) = scripted(&second);

        assert_ne!(foreign, own);
        assert!(!second.contains(foreign));
        assert_eq!(second.get_target_error(foreign), ErrorKind::InvalidTarget);
        assert_eq!(second.get_full_path_from_target("x", foreign), None);
        assert!(!second.stop_watch_target(foreign));
        assert!(!second.close_target(foreign));

        assert!(first.contains(foreign));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_display_id() {
        let registry = Registry::new();
        let (id, _steps) = scripted(&registry);
        assert_eq!(id.to_string(), format!("target#{}", id.get()));
    }
}
