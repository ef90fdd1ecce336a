use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant, SystemTime};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{Result, SettingsError};

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    Changed(PathBuf),
    Error(String),
}

fn is_config_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

/// Filesystem watcher over the config directory
///
/// Editors often emit several events per save; repeats for the same path
/// inside the debounce window are collapsed into one.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<ConfigEvent>,
    debounce: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl ConfigWatcher {
    pub fn new(config_dir: &Path, debounce_ms: u64) -> Result<Self> {
        let (tx, rx) = channel::<ConfigEvent>();
        let watcher = Self::setup_watcher(config_dir, tx)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            debounce: Duration::from_millis(debounce_ms),
            last_seen: HashMap::new(),
        })
    }

    fn setup_watcher(config_dir: &Path, tx: Sender<ConfigEvent>) -> Result<RecommendedWatcher> {
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        for path in event.paths.into_iter().filter(|p| is_config_file(p)) {
                            let _ = tx.send(ConfigEvent::Changed(path));
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(ConfigEvent::Error(e.to_string()));
                }
            })
            .map_err(|e| SettingsError::Config(format!("Failed to create watcher: {}", e)))?;

        if !config_dir.exists() {
            return Err(SettingsError::Config(format!(
                "Config dir {} does not exist",
                config_dir.display()
            )));
        }
        watcher
            .watch(config_dir, RecursiveMode::NonRecursive)
            .map_err(|e| SettingsError::Config(format!("Failed to watch config dir: {}", e)))?;

        Ok(watcher)
    }

    pub fn poll_events(&mut self) -> Vec<ConfigEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            if let ConfigEvent::Changed(path) = &event {
                let now = Instant::now();
                let recent = self
                    .last_seen
                    .get(path)
                    .is_some_and(|seen| now.duration_since(*seen) < self.debounce);
                self.last_seen.insert(path.clone(), now);
                if recent {
                    continue;
                }
            }
            events.push(event);
        }
        events
    }
}

/// Modification-time polling, used when no filesystem watcher can be started
pub struct TickBasedWatcher {
    config_dir: PathBuf,
    last_check: Instant,
    check_interval: Duration,
    file_mtimes: HashMap<PathBuf, SystemTime>,
}

impl TickBasedWatcher {
    pub fn new(config_dir: PathBuf, check_interval_ms: u64) -> Self {
        let mut watcher = Self {
            config_dir,
            last_check: Instant::now(),
            check_interval: Duration::from_millis(check_interval_ms),
            file_mtimes: HashMap::new(),
        };
        for (path, mtime) in watcher.scan_files() {
            watcher.file_mtimes.insert(path, mtime);
        }
        watcher
    }

    fn scan_files(&self) -> Vec<(PathBuf, SystemTime)> {
        let Ok(entries) = std::fs::read_dir(&self.config_dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| is_config_file(path))
            .filter_map(|path| {
                let mtime = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((path, mtime))
            })
            .collect()
    }

    pub fn check(&mut self) -> Vec<ConfigEvent> {
        if self.last_check.elapsed() < self.check_interval {
            return Vec::new();
        }
        self.last_check = Instant::now();

        let mut events = Vec::new();
        for (path, mtime) in self.scan_files() {
            let changed = self
                .file_mtimes
                .get(&path)
                .map_or(true, |&old_mtime| mtime != old_mtime);
            if changed {
                self.file_mtimes.insert(path.clone(), mtime);
                events.push(ConfigEvent::Changed(path));
            }
        }
        events
    }
}

pub enum ConfigWatcherMode {
    Notify(ConfigWatcher),
    Tick(TickBasedWatcher),
}

impl ConfigWatcherMode {
    /// Prefer a filesystem watcher, falling back to polling
    pub fn start(config_dir: &Path, debounce_ms: u64, poll_interval_ms: u64) -> Self {
        match ConfigWatcher::new(config_dir, debounce_ms) {
            Ok(watcher) => Self::Notify(watcher),
            Err(e) => {
                tracing::warn!("Config watcher unavailable, polling instead: {}", e);
                Self::Tick(TickBasedWatcher::new(config_dir.to_path_buf(), poll_interval_ms))
            }
        }
    }

    pub fn poll_events(&mut self) -> Vec<ConfigEvent> {
        match self {
            Self::Notify(watcher) => watcher.poll_events(),
            Self::Tick(watcher) => watcher.check(),
        }
    }
}
