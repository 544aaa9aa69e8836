//! Hot reload of the config file.
//!
//! Every modify or create event re-reads and validates the file. A file that
//! fails to load is logged and skipped, keeping the running config. A config
//! equal to the last one sent is dropped, since one save often fires several
//! events.

use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

pub struct ConfigWatcher {
    path: PathBuf,
    last: AppConfig,
    updates: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// `current` is the config already running, so an unchanged file sends nothing.
    pub fn new(path: &Path, current: AppConfig) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            last: current,
            updates,
        };
        (watcher, rx)
    }

    /// Re-read the file. `Some` when it holds a valid config that differs
    /// from the last accepted one.
    pub fn reload(&mut self) -> Option<AppConfig> {
        match load_config(&self.path) {
            Ok(config) if config == self.last => {
                tracing::debug!(path = ?self.path, "Config file unchanged");
                None
            }
            Ok(config) => {
                self.last = config.clone();
                Some(config)
            }
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Config reload rejected, keeping current configuration");
                None
            }
        }
    }

    fn on_event(&mut self, event: notify::Result<Event>) {
        match event {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                if let Some(config) = self.reload() {
                    tracing::info!(path = ?self.path, "Config file changed");
                    if self.updates.send(config).is_err() {
                        tracing::debug!("Config receiver gone");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Config watch error"),
        }
    }

    /// Start watching. Events stop once the returned handle is dropped.
    pub fn run(mut self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |event: notify::Result<Event>| self.on_event(event),
            Config::default(),
        )?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
