//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RelayConfig;

/// Watches the config file and emits each new valid configuration.
///
/// The parent directory is watched so that saves which replace the file by
/// rename keep being seen. Editors often produce several events per save; a
/// reload that yields the same config as the last one sent is dropped.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in notify's background thread.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let watched = path.clone();
        let file_name = path.file_name().map(|n| n.to_os_string());
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let last_sent: Mutex<Option<RelayConfig>> = Mutex::new(load_config(&path).ok());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event)
                    if (event.kind.is_modify() || event.kind.is_create())
                        && event.paths.iter().any(|p| p.file_name() == file_name.as_deref()) =>
                {
                    match load_config(&watched) {
                        Ok(new_config) => {
                            let mut last = match last_sent.lock() {
                                Ok(guard) => guard,
                                Err(poisoned) => poisoned.into_inner(),
                            };
                            if last.as_ref() == Some(&new_config) {
                                tracing::debug!(path = ?watched, "Config file touched without changes");
                                return;
                            }
                            tracing::info!(path = ?watched, "Config file changed, reloading");
                            *last = Some(new_config.clone());
                            let _ = update_tx.send(new_config);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(path: &Path, model: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "[upstream]\napi_key = \"sk-test\"\ndefault_model = \"{model}\"").unwrap();
        file.sync_all().unwrap();
    }

    #[tokio::test]
    async fn test_change_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        write_config(&path, "first");

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        write_config(&path, "second");

        let update = tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .expect("no config update received")
            .unwrap();
        assert_eq!(update.upstream.default_model, "second");
    }

    async fn next_model(updates: &mut mpsc::UnboundedReceiver<RelayConfig>) -> String {
        tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .expect("no config update received")
            .unwrap()
            .upstream
            .default_model
    }

    #[tokio::test]
    async fn test_replace_by_rename_keeps_watching() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        let staged = dir.path().join("relay.toml.tmp");
        write_config(&path, "first");

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        write_config(&staged, "second");
        std::fs::rename(&staged, &path).unwrap();
        assert_eq!(next_model(&mut updates).await, "second");

        write_config(&staged, "third");
        std::fs::rename(&staged, &path).unwrap();
        assert_eq!(next_model(&mut updates).await, "third");
    }
}
