//! Hot-reload loop: poll the config file's mtime and swap a freshly
//! built store into the handler when it changes.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use log::{error, info};

use crate::config;
use crate::handler::Handler;
use crate::store;

/// Spawn the config-watch thread.
///
/// Every `interval` the config file is re-read; when its mtime differs
/// from the last known one a new store is built and swapped into
/// `handler`. On any failure the previous store stays live. The old
/// generation is dropped, draining its pool, once the last in-flight
/// command releases it.
pub fn spawn_config_watch(
    handler: Arc<Handler>,
    config_path: PathBuf,
    interval: Duration,
    mut last_modified: SystemTime,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        thread::sleep(interval);

        let (config, modified) = match config::read_config(&config_path) {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("failed to load config {}: {}", config_path.display(), e);
                continue;
            }
        };
        if modified == last_modified {
            continue;
        }
        last_modified = modified;

        match store::load_store(&config) {
            Ok(new_store) => {
                handler.swap_store(Arc::new(new_store));
                info!(
                    "config change detected, store reloaded from {}",
                    config.records_file_name
                );
            }
            Err(e) => error!("failed to load a store: {}", e),
        }
    })
}
