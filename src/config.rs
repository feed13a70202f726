//! The store config file: which records file to serve and, optionally,
//! which precomputed index to load.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Contents of the JSON config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the records file.
    pub records_file_name: String,
    /// Path of the index file; when absent or unreadable the index is
    /// rebuilt from the records file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file_name: Option<String>,
}

/// Read and parse the config file, returning it together with the
/// file's modification time for the hot-reload watch.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<(StoreConfig, SystemTime)> {
    let modified = fs::metadata(&path)?.modified()?;
    let bytes = fs::read(&path)?;
    let config = serde_json::from_slice(&bytes)?;
    Ok((config, modified))
}
