//! The storage engine: an immutable byte-offset index over a records
//! file, served through a bounded pool of seekable handles.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;

use glob::Pattern;
use log::warn;

use crate::config::StoreConfig;
use crate::{Result, RokvError};

mod index;
mod pool;
mod records;

pub use index::{build_index, IndexRecord, StoreIndex};
pub use pool::{PoolOptions, PooledReader, ReaderPool, RecordReader};
pub use records::{decode_record, fingerprint, scan_fields, Payload, Record, RecordKind, ScoredMember};

/// Store construction knobs.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Reader pool sizing and timeouts.
    pub pool: PoolOptions,
    /// Skip the sort on index load; only safe for an index file
    /// produced by [`StoreIndex::write_jsonl`].
    pub keys_presorted: bool,
}

/// The read-side object for one generation: owns exactly one index and
/// exactly one reader pool. Dropping it drains the pool, closing every
/// handle.
pub struct Store {
    index: StoreIndex,
    pool: ReaderPool,
}

impl Store {
    /// Build a store by scanning the records stream and indexing it.
    pub fn from_records<F>(open: F, options: &StoreOptions) -> Result<Store>
    where
        F: Fn() -> Result<Box<dyn RecordReader>>,
    {
        let reader = open().map_err(|e| {
            RokvError::StringError(format!("error opening record reader: {}", e))
        })?;
        let index = build_index(BufReader::new(reader))?;
        let pool = ReaderPool::new(open, &options.pool)?;
        Ok(Store { index, pool })
    }

    /// Build a store from a records stream plus a previously written
    /// index, skipping the rebuild.
    pub fn from_records_with_index<F, R>(open: F, index: R, options: &StoreOptions) -> Result<Store>
    where
        F: Fn() -> Result<Box<dyn RecordReader>>,
        R: BufRead,
    {
        let index = StoreIndex::read_jsonl(index, options.keys_presorted)
            .map_err(|e| RokvError::StringError(format!("error reading index: {}", e)))?;
        let pool = ReaderPool::new(open, &options.pool)?;
        Ok(Store { index, pool })
    }

    /// Number of keys in the store.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Pure index lookup.
    pub fn record_index(&self, key: &str) -> Result<&IndexRecord> {
        self.index.get(key).ok_or(RokvError::KeyNotFound)
    }

    /// Fetch and decode the record for `key`.
    ///
    /// Seeks a pooled handle to the indexed offset and reads exactly the
    /// indexed byte range; a short read is an IO error. The handle goes
    /// back to the pool when the guard drops, decode errors included.
    pub fn record(&self, key: &str) -> Result<Record> {
        let entry = self.record_index(key)?;

        let mut reader = self.pool.acquire()?;
        reader.seek(SeekFrom::Start(entry.offset))?;
        let mut buf = vec![0u8; entry.len as usize];
        reader.read_exact(&mut buf)?;
        drop(reader);

        let record = decode_record(&buf)?;
        Ok(record)
    }

    /// Cursor-based enumeration over the sorted key space.
    ///
    /// `cursor` is a position in the sorted-key sequence; `0` starts at
    /// the beginning. Collects entries matching `pattern` until `count`
    /// is reached, returning the continuation cursor, which is `0` once
    /// the iteration ran past the last position. No cursor state is
    /// kept server-side, so a cursor chain from 0 visits every key
    /// exactly once on a stable store.
    pub fn scan_keys(
        &self,
        cursor: usize,
        count: usize,
        pattern: &str,
    ) -> Result<(Vec<IndexRecord>, usize)> {
        let matcher = compile_pattern(pattern)?;
        let keys = self.index.sorted_keys();
        let mut out = Vec::new();

        let mut pos = cursor;
        while pos < keys.len() {
            let key = &keys[pos];
            let matched = match &matcher {
                Some(p) => p.matches(key),
                None => true,
            };
            if matched {
                let entry = self
                    .index
                    .get(key)
                    .ok_or(RokvError::KeyNotFound)?
                    .clone();
                out.push(entry);
                if out.len() >= count {
                    break;
                }
            }
            pos += 1;
        }

        let next = pos + 1;
        let next = if next >= keys.len() { 0 } else { next };
        Ok((out, next))
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if !self.pool.is_drained() {
            if let Err(e) = self.pool.drain() {
                warn!("draining reader pool on store drop: {}", e);
            }
        }
    }
}

/// Compile a key/field pattern. Empty and `"*"` mean match-everything
/// and skip compilation.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Option<Pattern>> {
    if pattern.is_empty() || pattern == "*" {
        return Ok(None);
    }
    Ok(Some(Pattern::new(pattern)?))
}

/// Build a store from a [StoreConfig]: reuse the index file when it is
/// named and readable, rebuild from the records file otherwise.
pub fn load_store(config: &StoreConfig) -> Result<Store> {
    if config.records_file_name.is_empty() {
        return Err(RokvError::StringError(
            "records file name is empty".to_owned(),
        ));
    }

    let records_path = PathBuf::from(&config.records_file_name);
    let open = move || -> Result<Box<dyn RecordReader>> {
        let file = File::open(&records_path)?;
        Ok(Box::new(file))
    };

    if let Some(index_file_name) = &config.index_file_name {
        match File::open(index_file_name) {
            Ok(file) => {
                let options = StoreOptions {
                    keys_presorted: true,
                    ..StoreOptions::default()
                };
                return Store::from_records_with_index(open, BufReader::new(file), &options);
            }
            Err(e) => {
                warn!(
                    "index file {} not readable, rebuilding from records: {}",
                    index_file_name, e
                );
            }
        }
    }

    Store::from_records(open, &StoreOptions::default())
}
