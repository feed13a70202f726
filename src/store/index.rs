//! The byte-offset index: build from a records stream, persist as
//! line-delimited JSON, load back with an optional sort skip.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use super::records::{Record, RecordKind};
use crate::{Result, RokvError};

/// One entry of the offset index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Record key.
    pub key: String,
    /// Byte offset into the records file where the encoded record begins.
    pub offset: u64,
    /// Byte length of the encoded record, separator excluded.
    pub len: u64,
    /// Record type tag.
    #[serde(rename = "type")]
    pub kind: RecordKind,
}

/// The in-memory index: key → [IndexRecord] plus a lexicographically
/// sorted key sequence for deterministic SCAN traversal.
///
/// The two always hold identical key sets and the sequence is strictly
/// sorted.
#[derive(Debug, Default, PartialEq)]
pub struct StoreIndex {
    map: HashMap<String, IndexRecord>,
    sorted_keys: Vec<String>,
}

impl StoreIndex {
    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        self.sorted_keys.len()
    }

    /// True when no keys are indexed.
    pub fn is_empty(&self) -> bool {
        self.sorted_keys.is_empty()
    }

    /// Look up the entry for `key`.
    pub fn get(&self, key: &str) -> Option<&IndexRecord> {
        self.map.get(key)
    }

    /// The sorted key sequence.
    pub fn sorted_keys(&self) -> &[String] {
        &self.sorted_keys
    }

    /// Write the index as one JSON object per line, in sorted-key order.
    pub fn write_jsonl<W: Write>(&self, out: &mut W) -> Result<()> {
        for key in &self.sorted_keys {
            let entry = self.map.get(key).ok_or_else(|| {
                RokvError::StringError(format!(
                    "during index serialization key {} not found in index",
                    key
                ))
            })?;
            serde_json::to_writer(&mut *out, entry)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Read an index written by [`StoreIndex::write_jsonl`].
    ///
    /// `keys_presorted` skips the final sort when the caller guarantees
    /// the file came out of `write_jsonl`; this is the hot path on
    /// startup.
    pub fn read_jsonl<R: BufRead>(input: R, keys_presorted: bool) -> Result<StoreIndex> {
        let mut index = StoreIndex::default();
        for line in input.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let entry: IndexRecord = serde_json::from_str(&line)?;
            index.sorted_keys.push(entry.key.clone());
            index.map.insert(entry.key.clone(), entry);
        }

        if !keys_presorted {
            index.sorted_keys.sort_unstable();
            index.sorted_keys.dedup();
        }

        Ok(index)
    }
}

/// Scan a records stream line by line and compute the offset index.
///
/// The running offset starts at zero; each non-empty line yields an
/// entry with `len` equal to the line's byte length, separator excluded.
/// Assumes the record separator is a single newline byte.
pub fn build_index<R: BufRead>(mut input: R) -> Result<StoreIndex> {
    let mut index = StoreIndex::default();
    let mut offset: u64 = 0;
    let mut line = String::new();

    loop {
        line.clear();
        let read = input.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        let len = if line.ends_with('\n') { read - 1 } else { read };
        if len > 0 {
            let record: Record = serde_json::from_str(&line[..len])
                .map_err(|e| RokvError::CorruptRecord(format!("at offset {}: {}", offset, e)))?;
            let entry = IndexRecord {
                key: record.key.clone(),
                offset,
                len: len as u64,
                kind: record.kind(),
            };
            index.sorted_keys.push(record.key);
            index.map.insert(entry.key.clone(), entry);
        }
        offset += read as u64;
    }

    // Last write wins in the map; the sequence must not keep the
    // duplicate or SCAN would visit the key twice.
    index.sorted_keys.sort_unstable();
    index.sorted_keys.dedup();

    Ok(index)
}
