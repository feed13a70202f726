//! Record model and codec.
//!
//! A record is one line of the records file: a JSON object with `key`,
//! `type` and exactly one payload field matching the type tag. The
//! in-memory form is a tagged [`Payload`] enum; the four-optional-fields
//! wire shape is preserved through a raw mirror struct.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Result, RokvError};

/// The type tag of a record, as it appears on the wire and in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Single string value.
    String,
    /// Field name to field value mapping.
    Hash,
    /// Ordered sequence of strings.
    List,
    /// Reserved tag; never populated by this system.
    Set,
    /// Ordered sequence of scored members.
    ZSet,
}

impl RecordKind {
    /// The lowercase tag string, e.g. for the TYPE reply.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::String => "string",
            RecordKind::Hash => "hash",
            RecordKind::List => "list",
            RecordKind::Set => "set",
            RecordKind::ZSet => "zset",
        }
    }
}

/// One member of an ordered-set record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMember {
    /// Member value.
    pub value: String,
    /// Finite score.
    pub score: f64,
}

/// The payload of a record, exactly one per record.
///
/// Hash fields are kept in a `BTreeMap`: the records file is immutable,
/// and a sorted field order makes HSCAN's fingerprint cursor stable both
/// per process and across processes.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A single value string.
    String(String),
    /// Mapping from field name to field value.
    Hash(BTreeMap<String, String>),
    /// Zero-indexed sequence of elements.
    List(Vec<String>),
    /// Members with scores, in insertion order.
    ZSet(Vec<ScoredMember>),
}

impl Payload {
    /// The type tag matching this payload.
    pub fn kind(&self) -> RecordKind {
        match self {
            Payload::String(_) => RecordKind::String,
            Payload::Hash(_) => RecordKind::Hash,
            Payload::List(_) => RecordKind::List,
            Payload::ZSet(_) => RecordKind::ZSet,
        }
    }
}

/// One record of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord", into = "RawRecord")]
pub struct Record {
    /// Non-empty identifier, unique across the dataset.
    pub key: String,
    /// The typed payload.
    pub payload: Payload,
}

impl Record {
    /// The type tag of this record.
    pub fn kind(&self) -> RecordKind {
        self.payload.kind()
    }
}

/// Decode one record from the bytes at an indexed range.
pub fn decode_record(bytes: &[u8]) -> Result<Record> {
    serde_json::from_slice(bytes).map_err(|e| RokvError::CorruptRecord(e.to_string()))
}

#[derive(Serialize, Deserialize)]
struct StringPayload {
    value: String,
}

#[derive(Serialize, Deserialize)]
struct HashPayload {
    fields: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct ListPayload {
    elements: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct ZSetPayload {
    elements: Vec<ScoredMember>,
}

/// The wire shape: a string tag plus four optional payload fields.
#[derive(Serialize, Deserialize)]
struct RawRecord {
    key: String,
    #[serde(rename = "type")]
    kind: RecordKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    string_record: Option<StringPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash_record: Option<HashPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    list_record: Option<ListPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ordered_set_record: Option<ZSetPayload>,
}

impl TryFrom<RawRecord> for Record {
    type Error = String;

    fn try_from(raw: RawRecord) -> std::result::Result<Self, String> {
        let populated = raw.string_record.is_some() as u8
            + raw.hash_record.is_some() as u8
            + raw.list_record.is_some() as u8
            + raw.ordered_set_record.is_some() as u8;
        if populated > 1 {
            return Err(format!("record {}: multiple payloads present", raw.key));
        }

        let payload = match (raw.kind, raw.string_record, raw.hash_record, raw.list_record, raw.ordered_set_record) {
            (RecordKind::String, Some(p), _, _, _) => Payload::String(p.value),
            (RecordKind::Hash, _, Some(p), _, _) => Payload::Hash(p.fields),
            (RecordKind::List, _, _, Some(p), _) => Payload::List(p.elements),
            (RecordKind::ZSet, _, _, _, Some(p)) => Payload::ZSet(p.elements),
            (RecordKind::Set, ..) => {
                return Err(format!("record {}: reserved type 'set' carries no payload", raw.key))
            }
            (kind, ..) => {
                return Err(format!(
                    "record {}: payload does not match type '{}'",
                    raw.key,
                    kind.as_str()
                ))
            }
        };

        Ok(Record { key: raw.key, payload })
    }
}

impl From<Record> for RawRecord {
    fn from(record: Record) -> Self {
        let mut raw = RawRecord {
            key: record.key,
            kind: record.payload.kind(),
            string_record: None,
            hash_record: None,
            list_record: None,
            ordered_set_record: None,
        };
        match record.payload {
            Payload::String(value) => raw.string_record = Some(StringPayload { value }),
            Payload::Hash(fields) => raw.hash_record = Some(HashPayload { fields }),
            Payload::List(elements) => raw.list_record = Some(ListPayload { elements }),
            Payload::ZSet(elements) => raw.ordered_set_record = Some(ZSetPayload { elements }),
        }
        raw
    }
}

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a of a field name; the HSCAN continuation cursor.
pub fn fingerprint(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in s.as_bytes() {
        hash ^= u32::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Cursor-based iteration over hash fields with pattern matching.
///
/// Hashes carry no positions, so the cursor is the fingerprint of the
/// last emitted field name. A resumed call walks the fields in their
/// stable order, discarding entries until one fingerprints to `cursor`,
/// then emits after it. Output is a flat `field, value, field, value…`
/// list cut off at `2 * count` items; the returned cursor is `0` iff the
/// fields were exhausted before hitting the cutoff.
pub fn scan_fields(
    fields: &BTreeMap<String, String>,
    cursor: u32,
    count: usize,
    pattern: &str,
) -> Result<(Vec<String>, u32)> {
    let matcher = super::compile_pattern(pattern)?;
    let mut found = cursor == 0;
    let mut out = Vec::new();
    let mut last = 0u32;
    let mut stopped_early = false;

    for (name, value) in fields {
        if !found {
            if fingerprint(name) == cursor {
                found = true;
            }
            continue;
        }

        if let Some(p) = &matcher {
            if !p.matches(name) {
                continue;
            }
        }

        last = fingerprint(name);
        out.push(name.clone());
        out.push(value.clone());
        if out.len() >= 2 * count {
            stopped_early = true;
            break;
        }
    }

    let next = if stopped_early { last } else { 0 };
    Ok((out, next))
}
