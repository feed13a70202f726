#![allow(dead_code)]
//! Shared fixture: 10 keys of each record type.

use std::collections::BTreeMap;
use std::io::Cursor;

use rokv::store::{Payload, Record, RecordReader, ScoredMember};
use rokv::Result;

pub fn mock_records() -> Vec<Record> {
    let mut records = Vec::new();
    for i in 0..10 {
        records.push(Record {
            key: format!("key{}:string", i),
            payload: Payload::String("value1".to_owned()),
        });

        let mut fields = BTreeMap::new();
        fields.insert(format!("field{}:1", i), "value1".to_owned());
        fields.insert(format!("field{}:2", i), "value1".to_owned());
        records.push(Record {
            key: format!("key{}:hash", i),
            payload: Payload::Hash(fields),
        });

        records.push(Record {
            key: format!("key{}:list", i),
            payload: Payload::List(vec![
                format!("element{}:1", i),
                format!("element{}:2", i),
            ]),
        });

        records.push(Record {
            key: format!("key{}:zset", i),
            payload: Payload::ZSet(vec![
                ScoredMember {
                    value: format!("key{}:zset:1", i),
                    score: 1.0,
                },
                ScoredMember {
                    value: format!("key{}:zset:2", i),
                    score: 2.0,
                },
            ]),
        });
    }
    records
}

/// Serialize records to the line-delimited on-disk form.
pub fn mock_jsonl(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record).expect("serializing fixture record");
        out.push(b'\n');
    }
    out
}

/// A reader factory lending in-memory cursors over `bytes`, the test
/// stand-in for reopening the records file.
pub fn open_mock(bytes: Vec<u8>) -> impl Fn() -> Result<Box<dyn RecordReader>> {
    move || Ok(Box::new(Cursor::new(bytes.clone())))
}
