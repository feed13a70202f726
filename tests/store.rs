mod common;

use std::io::Cursor;
use std::sync::Arc;

use rokv::store::{
    build_index, decode_record, Payload, Record, RecordKind, Store, StoreIndex, StoreOptions,
};
use rokv::{Handler, Result, RokvError};

use common::{mock_jsonl, mock_records, open_mock};

fn mock_store(records: &[Record]) -> Result<Store> {
    let bytes = mock_jsonl(records);
    let index = build_index(Cursor::new(&bytes))?;
    let mut index_buf = Vec::new();
    index.write_jsonl(&mut index_buf)?;

    let options = StoreOptions {
        keys_presorted: true,
        ..StoreOptions::default()
    };
    Store::from_records_with_index(open_mock(bytes), Cursor::new(index_buf), &options)
}

#[test]
fn index_roundtrip() -> Result<()> {
    let bytes = mock_jsonl(&mock_records());
    let index = build_index(Cursor::new(&bytes))?;

    let mut buf = Vec::new();
    index.write_jsonl(&mut buf)?;

    let reloaded = StoreIndex::read_jsonl(Cursor::new(&buf), false)?;
    assert_eq!(index, reloaded);

    // write_jsonl emits sorted keys, so the sort may be skipped
    let presorted = StoreIndex::read_jsonl(Cursor::new(&buf), true)?;
    assert_eq!(index, presorted);
    Ok(())
}

#[test]
fn index_ranges_extract_original_lines() -> Result<()> {
    let records = mock_records();
    let bytes = mock_jsonl(&records);
    let index = build_index(Cursor::new(&bytes))?;

    assert_eq!(index.len(), records.len());
    for record in &records {
        let entry = index.get(&record.key).expect("key indexed");
        assert_eq!(entry.kind, record.kind());

        let start = entry.offset as usize;
        let end = start + entry.len as usize;
        assert!(end <= bytes.len());
        assert_eq!(bytes[end], b'\n');

        let decoded = decode_record(&bytes[start..end])?;
        assert_eq!(&decoded, record);
    }
    Ok(())
}

#[test]
fn build_index_rejects_corrupt_line() {
    let mut bytes = mock_jsonl(&mock_records()[..2]);
    bytes.extend_from_slice(b"{\"key\":\"broken\"\n");

    match build_index(Cursor::new(&bytes)) {
        Err(RokvError::CorruptRecord(_)) => {}
        other => panic!("expected CorruptRecord, got {:?}", other.map(|i| i.len())),
    }
}

#[test]
fn build_index_rejects_mismatched_payload() {
    // a hash payload under a string tag
    let line = br#"{"key":"k","type":"string","hash_record":{"fields":{}}}"#;
    let mut bytes = line.to_vec();
    bytes.push(b'\n');

    assert!(matches!(
        build_index(Cursor::new(&bytes)),
        Err(RokvError::CorruptRecord(_))
    ));
}

#[test]
fn duplicate_keys_last_write_wins() -> Result<()> {
    let first = Record {
        key: "dup".to_owned(),
        payload: Payload::String("old".to_owned()),
    };
    let second = Record {
        key: "dup".to_owned(),
        payload: Payload::String("new".to_owned()),
    };
    let bytes = mock_jsonl(&[first.clone(), second.clone()]);
    let index = build_index(Cursor::new(&bytes))?;

    // the key appears once in the sequence, mapped to the later range
    assert_eq!(index.len(), 1);
    assert_eq!(index.sorted_keys().to_vec(), ["dup"]);
    let entry = index.get("dup").expect("key indexed");
    let start = entry.offset as usize;
    let decoded = decode_record(&bytes[start..start + entry.len as usize])?;
    assert_eq!(decoded, second);
    Ok(())
}

#[test]
fn reading_store() -> Result<()> {
    let records = mock_records();
    let store = mock_store(&records)?;

    for record in &records {
        let fetched = store.record(&record.key)?;
        assert_eq!(&fetched, record);
    }
    Ok(())
}

#[test]
fn reading_index() -> Result<()> {
    let records = mock_records();
    let store = mock_store(&records)?;

    for record in &records {
        let entry = store.record_index(&record.key)?;
        assert_eq!(entry.key, record.key);
        assert_eq!(entry.kind, record.kind());
    }
    Ok(())
}

#[test]
fn missing_key_is_not_found() -> Result<()> {
    let store = mock_store(&mock_records())?;
    assert!(matches!(
        store.record("does_not_exist"),
        Err(RokvError::KeyNotFound)
    ));
    assert!(matches!(
        store.record_index("does_not_exist"),
        Err(RokvError::KeyNotFound)
    ));
    Ok(())
}

#[test]
fn type_tags_survive_the_index() -> Result<()> {
    let store = mock_store(&mock_records())?;
    assert_eq!(store.record_index("key3:hash")?.kind, RecordKind::Hash);
    assert_eq!(store.record_index("key3:zset")?.kind, RecordKind::ZSet);
    Ok(())
}

#[test]
fn scan_visits_every_key_exactly_once() -> Result<()> {
    let records = mock_records();
    let store = mock_store(&records)?;

    let mut seen = Vec::new();
    let mut cursor = 0;
    loop {
        let (entries, next) = store.scan_keys(cursor, 7, "*")?;
        seen.extend(entries.into_iter().map(|e| e.key));
        if next == 0 {
            break;
        }
        cursor = next;
    }

    let mut expected: Vec<String> = records.iter().map(|r| r.key.clone()).collect();
    expected.sort_unstable();
    assert_eq!(seen, expected);
    Ok(())
}

#[test]
fn scan_filters_by_pattern() -> Result<()> {
    let store = mock_store(&mock_records())?;

    let (entries, next) = store.scan_keys(0, store.len(), "key0:*")?;
    let keys: Vec<_> = entries.into_iter().map(|e| e.key).collect();
    assert_eq!(keys, ["key0:hash", "key0:list", "key0:string", "key0:zset"]);
    assert_eq!(next, 0);

    let (entries, _) = store.scan_keys(0, store.len(), "key?:string")?;
    assert_eq!(entries.len(), 10);
    Ok(())
}

#[test]
fn scan_rejects_bad_pattern() -> Result<()> {
    let store = mock_store(&mock_records())?;
    assert!(matches!(
        store.scan_keys(0, 10, "key[0"),
        Err(RokvError::Pattern(_))
    ));
    Ok(())
}

#[test]
fn hscan_resumes_from_fingerprint_cursor() -> Result<()> {
    use rokv::store::scan_fields;

    let records = mock_records();
    let fields = match &records.iter().find(|r| r.key == "key0:hash").unwrap().payload {
        Payload::Hash(fields) => fields.clone(),
        _ => unreachable!(),
    };

    let mut seen = Vec::new();
    let mut cursor = 0;
    loop {
        let (flat, next) = scan_fields(&fields, cursor, 1, "*")?;
        assert!(flat.len() <= 2);
        seen.extend(flat);
        if next == 0 {
            break;
        }
        cursor = next;
    }

    assert_eq!(seen.len(), 4);
    assert!(seen.contains(&"field0:1".to_owned()));
    assert!(seen.contains(&"field0:2".to_owned()));
    Ok(())
}

#[test]
fn hscan_exhaustion_returns_zero_cursor() -> Result<()> {
    use rokv::store::scan_fields;

    let records = mock_records();
    let fields = match &records.iter().find(|r| r.key == "key0:hash").unwrap().payload {
        Payload::Hash(fields) => fields.clone(),
        _ => unreachable!(),
    };

    let (flat, next) = scan_fields(&fields, 0, 20, "*")?;
    assert_eq!(flat.len(), 4);
    assert_eq!(next, 0);

    let (flat, next) = scan_fields(&fields, 0, 20, "field0:1")?;
    assert_eq!(flat, ["field0:1", "value1"]);
    assert_eq!(next, 0);
    Ok(())
}

// A request that pinned generation G keeps reading G's data after the
// dispatcher swapped to G+1.
#[test]
fn swapped_out_store_serves_inflight_requests() -> Result<()> {
    let store_a = mock_store(&mock_records())?;
    let store_b = mock_store(&[Record {
        key: "only".to_owned(),
        payload: Payload::String("b".to_owned()),
    }])?;

    let handler = Handler::new(Arc::new(store_a));
    let pinned = handler.store();
    handler.swap_store(Arc::new(store_b));

    assert_eq!(pinned.len(), 40);
    assert_eq!(
        pinned.record("key0:string")?.payload,
        Payload::String("value1".to_owned())
    );
    assert_eq!(handler.store().len(), 1);
    Ok(())
}
