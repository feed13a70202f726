mod common;

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

use common::{mock_jsonl, mock_records};

#[test]
fn only_generate_index_writes_sorted_index() {
    let dir = TempDir::new().unwrap();
    let records_path = dir.path().join("records.jsonl");
    let index_path = dir.path().join("index.jsonl");
    fs::write(&records_path, mock_jsonl(&mock_records())).unwrap();

    Command::cargo_bin("rokv-server")
        .unwrap()
        .arg("--only_generate_index")
        .arg("--records_file_name")
        .arg(&records_path)
        .arg("--index_file_name")
        .arg(&index_path)
        .assert()
        .success();

    let index = fs::read_to_string(&index_path).unwrap();
    let keys: Vec<String> = index
        .lines()
        .map(|line| {
            let entry: serde_json::Value = serde_json::from_str(line).unwrap();
            entry["key"].as_str().unwrap().to_owned()
        })
        .collect();

    assert_eq!(keys.len(), 40);
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted);
}

#[test]
fn generate_index_fails_without_records_file() {
    Command::cargo_bin("rokv-server")
        .unwrap()
        .arg("--only_generate_index")
        .arg("--records_file_name")
        .arg("/nonexistent/records.jsonl")
        .arg("--index_file_name")
        .arg("/nonexistent/index.jsonl")
        .assert()
        .failure()
        .stderr(contains("opening records file"));
}

#[test]
fn server_fails_without_config() {
    Command::cargo_bin("rokv-server")
        .unwrap()
        .arg("--config_file_name")
        .arg("/nonexistent/config.json")
        .assert()
        .failure()
        .stderr(contains("reading config"));
}
