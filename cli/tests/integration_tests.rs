use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};

const BIN: &str = env!("CARGO_BIN_EXE_record-codec");

fn run(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .output()
        .expect("failed to run record-codec")
}

fn run_logged(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .expect("failed to run record-codec")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_json(path: &Path, body: &Value) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create fixture dir");
    }
    fs::write(path, serde_json::to_string_pretty(body).unwrap()).expect("failed to write json");
    path.to_path_buf()
}

fn device_json() -> Value {
    json!({"notificationToken": "tok1", "platform": "iOS", "language": null, "extra": 1})
}

// ---------------------------------------------------------------------------
// types / decode
// ---------------------------------------------------------------------------

#[test]
fn types_lists_registered_names() {
    let output = run(&["types"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let names: Vec<String> = stdout(&output).lines().map(String::from).collect();
    assert!(names.contains(&"Patient".to_string()));
    assert!(names.contains(&"Bundle".to_string()));
    assert!(names.contains(&"UserDevice".to_string()));
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn decode_prints_normalized_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_json(&dir.path().join("device.json"), &device_json());

    let output = run(&["decode", "--type", "UserDevice", file.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let printed: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(printed, json!({"notificationToken": "tok1", "platform": "iOS"}));
}

#[test]
fn decode_reports_every_issue_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_json(
        &dir.path().join("device.json"),
        &json!({"notificationToken": "", "platform": 3}),
    );

    let output = run(&["decode", "--type", "UserDevice", file.to_str().unwrap()]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("notificationToken: expected"), "stderr: {err}");
    assert!(err.contains("platform: expected"), "stderr: {err}");
    assert!(err.contains("1 of 1 file(s) failed"), "stderr: {err}");
}

#[test]
fn decode_unknown_type_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_json(&dir.path().join("x.json"), &json!({}));
    let output = run(&["decode", "--type", "Encounter", file.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown type: Encounter"));
}

#[test]
fn decode_respects_max_depth_override() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_json(
        &dir.path().join("q.json"),
        &json!({
            "resourceType": "Questionnaire",
            "status": "draft",
            "item": [{"linkId": "a", "type": "group", "item": [{"linkId": "b", "type": "string"}]}]
        }),
    );
    let path = file.to_str().unwrap();

    assert!(run(&["decode", "--type", "Questionnaire", path]).status.success());
    let output = run(&["decode", "--type", "Questionnaire", "--max-depth", "0", path]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("maximum recursion depth 0 exceeded"));
}

// ---------------------------------------------------------------------------
// migrate / store
// ---------------------------------------------------------------------------

#[test]
fn migrate_seed_then_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("records.db");
    let db = db.to_str().unwrap();
    let fixtures = dir.path().join("fixtures");
    write_json(&fixtures.join("devices/d1.json"), &device_json());
    write_json(
        &fixtures.join("devices/d2.json"),
        &json!({"notificationToken": "tok2", "platform": "Android"}),
    );

    let up = run(&["migrate", "--db", db, "up"]);
    assert!(up.status.success(), "stderr: {}", stderr(&up));

    let seed = run(&["migrate", "--db", db, "seed", "--source", fixtures.to_str().unwrap()]);
    assert!(seed.status.success(), "stderr: {}", stderr(&seed));
    assert!(stdout(&seed).contains("Documents inserted: 2"));

    let status = run(&["migrate", "--db", db, "status"]);
    assert!(stdout(&status).contains("Tables exist: yes"));
    assert!(stdout(&status).contains("devices: 2"));

    // Raw get keeps what the fixture held; typed get normalizes.
    let raw = run(&["store", "--db", db, "get", "devices", "d1"]);
    let raw: Value = serde_json::from_str(&stdout(&raw)).unwrap();
    assert_eq!(raw["extra"], json!(1));
    let typed = run(&["store", "--db", db, "get", "devices", "d1", "--type", "UserDevice"]);
    let typed: Value = serde_json::from_str(&stdout(&typed)).unwrap();
    assert_eq!(typed, json!({"notificationToken": "tok1", "platform": "iOS"}));

    let query = run(&["store", "--db", db, "query", "devices", "--where", "platform=Android"]);
    let rows: Value = serde_json::from_str(&stdout(&query)).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["id"], json!("d2"));

    let delete = run(&["store", "--db", db, "delete", "devices", "d2"]);
    assert!(stdout(&delete).contains("Deleted 'devices/d2'"));
    let missing = run(&["store", "--db", db, "get", "devices", "d2"]);
    assert!(!missing.status.success());
}

#[test]
fn store_put_rejects_invalid_documents() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("records.db");
    let db = db.to_str().unwrap();
    assert!(run(&["migrate", "--db", db, "up"]).status.success());

    let bad = write_json(&dir.path().join("bad.json"), &json!({"platform": "iOS"}));
    let output = run_logged(&[
        "store", "--db", db, "put", "devices", "d1", bad.to_str().unwrap(), "--type", "UserDevice",
    ]);
    assert!(!output.status.success());
    let errors = stderr(&output);
    assert!(errors.contains("notificationToken: expected non-empty string, received undefined"));
    assert!(errors.contains("document failed to normalize"));
    assert!(errors.contains("devices/d1"));

    let good = write_json(&dir.path().join("good.json"), &device_json());
    let output = run(&[
        "store", "--db", db, "put", "devices", "d1", good.to_str().unwrap(), "--type", "UserDevice",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let stored = run(&["store", "--db", db, "get", "devices", "d1"]);
    let stored: Value = serde_json::from_str(&stdout(&stored)).unwrap();
    assert_eq!(stored, json!({"notificationToken": "tok1", "platform": "iOS"}));
}

#[test]
fn config_supplies_database_and_prefixes() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("configured.db");
    let config = dir.path().join("codec.yaml");
    fs::write(
        &config,
        format!(
            "version: \"1.0\"\nstore:\n  collection_prefix: tenant\nsqlite:\n  path: {}\n  table_prefix: cfg_\n",
            db.display()
        ),
    )
    .unwrap();
    let config = config.to_str().unwrap();

    assert!(run(&["--config", config, "migrate", "up"]).status.success());
    let good = write_json(&dir.path().join("good.json"), &device_json());
    let put = run(&[
        "--config", config, "store", "put", "devices", "d1", good.to_str().unwrap(), "--type",
        "UserDevice",
    ]);
    assert!(put.status.success(), "stderr: {}", stderr(&put));
    assert!(stdout(&put).contains("'tenant/devices/d1'"));
    assert!(db.exists());

    let status = run(&["--config", config, "migrate", "status"]);
    assert!(stdout(&status).contains("devices: 1"), "stdout: {}", stdout(&status));
    assert!(!stdout(&status).contains("tenant"));
}

#[test]
fn invalid_table_prefix_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("records.db");
    let output = run(&["migrate", "--db", db.to_str().unwrap(), "--prefix", "bad-prefix", "up"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid prefix 'bad-prefix'"));
}
