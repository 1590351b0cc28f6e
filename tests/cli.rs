use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn shows_help() {
    Command::cargo_bin("room404")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--debounce-ms"));
}

#[test]
fn shows_version() {
    Command::cargo_bin("room404")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_file_argument_fails() {
    Command::cargo_bin("room404")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("FILE"));
}

#[test]
fn saves_stdin_snapshot_on_exit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("welcome.r404");
    Command::cargo_bin("room404")
        .unwrap()
        .arg(&path)
        .write_stdin("<h1>Welcome</h1>\n<h1>Welcome to room404</h1>\n")
        .assert()
        .success();

    let record = room404_proto::decode(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(record.name, "welcome");
    assert_eq!(record.content, "<h1>Welcome to room404</h1>");
    assert_eq!(record.metadata.word_count, 3);
    assert_eq!(record.metadata.version, 1);
}

#[test]
fn manual_mode_saves_only_on_request() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("draft.r404");
    Command::cargo_bin("room404")
        .unwrap()
        .arg(&path)
        .env("ROOM404_MANUAL", "true")
        .env("ROOM404_DEBOUNCE_MS", "1")
        .write_stdin("a\n:w\nb\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unsaved").not());

    let record = room404_proto::decode(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(record.content, "a");
}
