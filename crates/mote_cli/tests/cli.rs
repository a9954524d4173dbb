use std::fs;

use assert_cmd::Command;

fn mote() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mote"));
    cmd.env_remove("MOTE_CLASSPATH").env_remove("MOTE_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command, code: i32) -> String {
    let assert = cmd.assert().code(code);
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}

#[test]
fn help_and_version_exit_cleanly() {
    let out = stdout_of(mote().arg("--help"), 0);
    assert!(out.contains("--classpath"), "{out}");
    let out = stdout_of(mote().arg("--version"), 0);
    assert!(out.contains("mote"), "{out}");
}

#[test]
fn missing_main_class_is_an_argument_error() {
    mote().assert().code(114);
}

#[test]
fn missing_class_path_is_reported() {
    let out = stdout_of(mote().arg("demo.Main"), 102);
    assert!(out.contains("VM exit 102"), "{out}");
}

#[test]
fn class_on_disk_is_found_and_checked() {
    let dir = tempfile::tempdir().unwrap();
    let pkg = dir.path().join("demo");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(pkg.join("Main.class"), [0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52]).unwrap();
    let cp = dir.path().to_string_lossy().into_owned();

    let out = stdout_of(mote().args(["--classpath", &cp, "demo.Main"]), 129);
    assert!(out.contains("VM exit 129"), "{out}");

    let out = stdout_of(mote().env("MOTE_CLASSPATH", &cp).arg("demo.Other"), 1);
    assert!(out.contains("java.lang.ClassNotFoundException: demo.Other"), "{out}");
}

#[test]
fn truncated_class_file_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Main.class"), [0xCA, 0xFE]).unwrap();
    let cp = dir.path().to_string_lossy().into_owned();
    let out = stdout_of(mote().args(["--cp", &cp, "Main"]), 1);
    assert!(out.contains("java.lang.ClassFormatError"), "{out}");
}
