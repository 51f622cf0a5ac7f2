//! Tests for the single instance lock file.
//!
//! The lock file holds the PID of the running daemon, which `kelvin --reload`
//! reads to deliver SIGUSR2. A second instance must be able to fail to take
//! the lock without destroying that PID, so the file is opened without
//! truncation and only rewritten once the lock is held.

use fs2::FileExt;
use serial_test::serial;
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use tempfile::tempdir;

use kelvin::utils::{is_process_running, read_lock_pid};

fn open_lock(path: &std::path::Path) -> fs::File {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .unwrap()
}

fn write_pid(file: &mut fs::File, pid: u32) {
    file.set_len(0).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    write!(file, "{}", pid).unwrap();
    file.flush().unwrap();
}

#[test]
#[serial]
fn test_failed_lock_attempt_preserves_pid() {
    let temp_dir = tempdir().unwrap();
    let lock_path = temp_dir.path().join("kelvin.lock");

    let mut first = open_lock(&lock_path);
    first.try_lock_exclusive().expect("first instance takes the lock");
    write_pid(&mut first, 11111);

    let second = open_lock(&lock_path);
    assert!(
        second.try_lock_exclusive().is_err(),
        "second instance must not get the lock"
    );
    drop(second);

    assert_eq!(read_lock_pid(&lock_path).unwrap(), 11111);
}

#[test]
#[serial]
fn test_lock_can_be_taken_after_release() {
    let temp_dir = tempdir().unwrap();
    let lock_path = temp_dir.path().join("kelvin.lock");

    let mut first = open_lock(&lock_path);
    first.try_lock_exclusive().unwrap();
    write_pid(&mut first, 11111);
    drop(first);

    let mut third = open_lock(&lock_path);
    third
        .try_lock_exclusive()
        .expect("lock is free once the first handle is closed");
    write_pid(&mut third, 33333);
    drop(third);

    assert_eq!(read_lock_pid(&lock_path).unwrap(), 33333);
}

#[test]
#[serial]
fn test_stale_lock_is_detected() {
    let temp_dir = tempdir().unwrap();
    let lock_path = temp_dir.path().join("kelvin.lock");
    fs::write(&lock_path, "999999999").unwrap();

    let pid = read_lock_pid(&lock_path).unwrap();
    assert_eq!(pid, 999_999_999);
    assert!(!is_process_running(pid));
    assert!(is_process_running(std::process::id()));
}
