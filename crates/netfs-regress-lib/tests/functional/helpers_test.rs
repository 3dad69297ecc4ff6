//! Building blocks the cases are made of: archives, cross-process locks and
//! the directory-cache cycle

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::path::Path;

use netfs_regress_lib::cases::archive::{append_to_archive, archive_members, write_archive};
use netfs_regress_lib::cases::cache::recreate_and_compare;
use netfs_regress_lib::cases::lock::{try_lock, unlock};
use netfs_regress_lib::process::spawn_child;
use netfs_regress_lib::{Artifacts, CaseError, SuiteDir};
use nix::errno::Errno;
use proptest::prelude::*;
use serial_test::serial;

fn enter_scratch() -> (tempfile::TempDir, SuiteDir) {
    let base = tempfile::tempdir().unwrap();
    let dir = SuiteDir::enter(base.path().join("cifstests")).unwrap();
    (base, dir)
}

#[test]
#[serial]
fn test_archive_append_keeps_existing_members() {
    let (_base, dir) = enter_scratch();
    for name in ["foo", "bar", "baz"] {
        fs::write(name, name.repeat(100)).unwrap();
    }

    write_archive(Path::new("foo.zip"), &["foo"]).unwrap();
    append_to_archive(Path::new("foo.zip"), &["bar", "baz"]).unwrap();

    let members = archive_members(Path::new("foo.zip")).unwrap();
    let expected: BTreeSet<String> = ["bar", "baz", "foo"].iter().map(|s| s.to_string()).collect();
    assert_eq!(members, expected);
    dir.leave();
}

#[test]
#[serial]
fn test_archive_members_rejects_garbage() {
    let (_base, dir) = enter_scratch();
    fs::write("foo.zip", b"not an archive at all").unwrap();

    let err = archive_members(Path::new("foo.zip")).unwrap_err();
    assert!(matches!(err, CaseError::Archive(_)), "got {:?}", err);
    dir.leave();
}

#[test]
#[serial]
fn test_archive_missing_member_is_os_error() {
    let (_base, dir) = enter_scratch();
    let err = write_archive(Path::new("foo.zip"), &["absent"]).unwrap_err();
    assert_eq!(err.errno(), Some(libc::ENOENT));
    dir.leave();
}

#[test]
#[serial]
fn test_child_sees_parent_lock() {
    let (_base, dir) = enter_scratch();
    fs::write("testfile", b"abcdefghijk12345").unwrap();
    let file = OpenOptions::new().write(true).open("testfile").unwrap();
    try_lock(&file, 0, 16).unwrap();

    let child = spawn_child(|_| {
        let file = OpenOptions::new().write(true).open("testfile").unwrap();
        match try_lock(&file, 4, 2) {
            Err(Errno::EAGAIN) | Err(Errno::EACCES) => Ok(()),
            other => Err(CaseError::Assertion(format!("unexpected lock result {:?}", other))),
        }
    })
    .unwrap();
    let res = child.wait();

    unlock(&file, 0, 16).unwrap();
    res.unwrap();
    dir.leave();
}

#[test]
#[serial]
fn test_recreate_leaves_other_entries_alone() {
    let (_base, dir) = enter_scratch();
    fs::write("bystander", b"x").unwrap();
    {
        let mut artifacts = Artifacts::new();
        recreate_and_compare(7, &mut artifacts).unwrap();
        assert_eq!(artifacts.len(), 7);
    }
    let names: Vec<String> = fs::read_dir(".")
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["bystander".to_string()]);
    dir.leave();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    #[serial]
    fn prop_recreate_is_consistent(count in 0u32..48) {
        let (_base, dir) = enter_scratch();
        {
            let mut artifacts = Artifacts::new();
            prop_assert!(recreate_and_compare(count, &mut artifacts).is_ok());
        }
        prop_assert_eq!(fs::read_dir(".").unwrap().count(), 0);
        dir.leave();
    }
}
