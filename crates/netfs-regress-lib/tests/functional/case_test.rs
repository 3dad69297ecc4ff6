//! Run catalog cases one at a time and check they leave nothing behind

use std::fs;

use netfs_regress_lib::{Capability, CaseOutcome};
use serial_test::serial;

use crate::common::assertions::{assert_dir_empty, assert_passed};
use crate::common::{ScratchHarness, TestHarness};
use crate::test_with_harness;

/// Whether user xattrs can be set below `dir` on this host
#[cfg(feature = "xattr")]
fn host_supports_xattr(dir: &std::path::Path) -> bool {
    let marker = dir.join(".xattr-check");
    if fs::write(&marker, b"").is_err() {
        return false;
    }
    let supported = xattr::set(&marker, "user.check", b"1").is_ok();
    let _ = fs::remove_file(&marker);
    supported
}

fn run_clean(names: &[&str]) {
    let harness = ScratchHarness::new().unwrap();
    test_with_harness!(harness, |ctx| {
        for name in names {
            let outcome = ctx.run_case(name);
            assert_passed(name, &outcome);
            assert_dir_empty(&ctx.workdir);
        }
    });
}

#[test]
#[serial]
fn test_open_flag_cases_pass() {
    run_clean(&[
        "create",
        "readonly_write",
        "truncate",
        "append_flag",
        "largefile",
        "largefile_truncate",
        "direct_io",
        "excl_create",
        "excl_open",
    ]);
}

#[test]
#[serial]
fn test_content_cases_pass() {
    run_clean(&["stat_lstat", "append_content", "busy_rename"]);
}

#[test]
#[serial]
fn test_cache_consistency_uses_configured_count() {
    let harness = ScratchHarness::new()
        .unwrap()
        .configure(|config| config.cache_entries = 5);
    test_with_harness!(harness, |ctx| {
        assert_eq!(ctx.config.cache_entries, 5);
        assert_passed("cache_consistency", &ctx.run_case("cache_consistency"));
        assert_dir_empty(&ctx.workdir);
    });
}

#[test]
#[serial]
fn test_process_cases_pass() {
    run_clean(&["byte_range_lock", "two_writers"]);
}

#[test]
#[serial]
fn test_archive_cases_pass() {
    run_clean(&["zip_archive"]);
}

#[cfg(feature = "checksum")]
#[test]
#[serial]
fn test_checksum_with_each_digest() {
    use netfs_regress_lib::DigestKind;

    for digest in [DigestKind::Md5, DigestKind::Sha256] {
        let harness = ScratchHarness::new()
            .unwrap()
            .configure(|config| config.digest = digest);
        test_with_harness!(harness, |ctx| {
            assert_passed("checksum", &ctx.run_case("checksum"));
            assert_dir_empty(&ctx.workdir);
        });
    }
}

#[cfg(feature = "mmap")]
#[test]
#[serial]
fn test_mmap_case_passes() {
    run_clean(&["mmap_io"]);
}

#[cfg(feature = "xattr")]
#[test]
#[serial]
fn test_xattr_cases() {
    let harness = ScratchHarness::new().unwrap();
    if !host_supports_xattr(harness.base()) {
        eprintln!(
            "user xattrs not supported under {:?}, skipping",
            harness.base()
        );
        return;
    }
    test_with_harness!(harness, |ctx| {
        for name in ["file_xattr", "dir_xattr"] {
            assert_passed(name, &ctx.run_case(name));
            assert_dir_empty(&ctx.workdir);
        }
    });
}

#[cfg(all(feature = "xattr", target_os = "linux"))]
#[test]
#[serial]
fn test_posix_acl_cases() {
    let harness = ScratchHarness::new().unwrap();
    if !host_supports_xattr(harness.base()) {
        eprintln!("xattrs not supported under {:?}, skipping", harness.base());
        return;
    }
    test_with_harness!(harness, |ctx| {
        for name in ["file_posix_acl", "dir_posix_acl"] {
            let outcome = ctx.run_case(name);
            // Filesystems without ACL support answer EOPNOTSUPP
            if let CaseOutcome::Errored(detail) = &outcome {
                if detail.contains("not supported") {
                    eprintln!("{} unsupported here: {}", name, detail);
                    continue;
                }
            }
            assert_passed(name, &outcome);
            assert_dir_empty(&ctx.workdir);
        }
    });
}

#[test]
#[serial]
fn test_disabled_capability_skips_case() {
    let harness = ScratchHarness::new()
        .unwrap()
        .configure(|config| config.disable = vec![Capability::Mmap, Capability::Hashing]);
    test_with_harness!(harness, |ctx| {
        assert_eq!(
            ctx.run_case("mmap_io"),
            CaseOutcome::Skipped("requires mmap".to_string())
        );
        assert!(matches!(ctx.run_case("checksum"), CaseOutcome::Skipped(_)));
        // Skipped cases never touch the directory
        assert_dir_empty(&ctx.workdir);
    });
}

#[test]
#[serial]
fn test_case_leaves_cwd_in_workdir() {
    let harness = ScratchHarness::new().unwrap();
    test_with_harness!(harness, |ctx| {
        let home = fs::canonicalize(&ctx.workdir).unwrap();
        assert_passed("busy_rename", &ctx.run_case("busy_rename"));
        assert_eq!(std::env::current_dir().unwrap(), home);
    });
}
