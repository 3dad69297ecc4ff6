//! The case catalog
//!
//! Every case works on relative paths inside the suite working directory and
//! registers what it creates with its context, so cases can run in any order
//! and leave nothing behind.

pub mod acl;
pub mod append;
pub mod archive;
pub mod cache;
pub mod lock;
pub mod mmap;
pub mod open;
pub mod rename;
pub mod stat;
pub mod writers;
pub mod xattr;

use std::fs;
use std::path::Path;

use crate::capability::Capability;
use crate::case::{Case, CaseContext};
use crate::error::{CaseResult, OsResultExt};

pub const TESTFILE: &str = "testfile";
pub const TESTDIR: &str = "test";
pub const TMPDIR: &str = "temp";
pub const TESTDATA: &str = "abcdefghijk12345";
pub const MORE_TESTDATA: &str = "lmnopqrstuvxyz";

/// Every case in run order
pub fn all() -> Vec<Case> {
    vec![
        Case::new("create", "open with O_CREAT|O_RDWR", open::create),
        Case::new(
            "readonly_write",
            "write to a file opened O_RDONLY",
            open::readonly_write,
        ),
        Case::new("truncate", "open with O_TRUNC", open::truncate),
        Case::new("append_flag", "open with O_APPEND", open::append_flag),
        Case::new("largefile", "open with O_LARGEFILE", open::largefile),
        Case::new(
            "largefile_truncate",
            "open with O_LARGEFILE|O_TRUNC",
            open::largefile_truncate,
        ),
        Case::new("direct_io", "open with O_DIRECT", open::direct_io),
        Case::new(
            "excl_create",
            "create a new file with O_EXCL|O_CREAT",
            open::excl_create,
        ),
        Case::new(
            "excl_open",
            "open an existing file with O_EXCL|O_CREAT",
            open::excl_open,
        ),
        Case::new(
            "cache_consistency",
            "create, remove and recreate directories, compare listings",
            cache::cache_consistency,
        ),
        Case::new(
            "stat_lstat",
            "compare modes from stat and lstat",
            stat::stat_lstat,
        ),
        Case::new(
            "append_content",
            "append to a file with content",
            append::append_content,
        ),
        Case::new(
            "busy_rename",
            "rename an open file across directories",
            rename::busy_rename,
        ),
        Case::new(
            "byte_range_lock",
            "lock disjoint byte ranges from two processes",
            lock::byte_range_lock,
        ),
        Case::new(
            "mmap_io",
            "read and write through a shared mapping",
            mmap::mmap_io,
        )
        .requires(&[Capability::Mmap]),
        Case::new(
            "zip_archive",
            "create a zip archive, append to it, check validity",
            archive::zip_archive,
        ),
        Case::new(
            "checksum",
            "digest an archive by relative and absolute path",
            archive::checksum,
        )
        .requires(&[Capability::Hashing]),
        Case::new(
            "two_writers",
            "child sees parent writes, both append",
            writers::two_writers,
        ),
        Case::new(
            "file_xattr",
            "set, get, list, remove a file xattr",
            xattr::file_xattr,
        )
        .requires(&[Capability::Xattr]),
        Case::new(
            "dir_xattr",
            "set, get, list, remove a directory xattr",
            xattr::dir_xattr,
        )
        .requires(&[Capability::Xattr]),
        Case::new(
            "file_posix_acl",
            "set and get a POSIX ACL on a file",
            acl::file_posix_acl,
        )
        .requires(&[Capability::PosixAcl]),
        Case::new(
            "dir_posix_acl",
            "set and get a POSIX ACL on a directory",
            acl::dir_posix_acl,
        )
        .requires(&[Capability::PosixAcl]),
    ]
}

/// Look a case up by exact name
pub fn find(name: &str) -> Option<Case> {
    all().into_iter().find(|case| case.name == name)
}

/// Create (or truncate) `path` with `content` and register it for removal
pub(crate) fn write_fixture(
    ctx: &mut CaseContext<'_>,
    path: impl AsRef<Path>,
    content: &[u8],
) -> CaseResult {
    let path = path.as_ref();
    ctx.artifacts.file(path);
    fs::write(path, content).op(format!("write {}", path.display()))
}

/// Current size of `path` in bytes
pub(crate) fn file_size(path: impl AsRef<Path>) -> CaseResult<u64> {
    let path = path.as_ref();
    fs::metadata(path)
        .map(|meta| meta.len())
        .op(format!("stat {}", path.display()))
}
