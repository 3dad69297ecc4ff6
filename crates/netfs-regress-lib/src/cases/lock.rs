//! POSIX byte-range locks between two processes

use std::fs::{File, OpenOptions};
use std::io::Write;

use log::{debug, info};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg};

use super::{TESTDATA, TESTFILE};
use crate::case::CaseContext;
use crate::error::{CaseError, CaseResult, OsResultExt};
use crate::process::spawn_child;

/// Range `(start, len)` the parent locks
const PARENT_RANGE: (i64, i64) = (0, 4);
/// Range `(start, len)` the child locks, disjoint from the parent's
const CHILD_RANGE: (i64, i64) = (8, 4);

/// Non-blocking exclusive lock on `len` bytes from `start` (F_SETLK)
pub fn try_lock(file: &File, start: i64, len: i64) -> nix::Result<()> {
    set_lock(file, libc::F_WRLCK, start, len)
}

/// Release a lock taken by [`try_lock`]
pub fn unlock(file: &File, start: i64, len: i64) -> nix::Result<()> {
    set_lock(file, libc::F_UNLCK, start, len)
}

fn set_lock(file: &File, kind: libc::c_int, start: i64, len: i64) -> nix::Result<()> {
    let fl = libc::flock {
        l_type: kind as libc::c_short,
        l_whence: libc::SEEK_SET as libc::c_short,
        l_start: start as libc::off_t,
        l_len: len as libc::off_t,
        l_pid: 0,
    };
    fcntl(file, FcntlArg::F_SETLK(&fl)).map(drop)
}

/// The parent locks its range, then a forked child locks a disjoint range of
/// the same file. Both must succeed while held together, and the child must
/// be refused the parent's range.
pub fn byte_range_lock(ctx: &mut CaseContext<'_>) -> CaseResult {
    ctx.artifacts.file(TESTFILE);

    let mut parent_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(TESTFILE)
        .op(format!("open {}", TESTFILE))?;
    parent_file
        .write_all(TESTDATA.as_bytes())
        .op(format!("write {}", TESTFILE))?;

    let (start, len) = PARENT_RANGE;
    try_lock(&parent_file, start, len).op("lock range from the parent")?;
    debug!("Parent holds [{}, {})", start, start + len);

    let child = spawn_child(|_| {
        let child_file = OpenOptions::new()
            .write(true)
            .open(TESTFILE)
            .op(format!("open {} in child", TESTFILE))?;

        let (start, len) = CHILD_RANGE;
        try_lock(&child_file, start, len).op("lock range from the child")?;

        let (start, len) = PARENT_RANGE;
        match try_lock(&child_file, start, len) {
            Err(Errno::EAGAIN) | Err(Errno::EACCES) => Ok(()),
            Err(e) => Err(e).op("lock parent's range from the child"),
            Ok(()) => Err(CaseError::Assertion(
                "child was granted a range the parent holds".to_string(),
            )),
        }
    })?;

    let res = child.wait();
    unlock(&parent_file, start, len).op("unlock range from the parent")?;
    res?;

    info!("Both processes locked their own ranges");
    Ok(())
}
