use std::fs::{self, File};
use std::os::unix::fs::MetadataExt;

use super::TESTFILE;
use crate::case::CaseContext;
use crate::ensure_eq;
use crate::error::{CaseResult, OsResultExt};

/// stat, open and lstat a plain file while it is open for writing; both
/// calls must report the same mode
pub fn stat_lstat(ctx: &mut CaseContext<'_>) -> CaseResult {
    ctx.artifacts.file(TESTFILE);
    let _writer = File::create(TESTFILE).op(format!("create {}", TESTFILE))?;

    let mode_stat = fs::metadata(TESTFILE)
        .op(format!("stat {}", TESTFILE))?
        .mode();
    let _reader = File::open(TESTFILE).op(format!("open {} O_RDONLY", TESTFILE))?;
    let mode_lstat = fs::symlink_metadata(TESTFILE)
        .op(format!("lstat {}", TESTFILE))?
        .mode();

    ensure_eq!(
        mode_stat,
        mode_lstat,
        "modes from stat and lstat do not match"
    );
    Ok(())
}
