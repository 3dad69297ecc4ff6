use std::fs::OpenOptions;
use std::io::Write;

use log::debug;

use super::{file_size, write_fixture, MORE_TESTDATA, TESTDATA, TESTFILE};
use crate::case::CaseContext;
use crate::ensure_eq;
use crate::error::{CaseResult, OsResultExt};
use crate::process::spawn_child;

/// Bytes one writer appends: both payloads back to back
const ROUND: u64 = (TESTDATA.len() + MORE_TESTDATA.len()) as u64;

fn append_round() -> CaseResult {
    let mut file = OpenOptions::new()
        .append(true)
        .open(TESTFILE)
        .op(format!("open {} for append", TESTFILE))?;
    file.write_all(TESTDATA.as_bytes())
        .op(format!("append to {}", TESTFILE))?;
    file.write_all(MORE_TESTDATA.as_bytes())
        .op(format!("append to {}", TESTFILE))?;
    Ok(())
}

/// The parent writes both payloads and forks. The child must see the
/// parent's bytes straight away, then parent and child append concurrently.
/// Only the total size is checked, not how the appends interleave.
pub fn two_writers(ctx: &mut CaseContext<'_>) -> CaseResult {
    let payload = format!("{}{}", TESTDATA, MORE_TESTDATA);
    write_fixture(ctx, TESTFILE, payload.as_bytes())?;

    let mut child = spawn_child(|signal| {
        let size = file_size(TESTFILE)?;
        signal.ready()?;
        ensure_eq!(size, ROUND, "child not seeing parent writes");
        append_round()
    })?;

    // Let the child take its size reading before the parent appends
    child.wait_ready()?;
    let appended = append_round();
    child.wait()?;
    appended?;

    let total = file_size(TESTFILE)?;
    debug!("{} holds {} bytes after both writers", TESTFILE, total);
    ensure_eq!(total, 3 * ROUND, "size after both writers appended");
    Ok(())
}
