use std::fs::{self, OpenOptions};
use std::io::Write;

use super::{write_fixture, MORE_TESTDATA, TESTDATA, TESTFILE};
use crate::case::CaseContext;
use crate::ensure_eq;
use crate::error::{CaseResult, OsResultExt};

/// Write a payload, reopen in append mode, write more; the file must hold
/// both payloads in order
pub fn append_content(ctx: &mut CaseContext<'_>) -> CaseResult {
    write_fixture(ctx, TESTFILE, TESTDATA.as_bytes())?;

    {
        let mut file = OpenOptions::new()
            .append(true)
            .open(TESTFILE)
            .op(format!("open {} for append", TESTFILE))?;
        file.write_all(MORE_TESTDATA.as_bytes())
            .op(format!("append to {}", TESTFILE))?;
    }

    let content = fs::read_to_string(TESTFILE).op(format!("read {}", TESTFILE))?;
    ensure_eq!(
        content,
        format!("{}{}", TESTDATA, MORE_TESTDATA),
        "appended content"
    );
    Ok(())
}
