use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use log::info;

use super::{TESTDATA, TMPDIR};
use crate::case::CaseContext;
use crate::error::{CaseResult, OsResultExt};
use crate::fixture::CwdGuard;
use crate::{ensure, ensure_eq};

const BUSY_FILE: &str = "t_busy_rename";
const RENAMED: &str = "f_renamed";

/// Rename a file that is still open from the parent directory into a
/// subdirectory.
///
/// Servers that refuse to rename open files answer EBUSY, which is the
/// expected outcome. Servers that allow it must really have moved the file
/// and the open descriptor must still reach it.
pub fn busy_rename(ctx: &mut CaseContext<'_>) -> CaseResult {
    ctx.artifacts.file(BUSY_FILE);
    let mut open_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(BUSY_FILE)
        .op(format!("create {}", BUSY_FILE))?;

    ctx.artifacts.dir(TMPDIR);
    ctx.artifacts.file(Path::new(TMPDIR).join(RENAMED));
    fs::create_dir(TMPDIR).op(format!("mkdir {}", TMPDIR))?;

    let _cwd = CwdGuard::change_to(TMPDIR).op(format!("chdir {}", TMPDIR))?;
    let source = Path::new("..").join(BUSY_FILE);

    match fs::rename(&source, RENAMED) {
        Err(e) if e.raw_os_error() == Some(libc::EBUSY) => {
            info!("-EBUSY while renaming open files across dir. Expected.");
            ensure!(
                source.exists(),
                "{} vanished after a refused rename",
                BUSY_FILE
            );
            Ok(())
        }
        Err(e) => Err(e).op(format!("rename ../{} to {}/{}", BUSY_FILE, TMPDIR, RENAMED)),
        Ok(()) => {
            info!("Rename of an open file allowed, checking it moved");
            ensure!(!source.exists(), "{} still present after rename", BUSY_FILE);

            open_file
                .write_all(TESTDATA.as_bytes())
                .op("write through descriptor opened before rename")?;
            drop(open_file);

            let content = fs::read_to_string(RENAMED).op(format!("read {}", RENAMED))?;
            ensure_eq!(
                content,
                TESTDATA,
                "content reached through the renamed file"
            );
            Ok(())
        }
    }
}
