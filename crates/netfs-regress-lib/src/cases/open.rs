//! Open flag cases

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;

use log::info;

use super::{file_size, write_fixture, TESTDATA, TESTFILE};
use crate::case::CaseContext;
use crate::error::{CaseError, CaseResult, OsResultExt};
use crate::{ensure, ensure_eq};

#[cfg(target_os = "linux")]
const O_LARGEFILE: i32 = libc::O_LARGEFILE;
#[cfg(not(target_os = "linux"))]
const O_LARGEFILE: i32 = 0;

#[cfg(any(target_os = "linux", target_os = "freebsd"))]
const O_DIRECT: i32 = libc::O_DIRECT;
#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
const O_DIRECT: i32 = 0;

fn open_testfile(options: &OpenOptions, what: &str) -> CaseResult<File> {
    options
        .open(TESTFILE)
        .op(format!("open {} with {}", TESTFILE, what))
}

pub fn create(ctx: &mut CaseContext<'_>) -> CaseResult {
    ctx.artifacts.file(TESTFILE);
    open_testfile(
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false),
        "O_CREAT|O_RDWR",
    )?;
    Ok(())
}

/// A write through a read-only descriptor must be refused
pub fn readonly_write(ctx: &mut CaseContext<'_>) -> CaseResult {
    write_fixture(ctx, TESTFILE, b"")?;
    let mut file = open_testfile(OpenOptions::new().read(true), "O_RDONLY")?;

    match file.write(TESTDATA.as_bytes()) {
        Err(e) if is_refused_write(&e) => {
            info!("Write to read-only file failed with {}. Expected.", e);
            Ok(())
        }
        Err(e) => Err(e).op("write to read-only file"),
        Ok(n) => Err(CaseError::Assertion(format!(
            "write of {} bytes to a read-only descriptor succeeded",
            n
        ))),
    }
}

fn is_refused_write(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EBADF) | Some(libc::EACCES) | Some(libc::EPERM)
    )
}

pub fn truncate(ctx: &mut CaseContext<'_>) -> CaseResult {
    write_fixture(ctx, TESTFILE, TESTDATA.as_bytes())?;
    open_testfile(
        OpenOptions::new().write(true).truncate(true),
        "O_WRONLY|O_TRUNC",
    )?;
    ensure_eq!(file_size(TESTFILE)?, 0, "size after O_TRUNC");
    Ok(())
}

pub fn append_flag(ctx: &mut CaseContext<'_>) -> CaseResult {
    write_fixture(ctx, TESTFILE, b"")?;
    open_testfile(OpenOptions::new().append(true), "O_WRONLY|O_APPEND")?;
    Ok(())
}

pub fn largefile(ctx: &mut CaseContext<'_>) -> CaseResult {
    write_fixture(ctx, TESTFILE, b"")?;
    open_testfile(
        OpenOptions::new().write(true).custom_flags(O_LARGEFILE),
        "O_WRONLY|O_LARGEFILE",
    )?;
    Ok(())
}

pub fn largefile_truncate(ctx: &mut CaseContext<'_>) -> CaseResult {
    write_fixture(ctx, TESTFILE, TESTDATA.as_bytes())?;
    open_testfile(
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .custom_flags(O_LARGEFILE),
        "O_WRONLY|O_LARGEFILE|O_TRUNC",
    )?;
    ensure_eq!(file_size(TESTFILE)?, 0, "size after O_LARGEFILE|O_TRUNC");
    Ok(())
}

/// O_DIRECT support depends on the mount (cifs needs `cache=none` or
/// `directio`) and on the local filesystem for tmpfs-backed runs. EINVAL is
/// the documented "not supported here" answer and is logged, not failed.
pub fn direct_io(ctx: &mut CaseContext<'_>) -> CaseResult {
    write_fixture(ctx, TESTFILE, b"")?;

    let res = OpenOptions::new()
        .write(true)
        .custom_flags(O_DIRECT)
        .open(TESTFILE);

    match res {
        Ok(_) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EINVAL) => {
            info!("O_DIRECT not supported by this mount ({}), accepted", e);
            Ok(())
        }
        Err(e) => Err(e).op(format!("open {} with O_WRONLY|O_DIRECT", TESTFILE)),
    }
}

pub fn excl_create(ctx: &mut CaseContext<'_>) -> CaseResult {
    ctx.artifacts.file(TESTFILE);
    match std::fs::remove_file(TESTFILE) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            return Err(e).op(format!("remove {}", TESTFILE));
        }
        _ => {}
    }

    open_testfile(
        OpenOptions::new().write(true).create_new(true),
        "O_WRONLY|O_EXCL|O_CREAT",
    )?;
    ensure!(
        std::path::Path::new(TESTFILE).is_file(),
        "{} missing after exclusive create",
        TESTFILE
    );
    Ok(())
}

/// Exclusive create over an existing name must fail with EEXIST
pub fn excl_open(ctx: &mut CaseContext<'_>) -> CaseResult {
    write_fixture(ctx, TESTFILE, b"")?;

    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(TESTFILE)
    {
        Err(e) if e.raw_os_error() == Some(libc::EEXIST) => {
            info!("File already exists. Expected.");
            Ok(())
        }
        Err(e) => Err(e).op(format!("open {} with O_WRONLY|O_EXCL|O_CREAT", TESTFILE)),
        Ok(_) => Err(CaseError::Assertion(
            "open with O_EXCL|O_CREAT on an existing file didn't fail".to_string(),
        )),
    }
}
