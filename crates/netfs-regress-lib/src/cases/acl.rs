use std::fs::{DirBuilder, File};
use std::os::unix::fs::DirBuilderExt;

use super::{TESTDIR, TESTFILE};
use crate::case::CaseContext;
use crate::error::{CaseResult, OsResultExt};

pub const FACL_TO_SET: &str = "u::rx,g::-,o::-";
pub const DACL_TO_SET: &str = "u::rwx,g::-,o::-";

/// Apply an ACL to a file held open for writing and read it back
pub fn file_posix_acl(ctx: &mut CaseContext<'_>) -> CaseResult {
    ctx.artifacts.file(TESTFILE);
    let _open = File::create(TESTFILE).op(format!("create {}", TESTFILE))?;
    apply_and_read(TESTFILE, FACL_TO_SET)
}

pub fn dir_posix_acl(ctx: &mut CaseContext<'_>) -> CaseResult {
    ctx.artifacts.dir(TESTDIR);
    DirBuilder::new()
        .mode(0o755)
        .create(TESTDIR)
        .op(format!("mkdir {}", TESTDIR))?;
    apply_and_read(TESTDIR, DACL_TO_SET)
}

#[cfg(feature = "xattr")]
fn apply_and_read(path: &str, text: &str) -> CaseResult {
    use log::debug;

    use crate::acl::{Acl, AclError};
    use crate::error::CaseError;

    let to_os = |op: String, e: AclError| match e {
        AclError::Io(source) => CaseError::Os { op, source },
        other => CaseError::Assertion(format!("{}: {}", op, other)),
    };

    let acl = Acl::from_text(text).map_err(|e| to_os(format!("parse ACL {:?}", text), e))?;
    acl.apply_to(path)
        .op(format!("set ACL {} on {}", acl, path))?;

    let got = Acl::from_file(path).map_err(|e| to_os(format!("get ACL of {}", path), e))?;
    debug!("{} now carries ACL {}", path, got);
    Ok(())
}

#[cfg(not(feature = "xattr"))]
fn apply_and_read(_path: &str, _text: &str) -> CaseResult {
    Err(crate::error::CaseError::Unsupported(
        crate::capability::Capability::PosixAcl,
    ))
}
