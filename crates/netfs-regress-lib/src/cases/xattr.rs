use crate::case::CaseContext;
use crate::error::CaseResult;

pub const FILE_ATTR: &str = "user.mime_type";
pub const FILE_ATTR_VAL: &str = "text/plain";
pub const DIR_ATTR: &str = "user.backup";
pub const DIR_ATTR_VAL: &str = "yes";

pub fn file_xattr(ctx: &mut CaseContext<'_>) -> CaseResult {
    use super::{write_fixture, TESTFILE};

    write_fixture(ctx, TESTFILE, b"")?;
    attr_round_trip(TESTFILE, FILE_ATTR, FILE_ATTR_VAL)
}

pub fn dir_xattr(ctx: &mut CaseContext<'_>) -> CaseResult {
    use std::fs::DirBuilder;
    use std::os::unix::fs::DirBuilderExt;

    use super::TESTDIR;
    use crate::error::OsResultExt;

    ctx.artifacts.dir(TESTDIR);
    DirBuilder::new()
        .mode(0o755)
        .create(TESTDIR)
        .op(format!("mkdir {}", TESTDIR))?;
    attr_round_trip(TESTDIR, DIR_ATTR, DIR_ATTR_VAL)
}

/// Set, get, list and remove one attribute on `path`
#[cfg(feature = "xattr")]
fn attr_round_trip(path: &str, name: &str, value: &str) -> CaseResult {
    use log::debug;

    use crate::error::OsResultExt;
    use crate::{ensure, ensure_eq};

    xattr::set(path, name, value.as_bytes()).op(format!("setxattr {} {}", path, name))?;

    let got = xattr::get(path, name).op(format!("getxattr {} {}", path, name))?;
    ensure_eq!(got.as_deref(), Some(value.as_bytes()), "attribute value");

    let names: Vec<_> = xattr::list(path)
        .op(format!("listxattr {}", path))?
        .collect();
    debug!("{} carries {:?}", path, names);
    ensure!(
        names.iter().any(|n| n == name),
        "{} missing from listxattr of {}: {:?}",
        name,
        path,
        names
    );

    xattr::remove(path, name).op(format!("removexattr {} {}", path, name))?;
    let after = xattr::get(path, name).op(format!("getxattr {} {}", path, name))?;
    ensure!(
        after.is_none(),
        "{} still present on {} after removal",
        name,
        path
    );
    Ok(())
}

#[cfg(not(feature = "xattr"))]
fn attr_round_trip(_path: &str, _name: &str, _value: &str) -> CaseResult {
    Err(crate::error::CaseError::Unsupported(
        crate::capability::Capability::Xattr,
    ))
}
