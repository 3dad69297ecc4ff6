//! Zip archives as content generators
//!
//! The archive library is only a way to produce files with a realistic write
//! pattern (seek back, rewrite the central directory) on the mount under
//! test; its own behavior is not what is being checked.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use log::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::write_fixture;
use crate::case::CaseContext;
use crate::error::{CaseResult, OsResultExt};
use crate::{ensure, ensure_eq};

pub const ARCHIVE: &str = "foo.zip";

/// Member files and their contents
pub const MEMBERS: [(&str, &str); 3] = [
    ("foo", "Linux CIFS VFS client"),
    ("bar", "A quick brown fox jumped"),
    ("baz", "Some random text"),
];

fn member_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
}

/// Create `archive` holding the named files from the current directory
pub fn write_archive(archive: &Path, members: &[&str]) -> CaseResult {
    let file = File::create(archive).op(format!("create {}", archive.display()))?;
    let mut writer = ZipWriter::new(file);
    add_members(&mut writer, members)?;
    writer.finish()?;
    Ok(())
}

/// Add the named files to an existing `archive`
pub fn append_to_archive(archive: &Path, members: &[&str]) -> CaseResult {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(archive)
        .op(format!("open {} for append", archive.display()))?;
    let mut writer = ZipWriter::new_append(file)?;
    add_members(&mut writer, members)?;
    writer.finish()?;
    Ok(())
}

fn add_members<W: io::Write + io::Seek>(writer: &mut ZipWriter<W>, members: &[&str]) -> CaseResult {
    for name in members {
        debug!("Adding {} to archive", name);
        let mut source = File::open(name).op(format!("open {}", name))?;
        writer.start_file(*name, member_options())?;
        io::copy(&mut source, writer).op(format!("copy {} into archive", name))?;
    }
    Ok(())
}

/// Names stored in `archive`; fails if it is not a well-formed zip file
pub fn archive_members(archive: &Path) -> CaseResult<BTreeSet<String>> {
    let file = File::open(archive).op(format!("open {}", archive.display()))?;
    let zip = ZipArchive::new(file)?;
    Ok(zip.file_names().map(str::to_string).collect())
}

fn write_members(ctx: &mut CaseContext<'_>) -> CaseResult {
    for (name, content) in MEMBERS {
        write_fixture(ctx, name, content.as_bytes())?;
    }
    Ok(())
}

/// Build a two-member archive, check it, append a third member, check again
pub fn zip_archive(ctx: &mut CaseContext<'_>) -> CaseResult {
    write_members(ctx)?;
    ctx.artifacts.file(ARCHIVE);
    let archive = Path::new(ARCHIVE);

    info!("Creating {} with foo and bar", ARCHIVE);
    write_archive(archive, &["foo", "bar"])?;
    let members = archive_members(archive)?;
    ensure_eq!(
        members,
        BTreeSet::from(["bar".to_string(), "foo".to_string()]),
        "members after create"
    );

    info!("Appending baz to {}", ARCHIVE);
    append_to_archive(archive, &["baz"])?;
    let members = archive_members(archive)?;
    let expected: BTreeSet<String> = MEMBERS.iter().map(|(n, _)| n.to_string()).collect();
    ensure_eq!(members, expected, "members after append");
    Ok(())
}

/// Digest a generated archive by relative path, then again by absolute path
/// from the scratch directory; both digests must match
pub fn checksum(ctx: &mut CaseContext<'_>) -> CaseResult {
    use crate::fixture::CwdGuard;

    write_members(ctx)?;
    ctx.artifacts.file(ARCHIVE);
    write_archive(Path::new(ARCHIVE), &["foo", "bar", "baz"])?;

    let kind = ctx.config.digest;
    let relative = digest_file(Path::new(ARCHIVE), kind).op(format!("digest {}", ARCHIVE))?;

    let workdir = std::env::current_dir().op("getcwd")?;
    let absolute_path = workdir.join(ARCHIVE);
    let scratch = &ctx.config.scratch_dir;
    ensure!(
        scratch.is_dir(),
        "scratch directory {} is not a directory",
        scratch.display()
    );

    let absolute = {
        let _cwd = CwdGuard::change_to(scratch).op(format!("chdir {}", scratch.display()))?;
        digest_file(&absolute_path, kind).op(format!("digest {}", absolute_path.display()))?
    };

    debug!("{:?} digest {} / {}", kind, relative, absolute);
    ensure_eq!(relative, absolute, "digest by relative and absolute path");
    Ok(())
}

/// Hex digest of the file at `path`, read in 8096-byte chunks
#[cfg(feature = "checksum")]
pub fn digest_file(path: &Path, kind: crate::config::DigestKind) -> io::Result<String> {
    use crate::config::DigestKind;

    match kind {
        DigestKind::Md5 => hex_digest::<md5::Md5>(path),
        DigestKind::Sha256 => hex_digest::<sha2::Sha256>(path),
    }
}

#[cfg(feature = "checksum")]
fn hex_digest<D: sha2::Digest>(path: &Path) -> io::Result<String> {
    use std::io::Read;

    let mut file = File::open(path)?;
    let mut hasher = D::new();
    let mut buf = [0u8; 8096];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(not(feature = "checksum"))]
pub fn digest_file(_path: &Path, _kind: crate::config::DigestKind) -> io::Result<String> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "built without the checksum feature",
    ))
}
