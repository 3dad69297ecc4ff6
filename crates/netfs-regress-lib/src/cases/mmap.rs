use crate::case::CaseContext;
use crate::error::CaseResult;

/// Map the file, read its first line, remap writable and overwrite the
/// start; the write must be visible to a plain read afterwards
#[cfg(feature = "mmap")]
pub fn mmap_io(ctx: &mut CaseContext<'_>) -> CaseResult {
    use std::fs::{self, OpenOptions};

    use memmap2::{Mmap, MmapOptions};

    use super::{write_fixture, MORE_TESTDATA, TESTDATA, TESTFILE};
    use crate::error::OsResultExt;
    use crate::{ensure, ensure_eq};

    write_fixture(ctx, TESTFILE, TESTDATA.as_bytes())?;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(TESTFILE)
        .op(format!("open {} rb+", TESTFILE))?;
    let size = file.metadata().op(format!("fstat {}", TESTFILE))?.len() as usize;
    ensure!(
        size >= MORE_TESTDATA.len(),
        "{} too small to map: {} bytes",
        TESTFILE,
        size
    );

    {
        // SAFETY: the file is private to this case and not resized while mapped
        let map = unsafe { Mmap::map(&file) }.op(format!("mmap {} read", TESTFILE))?;
        let line = map.split(|b| *b == b'\n').next().unwrap_or(&[]);
        ensure_eq!(line, TESTDATA.as_bytes(), "first mapped line");
    }

    {
        // SAFETY: as above
        let mut map = unsafe { MmapOptions::new().len(size).map_mut(&file) }
            .op(format!("mmap {} write", TESTFILE))?;
        map[..MORE_TESTDATA.len()].copy_from_slice(MORE_TESTDATA.as_bytes());
        map.flush().op("msync")?;
    }
    drop(file);

    let content = fs::read(TESTFILE).op(format!("read {}", TESTFILE))?;
    let mut expected = MORE_TESTDATA.as_bytes().to_vec();
    expected.extend_from_slice(&TESTDATA.as_bytes()[MORE_TESTDATA.len()..]);
    ensure_eq!(content, expected, "file content after mapped write");
    Ok(())
}

#[cfg(not(feature = "mmap"))]
pub fn mmap_io(_ctx: &mut CaseContext<'_>) -> CaseResult {
    Err(crate::error::CaseError::Unsupported(
        crate::capability::Capability::Mmap,
    ))
}
