use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;

use log::debug;

use crate::case::CaseContext;
use crate::ensure_eq;
use crate::error::{CaseResult, OsResultExt};
use crate::fixture::Artifacts;

/// Create, remove and recreate the configured number of numbered
/// directories; a stale directory cache shows up as differing listings.
pub fn cache_consistency(ctx: &mut CaseContext<'_>) -> CaseResult {
    let count = ctx.config.cache_entries;
    recreate_and_compare(count, &mut ctx.artifacts)
}

/// Run the create/remove/recreate cycle for directories `1..=count` in the
/// current directory
pub fn recreate_and_compare(count: u32, artifacts: &mut Artifacts) -> CaseResult {
    for i in 1..=count {
        artifacts.dir(i.to_string());
    }

    make_dirs(count)?;
    let first = listing()?;

    for i in 1..=count {
        fs::remove_dir(i.to_string()).op(format!("rmdir {}", i))?;
    }

    make_dirs(count)?;
    let second = listing()?;
    debug!("Listing holds {} entries after recreate", second.len());

    ensure_eq!(
        first,
        second,
        "directory listing not consistent, perhaps stale cache data?"
    );
    Ok(())
}

fn make_dirs(count: u32) -> CaseResult {
    for i in 1..=count {
        fs::create_dir(i.to_string()).op(format!("mkdir {}", i))?;
    }
    Ok(())
}

fn listing() -> CaseResult<BTreeSet<OsString>> {
    fs::read_dir(".")
        .and_then(|entries| {
            entries
                .map(|entry| entry.map(|e| e.file_name()))
                .collect::<Result<BTreeSet<_>, _>>()
        })
        .op("list working directory")
}
