use std::fs;

use netfs_regress_lib::{
    Capability, Case, CaseContext, CaseError, CaseOutcome, CaseResult, HarnessError, Suite,
    SuiteConfig,
};
use serial_test::serial;

use crate::common::ScratchHarness;

/// Host-independent configuration: xattr and ACL support depend on the
/// filesystem backing the temp directory, so those cases are exercised
/// separately
fn portable(harness: ScratchHarness) -> ScratchHarness {
    harness.configure(|config| config.disable = vec![Capability::Xattr, Capability::PosixAcl])
}

#[test]
#[serial]
fn test_full_run_passes_and_cleans_up() {
    let harness = portable(ScratchHarness::new().unwrap());
    let before = std::env::current_dir().unwrap();

    let suite = Suite::new(harness.config().clone());
    let report = suite.run().unwrap();

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.ran(), netfs_regress_lib::cases::all().len());
    assert_eq!(report.failed() + report.errored(), 0);
    for name in ["file_xattr", "dir_xattr", "file_posix_acl", "dir_posix_acl"] {
        assert!(matches!(report.get(name).unwrap().outcome, CaseOutcome::Skipped(_)));
    }
    assert_eq!(report.get("create").unwrap().outcome, CaseOutcome::Passed);

    assert_eq!(std::env::current_dir().unwrap(), before);
    assert!(!harness.workdir().exists());
    assert_eq!(fs::read_dir(harness.base()).unwrap().count(), 0);
}

#[test]
#[serial]
fn test_leftover_workdir_is_replaced() {
    let harness = portable(ScratchHarness::new().unwrap());
    fs::create_dir_all(harness.workdir().join("1")).unwrap();
    fs::write(harness.workdir().join("testfile"), b"stale").unwrap();

    let report = Suite::new(harness.config().clone())
        .filter(vec!["cache_consistency".into(), "excl_create".into()])
        .run()
        .unwrap();

    assert!(report.is_success(), "{}", report);
    assert!(!harness.workdir().exists());
}

#[test]
#[serial]
fn test_filter_runs_matching_cases_only() {
    let harness = portable(ScratchHarness::new().unwrap());
    let report = Suite::new(harness.config().clone())
        .filter(vec!["largefile".into()])
        .run()
        .unwrap();

    assert_eq!(report.ran(), 2);
    assert_eq!(
        report.get("largefile").unwrap().outcome,
        CaseOutcome::Passed
    );
    assert_eq!(
        report.get("largefile_truncate").unwrap().outcome,
        CaseOutcome::Passed
    );
    assert_eq!(
        report.get("create").unwrap().outcome,
        CaseOutcome::NotSelected
    );
    assert!(!report.to_string().contains("create ("));
}

#[test]
#[serial]
fn test_unusable_base_is_fatal() {
    let harness = ScratchHarness::new().unwrap();
    let mut config = harness.config().clone();
    config.base_dir = Some(harness.base().join("not/mounted"));

    match Suite::new(config).run() {
        Err(HarnessError::WorkDir { path, .. }) => {
            assert!(path.ends_with("not/mounted/cifstests"))
        }
        other => panic!(
            "expected a working directory error, got {:?}",
            other.map(|r| r.to_string())
        ),
    }
}

fn leaves_debris(ctx: &mut CaseContext<'_>) -> CaseResult {
    ctx.artifacts.file("debris");
    fs::write("debris", b"x").map_err(|source| CaseError::Os {
        op: "write debris".to_string(),
        source,
    })?;
    std::env::set_current_dir("/").map_err(|source| CaseError::Os {
        op: "chdir /".to_string(),
        source,
    })?;
    Err(CaseError::Assertion("debris mismatch".to_string()))
}

fn panics(_ctx: &mut CaseContext<'_>) -> CaseResult {
    panic!("boom");
}

fn checks_cwd(_ctx: &mut CaseContext<'_>) -> CaseResult {
    let cwd = std::env::current_dir().map_err(|source| CaseError::Os {
        op: "getcwd".to_string(),
        source,
    })?;
    if cwd.ends_with("cifstests") {
        Ok(())
    } else {
        Err(CaseError::Assertion(format!("running in {:?}", cwd)))
    }
}

#[test]
#[serial]
fn test_failures_do_not_stop_the_run() {
    let harness = ScratchHarness::new().unwrap();
    let suite = Suite::with_cases(
        harness.config().clone(),
        vec![
            Case::new("debris", "fails after wandering off", leaves_debris),
            Case::new("panics", "panics mid-case", panics),
            Case::new("cwd", "runs in the working directory", checks_cwd),
        ],
    );

    let report = suite.run().unwrap();
    assert_eq!(
        report.get("debris").unwrap().outcome,
        CaseOutcome::Failed("debris mismatch".to_string())
    );
    assert!(matches!(
        report.get("panics").unwrap().outcome,
        CaseOutcome::Errored(_)
    ));
    assert_eq!(report.get("cwd").unwrap().outcome, CaseOutcome::Passed);
    assert!(!report.is_success());
    assert!(report.to_string().contains("FAIL: debris (fails after wandering off)"));
    assert!(!harness.workdir().exists());
}

#[test]
#[serial]
fn test_config_file_drives_run() {
    let harness = ScratchHarness::new().unwrap();
    let config_path = harness.base().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "base_dir = {:?}\n\
             suite_dir = \"regress\"\n\
             cache_entries = 3\n\
             disable = [\"mmap\", \"xattr\", \"posix_acl\"]\n",
            harness.base()
        ),
    )
    .unwrap();

    let config = SuiteConfig::discover(Some(&config_path)).unwrap();
    assert_eq!(config.suite_dir, "regress");

    let report = Suite::new(config)
        .filter(vec!["cache".into(), "mmap".into()])
        .run()
        .unwrap();
    assert_eq!(
        report.get("cache_consistency").unwrap().outcome,
        CaseOutcome::Passed
    );
    assert_eq!(
        report.get("mmap_io").unwrap().outcome,
        CaseOutcome::Skipped("requires mmap".to_string())
    );
    assert!(!harness.base().join("regress").exists());
}
