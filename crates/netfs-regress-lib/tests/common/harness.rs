//! Scratch-directory harness
//!
//! Gives each test a private base directory standing in for the mount under
//! test, enters a suite working directory inside it and tears both down
//! afterwards.

use std::io;
use std::path::{Path, PathBuf};

use netfs_regress_lib::{Capabilities, CaseOutcome, SuiteConfig, SuiteDir};
use tempfile::TempDir;

/// Core trait for all test harnesses
pub trait TestHarness {
    /// The context type that will be passed to test functions
    type Context<'a>
    where
        Self: 'a;

    /// Execute a test function with the harness context
    fn test_with<F, R>(&mut self, test_fn: F) -> R
    where
        F: FnOnce(Self::Context<'_>) -> R;

    /// Setup method called before test execution
    fn setup(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Teardown method called after test execution
    fn teardown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Harness owning a temporary base directory and, between setup and
/// teardown, the suite working directory inside it
pub struct ScratchHarness {
    base: TempDir,
    config: SuiteConfig,
    suite_dir: Option<SuiteDir>,
}

impl ScratchHarness {
    pub fn new() -> io::Result<Self> {
        init_logging();
        let base = tempfile::Builder::new().prefix("netfs-regress").tempdir()?;
        let config = SuiteConfig {
            base_dir: Some(base.path().to_path_buf()),
            ..SuiteConfig::default()
        };
        Ok(Self {
            base,
            config,
            suite_dir: None,
        })
    }

    /// Adjust the configuration before setup
    pub fn configure(mut self, f: impl FnOnce(&mut SuiteConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn base(&self) -> &Path {
        self.base.path()
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Path the suite working directory lives at
    pub fn workdir(&self) -> PathBuf {
        self.base.path().join(&self.config.suite_dir)
    }
}

impl TestHarness for ScratchHarness {
    type Context<'a> = ScratchContext<'a>;

    fn test_with<F, R>(&mut self, test_fn: F) -> R
    where
        F: FnOnce(Self::Context<'_>) -> R,
    {
        let workdir = self.workdir();
        let ctx = ScratchContext {
            base: self.base.path(),
            workdir,
            config: &self.config,
        };
        test_fn(ctx)
    }

    fn setup(&mut self) -> io::Result<()> {
        let dir = SuiteDir::enter(self.workdir()).map_err(io::Error::other)?;
        self.suite_dir = Some(dir);
        Ok(())
    }

    fn teardown(&mut self) -> io::Result<()> {
        if let Some(dir) = self.suite_dir.take() {
            dir.leave();
        }
        Ok(())
    }
}

/// Route the library's log output through the test writer; `RUST_LOG`
/// picks the level
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Context provided to scratch test functions
#[derive(Debug, Clone)]
pub struct ScratchContext<'a> {
    pub base: &'a Path,
    pub workdir: PathBuf,
    pub config: &'a SuiteConfig,
}

impl ScratchContext<'_> {
    /// Run one catalog case with every compiled-in capability enabled
    pub fn run_case(&self, name: &str) -> CaseOutcome {
        let case = netfs_regress_lib::cases::find(name)
            .unwrap_or_else(|| panic!("no case named {}", name));
        let caps = Capabilities::detect(&self.config.disable);
        case.run(self.config, &caps)
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use std::fs;
    use std::path::Path;

    use netfs_regress_lib::CaseOutcome;

    /// Assert that a case passed, showing its detail otherwise
    pub fn assert_passed(name: &str, outcome: &CaseOutcome) {
        assert_eq!(
            outcome,
            &CaseOutcome::Passed,
            "case {} did not pass: {:?}",
            name,
            outcome.detail()
        );
    }

    /// Assert that a directory holds no entries
    pub fn assert_dir_empty(dir: &Path) {
        let entries: Vec<_> = fs::read_dir(dir)
            .unwrap_or_else(|e| panic!("reading {}: {}", dir.display(), e))
            .filter_map(|e| e.ok().map(|e| e.file_name()))
            .collect();
        assert!(
            entries.is_empty(),
            "{} not empty: {:?}",
            dir.display(),
            entries
        );
    }

    /// Assert that a directory contains exactly the expected names
    pub fn assert_dir_contains(dir: &Path, expected_files: &[&str]) {
        let mut found: Vec<String> = fs::read_dir(dir)
            .unwrap_or_else(|e| panic!("reading {}: {}", dir.display(), e))
            .filter_map(|e| e.ok()?.file_name().into_string().ok())
            .collect();
        found.sort();
        let mut expected = expected_files.to_vec();
        expected.sort();
        assert_eq!(found, expected, "contents of {}", dir.display());
    }
}

/// Macro to simplify test harness usage
#[macro_export]
macro_rules! test_with_harness {
    ($harness:expr, |$ctx:ident| $body:expr) => {{
        let mut harness = $harness;
        harness.setup().expect("harness setup");
        let result = harness.test_with(|$ctx| $body);
        harness.teardown().expect("harness teardown");
        result
    }};
}
