//! Suite runner
//!
//! Detects capabilities, enters a fresh working directory, runs every
//! selected case once in order and leaves the directory again. One case
//! failing never stops the following ones.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::capability::Capabilities;
use crate::case::{Case, CaseOutcome};
use crate::cases;
use crate::config::SuiteConfig;
use crate::error::HarnessError;
use crate::fixture::SuiteDir;

pub struct Suite {
    config: SuiteConfig,
    cases: Vec<Case>,
    filters: Vec<String>,
}

impl Suite {
    /// The full catalog with the given configuration
    pub fn new(config: SuiteConfig) -> Self {
        Self::with_cases(config, cases::all())
    }

    pub fn with_cases(config: SuiteConfig, cases: Vec<Case>) -> Self {
        Self {
            config,
            cases,
            filters: Vec::new(),
        }
    }

    /// Only run cases whose name contains one of `patterns`; an empty list
    /// selects everything
    pub fn filter(mut self, patterns: Vec<String>) -> Self {
        self.filters = patterns;
        self
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn selects(&self, case: &Case) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| case.name.contains(f.as_str()))
    }

    /// Absolute path of the working directory this suite will use
    pub fn working_dir(&self) -> Result<PathBuf, HarnessError> {
        Ok(self.config.working_dir()?)
    }

    /// Run the suite
    ///
    /// # Errors
    /// Only fatal harness failures are returned; case failures end up in the
    /// report.
    pub fn run(&self) -> Result<SuiteReport, HarnessError> {
        let caps = Capabilities::detect(&self.config.disable);
        let workdir = self.working_dir()?;

        let suite_dir = SuiteDir::enter(workdir)?;
        let report = self.run_cases(&suite_dir, &caps);
        suite_dir.leave();

        Ok(report)
    }

    fn run_cases(&self, suite_dir: &SuiteDir, caps: &Capabilities) -> SuiteReport {
        let started = Instant::now();
        let home = std::fs::canonicalize(suite_dir.path()).ok();
        let mut reports = Vec::with_capacity(self.cases.len());

        for case in &self.cases {
            if !self.selects(case) {
                reports.push(CaseReport::new(case, CaseOutcome::NotSelected, Duration::ZERO));
                continue;
            }

            info!("Running {} ({})", case.name, case.description);
            let case_started = Instant::now();
            let outcome = case.run(&self.config, caps);
            let elapsed = case_started.elapsed();
            info!("{} ... {}", case.name, outcome);

            if std::env::current_dir().ok() != home {
                warn!("{} left the working directory, changing back", case.name);
                if let Err(e) = std::env::set_current_dir(suite_dir.path()) {
                    warn!("Failed to change back to {:?}: {}", suite_dir.path(), e);
                }
            }

            reports.push(CaseReport::new(case, outcome, elapsed));
        }

        SuiteReport {
            cases: reports,
            elapsed: started.elapsed(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseReport {
    pub name: &'static str,
    pub description: &'static str,
    pub outcome: CaseOutcome,
    pub elapsed: Duration,
}

impl CaseReport {
    fn new(case: &Case, outcome: CaseOutcome, elapsed: Duration) -> Self {
        Self {
            name: case.name,
            description: case.description,
            outcome,
            elapsed,
        }
    }
}

/// Per-case outcomes of one run, in run order
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    pub elapsed: Duration,
}

impl SuiteReport {
    pub fn get(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }

    fn count(&self, pred: impl Fn(&CaseOutcome) -> bool) -> usize {
        self.cases.iter().filter(|c| pred(&c.outcome)).count()
    }

    /// Selected cases, skipped ones included
    pub fn ran(&self) -> usize {
        self.count(|o| *o != CaseOutcome::NotSelected)
    }

    pub fn passed(&self) -> usize {
        self.count(|o| *o == CaseOutcome::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Failed(_)))
    }

    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Errored(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, CaseOutcome::Skipped(_)))
    }

    /// True when no case failed or errored
    pub fn is_success(&self) -> bool {
        self.cases.iter().all(|c| !c.outcome.is_failure())
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            if case.outcome == CaseOutcome::NotSelected {
                continue;
            }
            writeln!(
                f,
                "{} ({}) ... {}",
                case.name, case.description, case.outcome
            )?;
        }

        for case in self.cases.iter().filter(|c| c.outcome.is_failure()) {
            writeln!(f)?;
            writeln!(f, "{}", "=".repeat(70))?;
            writeln!(f, "{}: {} ({})", case.outcome, case.name, case.description)?;
            writeln!(f, "{}", "-".repeat(70))?;
            writeln!(f, "{}", case.outcome.detail().unwrap_or(""))?;
        }

        writeln!(f, "{}", "-".repeat(70))?;
        write!(
            f,
            "Ran {} cases in {:.3}s: {} passed, {} failed, {} errors, {} skipped",
            self.ran(),
            self.elapsed.as_secs_f64(),
            self.passed(),
            self.failed(),
            self.errored(),
            self.skipped()
        )
    }
}
