//! A single black-box check and its outcome

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use log::debug;

use crate::capability::{Capabilities, Capability};
use crate::config::SuiteConfig;
use crate::error::CaseResult;
use crate::fixture::Artifacts;

/// Body of a case
pub type CaseFn = fn(&mut CaseContext<'_>) -> CaseResult;

/// Everything a case body may use
///
/// `artifacts` is dropped right after the body returns, which removes every
/// registered fixture whatever the outcome.
pub struct CaseContext<'a> {
    pub config: &'a SuiteConfig,
    pub caps: &'a Capabilities,
    pub artifacts: Artifacts,
}

impl<'a> CaseContext<'a> {
    pub fn new(config: &'a SuiteConfig, caps: &'a Capabilities) -> Self {
        Self {
            config,
            caps,
            artifacts: Artifacts::new(),
        }
    }
}

/// A named check, the capabilities it needs and its body
#[derive(Clone, Copy)]
pub struct Case {
    pub name: &'static str,
    pub description: &'static str,
    pub requires: &'static [Capability],
    pub body: CaseFn,
}

impl Case {
    pub const fn new(name: &'static str, description: &'static str, body: CaseFn) -> Self {
        Self {
            name,
            description,
            requires: &[],
            body,
        }
    }

    pub const fn requires(mut self, caps: &'static [Capability]) -> Self {
        self.requires = caps;
        self
    }

    /// Run the case once: skip it if a capability is missing, otherwise run
    /// the body, tear its fixtures down and classify the result.
    pub fn run(&self, config: &SuiteConfig, caps: &Capabilities) -> CaseOutcome {
        if let Some(cap) = caps.missing(self.requires) {
            return CaseOutcome::Skipped(format!("requires {}", cap));
        }

        let mut ctx = CaseContext::new(config, caps);
        let result = panic::catch_unwind(AssertUnwindSafe(|| (self.body)(&mut ctx)));
        debug!(
            "Tearing down {} ({} artifacts)",
            self.name,
            ctx.artifacts.len()
        );
        drop(ctx);

        match result {
            Ok(Ok(())) => CaseOutcome::Passed,
            Ok(Err(e)) if e.is_assertion() => CaseOutcome::Failed(e.to_string()),
            Ok(Err(e)) => CaseOutcome::Errored(e.to_string()),
            Err(payload) => CaseOutcome::Errored(format!("panicked: {}", panic_message(&*payload))),
        }
    }
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("requires", &self.requires)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    /// A required capability is unavailable
    Skipped(String),
    /// Observed value differed from the expected one
    Failed(String),
    /// Unexpected OS error, child failure or panic
    Errored(String),
    /// Excluded by the name filter
    NotSelected,
}

impl CaseOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CaseOutcome::Failed(_) | CaseOutcome::Errored(_))
    }

    /// Failure detail, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            CaseOutcome::Failed(msg) | CaseOutcome::Errored(msg) => Some(msg),
            _ => None,
        }
    }
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseOutcome::Passed => f.write_str("ok"),
            CaseOutcome::Skipped(reason) => write!(f, "skipped '{}'", reason),
            CaseOutcome::Failed(_) => f.write_str("FAIL"),
            CaseOutcome::Errored(_) => f.write_str("ERROR"),
            CaseOutcome::NotSelected => f.write_str("not selected"),
        }
    }
}
