pub mod acl;
pub mod capability;
pub mod case;
pub mod cases;
pub mod cli;
pub mod config;
pub mod error;
pub mod fixture;
pub mod process;
pub mod suite;

pub use capability::{Capabilities, Capability};
pub use case::{Case, CaseContext, CaseOutcome};
pub use config::{DigestKind, SuiteConfig};
pub use error::{CaseError, CaseResult, HarnessError, OsResultExt};
pub use fixture::{Artifacts, CwdGuard, SuiteDir};
pub use suite::{CaseReport, Suite, SuiteReport};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
