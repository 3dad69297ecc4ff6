use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::capability::Capability;

/// Errors that end a single case
#[derive(Error, Debug)]
pub enum CaseError {
    #[error("{op} failed: {source}")]
    Os {
        op: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Assertion(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("child process failed: {0}")]
    Child(String),

    #[error("{0} support is not compiled in")]
    Unsupported(Capability),
}

impl CaseError {
    /// Raw errno of the underlying OS failure, if any
    pub fn errno(&self) -> Option<i32> {
        match self {
            CaseError::Os { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// True when the case observed a wrong value rather than hitting an error
    pub fn is_assertion(&self) -> bool {
        matches!(self, CaseError::Assertion(_))
    }
}

/// Result type for case bodies
pub type CaseResult<T = ()> = Result<T, CaseError>;

/// Errors that abort the whole run
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("cannot prepare working directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Extension trait attaching the failing operation to an OS result
pub trait OsResultExt<T> {
    /// Convert into a `CaseResult`, naming the operation that failed
    fn op(self, op: impl Into<String>) -> CaseResult<T>;
}

impl<T> OsResultExt<T> for io::Result<T> {
    fn op(self, op: impl Into<String>) -> CaseResult<T> {
        self.map_err(|source| CaseError::Os {
            op: op.into(),
            source,
        })
    }
}

impl<T> OsResultExt<T> for nix::Result<T> {
    fn op(self, op: impl Into<String>) -> CaseResult<T> {
        self.map_err(|errno| CaseError::Os {
            op: op.into(),
            source: io::Error::from(errno),
        })
    }
}

/// Fail the current case with an assertion error unless `cond` holds
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)+) => {
        if !$cond {
            return Err($crate::error::CaseError::Assertion(format!($($msg)+)));
        }
    };
}

/// Fail the current case with an assertion error unless both sides are equal
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr, $($msg:tt)+) => {
        match (&$left, &$right) {
            (left, right) => {
                if left != right {
                    return Err($crate::error::CaseError::Assertion(format!(
                        "{}: `{:?}` != `{:?}`",
                        format!($($msg)+),
                        left,
                        right
                    )));
                }
            }
        }
    };
}
