//! Optional capability flags
//!
//! Some cases depend on bindings that are optional at build time (memory
//! mapping, digests, extended attributes) or on platform support (POSIX ACLs
//! travel through Linux-only xattr names). Availability is computed once
//! before the first case runs and never changes afterwards; a case whose
//! requirement is missing is skipped, not failed.

use std::fmt;

use clap::ValueEnum;
use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Memory-mapped file I/O
    Mmap,
    /// Content digests
    Hashing,
    /// Extended attributes
    Xattr,
    /// POSIX access control lists
    #[value(name = "posix_acl")]
    PosixAcl,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Mmap,
        Capability::Hashing,
        Capability::Xattr,
        Capability::PosixAcl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Mmap => "mmap",
            Capability::Hashing => "hashing",
            Capability::Xattr => "xattr",
            Capability::PosixAcl => "posix_acl",
        }
    }

    /// Whether the binding for this capability was compiled in and the
    /// platform can serve it
    pub fn compiled_in(self) -> bool {
        match self {
            Capability::Mmap => cfg!(feature = "mmap"),
            Capability::Hashing => cfg!(feature = "checksum"),
            Capability::Xattr => xattr_supported(),
            Capability::PosixAcl => xattr_supported() && cfg!(target_os = "linux"),
        }
    }
}

#[cfg(feature = "xattr")]
fn xattr_supported() -> bool {
    xattr::SUPPORTED_PLATFORM
}

#[cfg(not(feature = "xattr"))]
fn xattr_supported() -> bool {
    false
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only set of capability flags for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub mmap: bool,
    pub hashing: bool,
    pub xattr: bool,
    pub posix_acl: bool,
}

impl Capabilities {
    /// Detect every capability, forcing off the ones listed in `disabled`.
    ///
    /// Each absent capability is reported once at info level.
    pub fn detect(disabled: &[Capability]) -> Self {
        let mut caps = Self::none();
        for cap in Capability::ALL {
            let available = if disabled.contains(&cap) {
                info!(
                    "{} disabled by configuration, dependent cases will be skipped",
                    cap
                );
                false
            } else if !cap.compiled_in() {
                info!(
                    "{} support not available, dependent cases will be skipped",
                    cap
                );
                false
            } else {
                true
            };
            caps.set(cap, available);
        }
        caps
    }

    /// Every capability turned off
    pub fn none() -> Self {
        Self {
            mmap: false,
            hashing: false,
            xattr: false,
            posix_acl: false,
        }
    }

    pub fn is_available(&self, cap: Capability) -> bool {
        match cap {
            Capability::Mmap => self.mmap,
            Capability::Hashing => self.hashing,
            Capability::Xattr => self.xattr,
            Capability::PosixAcl => self.posix_acl,
        }
    }

    /// First capability in `required` that is not available
    pub fn missing(&self, required: &[Capability]) -> Option<Capability> {
        required
            .iter()
            .copied()
            .find(|cap| !self.is_available(*cap))
    }

    fn set(&mut self, cap: Capability, value: bool) {
        match cap {
            Capability::Mmap => self.mmap = value,
            Capability::Hashing => self.hashing = value,
            Capability::Xattr => self.xattr = value,
            Capability::PosixAcl => self.posix_acl = value,
        }
    }
}
