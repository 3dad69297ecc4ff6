//! POSIX access control lists
//!
//! Linux stores the access ACL of an inode in the `system.posix_acl_access`
//! extended attribute: a little-endian `u32` version header followed by one
//! `(u16 tag, u16 perm, u32 id)` record per entry. This module converts
//! between that layout and the text form accepted by `setfacl`
//! (`u::rx,g::-,o::-`, `user:1000:rw-`, ...).

use std::fmt;
#[cfg(feature = "xattr")]
use std::path::Path;

use nix::unistd::{Group, User};
use thiserror::Error;

/// Name of the xattr carrying the access ACL
pub const ACCESS_XATTR: &str = "system.posix_acl_access";

const XATTR_VERSION: u32 = 2;
const UNDEFINED_ID: u32 = u32::MAX;

const TAG_USER_OBJ: u16 = 0x01;
const TAG_USER: u16 = 0x02;
const TAG_GROUP_OBJ: u16 = 0x04;
const TAG_GROUP: u16 = 0x08;
const TAG_MASK: u16 = 0x10;
const TAG_OTHER: u16 = 0x20;

#[derive(Error, Debug)]
pub enum AclError {
    #[error("malformed ACL entry: {0:?}")]
    InvalidEntry(String),

    #[error("unknown ACL tag: {0:?}")]
    UnknownTag(String),

    #[error("invalid permissions: {0:?}")]
    InvalidPerm(String),

    #[error("unknown user: {0:?}")]
    UnknownUser(String),

    #[error("unknown group: {0:?}")]
    UnknownGroup(String),

    #[error("duplicate ACL entry: {0}")]
    Duplicate(String),

    #[error("ACL is missing the {0} entry")]
    Missing(&'static str),

    #[error("malformed ACL xattr: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Entry tag; the derived ordering is the order the kernel requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AclTag {
    UserObj,
    User(u32),
    GroupObj,
    Group(u32),
    Mask,
    Other,
}

impl AclTag {
    fn code(self) -> (u16, u32) {
        match self {
            AclTag::UserObj => (TAG_USER_OBJ, UNDEFINED_ID),
            AclTag::User(uid) => (TAG_USER, uid),
            AclTag::GroupObj => (TAG_GROUP_OBJ, UNDEFINED_ID),
            AclTag::Group(gid) => (TAG_GROUP, gid),
            AclTag::Mask => (TAG_MASK, UNDEFINED_ID),
            AclTag::Other => (TAG_OTHER, UNDEFINED_ID),
        }
    }

    fn from_code(tag: u16, id: u32) -> Result<Self, AclError> {
        match tag {
            TAG_USER_OBJ => Ok(AclTag::UserObj),
            TAG_USER => Ok(AclTag::User(id)),
            TAG_GROUP_OBJ => Ok(AclTag::GroupObj),
            TAG_GROUP => Ok(AclTag::Group(id)),
            TAG_MASK => Ok(AclTag::Mask),
            TAG_OTHER => Ok(AclTag::Other),
            other => Err(AclError::Malformed(format!("unknown tag {:#x}", other))),
        }
    }
}

/// Permission bits of one entry (`r` = 4, `w` = 2, `x` = 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Perm(u8);

impl Perm {
    pub const READ: Perm = Perm(4);
    pub const WRITE: Perm = Perm(2);
    pub const EXECUTE: Perm = Perm(1);
    pub const NONE: Perm = Perm(0);

    pub fn from_bits(bits: u8) -> Self {
        Perm(bits & 0o7)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Perm) -> bool {
        self.0 & other.0 == other.0
    }

    fn parse(text: &str) -> Result<Self, AclError> {
        let mut bits = 0u8;
        for c in text.chars() {
            let bit = match c {
                'r' => 4,
                'w' => 2,
                'x' => 1,
                '-' => continue,
                _ => return Err(AclError::InvalidPerm(text.to_string())),
            };
            if bits & bit != 0 {
                return Err(AclError::InvalidPerm(text.to_string()));
            }
            bits |= bit;
        }
        if text.is_empty() {
            return Err(AclError::InvalidPerm(text.to_string()));
        }
        Ok(Perm(bits))
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |p: Perm, c: char| if self.contains(p) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(Perm::READ, 'r'),
            flag(Perm::WRITE, 'w'),
            flag(Perm::EXECUTE, 'x')
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclEntry {
    pub tag: AclTag,
    pub perm: Perm,
}

impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            AclTag::UserObj => write!(f, "user::{}", self.perm),
            AclTag::User(uid) => write!(f, "user:{}:{}", uid, self.perm),
            AclTag::GroupObj => write!(f, "group::{}", self.perm),
            AclTag::Group(gid) => write!(f, "group:{}:{}", gid, self.perm),
            AclTag::Mask => write!(f, "mask::{}", self.perm),
            AclTag::Other => write!(f, "other::{}", self.perm),
        }
    }
}

/// A validated access ACL, entries kept in kernel order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    entries: Vec<AclEntry>,
}

impl Acl {
    /// Parse the short or long text form, entries separated by commas or
    /// newlines. Named qualifiers may be numeric ids or account names.
    pub fn from_text(text: &str) -> Result<Self, AclError> {
        let mut entries = Vec::new();

        for raw in text.split([',', '\n']) {
            let raw = raw.split('#').next().unwrap_or("").trim();
            if raw.is_empty() {
                continue;
            }
            entries.push(parse_entry(raw)?);
        }

        Self::from_entries(entries)
    }

    /// Build an ACL from arbitrary entries, sorting and validating them
    pub fn from_entries(mut entries: Vec<AclEntry>) -> Result<Self, AclError> {
        entries.sort_by_key(|e| e.tag);

        for pair in entries.windows(2) {
            if pair[0].tag == pair[1].tag {
                return Err(AclError::Duplicate(pair[0].to_string()));
            }
        }

        let has = |pred: fn(&AclTag) -> bool| entries.iter().any(|e| pred(&e.tag));
        if !has(|t| *t == AclTag::UserObj) {
            return Err(AclError::Missing("user::"));
        }
        if !has(|t| *t == AclTag::GroupObj) {
            return Err(AclError::Missing("group::"));
        }
        if !has(|t| *t == AclTag::Other) {
            return Err(AclError::Missing("other::"));
        }
        let named = has(|t| matches!(t, AclTag::User(_) | AclTag::Group(_)));
        if named && !has(|t| *t == AclTag::Mask) {
            return Err(AclError::Missing("mask::"));
        }

        Ok(Self { entries })
    }

    /// The minimal ACL equivalent to the permission bits of `mode`
    pub fn from_mode(mode: u32) -> Self {
        let perm = |shift: u32| Perm::from_bits(((mode >> shift) & 0o7) as u8);
        Self {
            entries: vec![
                AclEntry {
                    tag: AclTag::UserObj,
                    perm: perm(6),
                },
                AclEntry {
                    tag: AclTag::GroupObj,
                    perm: perm(3),
                },
                AclEntry {
                    tag: AclTag::Other,
                    perm: perm(0),
                },
            ],
        }
    }

    pub fn entries(&self) -> &[AclEntry] {
        &self.entries
    }

    /// True when the ACL carries nothing beyond the mode bits
    pub fn is_minimal(&self) -> bool {
        self.entries.len() == 3
    }

    /// Permission bits the ACL implies for the file mode
    pub fn mode_bits(&self) -> u32 {
        let perm_of = |tag: AclTag| {
            self.entries
                .iter()
                .find(|e| e.tag == tag)
                .map(|e| e.perm.bits() as u32)
                .unwrap_or(0)
        };
        // With a mask present the group class bits mirror the mask
        let group = if self.entries.iter().any(|e| e.tag == AclTag::Mask) {
            perm_of(AclTag::Mask)
        } else {
            perm_of(AclTag::GroupObj)
        };
        (perm_of(AclTag::UserObj) << 6) | (group << 3) | perm_of(AclTag::Other)
    }

    /// Encode in the `system.posix_acl_access` layout
    pub fn to_xattr(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 8 * self.entries.len());
        buf.extend_from_slice(&XATTR_VERSION.to_le_bytes());
        for entry in &self.entries {
            let (tag, id) = entry.tag.code();
            buf.extend_from_slice(&tag.to_le_bytes());
            buf.extend_from_slice(&(entry.perm.bits() as u16).to_le_bytes());
            buf.extend_from_slice(&id.to_le_bytes());
        }
        buf
    }

    /// Decode the `system.posix_acl_access` layout
    pub fn from_xattr(data: &[u8]) -> Result<Self, AclError> {
        if data.len() < 4 || (data.len() - 4) % 8 != 0 {
            return Err(AclError::Malformed(format!("length {}", data.len())));
        }

        let version = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if version != XATTR_VERSION {
            return Err(AclError::Malformed(format!("version {}", version)));
        }

        let entries = data[4..]
            .chunks_exact(8)
            .map(|rec| {
                let tag = u16::from_le_bytes([rec[0], rec[1]]);
                let perm = u16::from_le_bytes([rec[2], rec[3]]);
                let id = u32::from_le_bytes([rec[4], rec[5], rec[6], rec[7]]);
                Ok(AclEntry {
                    tag: AclTag::from_code(tag, id)?,
                    perm: Perm::from_bits(perm as u8),
                })
            })
            .collect::<Result<Vec<_>, AclError>>()?;

        Self::from_entries(entries)
    }

    /// Long text form, e.g. `user::r-x,group::---,other::---`
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Set this ACL as the access ACL of `path`
    #[cfg(feature = "xattr")]
    pub fn apply_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        xattr::set(path.as_ref(), ACCESS_XATTR, &self.to_xattr())
    }

    /// Read the access ACL of `path`
    ///
    /// The kernel drops the xattr when an ACL is equivalent to the mode bits,
    /// so a missing attribute yields the minimal ACL derived from the mode.
    #[cfg(feature = "xattr")]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AclError> {
        use std::os::unix::fs::MetadataExt;

        let path = path.as_ref();
        match xattr::get(path, ACCESS_XATTR)? {
            Some(data) => Self::from_xattr(&data),
            None => Ok(Self::from_mode(std::fs::metadata(path)?.mode())),
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl std::str::FromStr for Acl {
    type Err = AclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

fn parse_entry(raw: &str) -> Result<AclEntry, AclError> {
    let fields: Vec<&str> = raw.split(':').map(str::trim).collect();

    let (tag, qualifier, perm) = match fields.as_slice() {
        [tag, qualifier, perm] => (*tag, *qualifier, *perm),
        // `other` and `mask` may omit the empty qualifier
        [tag, perm] => (*tag, "", *perm),
        _ => return Err(AclError::InvalidEntry(raw.to_string())),
    };

    let tag = match (tag, qualifier) {
        ("u" | "user", "") => AclTag::UserObj,
        ("u" | "user", name) => AclTag::User(resolve_uid(name)?),
        ("g" | "group", "") => AclTag::GroupObj,
        ("g" | "group", name) => AclTag::Group(resolve_gid(name)?),
        ("m" | "mask", "") => AclTag::Mask,
        ("o" | "other", "") => AclTag::Other,
        ("m" | "mask" | "o" | "other", _) => {
            return Err(AclError::InvalidEntry(raw.to_string()));
        }
        (other, _) => return Err(AclError::UnknownTag(other.to_string())),
    };

    if fields.len() == 2 && !matches!(tag, AclTag::Mask | AclTag::Other) {
        return Err(AclError::InvalidEntry(raw.to_string()));
    }

    Ok(AclEntry {
        tag,
        perm: Perm::parse(perm)?,
    })
}

fn resolve_uid(name: &str) -> Result<u32, AclError> {
    if let Ok(uid) = name.parse::<u32>() {
        return Ok(uid);
    }
    match User::from_name(name) {
        Ok(Some(user)) => Ok(user.uid.as_raw()),
        _ => Err(AclError::UnknownUser(name.to_string())),
    }
}

fn resolve_gid(name: &str) -> Result<u32, AclError> {
    if let Ok(gid) = name.parse::<u32>() {
        return Ok(gid);
    }
    match Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid.as_raw()),
        _ => Err(AclError::UnknownGroup(name.to_string())),
    }
}
