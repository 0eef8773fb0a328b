// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! POSIX-style permission bits as a structured value
//!
//! HDFS reports permissions as an octal string (`"755"`, `"1777"`) over
//! WebHDFS and as a symbolic string (`rwxr-x---`) in listings. Both parse into
//! [`PermissionBits`], where "which bit means what" is a lookup by
//! [`PermissionClass`] and [`Access`] instead of a character offset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::identity::Identity;

/// Kind of access being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    Write,
    Execute,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
            Access::Execute => write!(f, "execute"),
        }
    }
}

/// Which of the three permission triples applies to a requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionClass {
    Owner,
    Group,
    Other,
}

impl PermissionClass {
    /// Select the applicable class: owner name match first, then group
    /// membership, otherwise "other".
    pub fn for_identity(identity: &Identity, owner: &str, group: &str) -> Self {
        if identity.name() == owner {
            PermissionClass::Owner
        } else if identity.is_group_member(group) {
            PermissionClass::Group
        } else {
            PermissionClass::Other
        }
    }
}

impl fmt::Display for PermissionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionClass::Owner => write!(f, "user"),
            PermissionClass::Group => write!(f, "group"),
            PermissionClass::Other => write!(f, "others"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionParseError {
    #[error("Invalid symbolic permission '{0}': expected 9 characters like rwxr-x---")]
    InvalidSymbolic(String),

    #[error("Invalid octal permission '{0}'")]
    InvalidOctal(String),
}

/// Read/write/execute bits for one class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionTriple {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl PermissionTriple {
    pub const fn new(read: bool, write: bool, execute: bool) -> Self {
        Self { read, write, execute }
    }

    fn from_octal_digit(digit: u16) -> Self {
        Self {
            read: digit & 0o4 != 0,
            write: digit & 0o2 != 0,
            execute: digit & 0o1 != 0,
        }
    }

    fn octal_digit(&self) -> u16 {
        (self.read as u16) << 2 | (self.write as u16) << 1 | self.execute as u16
    }

    fn from_symbolic(chars: &[u8]) -> Option<Self> {
        let read = match chars[0] {
            b'r' => true,
            b'-' => false,
            _ => return None,
        };
        let write = match chars[1] {
            b'w' => true,
            b'-' => false,
            _ => return None,
        };
        // setuid/setgid/sticky markers share the execute column
        let execute = match chars[2] {
            b'x' | b's' | b't' => true,
            b'-' | b'S' | b'T' => false,
            _ => return None,
        };
        Some(Self { read, write, execute })
    }

    pub fn allows(&self, access: Access) -> bool {
        match access {
            Access::Read => self.read,
            Access::Write => self.write,
            Access::Execute => self.execute,
        }
    }
}

impl fmt::Display for PermissionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' },
        )
    }
}

/// Owner/group/other permission triples of one path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionBits {
    pub owner: PermissionTriple,
    pub group: PermissionTriple,
    pub other: PermissionTriple,
}

impl PermissionBits {
    pub const fn new(owner: PermissionTriple, group: PermissionTriple, other: PermissionTriple) -> Self {
        Self { owner, group, other }
    }

    /// Build from a numeric mode; bits above 0o777 (sticky, setuid) are ignored
    pub fn from_mode(mode: u16) -> Self {
        Self {
            owner: PermissionTriple::from_octal_digit((mode >> 6) & 0o7),
            group: PermissionTriple::from_octal_digit((mode >> 3) & 0o7),
            other: PermissionTriple::from_octal_digit(mode & 0o7),
        }
    }

    pub fn mode(&self) -> u16 {
        self.owner.octal_digit() << 6 | self.group.octal_digit() << 3 | self.other.octal_digit()
    }

    /// Parse the octal form reported by WebHDFS (`"644"`, `"1777"`)
    pub fn parse_octal(value: &str) -> Result<Self, PermissionParseError> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.len() > 4 {
            return Err(PermissionParseError::InvalidOctal(value.to_string()));
        }
        u16::from_str_radix(trimmed, 8)
            .map(Self::from_mode)
            .map_err(|_| PermissionParseError::InvalidOctal(value.to_string()))
    }

    pub fn triple(&self, class: PermissionClass) -> PermissionTriple {
        match class {
            PermissionClass::Owner => self.owner,
            PermissionClass::Group => self.group,
            PermissionClass::Other => self.other,
        }
    }

    pub fn allows(&self, class: PermissionClass, access: Access) -> bool {
        self.triple(class).allows(access)
    }
}

impl FromStr for PermissionBits {
    type Err = PermissionParseError;

    /// Parse `rwxr-x---`, optionally prefixed with a file-type character
    /// (`drwxr-x---`) as it appears in directory listings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let bits = match bytes.len() {
            9 => bytes,
            10 => &bytes[1..],
            _ => return Err(PermissionParseError::InvalidSymbolic(s.to_string())),
        };

        let invalid = || PermissionParseError::InvalidSymbolic(s.to_string());
        Ok(Self {
            owner: PermissionTriple::from_symbolic(&bits[0..3]).ok_or_else(invalid)?,
            group: PermissionTriple::from_symbolic(&bits[3..6]).ok_or_else(invalid)?,
            other: PermissionTriple::from_symbolic(&bits[6..9]).ok_or_else(invalid)?,
        })
    }
}

impl fmt::Display for PermissionBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.owner, self.group, self.other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_parse_and_render() {
        let bits: PermissionBits = "rw-r-----".parse().unwrap();
        assert!(bits.owner.read && bits.owner.write && !bits.owner.execute);
        assert!(bits.group.read && !bits.group.write);
        assert_eq!(bits.other, PermissionTriple::default());
        assert_eq!(bits.to_string(), "rw-r-----");
        assert_eq!(bits.mode(), 0o640);
    }

    #[test]
    fn test_listing_prefix_is_accepted() {
        let bits: PermissionBits = "drwxr-xr-x".parse().unwrap();
        assert_eq!(bits.mode(), 0o755);
    }

    #[test]
    fn test_sticky_markers() {
        let bits: PermissionBits = "rwxrwxrwt".parse().unwrap();
        assert!(bits.other.execute);
        let bits: PermissionBits = "rwxrwxrwT".parse().unwrap();
        assert!(!bits.other.execute);
    }

    #[test]
    fn test_invalid_symbolic() {
        assert!("rwx".parse::<PermissionBits>().is_err());
        assert!("rwxr-xr-q".parse::<PermissionBits>().is_err());
    }

    #[test]
    fn test_octal_forms() {
        assert_eq!(PermissionBits::parse_octal("644").unwrap().to_string(), "rw-r--r--");
        assert_eq!(PermissionBits::parse_octal("1777").unwrap().to_string(), "rwxrwxrwx");
        assert_eq!(PermissionBits::parse_octal("0").unwrap().to_string(), "---------");
        assert!(PermissionBits::parse_octal("9").is_err());
        assert!(PermissionBits::parse_octal("").is_err());
    }

    #[test]
    fn test_class_selection_prefers_owner() {
        // Owner triple applies even when the owner is also in the file's group
        let alice = Identity::new("alice", "staff", "/home/alice");
        assert_eq!(PermissionClass::for_identity(&alice, "alice", "staff"), PermissionClass::Owner);
        assert_eq!(PermissionClass::for_identity(&alice, "bob", "staff"), PermissionClass::Group);
        assert_eq!(PermissionClass::for_identity(&alice, "bob", "wheel"), PermissionClass::Other);
    }

    #[test]
    fn test_allows_reads_selected_triple() {
        let bits: PermissionBits = "r---w---x".parse().unwrap();
        assert!(bits.allows(PermissionClass::Owner, Access::Read));
        assert!(!bits.allows(PermissionClass::Owner, Access::Write));
        assert!(bits.allows(PermissionClass::Group, Access::Write));
        assert!(!bits.allows(PermissionClass::Group, Access::Read));
        assert!(bits.allows(PermissionClass::Other, Access::Execute));
        assert!(!bits.allows(PermissionClass::Other, Access::Read));
    }
}
