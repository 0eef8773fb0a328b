// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session Identity
//!
//! The authenticated end user on whose behalf permission bits are evaluated
//! and, when delegation is enabled, remote calls are executed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Authenticated end-user principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    name: String,
    primary_group: String,
    /// Supplementary groups; the primary group is always a member
    groups: BTreeSet<String>,
    home_directory: String,
    /// Accounts flagged read-only never pass a write check
    can_write: bool,
}

impl Identity {
    /// Create an identity whose only group is its primary group
    pub fn new(
        name: impl Into<String>,
        primary_group: impl Into<String>,
        home_directory: impl Into<String>,
    ) -> Self {
        let primary_group = primary_group.into();
        let mut groups = BTreeSet::new();
        groups.insert(primary_group.clone());

        Self {
            name: name.into(),
            primary_group,
            groups,
            home_directory: home_directory.into(),
            can_write: true,
        }
    }

    /// Add supplementary group memberships
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Strip write capability regardless of permission bits
    pub fn read_only(mut self) -> Self {
        self.can_write = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_group(&self) -> &str {
        &self.primary_group
    }

    pub fn home_directory(&self) -> &str {
        &self.home_directory
    }

    pub fn can_write(&self) -> bool {
        self.can_write
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    /// Membership test used to select the group permission triple
    pub fn is_group_member(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.primary_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_group_is_member() {
        let alice = Identity::new("alice", "staff", "/home/alice");
        assert!(alice.is_group_member("staff"));
        assert!(!alice.is_group_member("wheel"));
    }

    #[test]
    fn test_supplementary_groups() {
        let alice = Identity::new("alice", "staff", "/home/alice")
            .with_groups(["analytics", "etl"]);

        assert!(alice.is_group_member("analytics"));
        assert!(alice.is_group_member("etl"));
        assert_eq!(alice.groups().count(), 3);
    }

    #[test]
    fn test_read_only_flag() {
        let guest = Identity::new("guest", "guests", "/pub").read_only();
        assert!(!guest.can_write());
        assert_eq!(guest.to_string(), "guest:guests");
    }
}
