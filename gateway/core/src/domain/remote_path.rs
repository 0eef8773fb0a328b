// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Remote Path Value Object
//!
//! Absolute, normalized path inside the remote namespace.
//!
//! Normalization collapses repeated separators, drops `.` segments and
//! resolves `..` lexically (never above the root), so `/a//b/../c/` becomes
//! `/a/c`. The root is the only normalized path ending with a separator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path separator of the remote namespace
pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemotePath(String);

impl RemotePath {
    /// Normalize `raw` into an absolute path. Relative input is anchored at the root.
    pub fn new(raw: &str) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        tracing::debug!(path = %raw, "Parent reference above root ignored");
                    }
                }
                part => segments.push(part),
            }
        }

        if segments.is_empty() {
            return Self::root();
        }

        let mut normalized = String::with_capacity(raw.len());
        for segment in segments {
            normalized.push(SEPARATOR);
            normalized.push_str(segment);
        }
        Self(normalized)
    }

    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Parent directory; `None` for the root
    pub fn parent(&self) -> Option<RemotePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Some(Self::root()),
            Some(pos) => Some(Self(self.0[..pos].to_string())),
        }
    }

    /// Last path component; `/` for the root
    pub fn file_name(&self) -> &str {
        if self.is_root() {
            return &self.0;
        }
        match self.0.rfind(SEPARATOR) {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    /// Append a child name (normalized)
    pub fn join(&self, name: &str) -> RemotePath {
        Self::new(&format!("{}{}{}", self.0, SEPARATOR, name))
    }

    /// Component-wise prefix test (`/home/al` is not under `/home/alice`)
    pub fn starts_with(&self, base: &RemotePath) -> bool {
        if base.is_root() {
            return true;
        }
        match self.0.strip_prefix(base.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
            None => false,
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RemotePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RemotePath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        assert_eq!(RemotePath::new("/home/alice/file.txt").as_str(), "/home/alice/file.txt");
    }

    #[test]
    fn test_normalize_separators_and_dots() {
        assert_eq!(RemotePath::new("/home//alice/./docs/").as_str(), "/home/alice/docs");
        assert_eq!(RemotePath::new("/home/alice/../bob").as_str(), "/home/bob");
        assert_eq!(RemotePath::new("relative/x").as_str(), "/relative/x");
    }

    #[test]
    fn test_parent_dir_never_escapes_root() {
        assert_eq!(RemotePath::new("/../../etc").as_str(), "/etc");
        assert!(RemotePath::new("/a/..").is_root());
        assert!(RemotePath::new("").is_root());
    }

    #[test]
    fn test_parent_chain_terminates_at_root() {
        let path = RemotePath::new("/a/b");
        let parent = path.parent().unwrap();
        assert_eq!(parent.as_str(), "/a");
        let grandparent = parent.parent().unwrap();
        assert!(grandparent.is_root());
        assert!(grandparent.parent().is_none());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(RemotePath::new("/home/alice/file.txt").file_name(), "file.txt");
        assert_eq!(RemotePath::root().file_name(), "/");
    }

    #[test]
    fn test_join() {
        assert_eq!(RemotePath::root().join("tmp").as_str(), "/tmp");
        assert_eq!(RemotePath::new("/a").join("b/c").as_str(), "/a/b/c");
    }

    #[test]
    fn test_starts_with_is_component_wise() {
        let home = RemotePath::new("/home/alice");
        assert!(RemotePath::new("/home/alice").starts_with(&home));
        assert!(RemotePath::new("/home/alice/x").starts_with(&home));
        assert!(!RemotePath::new("/home/alicex").starts_with(&home));
        assert!(!RemotePath::new("/home").starts_with(&home));
        assert!(RemotePath::new("/anything").starts_with(&RemotePath::root()));
    }
}
