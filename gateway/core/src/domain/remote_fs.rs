// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Remote Filesystem Trait - Anti-Corruption Layer for HDFS
//!
//! Isolates the session layer from the concrete remote client (WebHDFS REST,
//! in-memory test backend). Every call carries an explicit
//! [`ExecutionScope`] naming the principal the remote side should attribute
//! the operation to; there is no thread-local "current user".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use super::permission::PermissionBits;

/// Streaming reader over a remote file
pub type ReadStream = Pin<Box<dyn AsyncRead + Send>>;

/// Streaming writer into a remote file; `shutdown()` completes the upload
pub type WriteStream = Pin<Box<dyn AsyncWrite + Send>>;

/// File type reported by the remote namespace
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

/// Metadata snapshot of one remote path (`GETFILESTATUS`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    /// Absolute path of the entry
    pub path: String,
    pub kind: FileKind,
    /// Length in bytes (0 for directories)
    pub length: u64,
    pub owner: String,
    pub group: String,
    pub permission: PermissionBits,
    /// Last modification, milliseconds since the Unix epoch
    pub modification_time: i64,
    /// Number of direct children, when the remote side reports it
    pub child_count: Option<u64>,
}

impl FileStatus {
    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// Principal under which a remote call is executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionScope {
    /// The gateway's own credential; the end user is only used for local
    /// permission-bit comparisons.
    Ambient { service_user: Option<String> },
    /// Service credential impersonating the end user (`doas`), so the remote
    /// audit trail names the end user.
    Proxy {
        service_user: String,
        effective_user: String,
    },
}

impl ExecutionScope {
    pub fn ambient(service_user: Option<String>) -> Self {
        ExecutionScope::Ambient { service_user }
    }

    /// User the remote side attributes the call to
    pub fn effective_user(&self) -> Option<&str> {
        match self {
            ExecutionScope::Ambient { service_user } => service_user.as_deref(),
            ExecutionScope::Proxy { effective_user, .. } => Some(effective_user),
        }
    }

    /// Authenticated (real) user presenting the credential
    pub fn service_user(&self) -> Option<&str> {
        match self {
            ExecutionScope::Ambient { service_user } => service_user.as_deref(),
            ExecutionScope::Proxy { service_user, .. } => Some(service_user),
        }
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self, ExecutionScope::Proxy { .. })
    }
}

/// Remote filesystem client contract
///
/// Implementations perform the actual remote I/O. Paths are absolute and
/// normalized. Failures are reported, never retried.
#[async_trait]
pub trait RemoteFileSystem: Send + Sync {
    /// Metadata of a path; `NotFound` when absent
    async fn get_status(&self, scope: &ExecutionScope, path: &str) -> Result<FileStatus, RemoteFsError>;

    /// Whether the path is an existing regular file
    async fn is_file(&self, scope: &ExecutionScope, path: &str) -> Result<bool, RemoteFsError> {
        match self.get_status(scope, path).await {
            Ok(status) => Ok(status.is_file()),
            Err(RemoteFsError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether the path is an existing directory
    async fn is_directory(&self, scope: &ExecutionScope, path: &str) -> Result<bool, RemoteFsError> {
        match self.get_status(scope, path).await {
            Ok(status) => Ok(status.is_directory()),
            Err(RemoteFsError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Direct children of a directory (or the file itself for a file path)
    async fn list_status(&self, scope: &ExecutionScope, path: &str) -> Result<Vec<FileStatus>, RemoteFsError>;

    /// Create a directory and any missing ancestors
    async fn mkdirs(&self, scope: &ExecutionScope, path: &str) -> Result<(), RemoteFsError>;

    /// Delete a path; returns `false` when nothing was deleted
    async fn delete(&self, scope: &ExecutionScope, path: &str, recursive: bool) -> Result<bool, RemoteFsError>;

    /// Rename `src` to `dst`; returns `false` when the remote side refused
    async fn rename(&self, scope: &ExecutionScope, src: &str, dst: &str) -> Result<bool, RemoteFsError>;

    /// Open a file for reading from its first byte
    async fn open(&self, scope: &ExecutionScope, path: &str) -> Result<ReadStream, RemoteFsError>;

    /// Create (or truncate) a file for writing
    async fn create(&self, scope: &ExecutionScope, path: &str) -> Result<WriteStream, RemoteFsError>;

    /// Change owner and group of a path
    async fn set_owner(
        &self,
        scope: &ExecutionScope,
        path: &str,
        user: &str,
        group: &str,
    ) -> Result<(), RemoteFsError>;

    /// Check the remote side is reachable
    async fn health_check(&self) -> Result<(), RemoteFsError>;
}

/// Remote filesystem errors
#[derive(Debug, Error)]
pub enum RemoteFsError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout while communicating with the remote filesystem")]
    Timeout,

    #[error("Remote filesystem unavailable: {0}")]
    Unavailable(String),

    #[error("Remote protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RemoteFsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteFsError::NotFound(_))
    }
}

impl From<reqwest::Error> for RemoteFsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteFsError::Timeout
        } else if err.is_connect() {
            RemoteFsError::Network(err.to_string())
        } else if err.is_decode() {
            RemoteFsError::Serialization(err.to_string())
        } else {
            RemoteFsError::Protocol(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteFsError {
    fn from(err: serde_json::Error) -> Self {
        RemoteFsError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RemoteFsError {
    fn from(err: std::io::Error) -> Self {
        RemoteFsError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_attribution() {
        let ambient = ExecutionScope::ambient(Some("hdfs".to_string()));
        assert_eq!(ambient.effective_user(), Some("hdfs"));
        assert!(!ambient.is_delegated());

        let proxy = ExecutionScope::Proxy {
            service_user: "ftp".to_string(),
            effective_user: "alice".to_string(),
        };
        assert_eq!(proxy.effective_user(), Some("alice"));
        assert_eq!(proxy.service_user(), Some("ftp"));
        assert!(proxy.is_delegated());
    }

    #[test]
    fn test_ambient_without_user() {
        let scope = ExecutionScope::ambient(None);
        assert_eq!(scope.effective_user(), None);
        assert_eq!(scope.service_user(), None);
    }
}
