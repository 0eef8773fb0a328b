// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Path Entry
//!
//! The file object handed to the protocol layer for one remote path.
//!
//! An entry stores only its normalized path and the session it belongs to.
//! Every accessor re-queries the remote filesystem, so two commands in a row
//! always observe the current remote state.
//!
//! # Failure policy
//!
//! | Operation                         | On remote failure          |
//! |-----------------------------------|----------------------------|
//! | `exists`, `is_file`, `is_directory` | `false`                  |
//! | `owner_name`, `group_name`          | `None`                   |
//! | `size`, `last_modified`             | `0`                      |
//! | `has_*_permission`                  | `false` (write: parent)  |
//! | `mkdir`, `delete`, `move_to`        | `false`                  |
//! | `list_files`                        | `None`                   |
//! | `create_*_stream`, `try_mkdir`      | typed [`EntryError`]     |

use chrono::{DateTime, TimeZone, Utc};
use futures::future::{BoxFuture, FutureExt};
use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::io::AsyncWrite;
use tracing::{debug, warn};

use super::identity::Identity;
use super::permission::{Access, PermissionBits, PermissionClass};
use super::remote_fs::{FileKind, FileStatus, ReadStream, WriteStream};
use super::remote_path::RemotePath;
use super::session::{EntryError, SessionContext};

/// One remote path seen through a session
#[derive(Clone)]
pub struct PathEntry {
    path: RemotePath,
    session: Arc<SessionContext>,
}

/// Listing snapshot of one entry, taken from a single status call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    pub name: String,
    pub kind: FileKind,
    pub permission: PermissionBits,
    pub link_count: u32,
    pub owner: String,
    pub group: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl PathEntry {
    pub fn new(path: RemotePath, session: Arc<SessionContext>) -> Self {
        Self { path, session }
    }

    pub fn path(&self) -> &RemotePath {
        &self.path
    }

    pub fn identity(&self) -> &Identity {
        self.session.identity()
    }

    /// Absolute path
    pub fn full_name(&self) -> &str {
        self.path.as_str()
    }

    /// Last path component, `/` for the root
    pub fn short_name(&self) -> &str {
        self.path.file_name()
    }

    pub fn is_hidden(&self) -> bool {
        false
    }

    pub async fn exists(&self) -> bool {
        match self.status_of(&self.path).await {
            Ok(_) => true,
            Err(EntryError::Remote(e)) if e.is_not_found() => false,
            Err(e) => {
                warn!(path = %self.path, error = %e, "Existence check failed");
                false
            }
        }
    }

    pub async fn is_directory(&self) -> bool {
        let path = self.path.as_str();
        match self
            .session
            .execute(|scope, fs| async move { fs.is_directory(&scope, path).await })
            .await
        {
            Ok(is_dir) => is_dir,
            Err(e) => {
                warn!(path = %self.path, error = %e, "Directory check failed");
                false
            }
        }
    }

    pub async fn is_file(&self) -> bool {
        let path = self.path.as_str();
        match self
            .session
            .execute(|scope, fs| async move { fs.is_file(&scope, path).await })
            .await
        {
            Ok(is_file) => is_file,
            Err(e) => {
                warn!(path = %self.path, error = %e, "File check failed");
                false
            }
        }
    }

    pub async fn owner_name(&self) -> Option<String> {
        self.status_or_log("owner").await.map(|s| s.owner)
    }

    pub async fn group_name(&self) -> Option<String> {
        self.status_or_log("group").await.map(|s| s.group)
    }

    pub async fn permission_bits(&self) -> Result<PermissionBits, EntryError> {
        Ok(self.status_of(&self.path).await?.permission)
    }

    /// Length in bytes; 0 when unknown
    pub async fn size(&self) -> u64 {
        self.status_or_log("size").await.map_or(0, |s| s.length)
    }

    /// Modification time in milliseconds since the epoch; 0 when unknown
    pub async fn last_modified(&self) -> i64 {
        self.status_or_log("modification time")
            .await
            .map_or(0, |s| s.modification_time)
    }

    /// Number of direct children of a directory; `None` for files or on failure
    pub async fn entry_count(&self) -> Option<u64> {
        let status = self.status_or_log("entry count").await?;
        if !status.is_directory() {
            return None;
        }
        if let Some(count) = status.child_count {
            return Some(count);
        }

        let path = self.path.as_str();
        match self
            .session
            .execute(|scope, fs| async move { fs.list_status(&scope, path).await })
            .await
        {
            Ok(children) => Some(children.len() as u64),
            Err(e) => {
                warn!(path = %self.path, error = %e, "Listing for entry count failed");
                None
            }
        }
    }

    /// Fixed protocol convention: 3 for directories, 1 otherwise
    pub async fn link_count(&self) -> u32 {
        if self.is_directory().await {
            3
        } else {
            1
        }
    }

    pub async fn has_read_permission(&self) -> bool {
        match self.status_of(&self.path).await {
            Ok(status) => self.evaluate(&status, Access::Read),
            Err(e) => {
                debug!(path = %self.path, error = %e, "Read permission denied: status unavailable");
                false
            }
        }
    }

    /// Write permission of the path, or of the nearest existing ancestor when
    /// the path does not exist yet
    pub async fn has_write_permission(&self) -> bool {
        if !self.identity().can_write() {
            debug!(path = %self.path, user = %self.identity(), "Write denied: read-only account");
            return false;
        }

        let mut current = self.path.clone();
        loop {
            match self.status_of(&current).await {
                Ok(status) => return self.evaluate(&status, Access::Write),
                Err(EntryError::Remote(e)) if e.is_not_found() => match current.parent() {
                    Some(parent) => {
                        debug!(path = %current, parent = %parent, "Path absent, checking parent for write");
                        current = parent;
                    }
                    None => return false,
                },
                Err(e) => {
                    warn!(path = %current, error = %e, "Write permission check failed");
                    return false;
                }
            }
        }
    }

    /// Deleting requires write permission on the path itself
    pub async fn has_delete_permission(&self) -> bool {
        self.has_write_permission().await
    }

    pub async fn mkdir(&self) -> bool {
        match self.try_mkdir().await {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path, user = %self.identity(), error = %e, "Cannot create directory");
                false
            }
        }
    }

    /// Create the directory and missing ancestors, reporting why it failed
    pub async fn try_mkdir(&self) -> Result<(), EntryError> {
        self.require(Access::Write).await?;

        let targets = self.ownership_targets().await;
        let path = self.path.as_str();
        self.session
            .execute(|scope, fs| async move { fs.mkdirs(&scope, path).await })
            .await?;
        self.assign_owner(targets).await;
        Ok(())
    }

    /// Recursive delete; the caller is expected to have checked
    /// [`PathEntry::has_delete_permission`]
    pub async fn delete(&self) -> bool {
        let path = self.path.as_str();
        match self
            .session
            .execute(|scope, fs| async move { fs.delete(&scope, path, true).await })
            .await
        {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(path = %self.path, error = %e, "Delete failed");
                false
            }
        }
    }

    pub async fn move_to(&self, target: &PathEntry) -> bool {
        let (src, dst) = (self.path.as_str(), target.path.as_str());
        match self
            .session
            .execute(|scope, fs| async move { fs.rename(&scope, src, dst).await })
            .await
        {
            Ok(renamed) => renamed,
            Err(e) => {
                warn!(src = %self.path, dst = %target.path, error = %e, "Rename failed");
                false
            }
        }
    }

    /// Children of this directory; `None` when unreadable or unavailable
    pub async fn list_files(&self) -> Option<Vec<PathEntry>> {
        if !self.has_read_permission().await {
            debug!(path = %self.path, user = %self.identity(), "Listing denied");
            return None;
        }

        let path = self.path.as_str();
        match self
            .session
            .execute(|scope, fs| async move { fs.list_status(&scope, path).await })
            .await
        {
            Ok(children) => Some(
                children
                    .iter()
                    .map(|child| PathEntry::new(RemotePath::new(&child.path), Arc::clone(&self.session)))
                    .collect(),
            ),
            Err(e) => {
                warn!(path = %self.path, error = %e, "Listing failed");
                None
            }
        }
    }

    /// Open a create-truncate write stream. `offset` is accepted but ignored.
    pub async fn create_output_stream(&self, offset: u64) -> Result<WriteStream, EntryError> {
        self.require(Access::Write).await?;
        if offset > 0 {
            debug!(path = %self.path, offset, "Write offset ignored, file is truncated");
        }

        let targets = self.ownership_targets().await;
        let path = self.path.as_str();
        let stream = self
            .session
            .execute(|scope, fs| async move { fs.create(&scope, path).await })
            .await?;
        if targets.is_empty() {
            return Ok(stream);
        }
        Ok(Box::pin(OwnedUpload {
            inner: stream,
            committed: false,
            assign: Some(self.assign_owner(targets)),
        }))
    }

    /// Open a read stream from the first byte. `offset` is accepted but ignored.
    pub async fn create_input_stream(&self, offset: u64) -> Result<ReadStream, EntryError> {
        self.require(Access::Read).await?;
        if offset > 0 {
            debug!(path = %self.path, offset, "Read offset ignored, streaming from start");
        }

        let path = self.path.as_str();
        self.session
            .execute(|scope, fs| async move { fs.open(&scope, path).await })
            .await
    }

    /// Metadata for a listing line; `None` when the status is unavailable
    pub async fn describe(&self) -> Option<EntryMetadata> {
        let status = self.status_or_log("listing metadata").await?;
        let modified = Utc
            .timestamp_millis_opt(status.modification_time)
            .single()
            .unwrap_or_default();

        Some(EntryMetadata {
            name: self.short_name().to_string(),
            kind: status.kind,
            permission: status.permission,
            link_count: if status.is_directory() { 3 } else { 1 },
            owner: status.owner,
            group: status.group,
            size: status.length,
            modified,
        })
    }

    async fn status_of(&self, path: &RemotePath) -> Result<FileStatus, EntryError> {
        let path = path.as_str();
        self.session
            .execute(|scope, fs| async move { fs.get_status(&scope, path).await })
            .await
    }

    async fn status_or_log(&self, what: &str) -> Option<FileStatus> {
        match self.status_of(&self.path).await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(path = %self.path, error = %e, "Cannot read {}", what);
                None
            }
        }
    }

    async fn require(&self, access: Access) -> Result<(), EntryError> {
        let allowed = match access {
            Access::Read => self.has_read_permission().await,
            Access::Write | Access::Execute => self.has_write_permission().await,
        };
        if allowed {
            return Ok(());
        }

        counter!("hdfs_gateway.access_denied", "access" => access.to_string()).increment(1);
        Err(EntryError::AccessDenied {
            path: self.path.to_string(),
            access,
        })
    }

    fn evaluate(&self, status: &FileStatus, access: Access) -> bool {
        if access == Access::Write && !self.identity().can_write() {
            return false;
        }

        let class = PermissionClass::for_identity(self.identity(), &status.owner, &status.group);
        let allowed = status.permission.allows(class, access);
        debug!(
            path = %self.path,
            user = %self.identity().name(),
            owner = %status.owner,
            group = %status.group,
            permission = %status.permission,
            class = %class,
            access = %access,
            allowed,
            "Permission evaluated"
        );
        allowed
    }

    /// Paths a create/mkdir will bring into existence: this entry plus each
    /// missing ancestor. Empty when delegation already attributes them to the
    /// session user.
    async fn ownership_targets(&self) -> Vec<RemotePath> {
        if self.session.is_delegated() {
            return Vec::new();
        }

        let mut targets = vec![self.path.clone()];
        let mut current = self.path.parent();
        while let Some(path) = current {
            match self.status_of(&path).await {
                Err(EntryError::Remote(e)) if e.is_not_found() => {
                    current = path.parent();
                    targets.push(path);
                }
                _ => break,
            }
        }
        targets
    }

    /// Best-effort `set_owner` of `targets` to the session user
    fn assign_owner(&self, targets: Vec<RemotePath>) -> BoxFuture<'static, ()> {
        let session = Arc::clone(&self.session);
        async move {
            for target in targets {
                let user = session.identity().name().to_string();
                let group = session.identity().primary_group().to_string();
                let path = target.to_string();
                let result = session
                    .execute(|scope, fs| {
                        let (user, group) = (user.clone(), group.clone());
                        async move { fs.set_owner(&scope, &path, &user, &group).await }
                    })
                    .await;
                if let Err(e) = result {
                    warn!(path = %target, user, group, error = %e, "Cannot set owner of new path");
                }
            }
        }
        .boxed()
    }
}

/// Write stream that hands the new file to the session user once the upload
/// is committed. Remote clients may upload in the background, so ownership
/// can only be changed after `shutdown` completes.
struct OwnedUpload {
    inner: WriteStream,
    committed: bool,
    assign: Option<BoxFuture<'static, ()>>,
}

impl AsyncWrite for OwnedUpload {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.inner.as_mut().poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if !self.committed {
            ready!(self.inner.as_mut().poll_shutdown(cx))?;
            self.committed = true;
        }
        if let Some(assign) = self.assign.as_mut() {
            ready!(assign.as_mut().poll(cx));
            self.assign = None;
        }
        Poll::Ready(Ok(()))
    }
}

impl fmt::Debug for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathEntry")
            .field("path", &self.path)
            .field("user", &self.session.identity().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delegation::IdentityBroker;
    use crate::infrastructure::remote::memory::MemoryFileSystem;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn alice() -> Identity {
        Identity::new("alice", "staff", "/home/alice")
    }

    fn fixture() -> Arc<MemoryFileSystem> {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert_directory("/home", "hdfs", "supergroup", 0o755);
        fs.insert_directory("/home/alice", "alice", "staff", 0o750);
        fs.insert_file("/home/alice/file.txt", "alice", "staff", 0o640, "hello");
        fs.insert_directory("/home/alice/empty", "alice", "staff", 0o755);
        fs
    }

    fn entry(fs: &Arc<MemoryFileSystem>, identity: Identity, path: &str) -> PathEntry {
        let session = Arc::new(SessionContext::new(
            identity,
            Arc::new(IdentityBroker::ambient(Some("hdfs".to_string()))),
            fs.clone(),
        ));
        PathEntry::new(RemotePath::new(path), session)
    }

    #[tokio::test]
    async fn test_metadata_accessors() {
        let fs = fixture();
        let file = entry(&fs, alice(), "/home/alice/file.txt");

        assert!(file.exists().await);
        assert!(file.is_file().await);
        assert!(!file.is_directory().await);
        assert_eq!(file.owner_name().await.as_deref(), Some("alice"));
        assert_eq!(file.group_name().await.as_deref(), Some("staff"));
        assert_eq!(file.permission_bits().await.unwrap().to_string(), "rw-r-----");
        assert_eq!(file.size().await, 5);
        assert_eq!(file.link_count().await, 1);
        assert_eq!(file.short_name(), "file.txt");
        assert!(!file.is_hidden());
    }

    #[tokio::test]
    async fn test_missing_path_degrades_to_defaults() {
        let fs = fixture();
        let missing = entry(&fs, alice(), "/home/alice/missing");

        assert!(!missing.exists().await);
        assert!(!missing.is_file().await);
        assert!(!missing.is_directory().await);
        assert_eq!(missing.owner_name().await, None);
        assert_eq!(missing.size().await, 0);
        assert_eq!(missing.last_modified().await, 0);
        assert!(missing.permission_bits().await.is_err());
    }

    #[tokio::test]
    async fn test_unavailable_remote_is_not_an_error() {
        let fs = fixture();
        let file = entry(&fs, alice(), "/home/alice/file.txt");
        fs.set_offline(true);

        assert!(!file.exists().await);
        assert!(!file.has_read_permission().await);
        assert!(!file.has_write_permission().await);
        assert!(file.list_files().await.is_none());
    }

    #[tokio::test]
    async fn test_directory_link_count_and_entry_count() {
        let fs = fixture();
        let home = entry(&fs, alice(), "/home/alice");

        assert_eq!(home.link_count().await, 3);
        assert_eq!(home.entry_count().await, Some(2));
        assert_eq!(entry(&fs, alice(), "/home/alice/file.txt").entry_count().await, None);
    }

    #[tokio::test]
    async fn test_root_short_name() {
        let fs = fixture();
        assert_eq!(entry(&fs, alice(), "/").short_name(), "/");
    }

    #[tokio::test]
    async fn test_write_falls_back_to_nearest_existing_ancestor() {
        let fs = fixture();
        let nested = entry(&fs, alice(), "/home/alice/a/b/c.txt");
        assert!(nested.has_write_permission().await);

        let bob = Identity::new("bob", "users", "/home/bob");
        let foreign = entry(&fs, bob, "/home/alice/new.txt");
        assert!(!foreign.has_write_permission().await);
    }

    #[tokio::test]
    async fn test_read_only_account_never_writes() {
        let fs = fixture();
        let file = entry(&fs, alice().read_only(), "/home/alice/file.txt");
        assert!(file.has_read_permission().await);
        assert!(!file.has_write_permission().await);
        assert!(!file.has_delete_permission().await);
    }

    #[tokio::test]
    async fn test_list_unavailable_vs_empty() {
        let fs = fixture();
        let empty = entry(&fs, alice(), "/home/alice/empty");
        assert_eq!(empty.list_files().await.map(|v| v.len()), Some(0));

        let carol = Identity::new("carol", "guests", "/home/carol");
        let denied = entry(&fs, carol, "/home/alice");
        assert!(denied.list_files().await.is_none());
    }

    #[tokio::test]
    async fn test_listing_wraps_children_for_same_identity() {
        let fs = fixture();
        let home = entry(&fs, alice(), "/home/alice");
        let children = home.list_files().await.unwrap();

        let mut names: Vec<_> = children.iter().map(|c| c.short_name().to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["empty", "file.txt"]);
        assert!(children.iter().all(|c| c.identity().name() == "alice"));
    }

    #[tokio::test]
    async fn test_mkdir_sets_owner_and_denies_without_write() {
        let fs = fixture();
        let dir = entry(&fs, alice(), "/home/alice/newdir");
        assert!(dir.mkdir().await);
        assert!(dir.is_directory().await);
        assert_eq!(dir.owner_name().await.as_deref(), Some("alice"));

        let bob = Identity::new("bob", "users", "/home/bob");
        let denied = entry(&fs, bob, "/home/alice/bobdir");
        assert!(matches!(denied.try_mkdir().await, Err(EntryError::AccessDenied { .. })));
        assert!(!denied.exists().await);
    }

    #[tokio::test]
    async fn test_created_ancestors_are_owned_by_user() {
        let fs = fixture();
        let dir = entry(&fs, alice(), "/home/alice/a/b/c");
        assert!(dir.mkdir().await);
        for path in ["/home/alice/a", "/home/alice/a/b", "/home/alice/a/b/c"] {
            let created = entry(&fs, alice(), path);
            assert_eq!(created.owner_name().await.as_deref(), Some("alice"), "{}", path);
            assert_eq!(created.group_name().await.as_deref(), Some("staff"), "{}", path);
        }

        let file = entry(&fs, alice(), "/home/alice/x/y/out.txt");
        let mut writer = file.create_output_stream(0).await.unwrap();
        writer.write_all(b"data").await.unwrap();
        writer.shutdown().await.unwrap();
        for path in ["/home/alice/x", "/home/alice/x/y", "/home/alice/x/y/out.txt"] {
            assert_eq!(entry(&fs, alice(), path).owner_name().await.as_deref(), Some("alice"), "{}", path);
        }
        assert_eq!(entry(&fs, alice(), "/home/alice").owner_name().await.as_deref(), Some("alice"));
        assert_eq!(entry(&fs, alice(), "/home").owner_name().await.as_deref(), Some("hdfs"));
    }

    #[tokio::test]
    async fn test_owner_assigned_only_after_upload_commits() {
        let fs = fixture();
        let file = entry(&fs, alice(), "/home/alice/late.txt");

        let mut writer = file.create_output_stream(0).await.unwrap();
        writer.write_all(b"data").await.unwrap();
        assert_eq!(file.owner_name().await.as_deref(), Some("hdfs"));

        writer.shutdown().await.unwrap();
        assert_eq!(file.owner_name().await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_streams_round_trip_and_ignore_offset() {
        let fs = fixture();
        let target = entry(&fs, alice(), "/home/alice/out.txt");

        let mut writer = target.create_output_stream(42).await.unwrap();
        writer.write_all(b"payload").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut reader = target.create_input_stream(3).await.unwrap();
        let mut contents = String::new();
        reader.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "payload");
        assert_eq!(target.owner_name().await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_input_stream_denied_without_read() {
        let fs = fixture();
        let bob = Identity::new("bob", "users", "/home/bob");
        let file = entry(&fs, bob, "/home/alice/file.txt");
        let err = file.create_input_stream(0).await.err().unwrap();
        assert!(err.is_access_denied());
    }

    #[tokio::test]
    async fn test_move_and_delete() {
        let fs = fixture();
        let file = entry(&fs, alice(), "/home/alice/file.txt");
        let target = entry(&fs, alice(), "/home/alice/renamed.txt");

        assert!(file.move_to(&target).await);
        assert!(!file.exists().await);
        assert!(target.exists().await);

        assert!(target.delete().await);
        assert!(!target.exists().await);
        assert!(!target.delete().await);
    }

    #[tokio::test]
    async fn test_describe_snapshot() {
        let fs = fixture();
        let meta = entry(&fs, alice(), "/home/alice").describe().await.unwrap();
        assert_eq!(meta.kind, FileKind::Directory);
        assert_eq!(meta.link_count, 3);
        assert_eq!(meta.permission.to_string(), "rwxr-x---");
        assert_eq!(meta.name, "alice");
    }
}
