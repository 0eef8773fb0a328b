// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory remote filesystem
//!
//! Keeps a namespace of owner/group/mode-tagged nodes in process memory and
//! records which user each call was attributed to. It does not enforce
//! permission bits; that is the session layer's job.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

use crate::domain::permission::PermissionBits;
use crate::domain::remote_fs::{
    ExecutionScope, FileKind, FileStatus, ReadStream, RemoteFileSystem, RemoteFsError, WriteStream,
};
use crate::domain::remote_path::RemotePath;

const DEFAULT_OWNER: &str = "hdfs";
const DEFAULT_GROUP: &str = "supergroup";

#[derive(Debug, Clone)]
struct Node {
    kind: FileKind,
    owner: String,
    group: String,
    mode: u16,
    data: Vec<u8>,
    modified: i64,
}

/// One remote call as the namespace saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// User the call was attributed to
    pub user: Option<String>,
    /// Authenticated user presenting the credential
    pub real_user: Option<String>,
    pub operation: &'static str,
    pub path: String,
}

type Tree = Arc<RwLock<BTreeMap<String, Node>>>;

#[derive(Clone)]
pub struct MemoryFileSystem {
    nodes: Tree,
    audit: Arc<RwLock<Vec<AuditRecord>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryFileSystem {
    /// Namespace holding only `/`, owned by `hdfs:supergroup`
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            Node {
                kind: FileKind::Directory,
                owner: DEFAULT_OWNER.to_string(),
                group: DEFAULT_GROUP.to_string(),
                mode: 0o755,
                data: Vec::new(),
                modified: now_millis(),
            },
        );

        Self {
            nodes: Arc::new(RwLock::new(nodes)),
            audit: Arc::new(RwLock::new(Vec::new())),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn insert_directory(&self, path: &str, owner: &str, group: &str, mode: u16) {
        self.insert(path, FileKind::Directory, owner, group, mode, Vec::new());
    }

    pub fn insert_file(&self, path: &str, owner: &str, group: &str, mode: u16, data: impl Into<Vec<u8>>) {
        self.insert(path, FileKind::File, owner, group, mode, data.into());
    }

    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        let key = RemotePath::new(path);
        self.nodes
            .read()
            .get(key.as_str())
            .filter(|n| n.kind == FileKind::File)
            .map(|n| n.data.clone())
    }

    pub fn audit_log(&self) -> Vec<AuditRecord> {
        self.audit.read().clone()
    }

    /// Make every call fail with `Unavailable` until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn insert(&self, path: &str, kind: FileKind, owner: &str, group: &str, mode: u16, data: Vec<u8>) {
        let key = RemotePath::new(path);
        self.nodes.write().insert(
            key.to_string(),
            Node {
                kind,
                owner: owner.to_string(),
                group: group.to_string(),
                mode,
                data,
                modified: now_millis(),
            },
        );
    }

    fn record(&self, scope: &ExecutionScope, operation: &'static str, path: &str) -> Result<(), RemoteFsError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteFsError::Unavailable("memory filesystem is offline".to_string()));
        }
        self.audit.write().push(AuditRecord {
            user: scope.effective_user().map(str::to_string),
            real_user: scope.service_user().map(str::to_string),
            operation,
            path: path.to_string(),
        });
        Ok(())
    }

    fn status(path: &str, node: &Node, nodes: &BTreeMap<String, Node>) -> FileStatus {
        let child_count = match node.kind {
            FileKind::Directory => Some(children(nodes, path).count() as u64),
            FileKind::File => None,
        };
        FileStatus {
            path: path.to_string(),
            kind: node.kind,
            length: node.data.len() as u64,
            owner: node.owner.clone(),
            group: node.group.clone(),
            permission: PermissionBits::from_mode(node.mode),
            modification_time: node.modified,
            child_count,
        }
    }

    /// Create missing directories from the root down to `path`
    fn create_ancestors(nodes: &mut BTreeMap<String, Node>, path: &RemotePath, owner: &str) -> Result<(), RemoteFsError> {
        let mut chain = Vec::new();
        let mut cursor = Some(path.clone());
        while let Some(p) = cursor {
            if let Some(existing) = nodes.get(p.as_str()) {
                if existing.kind == FileKind::File {
                    return Err(RemoteFsError::AlreadyExists(p.to_string()));
                }
                break;
            }
            cursor = p.parent();
            chain.push(p);
        }

        for dir in chain.into_iter().rev() {
            let group = dir
                .parent()
                .and_then(|parent| nodes.get(parent.as_str()))
                .map_or_else(|| DEFAULT_GROUP.to_string(), |n| n.group.clone());
            nodes.insert(
                dir.to_string(),
                Node {
                    kind: FileKind::Directory,
                    owner: owner.to_string(),
                    group,
                    mode: 0o755,
                    data: Vec::new(),
                    modified: now_millis(),
                },
            );
        }
        Ok(())
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn is_descendant(candidate: &str, path: &str) -> bool {
    RemotePath::new(candidate).starts_with(&RemotePath::new(path)) && candidate != path
}

fn children<'a>(nodes: &'a BTreeMap<String, Node>, path: &'a str) -> impl Iterator<Item = (&'a String, &'a Node)> {
    let parent = RemotePath::new(path);
    nodes.iter().filter(move |(key, _)| {
        let key = RemotePath::new(key);
        !key.is_root() && key.parent().as_ref() == Some(&parent)
    })
}

fn scope_owner(scope: &ExecutionScope) -> String {
    scope.effective_user().unwrap_or(DEFAULT_OWNER).to_string()
}

#[async_trait]
impl RemoteFileSystem for MemoryFileSystem {
    async fn get_status(&self, scope: &ExecutionScope, path: &str) -> Result<FileStatus, RemoteFsError> {
        self.record(scope, "getfileinfo", path)?;
        let key = RemotePath::new(path);
        let nodes = self.nodes.read();
        nodes
            .get(key.as_str())
            .map(|node| Self::status(key.as_str(), node, &nodes))
            .ok_or_else(|| RemoteFsError::NotFound(key.to_string()))
    }

    async fn list_status(&self, scope: &ExecutionScope, path: &str) -> Result<Vec<FileStatus>, RemoteFsError> {
        self.record(scope, "listStatus", path)?;
        let key = RemotePath::new(path);
        let nodes = self.nodes.read();
        let node = nodes
            .get(key.as_str())
            .ok_or_else(|| RemoteFsError::NotFound(key.to_string()))?;

        if node.kind == FileKind::File {
            return Ok(vec![Self::status(key.as_str(), node, &nodes)]);
        }
        Ok(children(&nodes, key.as_str())
            .map(|(child, child_node)| Self::status(child, child_node, &nodes))
            .collect())
    }

    async fn mkdirs(&self, scope: &ExecutionScope, path: &str) -> Result<(), RemoteFsError> {
        self.record(scope, "mkdirs", path)?;
        let key = RemotePath::new(path);
        let mut nodes = self.nodes.write();
        Self::create_ancestors(&mut nodes, &key, &scope_owner(scope))
    }

    async fn delete(&self, scope: &ExecutionScope, path: &str, recursive: bool) -> Result<bool, RemoteFsError> {
        self.record(scope, "delete", path)?;
        let key = RemotePath::new(path);
        if key.is_root() {
            return Err(RemoteFsError::PermissionDenied("cannot delete /".to_string()));
        }

        let mut nodes = self.nodes.write();
        if !nodes.contains_key(key.as_str()) {
            return Ok(false);
        }

        let descendants: Vec<String> = nodes
            .keys()
            .filter(|k| is_descendant(k, key.as_str()))
            .cloned()
            .collect();
        if !descendants.is_empty() && !recursive {
            return Err(RemoteFsError::Protocol(format!("{} is non empty", key)));
        }

        for descendant in descendants {
            nodes.remove(&descendant);
        }
        nodes.remove(key.as_str());
        Ok(true)
    }

    async fn rename(&self, scope: &ExecutionScope, src: &str, dst: &str) -> Result<bool, RemoteFsError> {
        self.record(scope, "rename", src)?;
        let (src, dst) = (RemotePath::new(src), RemotePath::new(dst));
        let mut nodes = self.nodes.write();

        let dst_parent_is_dir = dst
            .parent()
            .and_then(|p| nodes.get(p.as_str()))
            .is_some_and(|n| n.kind == FileKind::Directory);
        if src.is_root() || !nodes.contains_key(src.as_str()) || nodes.contains_key(dst.as_str()) || !dst_parent_is_dir
        {
            return Ok(false);
        }
        if dst.starts_with(&src) {
            return Ok(false);
        }

        let moved: Vec<String> = nodes
            .keys()
            .filter(|k| RemotePath::new(k).starts_with(&src))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let suffix = &old[src.as_str().len()..];
                nodes.insert(format!("{}{}", dst, suffix), node);
            }
        }
        Ok(true)
    }

    async fn open(&self, scope: &ExecutionScope, path: &str) -> Result<ReadStream, RemoteFsError> {
        self.record(scope, "open", path)?;
        let key = RemotePath::new(path);
        let nodes = self.nodes.read();
        match nodes.get(key.as_str()) {
            Some(node) if node.kind == FileKind::File => Ok(Box::pin(Cursor::new(node.data.clone()))),
            Some(_) => Err(RemoteFsError::InvalidPath(format!("{} is a directory", key))),
            None => Err(RemoteFsError::NotFound(key.to_string())),
        }
    }

    async fn create(&self, scope: &ExecutionScope, path: &str) -> Result<WriteStream, RemoteFsError> {
        self.record(scope, "create", path)?;
        let key = RemotePath::new(path);
        let owner = scope_owner(scope);
        let mut nodes = self.nodes.write();

        if let Some(parent) = key.parent() {
            Self::create_ancestors(&mut nodes, &parent, &owner)?;
        }
        if nodes.get(key.as_str()).is_some_and(|n| n.kind == FileKind::Directory) {
            return Err(RemoteFsError::AlreadyExists(key.to_string()));
        }

        let group = key
            .parent()
            .and_then(|p| nodes.get(p.as_str()))
            .map_or_else(|| DEFAULT_GROUP.to_string(), |n| n.group.clone());
        nodes.insert(
            key.to_string(),
            Node {
                kind: FileKind::File,
                owner,
                group,
                mode: 0o644,
                data: Vec::new(),
                modified: now_millis(),
            },
        );

        Ok(Box::pin(MemoryWriter {
            nodes: Arc::clone(&self.nodes),
            path: key.to_string(),
        }))
    }

    async fn set_owner(&self, scope: &ExecutionScope, path: &str, user: &str, group: &str) -> Result<(), RemoteFsError> {
        self.record(scope, "setOwner", path)?;
        let key = RemotePath::new(path);
        let mut nodes = self.nodes.write();
        let node = nodes
            .get_mut(key.as_str())
            .ok_or_else(|| RemoteFsError::NotFound(key.to_string()))?;
        node.owner = user.to_string();
        node.group = group.to_string();
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RemoteFsError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteFsError::Unavailable("memory filesystem is offline".to_string()));
        }
        Ok(())
    }
}

/// Appends every write to the node it was created for
struct MemoryWriter {
    nodes: Tree,
    path: String,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        let mut nodes = self.nodes.write();
        match nodes.get_mut(&self.path) {
            Some(node) => {
                node.data.extend_from_slice(buf);
                node.modified = now_millis();
                Poll::Ready(Ok(buf.len()))
            }
            None => Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} was removed while writing", self.path),
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
