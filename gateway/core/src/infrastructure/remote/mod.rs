// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Remote Filesystem Infrastructure Module
//!
//! Concrete [`RemoteFileSystem`] clients and the shared, lazily connected
//! handle every session uses.

pub mod memory;
pub mod webhdfs;

pub use memory::MemoryFileSystem;
pub use webhdfs::WebHdfsClient;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

use crate::domain::gateway_config::{RemoteBackendKind, RemoteConfig};
use crate::domain::remote_fs::{RemoteFileSystem, RemoteFsError};

/// Remote backend configuration
#[derive(Debug, Clone)]
pub enum RemoteBackend {
    /// HDFS NameNode over WebHDFS (production)
    WebHdfs { uri: String, timeout: Duration },

    /// In-process namespace (development/testing)
    Memory,
}

impl From<&RemoteConfig> for RemoteBackend {
    fn from(config: &RemoteConfig) -> Self {
        match config.backend {
            RemoteBackendKind::Webhdfs => RemoteBackend::WebHdfs {
                uri: config.uri.clone(),
                timeout: Duration::from_secs(config.timeout_seconds),
            },
            RemoteBackendKind::Memory => RemoteBackend::Memory,
        }
    }
}

/// Factory function to create a remote filesystem client from configuration
pub fn create_remote_filesystem(backend: &RemoteBackend) -> Result<Arc<dyn RemoteFileSystem>, RemoteFsError> {
    match backend {
        RemoteBackend::WebHdfs { uri, timeout } => Ok(Arc::new(WebHdfsClient::new(uri, *timeout)?)),
        RemoteBackend::Memory => Ok(Arc::new(MemoryFileSystem::new())),
    }
}

/// Process-wide remote filesystem client, built on first use
///
/// Concurrent first calls race on a single initialization; every caller
/// observes the same instance afterwards.
pub struct RemoteFsHandle {
    cell: OnceCell<Arc<dyn RemoteFileSystem>>,
    backend: RemoteBackend,
}

impl RemoteFsHandle {
    pub fn new(backend: RemoteBackend) -> Self {
        Self {
            cell: OnceCell::new(),
            backend,
        }
    }

    /// Handle around an already constructed client
    pub fn from_filesystem(fs: Arc<dyn RemoteFileSystem>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(fs)),
            backend: RemoteBackend::Memory,
        }
    }

    pub fn backend(&self) -> &RemoteBackend {
        &self.backend
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> Result<Arc<dyn RemoteFileSystem>, RemoteFsError> {
        let fs = self
            .cell
            .get_or_try_init(|| async {
                info!(backend = ?self.backend, "Connecting remote filesystem");
                create_remote_filesystem(&self.backend)
            })
            .await?;
        Ok(Arc::clone(fs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::remote_fs::ExecutionScope;

    #[tokio::test]
    async fn test_handle_initializes_once_under_race() {
        let handle = Arc::new(RemoteFsHandle::new(RemoteBackend::Memory));
        assert!(!handle.is_initialized());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                tokio::spawn(async move { handle.get().await.unwrap() })
            })
            .collect();

        let mut instances = Vec::new();
        for task in tasks {
            instances.push(task.await.unwrap());
        }
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(handle.is_initialized());
    }

    #[tokio::test]
    async fn test_from_filesystem_shares_instance() {
        let memory = Arc::new(MemoryFileSystem::new());
        memory.insert_directory("/seeded", "hdfs", "supergroup", 0o755);

        let handle = RemoteFsHandle::from_filesystem(memory);
        let fs = handle.get().await.unwrap();
        assert!(fs
            .is_directory(&ExecutionScope::ambient(None), "/seeded")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_invalid_uri_fails_on_first_use() {
        let handle = RemoteFsHandle::new(RemoteBackend::WebHdfs {
            uri: "ftp://not-webhdfs".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert!(handle.get().await.is_err());
        assert!(!handle.is_initialized());
    }
}
