// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session context shared by the cursor and every entry it hands out

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::delegation::{AuthorizationError, IdentityBroker};
use super::identity::Identity;
use super::permission::Access;
use super::remote_fs::{ExecutionScope, RemoteFileSystem, RemoteFsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure of a permission-gated entry operation
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("Access denied: {access} on {path}")]
    AccessDenied { path: String, access: Access },

    #[error(transparent)]
    Remote(#[from] RemoteFsError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
}

impl EntryError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, EntryError::AccessDenied { .. })
    }
}

/// Principal, broker and filesystem handle of one session
pub struct SessionContext {
    id: SessionId,
    identity: Identity,
    broker: Arc<IdentityBroker>,
    fs: Arc<dyn RemoteFileSystem>,
}

impl SessionContext {
    pub fn new(identity: Identity, broker: Arc<IdentityBroker>, fs: Arc<dyn RemoteFileSystem>) -> Self {
        Self {
            id: SessionId::new(),
            identity,
            broker,
            fs,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn broker(&self) -> &IdentityBroker {
        &self.broker
    }

    pub fn is_delegated(&self) -> bool {
        self.broker.is_delegated()
    }

    /// Run one remote call under the scope the broker resolves for this session
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, EntryError>
    where
        F: FnOnce(ExecutionScope, Arc<dyn RemoteFileSystem>) -> Fut,
        Fut: Future<Output = Result<T, RemoteFsError>>,
    {
        let fs = Arc::clone(&self.fs);
        self.broker
            .run_as(&self.identity, |scope| async move {
                operation(scope, fs).await.map_err(EntryError::from)
            })
            .await
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("delegated", &self.broker.is_delegated())
            .finish()
    }
}
