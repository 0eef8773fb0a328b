// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session View Factory
//!
//! Called once per authenticated connection. Validates delegation settings,
//! establishes the execution scope (logging in from the keytab when
//! delegation is on) and builds the [`DirectoryCursor`] inside it.

use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::domain::delegation::{AuthorizationError, ConfigurationError, IdentityBroker};
use crate::domain::directory_cursor::DirectoryCursor;
use crate::domain::identity::Identity;
use crate::domain::remote_fs::RemoteFsError;
use crate::domain::session::SessionContext;
use crate::infrastructure::remote::RemoteFsHandle;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Authorization failed: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Invalid session identity: {0}")]
    InvalidIdentity(String),

    #[error("Remote filesystem unavailable: {0}")]
    Remote(#[from] RemoteFsError),
}

pub struct SessionViewFactory {
    handle: Arc<RemoteFsHandle>,
    broker: Arc<IdentityBroker>,
    confine_to_home: bool,
}

impl SessionViewFactory {
    pub fn new(handle: Arc<RemoteFsHandle>, broker: Arc<IdentityBroker>, confine_to_home: bool) -> Self {
        Self {
            handle,
            broker,
            confine_to_home,
        }
    }

    pub fn broker(&self) -> &Arc<IdentityBroker> {
        &self.broker
    }

    /// Build the per-session view for an authenticated user
    pub async fn create_view(&self, identity: Identity) -> Result<DirectoryCursor, SessionError> {
        if let Err(e) = self.broker.ensure_configured() {
            error!(user = %identity, error = %e, "Delegation misconfigured, refusing session");
            counter!("hdfs_gateway.sessions.rejected", "reason" => "configuration").increment(1);
            return Err(e.into());
        }

        if identity.name().trim().is_empty() {
            return Err(SessionError::InvalidIdentity("user name is empty".to_string()));
        }
        if identity.home_directory().trim().is_empty() {
            return Err(SessionError::InvalidIdentity(format!(
                "user {} has no home directory",
                identity.name()
            )));
        }

        let fs = self.handle.get().await?;
        let context = Arc::new(SessionContext::new(identity, Arc::clone(&self.broker), fs));
        let confine_to_home = self.confine_to_home;

        let session = Arc::clone(&context);
        let cursor = self
            .broker
            .run_as(context.identity(), |scope| async move {
                debug!(session_id = %session.id(), scope = ?scope, "Building directory cursor");
                Ok::<_, SessionError>(DirectoryCursor::new(session, confine_to_home))
            })
            .await
            .inspect_err(|e| {
                counter!("hdfs_gateway.sessions.rejected", "reason" => "authorization").increment(1);
                error!(user = %context.identity(), error = %e, "Cannot establish session scope");
            })?;

        counter!("hdfs_gateway.sessions.created").increment(1);
        info!(
            session_id = %context.id(),
            user = %context.identity(),
            home = %cursor.root(),
            delegated = context.is_delegated(),
            "Session view created"
        );
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delegation::{DelegationConfig, ServiceCredential, ServiceLogin};
    use crate::infrastructure::remote::MemoryFileSystem;
    use async_trait::async_trait;
    use std::path::Path;

    struct StaticLogin;

    #[async_trait]
    impl ServiceLogin for StaticLogin {
        async fn login_from_keytab(&self, principal: &str, _keytab: &Path) -> Result<ServiceCredential, AuthorizationError> {
            Ok(ServiceCredential::new(principal, "ftp"))
        }
    }

    fn handle() -> Arc<RemoteFsHandle> {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert_directory("/home/alice", "alice", "staff", 0o755);
        Arc::new(RemoteFsHandle::from_filesystem(fs))
    }

    #[tokio::test]
    async fn test_ambient_view_starts_at_home() {
        let factory = SessionViewFactory::new(handle(), Arc::new(IdentityBroker::ambient(None)), false);
        let cursor = factory
            .create_view(Identity::new("alice", "staff", "/home/alice"))
            .await
            .unwrap();
        assert_eq!(cursor.current_path().as_str(), "/home/alice");
        assert!(!cursor.is_confined());
    }

    #[tokio::test]
    async fn test_missing_home_rejected() {
        let factory = SessionViewFactory::new(handle(), Arc::new(IdentityBroker::ambient(None)), false);
        let result = factory.create_view(Identity::new("alice", "staff", "")).await;
        assert!(matches!(result, Err(SessionError::InvalidIdentity(_))));
    }

    #[tokio::test]
    async fn test_empty_principal_is_configuration_error() {
        let broker = IdentityBroker::new(
            DelegationConfig::keytab("/etc/gw.keytab", ""),
            None,
            Arc::new(StaticLogin),
        );
        let factory = SessionViewFactory::new(handle(), Arc::new(broker), false);
        let result = factory.create_view(Identity::new("alice", "staff", "/home/alice")).await;
        assert!(matches!(result, Err(SessionError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_delegated_view() {
        let broker = IdentityBroker::new(
            DelegationConfig::keytab("/etc/gw.keytab", "ftp/gw@EXAMPLE.COM"),
            None,
            Arc::new(StaticLogin),
        );
        let factory = SessionViewFactory::new(handle(), Arc::new(broker), true);
        let cursor = factory
            .create_view(Identity::new("alice", "staff", "/home/alice"))
            .await
            .unwrap();
        assert!(cursor.is_confined());
        assert!(factory.broker().is_delegated());
    }
}
