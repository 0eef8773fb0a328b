// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Composition root
//!
//! Wires configuration into the shared remote handle, identity broker,
//! session factory and users registry a protocol server needs.

use anyhow::{Context, Result};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::command_dispatcher::CommandDispatcher;
use super::session_manager::{SessionError, SessionViewFactory};
use crate::domain::delegation::IdentityBroker;
use crate::domain::gateway_config::GatewayConfigManifest;
use crate::domain::identity::Identity;
use crate::domain::remote_fs::RemoteFileSystem;
use crate::infrastructure::keytab::KeytabLogin;
use crate::infrastructure::remote::{RemoteBackend, RemoteFsHandle};
use crate::infrastructure::user_store::{AuthenticationError, UserRegistry};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("No users file configured")]
    NoUsers,

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub struct Gateway {
    config: GatewayConfigManifest,
    handle: Arc<RemoteFsHandle>,
    factory: SessionViewFactory,
    users: Option<UserRegistry>,
}

impl Gateway {
    /// Validate `config`, load the users file and prepare the lazily
    /// connected remote handle
    pub fn from_config(config: GatewayConfigManifest) -> Result<Self> {
        let handle = RemoteFsHandle::new(RemoteBackend::from(&config.spec.remote));
        Self::assemble(config, handle)
    }

    /// Same as [`Gateway::from_config`] around an existing client
    pub fn with_filesystem(config: GatewayConfigManifest, fs: Arc<dyn RemoteFileSystem>) -> Result<Self> {
        Self::assemble(config, RemoteFsHandle::from_filesystem(fs))
    }

    fn assemble(config: GatewayConfigManifest, handle: RemoteFsHandle) -> Result<Self> {
        config.validate().context("Invalid gateway configuration")?;

        let users = match &config.spec.users_file {
            Some(path) => Some(
                UserRegistry::from_yaml_file(path)
                    .with_context(|| format!("Failed to load users file {:?}", path))?,
            ),
            None => None,
        };

        let broker = IdentityBroker::new(
            config.spec.delegation.clone(),
            config.spec.remote.service_user.clone(),
            Arc::new(KeytabLogin::new()),
        );
        let handle = Arc::new(handle);
        let factory = SessionViewFactory::new(
            Arc::clone(&handle),
            Arc::new(broker),
            config.spec.sessions.confine_to_home,
        );

        info!(
            name = %config.metadata.name,
            backend = ?handle.backend(),
            delegation = config.spec.delegation.enabled,
            users = users.as_ref().map_or(0, UserRegistry::len),
            "Gateway assembled"
        );

        Ok(Self {
            config,
            handle,
            factory,
            users,
        })
    }

    /// Replace the registry loaded from the users file
    pub fn with_users(mut self, users: UserRegistry) -> Self {
        self.users = Some(users);
        self
    }

    pub fn config(&self) -> &GatewayConfigManifest {
        &self.config
    }

    pub fn handle(&self) -> &Arc<RemoteFsHandle> {
        &self.handle
    }

    pub fn factory(&self) -> &SessionViewFactory {
        &self.factory
    }

    pub fn users(&self) -> Option<&UserRegistry> {
        self.users.as_ref()
    }

    /// Session for an identity the protocol server already authenticated
    pub async fn open_session(&self, identity: Identity) -> Result<CommandDispatcher, SessionError> {
        let cursor = self.factory.create_view(identity).await?;
        Ok(CommandDispatcher::new(cursor))
    }

    /// Authenticate against the users registry and open a session
    pub async fn login(&self, name: &str, password: &str) -> Result<CommandDispatcher, LoginError> {
        let users = self.users.as_ref().ok_or(LoginError::NoUsers)?;
        let identity = users.authenticate(name, password)?;
        Ok(self.open_session(identity).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command_dispatcher::ProtocolCommand;
    use crate::domain::gateway_config::RemoteBackendKind;
    use crate::infrastructure::remote::MemoryFileSystem;
    use crate::infrastructure::user_store::{hash_password, UserAccount};

    fn memory_config() -> GatewayConfigManifest {
        let mut config = GatewayConfigManifest::default();
        config.spec.remote.backend = RemoteBackendKind::Memory;
        config
    }

    fn registry() -> UserRegistry {
        UserRegistry::from_accounts([UserAccount {
            name: "alice".to_string(),
            password_sha256: hash_password("pw"),
            primary_group: "staff".to_string(),
            groups: vec![],
            home_directory: "/user/alice".to_string(),
            enabled: true,
            can_write: true,
        }])
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_opens_session_at_home() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert_directory("/user/alice", "alice", "staff", 0o755);
        let gateway = Gateway::with_filesystem(memory_config(), fs).unwrap().with_users(registry());

        let mut session = gateway.login("alice", "pw").await.unwrap();
        let reply = session.dispatch(ProtocolCommand::Pwd).await;
        assert_eq!(reply.code, 257);
        assert!(reply.message.contains("/user/alice"));
    }

    #[tokio::test]
    async fn test_login_failures() {
        let gateway = Gateway::from_config(memory_config()).unwrap();
        assert!(matches!(gateway.login("alice", "pw").await, Err(LoginError::NoUsers)));

        let gateway = gateway.with_users(registry());
        assert!(matches!(
            gateway.login("alice", "nope").await,
            Err(LoginError::Authentication(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = memory_config();
        config.spec.delegation.enabled = true;
        assert!(Gateway::from_config(config).is_err());
    }

    #[test]
    fn test_missing_users_file_is_reported() {
        let mut config = memory_config();
        config.spec.users_file = Some("/nonexistent/users.yaml".into());
        let err = Gateway::from_config(config).err().unwrap();
        assert!(err.to_string().contains("users file"));
    }
}
