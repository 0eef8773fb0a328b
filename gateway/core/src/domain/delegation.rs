// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Identity Delegation
//!
//! [`IdentityBroker`] decides which principal a remote call runs under.
//!
//! - Delegation disabled: every call runs with the gateway's ambient
//!   credential; the session identity only feeds permission-bit checks.
//! - Delegation enabled: the broker logs in once from a keytab, caches the
//!   resulting service credential and wraps every call in a proxy scope for
//!   the session user.
//!
//! Misconfiguration (enabled without keytab or principal) is a
//! [`ConfigurationError`]; login failures are [`AuthorizationError`]s and are
//! never retried here.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::identity::Identity;
use super::remote_fs::ExecutionScope;

/// Delegated authentication was requested but cannot work as configured
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Delegated authentication enabled, keytab path and principal can not be empty")]
    MissingDelegationCredentials,

    #[error("Invalid delegation principal '{0}'")]
    InvalidPrincipal(String),
}

/// Login or impersonation failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Keytab login failed for {principal}: {reason}")]
    LoginFailed { principal: String, reason: String },

    #[error("Cannot impersonate user {user}: {reason}")]
    ProxyRejected { user: String, reason: String },

    #[error("Delegation is not configured: {0}")]
    NotConfigured(#[from] ConfigurationError),
}

/// Delegated authentication settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keytab_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,

    /// Age after which the cached service credential is renewed from the keytab
    #[serde(default = "default_renew_interval_seconds")]
    pub renew_interval_seconds: u64,
}

impl DelegationConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            keytab_path: None,
            principal: None,
            renew_interval_seconds: default_renew_interval_seconds(),
        }
    }

    pub fn keytab(keytab_path: impl Into<PathBuf>, principal: impl Into<String>) -> Self {
        Self {
            enabled: true,
            keytab_path: Some(keytab_path.into()),
            principal: Some(principal.into()),
            renew_interval_seconds: default_renew_interval_seconds(),
        }
    }

    pub fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.renew_interval_seconds)
    }

    /// Reject enabled delegation without a keytab path or principal
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.enabled {
            return Ok(());
        }

        let keytab_missing = self
            .keytab_path
            .as_ref()
            .map_or(true, |p| p.as_os_str().is_empty());
        let principal_missing = self.principal.as_ref().map_or(true, |p| p.trim().is_empty());

        if keytab_missing || principal_missing {
            return Err(ConfigurationError::MissingDelegationCredentials);
        }

        if let Some(principal) = &self.principal {
            short_name(principal)?;
        }

        Ok(())
    }
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

fn default_renew_interval_seconds() -> u64 {
    3600
}

/// Short user name of a Kerberos principal: `primary[/instance][@REALM]` → `primary`
pub fn short_name(principal: &str) -> Result<&str, ConfigurationError> {
    let primary = principal
        .split('@')
        .next()
        .and_then(|p| p.split('/').next())
        .unwrap_or_default()
        .trim();

    if primary.is_empty() {
        return Err(ConfigurationError::InvalidPrincipal(principal.to_string()));
    }
    Ok(primary)
}

/// Credential obtained from a keytab login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCredential {
    pub principal: String,
    /// Short name presented to the remote filesystem as the real user
    pub service_user: String,
    pub obtained_at: Instant,
}

impl ServiceCredential {
    pub fn new(principal: impl Into<String>, service_user: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            service_user: service_user.into(),
            obtained_at: Instant::now(),
        }
    }

    pub fn needs_renewal(&self, interval: Duration) -> bool {
        self.obtained_at.elapsed() >= interval
    }
}

/// Keytab login capability (implemented in infrastructure)
#[async_trait]
pub trait ServiceLogin: Send + Sync {
    async fn login_from_keytab(
        &self,
        principal: &str,
        keytab: &Path,
    ) -> Result<ServiceCredential, AuthorizationError>;
}

struct DelegatedMode {
    config: DelegationConfig,
    login: Arc<dyn ServiceLogin>,
    credential: RwLock<Option<ServiceCredential>>,
    /// Serializes login/renewal so concurrent sessions log in once
    renewal: tokio::sync::Mutex<()>,
}

/// Resolves the execution scope of every remote call
pub struct IdentityBroker {
    ambient_user: Option<String>,
    delegated: Option<DelegatedMode>,
}

impl IdentityBroker {
    /// Broker that always uses the gateway's ambient credential
    pub fn ambient(ambient_user: Option<String>) -> Self {
        Self {
            ambient_user,
            delegated: None,
        }
    }

    /// Broker for the given delegation settings. Validation is deferred to
    /// [`IdentityBroker::ensure_configured`], called at session creation.
    pub fn new(
        config: DelegationConfig,
        ambient_user: Option<String>,
        login: Arc<dyn ServiceLogin>,
    ) -> Self {
        if !config.enabled {
            return Self::ambient(ambient_user);
        }

        Self {
            ambient_user,
            delegated: Some(DelegatedMode {
                config,
                login,
                credential: RwLock::new(None),
                renewal: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.delegated.is_some()
    }

    pub fn ambient_user(&self) -> Option<&str> {
        self.ambient_user.as_deref()
    }

    pub fn ensure_configured(&self) -> Result<(), ConfigurationError> {
        match &self.delegated {
            Some(mode) => mode.config.validate(),
            None => Ok(()),
        }
    }

    /// Scope the next remote call for `identity` runs under
    pub async fn scope_for(&self, identity: &Identity) -> Result<ExecutionScope, AuthorizationError> {
        let Some(mode) = &self.delegated else {
            return Ok(ExecutionScope::ambient(self.ambient_user.clone()));
        };

        let credential = self.credential(mode).await?;
        if identity.name().is_empty() {
            return Err(AuthorizationError::ProxyRejected {
                user: identity.name().to_string(),
                reason: "empty user name".to_string(),
            });
        }

        Ok(ExecutionScope::Proxy {
            service_user: credential.service_user,
            effective_user: identity.name().to_string(),
        })
    }

    /// Run `operation` under the scope resolved for `identity`
    pub async fn run_as<T, E, F, Fut>(&self, identity: &Identity, operation: F) -> Result<T, E>
    where
        E: From<AuthorizationError>,
        F: FnOnce(ExecutionScope) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let scope = self.scope_for(identity).await?;
        operation(scope).await
    }

    /// Cached credential, logging in or renewing when missing or stale
    async fn credential(&self, mode: &DelegatedMode) -> Result<ServiceCredential, AuthorizationError> {
        let interval = mode.config.renew_interval();
        if let Some(credential) = mode.credential.read().as_ref() {
            if !credential.needs_renewal(interval) {
                return Ok(credential.clone());
            }
        }

        let _guard = mode.renewal.lock().await;

        // Another session may have renewed while we waited
        if let Some(credential) = mode.credential.read().as_ref() {
            if !credential.needs_renewal(interval) {
                return Ok(credential.clone());
            }
        }

        mode.config.validate()?;
        let (principal, keytab) = match (&mode.config.principal, &mode.config.keytab_path) {
            (Some(principal), Some(keytab)) => (principal, keytab),
            _ => return Err(ConfigurationError::MissingDelegationCredentials.into()),
        };

        debug!(principal = %principal, keytab = %keytab.display(), "Logging in from keytab");
        let credential = match mode.login.login_from_keytab(principal, keytab).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(principal = %principal, error = %e, "Keytab login failed");
                return Err(e);
            }
        };

        info!(
            principal = %credential.principal,
            service_user = %credential.service_user,
            "Delegation credential obtained"
        );
        *mode.credential.write() = Some(credential.clone());
        Ok(credential)
    }
}
