// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Keytab-backed service login
//!
//! Ticket negotiation happens outside this process (the HTTP layer or a
//! sidecar `kinit`). Login here verifies the keytab is usable and derives
//! the short service name presented to the NameNode as the proxying user.

use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::domain::delegation::{short_name, AuthorizationError, ServiceCredential, ServiceLogin};

#[derive(Debug, Default, Clone, Copy)]
pub struct KeytabLogin;

impl KeytabLogin {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceLogin for KeytabLogin {
    async fn login_from_keytab(
        &self,
        principal: &str,
        keytab: &Path,
    ) -> Result<ServiceCredential, AuthorizationError> {
        let failed = |reason: String| AuthorizationError::LoginFailed {
            principal: principal.to_string(),
            reason,
        };

        let metadata = tokio::fs::metadata(keytab)
            .await
            .map_err(|e| failed(format!("cannot read keytab {}: {}", keytab.display(), e)))?;
        if !metadata.is_file() {
            return Err(failed(format!("{} is not a file", keytab.display())));
        }
        if metadata.len() == 0 {
            return Err(failed(format!("keytab {} is empty", keytab.display())));
        }

        // Readability, not just existence
        tokio::fs::File::open(keytab)
            .await
            .map_err(|e| failed(format!("cannot open keytab {}: {}", keytab.display(), e)))?;

        let service_user = short_name(principal).map_err(|e| failed(e.to_string()))?;
        info!(principal, keytab = %keytab.display(), service_user, "Logged in from keytab");
        Ok(ServiceCredential::new(principal, service_user))
    }
}
