// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! YAML-backed end-user accounts
//!
//! ```yaml
//! users:
//!   - name: alice
//!     password_sha256: 2bd806c9...
//!     primary_group: staff
//!     groups: [analytics]
//!     home_directory: /user/alice
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::identity::Identity;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("Unknown user or wrong password")]
    InvalidCredentials,

    #[error("Account {0} is disabled")]
    Disabled(String),
}

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Cannot read users file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed users file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Duplicate user '{0}'")]
    Duplicate(String),

    #[error("User '{0}' has an invalid password hash")]
    InvalidHash(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub name: String,
    /// Hex-encoded SHA-256 of the password
    pub password_sha256: String,
    pub primary_group: String,
    #[serde(default)]
    pub groups: Vec<String>,
    pub home_directory: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub can_write: bool,
}

impl UserAccount {
    pub fn identity(&self) -> Identity {
        let identity = Identity::new(&self.name, &self.primary_group, &self.home_directory)
            .with_groups(self.groups.iter().cloned());
        if self.can_write {
            identity
        } else {
            identity.read_only()
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: Vec<UserAccount>,
}

/// Hex SHA-256 digest stored in the users file
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Debug, Default)]
pub struct UserRegistry {
    accounts: HashMap<String, UserAccount>,
}

impl UserRegistry {
    pub fn from_accounts(accounts: impl IntoIterator<Item = UserAccount>) -> Result<Self, UserStoreError> {
        let mut map = HashMap::new();
        for account in accounts {
            let valid_hash = hex::decode(&account.password_sha256).is_ok_and(|h| h.len() == 32);
            if !valid_hash {
                return Err(UserStoreError::InvalidHash(account.name));
            }
            if map.contains_key(&account.name) {
                return Err(UserStoreError::Duplicate(account.name));
            }
            map.insert(account.name.clone(), account);
        }
        Ok(Self { accounts: map })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, UserStoreError> {
        let file: UsersFile = serde_yaml::from_str(yaml)?;
        Self::from_accounts(file.users)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, UserStoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&UserAccount> {
        self.accounts.get(name)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &UserAccount> {
        self.accounts.values()
    }

    /// Verify a login and produce the session identity
    pub fn authenticate(&self, name: &str, password: &str) -> Result<Identity, AuthenticationError> {
        let supplied = Sha256::digest(password.as_bytes());

        let Some(account) = self.accounts.get(name) else {
            debug!(user = name, "Login for unknown user");
            return Err(AuthenticationError::InvalidCredentials);
        };

        let stored = hex::decode(&account.password_sha256).unwrap_or_default();
        if !bool::from(stored.as_slice().ct_eq(supplied.as_slice())) {
            warn!(user = name, "Login rejected: wrong password");
            return Err(AuthenticationError::InvalidCredentials);
        }

        if !account.enabled {
            warn!(user = name, "Login rejected: account disabled");
            return Err(AuthenticationError::Disabled(name.to_string()));
        }

        Ok(account.identity())
    }
}
