// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gateway Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) covering:
// - Remote filesystem endpoint and backend
// - Delegated authentication (keytab + principal)
// - Listener ports handed to the protocol server
// - Session policy and the users file

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::delegation::DelegationConfig;

pub const API_VERSION: &str = "hdfs-gateway/v1";
pub const KIND: &str = "GatewayConfig";
pub const CONFIG_PATH_ENV: &str = "HDFS_GATEWAY_CONFIG_PATH";

/// Top-level gateway configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfigManifest {
    /// API version (must be "hdfs-gateway/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "GatewayConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: GatewayConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Content under `spec:`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfigSpec {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub delegation: DelegationConfig,

    #[serde(default)]
    pub listeners: ListenerConfig,

    #[serde(default)]
    pub sessions: SessionPolicy,

    /// YAML file with end-user accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users_file: Option<PathBuf>,
}

/// Which remote filesystem client to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackendKind {
    #[default]
    Webhdfs,
    /// In-process namespace; contents are lost at exit
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub backend: RemoteBackendKind,

    /// NameNode HTTP address, e.g. `http://namenode:9870` or `webhdfs://namenode:9870`
    #[serde(default = "default_remote_uri")]
    pub uri: String,

    /// User name presented when delegation is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_user: Option<String>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: RemoteBackendKind::default(),
            uri: default_remote_uri(),
            service_user: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Listener settings consumed by the protocol server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Plain control port; no plain listener when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Passive data port range, e.g. "2223-2225"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_ports: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_data_ports: Option<String>,

    /// Maximum concurrent logins, 0 for unlimited
    #[serde(default)]
    pub max_logins: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: Some(2222),
            data_ports: Some("2223-2225".to_string()),
            ssl_port: None,
            ssl_data_ports: None,
            max_logins: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// Reject paths that normalize outside the user's home directory
    #[serde(default)]
    pub confine_to_home: bool,
}

fn default_remote_uri() -> String {
    "http://localhost:9870".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for GatewayConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "hdfs-gateway".to_string(),
                labels: None,
            },
            spec: GatewayConfigSpec::default(),
        }
    }
}

impl GatewayConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. HDFS_GATEWAY_CONFIG_PATH environment variable
    /// 2. ./hdfs-gateway.yaml (working directory)
    /// 3. ~/.hdfs-gateway/config.yaml (user home)
    /// 4. /etc/hdfs-gateway/config.yaml
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./hdfs-gateway.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hdfs-gateway").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/hdfs-gateway/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment overrides for container deployments
    pub fn apply_env_overrides(&mut self) {
        if let Ok(uri) = std::env::var("HDFS_GATEWAY_REMOTE_URI") {
            tracing::info!("Environment override: HDFS_GATEWAY_REMOTE_URI={}", uri);
            self.spec.remote.uri = uri;
        }

        if let Ok(val) = std::env::var("HDFS_GATEWAY_DELEGATION_ENABLED") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: HDFS_GATEWAY_DELEGATION_ENABLED=true");
                    self.spec.delegation.enabled = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: HDFS_GATEWAY_DELEGATION_ENABLED=false");
                    self.spec.delegation.enabled = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for HDFS_GATEWAY_DELEGATION_ENABLED: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let remote = &self.spec.remote;
        if remote.backend == RemoteBackendKind::Webhdfs {
            if remote.uri.trim().is_empty() {
                anyhow::bail!("spec.remote.uri cannot be empty");
            }
            url::Url::parse(&remote.uri)
                .map_err(|e| anyhow::anyhow!("spec.remote.uri '{}' is not a valid URL: {}", remote.uri, e))?;
        }

        let listeners = &self.spec.listeners;
        if listeners.port.is_some() && listeners.data_ports.as_deref().map_or(true, str::is_empty) {
            anyhow::bail!("spec.listeners.data_ports is required when spec.listeners.port is set");
        }
        if listeners.ssl_port.is_some()
            && listeners.ssl_data_ports.as_deref().map_or(true, str::is_empty)
        {
            anyhow::bail!("spec.listeners.ssl_data_ports is required when spec.listeners.ssl_port is set");
        }

        self.spec.delegation.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = GatewayConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(!manifest.spec.delegation.enabled);
        assert!(!manifest.spec.sessions.confine_to_home);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
apiVersion: hdfs-gateway/v1
kind: GatewayConfig
metadata:
  name: edge-gateway
spec:
  remote:
    uri: webhdfs://namenode.example.com:9870
    service_user: hdfs
  delegation:
    enabled: true
    keytab_path: /etc/security/ftp.keytab
    principal: ftp/gw.example.com@EXAMPLE.COM
  listeners:
    port: 21
    data_ports: "2222-2230"
    max_logins: 50
  sessions:
    confine_to_home: true
  users_file: /etc/hdfs-gateway/users.yaml
"#;
        let manifest = GatewayConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "edge-gateway");
        assert_eq!(manifest.spec.remote.timeout_seconds, 30);
        assert_eq!(manifest.spec.remote.backend, RemoteBackendKind::Webhdfs);
        assert_eq!(manifest.spec.delegation.renew_interval_seconds, 3600);
        assert_eq!(manifest.spec.listeners.max_logins, 50);
        assert!(manifest.spec.sessions.confine_to_home);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut manifest = GatewayConfigManifest::default();
        manifest.spec.remote.backend = RemoteBackendKind::Memory;
        manifest.to_yaml_file(&path).unwrap();

        let loaded = GatewayConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.spec.remote.backend, RemoteBackendKind::Memory);
    }

    #[test]
    fn test_validation() {
        let mut manifest = GatewayConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "WrongKind".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.remote.uri = "".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.remote.uri = "http://namenode:9870".to_string();

        manifest.spec.listeners.data_ports = None;
        assert!(manifest.validate().is_err());
        manifest.spec.listeners.data_ports = Some("2223-2225".to_string());

        manifest.spec.listeners.ssl_port = Some(990);
        assert!(manifest.validate().is_err());
        manifest.spec.listeners.ssl_data_ports = Some("2300-2310".to_string());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_delegation_without_keytab_is_rejected() {
        let mut manifest = GatewayConfigManifest::default();
        manifest.spec.delegation.enabled = true;
        manifest.spec.delegation.principal = Some("ftp@EXAMPLE.COM".to_string());
        assert!(manifest.validate().is_err());
    }
}
