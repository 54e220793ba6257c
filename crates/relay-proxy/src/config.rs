//! Configuration types for the Relay proxy.

use crate::error::ProxyError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Port the proxy listens on (0 = ephemeral, bound address reported by start()).
    pub port: u16,

    /// Target endpoints, in order. The proxy always forwards to the first
    /// entry; additional entries are accepted but unused (no failover or
    /// balancing).
    #[serde(default)]
    pub target_endpoints: Vec<String>,

    /// When false, every request is forwarded silently and no capture
    /// events are published.
    #[serde(default)]
    pub intercept_enabled: bool,

    /// When true, captured requests are forwarded immediately instead of
    /// being held for manual resolution.
    #[serde(default)]
    pub auto_respond: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 8888,
            target_endpoints: Vec::new(),
            intercept_enabled: false,
            auto_respond: false,
        }
    }
}

impl ProxyConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: ProxyConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration before the proxy starts serving.
    pub fn validate(&self) -> Result<(), ProxyError> {
        if self.target_endpoints.is_empty() {
            return Err(ProxyError::InvalidConfig(
                "at least one target endpoint is required".to_string(),
            ));
        }

        for endpoint in &self.target_endpoints {
            let parts: Vec<&str> = endpoint.splitn(2, "://").collect();
            if parts.len() != 2 {
                return Err(ProxyError::InvalidConfig(format!(
                    "invalid target endpoint (missing scheme): {endpoint}"
                )));
            }
            match parts[0] {
                "http" | "https" => {}
                other => {
                    return Err(ProxyError::InvalidConfig(format!(
                        "unsupported target scheme '{other}' in {endpoint} (supported: http, https)"
                    )));
                }
            }
        }

        Ok(())
    }

    /// The endpoint requests are forwarded to. Index 0, unconditionally.
    pub fn primary_target(&self) -> Option<&str> {
        self.target_endpoints.first().map(|s| s.as_str())
    }
}

/// Partial configuration for runtime merge-updates. Unset fields leave the
/// live value untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_endpoints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intercept_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_respond: Option<bool>,
}

/// Live configuration shared between the accept loop, connection tasks, and
/// the control API. Updates apply to requests captured afterwards; a request
/// already held or forwarded keeps the policy it was captured under.
pub struct ConfigStore {
    inner: RwLock<ProxyConfig>,
}

impl ConfigStore {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    /// Snapshot of the current configuration. Connection tasks take one
    /// snapshot at capture time and never re-read.
    pub fn snapshot(&self) -> ProxyConfig {
        self.inner.read().clone()
    }

    /// Merge a partial update into the live configuration.
    ///
    /// A port change only takes effect on the next `start()`; the live
    /// listener is not rebound.
    pub fn update(&self, update: ConfigUpdate) -> ProxyConfig {
        let mut config = self.inner.write();
        if let Some(port) = update.port {
            config.port = port;
        }
        if let Some(targets) = update.target_endpoints {
            config.target_endpoints = targets;
        }
        if let Some(intercept) = update.intercept_enabled {
            config.intercept_enabled = intercept;
        }
        if let Some(auto) = update.auto_respond {
            config.auto_respond = auto;
        }
        config.clone()
    }
}
