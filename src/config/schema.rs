//! Configuration schema definitions.
//!
//! Every section is defaulted, so an empty file is a valid (if useless)
//! configuration.

use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::security::TrustProxy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct VhostConfig {
    /// Default redirect status for mounts and aliases (301 or 302).
    pub redirect_code: u16,

    /// Peers whose `X-Forwarded-*` headers are believed.
    pub trust_proxy: TrustProxyConfig,

    pub observability: ObservabilityConfig,

    /// Applications mounted on addresses.
    pub mounts: Vec<MountConfig>,

    /// Hostname aliases.
    pub redirects: Vec<RedirectConfig>,

    /// Certificates for listeners that terminate TLS themselves.
    pub tls: Vec<TlsConfig>,
}

impl Default for VhostConfig {
    fn default() -> Self {
        Self {
            redirect_code: 302,
            trust_proxy: TrustProxyConfig::default(),
            observability: ObservabilityConfig::default(),
            mounts: Vec::new(),
            redirects: Vec::new(),
            tls: Vec::new(),
        }
    }
}

/// `"none"`, `"all"`, or a list of proxy addresses.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TrustProxyConfig {
    Mode(TrustMode),
    Addresses(Vec<IpAddr>),
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    None,
    All,
}

impl Default for TrustProxyConfig {
    fn default() -> Self {
        TrustProxyConfig::Mode(TrustMode::None)
    }
}

impl TrustProxyConfig {
    pub fn to_trust_proxy(&self) -> TrustProxy {
        match self {
            TrustProxyConfig::Mode(TrustMode::None) => TrustProxy::none(),
            TrustProxyConfig::Mode(TrustMode::All) => TrustProxy::all(),
            TrustProxyConfig::Addresses(addrs) => TrustProxy::addresses(addrs.iter().copied()),
        }
    }
}

/// An application mounted on one address.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MountConfig {
    /// Listener address, e.g. `https://*:8443` or `http://unix:/run/app.sock`.
    pub address: String,

    /// Hostname patterns; empty means `*`.
    #[serde(default)]
    pub hostnames: Vec<String>,

    /// Hostnames redirected to the single entry of `hostnames`.
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub force_tls: bool,

    /// Overrides the top-level `redirect_code`.
    #[serde(default)]
    pub redirect_code: Option<u16>,

    pub app: AppConfig,
}

/// Applications the binary can mount.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AppConfig {
    /// Fixed response.
    Static {
        #[serde(default = "default_status")]
        status: u16,
        #[serde(default)]
        body: String,
    },
    /// Reverse-proxy to an HTTP backend.
    Upstream { url: String },
}

fn default_status() -> u16 {
    200
}

/// Aliases on one address.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RedirectConfig {
    pub address: String,
    pub from: Vec<String>,
    /// `[scheme://]host[:port]`
    pub to: String,
    #[serde(default)]
    pub force_tls: bool,
    #[serde(default)]
    pub redirect_code: Option<u16>,
}

/// Certificate and key for a TLS-terminating listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Must name the same interface and port as a mount or redirect.
    pub address: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
