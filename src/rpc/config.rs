//! RPC server configuration
//!
//! Bind address for gRPC, the optional JSON gateway port, CORS origins and
//! the error policy applied at the RPC boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the RPC boundary does with errors reported by the record store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log and answer with the (possibly empty) response value. Callers
    /// cannot tell "not found" from "exists with empty fields".
    #[default]
    Suppress,
    /// Log and answer with an error status (404 for missing keys, 500
    /// otherwise).
    Surface,
}

impl ErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorPolicy::Suppress => "suppress",
            ErrorPolicy::Surface => "surface",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suppress" => Ok(ErrorPolicy::Suppress),
            "surface" => Ok(ErrorPolicy::Surface),
            other => Err(format!(
                "Invalid error_policy: '{}'. Must be 'suppress' or 'surface'.",
                other
            )),
        }
    }
}

/// RPC server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// gRPC port (default: 50051)
    #[serde(default = "default_port")]
    pub port: u16,

    /// JSON gateway port (default: none, gateway disabled)
    #[serde(default)]
    pub http_port: Option<u16>,

    /// CORS allowed origins (default: none, which allows any origin)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Error policy at the RPC boundary (default: suppress)
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    50051
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            http_port: None,
            cors_origins: Vec::new(),
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl RpcServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// gRPC socket address
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// JSON gateway socket address, if the gateway is enabled
    pub fn http_socket_addr(&self) -> Option<String> {
        self.http_port.map(|port| format!("{}:{}", self.host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RpcServerConfig::default();
        assert_eq!(config.socket_addr(), "0.0.0.0:50051");
        assert_eq!(config.error_policy, ErrorPolicy::Suppress);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.http_socket_addr(), None);
    }

    #[test]
    fn test_with_port() {
        assert_eq!(RpcServerConfig::with_port(8080).socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RpcServerConfig =
            serde_json::from_str(r#"{"port": 6000, "error_policy": "surface"}"#).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.error_policy, ErrorPolicy::Surface);
    }

    #[test]
    fn test_http_port_enables_gateway() {
        let config: RpcServerConfig =
            serde_json::from_str(r#"{"host": "127.0.0.1", "http_port": 8080}"#).unwrap();
        assert_eq!(config.http_socket_addr().as_deref(), Some("127.0.0.1:8080"));
    }

    #[test]
    fn test_error_policy_from_str() {
        assert_eq!("surface".parse::<ErrorPolicy>(), Ok(ErrorPolicy::Surface));
        assert!("loud".parse::<ErrorPolicy>().is_err());
    }
}
