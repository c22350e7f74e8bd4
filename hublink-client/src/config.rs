//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// TLS configuration for negotiate and socket connections.
#[derive(Debug, Clone, Default)]
pub struct TlsClientConfig {
    /// Path to PEM-encoded CA certificate(s) for server verification.
    /// If None, the webpki roots are used.
    pub ca_cert_path: Option<PathBuf>,
    /// Skip server certificate verification (INSECURE - development only).
    ///
    /// Test deployments of hub servers commonly run with self-signed
    /// certificates; this switch exists for them.
    pub insecure: bool,
}

impl TlsClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    pub fn with_insecure(mut self) -> Self {
        self.insecure = true;
        self
    }
}

/// Hub connection configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Base server URL, e.g. `https://example.com:5001`.
    pub url: String,
    /// Hub name, appended to the base URL.
    pub hub: String,
    /// TLS configuration.
    pub tls: TlsClientConfig,
    /// Limit for negotiate plus socket connect and handshake.
    /// None blocks until the server answers.
    pub connect_timeout: Option<Duration>,
    /// Limit for each frame read. None waits indefinitely.
    pub receive_timeout: Option<Duration>,
}

impl HubConfig {
    pub fn new(url: impl Into<String>, hub: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            hub: hub.into(),
            tls: TlsClientConfig::default(),
            connect_timeout: None,
            receive_timeout: None,
        }
    }

    pub fn with_tls(mut self, tls_config: TlsClientConfig) -> Self {
        self.tls = tls_config;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = HubConfig::new("https://localhost:5001", "gameHub");
        assert_eq!(config.hub, "gameHub");
        assert!(config.connect_timeout.is_none());
        assert!(config.receive_timeout.is_none());
        assert!(!config.tls.insecure);
        assert!(config.tls.ca_cert_path.is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = HubConfig::new("https://localhost:5001", "gameHub")
            .with_tls(TlsClientConfig::new().with_insecure().with_ca_cert("/tmp/ca.pem"))
            .with_connect_timeout(Duration::from_secs(5))
            .with_receive_timeout(Duration::from_secs(60));

        assert!(config.tls.insecure);
        assert_eq!(config.tls.ca_cert_path, Some(PathBuf::from("/tmp/ca.pem")));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.receive_timeout, Some(Duration::from_secs(60)));
    }
}
