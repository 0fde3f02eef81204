//! Transport configuration types.

use std::sync::Arc;
use std::time::Duration;

/// Default port for plaintext SMTP (upgraded with STARTTLS if offered).
pub const DEFAULT_PORT: u16 = 25;

/// Default port for implicit TLS (SMTPS).
pub const DEFAULT_SECURE_PORT: u16 = 465;

/// TLS settings for implicit TLS and STARTTLS upgrades.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Name to verify the server certificate against. Defaults to the
    /// transport host.
    pub server_name: Option<String>,
    /// Custom rustls configuration. Defaults to the webpki root store.
    pub client_config: Option<Arc<rustls::ClientConfig>>,
}

impl TlsOptions {
    /// Sets the certificate verification name.
    #[must_use]
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Sets a custom rustls configuration.
    #[must_use]
    pub fn client_config(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.client_config = Some(config);
        self
    }

    /// Returns these options with unset fields taken from `base`.
    #[must_use]
    pub fn merge(&self, base: &Self) -> Self {
        Self {
            server_name: self
                .server_name
                .clone()
                .or_else(|| base.server_name.clone()),
            client_config: self
                .client_config
                .clone()
                .or_else(|| base.client_config.clone()),
        }
    }
}

/// Transport configuration: where to connect and how long the socket may
/// stay silent.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Socket idle timeout. [`Duration::ZERO`] disables it.
    pub timeout: Duration,
    /// Use TLS from the start (implicit TLS).
    pub secure: bool,
    /// TLS settings, also the base for STARTTLS upgrades.
    pub tls: TlsOptions,
}

impl TransportConfig {
    /// Creates a plaintext configuration on port 25 without idle timeout.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: Duration::ZERO,
            secure: false,
            tls: TlsOptions::default(),
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> TransportConfigBuilder {
        TransportConfigBuilder::new(host)
    }

    /// Returns the idle timeout, or `None` when disabled.
    #[must_use]
    pub const fn idle_timeout(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns the `host:port` pair.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    host: String,
    port: Option<u16>,
    timeout: Duration,
    secure: bool,
    tls: TlsOptions,
}

impl TransportConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            timeout: Duration::ZERO,
            secure: false,
            tls: TlsOptions::default(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the socket idle timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables implicit TLS.
    #[must_use]
    pub const fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the TLS options.
    #[must_use]
    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        let default_port = if self.secure {
            DEFAULT_SECURE_PORT
        } else {
            DEFAULT_PORT
        };
        TransportConfig {
            host: self.host,
            port: self.port.unwrap_or(default_port),
            timeout: self.timeout,
            secure: self.secure,
            tls: self.tls,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = TransportConfig::new("smtp.example.com");
        assert_eq!(config.host, "smtp.example.com");
        assert_eq!(config.port, 25);
        assert!(!config.secure);
        assert_eq!(config.idle_timeout(), None);
        assert_eq!(config.address(), "smtp.example.com:25");
    }

    #[test]
    fn test_config_builder() {
        let config = TransportConfig::builder("smtp.example.com")
            .port(587)
            .timeout(Duration::from_secs(30))
            .build();

        assert_eq!(config.port, 587);
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_config_builder_secure_default_port() {
        let config = TransportConfig::builder("smtp.example.com")
            .secure(true)
            .build();
        assert_eq!(config.port, 465);
        assert!(config.secure);
    }

    #[test]
    fn test_tls_options_merge() {
        let base = TlsOptions::default().server_name("base.example.com");
        let merged = TlsOptions::default().merge(&base);
        assert_eq!(merged.server_name.as_deref(), Some("base.example.com"));

        let merged = TlsOptions::default()
            .server_name("override.example.com")
            .merge(&base);
        assert_eq!(merged.server_name.as_deref(), Some("override.example.com"));
        assert!(merged.client_config.is_none());
    }
}
