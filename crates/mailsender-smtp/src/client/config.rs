//! Command-layer configuration.

use std::time::Duration;

use crate::channel::TlsOptions;

/// Per-category operation deadlines. `None` waits indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// Socket open plus greeting.
    pub connect: Option<Duration>,
    /// HELO, EHLO, MAIL, RCPT, NOOP, RSET, QUIT and STARTTLS.
    pub command: Option<Duration>,
    /// Each round trip of an AUTH exchange.
    pub auth: Option<Duration>,
    /// DATA and the message body.
    pub data: Option<Duration>,
    /// The TLS handshake after STARTTLS.
    pub tls: Option<Duration>,
}

impl Timeouts {
    /// Applies one deadline to every category.
    #[must_use]
    pub const fn uniform(deadline: Duration) -> Self {
        Self {
            connect: Some(deadline),
            command: Some(deadline),
            auth: Some(deadline),
            data: Some(deadline),
            tls: Some(deadline),
        }
    }
}

/// Command-layer configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Name sent in HELO/EHLO. Derived from the local host name when unset.
    pub hostname: Option<String>,
    /// Operation deadlines.
    pub timeouts: Timeouts,
    /// TLS options passed to the STARTTLS handshake.
    pub tls: TlsOptions,
    /// Keep empty reply lines instead of dropping them.
    pub keep_blank_lines: bool,
}

impl ClientConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Sets the HELO/EHLO name.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.hostname = Some(hostname.into());
        self
    }

    /// Sets all operation deadlines.
    #[must_use]
    pub const fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    /// Sets the connect deadline.
    #[must_use]
    pub const fn connect_timeout(mut self, deadline: Duration) -> Self {
        self.config.timeouts.connect = Some(deadline);
        self
    }

    /// Sets the per-command deadline.
    #[must_use]
    pub const fn command_timeout(mut self, deadline: Duration) -> Self {
        self.config.timeouts.command = Some(deadline);
        self
    }

    /// Sets the STARTTLS TLS options.
    #[must_use]
    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.config.tls = tls;
        self
    }

    /// Keeps empty reply lines.
    #[must_use]
    pub const fn keep_blank_lines(mut self, keep: bool) -> Self {
        self.config.keep_blank_lines = keep;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_wait_indefinitely() {
        let config = ClientConfig::default();
        assert_eq!(config.timeouts, Timeouts::default());
        assert!(config.timeouts.command.is_none());
        assert!(config.hostname.is_none());
        assert!(!config.keep_blank_lines);
    }

    #[test]
    fn builder_overrides_selected_timeouts() {
        let config = ClientConfig::builder()
            .hostname("client.example.com")
            .timeouts(Timeouts::uniform(Duration::from_secs(30)))
            .command_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.hostname.as_deref(), Some("client.example.com"));
        assert_eq!(config.timeouts.command, Some(Duration::from_secs(5)));
        assert_eq!(config.timeouts.data, Some(Duration::from_secs(30)));
    }
}
