//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

use crate::types::EnhancedCode;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// An operation deadline elapsed before the operation completed.
    #[error("Command has timed out after {0:?}")]
    Timeout(Duration),

    /// The socket stayed silent longer than the transport timeout.
    ///
    /// The channel has already sent `QUIT` and closed the socket.
    #[error("Connection idle for {0:?}, closed")]
    IdleTimeout(Duration),

    /// The socket closed while a command was outstanding.
    #[error("Socket has closed unexpectedly")]
    ConnectionClosed,

    /// No socket is open.
    #[error("Socket has closed")]
    NotConnected,

    /// Server returned a reply of the wrong class.
    #[error("SMTP error {code}: {message}")]
    Smtp {
        /// Reply code (e.g., 550).
        code: u16,
        /// RFC 2034 enhanced status code, when the server advertises them.
        enhanced: Option<EnhancedCode>,
        /// Whitespace-normalized text of every reply line.
        message: String,
    },

    /// Protocol error (malformed reply).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// HELO/EHLO name that cannot be placed on the wire.
    #[error("Invalid host name: {0}")]
    InvalidHostname(String),

    /// Message too large for the advertised SIZE limit.
    #[error("Message size exceeds the allowable limit ({limit} bytes): {size} bytes")]
    MessageTooLarge {
        /// Size of the rejected message.
        size: u64,
        /// Limit advertised by the server.
        limit: u64,
    },

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::Smtp {
            code,
            enhanced: None,
            message: message.into(),
        }
    }

    /// Returns the SMTP reply code carried by this error, if any.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::Smtp { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Smtp { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Smtp { code, .. } if *code >= 400 && *code < 500)
    }

    /// Returns true if a deadline or idle timer fired.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::IdleTimeout(_))
    }
}
