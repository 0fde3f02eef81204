//! Socket types and the connector seam.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::config::{TlsOptions, TransportConfig};
use crate::error::{Error, Result};

/// Opens sockets and upgrades them to TLS.
///
/// [`TcpConnector`] is the real implementation; tests substitute scripted
/// streams.
pub trait Connector: Send + Sync {
    /// Socket type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a socket to `config.host:config.port`, with TLS from the start
    /// when `config.secure` is set.
    fn open(&self, config: &TransportConfig) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Runs a TLS handshake over an existing socket.
    fn upgrade(
        &self,
        stream: Self::Stream,
        server_name: &str,
        options: &TlsOptions,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Connector for real TCP sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = SmtpStream;

    async fn open(&self, config: &TransportConfig) -> Result<SmtpStream> {
        if config.secure {
            let server_name = config.tls.server_name.as_deref().unwrap_or(&config.host);
            connect_tls(&config.address(), server_name, &config.tls).await
        } else {
            connect(&config.address()).await
        }
    }

    async fn upgrade(
        &self,
        stream: SmtpStream,
        server_name: &str,
        options: &TlsOptions,
    ) -> Result<SmtpStream> {
        stream.upgrade_to_tls(server_name, options).await
    }
}

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(TcpStream),
    /// TLS-encrypted connection (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl SmtpStream {
    /// Upgrades a TCP stream to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already TLS, the server name is
    /// invalid, or the handshake fails.
    pub async fn upgrade_to_tls(self, server_name: &str, options: &TlsOptions) -> Result<Self> {
        let tcp_stream = match self {
            Self::Tcp(stream) => stream,
            Self::Tls(_) => return Err(Error::InvalidState("Already using TLS".into())),
        };

        let tls_stream = handshake(tcp_stream, server_name, options).await?;
        Ok(Self::Tls(Box::new(tls_stream)))
    }

    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(addr: &str) -> Result<SmtpStream> {
    let stream = TcpStream::connect(addr).await?;
    Ok(SmtpStream::Tcp(stream))
}

/// Connects to an SMTP server over TLS (implicit TLS on port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(
    addr: &str,
    server_name: &str,
    options: &TlsOptions,
) -> Result<SmtpStream> {
    let tcp_stream = TcpStream::connect(addr).await?;
    let tls_stream = handshake(tcp_stream, server_name, options).await?;
    Ok(SmtpStream::Tls(Box::new(tls_stream)))
}

async fn handshake(
    tcp_stream: TcpStream,
    server_name: &str,
    options: &TlsOptions,
) -> Result<TlsStream<TcpStream>> {
    let connector = create_tls_connector(options);
    let server_name = ServerName::try_from(server_name.to_string())?;
    Ok(connector.connect(server_name, tcp_stream).await?)
}

/// Creates a TLS connector from the options, falling back to the webpki
/// root certificates.
#[must_use]
pub fn create_tls_connector(options: &TlsOptions) -> TlsConnector {
    let config = options.client_config.clone().unwrap_or_else(|| {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        )
    });

    TlsConnector::from(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tls_connector() {
        let _default = create_tls_connector(&TlsOptions::default());

        let config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(rustls::RootCertStore::empty())
                .with_no_client_auth(),
        );
        let _custom = create_tls_connector(&TlsOptions::default().client_config(config));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = connect(&addr.to_string()).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_upgrade_rejects_invalid_server_name() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = connect(&addr.to_string()).await.unwrap();
        assert!(!stream.is_tls());

        let result = stream
            .upgrade_to_tls("not a valid name", &TlsOptions::default())
            .await;
        assert!(matches!(result, Err(Error::InvalidDnsName(_))));
    }
}
