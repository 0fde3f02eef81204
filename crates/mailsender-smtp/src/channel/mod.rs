//! Transport channel: socket ownership, single-flight request/reply, and
//! the in-place STARTTLS upgrade.
//!
//! A [`Channel`] owns one socket and two [`LineFramer`]s. Every public
//! operation runs against an optional deadline. Replies are resolved one
//! command at a time: the caller writes a command and the channel reads
//! until the final reply line arrives.

mod config;
pub mod deadline;
mod resolver;
mod stream;

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::broadcast;

pub use config::{
    DEFAULT_PORT, DEFAULT_SECURE_PORT, TlsOptions, TransportConfig, TransportConfigBuilder,
};
pub use deadline::{Outcome, with_deadline};
pub use resolver::{LineHandler, ReplyResolver};
pub use stream::{Connector, SmtpStream, TcpConnector, connect, connect_tls, create_tls_connector};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::framer::LineFramer;
use crate::types::ReplyCode;

/// Read buffer size per socket read.
const READ_BUFFER_SIZE: usize = 8192;

/// Capacity of the event channel.
const EVENT_CAPACITY: usize = 256;

/// Notification emitted by a [`Channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The socket connected.
    Connect,
    /// The socket closed.
    Close,
    /// The server ended the stream.
    End,
    /// A socket error occurred.
    Error(String),
    /// The socket was idle past the transport timeout.
    Timeout,
    /// Raw bytes received.
    Receive(Bytes),
    /// Raw bytes sent.
    Send(Bytes),
    /// A complete outgoing command line.
    Command(String),
    /// A complete incoming reply line.
    Reply(String),
}

/// Request/reply transport used by the command layer.
///
/// At most one command may be outstanding: each call resolves the reply to
/// the data it wrote before another call can start.
pub trait Transport: Send {
    /// Opens the connection and resolves the greeting reply.
    fn connect(
        &mut self,
        handler: Option<LineHandler<'_>>,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<ReplyCode>> + Send;

    /// Writes `data` and resolves the reply it provokes.
    fn write(
        &mut self,
        data: &[u8],
        handler: Option<LineHandler<'_>>,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<ReplyCode>> + Send;

    /// Closes the connection. Closing a closed transport succeeds.
    fn close(&mut self, deadline: Option<Duration>) -> impl Future<Output = Result<()>> + Send;

    /// Replaces the plaintext socket with a TLS session over it.
    fn negotiate_tls(
        &mut self,
        options: &TlsOptions,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Returns true once the connection is encrypted.
    fn is_secure(&self) -> bool;
}

/// SMTP transport channel over a socket produced by `C`.
pub struct Channel<C: Connector = TcpConnector> {
    config: TransportConfig,
    connector: C,
    stream: Option<C::Stream>,
    secure: bool,
    receive: LineFramer,
    send: LineFramer,
    backlog: VecDeque<String>,
    events: broadcast::Sender<ChannelEvent>,
}

impl Channel<TcpConnector> {
    /// Creates an unconnected channel over TCP.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self::with_connector(config, TcpConnector)
    }
}

impl<C: Connector> Channel<C> {
    /// Creates an unconnected channel with a custom connector.
    #[must_use]
    pub fn with_connector(config: TransportConfig, connector: C) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            connector,
            stream: None,
            secure: false,
            receive: LineFramer::new(),
            send: LineFramer::new(),
            backlog: VecDeque::new(),
            events,
        }
    }

    /// Delivers empty reply lines to the resolver instead of dropping them.
    #[must_use]
    pub fn keep_blank_lines(mut self, keep: bool) -> Self {
        self.receive = LineFramer::new().keep_blank_lines(keep);
        self
    }

    /// Subscribes to channel events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    /// Returns the receive-side framer.
    #[must_use]
    pub const fn receive_framer(&self) -> &LineFramer {
        &self.receive
    }

    /// Returns the send-side framer.
    #[must_use]
    pub const fn send_framer(&self) -> &LineFramer {
        &self.send
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns true once the connection is encrypted.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// Returns true while a socket is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens the socket and resolves the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if already connected, the socket cannot be opened,
    /// the socket closes before the greeting completes, or the deadline
    /// elapses.
    pub async fn connect(
        &mut self,
        handler: Option<LineHandler<'_>>,
        deadline: Option<Duration>,
    ) -> Result<ReplyCode> {
        with_deadline(deadline, async move {
            if self.stream.is_some() {
                return Err(Error::InvalidState("Already connected".into()));
            }

            let stream = match self.connector.open(&self.config).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(host = %self.config.host, port = self.config.port, error = %e, "Connection attempt failed");
                    self.emit(ChannelEvent::Error(e.to_string()));
                    return Err(e);
                }
            };

            self.stream = Some(stream);
            self.secure = self.config.secure;
            self.discard_buffered();
            tracing::debug!(
                host = %self.config.host,
                port = self.config.port,
                secure = self.secure,
                "Connected"
            );
            self.emit(ChannelEvent::Connect);

            self.resolve(handler).await
        })
        .await
    }

    /// Writes `data` and resolves the reply to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a socket, an I/O error if the
    /// write or read fails, [`Error::ConnectionClosed`] if the socket closes
    /// before the reply completes, or [`Error::Timeout`] if the deadline
    /// elapses.
    pub async fn write(
        &mut self,
        data: &[u8],
        handler: Option<LineHandler<'_>>,
        deadline: Option<Duration>,
    ) -> Result<ReplyCode> {
        with_deadline(deadline, async move {
            self.send(data).await?;
            self.resolve(handler).await
        })
        .await
    }

    /// Shuts the socket down. No socket is a no-op success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the deadline elapses.
    pub async fn close(&mut self, deadline: Option<Duration>) -> Result<()> {
        with_deadline(deadline, async move {
            self.shutdown().await;
            Ok(())
        })
        .await
    }

    /// Upgrades the open plaintext socket to TLS in place.
    ///
    /// Both framers and any queued reply lines are discarded, so nothing
    /// received before the upgrade can be read as a post-upgrade reply.
    /// `options` is merged over [`TransportConfig::tls`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a socket,
    /// [`Error::InvalidState`] if already secure, the handshake error, or
    /// [`Error::Timeout`] if the deadline elapses.
    pub async fn negotiate_tls(
        &mut self,
        options: &TlsOptions,
        deadline: Option<Duration>,
    ) -> Result<()> {
        with_deadline(deadline, async move {
            if self.secure {
                return Err(Error::InvalidState("Connection is already secure".into()));
            }
            let stream = self.stream.take().ok_or(Error::NotConnected)?;
            self.discard_buffered();

            let options = options.merge(&self.config.tls);
            let server_name = options
                .server_name
                .clone()
                .unwrap_or_else(|| self.config.host.clone());

            match self.connector.upgrade(stream, &server_name, &options).await {
                Ok(upgraded) => {
                    self.stream = Some(upgraded);
                    self.secure = true;
                    tracing::debug!(%server_name, "TLS negotiated");
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(%server_name, error = %e, "TLS handshake failed");
                    self.emit(ChannelEvent::Error(e.to_string()));
                    self.emit(ChannelEvent::Close);
                    Err(e)
                }
            }
        })
        .await
    }

    /// Reads until the pending command's final reply line.
    ///
    /// A line without a reply code leaves no way to tell where the reply
    /// ends, so the connection is dropped along with everything queued.
    async fn resolve(&mut self, handler: Option<LineHandler<'_>>) -> Result<ReplyCode> {
        let mut resolver = ReplyResolver::new(handler);
        loop {
            while let Some(line) = self.backlog.pop_front() {
                match resolver.accept(&line) {
                    Ok(Some(code)) => return Ok(code),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(%line, "Malformed reply line, closing");
                        self.emit(ChannelEvent::Error(e.to_string()));
                        self.shutdown().await;
                        return Err(e);
                    }
                }
            }
            self.receive().await?;
        }
    }

    /// Reads one chunk from the socket into the backlog.
    async fn receive(&mut self) -> Result<()> {
        let idle = self.config.idle_timeout();
        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;

        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
        let read = match idle {
            Some(limit) => match tokio::time::timeout(limit, stream.read_buf(&mut buf)).await {
                Ok(read) => read,
                Err(_) => return Err(self.on_idle(limit).await),
            },
            None => stream.read_buf(&mut buf).await,
        };

        match read {
            Ok(0) => {
                tracing::debug!("Server closed the connection");
                self.emit(ChannelEvent::End);
                self.shutdown().await;
                Err(Error::ConnectionClosed)
            }
            Ok(_) => {
                let chunk = buf.freeze();
                self.emit(ChannelEvent::Receive(chunk.clone()));
                for line in self.receive.feed(&chunk) {
                    tracing::trace!(%line, "S:");
                    self.emit(ChannelEvent::Reply(line.clone()));
                    self.backlog.push_back(line);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Socket read failed");
                self.emit(ChannelEvent::Error(e.to_string()));
                self.shutdown().await;
                Err(e.into())
            }
        }
    }

    /// Writes raw bytes and mirrors them through the send framer.
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let written = match stream.write_all(data).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, "Socket write failed");
            self.emit(ChannelEvent::Error(e.to_string()));
            return Err(e.into());
        }

        self.emit(ChannelEvent::Send(Bytes::copy_from_slice(data)));
        for line in self.send.feed(data) {
            tracing::trace!(%line, "C:");
            self.emit(ChannelEvent::Command(line));
        }
        Ok(())
    }

    /// Handles an idle socket: announce it, say QUIT, and hang up.
    async fn on_idle(&mut self, limit: Duration) -> Error {
        tracing::warn!(?limit, "Socket idle, closing with QUIT");
        self.emit(ChannelEvent::Timeout);
        if let Err(e) = self.send(&Command::Quit.serialize()).await {
            tracing::debug!(error = %e, "QUIT after idle timeout failed");
        }
        self.shutdown().await;
        Error::IdleTimeout(limit)
    }

    async fn shutdown(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        if let Err(e) = stream.shutdown().await {
            tracing::debug!(error = %e, "Socket shutdown failed");
        }
        self.secure = false;
        self.discard_buffered();
        tracing::debug!("Connection closed");
        self.emit(ChannelEvent::Close);
    }

    fn discard_buffered(&mut self) {
        self.backlog.clear();
        self.receive.reset();
        self.send.reset();
    }

    fn emit(&self, event: ChannelEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl<C: Connector> Transport for Channel<C> {
    fn connect(
        &mut self,
        handler: Option<LineHandler<'_>>,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<ReplyCode>> + Send {
        Self::connect(self, handler, deadline)
    }

    fn write(
        &mut self,
        data: &[u8],
        handler: Option<LineHandler<'_>>,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<ReplyCode>> + Send {
        Self::write(self, data, handler, deadline)
    }

    fn close(&mut self, deadline: Option<Duration>) -> impl Future<Output = Result<()>> + Send {
        Self::close(self, deadline)
    }

    fn negotiate_tls(
        &mut self,
        options: &TlsOptions,
        deadline: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send {
        Self::negotiate_tls(self, options, deadline)
    }

    fn is_secure(&self) -> bool {
        self.secure
    }
}

impl<C: Connector> fmt::Debug for Channel<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("connected", &self.stream.is_some())
            .field("secure", &self.secure)
            .field("backlog", &self.backlog.len())
            .finish_non_exhaustive()
    }
}
