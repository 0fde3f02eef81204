//! SMTP command layer.
//!
//! [`Client`] holds a [`Transport`], encodes each command, collects the
//! reply lines and checks the reply class. Capabilities learned from the
//! last successful EHLO are kept in an [`ExtensionSet`].
//!
//! ```ignore
//! use mailsender_smtp::{Address, Client, ClientConfig, TransportConfig};
//!
//! let mut client = Client::new(
//!     TransportConfig::builder("smtp.example.com").port(587).build(),
//!     ClientConfig::builder().hostname("client.example.com").build(),
//! );
//! client.connect().await?;
//! client.greet(None).await?;
//! client.secure().await?;
//! client.greet(None).await?;
//! client.auth_login("user", "secret").await?;
//! client.mail(&Address::new("me@example.com")?).await?;
//! client.rcpt(&Address::new("you@example.com")?).await?;
//! client.data(b"Subject: Hi\r\n\r\nHello").await?;
//! client.quit().await?;
//! ```

mod auth;
mod config;
mod hostname;

use std::time::Duration;

pub use auth::{
    PASSWORD_PROMPT, USERNAME_PROMPT, cram_md5_response, decode_challenge, login_token,
    plain_token,
};
pub use config::{ClientConfig, ClientConfigBuilder, Timeouts};
pub use hostname::{local_hostname, normalize_hostname, validate_hostname};

use crate::channel::{Channel, Transport, TransportConfig};
use crate::command::{Command, encode_message};
use crate::error::{Error, Result};
use crate::parser::{reply_payload, response_error};
use crate::types::{Address, AuthMechanism, ExtensionSet, LineInfo, Reply, ReplyCode};

const STARTTLS: &str = "STARTTLS";
const ENHANCED_STATUS_CODES: &str = "ENHANCEDSTATUSCODES";

/// Where the session is in the SMTP dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection yet.
    Unconnected,
    /// Greeting received.
    Connected,
    /// HELO or EHLO accepted.
    Greeted,
    /// STARTTLS completed; a new EHLO is expected.
    Secured,
    /// AUTH accepted.
    Authenticated,
    /// MAIL FROM accepted.
    Mail,
    /// At least one RCPT TO accepted.
    Rcpt,
    /// QUIT accepted or the client was closed.
    Closed,
}

/// SMTP client over a request/reply [`Transport`].
///
/// The client does not police the command order; it records the session
/// state and leaves sequencing errors to the server.
#[derive(Debug)]
pub struct Client<T: Transport = Channel> {
    transport: T,
    config: ClientConfig,
    extensions: ExtensionSet,
    state: SessionState,
    authenticated: bool,
}

impl Client {
    /// Creates a client over a TCP channel.
    #[must_use]
    pub fn new(transport: TransportConfig, config: ClientConfig) -> Self {
        let channel = Channel::new(transport).keep_blank_lines(config.keep_blank_lines);
        Self::with_transport(channel, config)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client over an existing transport.
    #[must_use]
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            extensions: ExtensionSet::default(),
            state: SessionState::Unconnected,
            authenticated: false,
        }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the underlying transport mutably.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the extensions from the last successful EHLO.
    #[must_use]
    pub const fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    /// Checks if the server advertised an extension.
    #[must_use]
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.has_extension(name)
    }

    /// Returns the advertised `SIZE` limit, 0 when unbounded.
    #[must_use]
    pub fn data_size_limit(&self) -> u64 {
        self.extensions.data_size_limit()
    }

    /// Returns the advertised AUTH mechanisms, upper-cased.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.extensions.auth_mechanisms()
    }

    /// Returns the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true once the connection is encrypted.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.transport.is_secure()
    }

    /// Connects and checks the greeting.
    ///
    /// A rejected greeting closes the connection again.
    ///
    /// # Errors
    ///
    /// Returns a transport error, or [`Error::Smtp`] if the greeting is not 2xx.
    pub async fn connect(&mut self) -> Result<ReplyCode> {
        let mut lines = Vec::new();
        let mut collect = |line: &str, _: LineInfo| lines.push(line.to_string());
        let code = self
            .transport
            .connect(Some(&mut collect), self.config.timeouts.connect)
            .await?;
        let greeting = Reply::new(code, lines);

        self.extensions = ExtensionSet::default();
        self.authenticated = false;
        if let Err(e) = self.require(&greeting, 2) {
            tracing::warn!(%code, "Greeting rejected, closing");
            if let Err(close) = self.close().await {
                tracing::debug!(error = %close, "Close after rejected greeting failed");
            }
            return Err(e);
        }

        self.state = SessionState::Connected;
        tracing::debug!(%code, "Greeting received");
        Ok(code)
    }

    /// Sends HELO. `None` uses the configured or local host name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHostname`] before writing anything if the name
    /// is not a single token, a transport error, or [`Error::Smtp`] if the
    /// reply is not 2xx.
    pub async fn helo(&mut self, hostname: Option<&str>) -> Result<ReplyCode> {
        let hostname = self.client_name(hostname)?;
        let reply = self
            .command(&Command::Helo { hostname }, self.config.timeouts.command)
            .await?;
        let code = self.require(&reply, 2)?;
        self.state = SessionState::Greeted;
        Ok(code)
    }

    /// Sends EHLO and replaces the extension set from the reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHostname`] before writing anything if the name
    /// is not a single token, a transport error, or [`Error::Smtp`] if the
    /// reply is not 2xx.
    pub async fn ehlo(&mut self, hostname: Option<&str>) -> Result<ReplyCode> {
        let hostname = self.client_name(hostname)?;
        let reply = self
            .command(&Command::Ehlo { hostname }, self.config.timeouts.command)
            .await?;
        let code = self.require(&reply, 2)?;

        // The first line is the server's greeting text.
        self.extensions =
            ExtensionSet::from_lines(reply.lines.iter().skip(1).map(|line| reply_payload(line)));
        self.state = SessionState::Greeted;
        tracing::debug!(extensions = self.extensions.len(), "EHLO accepted");
        Ok(code)
    }

    /// Sends EHLO, falling back to HELO when the server rejects it.
    ///
    /// Only a rejection reply ([`Error::Smtp`]) triggers the fallback. Any
    /// other EHLO failure is returned as is: after a timeout or a lost
    /// connection a second greeting would not be answered reliably.
    ///
    /// # Errors
    ///
    /// Returns the HELO error after a rejected EHLO, or the EHLO error
    /// otherwise.
    pub async fn greet(&mut self, hostname: Option<&str>) -> Result<ReplyCode> {
        match self.ehlo(hostname).await {
            Err(Error::Smtp { code, .. }) => {
                tracing::debug!(code, "EHLO rejected, falling back to HELO");
                self.helo(hostname).await
            }
            result => result,
        }
    }

    /// Sends STARTTLS and upgrades the connection.
    ///
    /// The extension set is cleared afterwards; greet again to learn the
    /// post-upgrade capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] without a round trip if STARTTLS was
    /// not advertised, [`Error::Smtp`] if the reply is not 2xx, or the
    /// handshake error.
    pub async fn secure(&mut self) -> Result<()> {
        if !self.extensions.has_extension(STARTTLS) {
            return Err(Error::NotSupported(STARTTLS.into()));
        }

        let reply = self
            .command(&Command::StartTls, self.config.timeouts.command)
            .await?;
        self.require(&reply, 2)?;

        self.transport
            .negotiate_tls(&self.config.tls, self.config.timeouts.tls)
            .await?;

        self.extensions = ExtensionSet::default();
        self.state = SessionState::Secured;
        tracing::debug!("STARTTLS completed");
        Ok(())
    }

    /// Authenticates with the given mechanism.
    ///
    /// # Errors
    ///
    /// Returns the error of the selected mechanism.
    pub async fn authenticate(
        &mut self,
        mechanism: AuthMechanism,
        username: &str,
        password: &str,
    ) -> Result<ReplyCode> {
        match mechanism {
            AuthMechanism::Plain => self.auth_plain(username, password).await,
            AuthMechanism::Login => self.auth_login(username, password).await,
            AuthMechanism::CramMd5 => self.auth_cram_md5(username, password).await,
        }
    }

    /// Authenticates with PLAIN in a single round trip.
    ///
    /// # Errors
    ///
    /// Returns a transport error, or [`Error::Smtp`] if the reply is not 2xx.
    pub async fn auth_plain(&mut self, username: &str, password: &str) -> Result<ReplyCode> {
        let command = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(plain_token(username, password)),
        };
        let reply = self.command(&command, self.config.timeouts.auth).await?;
        let code = self.require(&reply, 2)?;
        self.mark_authenticated();
        Ok(code)
    }

    /// Authenticates with LOGIN.
    ///
    /// Each prompt must match the base64 `Username:`/`Password:` literal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if LOGIN was not advertised, or
    /// [`Error::Smtp`] carrying the unexpected reply.
    pub async fn auth_login(&mut self, username: &str, password: &str) -> Result<ReplyCode> {
        self.require_mechanism(AuthMechanism::Login)?;
        let deadline = self.config.timeouts.auth;

        let command = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        let reply = self.command(&command, deadline).await?;
        self.require_prompt(&reply, USERNAME_PROMPT)?;

        let reply = self
            .command(&Command::AuthResponse(login_token(username)), deadline)
            .await?;
        self.require_prompt(&reply, PASSWORD_PROMPT)?;

        let reply = self
            .command(&Command::AuthResponse(login_token(password)), deadline)
            .await?;
        let code = self.require(&reply, 2)?;
        self.mark_authenticated();
        Ok(code)
    }

    /// Authenticates with CRAM-MD5.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if CRAM-MD5 was not advertised,
    /// [`Error::Smtp`] if the server does not send a challenge or rejects
    /// the answer, or [`Error::Protocol`] for an undecodable challenge.
    pub async fn auth_cram_md5(&mut self, username: &str, password: &str) -> Result<ReplyCode> {
        self.require_mechanism(AuthMechanism::CramMd5)?;
        let deadline = self.config.timeouts.auth;

        let command = Command::Auth {
            mechanism: AuthMechanism::CramMd5,
            initial_response: None,
        };
        let reply = self.command(&command, deadline).await?;
        self.require(&reply, 3)?;

        let challenge = match reply.lines.last() {
            Some(line) => decode_challenge(line)?,
            None => return Err(Error::Protocol("Missing CRAM-MD5 challenge".into())),
        };
        let response = cram_md5_response(username, password, &challenge)?;

        let reply = self
            .command(&Command::AuthResponse(response), deadline)
            .await?;
        let code = self.require(&reply, 2)?;
        self.mark_authenticated();
        Ok(code)
    }

    /// Sends MAIL FROM.
    ///
    /// # Errors
    ///
    /// Returns a transport error, or [`Error::Smtp`] if the reply is not 2xx.
    pub async fn mail(&mut self, from: &Address) -> Result<ReplyCode> {
        let command = Command::MailFrom { from: from.clone() };
        let reply = self.command(&command, self.config.timeouts.command).await?;
        let code = self.require(&reply, 2)?;
        self.state = SessionState::Mail;
        Ok(code)
    }

    /// Sends RCPT TO.
    ///
    /// # Errors
    ///
    /// Returns a transport error, or [`Error::Smtp`] if the reply is not 2xx.
    pub async fn rcpt(&mut self, to: &Address) -> Result<ReplyCode> {
        let command = Command::RcptTo { to: to.clone() };
        let reply = self.command(&command, self.config.timeouts.command).await?;
        let code = self.require(&reply, 2)?;
        self.state = SessionState::Rcpt;
        Ok(code)
    }

    /// Sends DATA followed by the message body.
    ///
    /// The body is dot-stuffed and terminated with `<CRLF>.<CRLF>`. Its
    /// length is checked against the advertised `SIZE` before anything is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] without a round trip, a transport
    /// error, or [`Error::Smtp`] if DATA is not answered with 3xx or the
    /// body with 2xx.
    pub async fn data(&mut self, message: &[u8]) -> Result<ReplyCode> {
        let size = u64::try_from(message.len()).unwrap_or(u64::MAX);
        let limit = self.extensions.data_size_limit();
        if limit > 0 && size > limit {
            return Err(Error::MessageTooLarge { size, limit });
        }

        let deadline = self.config.timeouts.data;
        let reply = self.command(&Command::Data, deadline).await?;
        self.require(&reply, 3)?;

        let reply = self.exchange(&encode_message(message), deadline).await?;
        let code = self.require(&reply, 2)?;
        self.end_transaction();
        tracing::debug!(size, "Message accepted");
        Ok(code)
    }

    /// Sends NOOP.
    ///
    /// # Errors
    ///
    /// Returns a transport error, or [`Error::Smtp`] if the reply is not 2xx.
    pub async fn noop(&mut self) -> Result<ReplyCode> {
        let reply = self
            .command(&Command::Noop, self.config.timeouts.command)
            .await?;
        self.require(&reply, 2)
    }

    /// Sends RSET, abandoning the current transaction.
    ///
    /// # Errors
    ///
    /// Returns a transport error, or [`Error::Smtp`] if the reply is not 2xx.
    pub async fn rset(&mut self) -> Result<ReplyCode> {
        let reply = self
            .command(&Command::Rset, self.config.timeouts.command)
            .await?;
        let code = self.require(&reply, 2)?;
        if matches!(self.state, SessionState::Mail | SessionState::Rcpt) {
            self.end_transaction();
        }
        Ok(code)
    }

    /// Sends QUIT and closes the transport.
    ///
    /// # Errors
    ///
    /// Returns a transport error, or [`Error::Smtp`] if the reply is not 2xx.
    pub async fn quit(&mut self) -> Result<ReplyCode> {
        let reply = self
            .command(&Command::Quit, self.config.timeouts.command)
            .await?;
        let code = self.require(&reply, 2)?;
        self.close().await?;
        Ok(code)
    }

    /// Closes the transport without QUIT.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the close deadline elapses.
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close(self.config.timeouts.command).await?;
        self.state = SessionState::Closed;
        Ok(())
    }

    async fn command(&mut self, command: &Command, deadline: Option<Duration>) -> Result<Reply> {
        self.exchange(&command.serialize(), deadline).await
    }

    /// Writes raw bytes and collects every line of the reply.
    async fn exchange(&mut self, data: &[u8], deadline: Option<Duration>) -> Result<Reply> {
        let mut lines = Vec::new();
        let mut collect = |line: &str, _: LineInfo| lines.push(line.to_string());
        let code = self
            .transport
            .write(data, Some(&mut collect), deadline)
            .await?;
        Ok(Reply::new(code, lines))
    }

    fn require(&self, reply: &Reply, class: u16) -> Result<ReplyCode> {
        if reply.code.class() == class {
            Ok(reply.code)
        } else {
            Err(self.reply_error(reply))
        }
    }

    fn require_prompt(&self, reply: &Reply, prompt: &str) -> Result<()> {
        if reply.first_line() == Some(prompt) {
            Ok(())
        } else {
            Err(self.reply_error(reply))
        }
    }

    fn reply_error(&self, reply: &Reply) -> Error {
        response_error(
            &reply.lines,
            self.extensions.has_extension(ENHANCED_STATUS_CODES),
        )
    }

    fn require_mechanism(&self, mechanism: AuthMechanism) -> Result<()> {
        if self.extensions.supports_auth(mechanism) {
            Ok(())
        } else {
            Err(Error::NotSupported(format!("{mechanism} authentication")))
        }
    }

    fn client_name(&self, hostname: Option<&str>) -> Result<String> {
        let name = hostname
            .map(str::to_string)
            .or_else(|| self.config.hostname.clone())
            .unwrap_or_else(local_hostname);
        validate_hostname(&name)?;
        Ok(name)
    }

    fn mark_authenticated(&mut self) {
        self.authenticated = true;
        self.state = SessionState::Authenticated;
        tracing::debug!("Authenticated");
    }

    const fn end_transaction(&mut self) {
        self.state = if self.authenticated {
            SessionState::Authenticated
        } else {
            SessionState::Greeted
        };
    }
}
