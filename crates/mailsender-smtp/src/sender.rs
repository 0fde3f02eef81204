//! Send orchestration.
//!
//! [`MailSender`] drives one [`Client`] through a complete delivery and
//! reports progress on an unbounded channel. A [`StopHandle`] cancels the
//! delivery at the next checkpoint.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::channel::{Transport, with_deadline};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::types::{Address, AuthMechanism};

/// Upper bound on the QUIT and close that end a failed or stopped delivery.
const HANG_UP_DEADLINE: Duration = Duration::from_secs(5);

/// Status reported while sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Percentage of the dialogue completed.
    Progress(u8),
    /// The message was accepted and the session closed.
    Complete,
    /// Sending stopped early, by request or after an error.
    Stopped,
}

/// How a delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server accepted the message.
    Complete,
    /// A stop was requested before DATA.
    Stopped,
}

/// Login for the AUTH step.
#[derive(Clone)]
pub struct Credentials {
    /// Mechanism to use.
    pub mechanism: AuthMechanism,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials for a mechanism.
    #[must_use]
    pub fn new(
        mechanism: AuthMechanism,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            mechanism,
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("mechanism", &self.mechanism)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Envelope sender and recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// `MAIL FROM` address.
    pub from: Address,
    /// `RCPT TO` addresses, in order.
    pub to: Vec<Address>,
}

impl Envelope {
    /// Creates an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] when there are no recipients.
    pub fn new(from: Address, to: Vec<Address>) -> Result<Self> {
        if to.is_empty() {
            return Err(Error::InvalidAddress("Envelope needs at least one recipient".into()));
        }
        Ok(Self { from, to })
    }
}

/// Requests a running delivery to stop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Asks the sender to stop at its next checkpoint.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true if a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Sequences a full delivery over a [`Client`].
///
/// Connect, greet, optionally STARTTLS and greet again, optionally
/// authenticate, then MAIL, RCPT for each recipient, DATA and QUIT.
#[derive(Debug, Default)]
pub struct MailSender {
    greet_name: Option<String>,
    starttls: bool,
    credentials: Option<Credentials>,
    stop: StopHandle,
    status: Option<mpsc::UnboundedSender<SendStatus>>,
}

impl MailSender {
    /// Creates a sender that neither upgrades nor authenticates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name used in HELO/EHLO. Empty names are ignored.
    ///
    /// The name is checked when greeting; one containing whitespace or
    /// control characters fails the delivery with
    /// [`Error::InvalidHostname`] before it reaches the wire.
    #[must_use]
    pub fn greet_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.greet_name = Some(name);
        }
        self
    }

    /// Upgrades with STARTTLS after the first greeting.
    #[must_use]
    pub const fn starttls(mut self, enabled: bool) -> Self {
        self.starttls = enabled;
        self
    }

    /// Authenticates before MAIL FROM.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Creates the status channel; earlier receivers stop getting updates.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SendStatus> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.status = Some(tx);
        rx
    }

    /// Returns a handle that stops the running delivery.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stops the running delivery at its next checkpoint.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Delivers `message` to every envelope recipient.
    ///
    /// A pending stop request is cleared when sending starts. On failure
    /// the session is ended with a best-effort QUIT and
    /// [`SendStatus::Stopped`] is reported. The hang-up is bounded, and
    /// after a timeout the connection is closed without QUIT.
    ///
    /// # Errors
    ///
    /// Returns the first error of the dialogue.
    pub async fn send<T: Transport>(
        &self,
        client: &mut Client<T>,
        envelope: &Envelope,
        message: &[u8],
    ) -> Result<SendOutcome> {
        self.stop.clear();

        match self.run(client, envelope, message).await {
            Ok(SendOutcome::Complete) => {
                tracing::info!(recipients = envelope.to.len(), "Message sent");
                self.report(SendStatus::Complete);
                Ok(SendOutcome::Complete)
            }
            Ok(SendOutcome::Stopped) => {
                tracing::info!("Sending stopped on request");
                Self::hang_up(client, None).await;
                self.report(SendStatus::Stopped);
                Ok(SendOutcome::Stopped)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sending failed");
                Self::hang_up(client, Some(&e)).await;
                self.report(SendStatus::Stopped);
                Err(e)
            }
        }
    }

    async fn run<T: Transport>(
        &self,
        client: &mut Client<T>,
        envelope: &Envelope,
        message: &[u8],
    ) -> Result<SendOutcome> {
        let name = self.greet_name.as_deref();

        self.progress(10);
        client.connect().await?;
        if self.stop.is_stopped() {
            return Ok(SendOutcome::Stopped);
        }
        client.greet(name).await?;
        self.progress(20);

        if self.starttls {
            self.progress(30);
            client.secure().await?;
            self.progress(40);
            client.greet(name).await?;
        }
        self.progress(50);

        if let Some(credentials) = &self.credentials {
            client
                .authenticate(
                    credentials.mechanism,
                    &credentials.username,
                    &credentials.password,
                )
                .await?;
        }
        self.progress(60);

        client.mail(&envelope.from).await?;
        self.progress(70);
        for to in &envelope.to {
            client.rcpt(to).await?;
        }
        if self.stop.is_stopped() {
            return Ok(SendOutcome::Stopped);
        }
        self.progress(80);

        client.data(message).await?;
        self.progress(90);
        client.quit().await?;
        self.progress(100);

        Ok(SendOutcome::Complete)
    }

    async fn hang_up<T: Transport>(client: &mut Client<T>, cause: Option<&Error>) {
        // After a timeout the next reply read would answer the stalled command.
        if cause.is_some_and(Error::is_timeout) {
            tracing::debug!("Closing without QUIT after timeout");
        } else {
            match with_deadline(Some(HANG_UP_DEADLINE), client.quit()).await {
                Ok(_) => return,
                Err(e) => tracing::debug!(error = %e, "QUIT failed, closing"),
            }
        }
        if let Err(e) = with_deadline(Some(HANG_UP_DEADLINE), client.close()).await {
            tracing::debug!(error = %e, "Close failed");
        }
    }

    fn progress(&self, percent: u8) {
        tracing::debug!(percent, "Send progress");
        self.report(SendStatus::Progress(percent));
    }

    fn report(&self, status: SendStatus) {
        if let Some(tx) = &self.status {
            // The receiver may be gone.
            let _ = tx.send(status);
        }
    }
}
