//! # mailsender-smtp
//!
//! An SMTP client protocol engine implementing RFC 5321.
//!
//! ## Features
//!
//! - **Line framing**: chunk-independent `\r?\n` splitting with reset on
//!   TLS upgrade
//! - **Single-flight transport**: one outstanding command per connection,
//!   every operation raced against an optional deadline
//! - **TLS support**: implicit TLS (port 465) and in-place STARTTLS
//! - **Authentication**: PLAIN, LOGIN, CRAM-MD5
//! - **Extensions**: SIZE, AUTH, STARTTLS, ENHANCEDSTATUSCODES
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsender_smtp::{Address, AuthMechanism, Client, ClientConfig, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() -> mailsender_smtp::Result<()> {
//!     let transport = TransportConfig::builder("smtp.example.com")
//!         .port(587)
//!         .timeout(std::time::Duration::from_secs(60))
//!         .build();
//!     let mut client = Client::new(transport, ClientConfig::default());
//!
//!     client.connect().await?;
//!     client.greet(None).await?;
//!     client.secure().await?;
//!     client.greet(None).await?;
//!     client.authenticate(AuthMechanism::Login, "user@example.com", "password").await?;
//!
//!     client.mail(&Address::new("sender@example.com")?).await?;
//!     client.rcpt(&Address::new("recipient@example.com")?).await?;
//!     client.data(b"Subject: Test\r\n\r\nHello, World!").await?;
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layers
//!
//! ```text
//! MailSender ──→ Client<T: Transport> ──→ Channel<C: Connector> ──→ socket
//!                 (commands, replies)      (framing, resolver, TLS)
//! ```
//!
//! ## Modules
//!
//! - [`channel`]: Socket ownership, reply resolution, deadlines and STARTTLS
//! - [`client`]: SMTP command layer
//! - [`command`]: SMTP command builders
//! - [`framer`]: Line framer
//! - [`parser`]: Reply parser
//! - [`sender`]: Delivery orchestration with progress reporting
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod client;
pub mod command;
mod error;
pub mod framer;
pub mod parser;
pub mod sender;
#[cfg(test)]
mod test_support;
pub mod types;

pub use channel::{
    Channel, ChannelEvent, Connector, TcpConnector, TlsOptions, Transport, TransportConfig,
};
pub use client::{Client, ClientConfig, SessionState, Timeouts};
pub use error::{Error, Result};
pub use framer::{FramerEvent, LineFramer};
pub use sender::{Credentials, Envelope, MailSender, SendOutcome, SendStatus, StopHandle};
pub use types::{Address, AuthMechanism, EnhancedCode, Extension, ExtensionSet, Reply, ReplyCode};
