//! Scripted transport shared by the command-layer tests.

use std::collections::VecDeque;
use std::time::Duration;

use crate::channel::{LineHandler, ReplyResolver, TlsOptions, Transport, with_deadline};
use crate::error::{Error, Result};
use crate::types::ReplyCode;

type Hook = Box<dyn FnMut(&str) + Send>;

/// Records writes and answers each with the next scripted reply.
///
/// Running out of replies behaves like the server hanging up. An empty
/// reply is a server that never answers: the call waits for its deadline.
pub struct FakeTransport {
    replies: VecDeque<Vec<&'static str>>,
    pub written: Vec<String>,
    pub secure: bool,
    pub handshakes: usize,
    pub closed: bool,
    hook: Option<Hook>,
}

impl FakeTransport {
    pub fn new(replies: &[&[&'static str]]) -> Self {
        Self {
            replies: replies.iter().map(|reply| reply.to_vec()).collect(),
            written: Vec::new(),
            secure: false,
            handshakes: 0,
            closed: false,
            hook: None,
        }
    }

    /// Runs `hook` with `"CONNECT"` on connect and with the data of every write.
    pub fn on_activity(mut self, hook: impl FnMut(&str) + Send + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    fn notify(&mut self, activity: &str) {
        if let Some(hook) = self.hook.as_mut() {
            hook(activity);
        }
    }

    async fn reply(
        &mut self,
        handler: Option<LineHandler<'_>>,
        deadline: Option<Duration>,
    ) -> Result<ReplyCode> {
        let lines = self.replies.pop_front().ok_or(Error::ConnectionClosed)?;
        if lines.is_empty() {
            return with_deadline(deadline, std::future::pending::<Result<ReplyCode>>()).await;
        }
        let mut resolver = ReplyResolver::new(handler);
        for line in lines {
            if let Some(code) = resolver.accept(line)? {
                return Ok(code);
            }
        }
        Err(Error::ConnectionClosed)
    }
}

impl Transport for FakeTransport {
    async fn connect(
        &mut self,
        handler: Option<LineHandler<'_>>,
        deadline: Option<Duration>,
    ) -> Result<ReplyCode> {
        self.notify("CONNECT");
        self.reply(handler, deadline).await
    }

    async fn write(
        &mut self,
        data: &[u8],
        handler: Option<LineHandler<'_>>,
        deadline: Option<Duration>,
    ) -> Result<ReplyCode> {
        let data = String::from_utf8_lossy(data).into_owned();
        self.notify(&data);
        self.written.push(data);
        self.reply(handler, deadline).await
    }

    async fn close(&mut self, _deadline: Option<Duration>) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    async fn negotiate_tls(
        &mut self,
        _options: &TlsOptions,
        _deadline: Option<Duration>,
    ) -> Result<()> {
        self.handshakes += 1;
        self.secure = true;
        Ok(())
    }

    fn is_secure(&self) -> bool {
        self.secure
    }
}
