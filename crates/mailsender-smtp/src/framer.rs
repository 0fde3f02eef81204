//! Line framing for the SMTP byte stream.
//!
//! [`LineFramer`] turns arbitrarily chunked input into complete lines,
//! split on `\r?\n`. An unterminated tail is kept until more data arrives
//! or the framer is reset.

use bytes::BytesMut;
use tokio::sync::broadcast;

/// Capacity of the notification channel.
const EVENT_CAPACITY: usize = 64;

/// Notification emitted by a [`LineFramer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerEvent {
    /// A complete line, terminator removed.
    Line(String),
    /// The buffer was cleared.
    Reset,
}

/// Splits a byte stream into lines.
///
/// Empty lines are dropped unless [`LineFramer::keep_blank_lines`] is set.
/// No line length limit is enforced.
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
    keep_blank_lines: bool,
    events: broadcast::Sender<FramerEvent>,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Creates an empty framer that drops blank lines.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            buffer: BytesMut::new(),
            keep_blank_lines: false,
            events,
        }
    }

    /// Delivers empty lines instead of dropping them.
    #[must_use]
    pub const fn keep_blank_lines(mut self, keep: bool) -> Self {
        self.keep_blank_lines = keep;
        self
    }

    /// Subscribes to line and reset notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FramerEvent> {
        self.events.subscribe()
    }

    /// Appends a chunk and returns the lines it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let Some(end) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let complete = self.buffer.split_to(end + 1);

        let keep_blank = self.keep_blank_lines;
        let lines: Vec<String> = complete[..end]
            .split(|&b| b == b'\n')
            .map(|segment| segment.strip_suffix(b"\r").unwrap_or(segment))
            .filter(|segment| keep_blank || !segment.is_empty())
            .map(|segment| String::from_utf8_lossy(segment).into_owned())
            .collect();

        if self.events.receiver_count() > 0 {
            for line in &lines {
                let _ = self.events.send(FramerEvent::Line(line.clone()));
            }
        }

        lines
    }

    /// Discards any buffered partial line.
    pub fn reset(&mut self) {
        self.buffer.clear();
        let _ = self.events.send(FramerEvent::Reset);
    }

    /// Returns the number of buffered bytes not yet terminated by a newline.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}
